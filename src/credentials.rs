use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::error::CloudShellError;
use crate::settings::Environment;

/// Session name STS sees on assumed roles. Kept for compatibility with the
/// editor extension this tool backs.
pub const ROLE_SESSION_NAME: &str = "VSCode";

/// The credentials handed back to the caller, ready to sign a CloudShell
/// session with. `session_token` is absent for long-lived access keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialTriple {
    pub access_key: String,
    pub secret_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

/// Inputs to an SSO `GetRoleCredentials` call. These are produced by the
/// OIDC device authorization flow, which is not wired up yet (see
/// [`resolve`]).
#[derive(Clone, Debug)]
pub struct SsoRole {
    pub role_name: String,
    pub account_id: String,
    pub access_token: String,
}

/// A way to ask the user for a one-time MFA code.
pub trait MfaPrompt {
    /// Prompts for the code of the device identified by `serial`. `Ok(None)`
    /// means the user dismissed the prompt without entering anything.
    fn mfa_code(&self, serial: &str) -> Result<Option<String>>;
}

/// The identity backend the resolver drives. In production this is the AWS
/// SDK ([`crate::awssdk_backend::SdkBackend`]); tests substitute a fake so
/// the decision logic can be exercised without the network.
#[async_trait(?Send)]
pub trait CredentialBackend {
    /// Resolves credentials from the default provider chain, scoped to
    /// `profile` when one is given. When `mfa_serial` is set, the backend
    /// prompts through `mfa` and exchanges the chain credentials for an MFA
    /// session; a dismissed or empty prompt fails the resolution.
    async fn base_credentials(
        &self,
        profile: Option<&str>,
        mfa_serial: Option<&str>,
        mfa: &dyn MfaPrompt,
    ) -> Result<CredentialTriple>;

    /// Exchanges `base` for temporary credentials of the role at `role_arn`.
    async fn assume_role(
        &self,
        base: &CredentialTriple,
        role_arn: &str,
        session_name: &str,
    ) -> Result<CredentialTriple>;

    /// Fetches role credentials from IAM Identity Center. Unreachable until
    /// the device authorization flow exists to produce an [`SsoRole`].
    async fn sso_role_credentials(
        &self,
        sso_region: &str,
        role: &SsoRole,
    ) -> Result<CredentialTriple>;
}

/// Resolves credentials for a CloudShell session.
///
/// Exactly one of three paths runs per call, decided in this order:
///
/// 1. `sso` and `sso_region` both configured: SSO role credentials. This
///    path fails with [`CloudShellError::SsoUnsupported`] because the device
///    authorization flow that would produce the role name, account id and
///    access token does not exist yet; failing here beats calling
///    `GetRoleCredentials` with empty inputs.
/// 2. An `assume_role` ARN configured: default-chain credentials exchanged
///    for the role's temporary credentials, session name
///    [`ROLE_SESSION_NAME`].
/// 3. Neither: default-chain credentials, verbatim.
///
/// Failures from the backend propagate untouched; there is no retry and
/// nothing is cached across calls.
pub async fn resolve(
    env: &Environment,
    backend: &impl CredentialBackend,
    mfa: &dyn MfaPrompt,
) -> Result<CredentialTriple> {
    if env.sso() && env.sso_region().is_some() {
        // TODO: implement the OIDC device authorization flow (start URL ->
        // device code -> access token -> account/role discovery) and feed
        // the result to `backend.sso_role_credentials`.
        return Err(CloudShellError::SsoUnsupported.into());
    }

    let base = backend
        .base_credentials(
            env.profile().as_deref(),
            env.mfa_serial().as_deref(),
            mfa,
        )
        .await?;

    match env.assume_role() {
        Some(role_arn) => {
            backend
                .assume_role(&base, &role_arn, ROLE_SESSION_NAME)
                .await
        }
        None => Ok(base),
    }
}

/// Demands an MFA code from the prompt. A dismissed prompt or an empty entry
/// fails the resolution rather than letting an empty code travel onward.
pub(crate) fn require_mfa_code(mfa: &dyn MfaPrompt, serial: &str) -> Result<String> {
    match mfa.mfa_code(serial)? {
        Some(code) if !code.trim().is_empty() => Ok(code.trim().to_string()),
        _ => Err(CloudShellError::MfaNotProvided.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Opt;
    use crate::ui::testing::TestUi;
    use std::cell::{Cell, RefCell};

    fn base_triple() -> CredentialTriple {
        CredentialTriple {
            access_key: "AKIABASE".to_string(),
            secret_key: "base-secret".to_string(),
            session_token: None,
        }
    }

    fn mfa_session_triple() -> CredentialTriple {
        CredentialTriple {
            access_key: "ASIAMFA".to_string(),
            secret_key: "mfa-secret".to_string(),
            session_token: Some("mfa-token".to_string()),
        }
    }

    fn assumed_triple() -> CredentialTriple {
        CredentialTriple {
            access_key: "ASIAROLE".to_string(),
            secret_key: "role-secret".to_string(),
            session_token: Some("role-token".to_string()),
        }
    }

    /// Behaves like the SDK backend, without the SDK: hands out fixed
    /// triples and records what the resolver asked for.
    #[derive(Default)]
    struct FakeBackend {
        base_calls: Cell<usize>,
        sso_calls: Cell<usize>,
        assume_role_calls: RefCell<Vec<(String, String)>>,
        seen_profiles: RefCell<Vec<Option<String>>>,
    }

    #[async_trait(?Send)]
    impl CredentialBackend for FakeBackend {
        async fn base_credentials(
            &self,
            profile: Option<&str>,
            mfa_serial: Option<&str>,
            mfa: &dyn MfaPrompt,
        ) -> Result<CredentialTriple> {
            self.base_calls.set(self.base_calls.get() + 1);
            self.seen_profiles
                .borrow_mut()
                .push(profile.map(String::from));

            match mfa_serial {
                Some(serial) => {
                    let _code = require_mfa_code(mfa, serial)?;
                    Ok(mfa_session_triple())
                }
                None => Ok(base_triple()),
            }
        }

        async fn assume_role(
            &self,
            base: &CredentialTriple,
            role_arn: &str,
            session_name: &str,
        ) -> Result<CredentialTriple> {
            assert_eq!(&base_triple(), base);
            self.assume_role_calls
                .borrow_mut()
                .push((role_arn.to_string(), session_name.to_string()));
            Ok(assumed_triple())
        }

        async fn sso_role_credentials(
            &self,
            _sso_region: &str,
            _role: &SsoRole,
        ) -> Result<CredentialTriple> {
            self.sso_calls.set(self.sso_calls.get() + 1);
            unreachable!("the SSO path should never reach the backend");
        }
    }

    fn env_with(opt: Opt) -> Environment {
        let mut env = Environment::new();
        env.apply_cli(&opt);
        env
    }

    #[tokio::test]
    async fn default_profile_credentials_are_returned_verbatim() {
        let backend = FakeBackend::default();
        let env = env_with(Opt::default());

        let creds = resolve(&env, &backend, &TestUi::default()).await.unwrap();

        assert_eq!(base_triple(), creds);
        assert_eq!(1, backend.base_calls.get());
        assert_eq!(0, backend.sso_calls.get());
        assert!(backend.assume_role_calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn profile_is_passed_through_to_the_chain() {
        let backend = FakeBackend::default();
        let env = env_with(Opt {
            profile: Some("work".to_string()),
            ..Default::default()
        });

        resolve(&env, &backend, &TestUi::default()).await.unwrap();

        assert_eq!(
            vec![Some("work".to_string())],
            backend.seen_profiles.borrow().clone()
        );
    }

    #[tokio::test]
    async fn assume_role_exchanges_the_base_credentials() {
        let backend = FakeBackend::default();
        let env = env_with(Opt {
            assume_role: Some("arn:aws:iam::123456789012:role/CloudShellUser".to_string()),
            ..Default::default()
        });

        let creds = resolve(&env, &backend, &TestUi::default()).await.unwrap();

        assert_eq!(assumed_triple(), creds);
        assert_eq!(
            vec![(
                "arn:aws:iam::123456789012:role/CloudShellUser".to_string(),
                "VSCode".to_string()
            )],
            backend.assume_role_calls.borrow().clone()
        );
    }

    #[tokio::test]
    async fn sso_flag_without_a_region_falls_back_to_the_default_chain() {
        let backend = FakeBackend::default();
        let env = env_with(Opt {
            sso: true,
            ..Default::default()
        });

        let creds = resolve(&env, &backend, &TestUi::default()).await.unwrap();

        assert_eq!(base_triple(), creds);
        assert_eq!(0, backend.sso_calls.get());
    }

    #[tokio::test]
    async fn sso_region_alone_does_not_select_sso() {
        let backend = FakeBackend::default();
        let env = env_with(Opt {
            sso_region: Some("us-west-2".to_string()),
            ..Default::default()
        });

        let creds = resolve(&env, &backend, &TestUi::default()).await.unwrap();

        assert_eq!(base_triple(), creds);
        assert_eq!(0, backend.sso_calls.get());
    }

    #[tokio::test]
    async fn sso_path_fails_fast_until_the_device_flow_exists() {
        let backend = FakeBackend::default();
        let env = env_with(Opt {
            sso: true,
            sso_region: Some("us-west-2".to_string()),
            ..Default::default()
        });

        let err = resolve(&env, &backend, &TestUi::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CloudShellError>(),
            Some(CloudShellError::SsoUnsupported)
        ));
        // Nothing should have been resolved or called.
        assert_eq!(0, backend.base_calls.get());
        assert_eq!(0, backend.sso_calls.get());
    }

    #[tokio::test]
    async fn mfa_code_is_collected_and_credentials_exchanged() {
        let backend = FakeBackend::default();
        let env = env_with(Opt {
            mfa_serial: Some("arn:aws:iam::123456789012:mfa/me".to_string()),
            ..Default::default()
        });

        let ui = TestUi::default();
        ui.inner().mfa_codes.push(Some("123456".to_string()));

        let creds = resolve(&env, &backend, &ui).await.unwrap();

        assert_eq!(mfa_session_triple(), creds);
        assert_eq!(
            vec!["arn:aws:iam::123456789012:mfa/me".to_string()],
            ui.inner().prompted_serials.clone()
        );
    }

    #[tokio::test]
    async fn dismissed_mfa_prompt_fails_the_resolution() {
        let backend = FakeBackend::default();
        let env = env_with(Opt {
            mfa_serial: Some("arn:aws:iam::123456789012:mfa/me".to_string()),
            ..Default::default()
        });

        // No pending codes: the prompt reports a dismissal.
        let err = resolve(&env, &backend, &TestUi::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CloudShellError>(),
            Some(CloudShellError::MfaNotProvided)
        ));
    }

    #[tokio::test]
    async fn empty_mfa_entry_fails_the_resolution() {
        let backend = FakeBackend::default();
        let env = env_with(Opt {
            mfa_serial: Some("arn:aws:iam::123456789012:mfa/me".to_string()),
            ..Default::default()
        });

        let ui = TestUi::default();
        ui.inner().mfa_codes.push(Some("".to_string()));

        let err = resolve(&env, &backend, &ui).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CloudShellError>(),
            Some(CloudShellError::MfaNotProvided)
        ));
    }

    #[test]
    fn mfa_codes_are_trimmed() {
        let ui = TestUi::default();
        ui.inner().mfa_codes.push(Some(" 123456 ".to_string()));
        let code = require_mfa_code(&ui, "serial").unwrap();
        assert_eq!("123456", code);
    }

    #[test]
    fn triple_serializes_with_the_wire_field_names() {
        let json = serde_json::to_value(assumed_triple()).unwrap();
        assert_eq!("ASIAROLE", json["accessKey"]);
        assert_eq!("role-secret", json["secretKey"]);
        assert_eq!("role-token", json["sessionToken"]);

        let json = serde_json::to_value(base_triple()).unwrap();
        assert!(json.get("sessionToken").is_none());
    }
}
