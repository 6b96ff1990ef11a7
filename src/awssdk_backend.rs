use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::Credentials;
use aws_sdk_sso::Client as SsoClient;
use aws_sdk_sts::Client as StsClient;
use tracing::debug;

use crate::credentials::{
    require_mfa_code, CredentialBackend, CredentialTriple, MfaPrompt, SsoRole,
};
use crate::error;

/// [`CredentialBackend`] on top of the AWS SDK for Rust. Every call builds
/// fresh clients; nothing is cached between resolutions.
pub struct SdkBackend {
    region: String,
}

impl SdkBackend {
    pub fn new(region: impl Into<String>) -> SdkBackend {
        SdkBackend {
            region: region.into(),
        }
    }

    fn sts_client(&self, creds: &CredentialTriple) -> StsClient {
        let conf = aws_sdk_sts::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(self.region.clone()))
            .credentials_provider(sdk_credentials(creds))
            .build();
        StsClient::from_conf(conf)
    }
}

fn sdk_credentials(triple: &CredentialTriple) -> Credentials {
    Credentials::new(
        triple.access_key.clone(),
        triple.secret_key.clone(),
        triple.session_token.clone(),
        None,
        "cloudshell-base",
    )
}

#[async_trait(?Send)]
impl CredentialBackend for SdkBackend {
    async fn base_credentials(
        &self,
        profile: Option<&str>,
        mfa_serial: Option<&str>,
        mfa: &dyn MfaPrompt,
    ) -> Result<CredentialTriple> {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(self.region.clone()));
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let shared = loader.load().await;

        let provider = shared
            .credentials_provider()
            .ok_or_else(|| error::usage_error("no credential sources are available"))?;
        let chain = provider
            .provide_credentials()
            .await
            .context("unable to resolve credentials from the default provider chain")?;

        let base = CredentialTriple {
            access_key: chain.access_key_id().to_string(),
            secret_key: chain.secret_access_key().to_string(),
            session_token: chain.session_token().map(String::from),
        };

        let serial = match mfa_serial {
            Some(serial) => serial,
            None => return Ok(base),
        };

        let code = require_mfa_code(mfa, serial)?;
        debug!(serial, "exchanging chain credentials for an MFA session");

        let resp = self
            .sts_client(&base)
            .get_session_token()
            .serial_number(serial)
            .token_code(code)
            .send()
            .await
            .context("STS GetSessionToken failed")?;
        let session = resp
            .credentials()
            .ok_or_else(|| error::bug("GetSessionToken returned no credentials"))?;

        Ok(CredentialTriple {
            access_key: session.access_key_id().to_string(),
            secret_key: session.secret_access_key().to_string(),
            session_token: Some(session.session_token().to_string()),
        })
    }

    async fn assume_role(
        &self,
        base: &CredentialTriple,
        role_arn: &str,
        session_name: &str,
    ) -> Result<CredentialTriple> {
        debug!(role_arn, "assuming role");

        let resp = self
            .sts_client(base)
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .send()
            .await
            .with_context(|| format!("unable to assume role `{}`", role_arn))?;
        let assumed = resp
            .credentials()
            .ok_or_else(|| error::bug("AssumeRole returned no credentials"))?;

        Ok(CredentialTriple {
            access_key: assumed.access_key_id().to_string(),
            secret_key: assumed.secret_access_key().to_string(),
            session_token: Some(assumed.session_token().to_string()),
        })
    }

    async fn sso_role_credentials(
        &self,
        sso_region: &str,
        role: &SsoRole,
    ) -> Result<CredentialTriple> {
        // GetRoleCredentials authenticates with the bearer token, so the
        // client is scoped to the SSO region and carries no sigv4 identity.
        let conf = aws_sdk_sso::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(sso_region.to_string()))
            .build();
        let client = SsoClient::from_conf(conf);

        let resp = client
            .get_role_credentials()
            .role_name(role.role_name.as_str())
            .account_id(role.account_id.as_str())
            .access_token(role.access_token.as_str())
            .send()
            .await
            .context("SSO GetRoleCredentials failed")?;
        let creds = resp
            .role_credentials()
            .ok_or_else(|| error::bug("GetRoleCredentials returned no credentials"))?;

        Ok(CredentialTriple {
            access_key: creds
                .access_key_id()
                .ok_or_else(|| error::bug("role credentials are missing an access key"))?
                .to_string(),
            secret_key: creds
                .secret_access_key()
                .ok_or_else(|| error::bug("role credentials are missing a secret key"))?
                .to_string(),
            session_token: creds.session_token().map(String::from),
        })
    }
}
