use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudShellError {
    #[error("Usage error: {}", .message)]
    UsageError { message: String },
    #[error("an MFA code was not provided; credential resolution cannot continue")]
    MfaNotProvided,
    #[error(
        "SSO sign-in is not supported yet: the OIDC device authorization flow \
         (device code, access token, account and role discovery) has not been implemented"
    )]
    SsoUnsupported,
    #[error("Bug: {0}")]
    Bug(String),
}

pub fn usage_error(message: impl AsRef<str>) -> CloudShellError {
    CloudShellError::UsageError {
        message: message.as_ref().into(),
    }
}

pub fn bug(message: impl AsRef<str>) -> CloudShellError {
    CloudShellError::Bug(message.as_ref().into())
}
