use thiserror::Error;

use dosewise_shared::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Error body returned by the server.
    #[error("{message} ({status} {code})")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Rejected locally, or by the server with per-field errors.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Signed in, but the account has no profile yet.  Retry with
    /// `AuthContext::retry_profile`.
    #[error("Profile not found")]
    ProfileMissing,

    #[error("Not signed in")]
    NotAuthenticated,
}

impl ClientError {
    /// Server error code, when the server produced one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => Some(code),
            ClientError::Validation(_) => Some("VALIDATION_FAILED"),
            ClientError::ProfileMissing => Some("PROFILE_MISSING"),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
