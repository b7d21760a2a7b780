use thiserror::Error;

/// Errors reported by the authorization and reference collaborators
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("Failed to resolve reference '{reference}': {reason}")]
    Resolve { reference: String, reason: String },

    #[error("Authorization check failed: {0}")]
    Authorization(String),
}

/// Errors that can occur during token registry operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token not found: {0}")]
    NotFound(String),

    #[error("Access error: {0}")]
    Access(#[from] AccessError),
}
