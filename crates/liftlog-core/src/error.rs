//! Error types shared across the credential lifecycle.
//!
//! The sync-facing taxonomy lives in [`crate::sync::types::SyncError`];
//! these are the lower-level errors it is derived from.

use thiserror::Error;

/// Credential store write failure.
///
/// Reads never error (absent keys are `None`); a failed write means the
/// store can no longer be trusted and the caller must prompt re-linking.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store write failed for key '{key}'")]
    WriteFailed { key: String },
}

/// Errors from the identity-provider boundary (token exchange/refresh).
#[derive(Debug, Error)]
pub enum OAuthError {
    /// Connectivity or timeout while talking to the token endpoint.
    #[error("network error during token request: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider rejected the grant (e.g. `invalid_grant` for a revoked
    /// refresh token). Retrying will not help.
    #[error("token endpoint rejected the request: {code}")]
    Rejected {
        code: String,
        description: Option<String>,
    },

    /// No refresh token is stored; the user has to sign in again.
    #[error("no refresh token stored")]
    NoRefreshToken,

    /// The token endpoint answered with something we could not decode.
    #[error("malformed token response: {0}")]
    MalformedResponse(String),

    /// Persisting the refreshed credential failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No authorization code arrived on the loopback callback.
    #[error("invalid authorization callback: {0}")]
    InvalidCallback(String),

    /// Browser/listener plumbing failed during the sign-in flow.
    #[error("sign-in flow failed: {0}")]
    Flow(String),
}

impl OAuthError {
    /// Whether this failure is definitive: the stored grant is unusable and
    /// the link must be torn down. Transient failures (network, a garbled
    /// response) leave the link intact.
    pub fn is_definitive(&self) -> bool {
        matches!(self, OAuthError::Rejected { .. } | OAuthError::NoRefreshToken)
    }
}
