//! Error taxonomy for sync operations.

use thiserror::Error;

use crate::error::OAuthError;
use crate::sync::calendar_client::ApiError;

/// Policy-level sync errors, as seen by the reconciler and the UI layer.
///
/// Transport detail stays in [`ApiError`]; the reconciler only needs to
/// distinguish "try again" from "re-link" from "provider said no".
#[derive(Debug, Error)]
pub enum SyncError {
    /// Connectivity or timeout. Surfaced as "try again", never auto-retried
    /// beyond the executor's single pass.
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The credential could not be refreshed, or the retried call was still
    /// unauthorized. Triggers automatic unlink and a re-link prompt.
    #[error("calendar access expired")]
    AuthExpired,

    /// The provider rejected the request (4xx/5xx other than 401).
    #[error("calendar API rejected the request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    /// A response we could not decode. Handled like [`Self::RemoteRejected`].
    #[error("malformed calendar response: {0}")]
    MalformedResponse(String),

    /// The user never linked a calendar; no network call was attempted.
    #[error("calendar is not linked")]
    NotLinked,

    /// A credential-store write failed; the store has been cleared and the
    /// user must re-link.
    #[error("credential store corrupted")]
    StoreCorrupted,
}

impl SyncError {
    /// Map a call's transport error once the retry policy is exhausted.
    pub(crate) fn from_api(err: ApiError) -> Self {
        match err {
            ApiError::Unauthorized => SyncError::AuthExpired,
            ApiError::Network(e) => SyncError::Network(e),
            ApiError::Status { status, message } => SyncError::RemoteRejected { status, message },
            ApiError::Malformed(msg) => SyncError::MalformedResponse(msg),
        }
    }

    /// Map a failed refresh handshake. Only definitive failures count as
    /// expired access; a transient network error is just a network error.
    pub(crate) fn from_refresh(err: OAuthError) -> Self {
        match err {
            OAuthError::Store(_) => SyncError::StoreCorrupted,
            OAuthError::Network(e) => SyncError::Network(e),
            OAuthError::MalformedResponse(msg) => SyncError::MalformedResponse(msg),
            _ => SyncError::AuthExpired,
        }
    }

    /// Whether this failure means the link itself is gone and the linking
    /// state machine should tear it down.
    pub fn severs_link(&self) -> bool {
        matches!(self, SyncError::AuthExpired | SyncError::StoreCorrupted)
    }
}
