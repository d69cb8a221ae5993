//! Authenticated call executor: the system's only retry policy.
//!
//! Wraps any bearer-token call with one refresh-and-retry cycle. At most
//! one network round-trip is ever redone automatically, bounding worst-case
//! latency and ruling out refresh loops.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;

use crate::auth::credential_store::{self, CredentialStore};
use crate::auth::refresher::CredentialRefresher;
use crate::auth::validator;
use crate::sync::calendar_client::ApiError;
use crate::sync::types::SyncError;

/// Executes calls that need a bearer token, refreshing it at most once.
pub struct AuthExecutor {
    store: Arc<dyn CredentialStore>,
    refresher: CredentialRefresher,
}

impl AuthExecutor {
    pub fn new(store: Arc<dyn CredentialStore>, refresher: CredentialRefresher) -> Self {
        Self { store, refresher }
    }

    /// Run `call` with the current access token.
    ///
    /// - Stored expiry already unusable: refresh first, then call once with
    ///   the new token; that result is final.
    /// - Otherwise call once; on a 401 refresh exactly once, re-derive the
    ///   token from the store and retry exactly once; the second result is
    ///   final.
    /// - Non-auth errors propagate immediately without a refresh.
    ///
    /// The token is re-read from the store after every refresh rather than
    /// cached across awaits; a concurrent refresh may have raced us.
    pub async fn execute<T, F, Fut>(&self, call: F) -> Result<T, SyncError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let expiry = credential_store::stored_expiry(self.store.as_ref());
        if !validator::is_usable(expiry, Utc::now(), validator::expiry_buffer()) {
            // Proactive path: the token is known-stale, refresh before
            // spending a round-trip on a guaranteed 401.
            tracing::debug!("stored token unusable, refreshing before call");
            self.refresher
                .refresh()
                .await
                .map_err(SyncError::from_refresh)?;
            let token = credential_store::stored_access_token(self.store.as_ref());
            return call(token).await.map_err(SyncError::from_api);
        }

        let token = credential_store::stored_access_token(self.store.as_ref());
        match call(token).await {
            Ok(value) => Ok(value),
            Err(ApiError::Unauthorized) => {
                tracing::debug!("call unauthorized, refreshing and retrying once");
                self.refresher
                    .refresh()
                    .await
                    .map_err(SyncError::from_refresh)?;
                let token = credential_store::stored_access_token(self.store.as_ref());
                call(token).await.map_err(SyncError::from_api)
            }
            Err(other) => Err(SyncError::from_api(other)),
        }
    }
}
