//! Refresh handshake against the identity provider's token endpoint.

use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::Client;

use crate::auth::credential_store::{self, keys, Credential, CredentialStore};
use crate::error::OAuthError;

/// Exchanges the stored refresh token for a new access token and persists
/// the result. On failure nothing is written; the caller decides whether a
/// definitive failure should tear down the link.
pub struct CredentialRefresher {
    http: Client,
    token_url: String,
    store: Arc<dyn CredentialStore>,
}

impl CredentialRefresher {
    pub fn new(token_url: impl Into<String>, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            http: Client::new(),
            token_url: token_url.into(),
            store,
        }
    }

    /// Perform the refresh handshake and write the new credential back.
    ///
    /// All four fields are persisted through the store's atomic helper; a
    /// store write failure surfaces as [`OAuthError::Store`] with the store
    /// already cleared.
    pub async fn refresh(&self) -> Result<Credential, OAuthError> {
        let refresh_token = self
            .store
            .load(keys::REFRESH_TOKEN)
            .filter(|t| !t.is_empty())
            .ok_or(OAuthError::NoRefreshToken)?;

        let client_id = self.store.load(keys::CLIENT_ID).unwrap_or_default();
        let client_secret = self.store.load(keys::CLIENT_SECRET).unwrap_or_default();

        let params = [
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let resp = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await?;

        let body = parse_token_response(resp).await?;

        let expires_at = body
            .get("expires_in")
            .and_then(|v| v.as_i64())
            .map(|secs| Utc::now() + Duration::seconds(secs));

        let access_token = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OAuthError::MalformedResponse("missing access_token".to_string()))?
            .to_string();

        // The provider only rotates the refresh token sometimes; keep the
        // old one when the response omits it.
        let refresh_token = body
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or(refresh_token);

        let credential = Credential {
            access_token,
            refresh_token,
            email: self.store.load(keys::EMAIL).unwrap_or_default(),
            expires_at,
        };

        credential_store::save_credential(self.store.as_ref(), &credential)?;
        tracing::info!("access token refreshed");
        Ok(credential)
    }
}

/// Decode a token-endpoint response, surfacing provider rejections as
/// [`OAuthError::Rejected`].
pub(crate) async fn parse_token_response(
    resp: reqwest::Response,
) -> Result<serde_json::Value, OAuthError> {
    let text = resp.text().await?;
    let body: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| OAuthError::MalformedResponse(e.to_string()))?;

    if let Some(error) = body.get("error").and_then(|v| v.as_str()) {
        return Err(OAuthError::Rejected {
            code: error.to_string(),
            description: body
                .get("error_description")
                .and_then(|v| v.as_str())
                .map(String::from),
        });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credential_store::MemoryStore;
    use chrono::TimeZone;

    fn store_with_credential() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let credential = Credential {
            access_token: "old-access".to_string(),
            refresh_token: "old-refresh".to_string(),
            email: "user@example.com".to_string(),
            expires_at: Some(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()),
        };
        credential_store::save_credential(store.as_ref(), &credential).unwrap();
        store
    }

    #[tokio::test]
    async fn refresh_persists_new_token_and_keeps_email() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"new-access","expires_in":3600,"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let store = store_with_credential();
        let refresher =
            CredentialRefresher::new(format!("{}/token", server.url()), store.clone());

        let credential = refresher.refresh().await.unwrap();
        mock.assert_async().await;

        assert_eq!(credential.access_token, "new-access");
        // No rotation in the response: the old refresh token survives.
        assert_eq!(credential.refresh_token, "old-refresh");
        assert_eq!(credential.email, "user@example.com");
        assert!(credential.expires_at.unwrap() > Utc::now());

        let stored = credential_store::load_credential(store.as_ref()).unwrap();
        assert_eq!(stored, credential);
    }

    #[tokio::test]
    async fn refresh_rotates_refresh_token_when_provided() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(
                r#"{"access_token":"new-access","refresh_token":"new-refresh","expires_in":3600}"#,
            )
            .create_async()
            .await;

        let store = store_with_credential();
        let refresher =
            CredentialRefresher::new(format!("{}/token", server.url()), store.clone());

        let credential = refresher.refresh().await.unwrap();
        assert_eq!(credential.refresh_token, "new-refresh");
    }

    #[tokio::test]
    async fn revoked_grant_is_definitive_and_writes_nothing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"Token revoked"}"#)
            .create_async()
            .await;

        let store = store_with_credential();
        let refresher =
            CredentialRefresher::new(format!("{}/token", server.url()), store.clone());

        let err = refresher.refresh().await.unwrap_err();
        assert!(err.is_definitive());

        // The old credential is untouched.
        let stored = credential_store::load_credential(store.as_ref()).unwrap();
        assert_eq!(stored.access_token, "old-access");
    }

    #[tokio::test]
    async fn garbled_response_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body("<html>gateway error</html>")
            .create_async()
            .await;

        let store = store_with_credential();
        let refresher = CredentialRefresher::new(format!("{}/token", server.url()), store);

        let err = refresher.refresh().await.unwrap_err();
        assert!(matches!(err, OAuthError::MalformedResponse(_)));
        assert!(!err.is_definitive());
    }

    #[tokio::test]
    async fn missing_refresh_token_fails_without_network() {
        let store = Arc::new(MemoryStore::new());
        let refresher = CredentialRefresher::new("http://127.0.0.1:1/token", store);
        let err = refresher.refresh().await.unwrap_err();
        assert!(matches!(err, OAuthError::NoRefreshToken));
    }

    #[tokio::test]
    async fn store_failure_clears_credential_and_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"new-access","expires_in":3600}"#)
            .create_async()
            .await;

        let store = store_with_credential();
        store.fail_saves_for(keys::ACCESS_TOKEN);
        let refresher =
            CredentialRefresher::new(format!("{}/token", server.url()), store.clone());

        let err = refresher.refresh().await.unwrap_err();
        assert!(matches!(err, OAuthError::Store(_)));
        assert!(credential_store::load_credential(store.as_ref()).is_none());
    }
}
