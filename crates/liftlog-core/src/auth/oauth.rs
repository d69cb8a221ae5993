//! OAuth2 authorization-code sign-in for the desktop.
//!
//! 1. Opens the browser at the provider's consent page
//! 2. Catches the redirect on a localhost listener
//! 3. Exchanges the code for tokens and fetches the account email
//! 4. Persists the credential atomically

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::Client;

use crate::auth::credential_store::{self, keys, Credential, CredentialStore};
use crate::auth::refresher::parse_token_response;
use crate::config::OAuthConfig;
use crate::error::OAuthError;

const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/calendar.events",
    "openid",
    "email",
];

const CALLBACK_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\n\r\n\
    <html><body><h2>Sign-in complete</h2><p>You can close this tab and return to LiftLog.</p></body></html>";

/// Interactive sign-in flow. One instance per attempt.
pub struct OAuthFlow {
    http: Client,
    config: OAuthConfig,
    store: Arc<dyn CredentialStore>,
}

impl OAuthFlow {
    pub fn new(config: OAuthConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            http: Client::new(),
            config,
            store,
        }
    }

    /// Persist the OAuth client registration so later refreshes can use it.
    pub fn store_client(
        store: &dyn CredentialStore,
        client_id: &str,
        client_secret: &str,
    ) -> Result<(), OAuthError> {
        if !store.save(keys::CLIENT_ID, client_id) {
            return Err(crate::error::StoreError::WriteFailed {
                key: keys::CLIENT_ID.to_string(),
            }
            .into());
        }
        if !store.save(keys::CLIENT_SECRET, client_secret) {
            return Err(crate::error::StoreError::WriteFailed {
                key: keys::CLIENT_SECRET.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/callback", self.config.redirect_port)
    }

    fn consent_url(&self, client_id: &str) -> String {
        // `access_type=offline` + `prompt=consent` so the provider always
        // issues a refresh token.
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            self.config.auth_url,
            urlencoding::encode(client_id),
            urlencoding::encode(&self.redirect_uri()),
            urlencoding::encode(&SCOPES.join(" ")),
        )
    }

    /// Run the whole flow: browser, callback, exchange, persist.
    ///
    /// Blocks on the localhost listener until the browser redirects back.
    pub async fn sign_in(&self) -> Result<Credential, OAuthError> {
        let client_id = self
            .store
            .load(keys::CLIENT_ID)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                OAuthError::Flow(
                    "no OAuth client configured; run `liftlog auth google login --client-id ... --client-secret ...`"
                        .to_string(),
                )
            })?;

        let listener = TcpListener::bind(("127.0.0.1", self.config.redirect_port))
            .map_err(|e| OAuthError::Flow(format!("cannot bind callback port: {e}")))?;

        let consent = self.consent_url(&client_id);
        open::that(&consent).map_err(|e| OAuthError::Flow(format!("cannot open browser: {e}")))?;
        tracing::info!(port = self.config.redirect_port, "waiting for OAuth callback");

        let code = wait_for_code(&listener)?;
        let body = self.exchange_code(&client_id, &code).await?;

        let access_token = body
            .get("access_token")
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OAuthError::MalformedResponse("missing access_token".to_string()))?
            .to_string();
        let refresh_token = body
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| OAuthError::MalformedResponse("missing refresh_token".to_string()))?
            .to_string();
        let expires_at = body
            .get("expires_in")
            .and_then(|v| v.as_i64())
            .map(|secs| Utc::now() + Duration::seconds(secs));

        // Best effort: a missing email never fails an otherwise good sign-in.
        let email = self.fetch_email(&access_token).await.unwrap_or_default();

        let credential = Credential {
            access_token,
            refresh_token,
            email,
            expires_at,
        };
        credential_store::save_credential(self.store.as_ref(), &credential)?;
        tracing::info!(email = %credential.email, "sign-in complete");
        Ok(credential)
    }

    async fn exchange_code(
        &self,
        client_id: &str,
        code: &str,
    ) -> Result<serde_json::Value, OAuthError> {
        let client_secret = self.store.load(keys::CLIENT_SECRET).unwrap_or_default();
        let redirect_uri = self.redirect_uri();
        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        let resp = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;
        parse_token_response(resp).await
    }

    async fn fetch_email(&self, access_token: &str) -> Option<String> {
        let resp = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .ok()?;
        let body: serde_json::Value = resp.json().await.ok()?;
        body.get("email").and_then(|v| v.as_str()).map(String::from)
    }
}

/// Accept one connection on the listener and pull the `code` query
/// parameter out of the callback request.
fn wait_for_code(listener: &TcpListener) -> Result<String, OAuthError> {
    let (mut stream, _) = listener
        .accept()
        .map_err(|e| OAuthError::Flow(format!("callback listener failed: {e}")))?;

    let mut buf = [0u8; 4096];
    let n = stream
        .read(&mut buf)
        .map_err(|e| OAuthError::Flow(format!("callback read failed: {e}")))?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let code = extract_code(&request)
        .ok_or_else(|| OAuthError::InvalidCallback(first_line(&request)))?;

    if let Err(e) = stream.write_all(CALLBACK_PAGE.as_bytes()) {
        tracing::warn!(error = %e, "failed to answer the browser callback");
    }
    Ok(code)
}

fn first_line(request: &str) -> String {
    request.lines().next().unwrap_or_default().to_string()
}

fn extract_code(request: &str) -> Option<String> {
    let path = request.lines().next()?.split_whitespace().nth(1)?;
    let url = url::Url::parse(&format!("http://localhost{path}")).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credential_store::MemoryStore;

    fn flow_against(server: &mockito::ServerGuard, store: Arc<MemoryStore>) -> OAuthFlow {
        let config = OAuthConfig {
            auth_url: format!("{}/auth", server.url()),
            token_url: format!("{}/token", server.url()),
            userinfo_url: format!("{}/userinfo", server.url()),
            redirect_port: 0,
        };
        OAuthFlow::new(config, store)
    }

    #[test]
    fn extracts_the_code_from_a_callback_request() {
        let request = "GET /callback?code=4%2FabcDEF&scope=email HTTP/1.1\r\nHost: localhost\r\n\r\n";
        assert_eq!(extract_code(request).as_deref(), Some("4/abcDEF"));
    }

    #[test]
    fn callback_without_a_code_yields_none() {
        assert!(extract_code("GET /callback?error=access_denied HTTP/1.1\r\n").is_none());
        assert!(extract_code("").is_none());
        assert!(extract_code("GARBAGE").is_none());
    }

    #[tokio::test]
    async fn exchange_posts_the_authorization_code_grant() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                mockito::Matcher::UrlEncoded("code".into(), "the-code".into()),
                mockito::Matcher::UrlEncoded("client_id".into(), "cid".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"access_token":"tok","refresh_token":"ref","expires_in":3600}"#)
            .create_async()
            .await;

        let store = Arc::new(MemoryStore::new());
        store.save(keys::CLIENT_ID, "cid");
        store.save(keys::CLIENT_SECRET, "sec");
        let flow = flow_against(&server, store);

        let body = flow.exchange_code("cid", "the-code").await.unwrap();
        assert_eq!(body["access_token"], "tok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn provider_rejection_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant","error_description":"Bad code"}"#)
            .create_async()
            .await;

        let store = Arc::new(MemoryStore::new());
        let flow = flow_against(&server, store);

        let err = flow.exchange_code("cid", "bad").await.unwrap_err();
        match err {
            OAuthError::Rejected { code, description } => {
                assert_eq!(code, "invalid_grant");
                assert_eq!(description.as_deref(), Some("Bad code"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn userinfo_email_is_best_effort() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/userinfo")
            .match_header("authorization", "Bearer tok")
            .with_status(200)
            .with_body(r#"{"sub":"123","email":"user@example.com"}"#)
            .create_async()
            .await;

        let store = Arc::new(MemoryStore::new());
        let flow = flow_against(&server, store);
        assert_eq!(
            flow.fetch_email("tok").await.as_deref(),
            Some("user@example.com")
        );
    }

    #[tokio::test]
    async fn sign_in_without_a_client_names_the_real_command() {
        let server = mockito::Server::new_async().await;
        let flow = flow_against(&server, Arc::new(MemoryStore::new()));

        let err = flow.sign_in().await.unwrap_err();
        match err {
            OAuthError::Flow(msg) => assert!(msg.contains("auth google login")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn store_client_persists_both_halves() {
        let store = MemoryStore::new();
        OAuthFlow::store_client(&store, "cid", "sec").unwrap();
        assert_eq!(store.load(keys::CLIENT_ID).as_deref(), Some("cid"));
        assert_eq!(store.load(keys::CLIENT_SECRET).as_deref(), Some("sec"));
    }

    #[test]
    fn store_client_write_failure_is_an_error() {
        let store = MemoryStore::new();
        store.fail_saves_for(keys::CLIENT_SECRET);
        let err = OAuthFlow::store_client(&store, "cid", "sec").unwrap_err();
        assert!(matches!(err, OAuthError::Store(_)));
    }
}
