//! Durable, encrypted-at-rest storage for the OAuth credential.
//!
//! Four fields are stored under a fixed service namespace: access token,
//! refresh token, account email, and the access-token expiry instant
//! (string-encoded Unix seconds). No other component caches them beyond a
//! single call's lifetime.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::error::StoreError;

const SERVICE: &str = "liftlog";

/// Stored credential field keys. The camelCase spellings are load-bearing:
/// they match what earlier app versions wrote, so changing them would orphan
/// existing credentials.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const EMAIL: &str = "email";
    pub const TOKEN_EXPIRY_DATE: &str = "tokenExpiryDate";
    pub const CLIENT_ID: &str = "clientId";
    pub const CLIENT_SECRET: &str = "clientSecret";
}

/// Key/value storage scoped to the app's service namespace.
///
/// Operations never error past this boundary: `save`/`delete` report
/// success as a bool, `load` returns `None` for absent keys. Deleting a
/// missing key is success.
pub trait CredentialStore: Send + Sync {
    fn save(&self, key: &str, value: &str) -> bool;
    fn load(&self, key: &str) -> Option<String>;
    fn delete(&self, key: &str) -> bool;
}

/// The four credential fields as one value.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    pub email: String,
    /// Absence is treated as "already expired" by the validator.
    pub expires_at: Option<DateTime<Utc>>,
}

/// OS-keyring-backed store.
pub struct KeyringStore;

impl KeyringStore {
    pub fn new() -> Self {
        Self
    }

    fn entry(key: &str) -> Option<keyring::Entry> {
        match keyring::Entry::new(SERVICE, key) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(key, error = %e, "keyring entry unavailable");
                None
            }
        }
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeyringStore {
    fn save(&self, key: &str, value: &str) -> bool {
        // Delete-then-insert keeps save idempotent over existing keys.
        let Some(entry) = Self::entry(key) else {
            return false;
        };
        let _ = entry.delete_credential();
        match entry.set_password(value) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "keyring write failed");
                false
            }
        }
    }

    fn load(&self, key: &str) -> Option<String> {
        let entry = Self::entry(key)?;
        match entry.get_password() {
            Ok(pw) => Some(pw),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "keyring read failed");
                None
            }
        }
    }

    fn delete(&self, key: &str) -> bool {
        let Some(entry) = Self::entry(key) else {
            return false;
        };
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "keyring delete failed");
                false
            }
        }
    }
}

/// In-memory store for tests and embedders without an OS keyring.
///
/// Individual keys can be made to fail on save to exercise the
/// no-partial-write guarantee.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    failing_keys: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `save` of `key` fail.
    pub fn fail_saves_for(&self, key: &str) {
        self.failing_keys.lock().unwrap().insert(key.to_string());
    }
}

impl CredentialStore for MemoryStore {
    fn save(&self, key: &str, value: &str) -> bool {
        if self.failing_keys.lock().unwrap().contains(key) {
            return false;
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        true
    }

    fn load(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn delete(&self, key: &str) -> bool {
        self.values.lock().unwrap().remove(key);
        true
    }
}

/// Load the stored credential; `None` unless an access token is present.
pub fn load_credential(store: &dyn CredentialStore) -> Option<Credential> {
    let access_token = store.load(keys::ACCESS_TOKEN)?;
    Some(Credential {
        access_token,
        refresh_token: store.load(keys::REFRESH_TOKEN).unwrap_or_default(),
        email: store.load(keys::EMAIL).unwrap_or_default(),
        expires_at: stored_expiry(store),
    })
}

/// The stored access token, or empty string if absent. The remote API's own
/// 401 response is the authoritative signal for an unusable token.
pub fn stored_access_token(store: &dyn CredentialStore) -> String {
    store.load(keys::ACCESS_TOKEN).unwrap_or_default()
}

/// The stored expiry instant, if present and decodable.
pub fn stored_expiry(store: &dyn CredentialStore) -> Option<DateTime<Utc>> {
    store
        .load(keys::TOKEN_EXPIRY_DATE)
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

/// Persist all four credential fields.
///
/// The access token is written last so an interrupted write can never pair
/// a newer access token with a stale expiry. On any write failure the store
/// is cleared and an error returned; the caller must treat this as
/// unrecoverable and prompt re-linking.
pub fn save_credential(
    store: &dyn CredentialStore,
    credential: &Credential,
) -> Result<(), StoreError> {
    let expiry = credential
        .expires_at
        .map(|t| t.timestamp().to_string());

    let writes: [(&str, Option<&str>); 4] = [
        (keys::EMAIL, Some(credential.email.as_str())),
        (keys::REFRESH_TOKEN, Some(credential.refresh_token.as_str())),
        (keys::TOKEN_EXPIRY_DATE, expiry.as_deref()),
        (keys::ACCESS_TOKEN, Some(credential.access_token.as_str())),
    ];

    for (key, value) in writes {
        let ok = match value {
            Some(value) => store.save(key, value),
            None => store.delete(key),
        };
        if !ok {
            tracing::error!(key, "credential write failed, clearing store");
            clear_credential(store);
            return Err(StoreError::WriteFailed {
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

/// Remove all four credential fields. Missing keys are not an error.
pub fn clear_credential(store: &dyn CredentialStore) {
    store.delete(keys::ACCESS_TOKEN);
    store.delete(keys::REFRESH_TOKEN);
    store.delete(keys::EMAIL);
    store.delete(keys::TOKEN_EXPIRY_DATE);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_credential() -> Credential {
        Credential {
            access_token: "tok-1".to_string(),
            refresh_token: "ref-1".to_string(),
            email: "user@example.com".to_string(),
            expires_at: Some(Utc.with_ymd_and_hms(2025, 3, 22, 12, 0, 0).unwrap()),
        }
    }

    #[test]
    fn save_load_delete_round_trip() {
        let store = MemoryStore::new();
        assert!(store.save("k", "v1"));
        assert!(store.save("k", "v2"));
        assert_eq!(store.load("k"), Some("v2".to_string()));
        assert!(store.delete("k"));
        assert_eq!(store.load("k"), None);
    }

    #[test]
    fn persisted_key_names_stay_compatible_with_existing_credentials() {
        let store = MemoryStore::new();
        save_credential(&store, &sample_credential()).unwrap();
        assert!(store.load("accessToken").is_some());
        assert!(store.load("refreshToken").is_some());
        assert!(store.load("email").is_some());
        assert!(store.load("tokenExpiryDate").is_some());
    }

    #[test]
    fn delete_of_missing_key_is_success() {
        let store = MemoryStore::new();
        assert!(store.delete("never-saved"));
    }

    #[test]
    fn credential_round_trips_with_expiry_as_unix_seconds() {
        let store = MemoryStore::new();
        let credential = sample_credential();
        save_credential(&store, &credential).unwrap();

        let raw = store.load(keys::TOKEN_EXPIRY_DATE).unwrap();
        assert_eq!(raw, credential.expires_at.unwrap().timestamp().to_string());

        let loaded = load_credential(&store).unwrap();
        assert_eq!(loaded, credential);
    }

    #[test]
    fn absent_expiry_loads_as_none() {
        let store = MemoryStore::new();
        let credential = Credential {
            expires_at: None,
            ..sample_credential()
        };
        save_credential(&store, &credential).unwrap();
        assert_eq!(load_credential(&store).unwrap().expires_at, None);
    }

    #[test]
    fn failed_access_token_write_leaves_no_partial_credential() {
        let store = MemoryStore::new();
        save_credential(&store, &sample_credential()).unwrap();

        // Interrupt the second refresh after expiry is written but before
        // the access token lands.
        store.fail_saves_for(keys::ACCESS_TOKEN);
        let newer = Credential {
            access_token: "tok-2".to_string(),
            ..sample_credential()
        };
        assert!(save_credential(&store, &newer).is_err());

        assert!(load_credential(&store).is_none());
        assert_eq!(store.load(keys::TOKEN_EXPIRY_DATE), None);
    }

    #[test]
    fn failed_expiry_write_never_pairs_new_token_with_stale_expiry() {
        let store = MemoryStore::new();
        save_credential(&store, &sample_credential()).unwrap();

        store.fail_saves_for(keys::TOKEN_EXPIRY_DATE);
        let newer = Credential {
            access_token: "tok-2".to_string(),
            ..sample_credential()
        };
        assert!(save_credential(&store, &newer).is_err());

        // The new access token must not be observable at all.
        assert_eq!(stored_access_token(&store), "");
    }

    #[test]
    fn garbage_expiry_is_treated_as_absent() {
        let store = MemoryStore::new();
        store.save(keys::TOKEN_EXPIRY_DATE, "not-a-number");
        assert_eq!(stored_expiry(&store), None);
    }
}
