//! Linking state machine: Unlinked -> Linked -> (Unlinked | LinkExpired).
//!
//! The flag file is a cache over the credential store; the store is
//! authoritative and discrepancies are repaired in its favor. This manager
//! is the single writer of the flags -- screens observe, they never mutate.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::credential_store::{self, CredentialStore};
use crate::auth::refresher::CredentialRefresher;
use crate::auth::validator;
use crate::events::{Event, EventBus};

/// Persisted linking flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkingState {
    #[serde(default)]
    pub is_linked: bool,
    #[serde(default)]
    pub has_shown_intro: bool,
    /// Set when the link expired and the UI owes the user a re-link banner.
    #[serde(default)]
    pub show_relink_banner: bool,
    #[serde(default)]
    pub last_known_email: Option<String>,
}

/// Single writer of [`LinkingState`].
pub struct LinkingManager {
    store: Arc<dyn CredentialStore>,
    events: Arc<EventBus>,
    path: PathBuf,
    state: Mutex<LinkingState>,
}

impl LinkingManager {
    /// Load persisted flags (defaults on a missing or unreadable file) and
    /// immediately reconcile them against the credential store.
    pub fn load(path: PathBuf, store: Arc<dyn CredentialStore>, events: Arc<EventBus>) -> Self {
        let state = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();

        let manager = Self {
            store,
            events,
            path,
            state: Mutex::new(state),
        };
        manager.reconcile();
        manager
    }

    pub fn is_linked(&self) -> bool {
        self.state.lock().unwrap().is_linked
    }

    /// Whether the onboarding intro screen is still owed.
    pub fn needs_onboarding(&self) -> bool {
        let state = self.state.lock().unwrap();
        !state.is_linked && !state.has_shown_intro
    }

    pub fn state(&self) -> LinkingState {
        self.state.lock().unwrap().clone()
    }

    pub fn mark_intro_shown(&self) {
        let mut state = self.state.lock().unwrap();
        state.has_shown_intro = true;
        self.persist(&state);
    }

    /// Record a successful sign-in.
    pub fn link(&self, email: &str) {
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            state.is_linked = true;
            state.show_relink_banner = false;
            state.last_known_email = Some(email.to_string());
            self.persist(&state);
            state.clone()
        };
        tracing::info!(email, "calendar linked");
        self.emit_status(&snapshot);
    }

    /// Explicit user unlink: clears the credential store and all flags
    /// except the intro marker.
    pub fn unlink(&self) {
        credential_store::clear_credential(self.store.as_ref());
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            state.is_linked = false;
            state.show_relink_banner = false;
            state.last_known_email = None;
            self.persist(&state);
            state.clone()
        };
        tracing::info!("calendar unlinked");
        self.emit_status(&snapshot);
    }

    /// The refresh handshake definitively failed: tear the link down and owe
    /// the user a re-link banner. LinkExpired is momentary; it lands in
    /// Unlinked with the banner flag set.
    pub fn expire(&self) {
        if !self.is_linked() {
            return;
        }
        credential_store::clear_credential(self.store.as_ref());
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            state.is_linked = false;
            state.show_relink_banner = true;
            self.persist(&state);
            state.clone()
        };
        tracing::warn!("calendar link expired, credentials cleared");
        self.emit_status(&snapshot);
    }

    /// The UI acknowledged the re-link banner.
    pub fn dismiss_relink_banner(&self) {
        let mut state = self.state.lock().unwrap();
        state.show_relink_banner = false;
        self.persist(&state);
    }

    /// Repair flag-file/credential-store discrepancies; the credential store
    /// wins. Emits a status event only when something actually changed.
    pub fn reconcile(&self) {
        let has_credential =
            credential_store::load_credential(self.store.as_ref()).is_some();
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            if state.is_linked == has_credential {
                return;
            }
            tracing::warn!(
                flag = state.is_linked,
                credential = has_credential,
                "linking flag out of sync with credential store"
            );
            state.is_linked = has_credential;
            self.persist(&state);
            state.clone()
        };
        self.emit_status(&snapshot);
    }

    /// Emit the current linking status without changing it. Used by the
    /// reconciler when a sync is requested while unlinked, so the UI can
    /// offer onboarding instead of a failure state.
    pub fn signal_status(&self) {
        let snapshot = self.state.lock().unwrap().clone();
        self.emit_status(&snapshot);
    }

    /// Proactive check on app launch/foreground: validate the stored expiry
    /// and refresh only if invalid, so `is_linked` stays accurate without
    /// waiting for a user-initiated sync to discover staleness.
    pub async fn background_check(&self, refresher: &CredentialRefresher) {
        if !self.is_linked() {
            return;
        }

        let expiry = credential_store::stored_expiry(self.store.as_ref());
        if validator::is_usable(expiry, Utc::now(), validator::expiry_buffer()) {
            return;
        }

        match refresher.refresh().await {
            Ok(_) => tracing::debug!("background refresh succeeded"),
            Err(e) if e.is_definitive() || matches!(e, crate::error::OAuthError::Store(_)) => {
                self.expire();
            }
            Err(e) => {
                // Transient: leave the link in place, a later attempt decides.
                tracing::warn!(error = %e, "background refresh failed transiently");
            }
        }
    }

    fn persist(&self, state: &LinkingState) {
        match serde_json::to_string_pretty(state) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    tracing::warn!(error = %e, "failed to persist linking state");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode linking state"),
        }
    }

    fn emit_status(&self, state: &LinkingState) {
        self.events.emit(Event::LinkingStatusChanged {
            is_linked: state.is_linked,
            email: state.last_known_email.clone(),
            at: Utc::now(),
        });
    }
}
