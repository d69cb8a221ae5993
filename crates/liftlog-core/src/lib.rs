//! # LiftLog Core Library
//!
//! Core engine for LiftLog: records strength-training sessions and mirrors
//! them as events on the user's Google Calendar. The UI and the local
//! persistence store are external collaborators; this crate owns the parts
//! with real protocol and failure-handling complexity:
//!
//! - **Credential lifecycle**: OS-keyring credential store, fail-closed
//!   expiry validation, token refresh, and a call executor that performs at
//!   most one refresh-and-retry cycle per request
//! - **Sync reconciliation**: mapping workout sessions to calendar events
//!   with idempotent create/update semantics and a recoverable failure state
//! - **Linking state machine**: tracks whether calendar access is granted
//!   and reconciles the flag file against the credential store
//!
//! ## Key Components
//!
//! - [`SyncReconciler`]: decides create-vs-update and updates sync flags
//! - [`AuthExecutor`]: wraps bearer-token calls with the retry policy
//! - [`LinkingManager`]: linked/unlinked/expired transitions
//! - [`EventBus`]: typed events consumed by the UI layer

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod storage;
pub mod sync;
pub mod workout;

pub use auth::credential_store::{Credential, CredentialStore, KeyringStore, MemoryStore};
pub use auth::executor::AuthExecutor;
pub use auth::linking::{LinkingManager, LinkingState};
pub use auth::refresher::CredentialRefresher;
pub use config::Config;
pub use error::{OAuthError, StoreError};
pub use events::{Event, EventBus};
pub use sync::calendar_client::CalendarClient;
pub use sync::reconciler::{SyncOutcome, SyncReconciler};
pub use sync::types::SyncError;
pub use workout::{ExerciseEntry, SyncState, WorkoutSession};
