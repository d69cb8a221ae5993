//! Workout session records as exchanged with the external persistence store.
//!
//! The UI layer owns creation and deletion of these records; the engine only
//! mutates `sync_state` and `remote_event_id` through the reconciler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome flag of the last sync attempt for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Never synced, or sync skipped because the calendar is not linked.
    #[default]
    NotSynced,
    /// A sync attempt is in flight.
    Syncing,
    /// The remote event reflects this record.
    Synced,
    /// The last attempt failed; a later retry may succeed.
    Failed,
}

/// One exercise performed within a session.
///
/// Treated as an immutable value once embedded in a textual export; the UI
/// mutates it in place but the engine only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseEntry {
    pub name: String,
    /// Weight in kilograms.
    pub weight: f64,
    pub reps: u32,
    pub sets: u32,
}

/// One day's training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub exercise_entries: Vec<ExerciseEntry>,
    /// Set only after a confirmed successful create; its presence is the
    /// sole signal used to choose create vs. update.
    #[serde(default)]
    pub remote_event_id: Option<String>,
    #[serde(default)]
    pub sync_state: SyncState,
}

impl WorkoutSession {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time,
            end_time,
            exercise_entries: Vec::new(),
            remote_event_id: None,
            sync_state: SyncState::NotSynced,
        }
    }
}
