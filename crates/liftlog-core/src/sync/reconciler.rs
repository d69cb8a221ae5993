//! Sync reconciliation: create-vs-update decisions and sync-state flags.
//!
//! Per-attempt lifecycle: Idle -> Syncing -> {Synced | Failed}. The
//! reconciler is the only writer of `sync_state` and `remote_event_id`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use crate::auth::executor::AuthExecutor;
use crate::auth::linking::LinkingManager;
use crate::events::{Event, EventBus};
use crate::sync::calendar_client::CalendarClient;
use crate::sync::event_mapper::to_remote_event;
use crate::sync::types::SyncError;
use crate::workout::{SyncState, WorkoutSession};

/// Result of one reconciliation attempt.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The remote event reflects the session.
    Synced,
    /// The attempt failed; the session keeps its data and may be retried.
    Failed(SyncError),
    /// The user never linked a calendar; no network call was made.
    NotLinked,
    /// A sync for this session is already running; this request was ignored.
    AlreadyInFlight,
}

/// Orchestrates session syncs through the authenticated call executor.
pub struct SyncReconciler {
    executor: AuthExecutor,
    client: CalendarClient,
    linking: Arc<LinkingManager>,
    events: Arc<EventBus>,
    color_id: String,
    /// Session ids with a sync currently in flight. Guarantees at most one
    /// attempt per entity; attempts for different entities run freely.
    in_flight: Mutex<HashSet<Uuid>>,
}

impl SyncReconciler {
    pub fn new(
        executor: AuthExecutor,
        client: CalendarClient,
        linking: Arc<LinkingManager>,
        events: Arc<EventBus>,
        color_id: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            client,
            linking,
            events,
            color_id: color_id.into(),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Mirror `session` to the remote calendar.
    ///
    /// No `remote_event_id` means create (the returned id is stored on
    /// success); a present id means update. On failure the session flips to
    /// `Failed` with its id untouched -- never a fabricated identifier.
    pub async fn sync_session(&self, session: &mut WorkoutSession) -> SyncOutcome {
        if !self.linking.is_linked() {
            // Never linked is not a failure: leave the entity NotSynced and
            // let the UI offer onboarding.
            session.sync_state = SyncState::NotSynced;
            self.linking.signal_status();
            return SyncOutcome::NotLinked;
        }

        let Some(_in_flight) = self.begin(session.id) else {
            tracing::debug!(session_id = %session.id, "sync already in flight, ignoring");
            return SyncOutcome::AlreadyInFlight;
        };

        session.sync_state = SyncState::Syncing;
        self.events.emit(Event::SyncStarted {
            session_id: session.id,
            at: Utc::now(),
        });

        let event = to_remote_event(session, &self.color_id);
        let result = match session.remote_event_id.clone() {
            None => {
                let client = &self.client;
                let ev = &event;
                self.executor
                    .execute(|token| async move {
                        client.create_event(&token, ev).await.map(Some)
                    })
                    .await
            }
            Some(id) => {
                let client = &self.client;
                let ev = &event;
                let id = id.as_str();
                // Borrow note: closures run at most twice within this await.
                self.executor
                    .execute(|token| async move {
                        client.update_event(&token, id, ev).await.map(|()| None)
                    })
                    .await
            }
        };

        let outcome = match result {
            Ok(created_id) => {
                if let Some(id) = created_id {
                    session.remote_event_id = Some(id);
                }
                session.sync_state = SyncState::Synced;
                tracing::info!(session_id = %session.id, "session synced");
                SyncOutcome::Synced
            }
            Err(err) => {
                session.sync_state = SyncState::Failed;
                tracing::warn!(session_id = %session.id, error = %err, "sync failed");
                if err.severs_link() {
                    self.linking.expire();
                }
                SyncOutcome::Failed(err)
            }
        };

        self.events.emit(Event::SyncFinished {
            session_id: session.id,
            success: matches!(outcome, SyncOutcome::Synced),
            at: Utc::now(),
        });
        outcome
    }

    /// Claim the per-entity slot; `None` if a sync for `id` is already
    /// running. The guard frees the slot when dropped, so a sync future
    /// abandoned mid-flight cannot wedge its entity.
    pub(crate) fn begin(&self, id: Uuid) -> Option<InFlightGuard<'_>> {
        if self.in_flight.lock().unwrap().insert(id) {
            Some(InFlightGuard {
                reconciler: self,
                id,
            })
        } else {
            None
        }
    }
}

pub(crate) struct InFlightGuard<'a> {
    reconciler: &'a SyncReconciler,
    id: Uuid,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.reconciler.in_flight.lock().unwrap().remove(&self.id);
    }
}
