//! Calendar synchronization layer.
//!
//! Maps workout sessions onto remote calendar events with idempotent
//! create/update semantics. All network calls go through the authenticated
//! call executor, which owns the single refresh-and-retry policy.

pub mod calendar_client;
pub mod event_mapper;
pub mod reconciler;
pub mod types;


pub use calendar_client::{ApiError, CalendarClient, FetchedEvent};
pub use event_mapper::{from_description, to_remote_event, RemoteEvent};
pub use reconciler::{SyncOutcome, SyncReconciler};
pub use types::SyncError;
