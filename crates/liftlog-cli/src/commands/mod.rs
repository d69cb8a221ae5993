pub mod auth;
pub mod config;
pub mod events;
pub mod sync;

use std::sync::Arc;

use liftlog_core::auth::{CredentialStore, KeyringStore, LinkingManager};
use liftlog_core::events::EventBus;
use liftlog_core::storage;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Shared wiring for every subcommand that touches credentials.
pub fn linking_manager(
    store: Arc<dyn CredentialStore>,
) -> Result<Arc<LinkingManager>, Box<dyn std::error::Error>> {
    let events = Arc::new(EventBus::new());
    Ok(Arc::new(LinkingManager::load(
        storage::linking_file()?,
        store,
        events,
    )))
}

pub fn credential_store() -> Arc<dyn CredentialStore> {
    Arc::new(KeyringStore::new())
}
