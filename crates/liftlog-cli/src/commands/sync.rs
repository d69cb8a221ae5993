use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Subcommand;
use liftlog_core::auth::{AuthExecutor, CredentialRefresher};
use liftlog_core::config::Config;
use liftlog_core::events::EventBus;
use liftlog_core::sync::{CalendarClient, SyncOutcome, SyncReconciler};
use liftlog_core::workout::WorkoutSession;

use super::CliResult;

#[derive(Subcommand)]
pub enum SyncAction {
    /// Reconcile one workout session file against the calendar
    Run {
        /// Path to a workout session JSON file; updated in place
        #[arg(long)]
        file: PathBuf,
    },
}

pub async fn run(action: SyncAction) -> CliResult {
    match action {
        SyncAction::Run { file } => sync_file(&file).await,
    }
}

async fn sync_file(path: &Path) -> CliResult {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    let mut session: WorkoutSession = serde_json::from_str(&content)
        .map_err(|e| format!("not a workout session file: {e}"))?;

    let config = Config::load();
    let store = super::credential_store();
    let linking = super::linking_manager(store.clone())?;
    let refresher = CredentialRefresher::new(config.oauth.token_url.clone(), store.clone());
    let executor = AuthExecutor::new(store, refresher);
    let client = CalendarClient::new(config.calendar.base_url.clone());
    let reconciler = SyncReconciler::new(
        executor,
        client,
        linking,
        Arc::new(EventBus::new()),
        config.calendar.color_id.clone(),
    );

    let outcome = reconciler.sync_session(&mut session).await;

    // The file reflects the attempt's result even on failure.
    std::fs::write(path, serde_json::to_string_pretty(&session)?)?;

    match outcome {
        SyncOutcome::Synced => {
            match &session.remote_event_id {
                Some(id) => println!("synced: event {id}"),
                None => println!("synced"),
            }
            Ok(())
        }
        SyncOutcome::NotLinked => {
            Err("calendar not linked; run `liftlog auth google login` first".into())
        }
        SyncOutcome::AlreadyInFlight => Err("a sync for this session is already running".into()),
        SyncOutcome::Failed(err) => Err(err.into()),
    }
}
