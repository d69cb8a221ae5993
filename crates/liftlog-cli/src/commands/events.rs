use clap::Subcommand;
use liftlog_core::auth::{AuthExecutor, CredentialRefresher};
use liftlog_core::config::Config;
use liftlog_core::sync::{from_description, CalendarClient};

use super::CliResult;

#[derive(Subcommand)]
pub enum EventsAction {
    /// List recent calendar events, decoding workout descriptions
    List {
        /// How many days back to look
        #[arg(long, default_value_t = 30)]
        days: i64,
    },
}

pub async fn run(action: EventsAction) -> CliResult {
    match action {
        EventsAction::List { days } => list(days).await,
    }
}

async fn list(days: i64) -> CliResult {
    let config = Config::load();
    let store = super::credential_store();
    let linking = super::linking_manager(store.clone())?;
    if !linking.is_linked() {
        return Err("calendar not linked; run `liftlog auth google login` first".into());
    }

    let refresher = CredentialRefresher::new(config.oauth.token_url.clone(), store.clone());
    let executor = AuthExecutor::new(store, refresher);
    let client = CalendarClient::new(config.calendar.base_url.clone());

    let time_max = chrono::Utc::now();
    let time_min = time_max - chrono::Duration::days(days);
    let max_results = config.sync.max_results;

    let events = executor
        .execute(|token| {
            let client = &client;
            async move {
                client
                    .list_events(&token, time_min, time_max, max_results)
                    .await
            }
        })
        .await?;

    if events.is_empty() {
        println!("no events in the last {days} days");
        return Ok(());
    }

    for event in events {
        let start = event
            .start
            .as_ref()
            .and_then(|s| s.date_time.clone().or_else(|| s.date.clone()))
            .unwrap_or_default();
        println!(
            "{start}  {}  [{}]",
            event.summary.as_deref().unwrap_or("(no title)"),
            event.id,
        );
        if let Some(entry) = event.description.as_deref().and_then(from_description) {
            println!(
                "    {} {}kg x {} sets x {} reps",
                entry.name, entry.weight, entry.sets, entry.reps
            );
        }
    }
    Ok(())
}
