use clap::Subcommand;
use liftlog_core::auth::OAuthFlow;
use liftlog_core::config::Config;

use super::CliResult;

#[derive(Subcommand)]
pub enum AuthAction {
    /// Google Calendar: login / logout / status
    Google {
        #[command(subcommand)]
        action: AuthOp,
    },
}

#[derive(Subcommand)]
pub enum AuthOp {
    /// Sign in through the browser and link the calendar
    Login {
        /// OAuth client ID
        #[arg(long)]
        client_id: String,
        /// OAuth client secret
        #[arg(long)]
        client_secret: String,
    },
    /// Remove credentials and unlink
    Logout,
    /// Check linking status
    Status,
}

pub async fn run(action: AuthAction) -> CliResult {
    match action {
        AuthAction::Google { action } => google(action).await,
    }
}

async fn google(op: AuthOp) -> CliResult {
    let store = super::credential_store();
    let linking = super::linking_manager(store.clone())?;

    match op {
        AuthOp::Login {
            client_id,
            client_secret,
        } => {
            OAuthFlow::store_client(store.as_ref(), &client_id, &client_secret)?;
            let config = Config::load();
            let flow = OAuthFlow::new(config.oauth, store);
            let credential = flow.sign_in().await?;
            linking.link(&credential.email);
            if credential.email.is_empty() {
                println!("Calendar linked");
            } else {
                println!("Calendar linked as {}", credential.email);
            }
        }
        AuthOp::Logout => {
            linking.unlink();
            println!("Calendar unlinked");
        }
        AuthOp::Status => {
            let state = linking.state();
            if state.is_linked {
                match state.last_known_email {
                    Some(email) => println!("linked ({email})"),
                    None => println!("linked"),
                }
            } else if state.show_relink_banner {
                println!("link expired; run `liftlog auth google login` to re-link");
            } else {
                println!("not linked");
            }
        }
    }
    Ok(())
}
