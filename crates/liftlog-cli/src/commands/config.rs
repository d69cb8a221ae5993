use clap::Subcommand;
use liftlog_core::config::Config;
use liftlog_core::sync::event_mapper::COLOR_PALETTE;

use super::CliResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Set the calendar event color ("1".."11")
    SetColor { id: String },
}

pub fn run(action: ConfigAction) -> CliResult {
    match action {
        ConfigAction::Show => {
            let config = Config::load();
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        ConfigAction::SetColor { id } => {
            if !COLOR_PALETTE.contains(&id.as_str()) {
                return Err(format!("'{id}' is not a palette color (1..11)").into());
            }
            let mut config = Config::load();
            config.calendar.color_id = id.clone();
            config.save()?;
            println!("event color set to {id}");
            Ok(())
        }
    }
}
