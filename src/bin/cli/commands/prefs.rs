use clap::Subcommand;
use studyflow::StudyEngine;

use super::CommandResult;
use crate::output::{self, OutputConfig};

/// Preference commands
#[derive(Subcommand, Debug)]
pub enum PrefsCommands {
    /// Show your preferences
    Show,
    /// Change your preferences
    Set {
        /// Study minutes per day, at least 20
        #[clap(long)]
        capacity: Option<i32>,
        /// Pomodoro, Extended or Deep Work
        #[clap(long)]
        focus_mode: Option<String>,
        /// Warn when today's focus time nears the capacity (true or false)
        #[clap(long)]
        overload_alerts: Option<bool>,
    },
}

/// Executes a preferences command
pub fn execute(engine: &StudyEngine, user: &str, cmd: PrefsCommands, config: &OutputConfig) -> CommandResult {
    match cmd {
        PrefsCommands::Show => {
            let prefs = engine.preferences(user)?;
            output::print_preferences(&prefs, config);
        }
        PrefsCommands::Set {
            capacity,
            focus_mode,
            overload_alerts,
        } => {
            let prefs = engine.set_preferences(user, capacity, focus_mode.as_deref(), overload_alerts)?;
            output::print_preferences(&prefs, config);
        }
    }
    Ok(())
}
