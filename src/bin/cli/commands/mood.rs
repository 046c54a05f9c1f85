use clap::Subcommand;
use studyflow::StudyEngine;
use studyflow::models::{Level, MoodLevels};

use super::CommandResult;
use crate::output::{self, OutputConfig};

/// Emotional check-in commands
#[derive(Subcommand, Debug)]
pub enum MoodCommands {
    /// Log how you feel; a self-report may shorten today's sessions
    Log {
        /// low, medium or high
        #[clap(long)]
        energy: Level,
        /// low, medium or high
        #[clap(long)]
        stress: Level,
        /// low, medium or high
        #[clap(long)]
        focus: Level,
        /// What prompted the check-in
        #[clap(long, default_value = "")]
        context: String,
        /// Session the check-in relates to
        #[clap(long)]
        session: Option<String>,
        /// Record an inferred state instead of a self-report
        #[clap(long)]
        inferred: bool,
    },
    /// Average state over recent days
    Recent {
        #[clap(long, default_value_t = 7)]
        days: i64,
    },
}

/// Executes a mood command
pub async fn execute(engine: &StudyEngine, user: &str, cmd: MoodCommands, config: &OutputConfig) -> CommandResult {
    match cmd {
        MoodCommands::Log {
            energy,
            stress,
            focus,
            context,
            session,
            inferred,
        } => {
            let levels = MoodLevels { energy, stress, focus };
            if inferred {
                let log = engine.record_inferred_mood(user, levels, &context, session)?;
                output::print_success(&format!("Recorded inferred state {}", log.get_id()), config);
            } else {
                let logged = engine.log_mood(user, levels, &context, session).await?;
                output::print_mood_logged(&logged, config);
            }
        }
        MoodCommands::Recent { days } => {
            let state = engine.recent_state(user, days)?;
            output::print_recent_state(state.as_ref(), config);
        }
    }
    Ok(())
}
