use clap::Subcommand;
use studyflow::StudyEngine;
use studyflow::models::SuggestionStatus;

use super::CommandResult;
use crate::output::{self, OutputConfig};

/// Plan adjustment suggestion commands
#[derive(Subcommand, Debug)]
pub enum SuggestionCommands {
    /// List suggestions; pending ones by default
    List {
        /// pending, accepted or rejected
        #[clap(long, conflicts_with = "all")]
        status: Option<SuggestionStatus>,
        /// Every suggestion regardless of status
        #[clap(long)]
        all: bool,
    },
    /// Show a suggestion and its adjustments
    Show {
        /// The suggestion ID
        id: String,
    },
    /// Apply every adjustment of a pending suggestion
    Accept {
        /// The suggestion ID
        id: String,
        #[clap(long, default_value = "")]
        notes: String,
    },
    /// Decline a pending suggestion
    Reject {
        /// The suggestion ID
        id: String,
        #[clap(long, default_value = "")]
        notes: String,
    },
}

/// Executes a suggestion command
pub async fn execute(engine: &StudyEngine, user: &str, cmd: SuggestionCommands, config: &OutputConfig) -> CommandResult {
    match cmd {
        SuggestionCommands::List { status, all } => {
            let filter = if all { None } else { Some(status.unwrap_or(SuggestionStatus::Pending)) };
            let suggestions = engine.suggestions(user, filter)?;
            output::print_suggestions(&suggestions, config);
        }
        SuggestionCommands::Show { id } => {
            let suggestion = engine.suggestion(user, &id)?;
            output::print_suggestion(&suggestion, config);
        }
        SuggestionCommands::Accept { id, notes } => {
            let suggestion = engine.accept_suggestion(user, &id, &notes)?;
            output::print_suggestion(&suggestion, config);
        }
        SuggestionCommands::Reject { id, notes } => {
            let suggestion = engine.reject_suggestion(user, &id, &notes)?;
            output::print_suggestion(&suggestion, config);
        }
    }
    Ok(())
}
