use chrono::NaiveDate;
use clap::Subcommand;
use studyflow::StudyEngine;

use super::CommandResult;
use crate::output::{self, OutputConfig};

/// Study session commands
#[derive(Subcommand, Debug)]
pub enum SessionCommands {
    /// List sessions; upcoming ones by default
    List {
        /// Only the sessions of this event
        #[clap(long)]
        event: Option<String>,
        /// Only today's sessions
        #[clap(long, conflicts_with_all = ["event", "overdue"])]
        today: bool,
        /// Sessions whose start has passed without finishing
        #[clap(long, conflicts_with = "event")]
        overdue: bool,
    },
    /// Show a session in full
    Show {
        /// The session ID
        id: String,
    },
    /// Start a session
    Start {
        /// The session ID
        id: String,
    },
    /// Complete the running session
    Complete {
        /// The session ID
        id: String,
        #[clap(long)]
        notes: Option<String>,
    },
    /// Skip a session
    Skip {
        /// The session ID
        id: String,
        #[clap(long)]
        notes: Option<String>,
    },
    /// Postpone a pending session
    Postpone {
        /// The session ID
        id: String,
    },
    /// Record a finished focus interval
    Focus {
        /// The session ID
        id: String,
        /// Length of the interval in minutes
        #[clap(long)]
        minutes: i32,
    },
    /// Show focus time against the daily capacity
    Load {
        /// Local date, today by default
        #[clap(long)]
        date: Option<NaiveDate>,
    },
}

/// Executes a session command
pub async fn execute(engine: &StudyEngine, user: &str, cmd: SessionCommands, config: &OutputConfig) -> CommandResult {
    match cmd {
        SessionCommands::List { event, today, overdue } => {
            let sessions = match (event, today, overdue) {
                (Some(event_id), _, _) => engine.event_sessions(user, &event_id)?,
                (None, true, _) => engine.todays_sessions(user)?,
                (None, false, true) => engine.overdue_sessions(user)?,
                (None, false, false) => engine.upcoming_sessions(user)?,
            };
            output::print_sessions(&sessions, config);
        }
        SessionCommands::Show { id } => {
            let session = engine.session(user, &id)?;
            output::print_session(&session, config);
        }
        SessionCommands::Start { id } => {
            let session = engine.start_session(user, &id).await?;
            output::print_session(&session, config);
        }
        SessionCommands::Complete { id, notes } => {
            let update = engine.complete_session(user, &id, notes).await?;
            output::print_session_update(&update, config);
        }
        SessionCommands::Skip { id, notes } => {
            let update = engine.skip_session(user, &id, notes).await?;
            output::print_session_update(&update, config);
        }
        SessionCommands::Postpone { id } => {
            let session = engine.postpone_session(user, &id)?;
            output::print_session(&session, config);
        }
        SessionCommands::Focus { id, minutes } => {
            let update = engine.record_focus_interval(user, &id, minutes).await?;
            let load = engine.daily_load(user, engine.clock().today())?;
            output::print_focus_update(&update, &load, config);
        }
        SessionCommands::Load { date } => {
            let date = date.unwrap_or_else(|| engine.clock().today());
            let load = engine.daily_load(user, date)?;
            output::print_daily_load(&load, config);
        }
    }
    Ok(())
}
