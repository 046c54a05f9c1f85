use chrono::{DateTime, Utc};
use clap::Subcommand;
use studyflow::StudyEngine;
use studyflow::models::{EventType, EventUpdate, Level, NewEvent};

use super::{CommandResult, parse_when};
use crate::output::{self, OutputConfig};

/// Event management commands
#[derive(Subcommand, Debug)]
pub enum EventCommands {
    /// Create an event and plan its study sessions
    Create {
        /// Title of the event
        #[clap(long)]
        title: String,
        /// exam, quiz, assignment, presentation or extracurricular
        #[clap(long = "type", default_value = "exam")]
        event_type: EventType,
        /// Date (YYYY-MM-DD) or RFC 3339 timestamp
        #[clap(long, value_parser = parse_when)]
        date: DateTime<Utc>,
        /// Subject area
        #[clap(long)]
        subject: String,
        /// low, medium or high
        #[clap(long, default_value = "medium")]
        priority: Level,
        /// Preparation budget in hours
        #[clap(long)]
        prep_hours: f64,
        #[clap(long)]
        description: Option<String>,
    },
    /// Edit an event; changing its planning fields regenerates pending sessions
    Update {
        /// The event ID
        id: String,
        #[clap(long)]
        title: Option<String>,
        #[clap(long = "type")]
        event_type: Option<EventType>,
        #[clap(long, value_parser = parse_when)]
        date: Option<DateTime<Utc>>,
        #[clap(long)]
        subject: Option<String>,
        #[clap(long)]
        priority: Option<Level>,
        #[clap(long)]
        prep_hours: Option<f64>,
        #[clap(long)]
        description: Option<String>,
    },
    /// Delete an event with all its sessions, tests and suggestions
    Delete {
        /// The event ID
        id: String,
    },
    /// List all events
    List,
    /// Show an event and its progress
    Show {
        /// The event ID
        id: String,
    },
    /// Regenerate the pending sessions of an event
    Replan {
        /// The event ID
        id: String,
        /// Ask the advisor again instead of reusing a cached plan
        #[clap(long)]
        force: bool,
    },
}

/// Executes an event command
pub async fn execute(engine: &StudyEngine, user: &str, cmd: EventCommands, config: &OutputConfig) -> CommandResult {
    match cmd {
        EventCommands::Create {
            title,
            event_type,
            date,
            subject,
            priority,
            prep_hours,
            description,
        } => {
            let fields = NewEvent {
                title,
                event_type,
                event_date: date,
                subject,
                priority,
                prep_hours,
                description,
            };
            let planned = engine.create_event(user, fields).await?;
            output::print_planned_event(&planned, config);
        }
        EventCommands::Update {
            id,
            title,
            event_type,
            date,
            subject,
            priority,
            prep_hours,
            description,
        } => {
            let update = EventUpdate {
                title,
                event_type,
                event_date: date,
                subject,
                priority,
                prep_hours,
                description,
            };
            let planned = engine.update_event(user, &id, update).await?;
            output::print_planned_event(&planned, config);
        }
        EventCommands::Delete { id } => {
            engine.delete_event(user, &id)?;
            output::print_success(&format!("Deleted event {}", id), config);
        }
        EventCommands::List => {
            let events = engine.events(user)?;
            output::print_events(&events, config);
        }
        EventCommands::Show { id } => {
            let event = engine.event(user, &id)?;
            let progress = engine.event_progress(user, &id)?;
            output::print_event(&event, &progress, config);
        }
        EventCommands::Replan { id, force } => {
            let planned = engine.replan_event(user, &id, force).await?;
            output::print_planned_event(&planned, config);
        }
    }
    Ok(())
}
