use clap::Subcommand;
use studyflow::StudyEngine;
use studyflow::models::NewQuestion;

use super::CommandResult;
use crate::output::{self, OutputConfig};

/// Diagnostic test commands
#[derive(Subcommand, Debug)]
pub enum DiagnosticCommands {
    /// Create the diagnostic test of an event, or return the existing one
    Create {
        /// The event ID
        event_id: String,
        #[clap(long)]
        title: Option<String>,
    },
    /// Add an answered question
    AddQuestion {
        /// The test ID
        test_id: String,
        /// Question number; continues the sequence when omitted
        #[clap(long)]
        number: Option<i32>,
        #[clap(long)]
        question: String,
        #[clap(long)]
        correct: String,
        /// The answer that was given
        #[clap(long, default_value = "")]
        answer: String,
        #[clap(long, default_value = "")]
        topic: String,
    },
    /// Analyze the answers
    Analyze {
        /// The test ID
        test_id: String,
    },
    /// Show a test with its questions and analysis
    Show {
        /// The test ID
        test_id: String,
    },
}

/// Executes a diagnostic command
pub async fn execute(engine: &StudyEngine, user: &str, cmd: DiagnosticCommands, config: &OutputConfig) -> CommandResult {
    match cmd {
        DiagnosticCommands::Create { event_id, title } => {
            let test = engine.create_diagnostic(user, &event_id, title.as_deref())?;
            output::print_diagnostic_test(&test, config);
        }
        DiagnosticCommands::AddQuestion {
            test_id,
            number,
            question,
            correct,
            answer,
            topic,
        } => {
            let fields = NewQuestion {
                question_number: number,
                question_text: question,
                correct_answer: correct,
                user_answer: answer,
                topic,
            };
            let question = engine.add_question(user, &test_id, fields)?;
            output::print_question(&question, config);
        }
        DiagnosticCommands::Analyze { test_id } => {
            let outcome = engine.analyze_diagnostic(user, &test_id).await?;
            output::print_analysis(&outcome, config);
        }
        DiagnosticCommands::Show { test_id } => {
            let report = engine.show_diagnostic(user, &test_id)?;
            output::print_report(&report, config);
        }
    }
    Ok(())
}
