use clap::ValueEnum;
use serde::Serialize;
use studyflow::diagnostics::{AnalysisOutcome, DiagnosticReport};
use studyflow::emotional::{MoodLogged, RecentState};
use studyflow::gate::DiagnosticAnalysis;
use studyflow::models::{AdjustmentSuggestion, DiagnosticQuestion, DiagnosticTest, Event, Session, UserPreferences};
use studyflow::planner::PlannedEvent;
use studyflow::tracker::{DailyLoad, FocusUpdate, SessionUpdate};
use studyflow::EventProgress;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

/// Bundled output configuration passed to all print functions
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    /// The output format
    pub format: OutputFormat,
    /// When true, print minimal output (just IDs)
    pub quiet: bool,
}

/// Prints any serializable value as pretty JSON
fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: could not encode output: {}", e),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn print_session_row(session: &Session) {
    let focus = session.get_focus_mode().unwrap_or_default();
    println!(
        "{}  {} {}  {:>3} min  {:<11}  {}{}",
        session.get_id(),
        session.get_date(),
        session.get_start_time().format("%H:%M"),
        session.get_duration_minutes(),
        session.get_status(),
        session.title(),
        if focus.is_empty() { String::new() } else { format!("  [{}]", focus) },
    );
}

/// Prints a list of events in the specified format
pub fn print_events(events: &[Event], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if events.is_empty() {
                if !config.quiet {
                    println!("No events found.");
                }
                return;
            }
            for event in events {
                if config.quiet {
                    println!("{}", event.get_id());
                    continue;
                }
                println!(
                    "{}  {}  {:<12}  {}",
                    event.get_id(),
                    event.get_event_date().format("%Y-%m-%d"),
                    event.get_event_type(),
                    event.get_title()
                );
            }
        }
        OutputFormat::Json => print_json(events),
    }
}

/// Prints a single event with its progress
pub fn print_event(event: &Event, progress: &EventProgress, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", event.get_id());
                return;
            }
            println!("ID:         {}", event.get_id());
            println!("Title:      {}", event.get_title());
            println!("Type:       {}", event.get_event_type());
            println!("Date:       {}", event.get_event_date());
            println!("Subject:    {}", event.get_subject());
            println!("Priority:   {}", event.get_priority());
            println!("Prep hours: {}", event.get_prep_hours());
            if let Some(description) = event.get_description() {
                println!("About:      {}", description);
            }
            println!(
                "Progress:   {}/{} completed ({}%), {} skipped, {} days left{}",
                progress.completed,
                progress.total_sessions,
                progress.completion_percentage,
                progress.skipped,
                progress.days_until,
                if progress.is_at_risk { ", AT RISK" } else { "" }
            );
        }
        OutputFormat::Json => print_json(&serde_json::json!({ "event": event, "progress": progress })),
    }
}

/// Prints an event with the sessions a planning step produced
pub fn print_planned_event(planned: &PlannedEvent, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", planned.event.get_id());
                return;
            }
            println!("Event {}: {}", planned.event.get_id(), planned.event.get_title());
            match planned.source {
                Some(source) => {
                    let source = serde_json::to_value(source)
                        .ok()
                        .and_then(|v| v.as_str().map(str::to_string))
                        .unwrap_or_default();
                    println!(
                        "Planned {} sessions ({} plan, {} replaced):",
                        planned.sessions.len(),
                        source,
                        planned.removed
                    );
                    for session in &planned.sessions {
                        print_session_row(session);
                    }
                }
                None => println!("Plan unchanged."),
            }
        }
        OutputFormat::Json => print_json(planned),
    }
}

/// Prints a list of sessions in the specified format
pub fn print_sessions(sessions: &[Session], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if sessions.is_empty() {
                if !config.quiet {
                    println!("No sessions found.");
                }
                return;
            }
            for session in sessions {
                if config.quiet {
                    println!("{}", session.get_id());
                } else {
                    print_session_row(session);
                }
            }
        }
        OutputFormat::Json => print_json(sessions),
    }
}

/// Prints a single session in full
pub fn print_session(session: &Session, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", session.get_id());
                return;
            }
            println!("ID:       {}", session.get_id());
            println!("Event:    {}", session.get_event_id());
            println!("When:     {} {}", session.get_date(), session.get_start_time().format("%H:%M"));
            println!("Planned:  {} min", session.get_duration_minutes());
            println!("Status:   {}", session.get_status());
            if let Some(actual) = session.get_actual_duration_minutes() {
                println!("Actual:   {} min", actual);
            }
            if let Some(mode) = session.get_focus_mode() {
                println!("Focus:    {}", mode);
            }
            if let Some(notes) = session.get_notes() {
                println!("Notes:    {}", notes);
            }
            println!();
            println!("{}", session.get_suggested_content());
        }
        OutputFormat::Json => print_json(session),
    }
}

fn print_new_suggestion(suggestion: Option<&AdjustmentSuggestion>) {
    if let Some(suggestion) = suggestion {
        println!(
            "New suggestion {} ({}): {}",
            suggestion.get_id(),
            suggestion.get_triggered_by(),
            suggestion.get_rationale()
        );
    }
}

pub fn print_session_update(update: &SessionUpdate, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", update.session.get_id());
                return;
            }
            print_session_row(&update.session);
            print_new_suggestion(update.suggestion.as_ref());
        }
        OutputFormat::Json => print_json(update),
    }
}

pub fn print_focus_update(update: &FocusUpdate, load: &DailyLoad, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", update.focused_minutes);
                return;
            }
            println!(
                "{} focus minutes on {}{}",
                update.focused_minutes,
                update.session.title(),
                if update.auto_completed { " (completed)" } else { "" }
            );
            print_new_suggestion(update.suggestion.as_ref());
            if let Some(message) = &load.message {
                println!("{}", message);
            }
            println!("Take a {}-minute break.", load.recommended_break_minutes);
        }
        OutputFormat::Json => print_json(&serde_json::json!({ "update": update, "daily_load": load })),
    }
}

pub fn print_daily_load(load: &DailyLoad, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            println!(
                "{}: {}/{} min ({}%) in {} intervals",
                load.date, load.focused_minutes, load.capacity_minutes, load.percent, load.intervals
            );
            if let Some(message) = &load.message {
                println!("{}", message);
            }
        }
        OutputFormat::Json => print_json(load),
    }
}

pub fn print_mood_logged(logged: &MoodLogged, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", logged.log.get_id());
                return;
            }
            if let Some(notice) = &logged.notice {
                println!("{}", notice);
                return;
            }
            println!("Check-in recorded.");
            if !logged.adjusted.is_empty() {
                println!("Shortened {} of today's sessions:", logged.adjusted.len());
                for session in &logged.adjusted {
                    print_session_row(session);
                }
            }
            for suggestion in &logged.suggestions {
                print_new_suggestion(Some(suggestion));
            }
        }
        OutputFormat::Json => print_json(logged),
    }
}

pub fn print_recent_state(state: Option<&RecentState>, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => match state {
            Some(state) => {
                println!(
                    "energy {}, stress {}, focus {} over {} entries",
                    state.levels.energy, state.levels.stress, state.levels.focus, state.entries
                );
                if state.needs_attention {
                    println!("Consider a lighter schedule.");
                }
            }
            None => println!("No check-ins in this window."),
        },
        OutputFormat::Json => print_json(&state),
    }
}

pub fn print_diagnostic_test(test: &DiagnosticTest, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", test.get_id());
                return;
            }
            println!("Diagnostic {}: {} (event {})", test.get_id(), test.get_title(), test.get_event_id());
        }
        OutputFormat::Json => print_json(test),
    }
}

pub fn print_question(question: &DiagnosticQuestion, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", question.get_question_number());
                return;
            }
            println!(
                "Q{} {}: {}",
                question.get_question_number(),
                if question.is_correct() { "correct" } else { "incorrect" },
                question.get_question_text()
            );
        }
        OutputFormat::Json => print_json(question),
    }
}

fn print_analysis_body(analysis: &DiagnosticAnalysis) {
    println!(
        "Score: {}% ({}/{})",
        analysis.score_percentage, analysis.correct, analysis.total_questions
    );
    for group in &analysis.error_groups {
        let numbers: Vec<String> = group.question_numbers.iter().map(|n| n.to_string()).collect();
        println!(
            "  {:<16} {} errors (Q{}){}",
            group.topic,
            group.error_count,
            numbers.join(", Q"),
            group.severity.map(|s| format!(", severity {}", s)).unwrap_or_default()
        );
    }
    println!("{}", analysis.summary);
}

pub fn print_analysis(outcome: &AnalysisOutcome, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            print_analysis_body(&outcome.analysis);
            print_new_suggestion(outcome.suggestion.as_ref());
        }
        OutputFormat::Json => print_json(outcome),
    }
}

pub fn print_report(report: &DiagnosticReport, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            println!("{} ({} questions)", report.test.get_title(), report.questions.len());
            for question in &report.questions {
                print_question(question, config);
            }
            match &report.analysis {
                Some(analysis) => print_analysis_body(analysis),
                None => println!("Not analyzed yet."),
            }
        }
        OutputFormat::Json => print_json(report),
    }
}

pub fn print_suggestions(suggestions: &[AdjustmentSuggestion], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if suggestions.is_empty() {
                if !config.quiet {
                    println!("No suggestions found.");
                }
                return;
            }
            for suggestion in suggestions {
                if config.quiet {
                    println!("{}", suggestion.get_id());
                    continue;
                }
                println!(
                    "{}  {:<8}  {:<28}  event {}",
                    suggestion.get_id(),
                    suggestion.get_status(),
                    suggestion.get_triggered_by(),
                    short_id(&suggestion.get_event_id())
                );
            }
        }
        OutputFormat::Json => print_json(suggestions),
    }
}

pub fn print_suggestion(suggestion: &AdjustmentSuggestion, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", suggestion.get_id());
                return;
            }
            println!("ID:        {}", suggestion.get_id());
            println!("Event:     {}", suggestion.get_event_id());
            println!("Triggered: {} at {}", suggestion.get_triggered_by(), suggestion.get_triggered_at());
            println!("Status:    {}", suggestion.get_status());
            println!("Rationale: {}", suggestion.get_rationale());
            match suggestion.parsed_adjustments() {
                Ok(adjustments) => {
                    for adjustment in adjustments {
                        let detail = adjustment
                            .new_duration_minutes
                            .map(|m| format!("{} min", m))
                            .or(adjustment.new_focus_mode.clone())
                            .or(adjustment.new_position.map(|p| format!("position {}", p)))
                            .unwrap_or_default();
                        println!("  - {} {} {}", adjustment.action, short_id(&adjustment.target), detail);
                    }
                }
                Err(e) => println!("  (adjustments unreadable: {})", e),
            }
        }
        OutputFormat::Json => print_json(suggestion),
    }
}

pub fn print_preferences(prefs: &UserPreferences, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            let mode = prefs.focus_mode();
            println!("Daily capacity: {} min", prefs.get_daily_capacity_minutes());
            println!(
                "Focus mode:     {} ({} min focus, {} min break)",
                mode.name, mode.focus_minutes, mode.break_minutes
            );
            println!(
                "Load alerts:    {}",
                if prefs.get_enable_overload_alerts() { "on" } else { "off" }
            );
        }
        OutputFormat::Json => print_json(prefs),
    }
}

/// Prints a success message
pub fn print_success(message: &str, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if !config.quiet {
                println!("{}", message);
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({ "message": message })),
    }
}
