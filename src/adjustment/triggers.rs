use serde::Serialize;

use crate::advisor::{EmotionalSnapshot, completion_percentage};
use crate::gate::DiagnosticAnalysis;
use crate::models::{MoodLevels, Session, SessionStatus};

/// Completed sessions needed before overruns are judged
pub const MIN_COMPLETED_FOR_OVERRUN: usize = 3;
/// A session overruns when it took more than this share of the plan, in percent
pub const OVERRUN_PERCENT: i64 = 120;
/// Skipped sessions needed before skipping is judged
pub const MIN_SKIPPED: usize = 3;
pub const SKIPPED_PERCENT: usize = 30;
/// Diagnostic scores below this fire `low_diagnostic_score`
pub const LOW_SCORE_PERCENT: i32 = 60;

/// A named condition that asks the advisor for a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    TasksOverrunning,
    TasksSkipped,
    EventAtRisk,
    HighStress,
    LowEnergy,
    LowFocus,
    LowDiagnosticScore,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::TasksOverrunning => "tasks_overrunning",
            Trigger::TasksSkipped => "tasks_skipped",
            Trigger::EventAtRisk => "event_at_risk",
            Trigger::HighStress => "high_stress",
            Trigger::LowEnergy => "low_energy",
            Trigger::LowFocus => "low_focus",
            Trigger::LowDiagnosticScore => "low_diagnostic_score",
        }
    }

    /// Whether the trigger comes from execution data rather than a signal
    pub fn is_execution(&self) -> bool {
        matches!(self, Trigger::TasksOverrunning | Trigger::TasksSkipped | Trigger::EventAtRisk)
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input that arrived with the evaluation: a fresh mood log or analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    Emotional(EmotionalSnapshot),
    Diagnostic(DiagnosticAnalysis),
}

/// Joins simultaneous triggers into one label, e.g. `high_stress+low_focus`
pub fn trigger_label(triggers: &[Trigger]) -> String {
    triggers.iter().map(Trigger::as_str).collect::<Vec<_>>().join("+")
}

/// At least half of the completed sessions took more than 1.2 × their plan
pub fn is_overrunning(sessions: &[Session]) -> bool {
    let measured: Vec<(i64, i64)> = sessions
        .iter()
        .filter(|s| s.get_status() == SessionStatus::Completed)
        .filter_map(|s| {
            s.get_actual_duration_minutes()
                .map(|actual| (i64::from(actual), i64::from(s.get_duration_minutes())))
        })
        .collect();
    if measured.len() < MIN_COMPLETED_FOR_OVERRUN {
        return false;
    }
    let over = measured
        .iter()
        .filter(|(actual, planned)| actual * 100 > planned * OVERRUN_PERCENT)
        .count();
    over * 2 >= measured.len()
}

pub fn is_skipping(sessions: &[Session]) -> bool {
    let skipped = sessions.iter().filter(|s| s.get_status() == SessionStatus::Skipped).count();
    skipped >= MIN_SKIPPED && skipped * 100 >= SKIPPED_PERCENT * sessions.len()
}

/// `(days ≤ 2 ∧ completion < 50) ∨ (days ≤ 1 ∧ completion < 80)`
pub fn is_at_risk(days_until: i64, completion_percentage: i32) -> bool {
    (days_until <= 2 && completion_percentage < 50) || (days_until <= 1 && completion_percentage < 80)
}

/// Triggers computed from an event's sessions
pub fn execution_triggers(sessions: &[Session], days_until: i64) -> Vec<Trigger> {
    if sessions.is_empty() {
        return Vec::new();
    }
    let mut triggers = Vec::new();
    if is_overrunning(sessions) {
        triggers.push(Trigger::TasksOverrunning);
    }
    if is_skipping(sessions) {
        triggers.push(Trigger::TasksSkipped);
    }
    let completed = sessions.iter().filter(|s| s.get_status() == SessionStatus::Completed).count() as i32;
    if is_at_risk(days_until, completion_percentage(completed, sessions.len() as i32)) {
        triggers.push(Trigger::EventAtRisk);
    }
    triggers
}

pub fn emotional_triggers(levels: &MoodLevels) -> Vec<Trigger> {
    let mut triggers = Vec::new();
    if levels.is_high_stress() {
        triggers.push(Trigger::HighStress);
    }
    if levels.is_low_energy() {
        triggers.push(Trigger::LowEnergy);
    }
    if levels.is_low_focus() {
        triggers.push(Trigger::LowFocus);
    }
    triggers
}

pub fn signal_triggers(signal: &Signal) -> Vec<Trigger> {
    match signal {
        Signal::Emotional(state) => emotional_triggers(&MoodLevels {
            energy: state.energy,
            stress: state.stress,
            focus: state.focus,
        }),
        Signal::Diagnostic(analysis) if analysis.score_percentage < LOW_SCORE_PERCENT => {
            vec![Trigger::LowDiagnosticScore]
        }
        Signal::Diagnostic(_) => Vec::new(),
    }
}
