//! Diagnostic tests and their analysis
//!
//! Counts, the score and the dominant topic are always computed here from
//! the stored answers. The advisor may add severities, per-question error
//! labels and a summary, but only when it reports the same topics.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::adjustment::Signal;
use crate::advisor::{QuestionSnapshot, completion_percentage};
use crate::engine::StudyEngine;
use crate::errors::{EngineError, EngineResult};
use crate::gate::{DiagnosticAnalysis, ErrorGroup, dominant_topic};
use crate::models::{AdjustmentSuggestion, DiagnosticQuestion, DiagnosticTest, JsonValue, NewQuestion};
use crate::repo;

/// Topic used for incorrect answers without one
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A diagnostic test with its questions and latest analysis
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticReport {
    pub test: DiagnosticTest,
    pub questions: Vec<DiagnosticQuestion>,
    pub analysis: Option<DiagnosticAnalysis>,
}

/// Result of analyzing a test
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub analysis: DiagnosticAnalysis,
    /// Whether advisor labels were merged in
    pub enriched: bool,
    pub suggestion: Option<AdjustmentSuggestion>,
}

/// Deterministic analysis of answered questions
///
/// Incorrect answers are grouped by topic in question order. The score is
/// `⌊100 × correct / total⌋`.
pub fn baseline_analysis(questions: &[QuestionSnapshot]) -> DiagnosticAnalysis {
    let mut ordered: Vec<&QuestionSnapshot> = questions.iter().collect();
    ordered.sort_by_key(|q| q.question_number);

    let mut groups: Vec<ErrorGroup> = Vec::new();
    for question in ordered.iter().filter(|q| !q.is_correct) {
        let topic = match question.topic.trim() {
            "" => UNCATEGORIZED,
            topic => topic,
        };
        match groups.iter_mut().find(|g| g.topic == topic) {
            Some(group) => {
                group.error_count += 1;
                group.question_numbers.push(question.question_number);
            }
            None => groups.push(ErrorGroup {
                topic: topic.to_string(),
                error_count: 1,
                question_numbers: vec![question.question_number],
                severity: None,
            }),
        }
    }

    let total_questions = questions.len() as i32;
    let correct = questions.iter().filter(|q| q.is_correct).count() as i32;
    let score_percentage = completion_percentage(correct, total_questions);
    let dominant_error_topic = dominant_topic(&groups);
    let summary = match &dominant_error_topic {
        Some(topic) => format!("Scored {score_percentage}% ({correct}/{total_questions}). Most errors in {topic}."),
        None => format!("Scored {score_percentage}% ({correct}/{total_questions}). No errors."),
    };

    DiagnosticAnalysis {
        total_questions,
        correct,
        incorrect: total_questions - correct,
        score_percentage,
        error_groups: groups,
        dominant_error_topic,
        summary,
        question_labels: Vec::new(),
    }
}

/// Takes severities, labels and the summary from an advisor analysis
///
/// Returns `None` when the advisor's groups disagree with the baseline on
/// topics, counts or question numbers.
pub fn merge_enrichment(baseline: &DiagnosticAnalysis, enriched: &DiagnosticAnalysis) -> Option<DiagnosticAnalysis> {
    if baseline.error_groups.len() != enriched.error_groups.len() {
        return None;
    }
    let mut merged = baseline.clone();
    for group in &mut merged.error_groups {
        let other = enriched.error_groups.iter().find(|g| g.topic.eq_ignore_ascii_case(&group.topic))?;
        let mut numbers = other.question_numbers.clone();
        numbers.sort_unstable();
        if other.error_count != group.error_count || numbers != group.question_numbers {
            return None;
        }
        group.severity = other.severity;
    }

    let incorrect: Vec<i32> = merged
        .error_groups
        .iter()
        .flat_map(|g| g.question_numbers.iter().copied())
        .collect();
    merged.question_labels = enriched
        .question_labels
        .iter()
        .filter(|label| incorrect.contains(&label.question_number))
        .copied()
        .collect();
    if !enriched.summary.trim().is_empty() {
        merged.summary = enriched.summary.trim().to_string();
    }
    Some(merged)
}

fn encode(analysis: &DiagnosticAnalysis) -> EngineResult<JsonValue> {
    JsonValue::from_serializable(analysis).map_err(|e| EngineError::Storage(e.into()))
}

impl StudyEngine {
    /// Returns the event's diagnostic test, creating it on first use
    #[instrument(skip(self, title), fields(owner = %owner, event_id = %event_id))]
    pub fn create_diagnostic(&self, owner: &str, event_id: &str, title: Option<&str>) -> EngineResult<DiagnosticTest> {
        let event = self.event(owner, event_id)?;
        if let Some(existing) = repo::get_diagnostic_test_for_event(&self.pool, owner, &event.get_id())? {
            return Ok(existing);
        }
        let default_title = format!("Diagnostic: {}", event.get_title());
        let test = DiagnosticTest::new(&event.get_id(), owner, title.unwrap_or(&default_title), self.clock.now())?;
        repo::create_diagnostic_test(&self.pool, &test)?;
        info!(test_id = %test.get_id(), "Diagnostic test created");
        Ok(test)
    }

    /// Adds an answered question; a missing number continues the sequence
    ///
    /// ### Errors
    ///
    /// `InvariantViolation` when the number is already taken or a required
    /// field is empty
    #[instrument(skip(self, fields), fields(owner = %owner, test_id = %test_id))]
    pub fn add_question(&self, owner: &str, test_id: &str, fields: NewQuestion) -> EngineResult<DiagnosticQuestion> {
        let test = self.diagnostic(owner, test_id)?;
        let number = match fields.question_number {
            Some(number) => number,
            None => repo::max_question_number(&self.pool, &test.get_id())? + 1,
        };
        let question = DiagnosticQuestion::new(&test.get_id(), number, fields)?;
        repo::add_question(&self.pool, &question)?;
        info!(number, is_correct = question.is_correct(), "Question added");
        Ok(question)
    }

    pub fn diagnostic(&self, owner: &str, test_id: &str) -> EngineResult<DiagnosticTest> {
        repo::get_diagnostic_test(&self.pool, owner, test_id)?.ok_or(EngineError::NotFound)
    }

    /// The test with its questions and decoded analysis
    pub fn show_diagnostic(&self, owner: &str, test_id: &str) -> EngineResult<DiagnosticReport> {
        let test = self.diagnostic(owner, test_id)?;
        let questions = repo::list_questions(&self.pool, &test.get_id())?;
        let analysis = match test.get_analysis_result() {
            Some(stored) => match stored.decode::<DiagnosticAnalysis>() {
                Ok(analysis) => Some(analysis),
                Err(err) => {
                    warn!(error = %err, "Stored analysis could not be decoded");
                    None
                }
            },
            None => None,
        };
        Ok(DiagnosticReport {
            test,
            questions,
            analysis,
        })
    }

    /// Analyzes a test, stores the result and evaluates the event's triggers
    ///
    /// ### Errors
    ///
    /// `InvariantViolation` when the test has no questions
    #[instrument(skip(self), fields(owner = %owner, test_id = %test_id))]
    pub async fn analyze_diagnostic(&self, owner: &str, test_id: &str) -> EngineResult<AnalysisOutcome> {
        let mut test = self.diagnostic(owner, test_id)?;
        let mut questions = repo::list_questions(&self.pool, &test.get_id())?;
        if questions.is_empty() {
            return Err(EngineError::invariant("diagnostic test has no questions"));
        }
        let event = self.event(owner, &test.get_event_id())?;

        let snapshots: Vec<QuestionSnapshot> = questions.iter().map(QuestionSnapshot::from_question).collect();
        let baseline = baseline_analysis(&snapshots);
        let enrichment = self
            .advisor
            .analyze_diagnostic(&test.get_id(), &event.get_title(), &snapshots)
            .await;
        let merged = enrichment.as_ref().and_then(|enriched| merge_enrichment(&baseline, enriched));
        if enrichment.is_some() && merged.is_none() {
            warn!("Advisor analysis disagrees with the answers, keeping the baseline");
        }
        let enriched = merged.is_some();
        let analysis = merged.unwrap_or(baseline);

        for question in &mut questions {
            let label = analysis
                .question_labels
                .iter()
                .find(|l| l.question_number == question.get_question_number())
                .map(|l| l.error_type);
            question.set_error_type(label);
        }
        test.set_analysis(encode(&analysis)?, self.clock.now());
        repo::save_analysis(&self.pool, &test, &questions)?;
        info!(score = analysis.score_percentage, enriched, "Diagnostic analyzed");

        let suggestion = self
            .evaluate_after_update(owner, &event.get_id(), Some(Signal::Diagnostic(analysis.clone())))
            .await;
        Ok(AnalysisOutcome {
            analysis,
            enriched,
            suggestion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorType, Level};
    use crate::test_utils::{fixed_now, offline_engine, seed_event, test_engine};

    fn answer(number: i32, topic: &str, correct: bool) -> NewQuestion {
        NewQuestion {
            question_number: Some(number),
            question_text: format!("Question {number}"),
            correct_answer: "42 N".to_string(),
            user_answer: if correct { "  42   n " } else { "41 N" }.to_string(),
            topic: topic.to_string(),
        }
    }

    fn snapshot(number: i32, topic: &str, is_correct: bool) -> QuestionSnapshot {
        QuestionSnapshot {
            question_number: number,
            question_text: String::new(),
            correct_answer: String::new(),
            user_answer: String::new(),
            topic: topic.to_string(),
            is_correct,
        }
    }

    #[test]
    fn test_baseline_groups_in_question_order() {
        let questions = vec![
            snapshot(4, "Units", false),
            snapshot(1, "Dynamics", false),
            snapshot(2, "", false),
            snapshot(3, "Dynamics", false),
            snapshot(5, "Kinematics", true),
        ];
        let analysis = baseline_analysis(&questions);

        assert_eq!(analysis.score_percentage, 20);
        let topics: Vec<&str> = analysis.error_groups.iter().map(|g| g.topic.as_str()).collect();
        assert_eq!(topics, vec!["Dynamics", UNCATEGORIZED, "Units"]);
        assert_eq!(analysis.error_groups[0].question_numbers, vec![1, 3]);
        assert_eq!(analysis.dominant_error_topic.as_deref(), Some("Dynamics"));
        assert_eq!(analysis.summary, "Scored 20% (1/5). Most errors in Dynamics.");
    }

    #[test]
    fn test_baseline_tie_goes_to_first_topic() {
        let analysis = baseline_analysis(&[snapshot(1, "Units", false), snapshot(2, "Dynamics", false)]);
        assert_eq!(analysis.dominant_error_topic.as_deref(), Some("Units"));
    }

    #[test]
    fn test_baseline_without_errors() {
        let analysis = baseline_analysis(&[snapshot(1, "Units", true)]);
        assert_eq!(analysis.score_percentage, 100);
        assert!(analysis.error_groups.is_empty());
        assert_eq!(analysis.dominant_error_topic, None);
    }

    #[test]
    fn test_merge_rejects_different_topics() {
        let baseline = baseline_analysis(&[snapshot(1, "Units", false)]);
        let mut other = baseline_analysis(&[snapshot(1, "Optics", false)]);
        other.summary = "Optics is weak".to_string();
        assert_eq!(merge_enrichment(&baseline, &other), None);
    }

    async fn s6_test(t: &crate::test_utils::TestEngine) -> String {
        let (event, _) = seed_event(&t.engine, "alice", 10, &[45, 45]);
        let test = t.engine.create_diagnostic("alice", &event.get_id(), None).unwrap();
        for (number, topic, correct) in [
            (1, "Dynamics", false),
            (2, "Units", true),
            (3, "Dynamics", false),
            (4, "Units", false),
            (5, "Kinematics", true),
        ] {
            t.engine.add_question("alice", &test.get_id(), answer(number, topic, correct)).unwrap();
        }
        test.get_id()
    }

    #[tokio::test]
    async fn test_s6_enriched_analysis() {
        let t = test_engine(fixed_now());
        let test_id = s6_test(&t).await;

        let outcome = t.engine.analyze_diagnostic("alice", &test_id).await.unwrap();
        assert!(outcome.enriched);
        assert_eq!(outcome.analysis.score_percentage, 40);
        assert_eq!(outcome.analysis.dominant_error_topic.as_deref(), Some("Dynamics"));
        assert_eq!(outcome.analysis.error_groups[0].severity, Some(Level::High));
        assert_eq!(outcome.analysis.error_groups[1].severity, Some(Level::Medium));

        let suggestion = outcome.suggestion.expect("score below 60 fires");
        assert_eq!(suggestion.get_triggered_by(), "low_diagnostic_score");

        let report = t.engine.show_diagnostic("alice", &test_id).unwrap();
        assert_eq!(report.analysis, Some(outcome.analysis));
        let labelled: Vec<i32> = report
            .questions
            .iter()
            .filter(|q| q.get_error_type() == Some(ErrorType::Conceptual))
            .map(|q| q.get_question_number())
            .collect();
        assert_eq!(labelled, vec![1, 3, 4]);
    }

    #[tokio::test]
    async fn test_offline_analysis_is_baseline() {
        let t = offline_engine(fixed_now());
        let test_id = s6_test(&t).await;

        let outcome = t.engine.analyze_diagnostic("alice", &test_id).await.unwrap();
        assert!(!outcome.enriched);
        assert_eq!(outcome.analysis.summary, "Scored 40% (2/5). Most errors in Dynamics.");
        assert!(outcome.analysis.error_groups.iter().all(|g| g.severity.is_none()));
        assert!(outcome.suggestion.is_none());
    }

    #[tokio::test]
    async fn test_create_is_get_or_create() {
        let t = test_engine(fixed_now());
        let (event, _) = seed_event(&t.engine, "alice", 10, &[45]);
        let first = t.engine.create_diagnostic("alice", &event.get_id(), Some("Warm-up")).unwrap();
        let second = t.engine.create_diagnostic("alice", &event.get_id(), None).unwrap();
        assert_eq!(first.get_id(), second.get_id());
        assert_eq!(second.get_title(), "Warm-up");
        assert!(matches!(
            t.engine.create_diagnostic("bob", &event.get_id(), None),
            Err(EngineError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_question_numbers_continue_and_stay_unique() {
        let t = test_engine(fixed_now());
        let (event, _) = seed_event(&t.engine, "alice", 10, &[45]);
        let test = t.engine.create_diagnostic("alice", &event.get_id(), None).unwrap();

        t.engine.add_question("alice", &test.get_id(), answer(3, "Units", true)).unwrap();
        let mut next = answer(0, "Units", true);
        next.question_number = None;
        let added = t.engine.add_question("alice", &test.get_id(), next).unwrap();
        assert_eq!(added.get_question_number(), 4);

        let duplicate = t.engine.add_question("alice", &test.get_id(), answer(3, "Units", false));
        assert!(matches!(duplicate, Err(EngineError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn test_empty_test_cannot_be_analyzed() {
        let t = test_engine(fixed_now());
        let (event, _) = seed_event(&t.engine, "alice", 10, &[45]);
        let test = t.engine.create_diagnostic("alice", &event.get_id(), None).unwrap();

        let result = t.engine.analyze_diagnostic("alice", &test.get_id()).await;
        assert!(matches!(result, Err(EngineError::InvariantViolation(_))));
        assert_eq!(t.provider.call_count(), 0);
    }
}
