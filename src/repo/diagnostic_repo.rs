use crate::db::DbPool;
use crate::models::{DiagnosticQuestion, DiagnosticTest};
use crate::schema::{diagnostic_questions, diagnostic_tests};
use diesel::dsl::max;
use diesel::prelude::*;
use anyhow::Result;
use tracing::{instrument, debug, info};

/// Creates a diagnostic test; the store allows one per event
#[instrument(skip(pool, test), fields(event_id = %test.get_event_id()))]
pub fn create_diagnostic_test(pool: &DbPool, test: &DiagnosticTest) -> Result<()> {
    let conn = &mut pool.get()?;
    diesel::insert_into(diagnostic_tests::table).values(test).execute(conn)?;
    info!("Created diagnostic test {}", test.get_id());
    Ok(())
}

/// Retrieves a diagnostic test owned by `owner`
#[instrument(skip(pool), fields(owner = %owner, test_id = %test_id))]
pub fn get_diagnostic_test(pool: &DbPool, owner: &str, test_id: &str) -> Result<Option<DiagnosticTest>> {
    let conn = &mut pool.get()?;
    let result = diagnostic_tests::table
        .filter(diagnostic_tests::id.eq(test_id))
        .filter(diagnostic_tests::owner.eq(owner))
        .select(DiagnosticTest::as_select())
        .first(conn)
        .optional()?;
    Ok(result)
}

/// Retrieves the diagnostic test of an event, if one exists
#[instrument(skip(pool), fields(owner = %owner, event_id = %event_id))]
pub fn get_diagnostic_test_for_event(pool: &DbPool, owner: &str, event_id: &str) -> Result<Option<DiagnosticTest>> {
    let conn = &mut pool.get()?;
    let result = diagnostic_tests::table
        .filter(diagnostic_tests::event_id.eq(event_id))
        .filter(diagnostic_tests::owner.eq(owner))
        .select(DiagnosticTest::as_select())
        .first(conn)
        .optional()?;
    Ok(result)
}

/// Highest question number used in a test, 0 when there are none
#[instrument(skip(pool), fields(test_id = %test_id))]
pub fn max_question_number(pool: &DbPool, test_id: &str) -> Result<i32> {
    let conn = &mut pool.get()?;
    let highest: Option<i32> = diagnostic_questions::table
        .filter(diagnostic_questions::test_id.eq(test_id))
        .select(max(diagnostic_questions::question_number))
        .first(conn)?;
    Ok(highest.unwrap_or(0))
}

/// Adds a question to a test
///
/// ### Errors
///
/// Returns a unique violation if the question number is already taken
#[instrument(skip(pool, question), fields(test_id = %question.get_test_id(), number = question.get_question_number()))]
pub fn add_question(pool: &DbPool, question: &DiagnosticQuestion) -> Result<()> {
    let conn = &mut pool.get()?;
    diesel::insert_into(diagnostic_questions::table)
        .values(question)
        .execute(conn)?;
    debug!("Added question {}", question.get_id());
    Ok(())
}

/// Lists the questions of a test in number order
#[instrument(skip(pool), fields(test_id = %test_id))]
pub fn list_questions(pool: &DbPool, test_id: &str) -> Result<Vec<DiagnosticQuestion>> {
    let conn = &mut pool.get()?;
    let result = diagnostic_questions::table
        .filter(diagnostic_questions::test_id.eq(test_id))
        .order(diagnostic_questions::question_number.asc())
        .select(DiagnosticQuestion::as_select())
        .load(conn)?;
    Ok(result)
}

/// Stores an analysis result and the per-question error labels together
///
/// ### Arguments
///
/// * `pool` - A reference to the database connection pool
/// * `test` - The test carrying the new analysis
/// * `questions` - Questions whose error labels should be written
#[instrument(skip(pool, test, questions), fields(test_id = %test.get_id()))]
pub fn save_analysis(pool: &DbPool, test: &DiagnosticTest, questions: &[DiagnosticQuestion]) -> Result<()> {
    let conn = &mut pool.get()?;
    conn.transaction::<_, anyhow::Error, _>(|conn| {
        diesel::update(diagnostic_tests::table.filter(diagnostic_tests::id.eq(test.get_id())))
            .set((
                diagnostic_tests::analysis_result.eq(test.get_analysis_result()),
                diagnostic_tests::analyzed_at.eq(test.get_analyzed_at().map(|d| d.naive_utc())),
            ))
            .execute(conn)?;
        for question in questions {
            diesel::update(diagnostic_questions::table.filter(diagnostic_questions::id.eq(question.get_id())))
                .set(diagnostic_questions::error_type.eq(question.get_error_type()))
                .execute(conn)?;
        }
        Ok(())
    })?;
    info!("Saved analysis for diagnostic test {}", test.get_id());
    Ok(())
}
