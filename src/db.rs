use anyhow::{Result, anyhow};
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info};

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Embedded SQL migrations from the `migrations/` directory
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Pragmas applied to every pooled connection
///
/// Foreign keys must be enabled per connection in SQLite, otherwise the
/// `ON DELETE CASCADE` clauses rooted at `events` are ignored.
#[derive(Debug, Clone, Copy)]
struct SqlitePragmas {
    busy_timeout_ms: u32,
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = {};",
            self.busy_timeout_ms
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Creates a connection pool for the given SQLite database URL
///
/// ### Arguments
///
/// * `database_url` - A file path or SQLite URI
///
/// ### Returns
///
/// A pool whose connections have foreign keys enabled
///
/// ### Errors
///
/// Returns an error if the initial connections cannot be opened
pub fn init_pool(database_url: &str) -> Result<DbPool> {
    debug!("Opening database pool for {}", database_url);
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .connection_customizer(Box::new(SqlitePragmas { busy_timeout_ms: 5_000 }))
        .build(manager)?;
    Ok(pool)
}

/// Runs the embedded migrations
///
/// ### Arguments
///
/// * `conn` - A mutable reference to a SQLite connection
///
/// ### Errors
///
/// Returns an error if any pending migration fails to apply
pub fn run_migrations(conn: &mut SqliteConnection) -> Result<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!("Failed to run migrations: {}", e))?;
    if !applied.is_empty() {
        info!("Applied {} migration(s)", applied.len());
    }
    Ok(())
}

/// Opens a pool and brings the schema up to date
///
/// ### Errors
///
/// Returns an error if the pool cannot be created or migrations fail
pub fn open(database_url: &str) -> Result<DbPool> {
    let pool = init_pool(database_url)?;
    let mut conn = pool.get()?;
    run_migrations(&mut conn)?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::RunQueryDsl;
    use diesel::sql_types::{Integer, Text};
    use diesel::QueryableByName;

    #[derive(QueryableByName, Debug)]
    struct TableName {
        #[diesel(sql_type = Text)]
        name: String,
    }

    #[derive(QueryableByName, Debug)]
    struct PragmaValue {
        #[diesel(sql_type = Integer)]
        foreign_keys: i32,
    }

    fn memory_url() -> String {
        format!("file:db_test_{}?mode=memory&cache=shared", uuid::Uuid::new_v4())
    }

    #[test]
    fn test_open_creates_all_tables() {
        let pool = open(&memory_url()).unwrap();
        let mut conn = pool.get().unwrap();

        let tables: Vec<TableName> = diesel::sql_query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '__diesel%' ORDER BY name",
        )
        .load(&mut conn)
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();

        for expected in [
            "adjustment_suggestions",
            "diagnostic_questions",
            "diagnostic_tests",
            "emotional_logs",
            "events",
            "focus_intervals",
            "study_sessions",
            "user_preferences",
        ] {
            assert!(names.contains(&expected), "missing table {expected}: {names:?}");
        }
    }

    #[test]
    fn test_pooled_connections_enforce_foreign_keys() {
        let pool = open(&memory_url()).unwrap();
        let mut conn = pool.get().unwrap();

        let pragma: Vec<PragmaValue> = diesel::sql_query("PRAGMA foreign_keys")
            .load(&mut conn)
            .unwrap();
        assert_eq!(pragma[0].foreign_keys, 1);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let pool = open(&memory_url()).unwrap();
        let mut conn = pool.get().unwrap();
        run_migrations(&mut conn).unwrap();
    }
}
