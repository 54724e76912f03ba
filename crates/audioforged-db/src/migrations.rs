//! Schema migrations.
//!
//! The schema version is kept in SQLite's `user_version` pragma. Entry `i`
//! of [`MIGRATIONS`] upgrades the schema from version `i` to `i + 1`.

use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration to v{version} ({name}) failed: {source}")]
    Failed {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
}

/// V1: job records.
///
/// `result_location` holds `NONE` until the job completes.
const V1_CONVERT_JOBS: &str = r#"
CREATE TABLE convert_jobs (
    id              TEXT PRIMARY KEY NOT NULL,
    status          TEXT NOT NULL DEFAULT 'QUEUED'
                    CHECK (status IN ('QUEUED', 'CONVERTING', 'COMPLETED', 'FAILED')),
    result_location TEXT NOT NULL DEFAULT 'NONE',
    last_updated    TEXT NOT NULL
);
"#;

/// V2: status index for reconciliation and pruning scans.
const V2_STATUS_INDEX: &str = r#"
CREATE INDEX idx_convert_jobs_status ON convert_jobs(status, last_updated);
"#;

/// Ordered `(name, sql)` pairs.
const MIGRATIONS: &[(&str, &str)] = &[
    ("convert_jobs", V1_CONVERT_JOBS),
    ("status_index", V2_STATUS_INDEX),
];

/// Schema version recorded in the database file.
pub fn current_version(conn: &Connection) -> Result<u32, MigrationError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Schema version this build expects.
pub fn latest_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// Bring the schema up to [`latest_version`], one transaction per step.
/// Returns how many steps ran.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    let from = current_version(conn)?;
    let pending = MIGRATIONS.iter().zip(1u32..).skip(from as usize);

    let mut applied = 0;
    for (&(name, sql), version) in pending {
        let failed = move |source: rusqlite::Error| MigrationError::Failed {
            version,
            name,
            source,
        };
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql).map_err(failed)?;
        tx.pragma_update(None, "user_version", version)
            .map_err(failed)?;
        tx.commit().map_err(failed)?;

        tracing::info!(version, name, "Applied migration");
        applied += 1;
    }

    Ok(applied)
}
