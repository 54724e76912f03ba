//! Conversion job query operations.
//!
//! Status transitions are guarded in SQL so that the store itself refuses
//! anything outside QUEUED -> CONVERTING -> COMPLETED, with FAILED reachable
//! from either non-terminal state.

use audioforged_common::{Error, JobId, JobStatus, Result, NO_RESULT_LOCATION};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, Row};

use crate::models::JobRecord;

const SELECT_COLUMNS: &str = "SELECT id, status, result_location, last_updated FROM convert_jobs";

fn row_to_record(row: &Row) -> rusqlite::Result<JobRecord> {
    let id: String = row.get(0)?;
    let status: String = row.get(1)?;
    let last_updated: String = row.get(3)?;

    let id = id.parse::<JobId>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let status = status.parse::<JobStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            Box::<dyn std::error::Error + Send + Sync>::from(e),
        )
    })?;
    let last_updated = DateTime::parse_from_rfc3339(&last_updated)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(JobRecord {
        id,
        status,
        result_location: row.get(2)?,
        last_updated,
    })
}

/// Create a new job record in QUEUED.
pub fn create_job(conn: &Connection, id: JobId) -> Result<JobRecord> {
    let record = JobRecord::queued(id, Utc::now());

    conn.execute(
        "INSERT INTO convert_jobs (id, status, result_location, last_updated)
         VALUES (?, ?, ?, ?)",
        params![
            record.id.to_string(),
            record.status.as_str(),
            &record.result_location,
            record.last_updated.to_rfc3339(),
        ],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(record)
}

/// Get a job record by ID.
pub fn get_job(conn: &Connection, id: JobId) -> Result<JobRecord> {
    conn.query_row(
        &format!("{} WHERE id = ?", SELECT_COLUMNS),
        [id.to_string()],
        row_to_record,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Error::not_found(format!("job {}", id)),
        _ => Error::database(e.to_string()),
    })
}

/// QUEUED -> CONVERTING.
pub fn start_conversion(conn: &Connection, id: JobId) -> Result<()> {
    let affected = conn
        .execute(
            "UPDATE convert_jobs SET status = 'CONVERTING', last_updated = ?
             WHERE id = ? AND status = 'QUEUED'",
            params![Utc::now().to_rfc3339(), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    check_transition(conn, id, affected, JobStatus::Converting)
}

/// CONVERTING -> COMPLETED, recording where the artifact can be fetched.
pub fn complete_conversion(conn: &Connection, id: JobId, result_location: &str) -> Result<()> {
    if result_location.is_empty() || result_location == NO_RESULT_LOCATION {
        return Err(Error::invalid_request(
            "completed jobs need a result location",
        ));
    }

    let affected = conn
        .execute(
            "UPDATE convert_jobs SET status = 'COMPLETED', result_location = ?, last_updated = ?
             WHERE id = ? AND status = 'CONVERTING'",
            params![result_location, Utc::now().to_rfc3339(), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    check_transition(conn, id, affected, JobStatus::Completed)
}

/// QUEUED | CONVERTING -> FAILED.
pub fn fail_conversion(conn: &Connection, id: JobId) -> Result<()> {
    let affected = conn
        .execute(
            "UPDATE convert_jobs SET status = 'FAILED', last_updated = ?
             WHERE id = ? AND status IN ('QUEUED', 'CONVERTING')",
            params![Utc::now().to_rfc3339(), id.to_string()],
        )
        .map_err(|e| Error::database(e.to_string()))?;

    check_transition(conn, id, affected, JobStatus::Failed)
}

/// Turn a zero-row guarded update into NotFound or InvalidTransition.
fn check_transition(conn: &Connection, id: JobId, affected: usize, to: JobStatus) -> Result<()> {
    if affected > 0 {
        return Ok(());
    }

    let current = get_job(conn, id)?;
    Err(Error::InvalidTransition {
        id: id.to_string(),
        from: current.status,
        to,
    })
}

/// List jobs in a given status, oldest first.
pub fn list_jobs_by_status(conn: &Connection, status: JobStatus) -> Result<Vec<JobRecord>> {
    let mut stmt = conn
        .prepare(&format!(
            "{} WHERE status = ? ORDER BY last_updated ASC",
            SELECT_COLUMNS
        ))
        .map_err(|e| Error::database(e.to_string()))?;

    let records = stmt
        .query_map([status.as_str()], row_to_record)
        .map_err(|e| Error::database(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))?;

    Ok(records)
}

/// Fail every job left non-terminal by a previous process.
///
/// The work queue lives in memory, so nothing will ever pick these up again.
/// Returns the number of rows reset.
pub fn reset_orphaned_jobs(conn: &Connection) -> Result<usize> {
    conn.execute(
        "UPDATE convert_jobs SET status = 'FAILED', last_updated = ?
         WHERE status IN ('QUEUED', 'CONVERTING')",
        [Utc::now().to_rfc3339()],
    )
    .map_err(|e| Error::database(e.to_string()))
}

/// Delete terminal jobs last touched more than `days` days ago.
pub fn prune_terminal_jobs(conn: &Connection, days: i64) -> Result<usize> {
    let cutoff = Utc::now() - Duration::days(days);

    conn.execute(
        "DELETE FROM convert_jobs
         WHERE status IN ('COMPLETED', 'FAILED') AND last_updated < ?",
        [cutoff.to_rfc3339()],
    )
    .map_err(|e| Error::database(e.to_string()))
}
