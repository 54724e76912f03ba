//! Internal Rust models matching the database schema.

use audioforged_common::{JobId, JobStatus, NO_RESULT_LOCATION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durable record of one conversion job.
///
/// `result_location` stays [`NO_RESULT_LOCATION`] until the job completes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    pub result_location: String,
    pub last_updated: DateTime<Utc>,
}

impl JobRecord {
    /// A freshly submitted job.
    pub fn queued(id: JobId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            result_location: NO_RESULT_LOCATION.to_string(),
            last_updated: now,
        }
    }

    /// The retrieval URL, if the job has one.
    pub fn url(&self) -> Option<&str> {
        if self.result_location == NO_RESULT_LOCATION {
            None
        } else {
            Some(&self.result_location)
        }
    }
}
