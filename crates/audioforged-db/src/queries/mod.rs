//! Database query modules.
//!
//! - conversion_jobs: Job record creation, status transitions, and cleanup

pub mod conversion_jobs;
