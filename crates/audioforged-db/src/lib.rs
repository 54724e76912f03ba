//! Audioforged-DB: Job record persistence.
//!
//! This crate owns the durable record of every conversion job using SQLite
//! with rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//! - `repository` - The job repository contract and its SQLite implementation
//!
//! # Example
//!
//! ```no_run
//! use audioforged_common::JobId;
//! use audioforged_db::pool::{get_conn, init_pool};
//! use audioforged_db::queries::conversion_jobs;
//!
//! let pool = init_pool("/var/lib/audioforged/db.sqlite").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let job = conversion_jobs::create_job(&conn, JobId::new()).unwrap();
//! println!("Created job {} in {}", job.id, job.status);
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod repository;

pub use models::JobRecord;
pub use repository::{JobRepository, SqliteJobRepository};
