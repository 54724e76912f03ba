//! Audioforged-Common: Shared types, constants, and errors.
//!
//! This crate provides functionality used across audioforged:
//!
//! - **Encoding Catalog**: The closed set of supported audio encodings
//! - **Job Status**: Lifecycle states of a conversion job
//! - **Typed IDs**: A UUID wrapper identifying conversion jobs
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use audioforged_common::{Encoding, Error, JobId, Result};
//!
//! let id = JobId::new();
//! let target = Encoding::from_ordinal(2).unwrap();
//! assert_eq!(target, Encoding::Mp3);
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("job"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
