//! # audioforged-av
//!
//! External-tool plumbing for audio conversion.
//!
//! This crate provides functionality for:
//! - Planning an ffmpeg invocation for a conversion ([`CommandBuilder`])
//! - Running external processes behind a testable seam ([`Executable`])
//! - Locating ffmpeg on the host
//!
//! ## Example
//!
//! ```no_run
//! use audioforged_av::{CommandBuilder, ExecutableFactory, ProcessExecutableFactory};
//! use audioforged_common::{Encoding, JobId};
//!
//! # async fn example() -> audioforged_av::Result<()> {
//! let plan = CommandBuilder::new("ffmpeg", "/tmp").plan(
//!     JobId::new(),
//!     "https://example.com/song.wav",
//!     Encoding::Wav,
//!     Encoding::Mp3,
//! );
//!
//! let mut exe = ProcessExecutableFactory.build(&plan);
//! exe.set_stderr(std::process::Stdio::inherit());
//! exe.start()?;
//! exe.wait().await?;
//! println!("wrote {}", plan.output_path.display());
//! # Ok(())
//! # }
//! ```

pub mod command;
mod error;
pub mod runner;
pub mod tools;

// Re-exports
pub use command::{CommandBuilder, CommandPlan};
pub use error::{Error, Result};
pub use runner::{Executable, ExecutableFactory, ProcessExecutable, ProcessExecutableFactory};
pub use tools::{check_ffmpeg, check_tool_with_arg, get_tool_path, require_tool, ToolInfo};
