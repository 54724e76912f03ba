//! Audio conversion pipeline.
//!
//! This module takes a submission from raw fields to a converted, uploaded
//! artifact. It includes:
//!
//! - Request validation against the encoding catalog
//! - The per-job orchestrator (ffmpeg run, upload, URL signing, status writes)
//! - The bounded worker pool that admits and schedules jobs

mod orchestrator;
mod queue;
mod request;

pub use orchestrator::{ConversionJob, ConversionOrchestrator};
pub use queue::{JobQueue, QueuedJob};
pub use request::{ConversionRequest, RawConversionRequest};
