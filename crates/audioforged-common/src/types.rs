//! Core type definitions: the Encoding Catalog and job lifecycle states.
//!
//! Both enums serialize as their uppercase names, which is also how they are
//! stored in the database and returned by the query path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Result location stored on a job record until it completes.
pub const NO_RESULT_LOCATION: &str = "NONE";

/// Supported audio encoding.
///
/// The ordinal of each variant is part of the external contract: clients
/// submit encodings by ordinal, so variants may be appended but never
/// reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Encoding {
    /// Waveform audio.
    Wav,
    /// MPEG-4 container (audio-only payload).
    Mp4,
    /// MPEG-1 Layer III.
    Mp3,
    /// Free Lossless Audio Codec.
    Flac,
}

impl Encoding {
    /// Every encoding in ordinal order.
    pub const ALL: [Encoding; 4] = [Self::Wav, Self::Mp4, Self::Mp3, Self::Flac];

    /// Resolve an ordinal into an encoding.
    ///
    /// Out-of-range ordinals (including negative ones) are rejected with
    /// [`Error::UnsupportedEncoding`], never mapped to a default.
    pub fn from_ordinal(ordinal: i32) -> Result<Self, Error> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(Error::UnsupportedEncoding(ordinal))
    }

    /// Stable ordinal of this encoding.
    pub fn ordinal(&self) -> i32 {
        match self {
            Self::Wav => 0,
            Self::Mp4 => 1,
            Self::Mp3 => 2,
            Self::Flac => 3,
        }
    }

    /// Stable catalog name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Wav => "WAV",
            Self::Mp4 => "MP4",
            Self::Mp3 => "MP3",
            Self::Flac => "FLAC",
        }
    }

    /// Format name understood by ffmpeg's `-f` flag.
    pub fn ffmpeg_format(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp4 => "mp4",
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
        }
    }

    /// MIME type used when storing a converted artifact.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
            Self::Mp4 => "audio/mp4",
            Self::Mp3 => "audio/mpeg",
            Self::Flac => "audio/flac",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    /// Case-insensitive lookup by catalog name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| Error::invalid_request(format!("unknown encoding: {}", s)))
    }
}

/// Lifecycle state of a conversion job.
///
/// Legal transitions: `Queued -> Converting`, `Converting -> Completed`, and
/// `Queued | Converting -> Failed`. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Queued,
    Converting,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether no further transitions may occur.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Converting)
                | (Self::Converting, Self::Completed)
                | (Self::Queued, Self::Failed)
                | (Self::Converting, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Converting => "CONVERTING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(Self::Queued),
            "CONVERTING" => Ok(Self::Converting),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}
