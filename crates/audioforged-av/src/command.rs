//! Translating a conversion into an ffmpeg invocation.
//!
//! Every plan reads `-f <source format> -i <source>`, keeps only the first
//! audio stream of the input (containers often carry cover art as a video
//! stream), and writes `-f <target format>` to a job-scoped temp file.

use std::fmt;
use std::path::{Path, PathBuf};

use audioforged_common::{Encoding, JobId};

const FORMAT_FLAG: &str = "-f";
const INPUT_FLAG: &str = "-i";
const MAP_FLAG: &str = "-map";
const FIRST_AUDIO_STREAM: &str = "0:a:0";

/// Extension used for MP4 targets. The output carries audio only, so it is
/// an M4A file even though ffmpeg is asked for the `mp4` muxer.
pub const MP4_AUDIO_EXTENSION: &str = "m4a";

/// A concrete external-process invocation for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    /// Program to run.
    pub program: PathBuf,
    /// Arguments, excluding the program.
    pub args: Vec<String>,
    /// Where the converted file is written.
    pub output_path: PathBuf,
}

impl fmt::Display for CommandPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Builds [`CommandPlan`]s against a fixed program and temp directory.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    program: PathBuf,
    tmp_dir: PathBuf,
    include_extension: bool,
}

impl CommandBuilder {
    pub fn new(program: impl Into<PathBuf>, tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            tmp_dir: tmp_dir.into(),
            include_extension: false,
        }
    }

    /// Suffix temp files with the target's lowercase extension.
    pub fn include_extension(mut self, include: bool) -> Self {
        self.include_extension = include;
        self
    }

    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    /// Plan the conversion of `source` from `from` to `to` for job `id`.
    pub fn plan(&self, id: JobId, source: &str, from: Encoding, to: Encoding) -> CommandPlan {
        let output_path = self.output_path(id, to);

        let args = vec![
            FORMAT_FLAG.to_string(),
            from.ffmpeg_format().to_string(),
            INPUT_FLAG.to_string(),
            source.to_string(),
            MAP_FLAG.to_string(),
            FIRST_AUDIO_STREAM.to_string(),
            FORMAT_FLAG.to_string(),
            to.ffmpeg_format().to_string(),
            output_path.to_string_lossy().into_owned(),
        ];

        CommandPlan {
            program: self.program.clone(),
            args,
            output_path,
        }
    }

    fn output_path(&self, id: JobId, to: Encoding) -> PathBuf {
        let file_name = match to {
            Encoding::Mp4 => format!("{}.{}", id, MP4_AUDIO_EXTENSION),
            _ if self.include_extension => format!("{}.{}", id, to.name().to_lowercase()),
            _ => id.to_string(),
        };
        self.tmp_dir.join(file_name)
    }
}
