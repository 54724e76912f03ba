//! Starting and awaiting external processes.
//!
//! The orchestrator only sees [`Executable`] and [`ExecutableFactory`], so
//! tests can swap in doubles that never spawn anything.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::command::CommandPlan;
use crate::{Error, Result};

/// One external program run: start it, then wait for it to exit.
#[async_trait]
pub trait Executable: Send {
    /// Where the process's standard error goes. Must be set before `start`.
    fn set_stderr(&mut self, sink: Stdio);

    /// Spawn the process without waiting for it.
    fn start(&mut self) -> Result<()>;

    /// Wait for exit. A non-zero exit status is an error.
    async fn wait(&mut self) -> Result<()>;
}

/// Turns a [`CommandPlan`] into something runnable.
pub trait ExecutableFactory: Send + Sync {
    fn build(&self, plan: &CommandPlan) -> Box<dyn Executable>;
}

/// A real subprocess on tokio's process driver.
#[derive(Debug)]
pub struct ProcessExecutable {
    tool: String,
    command: Command,
    child: Option<Child>,
}

impl ProcessExecutable {
    pub fn new(plan: &CommandPlan) -> Self {
        let tool = plan
            .program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| plan.program.to_string_lossy().to_string());

        let mut command = Command::new(&plan.program);
        command
            .args(&plan.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true);

        Self {
            tool,
            command,
            child: None,
        }
    }
}

#[async_trait]
impl Executable for ProcessExecutable {
    fn set_stderr(&mut self, sink: Stdio) {
        self.command.stderr(sink);
    }

    fn start(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Err(Error::tool_failed(&self.tool, "already started"));
        }

        let child = self
            .command
            .spawn()
            .map_err(|e| Error::tool_failed(&self.tool, format!("failed to spawn: {e}")))?;

        tracing::debug!(tool = %self.tool, pid = ?child.id(), "Process started");
        self.child = Some(child);
        Ok(())
    }

    async fn wait(&mut self) -> Result<()> {
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| Error::tool_failed(&self.tool, "wait called before start"))?;

        let status = child.wait().await.map_err(|e| {
            Error::tool_failed(&self.tool, format!("I/O error waiting for process: {e}"))
        })?;

        if !status.success() {
            return Err(Error::tool_failed(
                &self.tool,
                format!("exited with status {}", status),
            ));
        }

        Ok(())
    }
}

/// Builds [`ProcessExecutable`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutableFactory;

impl ExecutableFactory for ProcessExecutableFactory {
    fn build(&self, plan: &CommandPlan) -> Box<dyn Executable> {
        Box::new(ProcessExecutable::new(plan))
    }
}
