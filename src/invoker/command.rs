//! Command invoker - one process per skill call
//!
//! Writes `{"skill_id": ..., "payload": {...}}` to the program's stdin and
//! takes trimmed stdout as the skill output. A non-zero exit fails the call
//! with stderr as the reason.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{SkillInvoker, SkillRequest};
use crate::ast::Payload;

pub struct CommandInvoker {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandInvoker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Kill the process if it runs longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    async fn run(&self, input: Vec<u8>) -> Result<std::process::Output> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn '{}'", self.program))?;

        // Feed stdin while stdout is drained, or a chatty child fills its pipe and both sides block
        let stdin = child.stdin.take();
        let write = async move {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(&input).await {
                    // A program that ignores its input may exit before reading it
                    Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
            }
            Ok(())
        };

        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output.context("Failed to wait for skill process")?;
        written.context("Failed to write request to stdin")?;
        Ok(output)
    }
}

#[async_trait]
impl SkillInvoker for CommandInvoker {
    fn name(&self) -> &str {
        "command"
    }

    async fn invoke(&self, skill_id: &str, payload: &Payload) -> Result<String> {
        let input = serde_json::to_vec(&SkillRequest { skill_id, payload })?;
        debug!(program = %self.program, skill = skill_id, "spawning skill process");

        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.run(input)).await {
                Ok(result) => result?,
                // Dropping the future kills the child
                Err(_) => bail!("'{}' timed out after {:?}", self.program, limit),
            },
            None => self.run(input).await?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
