//! # Engine Gateway - Container Engine CLI Boundary
//!
//! Every interaction with an external container engine goes through the
//! [`EngineGateway`] trait. The orchestrator and the runtime detector depend
//! only on this trait, so tests substitute a scripted fake and no real
//! engine is ever required.
//!
//! ## Supported Engines
//!
//! | Engine | Binary   | Availability probe | Service probe |
//! |--------|----------|--------------------|---------------|
//! | Docker | `docker` | `docker --version` | `docker info` |
//! | Podman | `podman` | `podman --version` | `podman info` |
//!
//! ## Argument Handling
//!
//! [`CliGateway`] spawns the engine binary directly with a structured
//! argument vector. No shell is involved, so environment values, mount
//! paths and extension identifiers reach the engine verbatim and cannot
//! be reinterpreted as shell syntax. The shell-style rendering used for
//! logs and diagnostics lives in [`crate::command::LaunchCommand::render`].
//!
//! ## Bounded Execution
//!
//! Status queries and other short invocations are wrapped in
//! `tokio::time::timeout`. The launch (`run`) is never bounded, since a
//! cold start may pull the base image. Captured output is truncated at
//! [`MAX_ENGINE_OUTPUT_SIZE`].

use crate::constants::{ENGINE_COMMAND_TIMEOUT, MAX_ENGINE_OUTPUT_SIZE};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

// =============================================================================
// Engine Identifiers
// =============================================================================

/// A supported container engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Docker,
    Podman,
}

impl EngineKind {
    /// Detection priority order.
    pub const ALL: [EngineKind; 2] = [EngineKind::Docker, EngineKind::Podman];

    /// Returns the engine identifier, which is also its binary name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }

    /// Returns the binary invoked for this engine.
    pub fn binary(&self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            other => Err(Error::invalid_parameter(
                "runtime",
                format!("unknown runtime '{}', expected 'docker' or 'podman'", other),
            )),
        }
    }
}

// =============================================================================
// Invocation Output
// =============================================================================

/// Captured result of one engine invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    /// Exit code, `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl EngineOutput {
    /// Creates a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Creates a failed output with the given stderr.
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Returns true if the command exited with status 0.
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Returns the most useful diagnostic text: stderr if present,
    /// otherwise stdout, otherwise the exit status.
    pub fn error_message(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        match self.exit_code {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

// =============================================================================
// Gateway Trait
// =============================================================================

/// Narrow interface to an external container engine CLI.
#[async_trait]
pub trait EngineGateway: Send + Sync {
    /// Runs the engine binary with the given arguments.
    ///
    /// Returns `Err` only if the binary could not be spawned or a bounded
    /// call timed out. A non-zero exit status is reported through
    /// [`EngineOutput::exit_code`].
    async fn invoke(&self, engine: EngineKind, args: &[String]) -> Result<EngineOutput>;

    /// Returns the status string of a running instance, or an empty string
    /// if no running container with that exact name exists.
    async fn query_status(&self, engine: EngineKind, instance_name: &str) -> Result<String> {
        let args = status_query_args(instance_name);
        let output = self.invoke(engine, &args).await?;
        if !output.is_success() {
            warn!(
                "{} status query for {} failed: {}",
                engine,
                instance_name,
                output.error_message()
            );
            return Ok(String::new());
        }
        Ok(output.stdout.trim().to_string())
    }
}

/// Arguments listing the status of running containers named exactly
/// `instance_name`.
pub fn status_query_args(instance_name: &str) -> Vec<String> {
    vec![
        "ps".to_string(),
        "--filter".to_string(),
        format!("name=^{}$", instance_name),
        "--format".to_string(),
        "{{.Status}}".to_string(),
    ]
}

// =============================================================================
// CLI Gateway
// =============================================================================

/// [`EngineGateway`] backed by the engine binaries on `PATH`.
#[derive(Debug, Clone)]
pub struct CliGateway {
    timeout: Duration,
    binary_dir: Option<PathBuf>,
}

impl CliGateway {
    /// Creates a gateway with the default command timeout.
    pub fn new() -> Self {
        Self::with_timeout(ENGINE_COMMAND_TIMEOUT)
    }

    /// Creates a gateway with a custom timeout for bounded commands.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            binary_dir: None,
        }
    }

    /// Resolves engine binaries from `dir` instead of `PATH`.
    pub fn with_binary_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.binary_dir = Some(dir.into());
        self
    }

    fn program(&self, engine: EngineKind) -> PathBuf {
        match &self.binary_dir {
            Some(dir) => dir.join(engine.binary()),
            None => PathBuf::from(engine.binary()),
        }
    }

    /// Returns true for the launch invocation, which runs without a deadline.
    fn is_launch(args: &[String]) -> bool {
        args.first().is_some_and(|a| a == "run")
    }

    fn truncated(mut bytes: Vec<u8>, stream: &str) -> String {
        if bytes.len() > MAX_ENGINE_OUTPUT_SIZE {
            bytes.truncate(MAX_ENGINE_OUTPUT_SIZE);
            warn!("engine {} truncated to {} bytes", stream, MAX_ENGINE_OUTPUT_SIZE);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Default for CliGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EngineGateway for CliGateway {
    async fn invoke(&self, engine: EngineKind, args: &[String]) -> Result<EngineOutput> {
        debug!("engine command: {} {}", engine.binary(), args.join(" "));

        let mut cmd = Command::new(self.program(engine));
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let output = if Self::is_launch(args) {
            cmd.output().await?
        } else {
            timeout(self.timeout, cmd.output())
                .await
                .map_err(|_| Error::Timeout {
                    operation: format!("{} {}", engine, args.first().map_or("", |a| a.as_str())),
                    duration: self.timeout,
                })??
        };

        Ok(EngineOutput {
            exit_code: output.status.code(),
            stdout: Self::truncated(output.stdout, "stdout"),
            stderr: Self::truncated(output.stderr, "stderr"),
        })
    }
}
