//! # Launch Command Synthesis
//!
//! Builds the exact `run` invocation for a resolved instance. Pure and
//! deterministic: the same engine and instance always produce the same
//! argument vector.
//!
//! ## Invocation Layout
//!
//! ```text
//! <engine> run -d
//!     --name <instance>
//!     <restart policy>                          docker: --restart always
//!                                               podman: --restart=always
//!     -p <host port>:8080
//!     -v <workspace>:/home/coder/project
//!     -v <instance>-data:/home/coder/.local/share/code-server
//!     -v <instance>-extensions:/home/coder/.local/share/code-server/extensions
//!     --cpus <cpu> --memory <memory>
//!     [-e KEY=VALUE ...]                        caller environment, in order
//!     [-e PASSWORD=<credential>]                only when non-empty
//!     -e EXTENSIONS=<a,b,c>
//!     codercom/code-server:latest
//! ```
//!
//! ## Quoting
//!
//! [`LaunchCommand::args`] is handed to the engine as an argument vector,
//! so values are never shell-interpreted. [`LaunchCommand::render`] joins
//! the same arguments with spaces, unescaped, for logs and diagnostics. The
//! rendered string is not safe to pass to a shell when environment values,
//! the workspace path or extension identifiers contain shell syntax.

use crate::constants::{
    BASE_IMAGE, CONTAINER_DATA_PATH, CONTAINER_EXTENSIONS_PATH, CONTAINER_PORT,
    CONTAINER_WORKSPACE_PATH, DATA_VOLUME_SUFFIX, EXTENSIONS_ENV_VAR, EXTENSIONS_VOLUME_SUFFIX,
    PASSWORD_ENV_VAR,
};
use crate::engine::EngineKind;
use crate::instance::ResolvedInstance;

/// A synthesized engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    /// Engine to invoke.
    pub engine: EngineKind,
    /// Arguments following the engine binary.
    pub args: Vec<String>,
}

impl LaunchCommand {
    /// Renders the invocation as a single shell-style line, unescaped.
    pub fn render(&self) -> String {
        let mut line = self.engine.binary().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Returns the restart-policy flag in the syntax the engine expects.
pub fn restart_policy_args(engine: EngineKind) -> Vec<String> {
    match engine {
        EngineKind::Docker => vec!["--restart".to_string(), "always".to_string()],
        EngineKind::Podman => vec!["--restart=always".to_string()],
    }
}

/// Builds the launch invocation for `instance` on `engine`.
pub fn build_launch_command(engine: EngineKind, instance: &ResolvedInstance) -> LaunchCommand {
    let name = &instance.instance_name;
    let mut args: Vec<String> = vec!["run".into(), "-d".into(), "--name".into(), name.clone()];

    args.extend(restart_policy_args(engine));

    args.push("-p".into());
    args.push(format!("{}:{}", instance.port, CONTAINER_PORT));

    args.push("-v".into());
    args.push(format!(
        "{}:{}",
        instance.workspace_path.display(),
        CONTAINER_WORKSPACE_PATH
    ));
    args.push("-v".into());
    args.push(format!("{}-{}:{}", name, DATA_VOLUME_SUFFIX, CONTAINER_DATA_PATH));
    args.push("-v".into());
    args.push(format!(
        "{}-{}:{}",
        name, EXTENSIONS_VOLUME_SUFFIX, CONTAINER_EXTENSIONS_PATH
    ));

    args.push("--cpus".into());
    args.push(instance.limits.cpu.clone());
    args.push("--memory".into());
    args.push(instance.limits.memory.clone());

    for (key, value) in &instance.environment {
        args.push("-e".into());
        args.push(format!("{}={}", key, value));
    }

    if !instance.password.is_empty() {
        args.push("-e".into());
        args.push(format!("{}={}", PASSWORD_ENV_VAR, instance.password));
    }

    args.push("-e".into());
    args.push(format!("{}={}", EXTENSIONS_ENV_VAR, instance.extensions.join(",")));

    args.push(BASE_IMAGE.into());

    LaunchCommand { engine, args }
}
