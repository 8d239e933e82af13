//! Instance specifications and their resolved form.
//!
//! An [`InstanceSpec`] is what the caller asks for; a [`ResolvedInstance`]
//! is that request after defaults, overrides and allocation have been
//! applied. The resolved form is what gets persisted as the instance
//! record and what the launch command is synthesized from.

use crate::config::Config;
use crate::constants::{INSTANCE_ID_LEN, INSTANCE_NAME_PREFIX};
use crate::engine::EngineKind;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// =============================================================================
// Instance Spec (caller input)
// =============================================================================

/// Parameters of one create-instance call.
///
/// `password` distinguishes three cases: `None` uses the configured
/// default credential, `Some("")` launches without a credential, and any
/// other value is used verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Logical instance name.
    #[serde(default)]
    pub name: String,
    /// Host directory mounted as the editor workspace.
    #[serde(default)]
    pub workspace_path: String,
    /// Requested host port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Editor credential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Extension identifiers to install.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    /// CPU limit (engine syntax, e.g. `"2"` or `"1.5"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_limit: Option<String>,
    /// Memory limit (engine syntax, e.g. `"4g"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,
    /// Extra environment for the container, in insertion order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    /// Explicit engine override (`"docker"` or `"podman"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
}

impl InstanceSpec {
    /// Creates a spec with the two required fields set.
    pub fn new(name: impl Into<String>, workspace_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workspace_path: workspace_path.into(),
            ..Default::default()
        }
    }

    /// Sets the requested port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the credential (`""` for passwordless).
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the extension list.
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the CPU limit.
    pub fn cpu_limit(mut self, cpu: impl Into<String>) -> Self {
        self.cpu_limit = Some(cpu.into());
        self
    }

    /// Sets the memory limit.
    pub fn memory_limit(mut self, memory: impl Into<String>) -> Self {
        self.memory_limit = Some(memory.into());
        self
    }

    /// Appends an environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Sets the engine override.
    pub fn runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }
}

// =============================================================================
// Resolved Instance
// =============================================================================

/// CPU and memory limits passed to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu: String,
    pub memory: String,
}

/// A fully resolved instance, persisted as the instance record.
///
/// Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedInstance {
    /// Short random identifier.
    pub id: String,
    /// Logical name as supplied by the caller.
    pub name: String,
    /// Derived name used for the container, volumes and record file.
    pub instance_name: String,
    /// Engine the instance runs on.
    pub runtime: EngineKind,
    /// Host port mapped to the editor.
    pub port: u16,
    /// Absolute host workspace path.
    pub workspace_path: PathBuf,
    /// Editor credential; empty means passwordless.
    pub password: String,
    /// Extension identifiers.
    pub extensions: Vec<String>,
    /// Resource limits.
    pub limits: ResourceLimits,
    /// Container environment, in insertion order.
    pub environment: IndexMap<String, String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ResolvedInstance {
    /// Resolves a spec against configuration defaults.
    ///
    /// The runtime, port and absolute workspace path are decided by the
    /// orchestrator and passed in.
    pub fn resolve(
        spec: &InstanceSpec,
        config: &Config,
        id: String,
        runtime: EngineKind,
        port: u16,
        workspace_path: PathBuf,
    ) -> Self {
        let name = spec.name.trim().to_string();
        Self {
            instance_name: derive_instance_name(&name, &id),
            id,
            name,
            runtime,
            port,
            workspace_path,
            password: spec
                .password
                .clone()
                .unwrap_or_else(|| config.default_password.clone()),
            extensions: spec
                .extensions
                .clone()
                .unwrap_or_else(|| config.default_extensions.clone()),
            limits: ResourceLimits {
                cpu: spec
                    .cpu_limit
                    .clone()
                    .unwrap_or_else(|| config.cpu_limit.clone()),
                memory: spec
                    .memory_limit
                    .clone()
                    .unwrap_or_else(|| config.memory_limit.clone()),
            },
            environment: spec.environment.clone(),
            created_at: Utc::now(),
        }
    }

    /// Returns true if the instance is launched without a credential.
    pub fn is_passwordless(&self) -> bool {
        self.password.is_empty()
    }

    /// Returns the browser URL of the instance.
    pub fn url(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

/// Generates a short random instance identifier.
pub fn generate_instance_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(INSTANCE_ID_LEN);
    id
}

/// Derives the instance name `<prefix>-<name>-<id>`.
pub fn derive_instance_name(name: &str, id: &str) -> String {
    format!("{}-{}-{}", INSTANCE_NAME_PREFIX, name, id)
}
