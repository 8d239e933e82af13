//! # Provisioning Orchestrator
//!
//! Composes runtime detection, port allocation, record persistence, launch
//! command synthesis and startup verification into the create-instance
//! workflow.
//!
//! ## State Machine
//!
//! ```text
//!   Validating ──► ResolvingRuntime ──► ResolvingPort ──► Persisting
//!       │                 │                  │                │
//!       ▼                 ▼                  ▼                ▼
//!  FailedFatal       FailedFatal     FailedRecoverable    Launching ──► Verifying ──► Succeeded
//!                  (also missing       (port busy,            │             │
//!                   workspace)        suggestion given)       ▼             ▼
//!                                                   FailedRecoverable   FailedFatal
//! ```
//!
//! ## Record Lifecycle
//!
//! | Outcome                    | Record          |
//! |----------------------------|-----------------|
//! | Failure before Persisting  | never written   |
//! | Port collision at launch   | deleted         |
//! | Any other launch failure   | kept            |
//! | Startup verification fails | kept            |
//! | Success                    | kept            |
//!
//! Nothing is retried automatically. Recoverable failures carry the
//! details (e.g. a suggested port) the caller needs for the next attempt.

use crate::command::build_launch_command;
use crate::config::Config;
use crate::constants::{STARTUP_GRACE_PERIOD, validate_instance_name};
use crate::detect::{RuntimeCache, RuntimeDetector};
use crate::engine::{EngineGateway, EngineKind};
use crate::error::{Error, Result};
use crate::instance::{InstanceSpec, ResolvedInstance, generate_instance_id};
use crate::port::{PortAllocator, TcpPortProbe};
use crate::record::RecordStore;
use crate::response::{ProvisionResponse, ProvisionedInstance};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Engine error fragments that mean the host port was taken between the
/// probe and the launch.
const PORT_COLLISION_MARKERS: &[&str] = &["already allocated", "address already in use"];

/// Phases of one provisioning call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionState {
    Validating,
    ResolvingRuntime,
    ResolvingPort,
    Persisting,
    Launching,
    Verifying,
    Succeeded,
}

impl std::fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validating => write!(f, "validating"),
            Self::ResolvingRuntime => write!(f, "resolving-runtime"),
            Self::ResolvingPort => write!(f, "resolving-port"),
            Self::Persisting => write!(f, "persisting"),
            Self::Launching => write!(f, "launching"),
            Self::Verifying => write!(f, "verifying"),
            Self::Succeeded => write!(f, "succeeded"),
        }
    }
}

/// Returns true if an engine error message reports a host port collision.
pub fn is_port_collision(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    PORT_COLLISION_MARKERS.iter().any(|m| lower.contains(m))
}

/// Validated view of an [`InstanceSpec`].
struct ValidatedSpec {
    workspace: PathBuf,
    runtime: Option<EngineKind>,
}

/// Creates editor instances.
///
/// One provisioner may serve many concurrent calls. The only state shared
/// between calls is the [`RuntimeCache`].
pub struct Provisioner {
    config: Config,
    gateway: Arc<dyn EngineGateway>,
    detector: RuntimeDetector,
    allocator: PortAllocator,
    store: RecordStore,
    startup_grace: Duration,
}

impl Provisioner {
    /// Creates a provisioner that probes real sockets and writes records
    /// under `config.records_dir`.
    pub fn new(config: Config, gateway: Arc<dyn EngineGateway>) -> Self {
        let store = RecordStore::with_path(config.records_dir.clone());
        Self {
            detector: RuntimeDetector::new(gateway.clone()),
            allocator: PortAllocator::new(Arc::new(TcpPortProbe)),
            store,
            config,
            gateway,
            startup_grace: STARTUP_GRACE_PERIOD,
        }
    }

    /// Shares a runtime cache with other provisioners.
    pub fn with_runtime_cache(mut self, cache: Arc<RuntimeCache>) -> Self {
        self.detector = RuntimeDetector::with_cache(self.gateway.clone(), cache);
        self
    }

    /// Replaces the port allocator (and with it the port probe).
    pub fn with_port_allocator(mut self, allocator: PortAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    /// Overrides the wait between launch and status query.
    pub fn with_startup_grace(mut self, grace: Duration) -> Self {
        self.startup_grace = grace;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the record store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Returns the runtime cache.
    pub fn runtime_cache(&self) -> &Arc<RuntimeCache> {
        self.detector.cache()
    }

    /// Runs the create workflow and folds the outcome into a response.
    pub async fn create(&self, spec: &InstanceSpec) -> ProvisionResponse {
        let result = self.provision(spec).await;
        if let Err(e) = &result {
            warn!("provisioning '{}' failed [{}]: {}", spec.name, e.code(), e);
        }
        ProvisionResponse::from(result)
    }

    /// Runs the create workflow.
    pub async fn provision(&self, spec: &InstanceSpec) -> Result<ProvisionedInstance> {
        self.enter(ProvisionState::Validating, &spec.name);
        let validated = Self::validate(spec)?;

        self.enter(ProvisionState::ResolvingRuntime, &spec.name);
        let explicit = validated.runtime.or(self.config.runtime_mode.forced());
        let runtime = self.detector.resolve(explicit).await?;

        let workspace = Self::resolve_workspace(&validated.workspace).await?;

        self.enter(ProvisionState::ResolvingPort, &spec.name);
        let port = self.resolve_port(spec.port).await?;

        self.enter(ProvisionState::Persisting, &spec.name);
        let instance = ResolvedInstance::resolve(
            spec,
            &self.config,
            generate_instance_id(),
            runtime,
            port,
            workspace,
        );
        let record_path = self.store.save(&instance)?;

        self.enter(ProvisionState::Launching, &instance.instance_name);
        self.launch(&instance, &record_path).await?;

        self.enter(ProvisionState::Verifying, &instance.instance_name);
        let status = self.verify(&instance).await?;

        self.enter(ProvisionState::Succeeded, &instance.instance_name);
        info!(
            "instance {} running on {} at {}",
            instance.instance_name,
            runtime,
            instance.url()
        );

        Ok(ProvisionedInstance {
            url: instance.url(),
            passwordless: instance.is_passwordless(),
            status,
            record_path,
            instance,
        })
    }

    fn enter(&self, state: ProvisionState, subject: &str) {
        debug!("provision [{}]: {}", subject, state);
    }

    fn validate(spec: &InstanceSpec) -> Result<ValidatedSpec> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(Error::invalid_parameter("name", "name is required"));
        }
        validate_instance_name(name).map_err(|reason| Error::invalid_parameter("name", reason))?;

        if spec.workspace_path.trim().is_empty() {
            return Err(Error::invalid_parameter(
                "workspace_path",
                "workspace path is required",
            ));
        }

        if spec.port == Some(0) {
            return Err(Error::invalid_parameter("port", "port must be between 1 and 65535"));
        }

        let runtime = spec
            .runtime
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .map(str::parse::<EngineKind>)
            .transpose()?;

        Ok(ValidatedSpec {
            workspace: PathBuf::from(&spec.workspace_path),
            runtime,
        })
    }

    async fn resolve_workspace(workspace: &Path) -> Result<PathBuf> {
        let absolute = std::path::absolute(workspace)?;
        match tokio::fs::metadata(&absolute).await {
            Ok(meta) if meta.is_dir() => Ok(absolute),
            _ => Err(Error::WorkspaceNotFound { path: absolute }),
        }
    }

    async fn resolve_port(&self, requested: Option<u16>) -> Result<u16> {
        let Some(port) = requested else {
            return self.allocator.allocate().await;
        };

        if self.allocator.probe().is_port_free(port).await {
            return Ok(port);
        }

        info!("requested port {} is busy", port);
        let suggested_port = self.suggest_port(port).await;
        Err(Error::PortConflict {
            port,
            suggested_port,
        })
    }

    /// Looks for a free alternative to `rejected`. Exhaustion yields `None`
    /// so the caller still sees the conflict.
    async fn suggest_port(&self, rejected: u16) -> Option<u16> {
        match self.allocator.allocate_excluding(&[rejected]).await {
            Ok(port) => {
                debug!("suggesting port {} instead of {}", port, rejected);
                Some(port)
            }
            Err(e) => {
                warn!("no alternative to port {}: {}", rejected, e);
                None
            }
        }
    }

    async fn launch(&self, instance: &ResolvedInstance, record_path: &Path) -> Result<()> {
        let command = build_launch_command(instance.runtime, instance);
        debug!("launch command: {}", command.render());

        let output = match self.gateway.invoke(instance.runtime, &command.args).await {
            Ok(output) => output,
            Err(e) => {
                return Err(Error::LaunchFailed {
                    name: instance.instance_name.clone(),
                    reason: e.to_string(),
                });
            }
        };

        if output.is_success() {
            debug!("{} accepted {}", instance.runtime, instance.instance_name);
            return Ok(());
        }

        let reason = output.error_message();
        if is_port_collision(&reason) {
            warn!(
                "port {} collided at launch of {}: {}",
                instance.port, instance.instance_name, reason
            );
            self.store.delete(record_path);
            let suggested_port = self.suggest_port(instance.port).await;
            return Err(Error::PortConflictAtLaunch {
                port: instance.port,
                suggested_port,
            });
        }

        Err(Error::LaunchFailed {
            name: instance.instance_name.clone(),
            reason,
        })
    }

    async fn verify(&self, instance: &ResolvedInstance) -> Result<String> {
        if !self.startup_grace.is_zero() {
            tokio::time::sleep(self.startup_grace).await;
        }

        let status = match self
            .gateway
            .query_status(instance.runtime, &instance.instance_name)
            .await
        {
            Ok(status) => status.trim().to_string(),
            Err(e) => {
                warn!("status query for {} failed: {}", instance.instance_name, e);
                String::new()
            }
        };

        if status.is_empty() {
            return Err(Error::StartupVerificationFailed {
                name: instance.instance_name.clone(),
            });
        }
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_collision_markers() {
        assert!(is_port_collision(
            "Bind for 0.0.0.0:12345 failed: port is already allocated"
        ));
        assert!(is_port_collision(
            "rootlessport listen tcp 0.0.0.0:12345: bind: Address already in use"
        ));
        assert!(!is_port_collision("pull access denied for codercom/code-server"));
    }

    #[test]
    fn test_validate_requires_name_and_workspace() {
        let err = Provisioner::validate(&InstanceSpec::new("", "/tmp")).err().unwrap();
        assert!(matches!(err, Error::InvalidParameter { ref field, .. } if field == "name"));

        let err = Provisioner::validate(&InstanceSpec::new("demo", "  ")).err().unwrap();
        assert!(matches!(err, Error::InvalidParameter { ref field, .. } if field == "workspace_path"));
    }

    #[test]
    fn test_validate_keeps_workspace_verbatim() {
        let spec = InstanceSpec::new("demo", " /srv/my project ");
        let validated = Provisioner::validate(&spec).ok().unwrap();
        assert_eq!(validated.workspace, PathBuf::from(" /srv/my project "));
    }

    #[test]
    fn test_validate_rejects_unknown_runtime() {
        let spec = InstanceSpec::new("demo", "/tmp").runtime("lxc");
        let err = Provisioner::validate(&spec).err().unwrap();
        assert_eq!(err.code(), "INVALID_PARAMETER");
    }

    #[test]
    fn test_validate_accepts_runtime_override() {
        let spec = InstanceSpec::new("demo", "/tmp").runtime("podman");
        let validated = Provisioner::validate(&spec).ok().unwrap();
        assert_eq!(validated.runtime, Some(EngineKind::Podman));
    }
}
