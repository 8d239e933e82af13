//! # codespawn
//!
//! **Provisioning orchestrator for containerized editor instances**
//!
//! This crate creates ephemeral, browser-accessible code editor instances
//! on top of whichever local container engine is usable (Docker or
//! Podman). It covers the create path only: detecting the engine, picking
//! a host port, persisting an instance record, launching the container and
//! verifying it came up, with rollback on the one recoverable launch
//! failure.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            Provisioner                              │
//! │  validate → runtime → workspace → port → persist → launch → verify  │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌────────────────┐  ┌───────────────┐  ┌─────────────────────┐     │
//! │  │ RuntimeDetector│  │ PortAllocator │  │    RecordStore      │     │
//! │  │ + RuntimeCache │  │ + PortProbe   │  │  <name>.json files  │     │
//! │  └───────┬────────┘  └───────────────┘  └─────────────────────┘     │
//! │          │            ┌─────────────────────────┐                   │
//! │          │            │ build_launch_command    │                   │
//! │          │            │ (pure, per-engine flags)│                   │
//! │          │            └────────────┬────────────┘                   │
//! ├──────────┴─────────────────────────┴────────────────────────────────┤
//! │                    EngineGateway (docker / podman CLI)              │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Failure Model
//!
//! | Error                        | Kind        | Side effects left behind |
//! |------------------------------|-------------|--------------------------|
//! | `InvalidParameter`           | fatal       | none                     |
//! | `NoRuntimeAvailable`         | fatal       | none                     |
//! | `WorkspaceNotFound`          | fatal       | none                     |
//! | `PortConflict`               | recoverable | none                     |
//! | `PortConflictAtLaunch`       | recoverable | record rolled back       |
//! | `LaunchFailed`               | recoverable | record kept              |
//! | `StartupVerificationFailed`  | fatal       | record kept              |
//! | `PortExhaustion`             | fatal       | none                     |
//!
//! # Example
//!
//! ```rust,ignore
//! use codespawn::{CliGateway, Config, InstanceSpec, Provisioner};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> codespawn::Result<()> {
//!     let provisioner = Provisioner::new(Config::from_env(), Arc::new(CliGateway::new()));
//!     let spec = InstanceSpec::new("demo", "/tmp/ws").port(12345).password("");
//!     let instance = provisioner.provision(&spec).await?;
//!     println!("{}", instance.url);
//!     Ok(())
//! }
//! ```

pub mod command;
pub mod config;
pub mod constants;
pub mod detect;
pub mod engine;
pub mod error;
pub mod instance;
pub mod port;
pub mod provision;
pub mod record;
pub mod response;

// Re-exports
pub use command::{LaunchCommand, build_launch_command};
pub use config::{Config, RuntimeMode};
pub use constants::*;
pub use detect::{RuntimeCache, RuntimeDetector};
pub use engine::{CliGateway, EngineGateway, EngineKind, EngineOutput};
pub use error::{Error, ErrorDetails, Result};
pub use instance::{InstanceSpec, ResolvedInstance, ResourceLimits};
pub use port::{PortAllocator, PortProbe, TcpPortProbe};
pub use provision::{ProvisionState, Provisioner};
pub use record::RecordStore;
pub use response::{ErrorDescriptor, ProvisionResponse, ProvisionedInstance};
