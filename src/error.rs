//! Error types for the provisioning layer.

use serde::Serialize;
use std::path::PathBuf;

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while provisioning an instance.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // =========================================================================
    // Input Errors
    // =========================================================================
    /// A required parameter is missing or malformed.
    #[error("invalid parameter '{field}': {reason}")]
    InvalidParameter { field: String, reason: String },

    /// The workspace directory does not exist on disk.
    #[error("workspace not found: {}", path.display())]
    WorkspaceNotFound { path: PathBuf },

    // =========================================================================
    // Runtime Errors
    // =========================================================================
    /// No candidate container engine is installed and responsive.
    #[error(
        "no container runtime available (tried {}); install one and make sure its service is running",
        tried.join(", ")
    )]
    NoRuntimeAvailable { tried: Vec<String> },

    /// The engine rejected the launch for a reason other than a port race.
    #[error("failed to launch instance '{name}': {reason}")]
    LaunchFailed { name: String, reason: String },

    /// The container never reported a running status.
    #[error("instance '{name}' failed to start")]
    StartupVerificationFailed { name: String },

    // =========================================================================
    // Port Errors
    // =========================================================================
    /// The requested port is already bound on this host.
    ///
    /// `suggested_port` is `None` when no free alternative was found.
    #[error("port {port} is already in use; {}", suggestion(suggested_port))]
    PortConflict {
        port: u16,
        suggested_port: Option<u16>,
    },

    /// The port was free when probed but the engine reported it taken.
    #[error(
        "port {port} was taken before the instance could bind it; {}",
        suggestion(suggested_port)
    )]
    PortConflictAtLaunch {
        port: u16,
        suggested_port: Option<u16>,
    },

    /// The allocator gave up without finding a free port.
    #[error("no free port found after {attempts} attempts")]
    PortExhaustion { attempts: usize },

    // =========================================================================
    // Storage Errors
    // =========================================================================
    /// Writing or reading an instance record failed.
    #[error("failed to write instance record at {}: {reason}", path.display())]
    StorageWriteFailed { path: PathBuf, reason: String },

    /// Record not found.
    #[error("instance record not found: {0}")]
    RecordNotFound(String),

    // =========================================================================
    // I/O Errors
    // =========================================================================
    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An engine CLI call exceeded its time bound.
    #[error("operation timed out after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: std::time::Duration,
    },

    // =========================================================================
    // Internal Errors
    // =========================================================================
    /// Internal error (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

fn suggestion(suggested_port: &Option<u16>) -> String {
    match suggested_port {
        Some(port) => format!("try port {}", port),
        None => "no free alternative port was found".to_string(),
    }
}

/// Structured, caller-actionable details attached to an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Error {
    /// Shorthand for [`Error::InvalidParameter`].
    pub fn invalid_parameter(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::WorkspaceNotFound { .. } => "WORKSPACE_NOT_FOUND",
            Self::NoRuntimeAvailable { .. } => "NO_RUNTIME_AVAILABLE",
            Self::LaunchFailed { .. } => "LAUNCH_FAILED",
            Self::StartupVerificationFailed { .. } => "STARTUP_VERIFICATION_FAILED",
            Self::PortConflict { .. } => "PORT_CONFLICT",
            Self::PortConflictAtLaunch { .. } => "PORT_CONFLICT_AT_LAUNCH",
            Self::PortExhaustion { .. } => "PORT_EXHAUSTION",
            Self::StorageWriteFailed { .. } | Self::RecordNotFound(_) => "STORAGE_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if the caller can succeed on a new attempt by acting on
    /// the error details (e.g. resubmitting with the suggested port).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PortConflict { .. } | Self::PortConflictAtLaunch { .. } | Self::LaunchFailed { .. }
        )
    }

    /// Returns structured details, if this error carries any.
    pub fn details(&self) -> Option<ErrorDetails> {
        match self {
            Self::InvalidParameter { field, .. } => Some(ErrorDetails {
                field: Some(field.clone()),
                ..Default::default()
            }),
            Self::WorkspaceNotFound { path } | Self::StorageWriteFailed { path, .. } => {
                Some(ErrorDetails {
                    path: Some(path.clone()),
                    ..Default::default()
                })
            }
            Self::PortConflict {
                port,
                suggested_port,
            }
            | Self::PortConflictAtLaunch {
                port,
                suggested_port,
            } => Some(ErrorDetails {
                requested_port: Some(*port),
                suggested_port: *suggested_port,
                ..Default::default()
            }),
            Self::LaunchFailed { name, .. } | Self::StartupVerificationFailed { name } => {
                Some(ErrorDetails {
                    instance_name: Some(name.clone()),
                    ..Default::default()
                })
            }
            _ => None,
        }
    }
}
