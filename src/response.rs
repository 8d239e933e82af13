//! Structured results handed back to the caller.
//!
//! ```json
//! {"success":true,"instance":{...},"summary":"..."}
//! {"success":false,"error":{"code":"PORT_CONFLICT","message":"...","recoverable":true,"details":{"suggested_port":23456}}}
//! ```

use crate::error::{Error, ErrorDetails};
use crate::instance::ResolvedInstance;
use serde::Serialize;
use std::path::PathBuf;

/// A successfully provisioned, running instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionedInstance {
    #[serde(flatten)]
    pub instance: ResolvedInstance,
    /// Browser URL of the editor.
    pub url: String,
    /// Status string reported by the engine.
    pub status: String,
    /// True when the editor was launched without a credential.
    pub passwordless: bool,
    /// Location of the persisted record.
    pub record_path: PathBuf,
}

impl ProvisionedInstance {
    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        let access = if self.passwordless {
            "no password required"
        } else {
            "password protected"
        };
        format!(
            "Instance '{}' is running on {} at {} ({}), serving {}",
            self.instance.instance_name,
            self.instance.runtime,
            self.url,
            access,
            self.instance.workspace_path.display()
        )
    }
}

/// Caller-facing description of a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDescriptor {
    pub code: String,
    pub message: String,
    pub recoverable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

impl From<&Error> for ErrorDescriptor {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            details: err.details(),
        }
    }
}

/// Outcome of one create-instance call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<ProvisionedInstance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDescriptor>,
}

impl ProvisionResponse {
    /// Wraps a successful result.
    pub fn success(instance: ProvisionedInstance) -> Self {
        Self {
            success: true,
            summary: Some(instance.summary()),
            instance: Some(instance),
            error: None,
        }
    }

    /// Wraps a failure.
    pub fn failure(err: &Error) -> Self {
        Self {
            success: false,
            instance: None,
            summary: None,
            error: Some(ErrorDescriptor::from(err)),
        }
    }

    /// Serializes the response as pretty JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<crate::Result<ProvisionedInstance>> for ProvisionResponse {
    fn from(result: crate::Result<ProvisionedInstance>) -> Self {
        match result {
            Ok(instance) => Self::success(instance),
            Err(err) => Self::failure(&err),
        }
    }
}
