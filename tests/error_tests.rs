//! Tests for error types.
//!
//! Validates display formatting, machine codes, recoverability and the
//! structured details handed back to callers.

use codespawn::{Error, ErrorDescriptor};
use std::path::PathBuf;

// =============================================================================
// Codes and Recoverability
// =============================================================================

#[test]
fn test_taxonomy_codes_and_recoverability() {
    let cases: Vec<(Error, &str, bool)> = vec![
        (Error::invalid_parameter("name", "name is required"), "INVALID_PARAMETER", false),
        (
            Error::NoRuntimeAvailable {
                tried: vec!["docker".into(), "podman".into()],
            },
            "NO_RUNTIME_AVAILABLE",
            false,
        ),
        (
            Error::WorkspaceNotFound {
                path: PathBuf::from("/nope"),
            },
            "WORKSPACE_NOT_FOUND",
            false,
        ),
        (
            Error::PortConflict {
                port: 1,
                suggested_port: Some(2),
            },
            "PORT_CONFLICT",
            true,
        ),
        (
            Error::PortConflictAtLaunch {
                port: 1,
                suggested_port: Some(2),
            },
            "PORT_CONFLICT_AT_LAUNCH",
            true,
        ),
        (
            Error::LaunchFailed {
                name: "x".into(),
                reason: "boom".into(),
            },
            "LAUNCH_FAILED",
            true,
        ),
        (
            Error::StartupVerificationFailed { name: "x".into() },
            "STARTUP_VERIFICATION_FAILED",
            false,
        ),
        (Error::PortExhaustion { attempts: 10 }, "PORT_EXHAUSTION", false),
    ];

    for (err, code, recoverable) in cases {
        assert_eq!(err.code(), code, "code for {:?}", err);
        assert_eq!(err.is_recoverable(), recoverable, "recoverability of {:?}", err);
    }
}

// =============================================================================
// Display
// =============================================================================

#[test]
fn test_invalid_parameter_display() {
    let err = Error::invalid_parameter("workspace_path", "workspace path is required");
    let msg = err.to_string();
    assert!(msg.contains("workspace_path"));
    assert!(msg.contains("required"));
}

#[test]
fn test_launch_failed_carries_engine_message() {
    let err = Error::LaunchFailed {
        name: "codespawn-demo-1234abcd".into(),
        reason: "manifest unknown".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("codespawn-demo-1234abcd"));
    assert!(msg.contains("manifest unknown"));
}

#[test]
fn test_startup_failure_display() {
    let err = Error::StartupVerificationFailed {
        name: "codespawn-demo-1234abcd".into(),
    };
    assert!(err.to_string().contains("failed to start"));
}

#[test]
fn test_timeout_display() {
    let err = Error::Timeout {
        operation: "docker ps".into(),
        duration: std::time::Duration::from_secs(120),
    };
    let msg = err.to_string();
    assert!(msg.contains("timed out"));
    assert!(msg.contains("docker ps"));
}

// =============================================================================
// Details
// =============================================================================

#[test]
fn test_port_conflict_at_launch_details() {
    let err = Error::PortConflictAtLaunch {
        port: 12345,
        suggested_port: Some(54321),
    };
    let descriptor = ErrorDescriptor::from(&err);
    assert_eq!(descriptor.code, "PORT_CONFLICT_AT_LAUNCH");
    assert!(descriptor.recoverable);
    let details = descriptor.details.unwrap();
    assert_eq!(details.requested_port, Some(12345));
    assert_eq!(details.suggested_port, Some(54321));
}

#[test]
fn test_details_serialize_without_empty_fields() {
    let err = Error::WorkspaceNotFound {
        path: PathBuf::from("/tmp/missing"),
    };
    let json = serde_json::to_value(err.details().unwrap()).unwrap();
    assert_eq!(json["path"], "/tmp/missing");
    assert!(json.get("suggested_port").is_none());
}

#[test]
fn test_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: Error = io.into();
    assert_eq!(err.code(), "IO_ERROR");
    assert!(err.details().is_none());
}
