//! # Provisioning Constants
//!
//! Fixed values shared by the port allocator, the launch command
//! synthesizer, the record store and the orchestrator. Configurable
//! defaults (credential, extensions, resource limits) live in
//! [`crate::config`]; everything here is baked into the launch contract.
//!
//! ## Cross-References
//!
//! - [`crate::port`]: Uses the port range and attempt bound
//! - [`crate::command`]: Uses the container-side paths, port and image
//! - [`crate::record`]: Uses the records directory name
//! - [`crate::provision`]: Uses the startup grace period and name prefix

use std::time::Duration;

// =============================================================================
// Port Allocation
// =============================================================================

/// Lowest host port the allocator will hand out.
pub const PORT_RANGE_START: u16 = 10000;

/// Highest host port the allocator will hand out (inclusive).
pub const PORT_RANGE_END: u16 = 65535;

/// Number of random candidates probed before giving up.
///
/// Allocation is probabilistic, not exhaustive. Exceeding this bound
/// yields [`crate::Error::PortExhaustion`].
pub const MAX_PORT_ATTEMPTS: usize = 10;

// =============================================================================
// Container Layout
// =============================================================================

/// Port the editor listens on inside the container.
pub const CONTAINER_PORT: u16 = 8080;

/// Mount point of the caller's workspace inside the container.
pub const CONTAINER_WORKSPACE_PATH: &str = "/home/coder/project";

/// Mount point of the editor state volume inside the container.
pub const CONTAINER_DATA_PATH: &str = "/home/coder/.local/share/code-server";

/// Mount point of the extensions volume inside the container.
pub const CONTAINER_EXTENSIONS_PATH: &str = "/home/coder/.local/share/code-server/extensions";

/// Suffix of the named volume holding editor state (`<instance>-data`).
pub const DATA_VOLUME_SUFFIX: &str = "data";

/// Suffix of the named volume holding extensions (`<instance>-extensions`).
pub const EXTENSIONS_VOLUME_SUFFIX: &str = "extensions";

/// Base image every instance is launched from.
pub const BASE_IMAGE: &str = "codercom/code-server:latest";

/// Environment variable carrying the editor credential.
pub const PASSWORD_ENV_VAR: &str = "PASSWORD";

/// Environment variable carrying the comma-joined extension identifiers.
pub const EXTENSIONS_ENV_VAR: &str = "EXTENSIONS";

// =============================================================================
// Naming
// =============================================================================

/// Prefix of every derived instance name (`<prefix>-<name>-<id>`).
pub const INSTANCE_NAME_PREFIX: &str = "codespawn";

/// Length of the random short instance identifier, in hex characters.
pub const INSTANCE_ID_LEN: usize = 8;

/// Maximum length of the caller-supplied logical name.
pub const MAX_INSTANCE_NAME_LEN: usize = 64;

/// Valid characters for logical instance names.
///
/// Includes: `a-z`, `A-Z`, `0-9`, `-`, `_`
///
/// The derived name is used both as a container name and as a file name
/// under the records directory, so `/` and `.` are excluded.
pub const INSTANCE_NAME_VALID_CHARS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

// =============================================================================
// Timeouts
// =============================================================================

/// Time allowed for the container process to reach a running state before
/// its status is queried.
pub const STARTUP_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Upper bound for a bounded engine CLI invocation (status query).
///
/// The launch itself is never bounded.
pub const ENGINE_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Upper bound for availability probes during runtime detection.
pub const ENGINE_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum bytes of stdout/stderr kept from one engine invocation.
pub const MAX_ENGINE_OUTPUT_SIZE: usize = 1024 * 1024;

// =============================================================================
// Storage Paths
// =============================================================================

/// Hidden base directory under the user's home.
pub const BASE_DIR_NAME: &str = ".codespawn";

/// Subdirectory holding one JSON record per instance.
pub const RECORDS_DIR: &str = "instances";

/// File extension of instance records.
pub const RECORD_EXTENSION: &str = "json";

// =============================================================================
// Name Validation Helper
// =============================================================================

/// Validates a caller-supplied logical instance name.
///
/// # Returns
///
/// `Ok(())` if valid, `Err(reason)` with a description of the failure.
#[inline]
#[must_use = "validation result must be checked before the name is used in paths or commands"]
pub fn validate_instance_name(name: &str) -> std::result::Result<(), &'static str> {
    if name.is_empty() {
        return Err("name cannot be empty");
    }
    if name.len() > MAX_INSTANCE_NAME_LEN {
        return Err("name exceeds maximum length");
    }
    if !name.chars().all(|c| INSTANCE_NAME_VALID_CHARS.contains(c)) {
        return Err("name contains invalid characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_instance_name() {
        assert!(validate_instance_name("demo").is_ok());
        assert!(validate_instance_name("my_project-2").is_ok());
        assert!(validate_instance_name("").is_err());
        assert!(validate_instance_name("../etc").is_err());
        assert!(validate_instance_name("has space").is_err());
        assert!(validate_instance_name(&"a".repeat(MAX_INSTANCE_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_port_range_is_ordered() {
        assert!(PORT_RANGE_START < PORT_RANGE_END);
        assert!(CONTAINER_PORT < PORT_RANGE_START);
    }
}
