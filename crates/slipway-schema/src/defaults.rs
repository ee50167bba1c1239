use serde::{Deserialize, Serialize};

/// Subsystem-level packaging defaults.
///
/// Threaded explicitly into every generation and packaging call; nothing in
/// this workspace reads configuration from ambient or global state, which is
/// what keeps per-target packaging safe to run in parallel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackagingDefaults {
    /// Manifest schema version written as `manifest-version`.
    pub manifest_version: String,
    /// Command used when a service target declares none.
    pub default_command: String,
    /// Runtime version used when a service target declares none.
    pub default_runtime_version: String,
    /// Promote the strict-promotable warning classes to errors.
    pub strict_validation: bool,
    /// Seconds the init script waits for graceful shutdown before SIGKILL.
    pub shutdown_timeout_secs: u32,
}

impl Default for PackagingDefaults {
    fn default() -> Self {
        Self {
            manifest_version: "1.0".to_owned(),
            default_command: "uvicorn".to_owned(),
            default_runtime_version: "3.11".to_owned(),
            strict_validation: true,
            shutdown_timeout_secs: 30,
        }
    }
}
