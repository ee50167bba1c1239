use serde::{Deserialize, Serialize};
use slipway_schema::Manifest;
use std::collections::BTreeMap;
use std::fmt;

/// Name of the launcher executable bundled per platform.
pub const LAUNCHER_BINARY_NAME: &str = "python-service-launcher";

/// Layout path of the static launcher configuration document.
pub const LAUNCHER_STATIC_PATH: &str = "service/bin/launcher-static.yml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Darwin,
}

impl Os {
    pub fn as_str(self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Darwin => "darwin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    pub fn as_str(self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }
}

/// A launcher binary platform key. The assembler never detects the host
/// platform; binaries arrive keyed by this value from the binary supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os.as_str(), self.arch.as_str())
    }
}

/// Platforms every distribution must bundle a launcher binary for.
pub const REQUIRED_PLATFORMS: [Platform; 4] = [
    Platform::new(Os::Darwin, Arch::Amd64),
    Platform::new(Os::Darwin, Arch::Arm64),
    Platform::new(Os::Linux, Arch::Amd64),
    Platform::new(Os::Linux, Arch::Arm64),
];

/// Layout path of one platform's launcher binary, e.g.
/// `service/bin/linux-amd64/python-service-launcher`.
pub fn launcher_path(platform: Platform) -> String {
    format!("service/bin/{platform}/{LAUNCHER_BINARY_NAME}")
}

/// The static launcher configuration document (`launcher-static.yml`).
///
/// Field names are camelCase to match the launcher's own configuration
/// struct exactly; this is a wire contract with an external binary. The
/// whole document is a pure projection of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticLauncherConfig {
    pub config_type: String,
    pub config_version: u32,
    pub launch_mode: String,
    pub executable: String,
    pub entry_point: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl StaticLauncherConfig {
    /// Project the launcher configuration out of a service manifest.
    /// Returns `None` for asset manifests, which have no launch configuration.
    pub fn from_manifest(manifest: &Manifest) -> Option<Self> {
        let launch = manifest.launch.as_ref()?;
        Some(Self {
            config_type: "python".to_owned(),
            config_version: 1,
            launch_mode: launch.mode.as_str().to_owned(),
            executable: launch.executable.clone(),
            entry_point: launch.entry_point.qualified(),
            args: launch.args.clone(),
            env: launch.env.clone(),
        })
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml_ng::Error> {
        serde_yaml_ng::to_string(self)
    }
}

/// Launcher configuration for the same-binary health-check mode
/// (`launcher-check.yml`): same executable, dedicated arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckLauncherConfig {
    pub config_type: String,
    pub config_version: u32,
    pub executable: String,
    pub entry_point: String,
    pub args: Vec<String>,
}

impl CheckLauncherConfig {
    pub fn from_manifest(manifest: &Manifest, check_args: &[String]) -> Option<Self> {
        let launch = manifest.launch.as_ref()?;
        Some(Self {
            config_type: "python".to_owned(),
            config_version: 1,
            executable: launch.executable.clone(),
            entry_point: launch.entry_point.qualified(),
            args: check_args.to_vec(),
        })
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml_ng::Error> {
        serde_yaml_ng::to_string(self)
    }
}
