use crate::types::ProductCoordinate;
use crate::version::next_major;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Caller-level misconfiguration detected before any output is produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("only one of check_args, check_command, or check_script may be set")]
    AmbiguousHealthCheck,
    #[error("unknown hook phase '{0}' (valid phases: {keys})", keys = HookPhase::VALID_KEYS)]
    UnknownHookPhase(String),
    #[error("invalid hook script name '{0}': must be a `.sh` file name")]
    InvalidHookScriptName(String),
    #[error("invalid entrypoint '{0}': expected 'module:callable'")]
    InvalidEntrypoint(String),
    #[error("manifest extension key '{0}' collides with a computed manifest key")]
    ExtensionKeyCollision(String),
    #[error("referenced target {found} is not a {expected}")]
    WrongTargetKind {
        expected: &'static str,
        found: TargetKind,
    },
}

/// Discriminant for [`Target`], used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Service,
    Asset,
    Dependency,
    Incompatibility,
    Artifact,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TargetKind::Service => "service",
            TargetKind::Asset => "asset",
            TargetKind::Dependency => "product dependency",
            TargetKind::Incompatibility => "product incompatibility",
            TargetKind::Artifact => "artifact",
        };
        f.write_str(label)
    }
}

/// A declared packaging entity, dispatched by explicit discriminant rather
/// than field-presence probing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    Service(ServiceTarget),
    Asset(AssetTarget),
    Dependency(ProductDependency),
    Incompatibility(ProductIncompatibility),
    Artifact(ArtifactRef),
}

impl Target {
    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Service(_) => TargetKind::Service,
            Target::Asset(_) => TargetKind::Asset,
            Target::Dependency(_) => TargetKind::Dependency,
            Target::Incompatibility(_) => TargetKind::Incompatibility,
            Target::Artifact(_) => TargetKind::Artifact,
        }
    }
}

/// Product type tag carried in the manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    #[default]
    #[serde(rename = "helm.v1")]
    HelmV1,
    #[serde(rename = "asset.v1")]
    AssetV1,
    #[serde(rename = "service.v1")]
    ServiceV1,
}

impl ProductType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductType::HelmV1 => "helm.v1",
            ProductType::AssetV1 => "asset.v1",
            ProductType::ServiceV1 => "service.v1",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single active liveness-probe strategy.
///
/// Constructed from the three raw declaration fields by
/// [`HealthCheck::from_fields`], so downstream code can never observe more
/// than one populated mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthCheck {
    #[default]
    None,
    /// Run the service binary again with dedicated check arguments.
    SameBinaryArgs(Vec<String>),
    /// Run an arbitrary shell command.
    CustomCommand(String),
    /// Copy an operator-provided check script verbatim.
    CustomScript(String),
}

impl HealthCheck {
    /// Resolve the three mutually-exclusive declaration fields into one mode.
    pub fn from_fields(
        check_args: Option<Vec<String>>,
        check_command: Option<String>,
        check_script: Option<String>,
    ) -> Result<Self, ConfigError> {
        let populated = usize::from(check_args.is_some())
            + usize::from(check_command.is_some())
            + usize::from(check_script.is_some());
        if populated > 1 {
            return Err(ConfigError::AmbiguousHealthCheck);
        }
        Ok(if let Some(args) = check_args {
            HealthCheck::SameBinaryArgs(args)
        } else if let Some(command) = check_command {
            HealthCheck::CustomCommand(command)
        } else if let Some(script) = check_script {
            HealthCheck::CustomScript(script)
        } else {
            HealthCheck::None
        })
    }

    pub fn is_none(&self) -> bool {
        matches!(self, HealthCheck::None)
    }

    /// Manifest wire name of the mode.
    pub fn mode_name(&self) -> &'static str {
        match self {
            HealthCheck::None => "none",
            HealthCheck::SameBinaryArgs(_) => "same-binary-args",
            HealthCheck::CustomCommand(_) => "custom-command",
            HealthCheck::CustomScript(_) => "custom-script",
        }
    }
}

/// The seven lifecycle phases of the hook init system, in execution order.
///
/// The derived `Ord` follows declaration order, so maps keyed by phase
/// iterate in lifecycle order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum HookPhase {
    PreConfigure,
    Configure,
    PreStartup,
    Startup,
    PostStartup,
    PreShutdown,
    Shutdown,
}

impl HookPhase {
    pub const ALL: [HookPhase; 7] = [
        HookPhase::PreConfigure,
        HookPhase::Configure,
        HookPhase::PreStartup,
        HookPhase::Startup,
        HookPhase::PostStartup,
        HookPhase::PreShutdown,
        HookPhase::Shutdown,
    ];

    const VALID_KEYS: &'static str =
        "pre-configure, configure, pre-startup, startup, post-startup, pre-shutdown, shutdown";

    pub fn key(self) -> &'static str {
        match self {
            HookPhase::PreConfigure => "pre-configure",
            HookPhase::Configure => "configure",
            HookPhase::PreStartup => "pre-startup",
            HookPhase::Startup => "startup",
            HookPhase::PostStartup => "post-startup",
            HookPhase::PreShutdown => "pre-shutdown",
            HookPhase::Shutdown => "shutdown",
        }
    }

    pub fn from_key(key: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.key() == key)
            .ok_or_else(|| ConfigError::UnknownHookPhase(key.to_owned()))
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// An operator hook script declared for one lifecycle phase: the installed
/// file name and the source path its bytes are supplied under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookScript {
    pub name: String,
    pub source: String,
}

impl HookScript {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Result<Self, ConfigError> {
        let name = name.into();
        let stem_ok = name
            .strip_suffix(".sh")
            .is_some_and(|stem| {
                !stem.is_empty()
                    && stem
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
            });
        if !stem_ok {
            return Err(ConfigError::InvalidHookScriptName(name));
        }
        Ok(Self {
            name,
            source: source.into(),
        })
    }
}

/// Desired/min/max replica counts; every slot is optional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaBounds {
    pub desired: Option<u32>,
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl ReplicaBounds {
    pub fn is_empty(&self) -> bool {
        self.desired.is_none() && self.min.is_none() && self.max.is_none()
    }
}

/// A service packaged as a distribution: identity, launch configuration,
/// health check, hooks, resources, metadata, and resolved references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTarget {
    pub coordinate: ProductCoordinate,
    pub version: String,
    pub product_type: ProductType,
    pub display_name: Option<String>,
    pub description: Option<String>,
    /// `module:callable` reference baked into the launcher configuration.
    pub entrypoint: String,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub runtime_version: Option<String>,
    pub env: BTreeMap<String, String>,
    /// Prebuilt executable path relative to the distribution root.
    pub executable: Option<String>,
    pub health_check: HealthCheck,
    pub hooks: BTreeMap<HookPhase, HookScript>,
    pub resource_requests: BTreeMap<String, String>,
    pub resource_limits: BTreeMap<String, String>,
    pub replication: ReplicaBounds,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub traits: Vec<String>,
    pub manifest_extensions: BTreeMap<String, String>,
}

impl ServiceTarget {
    /// Create a service target with the standard field defaults; everything
    /// else is set directly on the returned value.
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        entrypoint: impl Into<String>,
    ) -> Self {
        Self {
            coordinate: ProductCoordinate::new(group, name),
            version: version.into(),
            product_type: ProductType::HelmV1,
            display_name: None,
            description: None,
            entrypoint: entrypoint.into(),
            command: None,
            args: vec![
                "--host".to_owned(),
                "0.0.0.0".to_owned(),
                "--port".to_owned(),
                "8080".to_owned(),
            ],
            runtime_version: None,
            env: BTreeMap::new(),
            executable: None,
            health_check: HealthCheck::None,
            hooks: BTreeMap::new(),
            resource_requests: BTreeMap::new(),
            resource_limits: BTreeMap::new(),
            replication: ReplicaBounds::default(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            traits: Vec::new(),
            manifest_extensions: BTreeMap::new(),
        }
    }
}

/// One source file mapped into the `asset/` directory of an asset
/// distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMapping {
    pub source: String,
    pub dest: String,
}

/// A static-file distribution: no runtime, no health checks, no hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTarget {
    pub coordinate: ProductCoordinate,
    pub version: String,
    pub product_type: ProductType,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub assets: Vec<AssetMapping>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub manifest_extensions: BTreeMap<String, String>,
}

impl AssetTarget {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            coordinate: ProductCoordinate::new(group, name),
            version: version.into(),
            product_type: ProductType::AssetV1,
            display_name: None,
            description: None,
            assets: Vec::new(),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            manifest_extensions: BTreeMap::new(),
        }
    }
}

/// A declared dependency on another product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDependency {
    pub coordinate: ProductCoordinate,
    pub minimum_version: String,
    pub maximum_version: Option<String>,
    pub recommended_version: Option<String>,
    pub optional: bool,
}

impl ProductDependency {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        minimum_version: impl Into<String>,
    ) -> Self {
        Self {
            coordinate: ProductCoordinate::new(group, name),
            minimum_version: minimum_version.into(),
            maximum_version: None,
            recommended_version: None,
            optional: false,
        }
    }

    pub fn product_id(&self) -> String {
        self.coordinate.product_id()
    }

    /// The explicit maximum when declared, otherwise the next major release
    /// after the minimum.
    pub fn effective_maximum(&self) -> Option<String> {
        self.maximum_version
            .clone()
            .or_else(|| next_major(&self.minimum_version))
    }
}

/// A declared incompatibility with a version range of another product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductIncompatibility {
    pub coordinate: ProductCoordinate,
    pub version_range: String,
    pub reason: String,
}

/// A reference to an external artifact (container image or similar).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub artifact_type: String,
    pub uri: String,
    pub name: Option<String>,
    pub digest: Option<String>,
}

impl ArtifactRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            artifact_type: "oci".to_owned(),
            uri: uri.into(),
            name: None,
            digest: None,
        }
    }
}
