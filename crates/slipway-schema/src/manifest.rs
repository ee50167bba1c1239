use crate::target::{
    ArtifactRef, HealthCheck, HookPhase, HookScript, ProductDependency, ProductIncompatibility,
    ProductType, ReplicaBounds,
};
use crate::types::ProductCoordinate;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::{Mapping, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Entry point of a service, split from the declared `module:callable` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub module: String,
    pub callable: String,
}

impl EntryPoint {
    /// The `module:callable` form written into launcher configuration.
    pub fn qualified(&self) -> String {
        format!("{}:{}", self.module, self.callable)
    }
}

/// Launch mode derived from the service command by fixed lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    Asgi,
    Wsgi,
    Custom,
}

impl LaunchMode {
    /// Known web-server commands map to their named mode; anything else is
    /// the generic custom mode.
    pub fn from_command(command: &str) -> Self {
        match command {
            "uvicorn" => LaunchMode::Asgi,
            "gunicorn" => LaunchMode::Wsgi,
            _ => LaunchMode::Custom,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LaunchMode::Asgi => "asgi",
            LaunchMode::Wsgi => "wsgi",
            LaunchMode::Custom => "custom",
        }
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully-resolved launch configuration of a service manifest. Every field is
/// concrete; subsystem defaults have already been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub mode: LaunchMode,
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub runtime_version: String,
    /// Executable path relative to the distribution root.
    pub executable: String,
    pub entry_point: EntryPoint,
}

/// The derived, immutable manifest value.
///
/// Constructed fresh per generation call by
/// [`generate_service_manifest`](crate::generate::generate_service_manifest)
/// / [`generate_asset_manifest`](crate::generate::generate_asset_manifest),
/// never mutated afterwards, and consumed by the validator and the
/// distribution assembler. All lists are pre-sorted by their natural
/// identifier, so serialization is deterministic regardless of declaration
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub manifest_version: String,
    pub product_type: ProductType,
    pub coordinate: ProductCoordinate,
    pub product_version: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub traits: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    pub resource_requests: BTreeMap<String, String>,
    pub resource_limits: BTreeMap<String, String>,
    pub replication: ReplicaBounds,
    /// `None` for asset distributions.
    pub launch: Option<LaunchSpec>,
    pub health_check: HealthCheck,
    pub hooks: BTreeMap<HookPhase, HookScript>,
    pub product_dependencies: Vec<ProductDependency>,
    pub product_incompatibilities: Vec<ProductIncompatibility>,
    pub artifacts: Vec<ArtifactRef>,
    pub extensions: BTreeMap<String, String>,
}

impl Manifest {
    pub fn product_id(&self) -> String {
        self.coordinate.product_id()
    }

    /// Distribution directory name: `<product-name>-<version>`.
    pub fn dist_name(&self) -> String {
        format!("{}-{}", self.coordinate.name, self.product_version)
    }

    /// Render `deployment/manifest.yml`.
    ///
    /// Key names and nesting are a compatibility contract with the
    /// deployment runtime; optional blocks are omitted entirely when empty.
    pub fn to_yaml(&self) -> Result<String, serde_yaml_ng::Error> {
        let mut doc = Mapping::new();
        doc.insert(s("manifest-version"), s(&self.manifest_version));
        doc.insert(s("product-type"), s(self.product_type.as_str()));
        doc.insert(s("product-group"), s(&self.coordinate.group));
        doc.insert(s("product-name"), s(&self.coordinate.name));
        doc.insert(s("product-version"), s(&self.product_version));

        if let Some(display_name) = &self.display_name {
            doc.insert(s("display-name"), s(display_name));
        }
        if let Some(description) = &self.description {
            doc.insert(s("description"), s(description));
        }
        if !self.traits.is_empty() {
            doc.insert(s("traits"), string_seq(&self.traits));
        }
        if !self.labels.is_empty() {
            doc.insert(s("labels"), string_map(&self.labels));
        }
        if !self.annotations.is_empty() {
            doc.insert(s("annotations"), string_map(&self.annotations));
        }

        if !self.resource_requests.is_empty() || !self.resource_limits.is_empty() {
            let mut resources = Mapping::new();
            if !self.resource_requests.is_empty() {
                resources.insert(s("requests"), string_map(&self.resource_requests));
            }
            if !self.resource_limits.is_empty() {
                resources.insert(s("limits"), string_map(&self.resource_limits));
            }
            doc.insert(s("resources"), Value::Mapping(resources));
        }

        if !self.replication.is_empty() {
            let mut replication = Mapping::new();
            if let Some(desired) = self.replication.desired {
                replication.insert(s("desired"), Value::from(u64::from(desired)));
            }
            if let Some(min) = self.replication.min {
                replication.insert(s("min"), Value::from(u64::from(min)));
            }
            if let Some(max) = self.replication.max {
                replication.insert(s("max"), Value::from(u64::from(max)));
            }
            doc.insert(s("replication"), Value::Mapping(replication));
        }

        if let Some(health_check) = health_check_block(&self.health_check) {
            doc.insert(s("health-check"), Value::Mapping(health_check));
        }

        let extensions = self.extensions_block();
        if !extensions.is_empty() {
            doc.insert(s("extensions"), Value::Mapping(extensions));
        }

        serde_yaml_ng::to_string(&doc)
    }

    /// Canonical JSON form of the whole manifest value, suitable as hash
    /// input: field order is fixed by the struct and every map is sorted.
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    fn extensions_block(&self) -> Mapping {
        let mut extensions = Mapping::new();
        for (key, value) in &self.extensions {
            extensions.insert(s(key), s(value));
        }

        if !self.product_dependencies.is_empty() {
            let entries: Vec<Value> = self
                .product_dependencies
                .iter()
                .map(dependency_entry)
                .collect();
            extensions.insert(s("product-dependencies"), Value::Sequence(entries));
        }
        if !self.product_incompatibilities.is_empty() {
            let entries: Vec<Value> = self
                .product_incompatibilities
                .iter()
                .map(incompatibility_entry)
                .collect();
            extensions.insert(s("product-incompatibilities"), Value::Sequence(entries));
        }
        if !self.artifacts.is_empty() {
            let entries: Vec<Value> = self.artifacts.iter().map(artifact_entry).collect();
            extensions.insert(s("artifacts"), Value::Sequence(entries));
        }

        extensions
    }
}

fn s(value: &str) -> Value {
    Value::String(value.to_owned())
}

fn string_seq(values: &[String]) -> Value {
    Value::Sequence(values.iter().map(|v| s(v)).collect())
}

fn string_map(map: &BTreeMap<String, String>) -> Value {
    let mut out = Mapping::new();
    for (key, value) in map {
        out.insert(s(key), s(value));
    }
    Value::Mapping(out)
}

fn health_check_block(health_check: &HealthCheck) -> Option<Mapping> {
    let mut block = Mapping::new();
    match health_check {
        HealthCheck::None => return None,
        HealthCheck::SameBinaryArgs(args) => {
            block.insert(s("mode"), s(health_check.mode_name()));
            block.insert(s("args"), string_seq(args));
        }
        HealthCheck::CustomCommand(command) => {
            block.insert(s("mode"), s(health_check.mode_name()));
            block.insert(s("command"), s(command));
        }
        HealthCheck::CustomScript(path) => {
            block.insert(s("mode"), s(health_check.mode_name()));
            block.insert(s("script-path"), s(path));
        }
    }
    Some(block)
}

fn dependency_entry(dep: &ProductDependency) -> Value {
    let mut entry = Mapping::new();
    entry.insert(s("product-group"), s(&dep.coordinate.group));
    entry.insert(s("product-name"), s(&dep.coordinate.name));
    entry.insert(s("minimum-version"), s(&dep.minimum_version));
    if let Some(maximum) = &dep.maximum_version {
        entry.insert(s("maximum-version"), s(maximum));
    }
    if let Some(recommended) = &dep.recommended_version {
        entry.insert(s("recommended-version"), s(recommended));
    }
    entry.insert(s("optional"), Value::Bool(dep.optional));
    Value::Mapping(entry)
}

fn incompatibility_entry(incompat: &ProductIncompatibility) -> Value {
    let mut entry = Mapping::new();
    entry.insert(s("product-group"), s(&incompat.coordinate.group));
    entry.insert(s("product-name"), s(&incompat.coordinate.name));
    entry.insert(s("version-range"), s(&incompat.version_range));
    entry.insert(s("reason"), s(&incompat.reason));
    Value::Mapping(entry)
}

fn artifact_entry(artifact: &ArtifactRef) -> Value {
    let mut entry = Mapping::new();
    entry.insert(s("type"), s(&artifact.artifact_type));
    entry.insert(s("uri"), s(&artifact.uri));
    if let Some(name) = &artifact.name {
        entry.insert(s("name"), s(name));
    }
    if let Some(digest) = &artifact.digest {
        entry.insert(s("digest"), s(digest));
    }
    Value::Mapping(entry)
}
