//! Target model, version grammar, manifest generation, validation, and lock
//! files for Slipway.
//!
//! This crate defines the schema layer: typed target declarations
//! (`Target`, `ServiceTarget`, `AssetTarget`), the orderable version grammar
//! (`OrderableVersion`), pure manifest generation
//! (`generate_service_manifest`), collected validation (`validate_manifest`),
//! and the line-oriented dependency lock file (`generate_lock_file`).

pub mod defaults;
pub mod generate;
pub mod lock;
pub mod manifest;
pub mod target;
pub mod types;
pub mod validate;
pub mod version;

pub use defaults::PackagingDefaults;
pub use generate::{generate_asset_manifest, generate_service_manifest};
pub use lock::{
    generate_lock_file, parse_lock_file, validate_lock_file, LockEntry, LockParseError,
    LOCK_FILE_NAME,
};
pub use manifest::{EntryPoint, LaunchMode, LaunchSpec, Manifest};
pub use target::{
    ArtifactRef, AssetMapping, AssetTarget, ConfigError, HealthCheck, HookPhase, HookScript,
    ProductDependency, ProductIncompatibility, ProductType, ReplicaBounds, ServiceTarget, Target,
    TargetKind,
};
pub use types::{is_valid_product_group, is_valid_product_name, ProductCoordinate};
pub use validate::{validate_manifest, ValidationReport};
pub use version::{next_major, OrderableVersion, Qualifier, VersionError, VersionMatcher};
