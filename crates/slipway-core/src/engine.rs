use crate::identity::compute_cache_key;
use crate::inputs::SuppliedInputs;
use crate::{PackageError, ValidationFailure};
use slipway_layout::{archive_layout, assemble_asset, assemble_service, DistLayout};
use slipway_schema::{
    generate_asset_manifest, generate_lock_file, generate_service_manifest, validate_manifest,
    AssetTarget, ConfigError, Manifest, PackagingDefaults, ServiceTarget, Target,
    ValidationReport,
};
use tracing::{info, warn};

/// Everything produced by packaging one target. No bytes have touched disk
/// yet; [`write_distribution`](crate::write::write_distribution) materializes
/// the layout and archive in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutput {
    pub manifest: Manifest,
    pub manifest_yaml: String,
    pub validation: ValidationReport,
    pub layout: DistLayout,
    pub archive: Vec<u8>,
    pub lock_file: Option<String>,
    /// Read by the (external) image-instruction generator to select the
    /// hook-aware entry point.
    pub hooks_enabled: bool,
    pub cache_key: String,
}

/// Package one service or asset target into a distribution.
///
/// Pipeline: generate manifest, validate (errors abort, warnings pass
/// through), generate the lock file when dependencies exist, assemble the
/// layout, archive it, and stamp the content-addressed cache key. Pure
/// function of its arguments; safe to call concurrently for independent
/// targets.
pub fn package(
    target: &Target,
    references: &[Target],
    defaults: &PackagingDefaults,
    inputs: &SuppliedInputs,
) -> Result<PackageOutput, PackageError> {
    match target {
        Target::Service(service) => package_service(target, service, references, defaults, inputs),
        Target::Asset(asset) => package_asset(target, asset, references, defaults, inputs),
        other => Err(PackageError::Config(ConfigError::WrongTargetKind {
            expected: "service or asset",
            found: other.kind(),
        })),
    }
}

fn package_service(
    target: &Target,
    service: &ServiceTarget,
    references: &[Target],
    defaults: &PackagingDefaults,
    inputs: &SuppliedInputs,
) -> Result<PackageOutput, PackageError> {
    let manifest = generate_service_manifest(service, references, defaults)?;
    let validation = gate(&manifest, defaults)?;
    let manifest_yaml = manifest.to_yaml()?;

    let lock_file = generate_lock_file(&manifest.product_dependencies);

    let assembly = assemble_service(
        &manifest,
        &manifest_yaml,
        &inputs.launcher_binaries,
        &inputs.scripts,
        lock_file.as_deref(),
        defaults.shutdown_timeout_secs,
    )?;
    let archive = archive_layout(&assembly.layout)?;
    let cache_key = compute_cache_key(target, references, defaults, inputs)?;

    info!(
        "packaged {} ({} bytes archived, cache key {})",
        assembly.layout.dist_name(),
        archive.len(),
        &cache_key[..12]
    );

    Ok(PackageOutput {
        manifest,
        manifest_yaml,
        validation,
        layout: assembly.layout,
        archive,
        lock_file,
        hooks_enabled: assembly.hooks_enabled,
        cache_key,
    })
}

fn package_asset(
    target: &Target,
    asset: &AssetTarget,
    references: &[Target],
    defaults: &PackagingDefaults,
    inputs: &SuppliedInputs,
) -> Result<PackageOutput, PackageError> {
    let manifest = generate_asset_manifest(asset, references, defaults)?;
    let validation = gate(&manifest, defaults)?;
    let manifest_yaml = manifest.to_yaml()?;

    let lock_file = generate_lock_file(&manifest.product_dependencies);

    let layout = assemble_asset(
        &manifest,
        &manifest_yaml,
        &asset.assets,
        &inputs.asset_files,
        lock_file.as_deref(),
    )?;
    let archive = archive_layout(&layout)?;
    let cache_key = compute_cache_key(target, references, defaults, inputs)?;

    info!(
        "packaged asset {} ({} bytes archived)",
        layout.dist_name(),
        archive.len()
    );

    Ok(PackageOutput {
        manifest,
        manifest_yaml,
        validation,
        layout,
        archive,
        lock_file,
        hooks_enabled: false,
        cache_key,
    })
}

/// Refuse to proceed past validation when any error was collected. Warnings
/// are reported but never block.
fn gate(
    manifest: &Manifest,
    defaults: &PackagingDefaults,
) -> Result<ValidationReport, PackageError> {
    let report = validate_manifest(manifest, defaults.strict_validation);
    for warning in &report.warnings {
        warn!("{}: {warning}", manifest.product_id());
    }
    if !report.is_valid() {
        return Err(PackageError::Validation(ValidationFailure { report }));
    }
    Ok(report)
}
