use crate::defaults::PackagingDefaults;
use crate::manifest::{EntryPoint, LaunchMode, LaunchSpec, Manifest};
use crate::target::{
    ArtifactRef, AssetTarget, ConfigError, HealthCheck, ProductDependency,
    ProductIncompatibility, ServiceTarget, Target,
};
use std::collections::BTreeMap;

/// Extension keys the generator computes itself; user extensions may not
/// shadow them.
const COMPUTED_EXTENSION_KEYS: [&str; 3] = [
    "product-dependencies",
    "product-incompatibilities",
    "artifacts",
];

/// Environment every launched service inherits unless the target overrides
/// the key.
const LAUNCHER_BASE_ENV: [(&str, &str); 2] = [
    ("PYTHONDONTWRITEBYTECODE", "1"),
    ("PYTHONUNBUFFERED", "1"),
];

struct ResolvedReferences {
    dependencies: Vec<ProductDependency>,
    incompatibilities: Vec<ProductIncompatibility>,
    artifacts: Vec<ArtifactRef>,
}

/// Generate the manifest for a service target.
///
/// Pure function of its arguments: applies subsystem defaults, resolves the
/// launch configuration, sorts every reference list by its natural
/// identifier, and merges user extensions last so explicit overrides win.
/// Fails fast with a [`ConfigError`] on caller-level misuse; data-quality
/// problems are left for [`validate_manifest`](crate::validate::validate_manifest).
pub fn generate_service_manifest(
    service: &ServiceTarget,
    references: &[Target],
    defaults: &PackagingDefaults,
) -> Result<Manifest, ConfigError> {
    let resolved = resolve_references(references)?;
    let extensions = checked_extensions(&service.manifest_extensions)?;
    let entry_point = split_entrypoint(&service.entrypoint)?;

    let command = service
        .command
        .clone()
        .unwrap_or_else(|| defaults.default_command.clone());
    let runtime_version = service
        .runtime_version
        .clone()
        .unwrap_or_else(|| defaults.default_runtime_version.clone());
    let executable = service
        .executable
        .clone()
        .unwrap_or_else(|| format!("service/bin/{}.pex", service.coordinate.name));

    let mut env: BTreeMap<String, String> = LAUNCHER_BASE_ENV
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect();
    env.extend(service.env.clone());

    let launch = LaunchSpec {
        mode: LaunchMode::from_command(&command),
        command,
        args: service.args.clone(),
        env,
        runtime_version,
        executable,
        entry_point,
    };

    Ok(Manifest {
        manifest_version: defaults.manifest_version.clone(),
        product_type: service.product_type,
        coordinate: service.coordinate.clone(),
        product_version: service.version.clone(),
        display_name: service.display_name.clone(),
        description: service.description.clone(),
        traits: service.traits.clone(),
        labels: service.labels.clone(),
        annotations: service.annotations.clone(),
        resource_requests: service.resource_requests.clone(),
        resource_limits: service.resource_limits.clone(),
        replication: service.replication,
        launch: Some(launch),
        health_check: service.health_check.clone(),
        hooks: service.hooks.clone(),
        product_dependencies: resolved.dependencies,
        product_incompatibilities: resolved.incompatibilities,
        artifacts: resolved.artifacts,
        extensions,
    })
}

/// Generate the manifest for an asset target: no launch configuration, no
/// health check, no hooks.
pub fn generate_asset_manifest(
    asset: &AssetTarget,
    references: &[Target],
    defaults: &PackagingDefaults,
) -> Result<Manifest, ConfigError> {
    let resolved = resolve_references(references)?;
    let extensions = checked_extensions(&asset.manifest_extensions)?;

    Ok(Manifest {
        manifest_version: defaults.manifest_version.clone(),
        product_type: asset.product_type,
        coordinate: asset.coordinate.clone(),
        product_version: asset.version.clone(),
        display_name: asset.display_name.clone(),
        description: asset.description.clone(),
        traits: Vec::new(),
        labels: asset.labels.clone(),
        annotations: asset.annotations.clone(),
        resource_requests: BTreeMap::new(),
        resource_limits: BTreeMap::new(),
        replication: crate::target::ReplicaBounds::default(),
        launch: None,
        health_check: HealthCheck::None,
        hooks: BTreeMap::new(),
        product_dependencies: resolved.dependencies,
        product_incompatibilities: resolved.incompatibilities,
        artifacts: resolved.artifacts,
        extensions,
    })
}

fn resolve_references(references: &[Target]) -> Result<ResolvedReferences, ConfigError> {
    let mut dependencies = Vec::new();
    let mut incompatibilities = Vec::new();
    let mut artifacts = Vec::new();

    for reference in references {
        match reference {
            Target::Dependency(dep) => {
                let mut dep = dep.clone();
                dep.maximum_version = dep.effective_maximum();
                dependencies.push(dep);
            }
            Target::Incompatibility(incompat) => incompatibilities.push(incompat.clone()),
            Target::Artifact(artifact) => artifacts.push(artifact.clone()),
            other => {
                return Err(ConfigError::WrongTargetKind {
                    expected: "product dependency, product incompatibility, or artifact",
                    found: other.kind(),
                })
            }
        }
    }

    dependencies.sort_by(|a, b| a.coordinate.cmp(&b.coordinate));
    incompatibilities.sort_by(|a, b| a.coordinate.cmp(&b.coordinate));
    artifacts.sort_by(|a, b| (&a.uri, &a.artifact_type).cmp(&(&b.uri, &b.artifact_type)));

    Ok(ResolvedReferences {
        dependencies,
        incompatibilities,
        artifacts,
    })
}

fn checked_extensions(
    extensions: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, ConfigError> {
    for key in extensions.keys() {
        if COMPUTED_EXTENSION_KEYS.contains(&key.as_str()) {
            return Err(ConfigError::ExtensionKeyCollision(key.clone()));
        }
    }
    Ok(extensions.clone())
}

fn split_entrypoint(entrypoint: &str) -> Result<EntryPoint, ConfigError> {
    match entrypoint.split_once(':') {
        Some((module, callable)) if !module.is_empty() && !callable.is_empty() => Ok(EntryPoint {
            module: module.to_owned(),
            callable: callable.to_owned(),
        }),
        _ => Err(ConfigError::InvalidEntrypoint(entrypoint.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetKind;

    fn sample_service() -> ServiceTarget {
        ServiceTarget::new("com.example", "my-service", "1.0.0", "app:app")
    }

    fn dep(group: &str, name: &str, minimum: &str) -> Target {
        Target::Dependency(ProductDependency::new(group, name, minimum))
    }

    #[test]
    fn applies_subsystem_defaults() {
        let manifest =
            generate_service_manifest(&sample_service(), &[], &PackagingDefaults::default())
                .unwrap();
        let launch = manifest.launch.as_ref().unwrap();
        assert_eq!(manifest.manifest_version, "1.0");
        assert_eq!(launch.command, "uvicorn");
        assert_eq!(launch.mode, LaunchMode::Asgi);
        assert_eq!(launch.runtime_version, "3.11");
        assert_eq!(launch.executable, "service/bin/my-service.pex");
        assert_eq!(launch.entry_point.qualified(), "app:app");
        assert_eq!(launch.args, vec!["--host", "0.0.0.0", "--port", "8080"]);
    }

    #[test]
    fn target_fields_override_defaults() {
        let mut service = sample_service();
        service.command = Some("gunicorn".to_owned());
        service.runtime_version = Some("3.12".to_owned());
        service.executable = Some("service/bin/custom.bin".to_owned());
        let manifest =
            generate_service_manifest(&service, &[], &PackagingDefaults::default()).unwrap();
        let launch = manifest.launch.as_ref().unwrap();
        assert_eq!(launch.command, "gunicorn");
        assert_eq!(launch.mode, LaunchMode::Wsgi);
        assert_eq!(launch.runtime_version, "3.12");
        assert_eq!(launch.executable, "service/bin/custom.bin");
    }

    #[test]
    fn unknown_commands_map_to_custom_mode() {
        let mut service = sample_service();
        service.command = Some("falcon-serve".to_owned());
        let manifest =
            generate_service_manifest(&service, &[], &PackagingDefaults::default()).unwrap();
        assert_eq!(manifest.launch.unwrap().mode, LaunchMode::Custom);
    }

    #[test]
    fn launcher_base_env_merges_under_target_env() {
        let mut service = sample_service();
        service
            .env
            .insert("PYTHONUNBUFFERED".to_owned(), "0".to_owned());
        service.env.insert("APP_MODE".to_owned(), "prod".to_owned());
        let manifest =
            generate_service_manifest(&service, &[], &PackagingDefaults::default()).unwrap();
        let env = &manifest.launch.unwrap().env;
        assert_eq!(env.get("PYTHONDONTWRITEBYTECODE").unwrap(), "1");
        assert_eq!(env.get("PYTHONUNBUFFERED").unwrap(), "0");
        assert_eq!(env.get("APP_MODE").unwrap(), "prod");
    }

    #[test]
    fn malformed_entrypoints_fail_generation() {
        for bad in ["app", ":app", "app:", ""] {
            let mut service = sample_service();
            service.entrypoint = bad.to_owned();
            let err = generate_service_manifest(&service, &[], &PackagingDefaults::default())
                .unwrap_err();
            assert_eq!(err, ConfigError::InvalidEntrypoint(bad.to_owned()));
        }
    }

    #[test]
    fn references_sort_by_natural_identifier() {
        let refs_a = [
            dep("com.zeta", "cache", "1.0.0"),
            dep("com.alpha", "db", "1.0.0"),
            dep("com.alpha", "auth", "1.0.0"),
        ];
        let refs_b = [refs_a[1].clone(), refs_a[2].clone(), refs_a[0].clone()];

        let defaults = PackagingDefaults::default();
        let a = generate_service_manifest(&sample_service(), &refs_a, &defaults).unwrap();
        let b = generate_service_manifest(&sample_service(), &refs_b, &defaults).unwrap();

        assert_eq!(a, b);
        let ids: Vec<String> = a
            .product_dependencies
            .iter()
            .map(ProductDependency::product_id)
            .collect();
        assert_eq!(ids, vec!["com.alpha:auth", "com.alpha:db", "com.zeta:cache"]);
        assert_eq!(a.to_yaml().unwrap(), b.to_yaml().unwrap());
    }

    #[test]
    fn dependency_maximum_defaults_to_next_major() {
        let manifest = generate_service_manifest(
            &sample_service(),
            &[dep("com.example", "db", "1.2.3")],
            &PackagingDefaults::default(),
        )
        .unwrap();
        assert_eq!(
            manifest.product_dependencies[0].maximum_version.as_deref(),
            Some("2.0.0")
        );
    }

    #[test]
    fn wrong_reference_kind_fails_generation() {
        let other = Target::Service(sample_service());
        let err = generate_service_manifest(
            &sample_service(),
            &[other],
            &PackagingDefaults::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::WrongTargetKind {
                found: TargetKind::Service,
                ..
            }
        ));
    }

    #[test]
    fn extension_collisions_fail_generation() {
        let mut service = sample_service();
        service
            .manifest_extensions
            .insert("product-dependencies".to_owned(), "[]".to_owned());
        let err = generate_service_manifest(&service, &[], &PackagingDefaults::default())
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::ExtensionKeyCollision("product-dependencies".to_owned())
        );
    }

    #[test]
    fn user_extensions_survive_generation() {
        let mut service = sample_service();
        service
            .manifest_extensions
            .insert("build-commit".to_owned(), "abc123".to_owned());
        let manifest =
            generate_service_manifest(&service, &[], &PackagingDefaults::default()).unwrap();
        assert_eq!(manifest.extensions.get("build-commit").unwrap(), "abc123");
    }

    #[test]
    fn asset_manifests_carry_no_launch_configuration() {
        let asset = AssetTarget::new("com.example", "frontend-assets", "1.0.0");
        let manifest =
            generate_asset_manifest(&asset, &[], &PackagingDefaults::default()).unwrap();
        assert_eq!(manifest.product_type, crate::target::ProductType::AssetV1);
        assert!(manifest.launch.is_none());
        assert!(manifest.health_check.is_none());
        assert!(manifest.hooks.is_empty());
    }

    #[test]
    fn generation_is_idempotent() {
        let service = sample_service();
        let refs = [dep("com.example", "db", "1.0.0")];
        let defaults = PackagingDefaults::default();
        let a = generate_service_manifest(&service, &refs, &defaults).unwrap();
        let b = generate_service_manifest(&service, &refs, &defaults).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_yaml().unwrap(), b.to_yaml().unwrap());
    }
}
