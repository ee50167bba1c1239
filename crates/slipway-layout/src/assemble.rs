use crate::check::{generate_check_command_script, CHECK_SCRIPT_PATH, LAUNCHER_CHECK_PATH};
use crate::hooks::{
    generate_startup_script, hook_install_path, hook_phase_dir, ENTRYPOINT_SCRIPT,
    ENTRYPOINT_SCRIPT_PATH, HOOKS_LIBRARY, HOOKS_LIBRARY_PATH,
};
use crate::init_script::{generate_init_script, INIT_SCRIPT_PATH};
use crate::launcher::{
    launcher_path, CheckLauncherConfig, Platform, StaticLauncherConfig, REQUIRED_PLATFORMS,
};
use crate::layout::DistLayout;
use crate::AssemblyError;
use slipway_schema::{AssetMapping, HealthCheck, HookPhase, Manifest};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Empty runtime directories present in every distribution.
const RUNTIME_SKELETON: [&str; 5] = ["var/data/tmp", "var/log", "var/run", "var/conf", "var/state"];

const MANIFEST_PATH: &str = "deployment/manifest.yml";
const LOCK_PATH: &str = "deployment/product-dependencies.lock";

/// An assembled service layout plus the derived hook flag consumed by the
/// (external) image-instruction generator to select the alternate entry
/// point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAssembly {
    pub layout: DistLayout,
    pub hooks_enabled: bool,
}

/// Assemble the full distribution layout for a service manifest.
///
/// Pure function of (manifest, rendered manifest YAML, supplied binaries,
/// supplied script bytes, lock text, shutdown timeout). Performs no platform
/// detection and no I/O; binaries and script contents are chosen by the
/// collaborators that supply them.
pub fn assemble_service(
    manifest: &Manifest,
    manifest_yaml: &str,
    binaries: &BTreeMap<Platform, Vec<u8>>,
    scripts: &BTreeMap<String, Vec<u8>>,
    lock_text: Option<&str>,
    shutdown_timeout_secs: u32,
) -> Result<ServiceAssembly, AssemblyError> {
    if manifest.launch.is_none() {
        return Err(AssemblyError::MissingLaunchSpec);
    }
    let service_name = &manifest.coordinate.name;
    let mut layout = DistLayout::new(manifest.dist_name());

    for dir in RUNTIME_SKELETON {
        layout.add_directory(dir)?;
    }

    layout.add_file(MANIFEST_PATH, manifest_yaml, false)?;
    if let Some(lock_text) = lock_text {
        layout.add_file(LOCK_PATH, lock_text, false)?;
    }

    layout.add_file(
        INIT_SCRIPT_PATH,
        generate_init_script(service_name, shutdown_timeout_secs),
        true,
    )?;

    let static_config = StaticLauncherConfig::from_manifest(manifest)
        .ok_or(AssemblyError::MissingLaunchSpec)?;
    layout.add_file(
        crate::launcher::LAUNCHER_STATIC_PATH,
        static_config.to_yaml()?,
        false,
    )?;

    add_health_check(&mut layout, manifest, scripts)?;

    let hooks_enabled = !manifest.hooks.is_empty();
    if hooks_enabled {
        add_hooks(&mut layout, manifest, scripts)?;
    }

    for platform in REQUIRED_PLATFORMS {
        if !binaries.contains_key(&platform) {
            return Err(AssemblyError::MissingLauncherBinary(platform));
        }
    }
    for (platform, bytes) in binaries {
        layout.add_file(launcher_path(*platform), bytes.clone(), true)?;
    }

    info!(
        "assembled distribution layout for {} ({} entries, hooks_enabled={hooks_enabled})",
        layout.dist_name(),
        layout.len()
    );

    Ok(ServiceAssembly {
        layout,
        hooks_enabled,
    })
}

/// Emit at most one health-check entry: a check configuration document for
/// the same-binary mode, or a check script for the custom modes, never both.
fn add_health_check(
    layout: &mut DistLayout,
    manifest: &Manifest,
    scripts: &BTreeMap<String, Vec<u8>>,
) -> Result<(), AssemblyError> {
    match &manifest.health_check {
        HealthCheck::None => {}
        HealthCheck::SameBinaryArgs(args) => {
            let config = CheckLauncherConfig::from_manifest(manifest, args)
                .ok_or(AssemblyError::MissingLaunchSpec)?;
            layout.add_file(LAUNCHER_CHECK_PATH, config.to_yaml()?, false)?;
        }
        HealthCheck::CustomCommand(command) => {
            layout.add_file(
                CHECK_SCRIPT_PATH,
                generate_check_command_script(&manifest.coordinate.name, command),
                true,
            )?;
        }
        HealthCheck::CustomScript(source) => {
            let content = scripts
                .get(source)
                .ok_or_else(|| AssemblyError::MissingScript(source.clone()))?;
            layout.add_file(CHECK_SCRIPT_PATH, content.clone(), true)?;
        }
    }
    Ok(())
}

fn add_hooks(
    layout: &mut DistLayout,
    manifest: &Manifest,
    scripts: &BTreeMap<String, Vec<u8>>,
) -> Result<(), AssemblyError> {
    layout.add_file(ENTRYPOINT_SCRIPT_PATH, ENTRYPOINT_SCRIPT, true)?;
    layout.add_file(HOOKS_LIBRARY_PATH, HOOKS_LIBRARY, false)?;
    layout.add_directory("var/metrics")?;

    for phase in HookPhase::ALL {
        layout.add_directory(hook_phase_dir(phase))?;
    }

    layout.add_file(
        hook_install_path(HookPhase::Startup, "00-main.sh"),
        generate_startup_script(&manifest.coordinate.name),
        true,
    )?;

    for (phase, script) in &manifest.hooks {
        let content = scripts
            .get(&script.source)
            .ok_or_else(|| AssemblyError::MissingScript(script.source.clone()))?;
        debug!("installing {} hook '{}'", phase.key(), script.name);
        layout.add_file(hook_install_path(*phase, &script.name), content.clone(), true)?;
    }

    Ok(())
}

/// Assemble the layout for an asset distribution: manifest, optional lock
/// file, and the `asset/` directory populated from the declared mappings.
pub fn assemble_asset(
    manifest: &Manifest,
    manifest_yaml: &str,
    mappings: &[AssetMapping],
    files: &BTreeMap<String, Vec<u8>>,
    lock_text: Option<&str>,
) -> Result<DistLayout, AssemblyError> {
    let mut layout = DistLayout::new(manifest.dist_name());

    layout.add_file(MANIFEST_PATH, manifest_yaml, false)?;
    if let Some(lock_text) = lock_text {
        layout.add_file(LOCK_PATH, lock_text, false)?;
    }

    layout.add_directory("asset")?;
    for mapping in mappings {
        let content = files
            .get(&mapping.source)
            .ok_or_else(|| AssemblyError::MissingAssetSource(mapping.source.clone()))?;
        layout.add_file(format!("asset/{}", mapping.dest), content.clone(), false)?;
    }

    info!(
        "assembled asset layout for {} ({} entries)",
        layout.dist_name(),
        layout.len()
    );

    Ok(layout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slipway_schema::{
        generate_asset_manifest, generate_service_manifest, AssetTarget, HookScript,
        PackagingDefaults, ServiceTarget,
    };

    fn sample_binaries() -> BTreeMap<Platform, Vec<u8>> {
        REQUIRED_PLATFORMS
            .into_iter()
            .map(|platform| (platform, format!("binary for {platform}").into_bytes()))
            .collect()
    }

    fn service_manifest(mutate: impl FnOnce(&mut ServiceTarget)) -> (Manifest, String) {
        let mut target = ServiceTarget::new("com.example", "my-service", "1.0.0", "app:app");
        mutate(&mut target);
        let manifest =
            generate_service_manifest(&target, &[], &PackagingDefaults::default()).unwrap();
        let yaml = manifest.to_yaml().unwrap();
        (manifest, yaml)
    }

    fn assemble(
        manifest: &Manifest,
        yaml: &str,
        scripts: &BTreeMap<String, Vec<u8>>,
    ) -> ServiceAssembly {
        assemble_service(manifest, yaml, &sample_binaries(), scripts, None, 30).unwrap()
    }

    #[test]
    fn skeleton_and_core_files_are_always_present() {
        let (manifest, yaml) = service_manifest(|_| {});
        let assembly = assemble(&manifest, &yaml, &BTreeMap::new());
        let layout = &assembly.layout;

        assert_eq!(layout.dist_name(), "my-service-1.0.0");
        for dir in RUNTIME_SKELETON {
            assert!(layout.contains(dir), "{dir}");
        }
        assert_eq!(
            layout.file_content("deployment/manifest.yml").unwrap(),
            yaml.as_bytes()
        );
        assert!(layout.is_executable("service/bin/init.sh"));
        assert!(layout.contains("service/bin/launcher-static.yml"));
        assert!(!layout.contains(LOCK_PATH));
    }

    #[test]
    fn lock_file_is_emitted_only_when_present() {
        let (manifest, yaml) = service_manifest(|_| {});
        let assembly = assemble_service(
            &manifest,
            &yaml,
            &sample_binaries(),
            &BTreeMap::new(),
            Some("# lock\ncom.example:db (1.0.0, 2.0.0)\n"),
            30,
        )
        .unwrap();
        assert!(assembly.layout.contains(LOCK_PATH));
    }

    #[test]
    fn no_health_check_emits_neither_artifact() {
        let (manifest, yaml) = service_manifest(|_| {});
        let assembly = assemble(&manifest, &yaml, &BTreeMap::new());
        assert!(!assembly.layout.contains(LAUNCHER_CHECK_PATH));
        assert!(!assembly.layout.contains(CHECK_SCRIPT_PATH));
    }

    #[test]
    fn same_binary_mode_emits_only_the_config_document() {
        let (manifest, yaml) = service_manifest(|target| {
            target.health_check = HealthCheck::SameBinaryArgs(vec!["--check".to_owned()]);
        });
        let assembly = assemble(&manifest, &yaml, &BTreeMap::new());
        assert!(assembly.layout.contains(LAUNCHER_CHECK_PATH));
        assert!(!assembly.layout.contains(CHECK_SCRIPT_PATH));
    }

    #[test]
    fn custom_command_mode_emits_only_the_script() {
        let (manifest, yaml) = service_manifest(|target| {
            target.health_check = HealthCheck::CustomCommand("curl -f localhost".to_owned());
        });
        let assembly = assemble(&manifest, &yaml, &BTreeMap::new());
        assert!(!assembly.layout.contains(LAUNCHER_CHECK_PATH));
        assert!(assembly.layout.is_executable(CHECK_SCRIPT_PATH));
        let script = assembly.layout.file_content(CHECK_SCRIPT_PATH).unwrap();
        assert!(std::str::from_utf8(script)
            .unwrap()
            .contains("exec curl -f localhost"));
    }

    #[test]
    fn custom_script_mode_copies_supplied_bytes() {
        let (manifest, yaml) = service_manifest(|target| {
            target.health_check = HealthCheck::CustomScript("checks/custom.sh".to_owned());
        });
        let scripts: BTreeMap<String, Vec<u8>> = [(
            "checks/custom.sh".to_owned(),
            b"#!/bin/sh\nexit 0\n".to_vec(),
        )]
        .into();
        let assembly = assemble(&manifest, &yaml, &scripts);
        assert_eq!(
            assembly.layout.file_content(CHECK_SCRIPT_PATH).unwrap(),
            b"#!/bin/sh\nexit 0\n"
        );
        assert!(!assembly.layout.contains(LAUNCHER_CHECK_PATH));
    }

    #[test]
    fn missing_custom_script_bytes_fail_assembly() {
        let (manifest, yaml) = service_manifest(|target| {
            target.health_check = HealthCheck::CustomScript("checks/custom.sh".to_owned());
        });
        let err = assemble_service(
            &manifest,
            &yaml,
            &sample_binaries(),
            &BTreeMap::new(),
            None,
            30,
        )
        .unwrap_err();
        assert!(matches!(err, AssemblyError::MissingScript(s) if s == "checks/custom.sh"));
    }

    #[test]
    fn hooks_expand_into_the_full_phase_tree() {
        let (manifest, yaml) = service_manifest(|target| {
            target.hooks.insert(
                HookPhase::PreStartup,
                HookScript::new("10-migrate.sh", "hooks/migrate.sh").unwrap(),
            );
        });
        let scripts: BTreeMap<String, Vec<u8>> =
            [("hooks/migrate.sh".to_owned(), b"#!/bin/sh\n".to_vec())].into();
        let assembly = assemble(&manifest, &yaml, &scripts);
        let layout = &assembly.layout;

        assert!(assembly.hooks_enabled);
        assert!(layout.is_executable(ENTRYPOINT_SCRIPT_PATH));
        assert!(layout.contains(HOOKS_LIBRARY_PATH));
        assert!(layout.contains("var/metrics"));
        for phase in HookPhase::ALL {
            assert!(layout.contains(&hook_phase_dir(phase)), "{}", phase.key());
        }
        assert!(layout.is_executable("hooks/startup.d/00-main.sh"));
        assert!(layout.is_executable("hooks/pre-startup.d/10-migrate.sh"));
    }

    #[test]
    fn no_hooks_means_no_hook_tree() {
        let (manifest, yaml) = service_manifest(|_| {});
        let assembly = assemble(&manifest, &yaml, &BTreeMap::new());
        assert!(!assembly.hooks_enabled);
        assert!(!assembly.layout.contains(ENTRYPOINT_SCRIPT_PATH));
        assert!(!assembly.layout.contains("hooks/startup.d"));
        assert!(!assembly.layout.contains("var/metrics"));
    }

    #[test]
    fn missing_hook_bytes_fail_assembly() {
        let (manifest, yaml) = service_manifest(|target| {
            target.hooks.insert(
                HookPhase::Configure,
                HookScript::new("10-render.sh", "hooks/render.sh").unwrap(),
            );
        });
        let err = assemble_service(
            &manifest,
            &yaml,
            &sample_binaries(),
            &BTreeMap::new(),
            None,
            30,
        )
        .unwrap_err();
        assert!(matches!(err, AssemblyError::MissingScript(s) if s == "hooks/render.sh"));
    }

    #[test]
    fn every_required_platform_binary_is_bundled() {
        let (manifest, yaml) = service_manifest(|_| {});
        let assembly = assemble(&manifest, &yaml, &BTreeMap::new());
        for platform in REQUIRED_PLATFORMS {
            let path = launcher_path(platform);
            assert!(assembly.layout.is_executable(&path), "{path}");
        }
    }

    #[test]
    fn missing_platform_binary_fails_assembly() {
        let (manifest, yaml) = service_manifest(|_| {});
        let mut binaries = sample_binaries();
        binaries.remove(&REQUIRED_PLATFORMS[0]);
        let err =
            assemble_service(&manifest, &yaml, &binaries, &BTreeMap::new(), None, 30).unwrap_err();
        assert!(matches!(err, AssemblyError::MissingLauncherBinary(p) if p == REQUIRED_PLATFORMS[0]));
    }

    #[test]
    fn assembly_is_deterministic() {
        let (manifest, yaml) = service_manifest(|target| {
            target.health_check = HealthCheck::SameBinaryArgs(vec!["--check".to_owned()]);
        });
        let a = assemble(&manifest, &yaml, &BTreeMap::new());
        let b = assemble(&manifest, &yaml, &BTreeMap::new());
        assert_eq!(a.layout, b.layout);
    }

    #[test]
    fn asset_layouts_hold_manifest_and_mapped_files() {
        let mut target = AssetTarget::new("com.example", "frontend-assets", "1.0.0");
        target.assets.push(AssetMapping {
            source: "static/index.html".to_owned(),
            dest: "web/index.html".to_owned(),
        });
        let manifest =
            generate_asset_manifest(&target, &[], &PackagingDefaults::default()).unwrap();
        let yaml = manifest.to_yaml().unwrap();
        let files: BTreeMap<String, Vec<u8>> =
            [("static/index.html".to_owned(), b"<html/>".to_vec())].into();

        let layout = assemble_asset(&manifest, &yaml, &target.assets, &files, None).unwrap();
        assert_eq!(layout.dist_name(), "frontend-assets-1.0.0");
        assert!(layout.contains("asset"));
        assert_eq!(
            layout.file_content("asset/web/index.html").unwrap(),
            b"<html/>"
        );
        assert!(!layout.contains("service/bin/init.sh"));
    }

    #[test]
    fn missing_asset_source_fails_assembly() {
        let mut target = AssetTarget::new("com.example", "frontend-assets", "1.0.0");
        target.assets.push(AssetMapping {
            source: "static/missing.css".to_owned(),
            dest: "web/missing.css".to_owned(),
        });
        let manifest =
            generate_asset_manifest(&target, &[], &PackagingDefaults::default()).unwrap();
        let yaml = manifest.to_yaml().unwrap();
        let err =
            assemble_asset(&manifest, &yaml, &target.assets, &BTreeMap::new(), None).unwrap_err();
        assert!(matches!(err, AssemblyError::MissingAssetSource(s) if s == "static/missing.css"));
    }
}
