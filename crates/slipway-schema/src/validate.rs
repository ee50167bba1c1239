use crate::manifest::Manifest;
use crate::target::HealthCheck;
use crate::types::{is_valid_product_group, is_valid_product_name};
use crate::version::{OrderableVersion, VersionMatcher};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result of manifest validation. Errors block packaging; warnings are
/// advisory and never affect [`is_valid`](Self::is_valid).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Advisory warning classes. Strict mode promotes exactly the classes for
/// which [`strict_promoted`] returns true; the rest stay advisory even in
/// strict mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Advisory {
    NoHealthCheck,
    NoResources,
    NoLabels,
    LockstepDependency,
}

fn strict_promoted(advisory: Advisory) -> bool {
    matches!(advisory, Advisory::NoHealthCheck | Advisory::NoResources)
}

/// Validate a manifest, collecting every data-quality finding.
///
/// Pure function: identical manifests always yield identical reports, and no
/// finding is ever raised as an error value; callers decide whether to
/// proceed based on [`ValidationReport::is_valid`].
pub fn validate_manifest(manifest: &Manifest, strict: bool) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_identity(manifest, &mut report);
    check_resources(manifest, &mut report);
    check_replication(manifest, &mut report);
    check_health_check(manifest, &mut report, strict);
    check_dependencies(manifest, &mut report, strict);
    check_incompatibilities(manifest, &mut report);
    check_metadata(manifest, &mut report, strict);

    report
}

fn advise(report: &mut ValidationReport, strict: bool, advisory: Advisory, message: String) {
    if strict && strict_promoted(advisory) {
        report.errors.push(message);
    } else {
        report.warnings.push(message);
    }
}

fn check_identity(manifest: &Manifest, report: &mut ValidationReport) {
    if !is_valid_product_group(&manifest.coordinate.group) {
        report.errors.push(format!(
            "product-group '{}' is invalid: must be lowercase letters, digits, dots, and hyphens",
            manifest.coordinate.group
        ));
    }
    if !is_valid_product_name(&manifest.coordinate.name) {
        report.errors.push(format!(
            "product-name '{}' is invalid: must start with a lowercase letter and contain only \
             lowercase letters, digits, dots, and hyphens",
            manifest.coordinate.name
        ));
    }
    if OrderableVersion::parse(&manifest.product_version).is_err() {
        report.errors.push(format!(
            "product-version '{}' is not a valid orderable version",
            manifest.product_version
        ));
    }
}

fn check_resources(manifest: &Manifest, report: &mut ValidationReport) {
    let sections = [
        ("requests", &manifest.resource_requests),
        ("limits", &manifest.resource_limits),
    ];
    for (section, quantities) in sections {
        for (key, value) in quantities {
            if parse_quantity(value).is_none() {
                report.errors.push(format!(
                    "resource {section} value '{value}' for '{key}' is not a valid quantity"
                ));
            }
        }
    }

    for (key, limit) in &manifest.resource_limits {
        let Some(request) = manifest.resource_requests.get(key) else {
            continue;
        };
        let (Some(limit_value), Some(request_value)) =
            (parse_quantity(limit), parse_quantity(request))
        else {
            continue;
        };
        if limit_value < request_value {
            report.errors.push(format!(
                "resource limit for '{key}' ({limit}) is below the request ({request})"
            ));
        }
    }
}

fn check_replication(manifest: &Manifest, report: &mut ValidationReport) {
    let bounds = &manifest.replication;
    if let (Some(min), Some(desired)) = (bounds.min, bounds.desired) {
        if min > desired {
            report.errors.push(format!(
                "replication.min ({min}) must be <= replication.desired ({desired})"
            ));
        }
    }
    if let (Some(desired), Some(max)) = (bounds.desired, bounds.max) {
        if desired > max {
            report.errors.push(format!(
                "replication.desired ({desired}) must be <= replication.max ({max})"
            ));
        }
    }
    if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
        if min > max {
            report.errors.push(format!(
                "replication.min ({min}) must be <= replication.max ({max})"
            ));
        }
    }
}

fn check_health_check(manifest: &Manifest, report: &mut ValidationReport, strict: bool) {
    match &manifest.health_check {
        HealthCheck::None => {
            if manifest.launch.is_some() {
                advise(
                    report,
                    strict,
                    Advisory::NoHealthCheck,
                    "no health check configured".to_owned(),
                );
            }
        }
        HealthCheck::SameBinaryArgs(args) => {
            if args.is_empty() || args.iter().any(|arg| arg.trim().is_empty()) {
                report
                    .errors
                    .push("same-binary health check must provide non-empty arguments".to_owned());
            }
        }
        HealthCheck::CustomCommand(command) => {
            if command.trim().is_empty() {
                report
                    .errors
                    .push("custom-command health check must provide a command".to_owned());
            }
        }
        HealthCheck::CustomScript(path) => {
            if path.trim().is_empty() {
                report
                    .errors
                    .push("custom-script health check must reference a script path".to_owned());
            }
        }
    }
}

fn check_dependencies(manifest: &Manifest, report: &mut ValidationReport, strict: bool) {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for dep in &manifest.product_dependencies {
        let dep_id = dep.product_id();
        if !seen.insert(dep_id.clone()) {
            report
                .errors
                .push(format!("duplicate product dependency: {dep_id}"));
        }
        if !is_valid_product_group(&dep.coordinate.group)
            || !is_valid_product_name(&dep.coordinate.name)
        {
            report
                .errors
                .push(format!("dependency {dep_id}: invalid product coordinate"));
        }

        let minimum = match OrderableVersion::parse(&dep.minimum_version) {
            Ok(minimum) => Some(minimum),
            Err(_) => {
                report.errors.push(format!(
                    "dependency {dep_id}: invalid minimum version '{}'",
                    dep.minimum_version
                ));
                None
            }
        };

        if let Some(recommended) = &dep.recommended_version {
            if OrderableVersion::parse(recommended).is_err() {
                report.errors.push(format!(
                    "dependency {dep_id}: invalid recommended version '{recommended}'"
                ));
            }
        }

        if let Some(maximum) = &dep.maximum_version {
            match maximum.parse::<VersionMatcher>() {
                Ok(matcher) => {
                    if dep.minimum_version == *maximum {
                        advise(
                            report,
                            strict,
                            Advisory::LockstepDependency,
                            format!(
                                "dependency {dep_id}: minimum equals maximum ({maximum}), \
                                 creating lockstep upgrade coupling"
                            ),
                        );
                    } else if let Some(minimum) = &minimum {
                        if !matcher.permits_at_or_above(minimum) {
                            report.errors.push(format!(
                                "dependency {dep_id}: minimum version {} exceeds maximum {maximum}",
                                dep.minimum_version
                            ));
                        }
                    }
                }
                Err(_) => {
                    report.errors.push(format!(
                        "dependency {dep_id}: invalid maximum version '{maximum}'"
                    ));
                }
            }
        }
    }
}

fn check_incompatibilities(manifest: &Manifest, report: &mut ValidationReport) {
    for incompat in &manifest.product_incompatibilities {
        let id = incompat.coordinate.product_id();
        if incompat.version_range.trim().is_empty() {
            report
                .errors
                .push(format!("incompatibility with {id} has no version range"));
        }
        if incompat.reason.trim().is_empty() {
            report
                .errors
                .push(format!("incompatibility with {id} has no reason"));
        }
    }
}

fn check_metadata(manifest: &Manifest, report: &mut ValidationReport, strict: bool) {
    if manifest.launch.is_some()
        && manifest.resource_requests.is_empty()
        && manifest.resource_limits.is_empty()
    {
        advise(
            report,
            strict,
            Advisory::NoResources,
            "no resource requests or limits configured".to_owned(),
        );
    }
    if manifest.labels.is_empty() {
        advise(
            report,
            strict,
            Advisory::NoLabels,
            "no labels configured".to_owned(),
        );
    }
}

/// Parse a resource quantity with Kubernetes-style suffixes.
fn parse_quantity(input: &str) -> Option<f64> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let split = input
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(input.len());
    let (number, suffix) = input.split_at(split);
    let value: f64 = number.parse().ok()?;
    let scale = match suffix {
        "" => 1.0,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "Ki" => 1024.0,
        "Mi" => 1024.0 * 1024.0,
        "Gi" => 1024.0 * 1024.0 * 1024.0,
        "Ti" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some(value * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::PackagingDefaults;
    use crate::generate::generate_service_manifest;
    use crate::target::{ProductDependency, ProductIncompatibility, ReplicaBounds, ServiceTarget, Target};
    use crate::types::ProductCoordinate;

    fn manifest_for(service: &ServiceTarget, references: &[Target]) -> Manifest {
        generate_service_manifest(service, references, &PackagingDefaults::default()).unwrap()
    }

    fn healthy_service() -> ServiceTarget {
        let mut service = ServiceTarget::new("com.example", "my-service", "1.0.0", "app:app");
        service.health_check = HealthCheck::SameBinaryArgs(vec!["--check".to_owned()]);
        service
            .resource_requests
            .insert("cpu".to_owned(), "100m".to_owned());
        service
            .labels
            .insert("team".to_owned(), "platform".to_owned());
        service
    }

    #[test]
    fn uppercase_product_name_is_an_error() {
        let mut service = healthy_service();
        service.coordinate = ProductCoordinate::new("com.example", "My-Service");
        let report = validate_manifest(&manifest_for(&service, &[]), false);
        assert!(!report.is_valid());
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("My-Service") && e.contains("lowercase")));
    }

    #[test]
    fn clean_manifest_is_valid_and_warns_without_health_check() {
        let mut service = healthy_service();
        service.health_check = HealthCheck::None;
        let report = validate_manifest(&manifest_for(&service, &[]), false);
        assert!(report.is_valid());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("no health check")));
    }

    #[test]
    fn fully_configured_manifest_has_no_findings() {
        let report = validate_manifest(&manifest_for(&healthy_service(), &[]), true);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn invalid_version_is_an_error() {
        let mut service = healthy_service();
        service.version = "1.0".to_owned();
        let report = validate_manifest(&manifest_for(&service, &[]), false);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("'1.0'") && e.contains("orderable")));
    }

    #[test]
    fn limit_below_request_is_an_error() {
        let mut service = healthy_service();
        service
            .resource_requests
            .insert("cpu".to_owned(), "500m".to_owned());
        service
            .resource_limits
            .insert("cpu".to_owned(), "100m".to_owned());
        let report = validate_manifest(&manifest_for(&service, &[]), false);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("limit") && e.contains("cpu")));
    }

    #[test]
    fn limit_above_request_is_fine() {
        let mut service = healthy_service();
        service
            .resource_requests
            .insert("cpu".to_owned(), "100m".to_owned());
        service
            .resource_limits
            .insert("cpu".to_owned(), "500m".to_owned());
        let report = validate_manifest(&manifest_for(&service, &[]), false);
        assert!(report.is_valid());
    }

    #[test]
    fn mixed_unit_quantities_compare_correctly() {
        let mut service = healthy_service();
        service
            .resource_requests
            .insert("memory".to_owned(), "512Mi".to_owned());
        service
            .resource_limits
            .insert("memory".to_owned(), "1Gi".to_owned());
        let report = validate_manifest(&manifest_for(&service, &[]), false);
        assert!(report.is_valid());
    }

    #[test]
    fn unparseable_quantity_is_an_error() {
        let mut service = healthy_service();
        service
            .resource_limits
            .insert("cpu".to_owned(), "lots".to_owned());
        let report = validate_manifest(&manifest_for(&service, &[]), false);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("'lots'") && e.contains("quantity")));
    }

    #[test]
    fn replication_ordering_is_enforced() {
        let mut service = healthy_service();
        service.replication = ReplicaBounds {
            desired: Some(1),
            min: Some(3),
            max: Some(2),
        };
        let report = validate_manifest(&manifest_for(&service, &[]), false);
        assert!(report.errors.iter().any(|e| e.contains("replication.min")));
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("replication.desired")));
    }

    #[test]
    fn valid_replication_passes() {
        let mut service = healthy_service();
        service.replication = ReplicaBounds {
            desired: Some(3),
            min: Some(1),
            max: Some(5),
        };
        let report = validate_manifest(&manifest_for(&service, &[]), false);
        assert!(report.is_valid());
    }

    #[test]
    fn empty_check_payloads_are_errors() {
        let mut manifest = manifest_for(&healthy_service(), &[]);
        manifest.health_check = HealthCheck::CustomScript(String::new());
        let report = validate_manifest(&manifest, false);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("custom-script")));

        manifest.health_check = HealthCheck::CustomCommand("  ".to_owned());
        let report = validate_manifest(&manifest, false);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("custom-command")));

        manifest.health_check = HealthCheck::SameBinaryArgs(Vec::new());
        let report = validate_manifest(&manifest, false);
        assert!(report.errors.iter().any(|e| e.contains("same-binary")));
    }

    #[test]
    fn duplicate_dependencies_are_errors() {
        let dep = Target::Dependency(ProductDependency::new("com.example", "db", "1.0.0"));
        let report =
            validate_manifest(&manifest_for(&healthy_service(), &[dep.clone(), dep]), false);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("duplicate") && e.contains("com.example:db")));
    }

    #[test]
    fn minimum_above_maximum_is_an_error() {
        let mut dep = ProductDependency::new("com.example", "db", "3.0.0");
        dep.maximum_version = Some("2.0.0".to_owned());
        let report = validate_manifest(
            &manifest_for(&healthy_service(), &[Target::Dependency(dep)]),
            false,
        );
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("exceeds maximum")));
    }

    #[test]
    fn wildcard_maximum_bounds_are_respected() {
        let mut inside = ProductDependency::new("com.example", "db", "1.4.0");
        inside.maximum_version = Some("1.x.x".to_owned());
        let report = validate_manifest(
            &manifest_for(&healthy_service(), &[Target::Dependency(inside)]),
            false,
        );
        assert!(report.is_valid());

        let mut outside = ProductDependency::new("com.example", "db", "2.0.0");
        outside.maximum_version = Some("1.x.x".to_owned());
        let report = validate_manifest(
            &manifest_for(&healthy_service(), &[Target::Dependency(outside)]),
            false,
        );
        assert!(!report.is_valid());
    }

    #[test]
    fn lockstep_dependency_is_advisory_even_in_strict_mode() {
        let mut dep = ProductDependency::new("com.example", "db", "1.0.0");
        dep.maximum_version = Some("1.0.0".to_owned());
        let manifest = manifest_for(&healthy_service(), &[Target::Dependency(dep)]);
        for strict in [false, true] {
            let report = validate_manifest(&manifest, strict);
            assert!(report.is_valid(), "strict={strict}");
            assert!(report.warnings.iter().any(|w| w.contains("lockstep")));
        }
    }

    #[test]
    fn strict_mode_promotes_health_and_resource_warnings_only() {
        let service = ServiceTarget::new("com.example", "my-service", "1.0.0", "app:app");
        let manifest = manifest_for(&service, &[]);

        let lenient = validate_manifest(&manifest, false);
        assert!(lenient.is_valid());
        assert_eq!(lenient.warnings.len(), 3);

        let strict = validate_manifest(&manifest, true);
        assert!(!strict.is_valid());
        assert!(strict.errors.iter().any(|e| e.contains("no health check")));
        assert!(strict
            .errors
            .iter()
            .any(|e| e.contains("no resource requests")));
        // Labels never promote.
        assert!(strict.warnings.iter().any(|w| w.contains("no labels")));
    }

    #[test]
    fn empty_incompatibility_reason_is_an_error() {
        let incompat = Target::Incompatibility(ProductIncompatibility {
            coordinate: ProductCoordinate::new("com.example", "legacy"),
            version_range: "< 2.0.0".to_owned(),
            reason: String::new(),
        });
        let report = validate_manifest(&manifest_for(&healthy_service(), &[incompat]), false);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("com.example:legacy") && e.contains("no reason")));
    }

    #[test]
    fn validation_is_deterministic() {
        let mut service = healthy_service();
        service.coordinate = ProductCoordinate::new("com.example", "My-Service");
        let manifest = manifest_for(&service, &[]);
        assert_eq!(
            validate_manifest(&manifest, true),
            validate_manifest(&manifest, true)
        );
    }

    #[test]
    fn quantity_parsing_handles_suffixes() {
        assert_eq!(parse_quantity("500m"), Some(0.5));
        assert_eq!(parse_quantity("2"), Some(2.0));
        assert_eq!(parse_quantity("1Gi"), Some(1024.0 * 1024.0 * 1024.0));
        assert_eq!(parse_quantity("1.5k"), Some(1500.0));
        assert_eq!(parse_quantity(""), None);
        assert_eq!(parse_quantity("m"), None);
        assert_eq!(parse_quantity("10x"), None);
    }
}
