use crate::target::ProductDependency;
use crate::types::{is_valid_product_group, is_valid_product_name, ProductCoordinate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

pub const LOCK_FILE_NAME: &str = "product-dependencies.lock";

const LOCK_HEADER: &str =
    "# product-dependencies.lock\n# Run slipway lock to regenerate this file\n";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid lock file line {line}: '{content}'")]
pub struct LockParseError {
    pub line: usize,
    pub content: String,
}

/// A single entry in a `product-dependencies.lock` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub coordinate: ProductCoordinate,
    pub minimum_version: String,
    pub maximum_version: String,
    pub recommended_version: Option<String>,
    pub optional: bool,
}

impl LockEntry {
    pub fn product_id(&self) -> String {
        self.coordinate.product_id()
    }

    /// Serialize to a single lock file line:
    /// `group:name (min, max[, recommended rec])[ optional]`.
    pub fn to_line(&self) -> String {
        let mut line = format!(
            "{} ({}, {}",
            self.product_id(),
            self.minimum_version,
            self.maximum_version
        );
        if let Some(recommended) = &self.recommended_version {
            line.push_str(", recommended ");
            line.push_str(recommended);
        }
        line.push(')');
        if self.optional {
            line.push_str(" optional");
        }
        line
    }
}

/// Generate lock file content from product dependencies, sorted by product
/// id for deterministic output.
///
/// Returns `None` for an empty dependency list: no lock file is emitted at
/// all, and the absence itself is meaningful to the deployment runtime.
pub fn generate_lock_file(dependencies: &[ProductDependency]) -> Option<String> {
    if dependencies.is_empty() {
        return None;
    }

    let mut entries: Vec<LockEntry> = dependencies
        .iter()
        .map(|dep| LockEntry {
            coordinate: dep.coordinate.clone(),
            minimum_version: dep.minimum_version.clone(),
            maximum_version: dep
                .effective_maximum()
                .unwrap_or_else(|| dep.minimum_version.clone()),
            recommended_version: dep.recommended_version.clone(),
            optional: dep.optional,
        })
        .collect();
    entries.sort_by(|a, b| a.coordinate.cmp(&b.coordinate));

    let mut content = String::from(LOCK_HEADER);
    for entry in entries {
        content.push_str(&entry.to_line());
        content.push('\n');
    }
    Some(content)
}

/// Parse lock file content back into entries. Comment and blank lines are
/// skipped; anything else must match the line format exactly.
pub fn parse_lock_file(content: &str) -> Result<Vec<LockEntry>, LockParseError> {
    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }
        let entry = parse_line(stripped).ok_or_else(|| LockParseError {
            line: index + 1,
            content: line.to_owned(),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

fn parse_line(line: &str) -> Option<LockEntry> {
    let (id, rest) = line.split_once(" (")?;
    let (group, name) = id.split_once(':')?;
    if !is_valid_product_group(group) || !is_valid_product_name(name) {
        return None;
    }

    let (versions, trailer) = rest.split_once(')')?;
    let optional = match trailer {
        "" => false,
        " optional" => true,
        _ => return None,
    };

    let mut fields = versions.split(", ");
    let minimum = fields.next()?.trim();
    let maximum = fields.next()?.trim();
    let recommended = match fields.next() {
        None => None,
        Some(field) => Some(field.strip_prefix("recommended ")?.trim().to_owned()),
    };
    if fields.next().is_some() || minimum.is_empty() || maximum.is_empty() {
        return None;
    }

    Some(LockEntry {
        coordinate: ProductCoordinate::new(group, name),
        minimum_version: minimum.to_owned(),
        maximum_version: maximum.to_owned(),
        recommended_version: recommended,
        optional,
    })
}

/// Validate lock file content and return any findings: unparseable lines,
/// duplicate product ids, empty version fields.
pub fn validate_lock_file(content: &str) -> Vec<String> {
    let entries = match parse_lock_file(content) {
        Ok(entries) => entries,
        Err(err) => return vec![err.to_string()],
    };

    let mut errors = Vec::new();
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for entry in entries {
        let id = entry.product_id();
        if !seen.insert(id.clone()) {
            errors.push(format!("duplicate dependency in lock file: {id}"));
        }
    }
    errors
}
