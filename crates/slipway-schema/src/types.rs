use serde::{Deserialize, Serialize};
use std::fmt;

/// Maven-style product coordinate: group plus name.
///
/// The derived ordering (group, then name) is the canonical sort key for
/// every dependency, incompatibility, and lock-file list in this crate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductCoordinate {
    pub group: String,
    pub name: String,
}

impl ProductCoordinate {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// The `group:name` identifier used in manifests and lock files.
    pub fn product_id(&self) -> String {
        format!("{}:{}", self.group, self.name)
    }
}

impl fmt::Display for ProductCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

/// Product groups allow lowercase letters, digits, dots, and hyphens.
pub fn is_valid_product_group(group: &str) -> bool {
    !group.is_empty()
        && group
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
}

/// Product names start with a lowercase letter, then allow lowercase
/// letters, digits, dots, and hyphens.
pub fn is_valid_product_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-')
}
