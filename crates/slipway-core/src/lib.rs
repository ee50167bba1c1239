//! Packaging engine for Slipway.
//!
//! Ties the schema layer and the layout assembler into the single
//! [`package`] pipeline: generate the manifest, gate on validation, produce
//! the lock file, assemble the distribution layout, and archive it. Every
//! stage is a pure function of its declared inputs, so an arbitrary number
//! of targets can be packaged in parallel with zero shared state; the only
//! side-effecting operation is [`write_distribution`].

pub mod engine;
pub mod identity;
pub mod inputs;
pub mod write;

pub use engine::{package, PackageOutput};
pub use identity::compute_cache_key;
pub use inputs::SuppliedInputs;
pub use write::write_distribution;

use slipway_schema::ValidationReport;
use std::fmt;
use thiserror::Error;

/// A validation gate failure: the manifest collected at least one error.
/// Warnings travel along so callers can still report them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub report: ValidationReport,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} error(s): {}",
            self.report.errors.len(),
            self.report.errors.join("; ")
        )
    }
}

#[derive(Debug, Error)]
pub enum PackageError {
    #[error("configuration error: {0}")]
    Config(#[from] slipway_schema::ConfigError),
    #[error("manifest validation failed: {0}")]
    Validation(ValidationFailure),
    #[error("assembly error: {0}")]
    Assembly(#[from] slipway_layout::AssemblyError),
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
