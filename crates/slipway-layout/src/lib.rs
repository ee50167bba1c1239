//! Distribution layout assembly for Slipway.
//!
//! This crate turns a generated [`Manifest`](slipway_schema::Manifest) plus
//! externally-supplied launcher binaries and script bytes into the full
//! distribution directory tree (`DistLayout`) and a byte-reproducible
//! `.sls.tgz` archive. Everything here is a pure function of its inputs: no
//! platform detection, no clock, no I/O.

pub mod archive;
pub mod assemble;
pub mod check;
pub mod hooks;
pub mod init_script;
pub mod launcher;
pub mod layout;

pub use archive::archive_layout;
pub use assemble::{assemble_asset, assemble_service, ServiceAssembly};
pub use check::{generate_check_command_script, CHECK_SCRIPT_PATH, LAUNCHER_CHECK_PATH};
pub use hooks::{hook_install_path, ENTRYPOINT_SCRIPT_PATH, HOOKS_LIBRARY_PATH};
pub use init_script::{generate_init_script, INIT_SCRIPT_PATH};
pub use launcher::{
    launcher_path, Arch, CheckLauncherConfig, Os, Platform, StaticLauncherConfig,
    LAUNCHER_BINARY_NAME, LAUNCHER_STATIC_PATH, REQUIRED_PLATFORMS,
};
pub use layout::{DistLayout, LayoutEntry};

use thiserror::Error;

/// Fatal layout-construction failure. Assembly errors are deterministic for
/// a given input set and are never retried.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("duplicate path in distribution layout: {0}")]
    DuplicatePath(String),
    #[error("missing launcher binary for platform {0}")]
    MissingLauncherBinary(Platform),
    #[error("no script content supplied for '{0}'")]
    MissingScript(String),
    #[error("no content supplied for asset source '{0}'")]
    MissingAssetSource(String),
    #[error("manifest has no launch configuration")]
    MissingLaunchSpec,
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
