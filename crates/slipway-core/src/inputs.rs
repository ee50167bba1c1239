use slipway_layout::Platform;
use std::collections::BTreeMap;

/// Externally-supplied byte content consumed during assembly.
///
/// The core never downloads, reads, or chooses any of this: launcher
/// binaries come from the binary supplier keyed by platform, and hook/check
/// script and asset file bytes come from the script supplier keyed by the
/// source path declared on the target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuppliedInputs {
    pub launcher_binaries: BTreeMap<Platform, Vec<u8>>,
    /// Hook and check script bytes by declared source path.
    pub scripts: BTreeMap<String, Vec<u8>>,
    /// Asset file bytes by declared source path.
    pub asset_files: BTreeMap<String, Vec<u8>>,
}
