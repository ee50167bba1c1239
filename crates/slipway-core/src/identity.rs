use crate::inputs::SuppliedInputs;
use slipway_schema::{PackagingDefaults, Target};

/// Compute the content-addressed cache key for one packaging computation.
///
/// The key covers the complete input set: the target, its resolved
/// references (order-insensitively, since generation sorts them anyway),
/// the subsystem defaults, and every supplied binary/script/asset byte
/// stream. Because packaging is referentially transparent, a result
/// memoized under this key is always semantically equivalent to
/// recomputation.
pub fn compute_cache_key(
    target: &Target,
    references: &[Target],
    defaults: &PackagingDefaults,
    inputs: &SuppliedInputs,
) -> Result<String, serde_json::Error> {
    let mut hasher = blake3::Hasher::new();

    hasher.update(b"target:");
    hasher.update(serde_json::to_string(target)?.as_bytes());

    let mut serialized_refs: Vec<String> = references
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<_, _>>()?;
    serialized_refs.sort();
    for reference in &serialized_refs {
        hasher.update(b"ref:");
        hasher.update(reference.as_bytes());
    }

    hasher.update(b"defaults:");
    hasher.update(serde_json::to_string(defaults)?.as_bytes());

    for (platform, bytes) in &inputs.launcher_binaries {
        hasher.update(format!("binary:{platform}:{}:", bytes.len()).as_bytes());
        hasher.update(bytes);
    }
    for (path, bytes) in &inputs.scripts {
        hasher.update(format!("script:{path}:{}:", bytes.len()).as_bytes());
        hasher.update(bytes);
    }
    for (path, bytes) in &inputs.asset_files {
        hasher.update(format!("asset:{path}:{}:", bytes.len()).as_bytes());
        hasher.update(bytes);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
