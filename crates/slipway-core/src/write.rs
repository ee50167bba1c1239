use crate::engine::PackageOutput;
use crate::PackageError;
use slipway_layout::LayoutEntry;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// Materialize a packaged distribution under `dest`: the full layout tree at
/// `dest/<dist-name>/` and the archive at `dest/<dist-name>.sls.tgz`.
///
/// This is the single side-effecting operation in the packaging core. Files
/// are written through temporaries and atomically persisted, so aborting a
/// packaging run at any point never leaves a partially-written file behind.
/// Returns the archive path.
pub fn write_distribution(output: &PackageOutput, dest: &Path) -> Result<PathBuf, PackageError> {
    let dist_name = output.layout.dist_name();
    let dist_root = dest.join(dist_name);

    for (path, entry) in output.layout.iter() {
        let target = dist_root.join(path);
        match entry {
            LayoutEntry::Directory => fs::create_dir_all(&target)?,
            LayoutEntry::File {
                content,
                executable,
            } => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                write_atomic(&target, content, *executable)?;
            }
        }
    }

    let archive_path = dest.join(format!("{dist_name}.sls.tgz"));
    write_atomic(&archive_path, &output.archive, false)?;
    fsync_dir(dest)?;

    info!(
        "wrote distribution {} to {}",
        dist_name,
        dest.display()
    );

    Ok(archive_path)
}

fn write_atomic(path: &Path, content: &[u8], executable: bool) -> Result<(), PackageError> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    if executable {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    let _ = executable;

    tmp.persist(path).map_err(|e| PackageError::Io(e.error))?;
    fsync_dir(dir)?;
    Ok(())
}

// Fsync the directory so renames survive power loss.
fn fsync_dir(dir: &Path) -> Result<(), PackageError> {
    if let Ok(f) = fs::File::open(dir) {
        let _ = f.sync_all();
    }
    Ok(())
}
