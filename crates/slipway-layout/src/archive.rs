use crate::layout::{DistLayout, LayoutEntry};
use crate::AssemblyError;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::BTreeMap;

const DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;
const EXEC_MODE: u32 = 0o755;

enum ArchiveNode<'a> {
    Directory,
    File { content: &'a [u8], mode: u32 },
}

/// Create the gzipped distribution tarball from a layout.
///
/// Determinism guarantees, required for content-addressed build caching:
/// - Entries sorted lexicographically by path, prefixed with the
///   distribution name, with every intermediate directory present
/// - All timestamps set to 0 (Unix epoch), including the gzip header
/// - All ownership set to 0:0 (root:root)
/// - Fixed modes: 0o755 for directories and executables, 0o644 otherwise
pub fn archive_layout(layout: &DistLayout) -> Result<Vec<u8>, AssemblyError> {
    // Merge explicit entries with every ancestor directory so the archive
    // is self-contained. BTreeMap iteration keeps the whole set sorted.
    let mut nodes: BTreeMap<String, ArchiveNode<'_>> = BTreeMap::new();
    nodes.insert(layout.dist_name().to_owned(), ArchiveNode::Directory);

    for (path, entry) in layout.iter() {
        let full = format!("{}/{path}", layout.dist_name());
        for ancestor in ancestors(&full) {
            nodes.entry(ancestor).or_insert(ArchiveNode::Directory);
        }
        match entry {
            LayoutEntry::Directory => {
                nodes.insert(full, ArchiveNode::Directory);
            }
            LayoutEntry::File {
                content,
                executable,
            } => {
                let mode = if *executable { EXEC_MODE } else { FILE_MODE };
                nodes.insert(
                    full,
                    ArchiveNode::File {
                        content: content.as_slice(),
                        mode,
                    },
                );
            }
        }
    }

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (path, node) in &nodes {
        match node {
            ArchiveNode::Directory => {
                let mut header = make_header(tar::EntryType::Directory, DIR_MODE, 0);
                builder.append_data(&mut header, format!("{path}/"), &[] as &[u8])?;
            }
            ArchiveNode::File { content, mode } => {
                let mut header =
                    make_header(tar::EntryType::Regular, *mode, content.len() as u64);
                builder.append_data(&mut header, path, *content)?;
            }
        }
    }

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

fn make_header(entry_type: tar::EntryType, mode: u32, size: u64) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mode(mode);
    header.set_size(size);
    header.set_cksum();
    header
}

fn ancestors(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut index = 0;
    while let Some(pos) = path[index..].find('/') {
        index += pos;
        out.push(path[..index].to_owned());
        index += 1;
    }
    out
}
