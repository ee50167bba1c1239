use crate::AssemblyError;
use std::collections::BTreeMap;

/// One node of a distribution layout: file bytes with an executable bit, or
/// an (initially empty) directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutEntry {
    File { content: Vec<u8>, executable: bool },
    Directory,
}

/// The complete distribution tree, mapping relative paths to entries.
///
/// Backed by a `BTreeMap`, so enumeration order is always sorted by path,
/// which is what makes downstream archiving reproducible. No two entries can
/// share a path; a second insert of the same path is a hard assembly error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistLayout {
    dist_name: String,
    entries: BTreeMap<String, LayoutEntry>,
}

impl DistLayout {
    pub fn new(dist_name: impl Into<String>) -> Self {
        Self {
            dist_name: dist_name.into(),
            entries: BTreeMap::new(),
        }
    }

    /// `<product-name>-<version>`, the archive's top-level directory.
    pub fn dist_name(&self) -> &str {
        &self.dist_name
    }

    pub fn add_file(
        &mut self,
        path: impl Into<String>,
        content: impl Into<Vec<u8>>,
        executable: bool,
    ) -> Result<(), AssemblyError> {
        self.insert(
            path.into(),
            LayoutEntry::File {
                content: content.into(),
                executable,
            },
        )
    }

    pub fn add_directory(&mut self, path: impl Into<String>) -> Result<(), AssemblyError> {
        self.insert(path.into(), LayoutEntry::Directory)
    }

    fn insert(&mut self, path: String, entry: LayoutEntry) -> Result<(), AssemblyError> {
        if self.entries.contains_key(&path) {
            return Err(AssemblyError::DuplicatePath(path));
        }
        self.entries.insert(path, entry);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&LayoutEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// File bytes at `path`, if present and a file.
    pub fn file_content(&self, path: &str) -> Option<&[u8]> {
        match self.entries.get(path) {
            Some(LayoutEntry::File { content, .. }) => Some(content),
            _ => None,
        }
    }

    pub fn is_executable(&self, path: &str) -> bool {
        matches!(
            self.entries.get(path),
            Some(LayoutEntry::File {
                executable: true,
                ..
            })
        )
    }

    /// All entries in sorted path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LayoutEntry)> {
        self.entries.iter().map(|(path, entry)| (path.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
