//! File access capabilities used by the loader
//!
//! Parsing and repair planning only see the filesystem through
//! [`AssetSource`], and repair writes only go through [`AssetSink`], so the
//! decision logic can run against [`MemorySource`] in tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

/// Read access to map, tileset and image files
pub trait AssetSource {
    fn exists(&self, path: &Path) -> bool;
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}

/// Write access used when persisting repaired documents and placeholders
pub trait AssetSink {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSource;

impl AssetSource for FsSource {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

impl AssetSink for FsSource {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        std::fs::write(path, contents)
    }
}

/// In-memory file store keyed by exact path
#[derive(Debug, Default)]
pub struct MemorySource {
    files: RefCell<BTreeMap<PathBuf, Vec<u8>>>,
    read_only: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write
    pub fn read_only() -> Self {
        Self {
            files: RefCell::default(),
            read_only: true,
        }
    }

    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl AsRef<[u8]>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl AsRef<[u8]>) {
        self.files
            .borrow_mut()
            .insert(path.into(), contents.as_ref().to_vec());
    }

    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.borrow().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.borrow().keys().cloned().collect()
    }
}

impl AssetSource for MemorySource {
    fn exists(&self, path: &Path) -> bool {
        self.files.borrow().contains_key(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let files = self.files.borrow();
        let bytes = files
            .get(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))?;
        String::from_utf8(bytes.clone()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl AssetSink for MemorySource {
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if self.read_only {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "read-only asset store",
            ));
        }
        self.insert(path, contents);
        Ok(())
    }
}

/// Files that could not be persisted, layered over another source
pub struct OverlaySource<'a> {
    base: &'a dyn AssetSource,
    files: &'a BTreeMap<PathBuf, Vec<u8>>,
}

impl<'a> OverlaySource<'a> {
    pub fn new(base: &'a dyn AssetSource, files: &'a BTreeMap<PathBuf, Vec<u8>>) -> Self {
        Self { base, files }
    }
}

impl AssetSource for OverlaySource<'_> {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.base.exists(path)
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        match self.files.get(path) {
            Some(bytes) => String::from_utf8(bytes.clone())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            None => self.base.read_to_string(path),
        }
    }
}

/// Resolve a reference declared inside a document against that document's
/// directory. Absolute references are kept as they are.
pub fn resolve_reference(base_dir: &Path, declared: &str) -> PathBuf {
    base_dir.join(declared)
}

/// Final path component of a reference, accepting both `/` and `\`
/// separators (maps are often authored on another platform).
pub fn reference_basename(declared: &str) -> &str {
    declared
        .rsplit(['/', '\\'])
        .find(|part| !part.is_empty())
        .unwrap_or(declared)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_basename() {
        assert_eq!(reference_basename("/old/assets/terrain.tsx"), "terrain.tsx");
        assert_eq!(reference_basename(r"C:\art\tiles\dungeon.png"), "dungeon.png");
        assert_eq!(reference_basename("plain.tsx"), "plain.tsx");
    }

    #[test]
    fn test_resolve_reference() {
        assert_eq!(
            resolve_reference(Path::new("maps"), "tiles/a.tsx"),
            PathBuf::from("maps/tiles/a.tsx")
        );
        assert_eq!(
            resolve_reference(Path::new("maps"), "/abs/a.tsx"),
            PathBuf::from("/abs/a.tsx")
        );
    }

    #[test]
    fn test_memory_source_read_only() {
        let store = MemorySource::read_only();
        assert!(store.write(Path::new("a.tmx"), b"x").is_err());
        assert!(!store.exists(Path::new("a.tmx")));
    }

    #[test]
    fn test_overlay_prefers_pending_files() {
        let base = MemorySource::new().with_file("a.tsx", "base");
        let mut pending = BTreeMap::new();
        pending.insert(PathBuf::from("b.tsx"), b"pending".to_vec());
        let overlay = OverlaySource::new(&base, &pending);
        assert!(overlay.exists(Path::new("a.tsx")));
        assert_eq!(overlay.read_to_string(Path::new("b.tsx")).unwrap(), "pending");
    }
}
