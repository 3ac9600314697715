//! Tiled map loading with automatic reference repair
//!
//! [`MapLoader::load`] parses a TMX map and everything it references. When a
//! tileset or image reference is dangling the loader plans a repair, writes a
//! `_fixed` copy of the map (plus any corrected tilesets and placeholders)
//! and parses that instead.
//!
//! ```ignore
//! use towerkeep_loader::{MapLoader, LoaderOptions};
//!
//! let loaded = MapLoader::new(LoaderOptions::default()).load("assets/maps/keep.tmx")?;
//! if let Some(report) = &loaded.repair {
//!     println!("repaired into {}", report.fixed_map.display());
//! }
//! ```

mod error;
mod placeholder;
pub mod repair;
mod source;
mod tmx;
mod xml;

pub use error::{LoadError, ReferenceKind, RepairWriteError};
pub use repair::{apply_repair, plan_repair, RepairPlan};
pub use source::{AssetSink, AssetSource, FsSource, MemorySource, OverlaySource};
pub use tmx::parse_map;

use std::path::{Path, PathBuf};
use towerkeep_core::MapDocument;
use tracing::{info, warn};

/// Loader behaviour switches
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Attempt to repair dangling references instead of failing
    pub repair: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self { repair: true }
    }
}

/// What a repair pass did
#[derive(Debug)]
pub struct RepairReport {
    pub original: PathBuf,
    pub fixed_map: PathBuf,
    /// Every file written, placeholders included
    pub written: Vec<PathBuf>,
    pub placeholders: Vec<PathBuf>,
    /// Files that could not be written; their contents were used from memory
    pub write_failures: Vec<RepairWriteError>,
}

impl RepairReport {
    pub fn is_degraded(&self) -> bool {
        !self.write_failures.is_empty()
    }
}

/// A loaded map and, if one happened, the repair that made it loadable
#[derive(Debug)]
pub struct LoadedMap {
    pub document: MapDocument,
    pub repair: Option<RepairReport>,
}

/// Loads maps through an asset source
pub struct MapLoader<S = FsSource> {
    source: S,
    options: LoaderOptions,
}

impl MapLoader<FsSource> {
    /// Loader over the real filesystem
    pub fn new(options: LoaderOptions) -> Self {
        Self::with_source(FsSource, options)
    }
}

impl<S: AssetSource + AssetSink> MapLoader<S> {
    pub fn with_source(source: S, options: LoaderOptions) -> Self {
        Self { source, options }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Load the map at `path`, repairing it once if needed
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadedMap, LoadError> {
        let path = path.as_ref();
        let err = match tmx::parse_map(path, &self.source) {
            Ok(document) => {
                return Ok(LoadedMap {
                    document,
                    repair: None,
                })
            }
            Err(err) => err,
        };

        if !self.options.repair
            || err.is_unreadable_document(path)
            || matches!(err, LoadError::Unsupported { .. })
        {
            return Err(err);
        }

        warn!("Failed to load {}: {err}; attempting repair", path.display());
        self.repair_and_reload(path, err)
    }

    fn repair_and_reload(&self, path: &Path, cause: LoadError) -> Result<LoadedMap, LoadError> {
        let unrepairable = |cause: LoadError| LoadError::Unrepairable {
            path: path.to_path_buf(),
            cause: Box::new(cause),
        };

        let plan = match plan_repair(path, &self.source) {
            Ok(plan) if !plan.is_empty() => plan,
            Ok(_) => return Err(unrepairable(cause)),
            Err(plan_err) => {
                warn!("Could not plan repair of {}: {plan_err}", path.display());
                return Err(unrepairable(cause));
            }
        };

        let outcome = apply_repair(&plan, &self.source, &self.source)?;
        let reparsed = if outcome.failures.is_empty() {
            tmx::parse_map(&plan.fixed_map_path, &self.source)
        } else {
            warn!(
                "{} repaired files could not be written; loading {} from memory",
                outcome.failures.len(),
                plan.fixed_map_path.display()
            );
            let overlay = OverlaySource::new(&self.source, &outcome.pending);
            tmx::parse_map(&plan.fixed_map_path, &overlay)
        };
        let document = reparsed.map_err(|e| LoadError::RepairFailed {
            fixed: plan.fixed_map_path.clone(),
            cause: Box::new(e),
        })?;

        info!(
            "Repaired {} into {}",
            path.display(),
            plan.fixed_map_path.display()
        );
        Ok(LoadedMap {
            document,
            repair: Some(RepairReport {
                original: path.to_path_buf(),
                fixed_map: plan.fixed_map_path.clone(),
                written: outcome.written,
                placeholders: plan
                    .placeholders
                    .iter()
                    .map(|p| p.path().to_path_buf())
                    .collect(),
                write_failures: outcome.failures,
            }),
        })
    }
}

/// Load a map from the filesystem with default options
pub fn load_map(path: impl AsRef<Path>) -> Result<LoadedMap, LoadError> {
    MapLoader::new(LoaderOptions::default()).load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="2" height="2" tilewidth="16" tileheight="16">
 <tileset firstgid="1" source="/somewhere/else/dungeon.tsx"/>
 <layer id="1" name="floor" width="2" height="2">
  <data encoding="csv">1,1,1,1</data>
 </layer>
</map>"#;

    #[test]
    fn test_valid_map_loads_without_repair() {
        let store = MemorySource::new()
            .with_file("m/a.tmx", MAP.replace("/somewhere/else/", ""))
            .with_file(
                "m/dungeon.tsx",
                r#"<tileset name="dungeon" tilewidth="16" tileheight="16" tilecount="1" columns="1"/>"#,
            );
        let loader = MapLoader::with_source(store, LoaderOptions::default());
        let loaded = loader.load("m/a.tmx").unwrap();
        assert!(loaded.repair.is_none());
        assert!(!loader.source().exists(Path::new("m/a_fixed.tmx")));
    }

    #[test]
    fn test_repair_disabled_returns_first_error() {
        let store = MemorySource::new().with_file("m/a.tmx", MAP);
        let loader = MapLoader::with_source(store, LoaderOptions { repair: false });
        assert!(matches!(
            loader.load("m/a.tmx"),
            Err(LoadError::MissingReference { .. })
        ));
        assert_eq!(loader.source().paths().len(), 1);
    }

    #[test]
    fn test_unparsable_document_is_unrepairable() {
        let store = MemorySource::new().with_file("m/a.tmx", "<map><layer></map>");
        let loader = MapLoader::with_source(store, LoaderOptions::default());
        match loader.load("m/a.tmx") {
            Err(LoadError::Unrepairable { cause, .. }) => {
                assert!(matches!(*cause, LoadError::Xml { .. }))
            }
            other => panic!("expected unrepairable, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_map_file() {
        let loader = MapLoader::with_source(MemorySource::new(), LoaderOptions::default());
        assert!(matches!(
            loader.load("m/none.tmx"),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn test_degraded_repair_loads_from_memory() {
        let store = MemorySource::read_only().with_file("m/a.tmx", MAP);
        let loader = MapLoader::with_source(store, LoaderOptions::default());
        let loaded = loader.load("m/a.tmx").unwrap();
        let report = loaded.repair.unwrap();
        assert!(report.is_degraded());
        assert!(report.written.is_empty());
        assert_eq!(loaded.document.tilesets[0].name, "dungeon");
    }

    #[test]
    fn test_filesystem_repair_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let map_path = dir.path().join("crypt.tmx");
        fs::write(&map_path, MAP).unwrap();

        let first = load_map(&map_path).unwrap();
        let report = first.repair.as_ref().unwrap();
        assert_eq!(report.fixed_map, dir.path().join("crypt_fixed.tmx"));
        assert!(dir.path().join("dungeon.tsx").is_file());
        assert!(dir.path().join("dungeon.png").is_file());
        assert_eq!(
            report.placeholders,
            vec![dir.path().join("dungeon.tsx"), dir.path().join("dungeon.png")]
        );

        let second = load_map(&report.fixed_map).unwrap();
        assert!(second.repair.is_none());
        assert_eq!(second.document.layers, first.document.layers);
        assert_eq!(second.document.tilesets, first.document.tilesets);
    }

    #[test]
    fn test_filesystem_basename_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let map_path = dir.path().join("crypt.tmx");
        fs::write(&map_path, MAP).unwrap();
        fs::write(
            dir.path().join("dungeon.tsx"),
            r#"<tileset name="dungeon" tilewidth="16" tileheight="16" tilecount="1" columns="1">
 <image source="dungeon.png" width="16" height="16"/>
</tileset>"#,
        )
        .unwrap();
        fs::write(dir.path().join("dungeon.png"), placeholder::transparent_png(16, 16)).unwrap();

        let loaded = load_map(&map_path).unwrap();
        let report = loaded.repair.unwrap();
        assert!(report.placeholders.is_empty());
        assert_eq!(report.written, vec![dir.path().join("crypt_fixed.tmx")]);
        assert_eq!(
            loaded.document.tilesets[0].image.as_ref().unwrap().path,
            dir.path().join("dungeon.png")
        );
    }
}
