//! Repair of dangling tileset and image references
//!
//! Repair runs in two phases. [`plan_repair`] inspects the broken map through
//! an [`AssetSource`] and decides every correction as plain data.
//! [`apply_repair`] then builds the corrected documents and writes them
//! through an [`AssetSink`]. Nothing is written during planning.
//!
//! Only references that do not resolve are touched. A replacement is looked
//! up by basename in the map's own directory; when none exists a one-tile
//! placeholder tileset and a transparent image are synthesized there.

use crate::error::{LoadError, RepairWriteError};
use crate::placeholder;
use crate::source::{reference_basename, resolve_reference, AssetSink, AssetSource};
use crate::tmx;
use crate::xml::XmlElement;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Suffix appended to the stem of corrected documents
pub const FIXED_SUFFIX: &str = "_fixed";

const DEFAULT_TILE_SIZE: u32 = 32;

/// Where a rewritten reference lives in the map document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSite {
    /// `source` attribute of a `<tileset>` element
    TilesetSource,
    /// `<image source>` of an embedded tileset
    EmbeddedImage,
}

/// A single attribute rewrite in the map document
#[derive(Debug, Clone, PartialEq)]
pub struct Retarget {
    /// Position of the `<tileset>` element among the map's tilesets
    pub tileset_index: usize,
    pub site: ReferenceSite,
    pub declared: String,
    pub replacement: String,
}

/// A corrected copy of an external tileset whose image did not resolve
#[derive(Debug, Clone, PartialEq)]
pub struct TilesetCopy {
    pub tileset_index: usize,
    pub original: PathBuf,
    pub output: PathBuf,
    pub declared_image: String,
    pub replacement_image: String,
}

/// An asset to synthesize
#[derive(Debug, Clone, PartialEq)]
pub enum Placeholder {
    Tileset {
        path: PathBuf,
        name: String,
        image_file: String,
    },
    Image {
        path: PathBuf,
        width: u32,
        height: u32,
    },
}

impl Placeholder {
    pub fn path(&self) -> &Path {
        match self {
            Placeholder::Tileset { path, .. } | Placeholder::Image { path, .. } => path,
        }
    }
}

/// Every correction needed for one map, decided without writing anything
#[derive(Debug, Clone, PartialEq)]
pub struct RepairPlan {
    pub map_path: PathBuf,
    pub fixed_map_path: PathBuf,
    pub tile_width: u32,
    pub tile_height: u32,
    pub retargets: Vec<Retarget>,
    pub tileset_copies: Vec<TilesetCopy>,
    pub placeholders: Vec<Placeholder>,
}

impl RepairPlan {
    /// No reference could be rewritten
    pub fn is_empty(&self) -> bool {
        self.retargets.is_empty()
    }
}

/// Result of writing a plan
#[derive(Debug, Default)]
pub struct RepairOutcome {
    pub written: Vec<PathBuf>,
    pub failures: Vec<RepairWriteError>,
    /// Contents of the files that could not be written
    pub pending: BTreeMap<PathBuf, Vec<u8>>,
}

/// `<stem>_fixed.<ext>` next to the original
pub fn fixed_path(path: &Path) -> PathBuf {
    let stem = file_stem(path);
    let name = match path.extension() {
        Some(ext) => format!("{stem}{FIXED_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{FIXED_SUFFIX}"),
    };
    path.with_file_name(name)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "placeholder".to_string())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Decide how to fix every dangling reference of the map at `map_path`
pub fn plan_repair(map_path: &Path, source: &dyn AssetSource) -> Result<RepairPlan, LoadError> {
    let map = tmx::read_document(map_path, source)?;
    let map_dir = map_path.parent().unwrap_or_else(|| Path::new(""));

    let mut planner = Planner {
        source,
        map_dir,
        tile_width: size_attr(&map, "tilewidth").unwrap_or(DEFAULT_TILE_SIZE),
        tile_height: size_attr(&map, "tileheight").unwrap_or(DEFAULT_TILE_SIZE),
        retargets: Vec::new(),
        tileset_copies: Vec::new(),
        placeholders: Vec::new(),
    };

    for (index, tileset) in map.children_named("tileset").enumerate() {
        match tileset.attr("source") {
            Some(declared) => planner.external_tileset(index, declared),
            None => planner.embedded_tileset(index, tileset),
        }
    }

    let plan = RepairPlan {
        map_path: map_path.to_path_buf(),
        fixed_map_path: fixed_path(map_path),
        tile_width: planner.tile_width,
        tile_height: planner.tile_height,
        retargets: planner.retargets,
        tileset_copies: planner.tileset_copies,
        placeholders: planner.placeholders,
    };
    debug!(
        "Repair plan for {}: {} rewrites, {} tileset copies, {} placeholders",
        map_path.display(),
        plan.retargets.len(),
        plan.tileset_copies.len(),
        plan.placeholders.len()
    );
    Ok(plan)
}

fn size_attr(element: &XmlElement, key: &str) -> Option<u32> {
    element
        .attr(key)
        .and_then(|raw| raw.trim().parse().ok())
        .filter(|size| *size > 0)
}

struct Planner<'a> {
    source: &'a dyn AssetSource,
    map_dir: &'a Path,
    tile_width: u32,
    tile_height: u32,
    retargets: Vec<Retarget>,
    tileset_copies: Vec<TilesetCopy>,
    placeholders: Vec<Placeholder>,
}

impl Planner<'_> {
    fn external_tileset(&mut self, index: usize, declared: &str) {
        let resolved = resolve_reference(self.map_dir, declared);
        let mut replacement = None;

        let tsx_path = if self.source.exists(&resolved) {
            resolved
        } else {
            let base = candidate_name(declared, "placeholder.tsx");
            let candidate = self.map_dir.join(base);
            replacement = Some(base.to_string());
            if !self.source.exists(&candidate) {
                self.placeholder_tileset(&candidate);
                self.retarget(index, ReferenceSite::TilesetSource, declared, base.to_string());
                return;
            }
            candidate
        };

        if let Some(copy) = self.tileset_image_fix(index, &tsx_path) {
            replacement = Some(file_name(&copy.output));
            self.tileset_copies.push(copy);
        }
        if let Some(replacement) = replacement {
            self.retarget(index, ReferenceSite::TilesetSource, declared, replacement);
        }
    }

    fn embedded_tileset(&mut self, index: usize, tileset: &XmlElement) {
        let Some(image) = tileset.child("image") else {
            return;
        };
        let Some(declared) = image.attr("source") else {
            return;
        };
        if self
            .source
            .exists(&resolve_reference(self.map_dir, declared))
        {
            return;
        }
        let replacement = self.image_replacement(declared, image);
        self.retarget(index, ReferenceSite::EmbeddedImage, declared, replacement);
    }

    /// A corrected copy of the tileset at `tsx_path` if its image is dangling
    fn tileset_image_fix(&mut self, index: usize, tsx_path: &Path) -> Option<TilesetCopy> {
        let document = match tmx::read_document(tsx_path, self.source) {
            Ok(document) => document,
            Err(e) => {
                debug!("Not checking image of {}: {e}", tsx_path.display());
                return None;
            }
        };
        let image = document.child("image")?;
        let declared = image.attr("source")?;
        let tsx_dir = tsx_path.parent().unwrap_or_else(|| Path::new(""));
        if self.source.exists(&resolve_reference(tsx_dir, declared)) {
            return None;
        }

        let replacement_image = self.image_replacement(declared, image);
        Some(TilesetCopy {
            tileset_index: index,
            original: tsx_path.to_path_buf(),
            output: self
                .map_dir
                .join(format!("{}{FIXED_SUFFIX}.tsx", file_stem(tsx_path))),
            declared_image: declared.to_string(),
            replacement_image,
        })
    }

    /// Basename of the image in the map directory, synthesized if absent
    fn image_replacement(&mut self, declared: &str, image: &XmlElement) -> String {
        let base = candidate_name(declared, "placeholder.png");
        let candidate = self.map_dir.join(base);
        if !self.source.exists(&candidate) {
            self.add_placeholder(Placeholder::Image {
                path: candidate,
                width: size_attr(image, "width").unwrap_or(self.tile_width),
                height: size_attr(image, "height").unwrap_or(self.tile_height),
            });
        }
        base.to_string()
    }

    fn placeholder_tileset(&mut self, path: &Path) {
        let name = file_stem(path);
        let image_file = format!("{name}.png");
        let image_path = self.map_dir.join(&image_file);

        self.add_placeholder(Placeholder::Tileset {
            path: path.to_path_buf(),
            name,
            image_file,
        });
        if !self.source.exists(&image_path) {
            self.add_placeholder(Placeholder::Image {
                path: image_path,
                width: self.tile_width,
                height: self.tile_height,
            });
        }
    }

    fn add_placeholder(&mut self, placeholder: Placeholder) {
        if !self
            .placeholders
            .iter()
            .any(|existing| existing.path() == placeholder.path())
        {
            self.placeholders.push(placeholder);
        }
    }

    fn retarget(&mut self, index: usize, site: ReferenceSite, declared: &str, replacement: String) {
        self.retargets.push(Retarget {
            tileset_index: index,
            site,
            declared: declared.to_string(),
            replacement,
        });
    }
}

fn candidate_name<'a>(declared: &'a str, fallback: &'a str) -> &'a str {
    match reference_basename(declared) {
        "" | "." | ".." => fallback,
        base => base,
    }
}

/// Build the corrected documents and placeholders of `plan` and write them.
///
/// Write failures do not abort: they are collected in the outcome together
/// with the unwritten contents so the caller can load from memory instead.
pub fn apply_repair(
    plan: &RepairPlan,
    source: &dyn AssetSource,
    sink: &dyn AssetSink,
) -> Result<RepairOutcome, LoadError> {
    let mut files: Vec<(PathBuf, Vec<u8>)> = Vec::new();

    for placeholder in &plan.placeholders {
        match placeholder {
            Placeholder::Tileset {
                path,
                name,
                image_file,
            } => {
                let document = placeholder::tileset_document(
                    name,
                    image_file,
                    plan.tile_width,
                    plan.tile_height,
                );
                files.push((path.clone(), serialize(&document, path)?));
            }
            Placeholder::Image {
                path,
                width,
                height,
            } => files.push((path.clone(), placeholder::transparent_png(*width, *height))),
        }
    }

    for copy in &plan.tileset_copies {
        let mut tileset = tmx::read_document(&copy.original, source)?;
        if let Some(image) = tileset.child_mut("image") {
            image.set_attr("source", copy.replacement_image.as_str());
        }
        files.push((copy.output.clone(), serialize(&tileset, &copy.output)?));
    }

    let mut map = tmx::read_document(&plan.map_path, source)?;
    {
        let mut tilesets: Vec<&mut XmlElement> = map
            .children
            .iter_mut()
            .filter(|child| child.name == "tileset")
            .collect();
        for retarget in &plan.retargets {
            let Some(tileset) = tilesets.get_mut(retarget.tileset_index) else {
                warn!(
                    "Tileset #{} vanished from {} during repair",
                    retarget.tileset_index,
                    plan.map_path.display()
                );
                continue;
            };
            match retarget.site {
                ReferenceSite::TilesetSource => {
                    tileset.set_attr("source", retarget.replacement.as_str())
                }
                ReferenceSite::EmbeddedImage => {
                    if let Some(image) = tileset.child_mut("image") {
                        image.set_attr("source", retarget.replacement.as_str());
                    }
                }
            }
        }
    }
    files.push((
        plan.fixed_map_path.clone(),
        serialize(&map, &plan.fixed_map_path)?,
    ));

    let mut outcome = RepairOutcome::default();
    for (path, contents) in files {
        match sink.write(&path, &contents) {
            Ok(()) => {
                info!("Wrote repaired asset {}", path.display());
                outcome.written.push(path);
            }
            Err(source) => {
                warn!("Could not write {}: {source}", path.display());
                outcome.pending.insert(path.clone(), contents);
                outcome.failures.push(RepairWriteError { path, source });
            }
        }
    }
    Ok(outcome)
}

fn serialize(document: &XmlElement, path: &Path) -> Result<Vec<u8>, LoadError> {
    document
        .to_document()
        .map(String::into_bytes)
        .map_err(|message| LoadError::Xml {
            path: path.to_path_buf(),
            message,
        })
}
