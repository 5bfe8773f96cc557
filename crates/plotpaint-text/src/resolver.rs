//! Font resolution: style descriptor → loaded face.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fontdb::{Database, Family, Query, Source, Stretch, Style, Weight};
use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::error::{Result, TextError};
use crate::font::{FontFace, ScaledFontMetrics};
use crate::raster::{TextExtents, TextRaster, rasterize_line, text_extents};

/// Requested font properties.
#[derive(Clone, Debug, PartialEq)]
pub struct FontStyle {
    /// Family names in preference order; generic names (`sans-serif`,
    /// `serif`, `monospace`, `cursive`, `fantasy`) are recognized.
    pub families: Vec<String>,
    /// CSS-style weight, 100..=900.
    pub weight: u16,
    pub italic: bool,
    pub size_pt: f64,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            families: Vec::new(),
            weight: 400,
            italic: false,
            size_pt: 10.0,
        }
    }
}

impl FontStyle {
    pub fn new(size_pt: f64) -> Self {
        Self {
            size_pt,
            ..Self::default()
        }
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.families.push(family.into());
        self
    }

    pub fn bold(mut self) -> Self {
        self.weight = 700;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

/// A resolved face plus the file it was loaded from.
#[derive(Clone, Debug)]
pub struct FontHandle {
    pub face: Arc<FontFace>,
    pub path: Option<PathBuf>,
}

impl FontHandle {
    pub fn metrics(&self, size_px: f32) -> ScaledFontMetrics {
        self.face.scaled_metrics(size_px)
    }

    pub fn rasterize(&self, text: &str, size_px: f32) -> TextRaster {
        rasterize_line(&self.face, text, size_px)
    }

    pub fn extents(&self, text: &str, size_px: f32) -> TextExtents {
        text_extents(&self.face, text, size_px)
    }
}

/// Capability: turn a style descriptor into a loadable face.
pub trait FontResolver: Send + Sync {
    fn resolve(&self, style: &FontStyle) -> Result<FontHandle>;
}

/// Faces loaded from disk, keyed by file and collection index. Failed loads are not remembered.
#[derive(Default)]
struct FaceCache {
    faces: HashMap<(PathBuf, u32), Arc<FontFace>>,
}

impl FaceCache {
    fn get_or_load(&mut self, path: &Path, index: u32) -> Result<Arc<FontFace>> {
        let key = (path.to_path_buf(), index);
        if let Some(face) = self.faces.get(&key) {
            return Ok(face.clone());
        }
        let face = Arc::new(FontFace::from_path(path, index as usize)?);
        self.faces.insert(key, face.clone());
        Ok(face)
    }
}

/// Resolver backed by the system font database.
pub struct SystemFontResolver {
    db: Database,
    cache: Mutex<FaceCache>,
    fallback: Option<PathBuf>,
    default_family: String,
}

fn family_from_name(name: &str) -> Family<'_> {
    match name.to_ascii_lowercase().as_str() {
        "sans-serif" | "sans" => Family::SansSerif,
        "serif" => Family::Serif,
        "monospace" => Family::Monospace,
        "cursive" => Family::Cursive,
        "fantasy" => Family::Fantasy,
        _ => Family::Name(name),
    }
}

impl SystemFontResolver {
    /// Scan the system font directories.
    pub fn new(default_family: impl Into<String>) -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        log::debug!("font database loaded with {} faces", db.len());
        Self::with_database(db, default_family)
    }

    /// Build from an already populated database (useful with bundled fonts).
    pub fn with_database(db: Database, default_family: impl Into<String>) -> Self {
        Self {
            db,
            cache: Mutex::new(FaceCache::default()),
            fallback: None,
            default_family: default_family.into(),
        }
    }

    /// Font file used when no face matches the requested style.
    pub fn with_fallback(mut self, path: Option<PathBuf>) -> Self {
        self.fallback = path;
        self
    }

    fn load(&self, source: Source, index: u32) -> Result<FontHandle> {
        match source {
            Source::File(path) | Source::SharedFile(path, _) => self.load_path(&path, index),
            Source::Binary(data) => {
                let bytes: &[u8] = data.as_ref().as_ref();
                let face = FontFace::from_bytes(Arc::from(bytes), index as usize)?;
                Ok(FontHandle {
                    face: Arc::new(face),
                    path: None,
                })
            }
        }
    }

    fn load_path(&self, path: &Path, index: u32) -> Result<FontHandle> {
        let face = self.cache.lock().get_or_load(path, index)?;
        Ok(FontHandle {
            face,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn cached_faces(&self) -> usize {
        self.cache.lock().faces.len()
    }

    pub fn is_cached(&self, path: &Path, index: u32) -> bool {
        self.cache.lock().faces.contains_key(&(path.to_path_buf(), index))
    }
}

impl FontResolver for SystemFontResolver {
    fn resolve(&self, style: &FontStyle) -> Result<FontHandle> {
        let mut families: Vec<Family<'_>> =
            style.families.iter().map(|f| family_from_name(f)).collect();
        if families.is_empty() {
            families.push(family_from_name(&self.default_family));
        }
        let query = Query {
            families: &families,
            weight: Weight(style.weight),
            stretch: Stretch::Normal,
            style: if style.italic { Style::Italic } else { Style::Normal },
        };

        if let Some((source, index)) = self.db.query(&query).and_then(|id| self.db.face_source(id)) {
            return self.load(source, index);
        }

        let wanted = if style.families.is_empty() {
            self.default_family.clone()
        } else {
            style.families.join(", ")
        };
        match &self.fallback {
            Some(path) => {
                log::warn!("no face matches '{wanted}', using {}", path.display());
                self.load_path(path, 0)
            }
            None => Err(TextError::FontNotFound(wanted)),
        }
    }
}
