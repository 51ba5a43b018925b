// this_file: src/fonts.rs

//! Font registry, face resolution and advance-width measurement.
//!
//! Faces are read once at startup into a [`FontLibrary`] and never mutated
//! afterwards, so one library can be shared by any number of concurrent
//! renders. Measurement sums skrifa's scaled horizontal advances, which is
//! exactly what the glyph painter uses to place glyphs, so a wrapped line
//! paints as wide as it measured.

use crate::error::{Error, Result};
use crate::font_loader::{first_face, FontLoader};
use crate::measure::TextMeasurer;
use camino::Utf8PathBuf;
use log::{debug, info};
use read_fonts::types::GlyphId;
use read_fonts::FontRef;
use serde::{Deserialize, Serialize};
use skrifa::instance::{LocationRef, Size};
use skrifa::MetadataProvider;
use std::fmt;
use std::sync::Arc;

/// Font weight requested by a [`FontSpec`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Regular,
    Bold,
}

impl fmt::Display for FontWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontWeight::Regular => write!(f, "regular"),
            FontWeight::Bold => write!(f, "bold"),
        }
    }
}

/// Family, weight and pixel size of a run of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontSpec {
    pub family: String,
    #[serde(default)]
    pub weight: FontWeight,
    pub size_px: u32,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, weight: FontWeight, size_px: u32) -> Self {
        Self {
            family: family.into(),
            weight,
            size_px,
        }
    }
}

impl fmt::Display for FontSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}px \"{}\"", self.weight, self.size_px, self.family)
    }
}

/// One font file registered under a family and weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontFaceConfig {
    pub family: String,
    #[serde(default)]
    pub weight: FontWeight,
    pub path: Utf8PathBuf,
}

struct RegisteredFace {
    family: String,
    weight: FontWeight,
    data: Arc<Vec<u8>>,
}

/// A face picked for a [`FontSpec`].
pub struct ResolvedFace<'a> {
    data: &'a [u8],
    /// Bold was requested but only a lighter face of the family exists.
    pub synthetic_bold: bool,
}

impl<'a> ResolvedFace<'a> {
    /// Parse the face. Cheap: only the table directory is read.
    pub fn font_ref(&self) -> Result<FontRef<'a>> {
        first_face(self.data)
    }
}

/// Immutable set of faces available to measurement and painting.
#[derive(Default)]
pub struct FontLibrary {
    faces: Vec<RegisteredFace>,
}

impl FontLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every configured face from disk.
    pub fn load(configs: &[FontFaceConfig]) -> Result<Self> {
        let mut loader = FontLoader::new();
        let mut library = Self::new();
        for config in configs {
            let data = loader.load_font_data(config.path.as_std_path())?;
            library.register(config.family.clone(), config.weight, data)?;
        }
        info!(
            "Registered {} font face(s) from {} file(s)",
            library.len(),
            loader.cache_count()
        );
        Ok(library)
    }

    /// Register an in-memory face.
    pub fn register(
        &mut self,
        family: impl Into<String>,
        weight: FontWeight,
        data: Arc<Vec<u8>>,
    ) -> Result<()> {
        first_face(&data)?;
        let family = family.into();
        debug!("Registered face \"{}\" {}", family, weight);
        self.faces.retain(|f| !(f.family.eq_ignore_ascii_case(&family) && f.weight == weight));
        self.faces.push(RegisteredFace {
            family,
            weight,
            data,
        });
        Ok(())
    }

    /// Number of registered faces
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Pick the face for a spec, or `None` when the family is unknown.
    pub fn resolve(&self, spec: &FontSpec) -> Option<ResolvedFace<'_>> {
        let keys = self.faces.iter().map(|f| (f.family.as_str(), f.weight));
        let (index, synthetic_bold) = pick_face(keys, spec)?;
        Some(ResolvedFace {
            data: &self.faces[index].data,
            synthetic_bold,
        })
    }
}

impl fmt::Debug for FontLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.faces.iter().map(|face| (&face.family, face.weight)))
            .finish()
    }
}

impl TextMeasurer for FontLibrary {
    fn measure(&self, font: &FontSpec, text: &str) -> Result<f32> {
        let face = self.resolve(font).ok_or_else(|| {
            Error::Measurement(format!("No face registered for family \"{}\"", font.family))
        })?;
        let font_ref = face
            .font_ref()
            .map_err(|e| Error::Measurement(e.to_string()))?;
        Ok(advance_width(&font_ref, font.size_px as f32, text))
    }
}

/// Exact family+weight first, then any weight of the family. The flag is
/// set when bold was asked for and only a regular face was found.
fn pick_face<'a, I>(faces: I, spec: &FontSpec) -> Option<(usize, bool)>
where
    I: Iterator<Item = (&'a str, FontWeight)> + Clone,
{
    let same_family = |name: &str| name.eq_ignore_ascii_case(&spec.family);

    if let Some(index) = faces
        .clone()
        .position(|(name, weight)| same_family(name) && weight == spec.weight)
    {
        return Some((index, false));
    }

    let (index, (_, weight)) = faces
        .enumerate()
        .find(|(_, (name, _))| same_family(*name))?;
    let synthetic_bold = spec.weight == FontWeight::Bold && weight == FontWeight::Regular;
    debug!(
        "No exact face for {}, using {} face{}",
        spec,
        weight,
        if synthetic_bold { " with synthetic bold" } else { "" }
    );
    Some((index, synthetic_bold))
}

/// Horizontal dilation, in pixels, applied to synthetically emboldened glyphs.
pub fn embolden_px(size_px: u32) -> u32 {
    ((size_px as f32) / 24.0).round().max(1.0) as u32
}

/// Glyph id for a character, `.notdef` when unmapped.
pub fn glyph_for(font: &FontRef, ch: char) -> GlyphId {
    font.charmap().map(ch).unwrap_or(GlyphId::NOTDEF)
}

/// Sum of scaled horizontal advances for `text` at `size_px`.
pub fn advance_width(font: &FontRef, size_px: f32, text: &str) -> f32 {
    let metrics = font.glyph_metrics(Size::new(size_px), LocationRef::default());
    text.chars()
        .map(|ch| metrics.advance_width(glyph_for(font, ch)).unwrap_or(0.0))
        .sum()
}

/// Scaled ascent at `size_px`: distance from the top anchor to the baseline.
pub fn ascent(font: &FontRef, size_px: f32) -> f32 {
    font.metrics(Size::new(size_px), LocationRef::default()).ascent
}
