// this_file: src/font_loader.rs
//! Font file loading and validation

use crate::error::{Error, Result};
use log::{debug, info};
use read_fonts::{FileRef, FontRef};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Reads font files once and hands out shared byte buffers.
///
/// Two registrations pointing at the same file share one buffer.
pub struct FontLoader {
    cache: HashMap<PathBuf, Arc<Vec<u8>>>,
}

impl FontLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }

    /// Load and validate font data from a file path
    pub fn load_font_data<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<Vec<u8>>> {
        let path = path.as_ref();
        let canonical_path = path.canonicalize().map_err(|e| {
            Error::Font(format!("Failed to resolve path {}: {}", path.display(), e))
        })?;

        if let Some(data) = self.cache.get(&canonical_path) {
            debug!("Using cached font: {}", canonical_path.display());
            return Ok(Arc::clone(data));
        }

        let meta = fs::metadata(&canonical_path).map_err(|e| {
            Error::Font(format!(
                "Failed to stat font file {}: {}",
                canonical_path.display(),
                e
            ))
        })?;
        crate::security::validate_font_size(meta.len())?;

        info!("Loading font: {}", canonical_path.display());
        let data = fs::read(&canonical_path).map_err(|e| {
            Error::Font(format!(
                "Failed to read font file {}: {}",
                canonical_path.display(),
                e
            ))
        })?;

        if data.is_empty() {
            return Err(Error::Font("Font file is empty".into()));
        }

        if !is_valid_font_signature(&data) {
            return Err(Error::Font(
                "Invalid font file format (expected TTF/OTF/TTC)".into(),
            ));
        }

        first_face(&data)?;

        let data = Arc::new(data);
        self.cache.insert(canonical_path, Arc::clone(&data));
        Ok(data)
    }

    /// Number of distinct files loaded so far
    pub fn cache_count(&self) -> usize {
        self.cache.len()
    }
}

impl Default for FontLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the first face of a font file or collection.
pub fn first_face(data: &[u8]) -> Result<FontRef<'_>> {
    let file = FileRef::new(data)
        .map_err(|e| Error::Font(format!("Failed to parse font: {}", e)))?;
    match file {
        FileRef::Font(font) => Ok(font),
        FileRef::Collection(collection) => collection
            .get(0)
            .map_err(|e| Error::Font(format!("Failed to get font from collection: {}", e))),
    }
}

/// Check for a TrueType, OpenType or collection signature.
fn is_valid_font_signature(data: &[u8]) -> bool {
    if data.len() < 4 {
        return false;
    }
    matches!(&data[0..4], b"\x00\x01\x00\x00" | b"OTTO" | b"ttcf" | b"true")
}
