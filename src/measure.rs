// this_file: src/measure.rs
//! Text measurement capability used by wrapping and painting

use crate::error::Result;
use crate::fonts::FontSpec;

/// Returns the rendered width of a string in device pixels.
///
/// Implementations must be deterministic: the same font and string always
/// measure the same. Failures are the measurer's own and are passed through
/// by callers untouched.
pub trait TextMeasurer {
    /// Width of `text` set in `font`
    fn measure(&self, font: &FontSpec, text: &str) -> Result<f32>;
}

impl<F> TextMeasurer for F
where
    F: Fn(&FontSpec, &str) -> Result<f32>,
{
    fn measure(&self, font: &FontSpec, text: &str) -> Result<f32> {
        self(font, text)
    }
}
