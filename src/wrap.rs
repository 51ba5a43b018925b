// this_file: src/wrap.rs
//! Greedy word wrapping under a measured-width limit

use crate::error::Result;
use crate::fonts::FontSpec;
use crate::measure::TextMeasurer;
use log::trace;

/// Split `text` into lines no wider than `max_width`.
///
/// Words are separated by runs of ASCII whitespace; other spaces, such as
/// U+00A0, stay inside their word. Each word is tried against
/// the current line with one trailing space appended; if that candidate is
/// too wide and the line already holds something, the line is committed and
/// the word starts a new one. A word that is too wide on its own still gets
/// its own line.
///
/// Always returns at least one line; empty input gives `[""]`. Errors come
/// only from `measure` and are returned as-is.
pub fn wrap_text<F, E>(
    text: &str,
    max_width: f32,
    mut measure: F,
) -> std::result::Result<Vec<String>, E>
where
    F: FnMut(&str) -> std::result::Result<f32, E>,
{
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_ascii_whitespace() {
        let candidate = format!("{line}{word} ");
        if !line.is_empty() && measure(&candidate)? > max_width {
            lines.push(line.trim_end_matches(' ').to_string());
            line = format!("{word} ");
        } else {
            line = candidate;
        }
    }
    lines.push(line.trim_end_matches(' ').to_string());

    trace!("Wrapped {} chars into {} line(s)", text.len(), lines.len());
    Ok(lines)
}

/// Wraps text in one font through a [`TextMeasurer`].
pub struct LineWrapper<'a, M: TextMeasurer + ?Sized> {
    measurer: &'a M,
    font: &'a FontSpec,
    max_width: f32,
}

impl<'a, M: TextMeasurer + ?Sized> LineWrapper<'a, M> {
    pub fn new(measurer: &'a M, font: &'a FontSpec, max_width: f32) -> Self {
        Self {
            measurer,
            font,
            max_width,
        }
    }

    /// Wrap `text`; see [`wrap_text`].
    pub fn wrap(&self, text: &str) -> Result<Vec<String>> {
        wrap_text(text, self.max_width, |candidate| {
            self.measurer.measure(self.font, candidate)
        })
    }
}
