// this_file: src/layout.rs
//! Placement of wrapped quote lines and the attribution line.
//!
//! The same [`LayoutBox`] drives wrapping (through `max_width`) and placement
//! (through origin and `line_height`), so the two can never disagree.

use crate::fonts::FontSpec;
use serde::{Deserialize, Serialize};

/// Prefix drawn before the author name.
pub const ATTRIBUTION_PREFIX: &str = "– ";

/// A quotation and who said it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

impl Quote {
    pub fn new(text: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
        }
    }

    /// The author line as drawn: en dash, space, name.
    pub fn attribution(&self) -> String {
        attribution(&self.author)
    }
}

/// Format an author name as an attribution line.
pub fn attribution(author: &str) -> String {
    format!("{ATTRIBUTION_PREFIX}{author}")
}

/// Where wrapped text starts and how far apart lines are.
///
/// `origin_x` is the horizontal center of every line, `origin_y` the top of
/// the first one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutBox {
    pub origin_x: f32,
    pub origin_y: f32,
    pub max_width: f32,
    pub line_height: f32,
}

impl Default for LayoutBox {
    /// Centered on a 1080px canvas.
    fn default() -> Self {
        Self {
            origin_x: 540.0,
            origin_y: 350.0,
            max_width: 900.0,
            line_height: 60.0,
        }
    }
}

/// One run of text to paint: centered on `x`, top edge at `y`.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawInstruction {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font: FontSpec,
}

/// Output of [`plan`].
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPlan {
    /// Quote lines top to bottom, then the attribution.
    pub instructions: Vec<DrawInstruction>,
    /// First y below the last quote line.
    pub quote_bottom_y: f32,
}

/// Position wrapped `lines` and the attribution for `author`.
///
/// Line `i` sits at `origin_y + i * line_height`; the attribution sits
/// `author_gap` below the quote. When the quote is empty (one empty line)
/// that line still takes up its height but gets no instruction.
pub fn plan(
    lines: &[String],
    layout: &LayoutBox,
    quote_font: &FontSpec,
    author: &str,
    author_font: &FontSpec,
    author_gap: f32,
) -> LayoutPlan {
    let quote_is_empty = lines.iter().all(|line| trim_ascii(line).is_empty());

    let mut instructions: Vec<DrawInstruction> = lines
        .iter()
        .enumerate()
        .filter(|_| !quote_is_empty)
        .map(|(i, line)| DrawInstruction {
            text: trim_ascii(line).to_string(),
            x: layout.origin_x,
            y: layout.origin_y + i as f32 * layout.line_height,
            font: quote_font.clone(),
        })
        .collect();

    let quote_bottom_y = layout.origin_y + lines.len() as f32 * layout.line_height;

    instructions.push(DrawInstruction {
        text: attribution(author),
        x: layout.origin_x,
        y: quote_bottom_y + author_gap,
        font: author_font.clone(),
    });

    LayoutPlan {
        instructions,
        quote_bottom_y,
    }
}

/// Strip ASCII whitespace only; other spaces belong to the words.
fn trim_ascii(line: &str) -> &str {
    line.trim_matches(|c: char| c.is_ascii_whitespace())
}
