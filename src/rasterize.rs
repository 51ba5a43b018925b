// this_file: src/rasterize.rs
//! CPU text painting using skrifa outlines and zeno coverage masks

use crate::compose::RasterSurface;
use crate::error::{Error, Result};
use crate::fonts::{advance_width, ascent, embolden_px, glyph_for, FontLibrary};
use crate::layout::DrawInstruction;
use image::Rgb;
use log::trace;
use skrifa::instance::{LocationRef, Size};
use skrifa::outline::{DrawSettings, OutlinePen};
use skrifa::MetadataProvider;
use zeno::{Command, Mask, Transform};

/// Paints one [`DrawInstruction`] onto a surface.
///
/// `instruction.x` is the horizontal center of the run and `instruction.y`
/// its top edge.
pub trait TextPainter {
    fn paint(
        &self,
        surface: &mut RasterSurface,
        instruction: &DrawInstruction,
        color: Rgb<u8>,
    ) -> Result<()>;
}

/// Glyph painter backed by the registered fonts.
pub struct GlyphPainter<'a> {
    fonts: &'a FontLibrary,
}

impl<'a> GlyphPainter<'a> {
    pub fn new(fonts: &'a FontLibrary) -> Self {
        Self { fonts }
    }
}

impl TextPainter for GlyphPainter<'_> {
    fn paint(
        &self,
        surface: &mut RasterSurface,
        instruction: &DrawInstruction,
        color: Rgb<u8>,
    ) -> Result<()> {
        if instruction.text.is_empty() {
            return Ok(());
        }

        let spec = &instruction.font;
        let face = self.fonts.resolve(spec).ok_or_else(|| {
            Error::Rendering(format!("No face registered for family \"{}\"", spec.family))
        })?;
        let font = face.font_ref()?;
        let size = spec.size_px as f32;
        let strength = if face.synthetic_bold {
            embolden_px(spec.size_px)
        } else {
            0
        };

        let run_width = advance_width(&font, size, &instruction.text);
        let baseline = instruction.y + ascent(&font, size);
        let mut pen_x = instruction.x - run_width / 2.0;
        trace!(
            "Painting {:?} in {} at ({:.1}, {:.1}), width {:.1}",
            instruction.text,
            spec,
            pen_x,
            baseline,
            run_width
        );

        let outlines = font.outline_glyphs();
        let metrics = font.glyph_metrics(Size::new(size), LocationRef::default());
        let mut commands = Vec::new();

        for ch in instruction.text.chars() {
            let glyph_id = glyph_for(&font, ch);
            let advance = metrics.advance_width(glyph_id).unwrap_or(0.0);

            if let Some(glyph) = outlines.get(glyph_id) {
                commands.clear();
                let settings = DrawSettings::unhinted(Size::new(size), LocationRef::default());
                glyph
                    .draw(settings, &mut ZenoPen::new(&mut commands))
                    .map_err(|e| {
                        Error::Rendering(format!(
                            "Failed to draw outline for glyph {}: {}",
                            glyph_id, e
                        ))
                    })?;

                if !commands.is_empty() {
                    let coverage = rasterize_path(&commands, pen_x, baseline, strength);
                    blend_coverage(surface, &coverage, color);
                }
            }

            pen_x += advance;
        }

        Ok(())
    }
}

/// 8-bit coverage mask positioned in surface pixels.
#[derive(Debug, Clone)]
struct Coverage {
    left: i32,
    top: i32,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// Rasterize a y-down path translated to `(x, y)`, optionally dilated
/// `strength` pixels to the right.
fn rasterize_path(commands: &[Command], x: f32, y: f32, strength: u32) -> Coverage {
    let (data, placement) = Mask::new(commands)
        .transform(Some(Transform::translation(x, y)))
        .render();

    let coverage = Coverage {
        left: placement.left,
        top: placement.top,
        width: placement.width,
        height: placement.height,
        data,
    };
    if strength == 0 {
        coverage
    } else {
        dilate_horizontal(&coverage, strength)
    }
}

/// Widen every row by taking the max over `strength + 1` pixels to the left.
fn dilate_horizontal(coverage: &Coverage, strength: u32) -> Coverage {
    let src_w = coverage.width as usize;
    let dst_w = src_w + strength as usize;
    let mut data = vec![0u8; dst_w * coverage.height as usize];

    for row in 0..coverage.height as usize {
        let src = &coverage.data[row * src_w..(row + 1) * src_w];
        let dst = &mut data[row * dst_w..(row + 1) * dst_w];
        for (x, out) in dst.iter_mut().enumerate() {
            let from = x.saturating_sub(strength as usize);
            let to = x.min(src_w.saturating_sub(1));
            if from <= to && from < src_w {
                *out = src[from..=to].iter().copied().max().unwrap_or(0);
            }
        }
    }

    Coverage {
        width: dst_w as u32,
        data,
        ..*coverage
    }
}

/// Source-over blend of `color` through a coverage mask, clipped to the surface.
fn blend_coverage(surface: &mut RasterSurface, coverage: &Coverage, color: Rgb<u8>) {
    let (surface_w, surface_h) = surface.dimensions();

    for gy in 0..coverage.height {
        let py = coverage.top + gy as i32;
        if py < 0 || py >= surface_h as i32 {
            continue;
        }
        for gx in 0..coverage.width {
            let px = coverage.left + gx as i32;
            if px < 0 || px >= surface_w as i32 {
                continue;
            }
            let alpha = coverage.data[(gy * coverage.width + gx) as usize];
            if alpha == 0 {
                continue;
            }
            let pixel = surface.get_pixel_mut(px as u32, py as u32);
            for (channel, &src) in pixel.0.iter_mut().take(3).zip(color.0.iter()) {
                *channel = blend_channel(*channel, src, alpha);
            }
        }
    }
}

/// `dst * (1 - a) + src * a` with `a = alpha / 255`, rounded.
pub(crate) fn blend_channel(dst: u8, src: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((src as u32 * a + dst as u32 * (255 - a) + 127) / 255) as u8
}

/// Adapter from skrifa's y-up outline pen to zeno's y-down commands.
struct ZenoPen<'a> {
    commands: &'a mut Vec<Command>,
}

impl<'a> ZenoPen<'a> {
    fn new(commands: &'a mut Vec<Command>) -> Self {
        Self { commands }
    }
}

impl OutlinePen for ZenoPen<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        self.commands.push(Command::MoveTo([x, -y].into()));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.commands.push(Command::LineTo([x, -y].into()));
    }

    fn quad_to(&mut self, cx0: f32, cy0: f32, x: f32, y: f32) {
        self.commands
            .push(Command::QuadTo([cx0, -cy0].into(), [x, -y].into()));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        self.commands.push(Command::CurveTo(
            [cx0, -cy0].into(),
            [cx1, -cy1].into(),
            [x, -y].into(),
        ));
    }

    fn close(&mut self) {
        self.commands.push(Command::Close);
    }
}
