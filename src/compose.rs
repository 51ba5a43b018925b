// this_file: src/compose.rs
//! Quote card composition.
//!
//! [`Compositor::render`] runs the fixed draw sequence: the source photo
//! stretched to the canvas, a translucent overlay across the whole canvas,
//! then each text instruction in order. [`QuoteRenderer`] ties wrapping,
//! layout and rendering together behind a single call.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fonts::{FontLibrary, FontSpec};
use crate::layout::{plan, DrawInstruction, LayoutBox, LayoutPlan, Quote};
use crate::logging::Timer;
use crate::measure::TextMeasurer;
use crate::rasterize::{blend_channel, GlyphPainter, TextPainter};
use crate::source::SourceImage;
use crate::wrap::LineWrapper;
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, Rgba, RgbaImage};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// In-memory RGBA canvas. Always fully opaque once rendered.
pub type RasterSurface = RgbaImage;

/// Output canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSpec {
    pub width: u32,
    pub height: u32,
}

impl Default for CanvasSpec {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1080,
        }
    }
}

/// Solid color laid over the photo so white text stays legible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySpec {
    pub color: [u8; 3],
    /// Opacity in `[0, 1]`.
    pub alpha: f32,
}

impl Default for OverlaySpec {
    fn default() -> Self {
        Self {
            color: [0, 0, 0],
            alpha: 0.8,
        }
    }
}

impl OverlaySpec {
    fn alpha_u8(&self) -> u8 {
        (self.alpha.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

/// Resampling filter for stretching the background.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(filter: ResampleFilter) -> Self {
        match filter {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Everything [`Compositor::render`] needs besides the photo and the text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    pub canvas: CanvasSpec,
    pub overlay: OverlaySpec,
    pub text_color: [u8; 3],
    pub filter: ResampleFilter,
}

/// Runs the draw sequence with a given text painter.
pub struct Compositor<'a, P: TextPainter + ?Sized> {
    painter: &'a P,
    settings: &'a RenderSettings,
}

impl<'a, P: TextPainter + ?Sized> Compositor<'a, P> {
    pub fn new(painter: &'a P, settings: &'a RenderSettings) -> Self {
        Self { painter, settings }
    }

    /// Render one card. Allocates a fresh surface per call.
    ///
    /// An undecodable source fails with [`Error::ImageDecode`] before any
    /// surface exists.
    pub fn render(
        &self,
        source: &SourceImage,
        instructions: &[DrawInstruction],
    ) -> Result<RasterSurface> {
        let decoded = source.decode()?;
        let mut surface = draw_background(&decoded, self.settings.canvas, self.settings.filter);
        apply_overlay(&mut surface, &self.settings.overlay);

        let color = Rgb(self.settings.text_color);
        for instruction in instructions {
            self.painter.paint(&mut surface, instruction, color)?;
        }
        Ok(surface)
    }
}

/// Stretch `image` to exactly fill the canvas, flattened onto black.
fn draw_background(image: &DynamicImage, canvas: CanvasSpec, filter: ResampleFilter) -> RasterSurface {
    let rgba = image.to_rgba8();
    let mut surface = if rgba.dimensions() == (canvas.width, canvas.height) {
        rgba
    } else {
        imageops::resize(&rgba, canvas.width, canvas.height, filter.into())
    };

    for pixel in surface.pixels_mut() {
        let alpha = pixel[3];
        if alpha != 255 {
            for channel in pixel.0.iter_mut().take(3) {
                *channel = blend_channel(0, *channel, alpha);
            }
            pixel[3] = 255;
        }
    }
    surface
}

/// Blend the overlay color over every pixel.
fn apply_overlay(surface: &mut RasterSurface, overlay: &OverlaySpec) {
    let alpha = overlay.alpha_u8();
    if alpha == 0 {
        return;
    }
    for pixel in surface.pixels_mut() {
        let Rgba([r, g, b, _]) = *pixel;
        *pixel = Rgba([
            blend_channel(r, overlay.color[0], alpha),
            blend_channel(g, overlay.color[1], alpha),
            blend_channel(b, overlay.color[2], alpha),
            255,
        ]);
    }
}

/// Fonts and spacing for the quote and its attribution.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteStyle {
    pub layout: LayoutBox,
    pub quote_font: FontSpec,
    pub author_font: FontSpec,
    pub author_gap: f32,
}

/// A rendered card plus the layout that produced it.
#[derive(Debug, Clone)]
pub struct Composition {
    pub surface: RasterSurface,
    pub plan: LayoutPlan,
    pub lines: Vec<String>,
}

/// Wraps, lays out and renders quotes with one shared font library.
///
/// Holds no mutable state; one instance can serve concurrent renders.
pub struct QuoteRenderer {
    fonts: Arc<FontLibrary>,
    settings: RenderSettings,
    style: QuoteStyle,
}

impl QuoteRenderer {
    /// Build a renderer, rejecting layouts that leave no horizontal margin.
    pub fn new(fonts: Arc<FontLibrary>, settings: RenderSettings, style: QuoteStyle) -> Result<Self> {
        if !(style.layout.max_width > 0.0 && style.layout.max_width < settings.canvas.width as f32) {
            return Err(Error::Config(format!(
                "Layout max_width {} must be positive and narrower than the canvas ({})",
                style.layout.max_width, settings.canvas.width
            )));
        }
        if style.layout.line_height <= 0.0 {
            return Err(Error::Config("Layout line_height must be positive".into()));
        }
        Ok(Self {
            fonts,
            settings,
            style,
        })
    }

    /// Load the configured fonts and build a renderer.
    pub fn from_config(config: &Config) -> Result<Self> {
        let fonts = FontLibrary::load(&config.fonts)?;
        for spec in [&config.quote_font, &config.author_font] {
            if fonts.resolve(spec).is_none() {
                return Err(Error::Config(format!(
                    "No registered font face for {}",
                    spec
                )));
            }
        }
        Self::new(Arc::new(fonts), config.render_settings(), config.quote_style())
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn style(&self) -> &QuoteStyle {
        &self.style
    }

    /// Wrap the quote and place it and the attribution.
    pub fn layout(&self, quote: &Quote) -> Result<(Vec<String>, LayoutPlan)> {
        layout_quote(self.fonts.as_ref(), &self.style, quote)
    }

    /// Compose a card and return only the surface.
    pub fn compose_quote_image(&self, quote: &Quote, source: &SourceImage) -> Result<RasterSurface> {
        self.compose(quote, source).map(|c| c.surface)
    }

    /// Compose a card, keeping the layout for reporting.
    pub fn compose(&self, quote: &Quote, source: &SourceImage) -> Result<Composition> {
        let _timer = Timer::new("compose quote image");
        crate::security::validate_quote_input(&quote.text, &quote.author)?;

        let (lines, plan) = self.layout(quote)?;
        debug!(
            "Quote wrapped into {} line(s), bottom at y={}",
            lines.len(),
            plan.quote_bottom_y
        );

        let painter = GlyphPainter::new(&self.fonts);
        let surface = Compositor::new(&painter, &self.settings).render(source, &plan.instructions)?;
        info!(
            "Rendered {}x{} card from {}",
            surface.width(),
            surface.height(),
            source.origin()
        );

        Ok(Composition {
            surface,
            plan,
            lines,
        })
    }
}

/// Wrap and plan a quote with any measurer.
pub fn layout_quote<M: TextMeasurer + ?Sized>(
    measurer: &M,
    style: &QuoteStyle,
    quote: &Quote,
) -> Result<(Vec<String>, LayoutPlan)> {
    let lines = LineWrapper::new(measurer, &style.quote_font, style.layout.max_width).wrap(&quote.text)?;
    let plan = plan(
        &lines,
        &style.layout,
        &style.quote_font,
        &quote.author,
        &style.author_font,
        style.author_gap,
    );
    Ok((lines, plan))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FontWeight;
    use std::cell::RefCell;

    /// Fills a 1px-tall bar as wide as the text, 10px per char, centered on x.
    struct BarPainter {
        painted: RefCell<Vec<String>>,
    }

    impl BarPainter {
        fn new() -> Self {
            Self {
                painted: RefCell::new(Vec::new()),
            }
        }
    }

    impl TextPainter for BarPainter {
        fn paint(
            &self,
            surface: &mut RasterSurface,
            instruction: &DrawInstruction,
            color: Rgb<u8>,
        ) -> Result<()> {
            self.painted.borrow_mut().push(instruction.text.clone());
            let width = instruction.text.chars().count() as f32 * 10.0;
            let start = (instruction.x - width / 2.0).max(0.0) as u32;
            let end = ((instruction.x + width / 2.0) as u32).min(surface.width());
            let y = instruction.y as u32;
            if y < surface.height() {
                for x in start..end {
                    surface.put_pixel(x, y, Rgba([color[0], color[1], color[2], 255]));
                }
            }
            Ok(())
        }
    }

    fn settings(alpha: f32) -> RenderSettings {
        RenderSettings {
            canvas: CanvasSpec {
                width: 64,
                height: 48,
            },
            overlay: OverlaySpec {
                color: [0, 0, 0],
                alpha,
            },
            text_color: [255, 255, 255],
            filter: ResampleFilter::Triangle,
        }
    }

    fn solid_source(width: u32, height: u32, color: [u8; 4]) -> SourceImage {
        SourceImage::Decoded(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            width,
            height,
            Rgba(color),
        )))
    }

    fn instruction(text: &str, x: f32, y: f32) -> DrawInstruction {
        DrawInstruction {
            text: text.into(),
            x,
            y,
            font: FontSpec::new("Mono", FontWeight::Regular, 10),
        }
    }

    #[test]
    fn background_is_stretched_to_canvas() {
        let painter = BarPainter::new();
        let settings = settings(0.0);
        let surface = Compositor::new(&painter, &settings)
            .render(&solid_source(7, 300, [10, 120, 200, 255]), &[])
            .unwrap();
        assert_eq!(surface.dimensions(), (64, 48));
        assert_eq!(surface.get_pixel(0, 0), &Rgba([10, 120, 200, 255]));
        assert_eq!(surface.get_pixel(63, 47), &Rgba([10, 120, 200, 255]));
    }

    #[test]
    fn overlay_darkens_every_pixel() {
        let painter = BarPainter::new();
        let settings = settings(0.8);
        let surface = Compositor::new(&painter, &settings)
            .render(&solid_source(64, 48, [200, 100, 50, 255]), &[])
            .unwrap();
        // alpha 0.8 -> 204/255, so 51/255 of the photo survives
        assert_eq!(surface.get_pixel(10, 10), &Rgba([40, 20, 10, 255]));
        assert!(surface.pixels().all(|p| p == surface.get_pixel(0, 0)));
    }

    #[test]
    fn transparent_source_flattens_onto_black() {
        let painter = BarPainter::new();
        let settings = settings(0.0);
        let surface = Compositor::new(&painter, &settings)
            .render(&solid_source(64, 48, [255, 255, 255, 0]), &[])
            .unwrap();
        assert_eq!(surface.get_pixel(5, 5), &Rgba([0, 0, 0, 255]));

        let surface = Compositor::new(&painter, &settings)
            .render(&solid_source(64, 48, [200, 100, 50, 128]), &[])
            .unwrap();
        assert_eq!(surface.get_pixel(5, 5), &Rgba([100, 50, 25, 255]));
    }

    #[test]
    fn text_is_drawn_over_overlay_in_order() {
        let painter = BarPainter::new();
        let settings = settings(1.0);
        let instructions = vec![instruction("ab", 32.0, 5.0), instruction("– x", 32.0, 20.0)];
        let surface = Compositor::new(&painter, &settings)
            .render(&solid_source(64, 48, [90, 90, 90, 255]), &instructions)
            .unwrap();

        assert_eq!(*painter.painted.borrow(), vec!["ab".to_string(), "– x".to_string()]);
        assert_eq!(surface.get_pixel(32, 5), &Rgba([255, 255, 255, 255]));
        assert_eq!(surface.get_pixel(32, 6), &Rgba([0, 0, 0, 255]));
        assert_eq!(surface.get_pixel(20, 20), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn rendering_is_deterministic() {
        let painter = BarPainter::new();
        let settings = settings(0.6);
        let mut photo = RgbaImage::new(50, 30);
        for (x, y, pixel) in photo.enumerate_pixels_mut() {
            *pixel = Rgba([(x * 5) as u8, (y * 8) as u8, ((x + y) * 3) as u8, 255]);
        }
        let source = SourceImage::Decoded(DynamicImage::ImageRgba8(photo));
        let instructions = vec![instruction("hello", 32.0, 10.0)];

        let compositor = Compositor::new(&painter, &settings);
        let first = compositor.render(&source, &instructions).unwrap();
        let second = compositor.render(&source, &instructions).unwrap();
        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn undecodable_source_fails_before_painting() {
        let painter = BarPainter::new();
        let settings = settings(0.8);
        let source = SourceImage::from_bytes(b"definitely not a jpeg".to_vec(), "test");
        let result = Compositor::new(&painter, &settings).render(&source, &[instruction("x", 1.0, 1.0)]);
        assert!(matches!(result, Err(Error::ImageDecode(_))));
        assert!(painter.painted.borrow().is_empty());
    }

    #[test]
    fn layout_quote_places_three_lines_and_author() {
        let style = QuoteStyle {
            layout: LayoutBox {
                origin_x: 540.0,
                origin_y: 350.0,
                max_width: 120.0,
                line_height: 60.0,
            },
            quote_font: FontSpec::new("Mono", FontWeight::Bold, 10),
            author_font: FontSpec::new("Mono", FontWeight::Regular, 8),
            author_gap: 30.0,
        };
        let measurer = |spec: &FontSpec, text: &str| -> Result<f32> {
            Ok(text.chars().count() as f32 * spec.size_px as f32)
        };
        let quote = Quote::new("alpha beta gamma delta epsilon", "Greek");

        let (lines, plan) = layout_quote(&measurer, &style, &quote).unwrap();
        assert_eq!(lines, vec!["alpha beta", "gamma delta", "epsilon"]);

        let placed: Vec<(&str, f32)> = plan
            .instructions
            .iter()
            .map(|i| (i.text.as_str(), i.y))
            .collect();
        assert_eq!(
            placed,
            vec![
                ("alpha beta", 350.0),
                ("gamma delta", 410.0),
                ("epsilon", 470.0),
                ("– Greek", 560.0),
            ]
        );
        assert_eq!(plan.instructions[3].font, style.author_font);
    }

    #[test]
    fn renderer_rejects_layout_wider_than_canvas() {
        let style = QuoteStyle {
            layout: LayoutBox {
                origin_x: 32.0,
                origin_y: 0.0,
                max_width: 64.0,
                line_height: 10.0,
            },
            quote_font: FontSpec::new("Mono", FontWeight::Bold, 10),
            author_font: FontSpec::new("Mono", FontWeight::Regular, 8),
            author_gap: 5.0,
        };
        let result = QuoteRenderer::new(Arc::new(FontLibrary::new()), settings(0.5), style);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
