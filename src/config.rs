// this_file: src/config.rs
//! Runtime configuration: JSON file, then environment overrides, then validation

use crate::compose::{CanvasSpec, OverlaySpec, QuoteStyle, RenderSettings, ResampleFilter};
use crate::error::{Error, Result};
use crate::fonts::{FontFaceConfig, FontSpec, FontWeight};
use crate::layout::{LayoutBox, Quote};
use crate::source::{SourceConfig, SourceMode};
use camino::Utf8PathBuf;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Family of the bundled face.
pub const DEFAULT_FAMILY: &str = "DejaVu Sans Mono";

/// Bundled face, relative to the working directory.
pub const DEFAULT_FONT_PATH: &str = "fonts/DejaVuSansMono.ttf";

/// Quote used when a request or invocation supplies none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteDefaults {
    pub quote: String,
    pub author: String,
}

impl Default for QuoteDefaults {
    fn default() -> Self {
        Self {
            quote: "Life is what happens when you’re busy making other plans.".to_string(),
            author: "John Lennon".to_string(),
        }
    }
}

impl QuoteDefaults {
    /// Fill in whichever parts are missing.
    pub fn quote(&self, text: Option<String>, author: Option<String>) -> Quote {
        Quote::new(
            text.unwrap_or_else(|| self.quote.clone()),
            author.unwrap_or_else(|| self.author.clone()),
        )
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// Full quotecard configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub canvas: CanvasSpec,
    pub layout: LayoutBox,
    pub quote_font: FontSpec,
    pub author_font: FontSpec,
    pub author_gap: f32,
    pub overlay: OverlaySpec,
    pub text_color: [u8; 3],
    pub resample: ResampleFilter,
    pub jpeg_quality: u8,
    pub fonts: Vec<FontFaceConfig>,
    pub defaults: QuoteDefaults,
    pub source: SourceConfig,
    pub server: ServerConfig,
    /// Where the `render` command writes its JPEG.
    pub output: Utf8PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            canvas: CanvasSpec::default(),
            layout: LayoutBox::default(),
            quote_font: FontSpec::new(DEFAULT_FAMILY, FontWeight::Bold, 48),
            author_font: FontSpec::new(DEFAULT_FAMILY, FontWeight::Regular, 36),
            author_gap: 30.0,
            overlay: OverlaySpec::default(),
            text_color: [255, 255, 255],
            resample: ResampleFilter::default(),
            jpeg_quality: 75,
            fonts: vec![FontFaceConfig {
                family: DEFAULT_FAMILY.to_string(),
                weight: FontWeight::Regular,
                path: Utf8PathBuf::from(DEFAULT_FONT_PATH),
            }],
            defaults: QuoteDefaults::default(),
            source: SourceConfig::default(),
            server: ServerConfig::default(),
            output: Utf8PathBuf::from("quote.jpg"),
        }
    }
}

impl Config {
    /// Read an optional JSON file and apply process environment overrides.
    ///
    /// Does not validate; callers apply CLI overrides first, then call
    /// [`Config::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading config: {}", path.display());
        let json = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Parse JSON; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        crate::security::validate_json_size(json)?;
        Ok(serde_json::from_str(json)?)
    }

    /// Apply `UNSPLASH_ACCESS_KEY`, `PORT` and `QUOTECARD_FALLBACK_IMAGE`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("UNSPLASH_ACCESS_KEY").filter(|k| !k.is_empty()) {
            debug!("Using Unsplash access key from environment");
            self.source.unsplash.access_key = Some(key);
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("PORT is not a valid port: {:?}", port)))?;
        }
        if let Some(path) = lookup("QUOTECARD_FALLBACK_IMAGE") {
            self.source.fallback_path = Utf8PathBuf::from(path);
        }
        Ok(())
    }

    /// Check every invariant the renderer relies on.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::Config(msg));

        if self.canvas.width == 0 || self.canvas.height == 0 {
            return fail(format!(
                "Canvas must be non-empty, got {}x{}",
                self.canvas.width, self.canvas.height
            ));
        }
        if !(self.layout.max_width > 0.0 && self.layout.max_width < self.canvas.width as f32) {
            return fail(format!(
                "layout.max_width {} must be positive and less than canvas width {}",
                self.layout.max_width, self.canvas.width
            ));
        }
        if !(self.layout.line_height > 0.0) {
            return fail("layout.line_height must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.overlay.alpha) {
            return fail(format!(
                "overlay.alpha {} must be within [0, 1]",
                self.overlay.alpha
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return fail(format!(
                "jpeg_quality {} must be within 1..=100",
                self.jpeg_quality
            ));
        }
        for font in [&self.quote_font, &self.author_font] {
            if font.size_px == 0 {
                return fail(format!("Font size for \"{}\" must be positive", font.family));
            }
        }
        if self.fonts.is_empty() {
            return fail("At least one font face must be registered".into());
        }
        if self.source.mode == SourceMode::Remote
            && self
                .source
                .unsplash
                .access_key
                .as_deref()
                .map_or(true, str::is_empty)
        {
            return fail("Missing UNSPLASH_ACCESS_KEY".into());
        }
        Ok(())
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            canvas: self.canvas,
            overlay: self.overlay,
            text_color: self.text_color,
            filter: self.resample,
        }
    }

    pub fn quote_style(&self) -> QuoteStyle {
        QuoteStyle {
            layout: self.layout,
            quote_font: self.quote_font.clone(),
            author_font: self.author_font.clone(),
            author_gap: self.author_gap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn local_config() -> Config {
        let mut config = Config::default();
        config.source.mode = SourceMode::Local;
        config
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_classic_card() {
        let config = Config::default();
        assert_eq!(config.canvas, CanvasSpec { width: 1080, height: 1080 });
        assert_eq!(config.layout.origin_x, 540.0);
        assert_eq!(config.layout.origin_y, 350.0);
        assert_eq!(config.layout.max_width, 900.0);
        assert_eq!(config.layout.line_height, 60.0);
        assert_eq!(config.quote_font, FontSpec::new(DEFAULT_FAMILY, FontWeight::Bold, 48));
        assert_eq!(config.author_font, FontSpec::new(DEFAULT_FAMILY, FontWeight::Regular, 36));
        assert_eq!(config.fonts[0].path, DEFAULT_FONT_PATH);
        assert_eq!(config.author_gap, 30.0);
        assert_eq!(config.overlay.alpha, 0.8);
        assert_eq!(config.defaults.author, "John Lennon");
        assert!(local_config().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = Config::from_json(
            r#"{"overlay": {"color": [0, 0, 0], "alpha": 0.6}, "source": {"mode": "local"}}"#,
        )
        .unwrap();
        assert_eq!(config.overlay.alpha, 0.6);
        assert_eq!(config.source.mode, SourceMode::Local);
        assert_eq!(config.source.fallback_path, "assets/fallback.png");
        assert_eq!(config.canvas.width, 1080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nested_sections_fill_missing_keys() {
        let config = Config::from_json(r#"{"layout": {"max_width": 700}, "canvas": {"height": 1350}}"#)
            .unwrap();
        assert_eq!(config.layout.max_width, 700.0);
        assert_eq!(config.layout.line_height, 60.0);
        assert_eq!(config.canvas, CanvasSpec { width: 1080, height: 1350 });
    }

    #[test]
    fn invalid_json_is_reported() {
        assert!(matches!(Config::from_json("{"), Err(Error::Json(_))));
        assert!(matches!(
            Config::from_json(r#"{"resample": "bicubic"}"#),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("UNSPLASH_ACCESS_KEY", "abc"),
                ("PORT", "8080"),
                ("QUOTECARD_FALLBACK_IMAGE", "/srv/bg.jpg"),
            ]))
            .unwrap();
        assert_eq!(config.source.unsplash.access_key.as_deref(), Some("abc"));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.source.fallback_path, "/srv/bg.jpg");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_port_is_a_config_error() {
        let mut config = Config::default();
        let result = config.apply_env(env(&[("PORT", "http")]));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn remote_mode_requires_key() {
        let err = Config::default().validate().unwrap_err();
        assert!(err.to_string().contains("UNSPLASH_ACCESS_KEY"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let cases: Vec<fn(&mut Config)> = vec![
            |c| c.canvas.width = 0,
            |c| c.layout.max_width = 1080.0,
            |c| c.layout.max_width = 0.0,
            |c| c.layout.line_height = 0.0,
            |c| c.overlay.alpha = 1.5,
            |c| c.overlay.alpha = f32::NAN,
            |c| c.jpeg_quality = 0,
            |c| c.quote_font.size_px = 0,
            |c| c.fonts.clear(),
        ];
        for (i, mutate) in cases.into_iter().enumerate() {
            let mut config = local_config();
            mutate(&mut config);
            assert!(
                matches!(config.validate(), Err(Error::Config(_))),
                "case {} should fail",
                i
            );
        }
    }

    #[test]
    fn quote_defaults_fill_gaps() {
        let defaults = QuoteDefaults::default();
        let quote = defaults.quote(Some("Hi".into()), None);
        assert_eq!(quote, Quote::new("Hi", "John Lennon"));
        let quote = defaults.quote(None, Some("Me".into()));
        assert_eq!(quote.text, defaults.quote);
        assert_eq!(quote.author, "Me");
    }
}
