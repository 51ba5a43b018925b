// this_file: src/source.rs
//! Background photo acquisition.
//!
//! An [`ImageSource`] hands back raw or decoded photo data; decoding of raw
//! bytes is deferred to the compositor. Deployments pick a strategy by
//! configuration: Unsplash with a local fallback, or the local file alone.

use crate::error::{Error, Result};
use crate::logging::Timer;
use crate::security::validate_source_size;
use camino::Utf8PathBuf;
use image::DynamicImage;
use log::{debug, info, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Photo data handed to the compositor.
#[derive(Debug, Clone)]
pub enum SourceImage {
    /// Undecoded file or HTTP body, with where it came from.
    Encoded { bytes: Vec<u8>, origin: String },
    /// Already decoded raster.
    Decoded(DynamicImage),
}

impl SourceImage {
    pub fn from_bytes(bytes: Vec<u8>, origin: impl Into<String>) -> Self {
        SourceImage::Encoded {
            bytes,
            origin: origin.into(),
        }
    }

    /// Where the photo came from, for logs.
    pub fn origin(&self) -> &str {
        match self {
            SourceImage::Encoded { origin, .. } => origin,
            SourceImage::Decoded(_) => "decoded image",
        }
    }

    /// Decode if needed; borrows when already decoded.
    pub fn decode(&self) -> Result<Cow<'_, DynamicImage>> {
        match self {
            SourceImage::Decoded(image) => Ok(Cow::Borrowed(image)),
            SourceImage::Encoded { bytes, origin } => image::load_from_memory(bytes)
                .map(Cow::Owned)
                .map_err(|e| Error::ImageDecode(format!("{}: {}", origin, e))),
        }
    }
}

/// Something that can produce a background photo.
pub trait ImageSource: Send + Sync {
    fn fetch(&self) -> Result<SourceImage>;

    /// Short human-readable name for logs.
    fn describe(&self) -> String;
}

/// Which acquisition strategy to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    #[default]
    Remote,
    Local,
}

/// Unsplash random-photo settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnsplashConfig {
    #[serde(skip_serializing)]
    pub access_key: Option<String>,
    pub api_base: String,
    pub query: String,
    pub orientation: String,
    pub timeout_ms: u64,
}

impl Default for UnsplashConfig {
    fn default() -> Self {
        Self {
            access_key: None,
            api_base: "https://api.unsplash.com".to_string(),
            query: "nature".to_string(),
            orientation: "squarish".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Source selection and settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub mode: SourceMode,
    pub fallback_path: Utf8PathBuf,
    pub unsplash: UnsplashConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::Remote,
            fallback_path: Utf8PathBuf::from("assets/fallback.png"),
            unsplash: UnsplashConfig::default(),
        }
    }
}

/// Build the configured strategy.
pub fn build_source(config: &SourceConfig) -> Result<Box<dyn ImageSource>> {
    let local = LocalImageSource::new(config.fallback_path.as_std_path());
    match config.mode {
        SourceMode::Local => Ok(Box::new(local)),
        SourceMode::Remote => {
            let remote = UnsplashImageSource::new(&config.unsplash)?;
            Ok(Box::new(FallbackImageSource::new(
                Box::new(remote),
                Box::new(local),
            )))
        }
    }
}

/// Reads a photo from disk.
#[derive(Debug, Clone)]
pub struct LocalImageSource {
    path: PathBuf,
}

impl LocalImageSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ImageSource for LocalImageSource {
    fn fetch(&self) -> Result<SourceImage> {
        let display = self.path.display();
        let meta = fs::metadata(&self.path)
            .map_err(|e| Error::Acquisition(format!("Cannot read {}: {}", display, e)))?;
        validate_source_size(meta.len())?;
        let bytes = fs::read(&self.path)
            .map_err(|e| Error::Acquisition(format!("Cannot read {}: {}", display, e)))?;
        debug!("Read {} bytes from {}", bytes.len(), display);
        Ok(SourceImage::from_bytes(bytes, display.to_string()))
    }

    fn describe(&self) -> String {
        format!("local file {}", self.path.display())
    }
}

#[derive(Debug, Deserialize)]
struct RandomPhoto {
    urls: Option<PhotoUrls>,
}

#[derive(Debug, Deserialize)]
struct PhotoUrls {
    regular: Option<String>,
}

/// Pull `urls.regular` out of a random-photo response body.
fn image_url_from_response(body: &str) -> Result<String> {
    let photo: RandomPhoto = serde_json::from_str(body)
        .map_err(|e| Error::Acquisition(format!("Unexpected Unsplash response: {}", e)))?;
    photo
        .urls
        .and_then(|urls| urls.regular)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| Error::Acquisition("Could not get image from Unsplash".into()))
}

/// Fetches a random photo from the Unsplash API.
pub struct UnsplashImageSource {
    client: Client,
    endpoint: Url,
}

impl UnsplashImageSource {
    /// Fails with [`Error::Config`] when no access key is configured.
    pub fn new(config: &UnsplashConfig) -> Result<Self> {
        let access_key = config
            .access_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::Config("Missing UNSPLASH_ACCESS_KEY".into()))?;

        let endpoint = Url::parse_with_params(
            &format!("{}/photos/random", config.api_base.trim_end_matches('/')),
            &[
                ("query", config.query.as_str()),
                ("orientation", config.orientation.as_str()),
                ("client_id", access_key),
            ],
        )
        .map_err(|e| Error::Config(format!("Invalid Unsplash API base: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("quotecard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Acquisition(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::Acquisition(format!("Request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Acquisition(format!(
                "Unsplash request returned {}",
                status
            )));
        }
        Ok(response)
    }
}

impl ImageSource for UnsplashImageSource {
    fn fetch(&self) -> Result<SourceImage> {
        let _timer = Timer::new("unsplash fetch");

        let body = self
            .get(self.endpoint.as_str())?
            .text()
            .map_err(|e| Error::Acquisition(format!("Failed to read response: {}", e)))?;
        let image_url = image_url_from_response(&body)?;
        debug!("Downloading photo {}", image_url);

        let response = self.get(&image_url)?;
        if let Some(length) = response.content_length() {
            validate_source_size(length)?;
        }
        let bytes = response
            .bytes()
            .map_err(|e| Error::Acquisition(format!("Failed to download photo: {}", e)))?;
        validate_source_size(bytes.len() as u64)?;

        info!("Fetched {} byte photo from Unsplash", bytes.len());
        Ok(SourceImage::from_bytes(bytes.to_vec(), image_url))
    }

    fn describe(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or("unsplash");
        format!("unsplash ({})", host)
    }
}

/// Tries `primary`, falling back when acquisition fails.
pub struct FallbackImageSource {
    primary: Box<dyn ImageSource>,
    fallback: Box<dyn ImageSource>,
}

impl FallbackImageSource {
    pub fn new(primary: Box<dyn ImageSource>, fallback: Box<dyn ImageSource>) -> Self {
        Self { primary, fallback }
    }
}

impl ImageSource for FallbackImageSource {
    fn fetch(&self) -> Result<SourceImage> {
        match self.primary.fetch() {
            Err(Error::Acquisition(reason)) => {
                warn!(
                    "{} failed ({}), using {}",
                    self.primary.describe(),
                    reason,
                    self.fallback.describe()
                );
                self.fallback.fetch()
            }
            other => other,
        }
    }

    fn describe(&self) -> String {
        format!(
            "{} with fallback to {}",
            self.primary.describe(),
            self.fallback.describe()
        )
    }
}
