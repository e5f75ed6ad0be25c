use bon::Builder;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Backend-specific write options (e.g. `content-type`, `cache-control`)
pub type BackendOptions = BTreeMap<String, String>;

/// Key partitioning handlers ("image", "video", ...)
///
/// Always lower-cased; never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MediaType(String);

impl MediaType {
    pub const IMAGE: &'static str = "image";
    pub const VIDEO: &'static str = "video";
    pub const AUDIO: &'static str = "audio";

    /// Normalize a key, returning `None` when it is blank
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase();
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    pub fn image() -> Self {
        Self(Self::IMAGE.to_string())
    }

    pub fn video() -> Self {
        Self(Self::VIDEO.to_string())
    }

    pub fn audio() -> Self {
        Self(Self::AUDIO.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for MediaType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| "media type must not be empty".to_string())
    }
}

impl From<MediaType> for String {
    fn from(value: MediaType) -> Self {
        value.0
    }
}

/// Target (or measured) width/height pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl Dimension {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimension {
    type Err = String;

    /// Parse `WIDTHxHEIGHT`, e.g. `800x600`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .trim()
            .to_lowercase()
            .split_once('x')
            .map(|(w, h)| (w.trim().parse::<u32>(), h.trim().parse::<u32>()))
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;

        match (width, height) {
            (Ok(width), Ok(height)) => Ok(Self::new(width, height)),
            _ => Err(format!("invalid dimension '{s}'")),
        }
    }
}

/// Unprocessed file descriptor as handed over by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct RawFile {
    #[builder(into)]
    pub id: String,
    #[builder(into)]
    pub mime: String,
    #[builder(into, default = "local".to_string())]
    pub backend: String,
    #[builder(into)]
    pub path: String,
    #[builder(into, default)]
    pub filename: String,
    #[builder(default)]
    pub size: u64,
    /// Id of the file this one was derived from
    #[builder(into)]
    pub origin_id: Option<String>,
    /// Size code of a derived file ("S", "M", ...)
    #[builder(into)]
    pub code: Option<String>,
    /// Pixel size of the content, when the caller knows it
    #[serde(default)]
    pub dimension: Option<Dimension>,
}

/// Per-file metadata record kept next to the stored object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub file_id: String,
    pub media_type: MediaType,
    #[serde(default)]
    pub origin_id: Option<String>,
    pub dimension: Option<Dimension>,
    pub duration_secs: Option<f64>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub extra: Value,
}

impl Metadata {
    pub fn new(file: &RawFile, media_type: MediaType) -> Self {
        Self {
            file_id: file.id.clone(),
            media_type,
            origin_id: file.origin_id.clone(),
            dimension: file.dimension,
            duration_secs: None,
            created_at: Utc::now(),
            extra: Value::Null,
        }
    }
}

/// Constructed content record
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub media_type: MediaType,
    pub file: RawFile,
    pub meta: Option<Metadata>,
    /// Raw files derived from this one (thumbnails, poster frames)
    pub derives: Vec<RawFile>,
}

impl Media {
    pub fn new(media_type: MediaType, file: RawFile) -> Self {
        Self {
            media_type,
            file,
            meta: None,
            derives: Vec::new(),
        }
    }

    pub fn with_meta(mut self, meta: Option<Metadata>) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_derives(mut self, derives: Vec<RawFile>) -> Self {
        self.derives = derives;
        self
    }

    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }

    /// Id of the original upload; derived files point back at it
    pub fn origin_key(&self) -> &str {
        self.file.origin_id.as_deref().unwrap_or(&self.file.id)
    }

    pub fn raw_derives(&self) -> &[RawFile] {
        &self.derives
    }

    pub fn meta(&self) -> Option<&Metadata> {
        self.meta.as_ref()
    }

    /// Recorded pixel size, falling back to what the file descriptor says
    pub fn dimension(&self) -> Option<Dimension> {
        self.meta
            .as_ref()
            .and_then(|m| m.dimension)
            .or(self.file.dimension)
    }
}

/// Renderable content a thumbnail can be produced from
#[derive(Debug, Clone)]
pub struct Picture {
    pub bytes: Bytes,
    pub mime: String,
    pub dimension: Option<Dimension>,
}

/// Derived image tagged with its size code
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub code: String,
    pub media: Media,
}

impl Thumbnail {
    pub fn file(&self) -> &RawFile {
        &self.media.file
    }
}
