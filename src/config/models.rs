use crate::handlers::{Dimension, MediaType};
use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub thumbnail: ThumbnailConfig,
    #[serde(default)]
    pub media: MediaConfig,
}

/// Storage backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    #[default]
    Local,
    Memory,
}

/// One named storage backend ("disk" in upload terms)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub provider: BackendProvider,
    /// Root directory, only used by `local`
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from("data/media")
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_backends")]
    pub backends: BTreeMap<String, BackendConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backends: default_backends(),
        }
    }
}

fn default_backends() -> BTreeMap<String, BackendConfig> {
    BTreeMap::from([(
        "local".to_string(),
        BackendConfig {
            provider: BackendProvider::Local,
            root: default_root(),
        },
    )])
}

/// Named thumbnail size
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DimensionSpec {
    pub code: String,
    pub width: u32,
    pub height: u32,
}

impl DimensionSpec {
    pub fn new(code: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            code: code.into(),
            width,
            height,
        }
    }

    pub fn dimension(&self) -> Dimension {
        Dimension::new(self.width, self.height)
    }
}

/// Process-wide thumbnail defaults
///
/// Every field is a fallback for the matching thumbnail request argument.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ThumbnailConfig {
    #[serde(rename = "type", default = "default_thumbnail_type")]
    pub kind: String,
    #[serde(default = "default_thumbnail_path")]
    pub path: String,
    #[serde(default = "default_thumbnail_backend")]
    pub backend: String,
    /// Sizes in output order
    #[serde(default = "default_dimensions")]
    pub dimensions: Vec<DimensionSpec>,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            kind: default_thumbnail_type(),
            path: default_thumbnail_path(),
            backend: default_thumbnail_backend(),
            dimensions: default_dimensions(),
        }
    }
}

fn default_thumbnail_type() -> String {
    "fit".to_string()
}

fn default_thumbnail_path() -> String {
    "attached/thumbnails".to_string()
}

fn default_thumbnail_backend() -> String {
    "local".to_string()
}

fn default_dimensions() -> Vec<DimensionSpec> {
    vec![
        DimensionSpec::new("S", 200, 200),
        DimensionSpec::new("M", 400, 400),
        DimensionSpec::new("L", 800, 800),
        DimensionSpec::new("XL", 1500, 1500),
        DimensionSpec::new("XXL", 2000, 2000),
    ]
}

/// Handler tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    /// Largest image read into memory for thumbnailing
    #[serde(default = "default_max_picture_bytes")]
    pub max_picture_bytes: ByteSize,
    /// Accepted MIME patterns per media type, replacing the built-in lists
    #[serde(default)]
    pub mimes: BTreeMap<String, Vec<String>>,
}

impl MediaConfig {
    /// MIME override for a media type; keys compare case-insensitively
    pub fn mimes_for(&self, media_type: &str) -> Option<&[String]> {
        let wanted = MediaType::parse(media_type)?;
        self.mimes
            .iter()
            .find(|(key, _)| MediaType::parse(key).as_ref() == Some(&wanted))
            .map(|(_, patterns)| patterns.as_slice())
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_picture_bytes: default_max_picture_bytes(),
            mimes: BTreeMap::new(),
        }
    }
}

fn default_max_picture_bytes() -> ByteSize {
    ByteSize(20 * 1024 * 1024) // 20 MB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.thumbnail.kind, "fit");
        assert_eq!(config.thumbnail.backend, "local");
        assert_eq!(config.thumbnail.dimensions.len(), 5);
        assert_eq!(config.thumbnail.dimensions[0].code, "S");
        assert!(config.storage.backends.contains_key("local"));
        assert_eq!(config.media.max_picture_bytes.as_u64(), 20 * 1024 * 1024);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
[thumbnail]
type = "crop"

[[thumbnail.dimensions]]
code = "icon"
width = 32
height = 32
            "#,
        )
        .unwrap();

        assert_eq!(config.thumbnail.kind, "crop");
        assert_eq!(config.thumbnail.path, "attached/thumbnails");
        assert_eq!(config.thumbnail.dimensions, vec![DimensionSpec::new("icon", 32, 32)]);
    }

    #[test]
    fn test_mime_override_keys_ignore_case() {
        let config: Config = toml::from_str(
            r#"
[media.mimes]
Image = ["image/*"]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.media.mimes_for("image"),
            Some(&["image/*".to_string()][..])
        );
        assert!(config.media.mimes_for("video").is_none());
    }
}
