//! Argument-over-default resolution for thumbnail settings

use super::models::{DimensionSpec, ThumbnailConfig};
use crate::handlers::BackendOptions;

/// Caller overrides for one thumbnail run; `None` (or blank) falls back
#[derive(Debug, Clone, Default)]
pub struct ThumbnailRequest {
    pub kind: Option<String>,
    pub dimensions: Option<Vec<DimensionSpec>>,
    pub path: Option<String>,
    pub backend: Option<String>,
    pub options: BackendOptions,
}

impl ThumbnailRequest {
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn dimensions(mut self, dimensions: Vec<DimensionSpec>) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Fully resolved thumbnail settings
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedThumbnail {
    /// Lower-cased command type
    pub kind: String,
    pub path: String,
    pub backend: String,
    pub dimensions: Vec<DimensionSpec>,
    pub options: BackendOptions,
}

fn pick(value: Option<&str>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

/// Resolve each setting independently: explicit value, else default
pub fn resolve_thumbnail(request: &ThumbnailRequest, defaults: &ThumbnailConfig) -> ResolvedThumbnail {
    let dimensions = match &request.dimensions {
        Some(dims) if !dims.is_empty() => dims.clone(),
        _ => defaults.dimensions.clone(),
    };

    ResolvedThumbnail {
        kind: pick(request.kind.as_deref(), &defaults.kind).to_lowercase(),
        path: pick(request.path.as_deref(), &defaults.path),
        backend: pick(request.backend.as_deref(), &defaults.backend),
        dimensions,
        options: request.options.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_defaults() {
        let defaults = ThumbnailConfig::default();
        let resolved = resolve_thumbnail(&ThumbnailRequest::default(), &defaults);

        assert_eq!(resolved.kind, "fit");
        assert_eq!(resolved.path, defaults.path);
        assert_eq!(resolved.backend, "local");
        assert_eq!(resolved.dimensions, defaults.dimensions);
        assert!(resolved.options.is_empty());
    }

    #[test]
    fn test_each_field_overrides_independently() {
        let defaults = ThumbnailConfig::default();
        let request = ThumbnailRequest::default()
            .kind("CROP")
            .backend("archive")
            .option("cache-control", "public");
        let resolved = resolve_thumbnail(&request, &defaults);

        assert_eq!(resolved.kind, "crop");
        assert_eq!(resolved.backend, "archive");
        assert_eq!(resolved.path, defaults.path);
        assert_eq!(resolved.dimensions, defaults.dimensions);
        assert_eq!(resolved.options["cache-control"], "public");
    }

    #[test]
    fn test_blank_values_fall_back() {
        let defaults = ThumbnailConfig::default();
        let request = ThumbnailRequest::default()
            .kind("")
            .path("  ")
            .dimensions(vec![]);
        let resolved = resolve_thumbnail(&request, &defaults);

        assert_eq!(resolved.kind, "fit");
        assert_eq!(resolved.path, defaults.path);
        assert_eq!(resolved.dimensions.len(), defaults.dimensions.len());
    }

    #[test]
    fn test_default_kind_is_lowercased() {
        let defaults = ThumbnailConfig {
            kind: "Letter".to_string(),
            ..ThumbnailConfig::default()
        };
        let resolved = resolve_thumbnail(&ThumbnailRequest::default(), &defaults);
        assert_eq!(resolved.kind, "letter");
    }
}
