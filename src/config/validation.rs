use super::models::Config;
use crate::handlers::MediaType;
use crate::thumbnail::CommandFactory;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("No storage backends configured")]
    NoBackends,

    #[error("Thumbnail backend '{backend}' is not a configured storage backend")]
    UnknownThumbnailBackend { backend: String },

    #[error("Unknown thumbnail type '{kind}'")]
    UnknownThumbnailType { kind: String },

    #[error("No thumbnail dimensions configured")]
    NoDimensions,

    #[error("Thumbnail dimension code '{code}' is defined twice")]
    DuplicateDimensionCode { code: String },

    #[error("Thumbnail dimension '{code}' must have a positive width and height")]
    ZeroDimension { code: String },

    #[error("MIME list for '{media_type}' must not be empty")]
    EmptyMimeList { media_type: String },

    #[error("MIME list '{key}' names no built-in media type (image, video, audio)")]
    UnknownMimeType { key: String },

    #[error("MIME list for '{media_type}' is defined twice")]
    DuplicateMimeList { media_type: String },

    #[error("max_picture_bytes must be positive")]
    InvalidMaxPictureBytes,
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_storage(config)?;
    validate_thumbnail(config)?;
    validate_media(config)?;
    Ok(())
}

fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    if config.storage.backends.is_empty() {
        return Err(ValidationError::NoBackends);
    }

    if !config.storage.backends.contains_key(&config.thumbnail.backend) {
        return Err(ValidationError::UnknownThumbnailBackend {
            backend: config.thumbnail.backend.clone(),
        });
    }

    Ok(())
}

fn validate_thumbnail(config: &Config) -> Result<(), ValidationError> {
    let thumbnail = &config.thumbnail;

    if !CommandFactory::with_defaults().supports(&thumbnail.kind) {
        return Err(ValidationError::UnknownThumbnailType {
            kind: thumbnail.kind.clone(),
        });
    }

    if thumbnail.dimensions.is_empty() {
        return Err(ValidationError::NoDimensions);
    }

    let mut seen = HashSet::new();
    for size in &thumbnail.dimensions {
        if !seen.insert(size.code.as_str()) {
            return Err(ValidationError::DuplicateDimensionCode {
                code: size.code.clone(),
            });
        }
        if size.width == 0 || size.height == 0 {
            return Err(ValidationError::ZeroDimension {
                code: size.code.clone(),
            });
        }
    }

    Ok(())
}

fn validate_media(config: &Config) -> Result<(), ValidationError> {
    if config.media.max_picture_bytes.as_u64() == 0 {
        return Err(ValidationError::InvalidMaxPictureBytes);
    }

    let builtin = [MediaType::IMAGE, MediaType::VIDEO, MediaType::AUDIO];
    let mut seen = HashSet::new();

    for (key, patterns) in &config.media.mimes {
        let media_type = MediaType::parse(key)
            .filter(|t| builtin.contains(&t.as_str()))
            .ok_or_else(|| ValidationError::UnknownMimeType { key: key.clone() })?;

        if !seen.insert(media_type.clone()) {
            return Err(ValidationError::DuplicateMimeList {
                media_type: media_type.to_string(),
            });
        }
        if patterns.iter().all(|p| p.trim().is_empty()) {
            return Err(ValidationError::EmptyMimeList {
                media_type: media_type.to_string(),
            });
        }
    }

    Ok(())
}
