use async_trait::async_trait;
use thiserror::Error;

use super::types::{BackendOptions, Media, Picture, RawFile, Thumbnail};
use crate::storage::StorageError;
use crate::thumbnail::ThumbnailCommand;

/// Handler errors
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Handler exists but declines this particular input
    #[error("media not available: {0}")]
    NotAvailable(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Strategy for one media type
///
/// Applicability is a plain predicate so the registry can probe handlers
/// without I/O. Construction may touch storage.
#[async_trait]
pub trait MediaHandler: Send + Sync {
    /// Whether this handler takes files of `mime`
    fn is_available(&self, mime: &str) -> bool;

    /// Build the media and make sure its metadata record exists
    async fn make(&self, file: &RawFile) -> Result<Media, HandlerError>;

    /// Build the media from the descriptor alone, without storage access
    fn make_model(&self, file: &RawFile) -> Media;

    /// Content a thumbnail can be rendered from, if the media has any
    async fn picture(&self, media: &Media) -> Result<Option<Picture>, HandlerError>;

    /// Thumbnail capability; only the image handler provides one
    fn thumbnailer(&self) -> Option<&dyn Thumbnailer> {
        None
    }
}

/// Everything a thumbnailer needs besides the picture and command
#[derive(Debug, Clone)]
pub struct ThumbnailTarget<'a> {
    pub code: &'a str,
    pub backend: &'a str,
    pub path: &'a str,
    pub origin_key: &'a str,
    pub options: &'a BackendOptions,
}

/// Creates one derived image per call
#[async_trait]
pub trait Thumbnailer: Send + Sync {
    async fn create_thumbnail(
        &self,
        picture: &Picture,
        command: &ThumbnailCommand,
        target: ThumbnailTarget<'_>,
    ) -> Result<Thumbnail, HandlerError>;
}
