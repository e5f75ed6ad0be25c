use async_trait::async_trait;
use std::sync::Arc;

use super::common::ensure_meta;
use super::matcher::MimeSet;
use super::traits::{HandlerError, MediaHandler};
use super::types::{Media, MediaType, Picture, RawFile};
use crate::storage::{MediaStorage, MetaStore};

/// Video handler
///
/// Videos have no picture of their own; the first derived file with an
/// image MIME (the poster frame) stands in for one.
#[derive(Clone)]
pub struct VideoHandler {
    mimes: MimeSet,
    storage: Arc<dyn MediaStorage>,
    meta: Arc<dyn MetaStore>,
}

impl VideoHandler {
    pub fn new(storage: Arc<dyn MediaStorage>, meta: Arc<dyn MetaStore>) -> Self {
        Self {
            mimes: MimeSet::new(["video/*"]),
            storage,
            meta,
        }
    }

    pub fn with_mimes(mut self, mimes: MimeSet) -> Self {
        self.mimes = mimes;
        self
    }
}

#[async_trait]
impl MediaHandler for VideoHandler {
    fn is_available(&self, mime: &str) -> bool {
        self.mimes.matches(mime)
    }

    async fn make(&self, file: &RawFile) -> Result<Media, HandlerError> {
        ensure_meta(self.meta.as_ref(), MediaType::video(), file).await
    }

    fn make_model(&self, file: &RawFile) -> Media {
        Media::new(MediaType::video(), file.clone())
    }

    async fn picture(&self, media: &Media) -> Result<Option<Picture>, HandlerError> {
        let poster = MimeSet::new(["image/*"]);
        let Some(frame) = media.raw_derives().iter().find(|f| poster.matches(&f.mime)) else {
            return Ok(None);
        };

        let bytes = self.storage.read(frame).await?;
        let dimension = self
            .meta
            .load(frame)
            .await?
            .and_then(|meta| meta.dimension)
            .or(frame.dimension);

        Ok(Some(Picture {
            bytes,
            mime: frame.mime.clone(),
            dimension,
        }))
    }
}
