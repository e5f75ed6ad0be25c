use async_trait::async_trait;
use std::sync::Arc;

use super::common::ensure_meta;
use super::matcher::MimeSet;
use super::traits::{HandlerError, MediaHandler};
use super::types::{Media, MediaType, Picture, RawFile};
use crate::storage::MetaStore;

/// Audio handler; audio never yields a picture
#[derive(Clone)]
pub struct AudioHandler {
    mimes: MimeSet,
    meta: Arc<dyn MetaStore>,
}

impl AudioHandler {
    pub fn new(meta: Arc<dyn MetaStore>) -> Self {
        Self {
            mimes: MimeSet::new(["audio/*"]),
            meta,
        }
    }

    pub fn with_mimes(mut self, mimes: MimeSet) -> Self {
        self.mimes = mimes;
        self
    }
}

#[async_trait]
impl MediaHandler for AudioHandler {
    fn is_available(&self, mime: &str) -> bool {
        self.mimes.matches(mime)
    }

    async fn make(&self, file: &RawFile) -> Result<Media, HandlerError> {
        ensure_meta(self.meta.as_ref(), MediaType::audio(), file).await
    }

    fn make_model(&self, file: &RawFile) -> Media {
        Media::new(MediaType::audio(), file.clone())
    }

    async fn picture(&self, _media: &Media) -> Result<Option<Picture>, HandlerError> {
        Ok(None)
    }
}
