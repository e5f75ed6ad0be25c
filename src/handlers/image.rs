use async_trait::async_trait;
use mime::Mime;
use serde_json::json;
use std::sync::Arc;

use super::common::ensure_meta;
use super::matcher::MimeSet;
use super::traits::{HandlerError, MediaHandler, ThumbnailTarget, Thumbnailer};
use super::types::{Media, MediaType, Metadata, Picture, RawFile, Thumbnail};
use crate::storage::{MediaStorage, MetaStore, PersistRequest};
use crate::thumbnail::{PassthroughRenderer, Renderer, ThumbnailCommand};

pub const DEFAULT_IMAGE_MIMES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/bmp",
];

/// Image handler; the only one able to create thumbnails
#[derive(Clone)]
pub struct ImageHandler {
    mimes: MimeSet,
    storage: Arc<dyn MediaStorage>,
    meta: Arc<dyn MetaStore>,
    renderer: Arc<dyn Renderer>,
    max_picture_bytes: u64,
}

impl ImageHandler {
    pub fn new(
        storage: Arc<dyn MediaStorage>,
        meta: Arc<dyn MetaStore>,
        max_picture_bytes: u64,
    ) -> Self {
        Self {
            mimes: MimeSet::new(DEFAULT_IMAGE_MIMES),
            storage,
            meta,
            renderer: Arc::new(PassthroughRenderer),
            max_picture_bytes,
        }
    }

    pub fn with_mimes(mut self, mimes: MimeSet) -> Self {
        self.mimes = mimes;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }
}

fn extension(mime: &str) -> String {
    mime.parse::<Mime>()
        .map(|m| m.subtype().as_str().to_lowercase())
        .unwrap_or_else(|_| "bin".to_string())
}

#[async_trait]
impl MediaHandler for ImageHandler {
    fn is_available(&self, mime: &str) -> bool {
        self.mimes.matches(mime)
    }

    async fn make(&self, file: &RawFile) -> Result<Media, HandlerError> {
        ensure_meta(self.meta.as_ref(), MediaType::image(), file).await
    }

    fn make_model(&self, file: &RawFile) -> Media {
        Media::new(MediaType::image(), file.clone())
    }

    async fn picture(&self, media: &Media) -> Result<Option<Picture>, HandlerError> {
        if media.file.size > self.max_picture_bytes {
            return Err(HandlerError::NotAvailable(format!(
                "image {} is {} bytes, limit is {}",
                media.file.id, media.file.size, self.max_picture_bytes
            )));
        }

        let bytes = self.storage.read(&media.file).await?;
        if bytes.len() as u64 > self.max_picture_bytes {
            return Err(HandlerError::NotAvailable(format!(
                "image {} is {} bytes, limit is {}",
                media.file.id,
                bytes.len(),
                self.max_picture_bytes
            )));
        }

        Ok(Some(Picture {
            bytes,
            mime: media.file.mime.clone(),
            dimension: media.dimension(),
        }))
    }

    fn thumbnailer(&self) -> Option<&dyn Thumbnailer> {
        Some(self)
    }
}

#[async_trait]
impl Thumbnailer for ImageHandler {
    async fn create_thumbnail(
        &self,
        picture: &Picture,
        command: &ThumbnailCommand,
        target: ThumbnailTarget<'_>,
    ) -> Result<Thumbnail, HandlerError> {
        let frame = command.frame(picture.dimension);
        let bytes = self.renderer.render(picture, &frame)?;

        let file = self
            .storage
            .persist(PersistRequest {
                bytes,
                mime: picture.mime.clone(),
                backend: target.backend.to_string(),
                path: target.path.to_string(),
                filename: format!(
                    "{}_{}.{}",
                    target.origin_key,
                    target.code,
                    extension(&picture.mime)
                ),
                origin_id: Some(target.origin_key.to_string()),
                code: Some(target.code.to_string()),
                dimension: Some(frame.canvas),
                options: target.options.clone(),
            })
            .await?;

        let mut meta = Metadata::new(&file, MediaType::image());
        meta.extra = json!({ "type": command.kind().as_str() });
        self.meta.save(&file, &meta).await?;

        tracing::info!(
            origin = target.origin_key,
            code = target.code,
            canvas = %frame.canvas,
            "Thumbnail created"
        );

        Ok(Thumbnail {
            code: target.code.to_string(),
            media: Media::new(MediaType::image(), file).with_meta(Some(meta)),
        })
    }
}
