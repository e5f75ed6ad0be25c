use std::sync::Arc;
use thiserror::Error;

use super::audio::AudioHandler;
use super::image::ImageHandler;
use super::matcher::MimeSet;
use super::traits::{HandlerError, MediaHandler, ThumbnailTarget};
use super::types::{Media, MediaType, RawFile, Thumbnail};
use super::video::VideoHandler;
use crate::config::{Config, ThumbnailConfig, ThumbnailRequest, resolve_thumbnail};
use crate::observability::Metrics;
use crate::storage::{MediaStorage, MetaStore, StorageError};
use crate::thumbnail::{CommandError, CommandFactory};

#[derive(Debug, Error)]
pub enum RegistryError {
    /// No handler for the requested or resolved media type
    #[error("unknown media type: {0}")]
    UnknownType(String),
    #[error("media type key must not be empty")]
    EmptyType,
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("metadata deletion failed: {0}")]
    Metadata(#[source] StorageError),
    #[error("storage deletion failed: {0}")]
    Storage(#[source] StorageError),
}

impl RegistryError {
    /// Whether this is the "unsupported file type" outcome
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, RegistryError::UnknownType(_))
    }
}

/// A raw derived file that no handler accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub file_id: String,
    pub mime: String,
}

/// Per-dimension outcome of one thumbnail run, in dimension order
#[derive(Debug, Default)]
pub struct ThumbnailBatch {
    results: Vec<(String, Result<Thumbnail, RegistryError>)>,
}

impl ThumbnailBatch {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn results(&self) -> &[(String, Result<Thumbnail, RegistryError>)] {
        &self.results
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &RegistryError)> {
        self.results
            .iter()
            .filter_map(|(code, r)| r.as_ref().err().map(|e| (code.as_str(), e)))
    }

    /// Best effort: keep whatever was created
    pub fn successes(self) -> Vec<Thumbnail> {
        self.results.into_iter().filter_map(|(_, r)| r.ok()).collect()
    }

    /// All or nothing: the first failure wins
    pub fn into_all(self) -> Result<Vec<Thumbnail>, RegistryError> {
        self.results.into_iter().map(|(_, r)| r).collect()
    }
}

/// Registry mapping media types to handler instances
///
/// Lookup probes handlers in registration order and the first match wins,
/// so that order is part of the contract: register narrow handlers before
/// broad ones. Re-registering a key replaces the handler but keeps the
/// key's position.
///
/// Populate it once, then share it behind an `Arc`; every lookup takes
/// `&self`. Registering after that point needs an outer lock.
pub struct MediaRegistry {
    handlers: Vec<(MediaType, Arc<dyn MediaHandler>)>,
    storage: Arc<dyn MediaStorage>,
    meta: Arc<dyn MetaStore>,
    commands: CommandFactory,
    defaults: ThumbnailConfig,
    metrics: Metrics,
}

impl MediaRegistry {
    pub fn new(
        storage: Arc<dyn MediaStorage>,
        meta: Arc<dyn MetaStore>,
        defaults: ThumbnailConfig,
    ) -> Self {
        Self {
            handlers: Vec::new(),
            storage,
            meta,
            commands: CommandFactory::with_defaults(),
            defaults,
            metrics: Metrics::new(),
        }
    }

    /// Registry with the built-in image, video and audio handlers, in that order
    pub fn with_defaults<S>(storage: Arc<S>, config: &Config) -> Self
    where
        S: MediaStorage + MetaStore + 'static,
    {
        let mimes = |media_type: &str| config.media.mimes_for(media_type).map(MimeSet::new);
        let max_bytes = config.media.max_picture_bytes.as_u64();

        let mut image = ImageHandler::new(storage.clone(), storage.clone(), max_bytes);
        if let Some(set) = mimes(MediaType::IMAGE) {
            image = image.with_mimes(set);
        }
        let mut video = VideoHandler::new(storage.clone(), storage.clone());
        if let Some(set) = mimes(MediaType::VIDEO) {
            video = video.with_mimes(set);
        }
        let mut audio = AudioHandler::new(storage.clone());
        if let Some(set) = mimes(MediaType::AUDIO) {
            audio = audio.with_mimes(set);
        }

        let mut registry = Self::new(storage.clone(), storage, config.thumbnail.clone());
        registry.insert(MediaType::image(), Arc::new(image));
        registry.insert(MediaType::video(), Arc::new(video));
        registry.insert(MediaType::audio(), Arc::new(audio));
        registry
    }

    pub fn with_commands(mut self, commands: CommandFactory) -> Self {
        self.commands = commands;
        self
    }

    /// Add a handler; a blank key is the only rejected input
    pub fn register(
        &mut self,
        media_type: &str,
        handler: Arc<dyn MediaHandler>,
    ) -> Result<(), RegistryError> {
        let media_type = MediaType::parse(media_type).ok_or(RegistryError::EmptyType)?;
        self.insert(media_type, handler);
        Ok(())
    }

    fn insert(&mut self, media_type: MediaType, handler: Arc<dyn MediaHandler>) {
        match self.handlers.iter_mut().find(|(t, _)| *t == media_type) {
            Some(slot) => {
                tracing::debug!(%media_type, "Replacing media handler");
                slot.1 = handler;
            }
            None => {
                tracing::debug!(%media_type, "Registering media handler");
                self.handlers.push((media_type, handler));
            }
        }
    }

    /// Registered keys in lookup order
    pub fn types(&self) -> impl Iterator<Item = &MediaType> {
        self.handlers.iter().map(|(t, _)| t)
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Key of the first handler accepting the file's MIME
    pub fn resolve_type(&self, file: &RawFile) -> Option<MediaType> {
        self.handlers
            .iter()
            .find(|(_, handler)| handler.is_available(&file.mime))
            .map(|(t, _)| t.clone())
    }

    pub fn get(&self, media_type: &str) -> Result<Arc<dyn MediaHandler>, RegistryError> {
        let key = media_type.trim().to_lowercase();
        self.handlers
            .iter()
            .find(|(t, _)| t.as_str() == key)
            .map(|(_, handler)| handler.clone())
            .ok_or(RegistryError::UnknownType(key))
    }

    pub fn image(&self) -> Option<Arc<dyn MediaHandler>> {
        self.get(MediaType::IMAGE).ok()
    }

    pub fn video(&self) -> Option<Arc<dyn MediaHandler>> {
        self.get(MediaType::VIDEO).ok()
    }

    pub fn audio(&self) -> Option<Arc<dyn MediaHandler>> {
        self.get(MediaType::AUDIO).ok()
    }

    pub fn handler_for_file(
        &self,
        file: &RawFile,
    ) -> Result<Arc<dyn MediaHandler>, RegistryError> {
        match self.resolve_type(file) {
            Some(media_type) => {
                self.metrics.file_resolved();
                tracing::debug!(file_id = %file.id, mime = %file.mime, %media_type, "Resolved media type");
                self.get(media_type.as_str())
            }
            None => {
                self.metrics.file_unsupported();
                Err(RegistryError::UnknownType(file.mime.clone()))
            }
        }
    }

    pub fn handler_for_media(&self, media: &Media) -> Result<Arc<dyn MediaHandler>, RegistryError> {
        self.get(media.media_type().as_str())
    }

    /// Whether any handler accepts the file; never fails
    pub fn supports(&self, file: &RawFile) -> bool {
        self.resolve_type(file).is_some()
    }

    /// Build the media and its persisted metadata record
    ///
    /// The media comes back with the raw files stored as derived from it.
    pub async fn make(&self, file: &RawFile) -> Result<Media, RegistryError> {
        let media = self.handler_for_file(file)?.make(file).await?;
        let derives = self
            .storage
            .derives(&file.id)
            .await
            .map_err(HandlerError::from)?;
        Ok(media.with_derives(derives))
    }

    /// Build the media without touching storage
    pub fn make_model(&self, file: &RawFile) -> Result<Media, RegistryError> {
        Ok(self.handler_for_file(file)?.make_model(file))
    }

    /// Create one thumbnail per configured dimension
    ///
    /// Returns an empty batch when the media has nothing to render. Every
    /// dimension is attempted; failures are reported per dimension in the
    /// batch, so callers pick all-or-nothing ([`ThumbnailBatch::into_all`])
    /// or best effort ([`ThumbnailBatch::successes`]).
    pub async fn create_thumbnails(
        &self,
        media: &Media,
        request: ThumbnailRequest,
    ) -> Result<ThumbnailBatch, RegistryError> {
        let settings = resolve_thumbnail(&request, &self.defaults);
        let handler = self.handler_for_media(media)?;

        let Some(picture) = handler.picture(media).await? else {
            tracing::debug!(media = %media.file.id, "No picture, skipping thumbnails");
            return Ok(ThumbnailBatch::default());
        };

        let command = self.commands.make(&settings.kind)?;
        let image = self.get(MediaType::IMAGE)?;
        let thumbnailer = image.thumbnailer().ok_or_else(|| {
            HandlerError::NotAvailable("image handler cannot create thumbnails".to_string())
        })?;

        let mut results = Vec::with_capacity(settings.dimensions.len());
        for size in &settings.dimensions {
            let mut command = command.clone();
            command.set_dimension(size.dimension());

            let result = thumbnailer
                .create_thumbnail(
                    &picture,
                    &command,
                    ThumbnailTarget {
                        code: &size.code,
                        backend: &settings.backend,
                        path: &settings.path,
                        origin_key: media.origin_key(),
                        options: &settings.options,
                    },
                )
                .await
                .map_err(RegistryError::from);

            match &result {
                Ok(_) => self.metrics.thumbnail_created(),
                Err(e) => {
                    self.metrics.thumbnail_failed();
                    tracing::warn!(media = %media.file.id, code = %size.code, error = %e, "Thumbnail failed");
                }
            }
            results.push((size.code.clone(), result));
        }

        Ok(ThumbnailBatch { results })
    }

    /// Each raw derived file, made into media or marked as skipped
    pub async fn derive_outcomes(
        &self,
        media: &Media,
    ) -> Result<Vec<Result<Media, Skipped>>, RegistryError> {
        let mut outcomes = Vec::with_capacity(media.raw_derives().len());

        for file in media.raw_derives() {
            if self.supports(file) {
                outcomes.push(Ok(self.make(file).await?));
            } else {
                outcomes.push(Err(Skipped {
                    file_id: file.id.clone(),
                    mime: file.mime.clone(),
                }));
            }
        }

        Ok(outcomes)
    }

    /// Derived files as media; unsupported ones are dropped
    pub async fn derives(&self, media: &Media) -> Result<Vec<Media>, RegistryError> {
        Ok(self
            .derive_outcomes(media)
            .await?
            .into_iter()
            .filter_map(Result::ok)
            .collect())
    }

    /// Remove the metadata record, if the media has one
    pub async fn delete_meta(&self, media: &Media) -> Result<(), RegistryError> {
        if media.meta().is_some() {
            self.meta
                .delete(&media.file)
                .await
                .map_err(RegistryError::Metadata)?;
        }
        Ok(())
    }

    /// Remove metadata, then the stored file
    ///
    /// Returns whether storage actually removed something.
    pub async fn delete(&self, media: &Media) -> Result<bool, RegistryError> {
        self.delete_meta(media).await?;
        self.storage
            .delete(&media.file)
            .await
            .map_err(RegistryError::Storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DimensionSpec;
    use crate::handlers::{Dimension, Picture};
    use crate::storage::StorageClient;
    use async_trait::async_trait;
    use bytes::Bytes;

    /// Handler stub tagging what it builds with its own label
    struct Stub {
        mimes: MimeSet,
        label: &'static str,
    }

    impl Stub {
        fn new(pattern: &str, label: &'static str) -> Arc<dyn MediaHandler> {
            Arc::new(Self {
                mimes: MimeSet::new([pattern]),
                label,
            })
        }
    }

    #[async_trait]
    impl MediaHandler for Stub {
        fn is_available(&self, mime: &str) -> bool {
            self.mimes.matches(mime)
        }

        async fn make(&self, file: &RawFile) -> Result<Media, HandlerError> {
            Ok(self.make_model(file))
        }

        fn make_model(&self, file: &RawFile) -> Media {
            let mut file = file.clone();
            file.filename = self.label.to_string();
            Media::new(MediaType::parse(self.label).unwrap(), file)
        }

        async fn picture(&self, _media: &Media) -> Result<Option<Picture>, HandlerError> {
            Ok(None)
        }
    }

    fn file(id: &str, mime: &str) -> RawFile {
        RawFile::builder()
            .id(id)
            .mime(mime)
            .path(format!("uploads/{id}"))
            .build()
    }

    fn empty_registry() -> MediaRegistry {
        let storage = Arc::new(StorageClient::in_memory());
        MediaRegistry::new(storage.clone(), storage, ThumbnailConfig::default())
    }

    #[test]
    fn test_resolve_type_scenario() {
        let mut registry = empty_registry();
        registry.register("image", Stub::new("image/*", "image")).unwrap();
        registry.register("video", Stub::new("video/*", "video")).unwrap();

        assert_eq!(
            registry.resolve_type(&file("a", "image/png")),
            Some(MediaType::image())
        );
        assert_eq!(registry.resolve_type(&file("b", "application/pdf")), None);
    }

    #[test]
    fn test_first_registered_wins() {
        let mut registry = empty_registry();
        registry.register("photo", Stub::new("image/*", "photo")).unwrap();
        registry.register("image", Stub::new("image/png", "image")).unwrap();

        let resolved = registry.resolve_type(&file("a", "image/png")).unwrap();
        assert_eq!(resolved.as_str(), "photo");
    }

    #[test]
    fn test_reregister_keeps_position_and_replaces() {
        let mut registry = empty_registry();
        registry.register("image", Stub::new("image/*", "image")).unwrap();
        registry.register("video", Stub::new("video/*", "video")).unwrap();
        registry.register("IMAGE", Stub::new("image/gif", "image")).unwrap();

        let types: Vec<_> = registry.types().map(|t| t.as_str()).collect();
        assert_eq!(types, vec!["image", "video"]);
        assert!(!registry.supports(&file("a", "image/png")));
        assert!(registry.supports(&file("b", "image/gif")));
    }

    #[test]
    fn test_register_twice_is_idempotent() {
        let handler = Stub::new("audio/*", "audio");
        let mut once = empty_registry();
        once.register("audio", handler.clone()).unwrap();
        let mut twice = empty_registry();
        twice.register("audio", handler.clone()).unwrap();
        twice.register("audio", handler.clone()).unwrap();

        assert_eq!(once.types().count(), twice.types().count());
        assert!(Arc::ptr_eq(&twice.get("audio").unwrap(), &handler));
        assert_eq!(
            once.resolve_type(&file("a", "audio/ogg")),
            twice.resolve_type(&file("a", "audio/ogg"))
        );
    }

    #[test]
    fn test_register_rejects_blank_key() {
        let mut registry = empty_registry();
        let result = registry.register(" ", Stub::new("image/*", "image"));
        assert!(matches!(result, Err(RegistryError::EmptyType)));
    }

    #[test]
    fn test_get_unknown_type() {
        let registry = empty_registry();
        let err = registry.get("image").err().unwrap();
        assert!(err.is_unknown_type());
        assert!(registry.image().is_none());
    }

    #[test]
    fn test_supports_matches_handler_for_file() {
        let mut registry = empty_registry();
        registry.register("image", Stub::new("image/*", "image")).unwrap();

        for mime in ["image/png", "text/plain", "", "garbage"] {
            let f = file("x", mime);
            assert_eq!(registry.supports(&f), registry.resolve_type(&f).is_some());
            assert_eq!(registry.supports(&f), registry.handler_for_file(&f).is_ok());
        }

        let snapshot = registry.metrics().snapshot();
        assert_eq!(snapshot.files_resolved, 1);
        assert_eq!(snapshot.files_unsupported, 3);
    }

    #[tokio::test]
    async fn test_make_and_make_model_delegate() {
        let mut registry = empty_registry();
        registry.register("video", Stub::new("video/*", "video")).unwrap();

        let media = registry.make(&file("v", "video/mp4")).await.unwrap();
        assert_eq!(media.file.filename, "video");

        let media = registry.make_model(&file("v", "video/mp4")).unwrap();
        assert_eq!(media.media_type(), &MediaType::video());

        let err = registry.make(&file("p", "application/pdf")).await.unwrap_err();
        assert!(matches!(err, RegistryError::UnknownType(mime) if mime == "application/pdf"));
    }

    #[tokio::test]
    async fn test_derives_drop_unsupported_in_order() {
        let mut registry = empty_registry();
        registry.register("image", Stub::new("image/*", "image")).unwrap();

        let origin = registry.make_model(&file("o", "image/png")).unwrap().with_derives(vec![
            file("d1", "image/png"),
            file("d2", "application/zip"),
            file("d3", "image/jpeg"),
        ]);

        let derives = registry.derives(&origin).await.unwrap();
        let ids: Vec<_> = derives.iter().map(|m| m.file.id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d3"]);

        let outcomes = registry.derive_outcomes(&origin).await.unwrap();
        assert_eq!(
            outcomes[1],
            Err(Skipped {
                file_id: "d2".to_string(),
                mime: "application/zip".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_no_picture_means_empty_batch() {
        let mut registry = empty_registry();
        registry.register("audio", Stub::new("audio/*", "audio")).unwrap();

        let media = registry.make_model(&file("song", "audio/mpeg")).unwrap();
        let batch = registry
            .create_thumbnails(&media, ThumbnailRequest::default().kind("bogus"))
            .await
            .unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_thumbnails_for_each_dimension() {
        let storage = Arc::new(StorageClient::in_memory());
        storage
            .upload("local", "uploads/cat", Bytes::from_static(b"cat"))
            .await
            .unwrap();
        let registry = MediaRegistry::with_defaults(storage.clone(), &Config::default());

        let media = registry.make(&file("cat", "image/png")).await.unwrap();
        let batch = registry
            .create_thumbnails(
                &media,
                ThumbnailRequest::default()
                    .dimensions(vec![
                        DimensionSpec::new("S", 20, 20),
                        DimensionSpec::new("M", 40, 30),
                    ])
                    .path("thumbs"),
            )
            .await
            .unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.failures().count(), 0);
        let thumbnails = batch.into_all().unwrap();
        assert_eq!(thumbnails[0].code, "S");
        assert_eq!(thumbnails[1].code, "M");
        assert_eq!(thumbnails[1].media.dimension(), Some(Dimension::new(40, 30)));
        assert!(thumbnails.iter().all(|t| t.file().origin_id.as_deref() == Some("cat")));
        assert_eq!(registry.metrics().snapshot().thumbnails_created, 2);
    }

    #[tokio::test]
    async fn test_thumbnail_failures_are_per_dimension() {
        let storage = Arc::new(StorageClient::in_memory());
        storage
            .upload("local", "uploads/cat", Bytes::from_static(b"cat"))
            .await
            .unwrap();
        let registry = MediaRegistry::with_defaults(storage.clone(), &Config::default());
        let media = registry.make_model(&file("cat", "image/png")).unwrap();

        let batch = registry
            .create_thumbnails(&media, ThumbnailRequest::default().backend("missing"))
            .await
            .unwrap();

        assert_eq!(batch.len(), 5);
        assert_eq!(batch.failures().count(), 5);
        assert!(batch.into_all().is_err());
        assert_eq!(registry.metrics().snapshot().thumbnails_failed, 5);
    }

    #[tokio::test]
    async fn test_unknown_thumbnail_type_fails_whole_call() {
        let storage = Arc::new(StorageClient::in_memory());
        storage
            .upload("local", "uploads/cat", Bytes::from_static(b"cat"))
            .await
            .unwrap();
        let registry = MediaRegistry::with_defaults(storage.clone(), &Config::default());
        let media = registry.make_model(&file("cat", "image/png")).unwrap();

        let err = registry
            .create_thumbnails(&media, ThumbnailRequest::default().kind("zoom"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Command(CommandError::UnknownType(_))));
    }

    #[tokio::test]
    async fn test_delete_steps() {
        let storage = Arc::new(StorageClient::in_memory());
        storage
            .upload("local", "uploads/cat", Bytes::from_static(b"cat"))
            .await
            .unwrap();
        let registry = MediaRegistry::with_defaults(storage.clone(), &Config::default());
        let media = registry.make(&file("cat", "image/png")).await.unwrap();
        assert!(storage.load(&media.file).await.unwrap().is_some());

        assert!(registry.delete(&media).await.unwrap());
        assert!(storage.load(&media.file).await.unwrap().is_none());
        assert!(!registry.delete(&media).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_storage_error_is_distinct() {
        let storage = Arc::new(StorageClient::in_memory());
        let registry = MediaRegistry::with_defaults(storage, &Config::default());
        let mut stray = file("x", "image/png");
        stray.backend = "gone".to_string();
        let media = registry.make_model(&stray).unwrap();

        let err = registry.delete(&media).await.unwrap_err();
        assert!(matches!(err, RegistryError::Storage(StorageError::UnknownBackend(_))));

        let media = media.with_meta(Some(crate::handlers::Metadata::new(&stray, MediaType::image())));
        let err = registry.delete(&media).await.unwrap_err();
        assert!(matches!(err, RegistryError::Metadata(StorageError::UnknownBackend(_))));
    }
}
