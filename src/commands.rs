use bytes::Bytes;
use mediabox::config::{Config, ThumbnailRequest};
use mediabox::handlers::{MediaRegistry, RawFile};
use mediabox::storage::{MediaStorage, PersistRequest, StorageClient};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::cli::{FileArgs, ImportArgs, ProbeArgs, ThumbnailArgs};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub struct App {
    config: Config,
    storage: Arc<StorageClient>,
    registry: MediaRegistry,
}

impl App {
    pub fn load(path: Option<PathBuf>) -> Result<Self, AnyError> {
        let config = match path {
            Some(path) => Config::load_from_path(path)?,
            None => Config::load()?,
        };
        let storage = Arc::new(StorageClient::from_config(&config.storage)?);
        let registry = MediaRegistry::with_defaults(storage.clone(), &config);

        Ok(Self {
            config,
            storage,
            registry,
        })
    }

    pub fn probe(&self, args: ProbeArgs) {
        let file = RawFile::builder()
            .id("probe")
            .mime(args.mime)
            .path("")
            .build();

        match self.registry.resolve_type(&file) {
            Some(media_type) => println!("{media_type}"),
            None => println!("unsupported"),
        }
    }

    pub async fn import(&self, args: ImportArgs) -> Result<(), AnyError> {
        let probe = RawFile::builder()
            .id("import")
            .mime(args.mime.as_str())
            .path("")
            .build();
        // fail before writing anything
        self.registry.handler_for_file(&probe)?;

        let data = tokio::fs::read(&args.source).await?;
        let filename = args
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let file = self
            .storage
            .persist(PersistRequest {
                bytes: Bytes::from(data),
                mime: args.mime,
                backend: args.backend,
                path: args.path,
                filename,
                origin_id: args.origin,
                code: None,
                dimension: args.dimension,
                options: Default::default(),
            })
            .await?;

        let media = self.registry.make(&file).await?;
        info!(file_id = %media.file.id, media_type = %media.media_type(), "Imported");

        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "type": media.media_type(),
                "file": media.file,
                "meta": media.meta,
            }))?
        );
        Ok(())
    }

    pub async fn thumbnails(&self, args: ThumbnailArgs) -> Result<(), AnyError> {
        let file = stored_file(&args.file);
        let media = self.registry.make(&file).await?;

        let mut request = ThumbnailRequest::default();
        request.kind = args.kind;
        request.backend = args.target_backend;
        request.path = args.target_path;

        let batch = self.registry.create_thumbnails(&media, request).await?;
        if batch.is_empty() {
            println!("no renderable content");
            return Ok(());
        }

        for (code, error) in batch.failures() {
            eprintln!("{code}: {error}");
        }

        let thumbnails = if args.best_effort {
            batch.successes()
        } else {
            batch.into_all()?
        };

        for thumbnail in thumbnails {
            println!("{}\t{}", thumbnail.code, thumbnail.file().path);
        }
        Ok(())
    }

    pub async fn delete(&self, args: FileArgs) -> Result<(), AnyError> {
        let file = stored_file(&args);
        let media = self.registry.make(&file).await?;

        let removed = self.registry.delete(&media).await?;
        println!("{}", if removed { "deleted" } else { "not found" });
        Ok(())
    }

    pub fn print_config(&self) -> Result<(), AnyError> {
        print!("{}", self.config.to_toml()?);
        Ok(())
    }
}

fn stored_file(args: &FileArgs) -> RawFile {
    RawFile::builder()
        .id(args.id.clone().unwrap_or_else(|| args.key.clone()))
        .mime(args.mime.as_str())
        .backend(args.backend.as_str())
        .path(args.key.as_str())
        .build()
}
