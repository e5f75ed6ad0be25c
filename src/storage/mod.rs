//! Storage collaborators for media files and their metadata
//! Uses Apache Arrow object_store crate

use async_trait::async_trait;
use bytes::Bytes;
use object_store::{
    Attribute, Attributes, ObjectStore, PutOptions, local::LocalFileSystem, memory::InMemory,
    path::Path as StoragePath,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{BackendConfig, BackendProvider, StorageConfig};
use crate::handlers::{BackendOptions, Dimension, Metadata, RawFile};

/// Key prefix of the origin -> derived file index
const DERIVES_PREFIX: &str = "_derives";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unknown storage backend: {0}")]
    UnknownBackend(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Metadata encoding failed: {0}")]
    MetadataEncoding(#[from] serde_json::Error),

    #[error("Backend setup failed: {0}")]
    Setup(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

/// Everything needed to write one new file
#[derive(Debug, Clone)]
pub struct PersistRequest {
    pub bytes: Bytes,
    pub mime: String,
    pub backend: String,
    pub path: String,
    pub filename: String,
    pub origin_id: Option<String>,
    pub code: Option<String>,
    pub dimension: Option<Dimension>,
    pub options: BackendOptions,
}

/// Physical file storage
#[async_trait]
pub trait MediaStorage: Send + Sync {
    async fn read(&self, file: &RawFile) -> Result<Bytes>;

    /// Write new content and describe where it landed
    ///
    /// A request with an `origin_id` also records the new file as derived
    /// from that origin.
    async fn persist(&self, request: PersistRequest) -> Result<RawFile>;

    /// Files persisted as derived from `origin_id`, oldest first
    async fn derives(&self, origin_id: &str) -> Result<Vec<RawFile>>;

    /// Remove a file; `false` when it was already gone
    async fn delete(&self, file: &RawFile) -> Result<bool>;
}

/// Metadata records kept alongside files
#[async_trait]
pub trait MetaStore: Send + Sync {
    async fn load(&self, file: &RawFile) -> Result<Option<Metadata>>;

    async fn save(&self, file: &RawFile, meta: &Metadata) -> Result<()>;

    async fn delete(&self, file: &RawFile) -> Result<()>;
}

#[derive(Clone)]
struct Backend {
    store: Arc<dyn ObjectStore>,
    provider: BackendProvider,
}

impl Backend {
    /// Local filesystem rejects object attributes
    fn supports_attributes(&self) -> bool {
        self.provider == BackendProvider::Memory
    }

    /// In-memory deletes succeed on absent keys
    fn reports_missing_on_delete(&self) -> bool {
        self.provider == BackendProvider::Local
    }
}

/// Storage client wrapping named object_store backends
#[derive(Clone)]
pub struct StorageClient {
    backends: HashMap<String, Backend>,
}

impl StorageClient {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Add (or replace) a named backend
    pub fn with_backend(
        mut self,
        name: impl Into<String>,
        store: Arc<dyn ObjectStore>,
        provider: BackendProvider,
    ) -> Self {
        self.backends
            .insert(name.into(), Backend { store, provider });
        self
    }

    /// In-memory storage standing in for the `local` backend (tests/dev)
    pub fn in_memory() -> Self {
        Self::new().with_backend("local", Arc::new(InMemory::new()), BackendProvider::Memory)
    }

    /// Build every backend declared in configuration
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let mut client = Self::new();

        for (name, backend) in &config.backends {
            client = match backend {
                BackendConfig {
                    provider: BackendProvider::Local,
                    root,
                } => {
                    std::fs::create_dir_all(root)?;
                    let store = LocalFileSystem::new_with_prefix(root)?;
                    tracing::info!(backend = %name, root = %root.display(), "Local backend ready");
                    client.with_backend(name.clone(), Arc::new(store), BackendProvider::Local)
                }
                BackendConfig {
                    provider: BackendProvider::Memory,
                    ..
                } => client.with_backend(
                    name.clone(),
                    Arc::new(InMemory::new()),
                    BackendProvider::Memory,
                ),
            };
        }

        Ok(client)
    }

    pub fn has_backend(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }

    fn backend(&self, name: &str) -> Result<&Backend> {
        self.backends
            .get(name)
            .ok_or_else(|| StorageError::UnknownBackend(name.to_string()))
    }

    /// Upload bytes under an explicit key
    pub async fn upload(&self, backend: &str, key: &str, data: Bytes) -> Result<()> {
        let size = data.len();
        self.backend(backend)?
            .store
            .put(&StoragePath::from(key), data.into())
            .await?;

        tracing::info!(backend, key, size, "Uploaded to storage");
        Ok(())
    }

    /// Check if key exists
    pub async fn exists(&self, backend: &str, key: &str) -> Result<bool> {
        let path = StoragePath::from(key);

        match self.backend(backend)?.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for StorageClient {
    fn default() -> Self {
        Self::new()
    }
}

fn meta_key(file: &RawFile) -> StoragePath {
    StoragePath::from(format!("{}.meta.json", file.path))
}

fn derive_key(origin_id: &str, file_id: &str) -> StoragePath {
    let name = format!("{file_id}.json");
    StoragePath::from_iter([DERIVES_PREFIX, origin_id, name.as_str()])
}

fn attributes_for(mime: &str, options: &BackendOptions) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(Attribute::ContentType, mime.to_string().into());

    for (key, value) in options {
        let attribute = match key.to_lowercase().as_str() {
            "content-type" => Attribute::ContentType,
            "cache-control" => Attribute::CacheControl,
            "content-disposition" => Attribute::ContentDisposition,
            "content-encoding" => Attribute::ContentEncoding,
            "content-language" => Attribute::ContentLanguage,
            _ => Attribute::Metadata(key.clone().into()),
        };
        attributes.insert(attribute, value.clone().into());
    }

    attributes
}

#[async_trait]
impl MediaStorage for StorageClient {
    async fn read(&self, file: &RawFile) -> Result<Bytes> {
        let path = StoragePath::from(file.path.as_str());

        let result = match self.backend(&file.backend)?.store.get(&path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(StorageError::NotFound(file.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let bytes = result.bytes().await?;

        tracing::debug!(key = %file.path, size = bytes.len(), "Downloaded from storage");

        Ok(bytes)
    }

    async fn persist(&self, request: PersistRequest) -> Result<RawFile> {
        let backend = self.backend(&request.backend)?;
        let id = Uuid::now_v7().to_string();
        let prefix = request.path.trim_matches('/');
        let key = if prefix.is_empty() {
            format!("{}_{}", id, request.filename)
        } else {
            format!("{}/{}_{}", prefix, id, request.filename)
        };
        let size = request.bytes.len();

        let path = StoragePath::from(key.as_str());
        if backend.supports_attributes() {
            let opts = PutOptions {
                attributes: attributes_for(&request.mime, &request.options),
                ..Default::default()
            };
            backend
                .store
                .put_opts(&path, request.bytes.into(), opts)
                .await?;
        } else {
            if !request.options.is_empty() {
                tracing::debug!(
                    backend = %request.backend,
                    "Backend ignores object options"
                );
            }
            backend.store.put(&path, request.bytes.into()).await?;
        }

        tracing::info!(backend = %request.backend, key = %key, size, "Persisted file");

        let file = RawFile {
            id,
            mime: request.mime,
            backend: request.backend,
            path: key,
            filename: request.filename,
            size: size as u64,
            origin_id: request.origin_id,
            code: request.code,
            dimension: request.dimension,
        };

        if let Some(origin_id) = &file.origin_id {
            let entry = serde_json::to_vec(&file)?;
            backend
                .store
                .put(&derive_key(origin_id, &file.id), entry.into())
                .await?;
            tracing::debug!(origin = %origin_id, file_id = %file.id, "Recorded derived file");
        }

        Ok(file)
    }

    async fn derives(&self, origin_id: &str) -> Result<Vec<RawFile>> {
        let prefix = StoragePath::from_iter([DERIVES_PREFIX, origin_id]);
        let mut files = Vec::new();

        for backend in self.backends.values() {
            let listing = match backend.store.list_with_delimiter(Some(&prefix)).await {
                Ok(listing) => listing,
                Err(object_store::Error::NotFound { .. }) => continue,
                Err(e) => return Err(e.into()),
            };

            for object in listing.objects {
                let entry = match backend.store.get(&object.location).await {
                    Ok(result) => result.bytes().await?,
                    // removed while listing
                    Err(object_store::Error::NotFound { .. }) => continue,
                    Err(e) => return Err(e.into()),
                };
                files.push(serde_json::from_slice::<RawFile>(&entry)?);
            }
        }

        // v7 ids sort by creation time
        files.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(files)
    }

    async fn delete(&self, file: &RawFile) -> Result<bool> {
        let backend = self.backend(&file.backend)?;
        let path = StoragePath::from(file.path.as_str());

        if let Some(origin_id) = &file.origin_id {
            match backend.store.delete(&derive_key(origin_id, &file.id)).await {
                Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }

        if !backend.reports_missing_on_delete() && !self.exists(&file.backend, &file.path).await? {
            return Ok(false);
        }

        match backend.store.delete(&path).await {
            Ok(()) => {
                tracing::info!(backend = %file.backend, key = %file.path, "Deleted file");
                Ok(true)
            }
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl MetaStore for StorageClient {
    async fn load(&self, file: &RawFile) -> Result<Option<Metadata>> {
        let store = &self.backend(&file.backend)?.store;

        match store.get(&meta_key(file)).await {
            Ok(result) => {
                let bytes = result.bytes().await?;
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, file: &RawFile, meta: &Metadata) -> Result<()> {
        let data = serde_json::to_vec(meta)?;
        self.backend(&file.backend)?
            .store
            .put(&meta_key(file), data.into())
            .await?;
        Ok(())
    }

    async fn delete(&self, file: &RawFile) -> Result<()> {
        match self
            .backend(&file.backend)?
            .store
            .delete(&meta_key(file))
            .await
        {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::MediaType;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn request(backend: &str) -> PersistRequest {
        PersistRequest {
            bytes: Bytes::from_static(b"pixels"),
            mime: "image/png".to_string(),
            backend: backend.to_string(),
            path: "/thumbnails/".to_string(),
            filename: "a.png".to_string(),
            origin_id: Some("origin".to_string()),
            code: Some("S".to_string()),
            dimension: None,
            options: BTreeMap::from([("cache-control".to_string(), "max-age=60".to_string())]),
        }
    }

    #[tokio::test]
    async fn test_persist_read_delete() {
        let storage = StorageClient::in_memory();

        let file = storage.persist(request("local")).await.unwrap();
        assert!(file.path.starts_with("thumbnails/"));
        assert!(file.path.ends_with("_a.png"));
        assert_eq!(file.size, 6);
        assert_eq!(file.code.as_deref(), Some("S"));

        let bytes = storage.read(&file).await.unwrap();
        assert_eq!(&bytes[..], b"pixels");

        assert!(MediaStorage::delete(&storage, &file).await.unwrap());
        assert!(!MediaStorage::delete(&storage, &file).await.unwrap());
        assert!(matches!(
            storage.read(&file).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_derived_files_are_indexed() {
        let storage = StorageClient::in_memory();
        let mut standalone = request("local");
        standalone.origin_id = None;
        storage.persist(standalone).await.unwrap();

        let first = storage.persist(request("local")).await.unwrap();
        let second = storage.persist(request("local")).await.unwrap();

        let derives = storage.derives("origin").await.unwrap();
        assert_eq!(derives, vec![first.clone(), second.clone()]);
        assert!(storage.derives("someone-else").await.unwrap().is_empty());

        assert!(MediaStorage::delete(&storage, &first).await.unwrap());
        assert_eq!(storage.derives("origin").await.unwrap(), vec![second]);
    }

    #[tokio::test]
    async fn test_unknown_backend() {
        let storage = StorageClient::in_memory();
        let result = storage.persist(request("s3")).await;
        assert!(matches!(result, Err(StorageError::UnknownBackend(name)) if name == "s3"));
    }

    #[tokio::test]
    async fn test_metadata_sidecar() {
        let storage = StorageClient::in_memory();
        let file = storage.persist(request("local")).await.unwrap();

        assert!(storage.load(&file).await.unwrap().is_none());

        let meta = Metadata::new(&file, MediaType::image());
        storage.save(&file, &meta).await.unwrap();
        let loaded = storage.load(&file).await.unwrap().unwrap();
        assert_eq!(loaded.file_id, file.id);

        MetaStore::delete(&storage, &file).await.unwrap();
        assert!(storage.load(&file).await.unwrap().is_none());
        // deleting twice is fine
        MetaStore::delete(&storage, &file).await.unwrap();
    }

    #[tokio::test]
    async fn test_local_backend_from_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig {
            backends: [(
                "disk".to_string(),
                BackendConfig {
                    provider: BackendProvider::Local,
                    root: temp_dir.path().join("media"),
                },
            )]
            .into(),
        };

        let storage = StorageClient::from_config(&config).unwrap();
        assert!(storage.has_backend("disk"));

        let file = storage.persist(request("disk")).await.unwrap();
        assert!(temp_dir.path().join("media").join(&file.path).exists());
        assert_eq!(storage.derives("origin").await.unwrap(), vec![file.clone()]);

        assert!(MediaStorage::delete(&storage, &file).await.unwrap());
        assert!(!temp_dir.path().join("media").join(&file.path).exists());
        assert!(!MediaStorage::delete(&storage, &file).await.unwrap());
        assert!(storage.derives("origin").await.unwrap().is_empty());
    }
}
