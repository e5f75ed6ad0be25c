use super::traits::HandlerError;
use super::types::{Media, MediaType, Metadata, RawFile};
use crate::storage::MetaStore;

/// Load the file's metadata record, creating it on first sight
pub(crate) async fn ensure_meta(
    store: &dyn MetaStore,
    media_type: MediaType,
    file: &RawFile,
) -> Result<Media, HandlerError> {
    let meta = match store.load(file).await? {
        Some(meta) => meta,
        None => {
            let meta = Metadata::new(file, media_type.clone());
            store.save(file, &meta).await?;
            tracing::debug!(file_id = %file.id, %media_type, "Created metadata record");
            meta
        }
    };

    Ok(Media::new(media_type, file.clone()).with_meta(Some(meta)))
}
