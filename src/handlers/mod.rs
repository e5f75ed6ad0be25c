//! Media handler system
//!
//! Handlers decide which files they accept and turn them into [`Media`].
//! The [`MediaRegistry`] picks a handler per file and delegates to it.
//!
//! ## Key Components
//!
//! - [`MediaHandler`] - Trait for one media type's applicability and construction
//! - [`Thumbnailer`] - Thumbnail capability, provided by [`ImageHandler`]
//! - [`MediaRegistry`] - Ordered registry resolving files to handlers
//! - [`RawFile`] / [`Media`] - Input descriptor and constructed record
//!
//! ## Example
//!
//! ```rust,ignore
//! use mediabox::handlers::{MediaRegistry, RawFile};
//!
//! let registry = MediaRegistry::with_defaults(storage, &config);
//! let file = RawFile::builder().id("1").mime("image/png").path("a.png").build();
//!
//! if registry.supports(&file) {
//!     let media = registry.make(&file).await?;
//!     let batch = registry.create_thumbnails(&media, Default::default()).await?;
//! }
//! ```

mod audio;
mod common;
mod image;
mod matcher;
mod registry;
mod traits;
pub(crate) mod types;
mod video;

pub use audio::AudioHandler;
pub use image::{DEFAULT_IMAGE_MIMES, ImageHandler};
pub use matcher::MimeSet;
pub use registry::{MediaRegistry, RegistryError, Skipped, ThumbnailBatch};
pub use traits::{HandlerError, MediaHandler, ThumbnailTarget, Thumbnailer};
pub use types::{
    BackendOptions, Dimension, Media, MediaType, Metadata, Picture, RawFile, Thumbnail,
};
pub use video::VideoHandler;
