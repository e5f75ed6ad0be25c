use clap::{Parser, Subcommand};
use mediabox::handlers::Dimension;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mediabox")]
#[command(about = "Media type dispatch and thumbnail CLI", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $MEDIABOX_CONFIG or config/mediabox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show which media type handles a MIME
    Probe(ProbeArgs),
    /// Store a local file and create its media record
    Import(ImportArgs),
    /// Create thumbnails for a stored file
    Thumbnails(ThumbnailArgs),
    /// Delete a stored file and its metadata
    Delete(FileArgs),
    /// Print the effective configuration
    Config,
}

#[derive(clap::Args, Debug)]
pub struct ProbeArgs {
    /// MIME type to resolve
    pub mime: String,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Local file to import
    pub source: PathBuf,

    #[arg(long)]
    pub mime: String,

    #[arg(long, default_value = "local")]
    pub backend: String,

    /// Key prefix inside the backend
    #[arg(long, default_value = "uploads")]
    pub path: String,

    /// Pixel size of the content, e.g. 1920x1080
    #[arg(long)]
    pub dimension: Option<Dimension>,

    /// Id of the file this one derives from (e.g. a video's poster frame)
    #[arg(long)]
    pub origin: Option<String>,
}

/// Identifies a file already in storage
#[derive(clap::Args, Debug)]
pub struct FileArgs {
    /// Storage key of the file
    pub key: String,

    #[arg(long)]
    pub mime: String,

    #[arg(long, default_value = "local")]
    pub backend: String,

    /// File id (defaults to the key)
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ThumbnailArgs {
    #[command(flatten)]
    pub file: FileArgs,

    /// Thumbnail type (fit, letter, crop, ...)
    #[arg(long = "type")]
    pub kind: Option<String>,

    /// Backend receiving the thumbnails
    #[arg(long)]
    pub target_backend: Option<String>,

    /// Key prefix for the thumbnails
    #[arg(long)]
    pub target_path: Option<String>,

    /// Keep successful thumbnails when some sizes fail
    #[arg(long)]
    pub best_effort: bool,
}
