mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = commands::App::load(cli.config)?;

    match cli.command {
        Commands::Probe(args) => app.probe(args),
        Commands::Import(args) => app.import(args).await?,
        Commands::Thumbnails(args) => app.thumbnails(args).await?,
        Commands::Delete(args) => app.delete(args).await?,
        Commands::Config => app.print_config()?,
    }

    Ok(())
}
