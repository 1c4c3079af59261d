//! Pollwatch CLI - pollwatch command

use anyhow::Result;
use clap::Parser;
use cli_lib::settings::{Args, Settings};
use cli_lib::{app, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::from_args(args)?;

    // Held until exit so buffered file logs are flushed
    let _log_guard = logging::init(&settings.logging)?;

    app::run(settings).await
}
