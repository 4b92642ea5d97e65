/*!
    Main/backup/filler input switcher.

    Keeps a primary feed, a backup feed and a local filler file open in the
    background and reads packets from whichever one is current.

    Prerequisites:
    - FFmpeg: `brew install ffmpeg`

    Usage:
      cargo run --release --features ffmpeg -- run --config input.yaml --prefer-live
      cargo run --release --features ffmpeg -- probe rtmp://host/live/main
*/

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    cli::Args::parse().run().await
}
