use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::{signal, sync::watch};

use ffmpeg_source::{FfmpegTransport, FfmpegTransportConfig};
use vidswitch::{InputConfig, InputError, InputHandler, SourceKind};

/// Sources in order of preference for `--prefer-live`.
const PREFERENCE: [SourceKind; 3] = [SourceKind::Main, SourceKind::Backup, SourceKind::Filler];

/// How long the consumer waits when the current source has nothing to read.
const IDLE_WAIT: Duration = Duration::from_millis(20);

#[derive(Parser, Debug)]
pub struct RunCommand {
    /// Input configuration file (YAML)
    #[arg(short, long, default_value = "input.yaml")]
    pub config: PathBuf,

    /// Network I/O timeout in milliseconds
    #[arg(long, default_value = "5000")]
    pub io_timeout_ms: u64,

    /// Switch to the best ready source automatically (main, then backup, then filler)
    #[arg(long)]
    pub prefer_live: bool,

    /// Seconds between throughput reports
    #[arg(long, default_value = "5")]
    pub report_interval: u64,
}

impl RunCommand {
    pub async fn run(self) -> Result<()> {
        let config = InputConfig::load(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;

        let transport = FfmpegTransport::new(FfmpegTransportConfig {
            io_timeout: Duration::from_millis(self.io_timeout_ms),
            ..Default::default()
        });
        let handler = Arc::new(InputHandler::new(config, Arc::new(transport)));
        handler.open_input()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let stop = Arc::new(AtomicBool::new(false));

        let consumer = {
            let handler = Arc::clone(&handler);
            let stop = Arc::clone(&stop);
            let interval = Duration::from_secs(self.report_interval.max(1));
            tokio::task::spawn_blocking(move || consume(&handler, &stop, interval))
        };

        let supervisor = self
            .prefer_live
            .then(|| tokio::spawn(supervise(Arc::clone(&handler), shutdown_rx)));

        signal::ctrl_c().await?;
        tracing::info!("shutting down");

        stop.store(true, Ordering::Relaxed);
        let _ = shutdown_tx.send(true);
        consumer.await?;
        if let Some(supervisor) = supervisor {
            supervisor.await?;
        }

        let clean = tokio::task::spawn_blocking(move || handler.shutdown()).await?;
        if !clean {
            tracing::warn!("some sources were still blocked in I/O at exit");
        }
        Ok(())
    }
}

/**
    The best ready source, or filler if nothing is ready.
*/
fn preferred_source(handler: &InputHandler) -> SourceKind {
    PREFERENCE
        .into_iter()
        .find(|kind| handler.is_ready(*kind))
        .unwrap_or(SourceKind::Filler)
}

async fn supervise(handler: Arc<InputHandler>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(500));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let best = preferred_source(&handler);
                if best != handler.get_current_input() {
                    handler.input_switch(best);
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

#[derive(Default)]
struct Throughput {
    packets: u64,
    video_packets: u64,
    bytes: u64,
    errors: u64,
}

fn consume(handler: &InputHandler, stop: &AtomicBool, interval: Duration) {
    let mut stats = Throughput::default();
    let mut last_report = Instant::now();

    while !stop.load(Ordering::Relaxed) {
        match handler.read_packet() {
            Ok(packet) => {
                stats.packets += 1;
                stats.bytes += packet.len() as u64;
                if handler.input_demux().map(|s| s.index) == Some(packet.stream_index) {
                    stats.video_packets += 1;
                }
            }
            Err(InputError::Read { source, .. }) if source.is_transient() => {}
            Err(err) => {
                stats.errors += 1;
                tracing::debug!(error = %err, "no packet");
                std::thread::sleep(IDLE_WAIT);
            }
        }

        if last_report.elapsed() >= interval {
            tracing::info!(
                current = %handler.get_current_input(),
                packets = stats.packets,
                video_packets = stats.video_packets,
                bytes = stats.bytes,
                errors = stats.errors,
                "throughput"
            );
            stats = Throughput::default();
            last_report = Instant::now();
        }
    }
}
