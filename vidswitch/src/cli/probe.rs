use anyhow::Result;
use clap::Parser;

use vidswitch::locator::{find_first_stream_of, find_first_video_stream};
use vidswitch::{MediaKind, SourceConfig, TransportKind};

#[derive(Parser, Debug)]
pub struct ProbeCommand {
    /// URL or path of the source
    pub location: String,

    /// Transport kind (stream, datagram, file); inferred from the URL if omitted
    #[arg(short, long)]
    pub transport: Option<TransportKind>,
}

impl ProbeCommand {
    pub async fn run(self) -> Result<()> {
        let config = match self.transport {
            Some(transport) => SourceConfig::new(transport, self.location),
            None => SourceConfig::infer(self.location),
        };

        println!("Probing {config}");
        let streams =
            tokio::task::spawn_blocking(move || ffmpeg_source::probe(&config)).await??;

        println!("  {} stream(s)", streams.len());
        for stream in &streams {
            println!("  - {stream}");
        }

        match find_first_video_stream(&streams) {
            Some(video) => println!("Video stream: #{}", video.index),
            None => println!("No video stream"),
        }
        if let Some(audio) = find_first_stream_of(&streams, MediaKind::Audio) {
            println!("Audio stream: #{}", audio.index);
        }
        Ok(())
    }
}
