/*!
    FFmpeg transport implementation.
*/

use std::time::Duration;

use ffmpeg_next::{Dictionary, format::context::Input as InputContext};

use ffmpeg_types::{
    Demuxer, Packet, ReadError, SourceConfig, SourceError, StreamDescriptor, Transport,
    TransportError, TransportKind,
};

use crate::convert::{
    media_kind_from_ffmpeg, rational_from_ffmpeg, read_error_from_ffmpeg,
    transport_error_from_ffmpeg,
};

/// Status code used when the demuxer is asked to work after being closed.
const CLOSED_CODE: i32 = -9; // EBADF

/**
    Configuration for the FFmpeg transport.
*/
#[derive(Clone, Debug)]
pub struct FfmpegTransportConfig {
    /// Upper bound for a single blocking network read or connect.
    pub io_timeout: Duration,
    /// Receive buffer size for datagram sources, in bytes.
    pub datagram_buffer_size: usize,
}

impl Default for FfmpegTransportConfig {
    fn default() -> Self {
        Self {
            io_timeout: Duration::from_secs(5),
            datagram_buffer_size: 4 * 1024 * 1024,
        }
    }
}

/**
    Opens sources through libavformat.
*/
#[derive(Clone, Debug, Default)]
pub struct FfmpegTransport {
    config: FfmpegTransportConfig,
}

impl FfmpegTransport {
    pub fn new(config: FfmpegTransportConfig) -> Self {
        Self { config }
    }

    /**
        Build the libavformat options for a source.

        Network sources get a read/write timeout so that a dead peer can
        not block a worker forever.
    */
    fn options_for(&self, source: &SourceConfig) -> Dictionary<'static> {
        let mut options = Dictionary::new();
        let timeout_us = self.config.io_timeout.as_micros().to_string();
        match source.transport {
            TransportKind::Stream => {
                options.set("rw_timeout", &timeout_us);
            }
            TransportKind::Datagram => {
                options.set("timeout", &timeout_us);
                options.set("buffer_size", &self.config.datagram_buffer_size.to_string());
                options.set("overrun_nonfatal", "1");
            }
            TransportKind::File => {}
        }
        options
    }
}

impl Transport for FfmpegTransport {
    fn open(&self, config: &SourceConfig) -> Result<Box<dyn Demuxer>, TransportError> {
        ffmpeg_next::init().map_err(transport_error_from_ffmpeg)?;

        let location = config
            .location
            .strip_prefix("file://")
            .filter(|_| config.transport == TransportKind::File)
            .unwrap_or(&config.location);

        // input_with_dictionary also runs avformat_find_stream_info
        let input = ffmpeg_next::format::input_with_dictionary(&location, self.options_for(config))
            .map_err(transport_error_from_ffmpeg)?;

        tracing::debug!(location = %config.location, format = input.format().name(), "opened input");

        Ok(Box::new(FfmpegDemuxer { input: Some(input) }))
    }
}

/**
    An opened libavformat input.
*/
pub struct FfmpegDemuxer {
    input: Option<InputContext>,
}

impl FfmpegDemuxer {
    fn input_mut(&mut self) -> Option<&mut InputContext> {
        self.input.as_mut()
    }
}

impl Demuxer for FfmpegDemuxer {
    fn probe(&mut self) -> Result<Vec<StreamDescriptor>, TransportError> {
        let input = self
            .input
            .as_ref()
            .ok_or_else(|| TransportError::new(CLOSED_CODE, "input is closed"))?;

        let streams = input
            .streams()
            .map(|stream| {
                let parameters = stream.parameters();
                let mut descriptor = StreamDescriptor::new(
                    stream.index(),
                    media_kind_from_ffmpeg(parameters.medium()),
                )
                .with_time_base(rational_from_ffmpeg(stream.time_base()));
                let codec = parameters.id();
                if codec != ffmpeg_next::codec::Id::None {
                    descriptor = descriptor.with_codec(codec.name());
                }
                descriptor
            })
            .collect();

        Ok(streams)
    }

    fn read(&mut self) -> Result<Packet, ReadError> {
        let input = self.input_mut().ok_or(ReadError::Closed)?;

        let mut ffmpeg_packet = ffmpeg_next::Packet::empty();
        ffmpeg_packet.read(input).map_err(read_error_from_ffmpeg)?;

        let data = ffmpeg_packet.data().map(|d| d.to_vec()).unwrap_or_default();

        Ok(Packet {
            stream_index: ffmpeg_packet.stream(),
            data,
            pts: ffmpeg_packet.pts(),
            dts: ffmpeg_packet.dts(),
            duration: ffmpeg_packet.duration(),
            is_keyframe: ffmpeg_packet.is_key(),
        })
    }

    fn close(&mut self) {
        // Dropping the context runs avformat_close_input
        self.input.take();
    }
}

/**
    Open a source once, read its stream table and close it again.
*/
pub fn probe(config: &SourceConfig) -> Result<Vec<StreamDescriptor>, SourceError> {
    let transport = FfmpegTransport::default();
    let mut demuxer = transport.open(config).map_err(|source| SourceError::Open {
        location: config.location.clone(),
        source,
    })?;
    let streams = demuxer.probe().map_err(|source| SourceError::Probe {
        location: config.location.clone(),
        source,
    });
    demuxer.close();
    streams
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_sources_get_timeouts() {
        let transport = FfmpegTransport::new(FfmpegTransportConfig {
            io_timeout: Duration::from_millis(1500),
            datagram_buffer_size: 1024,
        });

        let stream = transport.options_for(&SourceConfig::stream("rtmp://host/live"));
        assert_eq!(stream.get("rw_timeout"), Some("1500000"));

        let datagram = transport.options_for(&SourceConfig::datagram("udp://0.0.0.0:1234"));
        assert_eq!(datagram.get("timeout"), Some("1500000"));
        assert_eq!(datagram.get("buffer_size"), Some("1024"));

        let file = transport.options_for(&SourceConfig::file("filler.mp4"));
        assert_eq!(file.get("rw_timeout"), None);
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let err = probe(&SourceConfig::file("/definitely/not/here.mp4")).unwrap_err();
        assert!(matches!(err, SourceError::Open { .. }));
        assert!(err.code() < 0);
    }
}
