/*!
    Main/backup/filler input switching for live video ingest.

    An [`InputHandler`] owns one acquisition worker per [`SourceKind`]. Each
    worker keeps trying to open and probe its source in the background and
    publishes the result; the consumer picks which source is current with
    [`InputHandler::input_switch`] and reads through the current context.
    A source that is down never stalls the others, it simply never becomes
    ready.

    ```ignore
    let handler = InputHandler::new(config, Arc::new(FfmpegTransport::default()));
    handler.open_input();
    handler.wait_until_ready(SourceKind::Filler, Duration::from_secs(2));
    let video = handler.input_demux();
    ```
*/

mod config;
mod context;
mod error;
mod handler;
pub mod locator;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod worker;

pub use config::{BackoffPolicy, ConfigError, InputConfig};
pub use context::{ContextView, MediaContextHandle};
pub use error::InputError;
pub use handler::InputHandler;
pub use worker::{SourceState, SourceWorker, WorkerPhase};

pub use ffmpeg_types::{
    Demuxer, MediaKind, Packet, Rational, ReadError, SourceConfig, SourceError, SourceKind,
    StreamDescriptor, Transport, TransportError, TransportKind,
};
