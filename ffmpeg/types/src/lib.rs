/*!
    Shared types for the ffmpeg crate ecosystem.

    This crate defines the vocabulary of the ecosystem — the types that cross crate
    boundaries. It has no dependency on FFmpeg, making it lightweight and enabling
    consumers to depend on it without pulling in FFmpeg bindings.

    The [`Transport`] and [`Demuxer`] traits describe the media primitives
    (open, probe, read, close) that a backend such as `ffmpeg-source` provides.
*/

mod error;
mod packet;
mod source;
mod stream;
mod transport;

pub use error::{ParseError, ReadError, SourceError, TransportError};
pub use packet::Packet;
pub use source::{SourceConfig, SourceKind, TransportKind};
pub use stream::{MediaKind, Rational, StreamDescriptor};
pub use transport::{Demuxer, Transport};
