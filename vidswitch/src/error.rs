use thiserror::Error;

use ffmpeg_types::{ReadError, SourceKind};

/**
    Errors reported to the consumer of an [`InputHandler`](crate::InputHandler).

    None of these are fatal; the consumer decides whether to switch sources.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// The selected source has no open context.
    #[error("no context available for {0}")]
    NoContextAvailable(SourceKind),

    /// The selected source's context has no video stream.
    #[error("no video stream found in {0}")]
    NoStreamFound(SourceKind),

    #[error("read from {kind} failed: {source}")]
    Read { kind: SourceKind, source: ReadError },
}

impl InputError {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::NoContextAvailable(kind) | Self::NoStreamFound(kind) => *kind,
            Self::Read { kind, .. } => *kind,
        }
    }
}
