use thiserror::Error;

/**
    Failure reported by a transport primitive.

    `code` is the backend's status code (negative on failure). It is kept
    opaque; callers only distinguish success from failure.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} (code {code})")]
pub struct TransportError {
    pub code: i32,
    pub reason: String,
}

impl TransportError {
    pub fn new(code: i32, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/**
    Errors from establishing a source context.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The source is unreachable or misconfigured.
    #[error("failed to open '{location}': {source}")]
    Open {
        location: String,
        source: TransportError,
    },

    /// The source opened but its metadata is unusable.
    #[error("failed to probe '{location}': {source}")]
    Probe {
        location: String,
        source: TransportError,
    },
}

impl SourceError {
    pub fn code(&self) -> i32 {
        match self {
            Self::Open { source, .. } | Self::Probe { source, .. } => source.code,
        }
    }

    pub fn is_probe(&self) -> bool {
        matches!(self, Self::Probe { .. })
    }
}

/**
    Errors from reading a packet.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("end of stream")]
    EndOfStream,

    /// Temporary hiccup; reading again may succeed.
    #[error("transient read error: {0}")]
    Transient(TransportError),

    /// The context is unusable and must be reopened.
    #[error("fatal read error: {0}")]
    Fatal(TransportError),

    /// The context was closed; fetch the current one again.
    #[error("context is closed")]
    Closed,
}

impl ReadError {
    /**
        Returns true if the context has to be reopened before reading again.
    */
    pub fn needs_reopen(&self) -> bool {
        matches!(self, Self::EndOfStream | Self::Fatal(_))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/**
    Error returned by `FromStr` implementations on enum types.
*/
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}
