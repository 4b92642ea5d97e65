/*!
    Source identity and configuration.
*/

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseError;

/**
    One of the three candidate media sources.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SourceKind {
    /// The primary live feed.
    Main = 0,
    /// The backup live feed.
    Backup = 1,
    /// The local filler file, used when no live source is ready.
    Filler = 2,
}

impl SourceKind {
    /// All kinds in slot order.
    pub const ALL: [SourceKind; 3] = [Self::Main, Self::Backup, Self::Filler];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /**
        Converts a slot value back into a kind.
    */
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Main),
            1 => Some(Self::Backup),
            2 => Some(Self::Filler),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Backup => "backup",
            Self::Filler => "filler",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "main" => Ok(Self::Main),
            "backup" => Ok(Self::Backup),
            "filler" => Ok(Self::Filler),
            _ => Err(ParseError {
                kind: "source kind",
                value: s.to_string(),
            }),
        }
    }
}

/**
    How a source is reached.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Connection-oriented network stream (RTMP, RTSP, HTTP, HLS, SRT).
    Stream,
    /// Datagram stream (UDP, RTP multicast).
    Datagram,
    /// Local file path.
    File,
}

impl TransportKind {
    /**
        Infers the transport kind from a location's URL scheme.

        Locations without a scheme, and `file:` URLs, are local files.
    */
    pub fn infer(location: &str) -> Self {
        let Some((scheme, _)) = location.split_once("://") else {
            return Self::File;
        };
        match scheme.to_ascii_lowercase().as_str() {
            "udp" | "rtp" => Self::Datagram,
            "file" => Self::File,
            _ => Self::Stream,
        }
    }

    pub const fn is_network(self) -> bool {
        !matches!(self, Self::File)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stream => "stream",
            Self::Datagram => "datagram",
            Self::File => "file",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stream" => Ok(Self::Stream),
            "datagram" => Ok(Self::Datagram),
            "file" => Ok(Self::File),
            _ => Err(ParseError {
                kind: "transport kind",
                value: s.to_string(),
            }),
        }
    }
}

/**
    Where a source lives and how to reach it.

    When deserialized without a `transport` field, the kind is inferred
    from the location.
*/
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "SourceConfigRepr")]
pub struct SourceConfig {
    pub transport: TransportKind,
    pub location: String,
}

impl SourceConfig {
    pub fn new(transport: TransportKind, location: impl Into<String>) -> Self {
        Self {
            transport,
            location: location.into(),
        }
    }

    pub fn stream(location: impl Into<String>) -> Self {
        Self::new(TransportKind::Stream, location)
    }

    pub fn datagram(location: impl Into<String>) -> Self {
        Self::new(TransportKind::Datagram, location)
    }

    pub fn file(location: impl Into<String>) -> Self {
        Self::new(TransportKind::File, location)
    }

    /**
        Creates a config whose transport kind is inferred from the location.
    */
    pub fn infer(location: impl Into<String>) -> Self {
        let location = location.into();
        Self {
            transport: TransportKind::infer(&location),
            location,
        }
    }
}

impl fmt::Display for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.transport, self.location)
    }
}

#[derive(Deserialize)]
struct SourceConfigRepr {
    #[serde(default)]
    transport: Option<TransportKind>,
    location: String,
}

impl From<SourceConfigRepr> for SourceConfig {
    fn from(repr: SourceConfigRepr) -> Self {
        match repr.transport {
            Some(transport) => Self::new(transport, repr.location),
            None => Self::infer(repr.location),
        }
    }
}
