/*!
    Stream table types.
*/

use std::fmt;

/**
    The kind of media carried by a stream.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
    /// Subtitles, data, attachments and anything the backend cannot classify.
    Other,
}

impl MediaKind {
    pub const fn is_video(self) -> bool {
        matches!(self, Self::Video)
    }

    pub const fn is_audio(self) -> bool {
        matches!(self, Self::Audio)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Other => "other",
        })
    }
}

/**
    A rational number, used for stream time bases.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /**
        Returns the value as a float, or zero for a zero denominator.
    */
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            0.0
        } else {
            self.num as f64 / self.den as f64
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/**
    One entry in an opened context's stream table.

    Derived once at probe time. The index is stable for the life of the
    context it came from.
*/
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamDescriptor {
    /// 0-based position in the stream table.
    pub index: usize,
    /// Media kind of the stream.
    pub kind: MediaKind,
    /// Codec name as reported by the backend (e.g. "h264").
    pub codec: Option<String>,
    /// Time base for packet timestamps.
    pub time_base: Option<Rational>,
}

impl StreamDescriptor {
    pub fn new(index: usize, kind: MediaKind) -> Self {
        Self {
            index,
            kind,
            codec: None,
            time_base: None,
        }
    }

    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = Some(codec.into());
        self
    }

    pub fn with_time_base(mut self, time_base: Rational) -> Self {
        self.time_base = Some(time_base);
        self
    }
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.index, self.kind)?;
        if let Some(codec) = &self.codec {
            write!(f, " ({codec})")?;
        }
        if let Some(time_base) = self.time_base {
            write!(f, " tb={time_base}")?;
        }
        Ok(())
    }
}
