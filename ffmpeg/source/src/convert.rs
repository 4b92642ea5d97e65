/*!
    Conversion utilities between ffmpeg-next types and ffmpeg-types.
*/

use ffmpeg_next::media::Type;

use ffmpeg_types::{MediaKind, Rational, ReadError, TransportError};

/**
    Convert ffmpeg_next::Rational to our Rational.
*/
pub fn rational_from_ffmpeg(r: ffmpeg_next::Rational) -> Rational {
    Rational::new(r.numerator(), r.denominator())
}

/**
    Convert an ffmpeg_next media type to our MediaKind.
*/
pub fn media_kind_from_ffmpeg(medium: Type) -> MediaKind {
    match medium {
        Type::Video => MediaKind::Video,
        Type::Audio => MediaKind::Audio,
        _ => MediaKind::Other,
    }
}

/**
    Convert an ffmpeg_next error into a transport error, keeping its status code.
*/
pub fn transport_error_from_ffmpeg(err: ffmpeg_next::Error) -> TransportError {
    let reason = err.to_string();
    TransportError::new(i32::from(err), reason)
}

/**
    Classify a packet read failure.

    `EAGAIN` is the only condition worth retrying in place; anything else
    leaves the context in an unknown state.
*/
pub fn read_error_from_ffmpeg(err: ffmpeg_next::Error) -> ReadError {
    match err {
        ffmpeg_next::Error::Eof => ReadError::EndOfStream,
        ffmpeg_next::Error::Other {
            errno: ffmpeg_next::util::error::EAGAIN,
        } => ReadError::Transient(transport_error_from_ffmpeg(err)),
        other => ReadError::Fatal(transport_error_from_ffmpeg(other)),
    }
}
