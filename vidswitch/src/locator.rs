/*!
    Stream discovery within an opened context.

    Selection is positional: the first stream of the wanted kind in table
    order wins, with no quality heuristic. A context without a video stream
    yields nothing, even when it carries audio.
*/

use ffmpeg_types::{MediaKind, StreamDescriptor};

use crate::ContextView;

/**
    Returns the first video stream in the table, or `None` if there is none.
*/
pub fn find_first_video_stream(streams: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    find_first_stream_of(streams, MediaKind::Video)
}

/**
    Returns the first stream of the given kind in table order.
*/
pub fn find_first_stream_of(
    streams: &[StreamDescriptor],
    kind: MediaKind,
) -> Option<&StreamDescriptor> {
    streams.iter().find(|stream| stream.kind == kind)
}

/**
    Locate the video stream of a possibly missing context.
*/
pub fn locate_video_stream(context: Option<&ContextView>) -> Option<StreamDescriptor> {
    context.and_then(|view| find_first_video_stream(view.streams()).cloned())
}
