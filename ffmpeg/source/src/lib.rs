/*!
    FFmpeg-backed media transport for the ffmpeg crate ecosystem.

    This crate handles the input side of the media pipeline. It opens media from
    network streams (RTMP, RTSP, HLS, SRT, UDP) and local files through
    `ffmpeg-next`, and implements the [`ffmpeg_types::Transport`] and
    [`ffmpeg_types::Demuxer`] traits on top of it.
*/

mod convert;
mod source;

pub use source::{FfmpegDemuxer, FfmpegTransport, FfmpegTransportConfig, probe};
