/*!
    An in-memory transport driven by per-location scripts.

    Useful for exercising an [`InputHandler`](crate::InputHandler) without
    network or FFmpeg: each location gets a [`SourceScript`] describing how
    opening, probing and reading behave, and the transport counts opens and
    closes so tests can check that every context is released exactly once.
*/

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use ffmpeg_types::{
    Demuxer, MediaKind, Packet, ReadError, SourceConfig, StreamDescriptor, Transport,
    TransportError,
};

/// Status code returned for locations without a script.
pub const NO_SUCH_SOURCE: i32 = -2; // ENOENT

/**
    How one scripted source behaves.
*/
#[derive(Clone, Debug)]
pub struct SourceScript {
    open_failure: Option<i32>,
    probe_failure: Option<i32>,
    streams: Vec<StreamDescriptor>,
    packet_limit: Option<usize>,
    end: ReadError,
    open_delay: Option<Duration>,
    read_delay: Option<Duration>,
}

impl SourceScript {
    /**
        A source that opens and probes to the given stream kinds.
    */
    pub fn with_streams(kinds: &[MediaKind]) -> Self {
        let streams = kinds
            .iter()
            .enumerate()
            .map(|(index, kind)| {
                let codec = match kind {
                    MediaKind::Video => "h264",
                    MediaKind::Audio => "aac",
                    MediaKind::Other => "scte_35",
                };
                StreamDescriptor::new(index, *kind).with_codec(codec)
            })
            .collect();
        Self {
            open_failure: None,
            probe_failure: None,
            streams,
            packet_limit: None,
            end: ReadError::EndOfStream,
            open_delay: None,
            read_delay: None,
        }
    }

    /**
        One video stream at index 0 and one audio stream at index 1.
    */
    pub fn video_and_audio() -> Self {
        Self::with_streams(&[MediaKind::Video, MediaKind::Audio])
    }

    pub fn audio_only() -> Self {
        Self::with_streams(&[MediaKind::Audio])
    }

    pub fn no_streams() -> Self {
        Self::with_streams(&[])
    }

    pub fn failing_open(code: i32) -> Self {
        Self {
            open_failure: Some(code),
            ..Self::video_and_audio()
        }
    }

    pub fn failing_probe(code: i32) -> Self {
        Self {
            probe_failure: Some(code),
            ..Self::video_and_audio()
        }
    }

    /**
        Stop producing packets after `limit` reads.
    */
    pub fn with_packet_limit(mut self, limit: usize) -> Self {
        self.packet_limit = Some(limit);
        self
    }

    /**
        What reads return once the packet limit is used up.
    */
    pub fn ending_with(mut self, end: ReadError) -> Self {
        self.end = end;
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }
}

struct Entry {
    script: SourceScript,
    attempts: usize,
    opens: usize,
    closes: Arc<AtomicUsize>,
}

impl Entry {
    fn new(script: SourceScript) -> Self {
        Self {
            script,
            attempts: 0,
            opens: 0,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/**
    Transport whose sources follow [`SourceScript`]s keyed by location.
*/
#[derive(Default)]
pub struct ScriptedTransport {
    entries: Mutex<HashMap<String, Entry>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(self, location: impl Into<String>, script: SourceScript) -> Self {
        self.set_script(location, script);
        self
    }

    /**
        Replace the script of a location. Takes effect on the next open.
    */
    pub fn set_script(&self, location: impl Into<String>, script: SourceScript) {
        let mut entries = self.entries.lock();
        let location = location.into();
        match entries.get_mut(&location) {
            Some(entry) => entry.script = script,
            None => {
                entries.insert(location, Entry::new(script));
            }
        }
    }

    /**
        Make future opens of `location` fail with `code`, or succeed again
        with `None`.
    */
    pub fn set_open_failure(&self, location: &str, code: Option<i32>) {
        if let Some(entry) = self.entries.lock().get_mut(location) {
            entry.script.open_failure = code;
        }
    }

    /// Number of open calls, successful or not.
    pub fn attempt_count(&self, location: &str) -> usize {
        self.entries.lock().get(location).map_or(0, |e| e.attempts)
    }

    /// Number of demuxers handed out.
    pub fn open_count(&self, location: &str) -> usize {
        self.entries.lock().get(location).map_or(0, |e| e.opens)
    }

    /// Number of demuxers closed.
    pub fn close_count(&self, location: &str) -> usize {
        self.entries
            .lock()
            .get(location)
            .map_or(0, |e| e.closes.load(Ordering::SeqCst))
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, config: &SourceConfig) -> Result<Box<dyn Demuxer>, TransportError> {
        let script = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(&config.location) else {
                return Err(TransportError::new(NO_SUCH_SOURCE, "No such file or directory"));
            };
            entry.attempts += 1;
            entry.script.clone()
        };

        if let Some(delay) = script.open_delay {
            thread::sleep(delay);
        }
        if let Some(code) = script.open_failure {
            return Err(TransportError::new(code, "scripted open failure"));
        }

        let closes = {
            let mut entries = self.entries.lock();
            let Some(entry) = entries.get_mut(&config.location) else {
                return Err(TransportError::new(NO_SUCH_SOURCE, "No such file or directory"));
            };
            entry.opens += 1;
            Arc::clone(&entry.closes)
        };

        Ok(Box::new(ScriptedDemuxer {
            remaining: script.packet_limit,
            script,
            sequence: 0,
            closes,
            closed: false,
        }))
    }
}

struct ScriptedDemuxer {
    script: SourceScript,
    remaining: Option<usize>,
    sequence: i64,
    closes: Arc<AtomicUsize>,
    closed: bool,
}

impl Demuxer for ScriptedDemuxer {
    fn probe(&mut self) -> Result<Vec<StreamDescriptor>, TransportError> {
        match self.script.probe_failure {
            Some(code) => Err(TransportError::new(code, "scripted probe failure")),
            None => Ok(self.script.streams.clone()),
        }
    }

    fn read(&mut self) -> Result<Packet, ReadError> {
        if self.closed {
            return Err(ReadError::Closed);
        }
        if let Some(delay) = self.script.read_delay {
            thread::sleep(delay);
        }
        if self.script.streams.is_empty() || self.remaining == Some(0) {
            return Err(self.script.end.clone());
        }
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }

        let stream_index = self.sequence as usize % self.script.streams.len();
        let mut packet = Packet::new(stream_index, vec![0; 16]);
        packet.pts = Some(self.sequence);
        packet.dts = Some(self.sequence);
        packet.duration = 1;
        packet.is_keyframe = self.sequence % 25 == 0;
        self.sequence += 1;
        Ok(packet)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_location_fails_to_open() {
        let transport = ScriptedTransport::new();
        let err = transport.open(&SourceConfig::file("missing.mp4")).err().unwrap();
        assert_eq!(err.code, NO_SUCH_SOURCE);
    }

    #[test]
    fn counts_attempts_opens_and_closes() {
        let transport =
            ScriptedTransport::new().with_source("a", SourceScript::failing_open(-5));
        assert!(transport.open(&SourceConfig::file("a")).is_err());

        transport.set_open_failure("a", None);
        let mut demuxer = transport.open(&SourceConfig::file("a")).unwrap();
        demuxer.close();
        demuxer.close();

        assert_eq!(transport.attempt_count("a"), 2);
        assert_eq!(transport.open_count("a"), 1);
        assert_eq!(transport.close_count("a"), 1);
    }

    #[test]
    fn packets_cycle_through_streams() {
        let transport = ScriptedTransport::new().with_source(
            "a",
            SourceScript::with_streams(&[MediaKind::Video, MediaKind::Audio, MediaKind::Other]),
        );
        let mut demuxer = transport.open(&SourceConfig::file("a")).unwrap();
        let indices: Vec<_> = (0..4).map(|_| demuxer.read().unwrap().stream_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 0]);
    }

    #[test]
    fn custom_end_behaviour() {
        let fatal = ReadError::Fatal(TransportError::new(-104, "Connection reset by peer"));
        let transport = ScriptedTransport::new().with_source(
            "a",
            SourceScript::video_and_audio()
                .with_packet_limit(1)
                .ending_with(fatal.clone()),
        );
        let mut demuxer = transport.open(&SourceConfig::stream("a")).unwrap();
        assert!(demuxer.read().is_ok());
        assert_eq!(demuxer.read(), Err(fatal));
    }
}
