/*!
    Opened source contexts.
*/

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

use ffmpeg_types::{
    Demuxer, Packet, ReadError, SourceConfig, SourceError, SourceKind, StreamDescriptor,
    Transport,
};

use crate::locator;

/**
    One successfully opened and probed source.

    The handle owns its demuxer. The stream table is read once at probe time
    and never changes. Reads and [`close`](Self::close) serialize on the same
    lock, so a context is never closed underneath an in-flight read; a read
    that starts after closing fails with [`ReadError::Closed`]. Status
    queries never take that lock.
*/
pub struct MediaContextHandle {
    kind: SourceKind,
    location: String,
    generation: u64,
    streams: Vec<StreamDescriptor>,
    demuxer: Mutex<Option<Box<dyn Demuxer>>>,
    closed: AtomicBool,
    packets: AtomicU64,
}

impl MediaContextHandle {
    /**
        Open and probe a source.

        If probing fails the demuxer is closed before the error is returned,
        so nothing stays allocated on either failure path.
    */
    pub fn open(
        transport: &dyn Transport,
        kind: SourceKind,
        config: &SourceConfig,
        generation: u64,
    ) -> Result<Self, SourceError> {
        let mut demuxer = transport.open(config).map_err(|source| SourceError::Open {
            location: config.location.clone(),
            source,
        })?;

        let streams = match demuxer.probe() {
            Ok(streams) => streams,
            Err(source) => {
                demuxer.close();
                return Err(SourceError::Probe {
                    location: config.location.clone(),
                    source,
                });
            }
        };

        Ok(Self {
            kind,
            location: config.location.clone(),
            generation,
            streams,
            demuxer: Mutex::new(Some(demuxer)),
            closed: AtomicBool::new(false),
            packets: AtomicU64::new(0),
        })
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /**
        Which open attempt of its worker produced this context.
    */
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn streams(&self) -> &[StreamDescriptor] {
        &self.streams
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Number of packets read successfully so far.
    pub fn packets_read(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn read_packet(&self) -> Result<Packet, ReadError> {
        let packet = match self.demuxer.lock().as_mut() {
            Some(demuxer) => demuxer.read()?,
            None => return Err(ReadError::Closed),
        };
        self.packets.fetch_add(1, Ordering::Relaxed);
        Ok(packet)
    }

    /**
        Release the demuxer. Safe to call more than once.
    */
    pub fn close(&self) {
        let demuxer = self.demuxer.lock().take();
        self.closed.store(true, Ordering::Release);
        if let Some(mut demuxer) = demuxer {
            demuxer.close();
            tracing::debug!(
                source = %self.kind,
                generation = self.generation,
                "closed context"
            );
        }
    }
}

impl Drop for MediaContextHandle {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for MediaContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaContextHandle")
            .field("kind", &self.kind)
            .field("location", &self.location)
            .field("generation", &self.generation)
            .field("streams", &self.streams.len())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/**
    A read-only view of a source's context, handed to the consumer.

    The view keeps the underlying handle alive, but the owning worker may
    still close it when the source is reopened or shut down. Reads through a
    stale view fail with [`ReadError::Closed`]; fetch a fresh view from the
    handler when that happens.
*/
#[derive(Clone, Debug)]
pub struct ContextView {
    handle: Arc<MediaContextHandle>,
}

impl ContextView {
    pub(crate) fn new(handle: Arc<MediaContextHandle>) -> Self {
        Self { handle }
    }

    pub fn kind(&self) -> SourceKind {
        self.handle.kind()
    }

    pub fn location(&self) -> &str {
        self.handle.location()
    }

    pub fn generation(&self) -> u64 {
        self.handle.generation()
    }

    pub fn streams(&self) -> &[StreamDescriptor] {
        self.handle.streams()
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_open()
    }

    pub fn packets_read(&self) -> u64 {
        self.handle.packets_read()
    }

    /**
        The first video stream of this context, if any.
    */
    pub fn video_stream(&self) -> Option<&StreamDescriptor> {
        locator::find_first_video_stream(self.streams())
    }

    pub fn read_packet(&self) -> Result<Packet, ReadError> {
        self.handle.read_packet()
    }

    /**
        Returns true if both views point at the same opened context.
    */
    pub fn same_context(&self, other: &ContextView) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }
}
