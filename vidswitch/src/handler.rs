/*!
    The consumer-facing input handler.
*/

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use ffmpeg_types::{Packet, SourceKind, StreamDescriptor, Transport};

use crate::config::InputConfig;
use crate::context::ContextView;
use crate::error::InputError;
use crate::locator;
use crate::worker::{SourceState, SourceWorker};

/**
    Owns the main, backup and filler workers and the current selection.

    Every consumer-facing call is synchronous and never waits on I/O; at
    most it takes a worker's state lock for the time it needs to clone a
    snapshot. The selection starts at [`SourceKind::Filler`] and only changes
    through [`input_switch`](Self::input_switch); workers becoming ready
    never change it.
*/
pub struct InputHandler {
    workers: [SourceWorker; 3],
    current: AtomicU8,
}

impl InputHandler {
    /**
        Create a handler. No I/O happens until [`open_input`](Self::open_input).
    */
    pub fn new(config: InputConfig, transport: Arc<dyn Transport>) -> Self {
        let workers = SourceKind::ALL.map(|kind| {
            SourceWorker::new(
                kind,
                config.source(kind).clone(),
                Arc::clone(&transport),
                config.backoff,
                config.stop_timeout(),
            )
        });

        Self {
            workers,
            current: AtomicU8::new(SourceKind::Filler.as_u8()),
        }
    }

    fn worker(&self, kind: SourceKind) -> &SourceWorker {
        &self.workers[kind.index()]
    }

    /**
        Start every worker that is not already running.

        Returns how many were started; repeated calls while the workers run
        return 0 and leave them untouched.
    */
    pub fn open_input(&self) -> io::Result<usize> {
        let mut started = 0;
        for worker in &self.workers {
            if worker.start()? {
                started += 1;
            }
        }
        if started > 0 {
            tracing::info!(started, current = %self.get_current_input(), "opened input");
        }
        Ok(started)
    }

    pub fn get_current_input(&self) -> SourceKind {
        // Only valid kinds are ever stored
        SourceKind::from_u8(self.current.load(Ordering::Acquire)).unwrap_or(SourceKind::Filler)
    }

    /**
        Make `kind` the current source and return a view of its context.

        The switch always happens, even to a source that is not ready; the
        result is then `None` until that source comes up.
    */
    pub fn input_switch(&self, kind: SourceKind) -> Option<ContextView> {
        let previous = SourceKind::from_u8(self.current.swap(kind.as_u8(), Ordering::AcqRel));
        let context = self.worker(kind).state().context();

        if previous != Some(kind) {
            tracing::info!(
                from = previous.map(SourceKind::as_str),
                to = %kind,
                ready = context.is_some(),
                "switched input"
            );
        }
        context
    }

    /**
        The context of the current source, if it has one.
    */
    pub fn get_input_format_context(&self) -> Option<ContextView> {
        self.worker(self.get_current_input()).state().context()
    }

    /**
        The first video stream of the current context.

        Returns `None` when the current source has no context, or when its
        context has no video stream (audio-only sources included).
    */
    pub fn input_demux(&self) -> Option<StreamDescriptor> {
        locator::locate_video_stream(self.get_input_format_context().as_ref())
    }

    /**
        Like [`input_demux`](Self::input_demux), but says why nothing was found.
    */
    pub fn try_input_demux(&self) -> Result<StreamDescriptor, InputError> {
        let kind = self.get_current_input();
        let context = self
            .worker(kind)
            .state()
            .context()
            .ok_or(InputError::NoContextAvailable(kind))?;
        locator::find_first_video_stream(context.streams())
            .cloned()
            .ok_or(InputError::NoStreamFound(kind))
    }

    /**
        Read the next packet from the current source.

        A fatal error or end of stream makes that source's worker reopen it;
        for the filler file this means playback loops. The error is still
        returned so the consumer can decide to switch.
    */
    pub fn read_packet(&self) -> Result<Packet, InputError> {
        let context = self
            .get_input_format_context()
            .ok_or_else(|| InputError::NoContextAvailable(self.get_current_input()))?;
        let kind = context.kind();

        context.read_packet().map_err(|source| {
            if source.needs_reopen() {
                tracing::debug!(source = %kind, error = %source, "requesting reopen");
                self.worker(kind).request_reopen(context.generation());
            }
            InputError::Read { kind, source }
        })
    }

    pub fn source_state(&self, kind: SourceKind) -> SourceState {
        self.worker(kind).state()
    }

    pub fn is_ready(&self, kind: SourceKind) -> bool {
        self.source_state(kind).is_ready()
    }

    /**
        Block until `kind` is ready or `timeout` passes.
    */
    pub fn wait_until_ready(&self, kind: SourceKind, timeout: Duration) -> bool {
        self.worker(kind).wait_for(timeout, SourceState::is_ready)
    }

    /**
        Stop all workers and close their contexts.

        Returns false if any worker had to be detached. The handler can be
        opened again afterwards.
    */
    pub fn shutdown(&self) -> bool {
        let mut clean = true;
        for worker in &self.workers {
            clean &= worker.stop();
        }
        tracing::info!(clean, "input shut down");
        clean
    }
}

impl Drop for InputHandler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
