use std::sync::Arc;

use ffmpeg_types::{SourceError, SourceKind};

use crate::context::{ContextView, MediaContextHandle};

/**
    Where a worker is in its acquisition loop.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerPhase {
    /// Not started yet.
    Idle,
    /// Inside the transport's open/probe call.
    Opening,
    /// Holding an open context.
    Ready,
    /// Waiting before the next open attempt.
    Backoff,
    /// Retiring the current context.
    Closing,
    /// Stopped; no context is held.
    Terminated,
}

/**
    A snapshot of one source's health.

    The context is present exactly when the phase is [`WorkerPhase::Ready`].
*/
#[derive(Clone, Debug)]
pub struct SourceState {
    kind: SourceKind,
    phase: WorkerPhase,
    context: Option<Arc<MediaContextHandle>>,
    last_error: Option<SourceError>,
    failures: u32,
    generation: u64,
}

impl SourceState {
    pub(crate) fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            phase: WorkerPhase::Idle,
            context: None,
            last_error: None,
            failures: 0,
            generation: 0,
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn phase(&self) -> WorkerPhase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == WorkerPhase::Ready && self.context.is_some()
    }

    pub fn context(&self) -> Option<ContextView> {
        self.context.as_ref().map(|handle| ContextView::new(Arc::clone(handle)))
    }

    /**
        The error of the most recent failed open, kept after recovery.
    */
    pub fn last_error(&self) -> Option<&SourceError> {
        self.last_error.as_ref()
    }

    /// Number of failed opens since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Number of open attempts made so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn begin_opening(&mut self, generation: u64) {
        self.phase = WorkerPhase::Opening;
        self.context = None;
        self.generation = generation;
    }

    pub(crate) fn set_ready(&mut self, handle: Arc<MediaContextHandle>) {
        self.phase = WorkerPhase::Ready;
        self.context = Some(handle);
        self.failures = 0;
    }

    pub(crate) fn set_backoff(&mut self, error: SourceError) {
        self.phase = WorkerPhase::Backoff;
        self.context = None;
        self.last_error = Some(error);
        self.failures = self.failures.saturating_add(1);
    }

    /**
        Wait before reopening a context that dropped too soon. Not an open
        failure, so the failure count and last error stay as they are.
    */
    pub(crate) fn begin_backoff(&mut self) {
        self.phase = WorkerPhase::Backoff;
        self.context = None;
    }

    /**
        Detach the context so no new reader can pick it up.
    */
    pub(crate) fn begin_closing(&mut self) -> Option<Arc<MediaContextHandle>> {
        self.phase = WorkerPhase::Closing;
        self.context.take()
    }

    pub(crate) fn set_idle(&mut self) {
        self.phase = WorkerPhase::Idle;
        self.context = None;
    }

    pub(crate) fn set_terminated(&mut self) -> Option<Arc<MediaContextHandle>> {
        self.phase = WorkerPhase::Terminated;
        self.context.take()
    }
}
