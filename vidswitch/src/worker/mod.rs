/*!
    Per-source acquisition workers.

    Each worker runs on its own thread: open and probe, publish the context,
    wait until told to reopen or stop, retire the context, repeat. Failed
    attempts are recorded and retried after the configured backoff, forever.
*/

mod signal;
mod state;

use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use ffmpeg_types::{SourceConfig, SourceKind, Transport};

use crate::config::BackoffPolicy;
use crate::context::MediaContextHandle;

use signal::{Signal, Wake};

pub use state::{SourceState, WorkerPhase};

/// A context retired sooner than this, or without delivering a packet,
/// counts as a failed attempt.
const MIN_HEALTHY_LIFETIME: Duration = Duration::from_secs(1);

/// Published state plus the run that is allowed to publish it.
struct StateCell {
    run: u64,
    state: SourceState,
}

struct Shared {
    kind: SourceKind,
    config: SourceConfig,
    transport: Arc<dyn Transport>,
    backoff: BackoffPolicy,
    cell: Mutex<StateCell>,
    changed: Condvar,
    signal: Mutex<Arc<Signal>>,
}

impl Shared {
    /**
        Apply `update` if `run` is still the current run.

        A thread detached by a timed-out stop keeps running until the
        transport returns; this is what stops it from clobbering the state
        of a later run.
    */
    fn publish<R>(&self, run: u64, update: impl FnOnce(&mut SourceState) -> R) -> Option<R> {
        let mut cell = self.cell.lock();
        if cell.run != run {
            return None;
        }
        let result = update(&mut cell.state);
        drop(cell);
        self.changed.notify_all();
        Some(result)
    }

    fn generation(&self) -> u64 {
        self.cell.lock().state.generation()
    }
}

struct Running {
    handle: JoinHandle<()>,
    exited: mpsc::Receiver<()>,
    signal: Arc<Signal>,
    run: u64,
}

/**
    Keeps one source open in the background.
*/
pub struct SourceWorker {
    shared: Arc<Shared>,
    stop_timeout: Duration,
    thread: Mutex<Option<Running>>,
}

impl SourceWorker {
    pub fn new(
        kind: SourceKind,
        config: SourceConfig,
        transport: Arc<dyn Transport>,
        backoff: BackoffPolicy,
        stop_timeout: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                kind,
                config,
                transport,
                backoff,
                cell: Mutex::new(StateCell {
                    run: 0,
                    state: SourceState::new(kind),
                }),
                changed: Condvar::new(),
                signal: Mutex::new(Arc::new(Signal::new())),
            }),
            stop_timeout,
            thread: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> SourceKind {
        self.shared.kind
    }

    pub fn config(&self) -> &SourceConfig {
        &self.shared.config
    }

    /**
        Start the acquisition thread.

        Returns `Ok(false)` without doing anything if the thread is already
        running. After [`stop`](Self::stop) the worker starts afresh.
    */
    pub fn start(&self) -> io::Result<bool> {
        let mut slot = self.thread.lock();
        if let Some(running) = slot.as_ref() {
            if !running.handle.is_finished() {
                return Ok(false);
            }
        }
        if let Some(finished) = slot.take() {
            if finished.handle.join().is_err() {
                tracing::error!(source = %self.kind(), "acquisition thread panicked");
            }
        }

        let signal = Arc::new(Signal::new());
        let run = {
            let mut cell = self.shared.cell.lock();
            cell.run += 1;
            cell.state.set_idle();
            cell.run
        };
        *self.shared.signal.lock() = Arc::clone(&signal);

        let (exited_tx, exited) = mpsc::channel::<()>();
        let handle = {
            let shared = Arc::clone(&self.shared);
            let signal = Arc::clone(&signal);
            thread::Builder::new()
                .name(format!("vidswitch-{}", self.kind()))
                .spawn(move || {
                    // Dropped on exit, including unwinding
                    let _exited = exited_tx;
                    acquisition_loop(&shared, &signal, run);
                })?
        };

        tracing::debug!(source = %self.kind(), run, "started worker");

        *slot = Some(Running {
            handle,
            exited,
            signal,
            run,
        });
        Ok(true)
    }

    pub fn is_running(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /**
        Cancel the acquisition thread and wait for it to exit.

        Waits at most the configured stop timeout. A thread still blocked in
        the transport after that is detached: its state is marked terminated
        right away, and the thread closes whatever it opened once the
        transport returns. Returns false in that case.
    */
    pub fn stop(&self) -> bool {
        let mut slot = self.thread.lock();
        let Some(running) = slot.take() else {
            return true;
        };

        running.signal.cancel();

        match running.exited.recv_timeout(self.stop_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if running.handle.join().is_err() {
                    tracing::error!(source = %self.kind(), "acquisition thread panicked");
                }
                // Covers a thread that died before cleaning up
                let leftover = self.shared.publish(running.run, |state| state.set_terminated());
                if let Some(Some(handle)) = leftover {
                    handle.close();
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(
                    source = %self.kind(),
                    timeout_ms = self.stop_timeout.as_millis() as u64,
                    "worker did not stop in time, detaching it"
                );
                let leftover = {
                    let mut cell = self.shared.cell.lock();
                    cell.run += 1;
                    cell.state.set_terminated()
                };
                self.shared.changed.notify_all();
                if let Some(handle) = leftover {
                    handle.close();
                }
                false
            }
        }
    }

    pub fn state(&self) -> SourceState {
        self.shared.cell.lock().state.clone()
    }

    /**
        Ask the worker to retire and reopen the context of `generation`.

        Ignored unless that context is still the current one.
    */
    pub fn request_reopen(&self, generation: u64) {
        if self.shared.generation() == generation {
            self.shared.signal.lock().request_reopen(generation);
        }
    }

    /**
        Block until `predicate` holds for the published state or `timeout`
        passes. Returns whether the predicate held.
    */
    pub fn wait_for(&self, timeout: Duration, mut predicate: impl FnMut(&SourceState) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut cell = self.shared.cell.lock();
        loop {
            if predicate(&cell.state) {
                return true;
            }
            if self.shared.changed.wait_until(&mut cell, deadline).timed_out() {
                return predicate(&cell.state);
            }
        }
    }
}

impl Drop for SourceWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn acquisition_loop(shared: &Shared, signal: &Signal, run: u64) {
    let kind = shared.kind;
    let mut generation = shared.generation();
    let mut failures: u32 = 0;

    while !signal.is_cancelled() {
        generation += 1;
        if shared
            .publish(run, |state| state.begin_opening(generation))
            .is_none()
        {
            break;
        }

        let opened =
            MediaContextHandle::open(shared.transport.as_ref(), kind, &shared.config, generation);

        let handle = match opened {
            Ok(handle) => Arc::new(handle),
            Err(err) => {
                failures = failures.saturating_add(1);
                tracing::warn!(source = %kind, attempt = failures, error = %err, "open failed");
                if shared.publish(run, |state| state.set_backoff(err)).is_none() {
                    break;
                }
                let delay = shared.backoff.delay(failures);
                tracing::debug!(source = %kind, delay_ms = delay.as_millis() as u64, "backing off");
                if !signal.sleep(delay) {
                    break;
                }
                continue;
            }
        };

        if signal.is_cancelled()
            || shared
                .publish(run, |state| state.set_ready(Arc::clone(&handle)))
                .is_none()
        {
            handle.close();
            break;
        }

        let ready_at = Instant::now();
        tracing::info!(
            source = %kind,
            location = %shared.config.location,
            generation,
            streams = handle.streams().len(),
            "source ready"
        );

        if signal.wait_for_reopen(generation) == Wake::Cancelled {
            break;
        }
        shared.publish(run, |state| state.begin_closing());
        handle.close();

        if handle.packets_read() > 0 && ready_at.elapsed() >= MIN_HEALTHY_LIFETIME {
            failures = 0;
            tracing::info!(source = %kind, generation, "reopening source");
            continue;
        }

        failures = failures.saturating_add(1);
        let delay = shared.backoff.delay(failures);
        tracing::warn!(
            source = %kind,
            generation,
            attempt = failures,
            packets = handle.packets_read(),
            delay_ms = delay.as_millis() as u64,
            "source dropped right after opening, backing off"
        );
        if shared.publish(run, |state| state.begin_backoff()).is_none() || !signal.sleep(delay) {
            break;
        }
    }

    if let Some(Some(handle)) = shared.publish(run, |state| state.begin_closing()) {
        handle.close();
    }
    shared.publish(run, |state| state.set_terminated());
    tracing::debug!(source = %kind, run, "worker terminated");
}
