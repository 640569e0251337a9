// SPDX-License-Identifier: AGPL-3.0-or-later

//! Completion bridge.
//!
//! The trading engine reports the outcome of a mutating call through exactly
//! one success callback or exactly one error callback, fired from the
//! engine's own single-threaded execution context. [`completion`] adapts
//! that pair into a value a caller off that thread can consume exactly once:
//!
//! - the engine side receives a [`Completer`] and fires [`Completer::succeed`]
//!   or [`Completer::fail`];
//! - the caller side holds the matching [`Completion`] and either awaits
//!   [`Completion::resolve`] (future mode) or blocks on [`Completion::wait`]
//!   (blocking mode), both bounded by a deadline.
//!
//! Resolution happens at most once. A second callback (an engine bug) and a
//! callback arriving after the caller timed out are both discarded; no
//! cancellation is propagated into the engine, the underlying operation runs
//! to completion either way.

use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

/// Deadline applied to bridged engine calls.
pub const ENGINE_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a bridged engine call, before classification.
#[derive(Debug)]
pub enum EngineFailure {
    /// Neither callback fired within the deadline.
    Timeout,
    /// The engine dropped its completer without firing either callback.
    Abandoned,
    /// The engine error callback fired with this free-text message.
    Message(String),
}

type Outcome<T> = Result<T, String>;

/// Create a linked completer/completion pair with an empty one-shot slot.
pub fn completion<T>() -> (Completer<T>, Completion<T>) {
    // Buffer of one so the engine thread never blocks on delivery, even when
    // the caller already timed out and went away.
    let (tx, rx) = mpsc::sync_channel(1);
    let completer = Completer {
        slot: Arc::new(Mutex::new(Some(tx))),
    };
    (completer, Completion { rx })
}

/// Engine-side handle: fires the success or error callback into the slot.
pub struct Completer<T> {
    slot: Arc<Mutex<Option<mpsc::SyncSender<Outcome<T>>>>>,
}

impl<T> Clone for Completer<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Completer<T> {
    /// Success callback. A duplicate invocation is discarded.
    pub fn succeed(&self, value: T) {
        self.deliver(Ok(value));
    }

    /// Error callback carrying the engine's free-text message. A duplicate
    /// invocation is discarded.
    pub fn fail(&self, message: impl Into<String>) {
        self.deliver(Err(message.into()));
    }

    fn deliver(&self, outcome: Outcome<T>) {
        let sender = self
            .slot
            .lock()
            .expect("completion slot lock poisoned")
            .take();
        match sender {
            // try_send: the receiver may have timed out and dropped; a late
            // completion must not block or fail the engine thread.
            Some(tx) => {
                if tx.try_send(outcome).is_err() {
                    tracing::debug!("engine completion arrived after caller gave up, discarded");
                }
            }
            None => tracing::debug!("duplicate engine completion discarded"),
        }
    }
}

/// Caller-side handle: resolves the slot exactly once.
pub struct Completion<T> {
    rx: mpsc::Receiver<Outcome<T>>,
}

impl<T: Send + 'static> Completion<T> {
    /// Blocking mode: park the calling thread on the slot until a callback
    /// fires or `timeout` elapses.
    pub fn wait(self, timeout: Duration) -> Result<T, EngineFailure> {
        match self.rx.recv_timeout(timeout) {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(EngineFailure::Message(message)),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(EngineFailure::Timeout),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineFailure::Abandoned),
        }
    }

    /// Future mode: same slot, awaited off the async runtime's worker
    /// threads. Bounded by [`ENGINE_CALL_TIMEOUT`].
    pub async fn resolve(self) -> Result<T, EngineFailure> {
        self.resolve_within(ENGINE_CALL_TIMEOUT).await
    }

    /// Future mode with an explicit deadline.
    pub async fn resolve_within(self, timeout: Duration) -> Result<T, EngineFailure> {
        match tokio::task::spawn_blocking(move || self.wait(timeout)).await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                tracing::error!("completion wait task failed: {join_error}");
                Err(EngineFailure::Abandoned)
            }
        }
    }
}
