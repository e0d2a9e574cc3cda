//! Multi-session runtime
//!
//! Each session runs in its own tokio task and owns its [`Session`]
//! exclusively, so cycles of one session are strictly sequential while
//! independent sessions proceed in parallel.
//!
//! ```text
//!  SessionHandle ─mpsc─▶ task(Session) ─┐
//!  SessionHandle ─mpsc─▶ task(Session) ─┼─▶ result queue ─▶ ResultReceiver
//!  SessionHandle ─mpsc─▶ task(Session) ─┘   (bounded)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let (runtime, mut results) = SessionRuntime::new(RuntimeConfig::default());
//! let handle = runtime.open(SessionConfig::default())?;
//!
//! handle.push(sample).await?;
//! while let Some(event) = results.recv().await {
//!     match event {
//!         SessionEvent::Cycle { session_id, result } => { ... }
//!         SessionEvent::Error { session_id, error } => { ... }
//!         SessionEvent::Ended { session_id, cycles } => { ... }
//!     }
//! }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use venturi_core::config::SessionConfig;
use venturi_core::error::ConfigError;
use venturi_core::types::EegSample;

use crate::clock::{Clock, MonotonicClock};
use crate::error::{CycleError, RuntimeError, RuntimeResult};
use crate::session::{CycleOutcome, CycleResult, Session};

/// What happens when the result consumer falls behind
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// Session tasks wait for queue capacity
    #[default]
    Block,
    /// The oldest unread results are overwritten and counted
    DropOldest,
}

/// Runtime queue sizing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Samples buffered per session before `push` waits
    pub ingest_capacity: usize,
    /// Results buffered across all sessions.
    ///
    /// Under [`BackpressurePolicy::DropOldest`] the queue rounds this up to
    /// the next power of two, so 1000 retains up to 1024 unread results.
    pub result_capacity: usize,
    /// Behaviour of a full result queue
    pub backpressure: BackpressurePolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            ingest_capacity: 256,
            result_capacity: 1024,
            backpressure: BackpressurePolicy::Block,
        }
    }
}

/// Event emitted by a session task
#[derive(Clone, Debug)]
#[allow(clippy::large_enum_variant)]
pub enum SessionEvent {
    /// A cycle completed
    Cycle {
        /// Emitting session
        session_id: Uuid,
        /// Cycle output
        result: CycleResult,
    },
    /// A cycle was rejected; the session continues
    Error {
        /// Emitting session
        session_id: Uuid,
        /// Why the cycle was rejected
        error: CycleError,
    },
    /// The session ended and released its state
    Ended {
        /// Emitting session
        session_id: Uuid,
        /// Cycles completed over the session's life
        cycles: u64,
    },
}

impl SessionEvent {
    /// Session that emitted this event
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        match self {
            Self::Cycle { session_id, .. } | Self::Error { session_id, .. } | Self::Ended { session_id, .. } => {
                *session_id
            }
        }
    }
}

#[derive(Clone)]
enum ResultSender {
    Block(mpsc::Sender<SessionEvent>),
    DropOldest(broadcast::Sender<SessionEvent>),
}

impl ResultSender {
    /// Deliver an event; `false` once the receiver is gone
    async fn send(&self, event: SessionEvent) -> bool {
        match self {
            Self::Block(tx) => tx.send(event).await.is_ok(),
            Self::DropOldest(tx) => tx.send(event).is_ok(),
        }
    }
}

enum ReceiverInner {
    Block(mpsc::Receiver<SessionEvent>),
    DropOldest(broadcast::Receiver<SessionEvent>),
}

/// Consumer end of the result queue
pub struct ResultReceiver {
    inner: ReceiverInner,
    dropped: u64,
}

impl ResultReceiver {
    /// Next event, or `None` once the runtime and every session are gone
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        match &mut self.inner {
            ReceiverInner::Block(rx) => rx.recv().await,
            ReceiverInner::DropOldest(rx) => loop {
                match rx.recv().await {
                    Ok(event) => return Some(event),
                    Err(RecvError::Lagged(n)) => {
                        self.dropped += n;
                        warn!(dropped = n, total = self.dropped, "Result consumer lagging, oldest results dropped");
                    }
                    Err(RecvError::Closed) => return None,
                }
            },
        }
    }

    /// Results overwritten before they were read
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Spawns and feeds session tasks
pub struct SessionRuntime {
    config: RuntimeConfig,
    results: ResultSender,
}

impl SessionRuntime {
    /// Create a runtime and the receiver for all of its results
    #[must_use]
    pub fn new(config: RuntimeConfig) -> (Self, ResultReceiver) {
        let capacity = config.result_capacity.max(1);
        let (results, inner) = match config.backpressure {
            BackpressurePolicy::Block => {
                let (tx, rx) = mpsc::channel(capacity);
                (ResultSender::Block(tx), ReceiverInner::Block(rx))
            }
            BackpressurePolicy::DropOldest => {
                let (tx, rx) = broadcast::channel(capacity);
                (ResultSender::DropOldest(tx), ReceiverInner::DropOldest(rx))
            }
        };

        (Self { config, results }, ResultReceiver { inner, dropped: 0 })
    }

    /// Open a session timed by the wall clock
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the first invalid configuration field.
    pub fn open(&self, config: SessionConfig) -> Result<SessionHandle, ConfigError> {
        self.open_with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Open a session timed by `clock`
    ///
    /// # Errors
    ///
    /// Returns the first invalid configuration field.
    pub fn open_with_clock(&self, config: SessionConfig, clock: Arc<dyn Clock>) -> Result<SessionHandle, ConfigError> {
        let session = Session::with_clock(config, clock)?;
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(self.config.ingest_capacity.max(1));

        let task = tokio::spawn(run_session(id, session, rx, self.results.clone()));
        Ok(SessionHandle { id, samples: tx, task })
    }
}

/// Producer end of one session
pub struct SessionHandle {
    id: Uuid,
    samples: mpsc::Sender<EegSample>,
    task: JoinHandle<u64>,
}

impl SessionHandle {
    /// Session identifier carried by its events
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue one sample, waiting while the ingest queue is full
    ///
    /// # Errors
    ///
    /// `RuntimeError::SessionClosed` if the session task has stopped.
    pub async fn push(&self, sample: EegSample) -> RuntimeResult<()> {
        self.samples.send(sample).await.map_err(|_| RuntimeError::SessionClosed(self.id))
    }

    /// Stop ingesting, let queued samples finish and release the session
    ///
    /// Returns the number of completed cycles.
    ///
    /// # Errors
    ///
    /// `RuntimeError::Join` if the session task panicked.
    pub async fn end(self) -> RuntimeResult<u64> {
        drop(self.samples);
        Ok(self.task.await?)
    }
}

async fn run_session(
    id: Uuid,
    mut session: Session,
    mut samples: mpsc::Receiver<EegSample>,
    results: ResultSender,
) -> u64 {
    info!(session = %id, channels = session.config().signal.channel_count, "Session opened");

    while let Some(sample) = samples.recv().await {
        let event = match session.process_window(sample) {
            Ok(CycleOutcome::Pending { .. }) => continue,
            Ok(CycleOutcome::Complete(result)) => SessionEvent::Cycle { session_id: id, result },
            Err(error) => SessionEvent::Error { session_id: id, error },
        };
        if !results.send(event).await {
            warn!(session = %id, "Result queue closed, ending session");
            break;
        }
    }

    let cycles = session.cycles();
    // Nobody is left to tell if the queue is already closed
    let _ = results.send(SessionEvent::Ended { session_id: id, cycles }).await;
    info!(session = %id, cycles, "Session closed");
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::clock::FrozenClock;
    use crate::error::ErrorKind;

    fn sample(i: u64, channels: usize) -> EegSample {
        let v = (i as f64 * 0.9).sin() * 8.0;
        EegSample::new(i * 4_000, vec![v; channels])
    }

    fn open(runtime: &SessionRuntime, channels: usize) -> SessionHandle {
        runtime
            .open_with_clock(SessionConfig::new(250.0, channels, 8), Arc::new(FrozenClock))
            .unwrap()
    }

    #[tokio::test]
    async fn test_results_in_input_order_per_session() {
        let (runtime, mut results) = SessionRuntime::new(RuntimeConfig::default());
        let handles: Vec<SessionHandle> = (0..3).map(|_| open(&runtime, 2)).collect();
        drop(runtime);

        let producers: Vec<_> = handles
            .into_iter()
            .map(|handle| {
                tokio::spawn(async move {
                    for i in 0..40 {
                        handle.push(sample(i, 2)).await.unwrap();
                    }
                    handle.end().await.unwrap()
                })
            })
            .collect();

        let mut last_cycle: HashMap<Uuid, u64> = HashMap::new();
        let mut ended = 0;
        while let Some(event) = results.recv().await {
            match event {
                SessionEvent::Cycle { session_id, result } => {
                    let last = last_cycle.entry(session_id).or_insert(0);
                    assert_eq!(result.cycle_id, *last + 1);
                    *last = result.cycle_id;
                }
                SessionEvent::Error { error, .. } => panic!("unexpected error {error}"),
                SessionEvent::Ended { session_id, cycles } => {
                    assert_eq!(last_cycle.get(&session_id), Some(&cycles));
                    ended += 1;
                }
            }
        }

        for p in producers {
            assert_eq!(p.await.unwrap(), 33);
        }
        assert_eq!(ended, 3);
        assert_eq!(last_cycle.len(), 3);
    }

    #[tokio::test]
    async fn test_errors_are_reported_and_session_continues() {
        let (runtime, mut results) = SessionRuntime::new(RuntimeConfig::default());
        let handle = open(&runtime, 2);
        let id = handle.id();

        handle.push(sample(0, 3)).await.unwrap();
        for i in 0..8 {
            handle.push(sample(i, 2)).await.unwrap();
        }
        assert_eq!(handle.end().await.unwrap(), 1);

        match results.recv().await {
            Some(SessionEvent::Error { session_id, error }) => {
                assert_eq!(session_id, id);
                assert_eq!(error.kind(), ErrorKind::ChannelMismatch);
            }
            other => panic!("expected error event, got {other:?}"),
        }
        assert!(matches!(results.recv().await, Some(SessionEvent::Cycle { .. })));
        assert!(matches!(results.recv().await, Some(SessionEvent::Ended { cycles: 1, .. })));
    }

    #[tokio::test]
    async fn test_drop_oldest_counts_dropped_results() {
        let config = RuntimeConfig {
            result_capacity: 4,
            backpressure: BackpressurePolicy::DropOldest,
            ..RuntimeConfig::default()
        };
        let (runtime, mut results) = SessionRuntime::new(config);
        let handle = open(&runtime, 1);
        drop(runtime);

        // Nobody reads while 23 cycles and the end event are produced
        for i in 0..30 {
            handle.push(sample(i, 1)).await.unwrap();
        }
        assert_eq!(handle.end().await.unwrap(), 23);

        let mut received = Vec::new();
        while let Some(event) = results.recv().await {
            received.push(event);
        }

        assert_eq!(received.len(), 4);
        assert_eq!(results.dropped(), 24 - 4);
        assert!(matches!(received.last(), Some(SessionEvent::Ended { cycles: 23, .. })));

        let ids: Vec<u64> = received
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Cycle { result, .. } => Some(result.cycle_id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![21, 22, 23]);
    }

    #[tokio::test]
    async fn test_drop_oldest_capacity_rounds_to_power_of_two() {
        let config = RuntimeConfig {
            result_capacity: 3,
            backpressure: BackpressurePolicy::DropOldest,
            ..RuntimeConfig::default()
        };
        let (runtime, mut results) = SessionRuntime::new(config);
        let handle = open(&runtime, 1);
        drop(runtime);

        for i in 0..30 {
            handle.push(sample(i, 1)).await.unwrap();
        }
        assert_eq!(handle.end().await.unwrap(), 23);

        let mut received = 0;
        while results.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 4);
        assert_eq!(results.dropped(), 24 - 4);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let (runtime, _results) = SessionRuntime::new(RuntimeConfig::default());
        let mut config = SessionConfig::new(250.0, 2, 8);
        config.signal.buffer_capacity = 4;
        assert!(runtime.open(config).is_err());
    }
}
