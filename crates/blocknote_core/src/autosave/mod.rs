//! Debounced persistence of editor snapshots.
//!
//! # Responsibility
//! - Coalesce bursts of change notifications into one store write per quiet
//!   period, carrying the latest snapshot.
//! - Serialize writes on a single worker task and publish save status.
//!
//! # Invariants
//! - A write happens no sooner than the quiet interval after the most
//!   recent `notify`.
//! - `flush_now` writes immediately and discards the pending snapshot it
//!   supersedes.
//! - Failures are reported on the status channel and never retried
//!   internally; the next notify retries.
//! - Dropping or shutting down the scheduler writes any pending snapshot.
//!
//! # See also
//! - docs/architecture/autosave.md

use crate::model::snapshot::BlockSnapshot;
use crate::repo::note_store::{NoteStore, StoreError};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Everything one store write needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub note_id: String,
    pub title: String,
    pub blocks: Vec<BlockSnapshot>,
    /// Document generation the snapshot was taken at.
    pub generation: u64,
}

/// Observable save state, published after every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Idle,
    /// A snapshot waits for the quiet interval to elapse.
    Pending { generation: u64 },
    Saving { generation: u64 },
    Saved { generation: u64 },
    /// Last write failed; `message` is user-facing.
    Failed { generation: u64, message: String },
}

/// Autosave error.
#[derive(Debug)]
pub enum AutosaveError {
    /// The store rejected the write.
    PersistenceFailed(StoreError),
    /// The worker has stopped; no more writes are accepted.
    Closed,
}

impl AutosaveError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PersistenceFailed(err) => err.user_message(),
            Self::Closed => "This note is closed.",
        }
    }
}

impl Display for AutosaveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PersistenceFailed(err) => write!(f, "persistence failed: {err}"),
            Self::Closed => write!(f, "autosave worker closed"),
        }
    }
}

impl Error for AutosaveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PersistenceFailed(err) => Some(err),
            Self::Closed => None,
        }
    }
}

impl From<StoreError> for AutosaveError {
    fn from(value: StoreError) -> Self {
        Self::PersistenceFailed(value)
    }
}

type Reply = oneshot::Sender<Result<(), AutosaveError>>;

enum Command {
    Notify(SaveRequest),
    Flush(SaveRequest, Reply),
    Shutdown(Reply),
}

/// Per-session debounce scheduler backed by one tokio worker task.
pub struct AutosaveScheduler {
    tx: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SaveStatus>,
    worker: Option<JoinHandle<()>>,
    quiet: Duration,
}

impl AutosaveScheduler {
    /// Spawns the worker on the current tokio runtime.
    ///
    /// # Panics
    /// - When called outside a tokio runtime.
    pub fn spawn<S>(store: Arc<S>, quiet: Duration) -> Self
    where
        S: NoteStore + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SaveStatus::Idle);
        let worker = tokio::spawn(run_worker(store, quiet, rx, status_tx));
        debug!(
            "event=autosave_start module=autosave status=ok quiet_ms={}",
            quiet.as_millis()
        );
        Self {
            tx,
            status: status_rx,
            worker: Some(worker),
            quiet,
        }
    }

    pub fn quiet_interval(&self) -> Duration {
        self.quiet
    }

    /// Schedules `request`, replacing any pending snapshot and restarting
    /// the quiet timer.
    pub fn notify(&self, request: SaveRequest) -> Result<(), AutosaveError> {
        self.tx
            .send(Command::Notify(request))
            .map_err(|_| AutosaveError::Closed)
    }

    /// Writes `request` now, bypassing the timer.
    pub async fn flush_now(&self, request: SaveRequest) -> Result<(), AutosaveError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(Command::Flush(request, reply_tx))
            .map_err(|_| AutosaveError::Closed)?;
        reply_rx.await.map_err(|_| AutosaveError::Closed)?
    }

    /// Latest published status.
    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Writes any pending snapshot, then stops the worker.
    ///
    /// Later calls to `notify` or `flush_now` fail with `Closed`.
    pub async fn shutdown(&mut self) -> Result<(), AutosaveError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        let result = match self.tx.send(Command::Shutdown(reply_tx)) {
            Ok(()) => reply_rx.await.unwrap_or(Ok(())),
            Err(_) => Ok(()),
        };
        if let Err(err) = worker.await {
            error!(
                "event=autosave_stop module=autosave status=error error={}",
                err
            );
        }
        debug!("event=autosave_stop module=autosave status=ok");
        result
    }
}

async fn run_worker<S>(
    store: Arc<S>,
    quiet: Duration,
    mut rx: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<SaveStatus>,
) where
    S: NoteStore + 'static,
{
    let mut pending: Option<SaveRequest> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        let command = match deadline {
            Some(at) => tokio::select! {
                command = rx.recv() => command,
                _ = tokio::time::sleep_until(at) => {
                    deadline = None;
                    if let Some(request) = pending.take() {
                        let _ = persist(&store, request, &status).await;
                    }
                    continue;
                }
            },
            None => rx.recv().await,
        };

        match command {
            Some(Command::Notify(request)) => {
                status.send_replace(SaveStatus::Pending {
                    generation: request.generation,
                });
                pending = Some(request);
                deadline = Some(Instant::now() + quiet);
            }
            Some(Command::Flush(request, reply)) => {
                pending = None;
                deadline = None;
                let result = persist(&store, request, &status).await;
                let _ = reply.send(result);
            }
            Some(Command::Shutdown(reply)) => {
                let result = match pending.take() {
                    Some(request) => persist(&store, request, &status).await,
                    None => Ok(()),
                };
                let _ = reply.send(result);
                break;
            }
            None => {
                if let Some(request) = pending.take() {
                    let _ = persist(&store, request, &status).await;
                }
                break;
            }
        }
    }
}

async fn persist<S>(
    store: &Arc<S>,
    request: SaveRequest,
    status: &watch::Sender<SaveStatus>,
) -> Result<(), AutosaveError>
where
    S: NoteStore + 'static,
{
    let generation = request.generation;
    let block_count = request.blocks.len();
    status.send_replace(SaveStatus::Saving { generation });
    let started_at = Instant::now();

    let store = Arc::clone(store);
    let joined = tokio::task::spawn_blocking(move || {
        store.save(&request.note_id, &request.title, &request.blocks)
    })
    .await;
    let result = match joined {
        Ok(result) => result,
        Err(err) => Err(StoreError::Unavailable(err.to_string())),
    };

    match result {
        Ok(()) => {
            info!(
                "event=autosave_write module=autosave status=ok generation={} blocks={} duration_ms={}",
                generation,
                block_count,
                started_at.elapsed().as_millis()
            );
            status.send_replace(SaveStatus::Saved { generation });
            Ok(())
        }
        Err(err) => {
            error!(
                "event=autosave_write module=autosave status=error generation={} duration_ms={} error={}",
                generation,
                started_at.elapsed().as_millis(),
                err
            );
            status.send_replace(SaveStatus::Failed {
                generation,
                message: err.user_message().to_string(),
            });
            Err(AutosaveError::PersistenceFailed(err))
        }
    }
}
