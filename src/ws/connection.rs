//! Connection manager: owns the single transport session.
//!
//! [`ConnectionManager::establish`] spawns one background task that
//! connects, pumps frames, and reconnects under the backoff policy until
//! [`ConnectionManager::teardown`] stops it. The task is the only place a
//! transport lives, so at most one session exists at any time.
//!
//! Consumers never see the transport. They get:
//!
//! - a [`watch`] channel of [`ConnectionStatus`] snapshots,
//! - an [`OutboundSender`] that forwards to whichever session is open,
//! - inbound text frames, in arrival order, on the queue handed to
//!   [`ConnectionManager::new`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::reconnect::{BackoffPolicy, ReconnectScheduler, SchedulerState};
use super::transport::{Connector, Frame, Transport};
use crate::domain::{ConnectionInfo, ConnectionState, ConnectionStatus};
use crate::error::ClientError;

type OutboundSlot = Arc<RwLock<Option<mpsc::UnboundedSender<String>>>>;

/// Send capability bound to the current open session.
///
/// The slot behind it holds a sender only while a session is open; it is
/// cleared before `Closed` is published, so data can never be queued on a
/// session that is gone.
#[derive(Debug, Clone)]
pub struct OutboundSender {
    slot: OutboundSlot,
}

impl OutboundSender {
    /// Queues `data` on the open session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SendWhileDisconnected`] if no session is open.
    /// Nothing is buffered for a later session.
    pub fn send(&self, data: impl Into<String>) -> Result<(), ClientError> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = slot.as_ref() else {
            tracing::debug!("send dropped: no open connection");
            return Err(ClientError::SendWhileDisconnected);
        };
        tx.send(data.into())
            .map_err(|_| ClientError::SendWhileDisconnected)
    }

    /// Returns `true` while a session is open to receive data.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[derive(Debug)]
struct Worker {
    shutdown: oneshot::Sender<()>,
    stopping: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

/// Owner of the transport session and its lifecycle.
#[derive(Debug)]
pub struct ConnectionManager {
    target: String,
    connector: Arc<dyn Connector>,
    backoff: BackoffPolicy,
    max_attempts: Option<u32>,
    status: Arc<watch::Sender<ConnectionStatus>>,
    outbound: OutboundSlot,
    frames: mpsc::Sender<String>,
    worker: Mutex<Option<Worker>>,
}

impl ConnectionManager {
    /// Creates an idle manager for `target`. Inbound text frames are
    /// pushed to `frames` in arrival order.
    #[must_use]
    pub fn new(
        target: impl Into<String>,
        connector: Arc<dyn Connector>,
        backoff: BackoffPolicy,
        max_attempts: Option<u32>,
        frames: mpsc::Sender<String>,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::default());
        Self {
            target: target.into(),
            connector,
            backoff,
            max_attempts,
            status: Arc::new(status),
            outbound: Arc::new(RwLock::new(None)),
            frames,
            worker: Mutex::new(None),
        }
    }

    /// Returns the connection target.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Starts the connection task.
    ///
    /// Idempotent: while a task is live (connecting, open, or waiting to
    /// retry) this is a no-op. After a teardown, or after the scheduler
    /// gave up, a new task is started.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Internal`] when called outside a tokio runtime.
    pub fn establish(&self) -> Result<(), ClientError> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        let gave_up = self.status.borrow().is_disconnected();
        if !gave_up && worker.as_ref().is_some_and(|w| !w.task.is_finished()) {
            tracing::debug!(target_url = %self.target, "establish ignored: connection task already live");
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ClientError::Internal(format!("no tokio runtime: {e}")))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let stopping = Arc::new(AtomicBool::new(false));
        let session = SessionLoop {
            target: self.target.clone(),
            connector: Arc::clone(&self.connector),
            scheduler: ReconnectScheduler::new(self.backoff, self.max_attempts),
            status: Arc::clone(&self.status),
            outbound: Arc::clone(&self.outbound),
            frames: self.frames.clone(),
            stopping: Arc::clone(&stopping),
        };

        self.status.send_replace(ConnectionStatus {
            state: ConnectionState::Connecting,
            connection: None,
            retry: SchedulerState::Idle,
        });

        let task = runtime.spawn(session.run(shutdown_rx));
        *worker = Some(Worker {
            shutdown: shutdown_tx,
            stopping,
            task,
        });
        Ok(())
    }

    /// Stops the connection task and closes the session, if any.
    ///
    /// Cancels a pending retry timer. A connect already in flight is
    /// abandoned, and a session that opens anyway is closed before it is
    /// adopted. Never triggers a reconnect. When this returns, no further
    /// frames will be queued. Frames already queued belong to the consumer
    /// of the frame queue; stop that consumer first to drop them.
    pub async fn teardown(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(worker) = worker else {
            return;
        };

        worker.stopping.store(true, Ordering::SeqCst);
        let _ = worker.shutdown.send(());
        if let Err(e) = worker.task.await {
            tracing::error!(error = %e, "connection task failed");
        }

        *self.outbound.write().unwrap_or_else(PoisonError::into_inner) = None;
        self.status.send_modify(|status| {
            status.state = ConnectionState::Closed;
            status.retry = SchedulerState::Stopped;
            status.connection = status
                .connection
                .as_ref()
                .map(|c| c.with_state(ConnectionState::Closed));
        });
        tracing::info!(target_url = %self.target, "websocket torn down");
    }

    /// Returns a receiver of lifecycle snapshots.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// Returns `true` while the session is open.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status.borrow().is_ready()
    }

    /// Returns a send capability bound to the current session.
    #[must_use]
    pub fn outbound(&self) -> OutboundSender {
        OutboundSender {
            slot: Arc::clone(&self.outbound),
        }
    }

    /// Queues `data` on the open session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SendWhileDisconnected`] if no session is open.
    pub fn send(&self, data: impl Into<String>) -> Result<(), ClientError> {
        self.outbound().send(data)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        let worker = self
            .worker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            worker.stopping.store(true, Ordering::SeqCst);
            let _ = worker.shutdown.send(());
        }
    }
}

enum SessionEnd {
    Shutdown,
    Lost(String),
}

/// State owned by the background connection task.
struct SessionLoop {
    target: String,
    connector: Arc<dyn Connector>,
    scheduler: ReconnectScheduler,
    status: Arc<watch::Sender<ConnectionStatus>>,
    outbound: OutboundSlot,
    frames: mpsc::Sender<String>,
    stopping: Arc<AtomicBool>,
}

impl SessionLoop {
    async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        loop {
            let info = ConnectionInfo::connecting(&self.target);
            self.publish(ConnectionState::Connecting, Some(info.clone()));
            tracing::info!(
                connection_id = %info.id,
                target_url = %self.target,
                failures = self.scheduler.failures(),
                "connecting websocket"
            );

            let connected = tokio::select! {
                biased;
                _ = &mut shutdown => None,
                result = self.connector.connect(&self.target) => Some(result),
            };
            let Some(result) = connected else {
                tracing::debug!(connection_id = %info.id, "connect abandoned by teardown");
                break;
            };

            match result {
                Ok(mut transport) => {
                    if self.stopping.load(Ordering::SeqCst) {
                        tracing::debug!(connection_id = %info.id, "torn down while connecting; closing new session");
                        transport.close().await;
                        break;
                    }

                    self.scheduler.on_open();
                    let (tx, rx) = mpsc::unbounded_channel();
                    self.attach(tx);
                    self.publish(ConnectionState::Open, Some(info.with_state(ConnectionState::Open)));
                    tracing::info!(connection_id = %info.id, "websocket connected");

                    let end = self.pump(transport.as_mut(), rx, &mut shutdown).await;
                    self.detach();

                    match end {
                        SessionEnd::Shutdown => {
                            transport.close().await;
                            break;
                        }
                        SessionEnd::Lost(reason) => {
                            tracing::warn!(connection_id = %info.id, %reason, "websocket closed unexpectedly");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(connection_id = %info.id, error = %e, "websocket connect failed");
                }
            }

            let Some(delay) = self.scheduler.on_unexpected_close() else {
                tracing::error!(
                    failures = self.scheduler.failures(),
                    "giving up on reconnecting"
                );
                self.publish(ConnectionState::Closed, Some(info.with_state(ConnectionState::Closed)));
                return;
            };
            self.publish(ConnectionState::Closed, Some(info.with_state(ConnectionState::Closed)));
            tracing::info!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                attempt = self.scheduler.failures(),
                "reconnect scheduled"
            );

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::debug!("pending reconnect cancelled by teardown");
                    break;
                }
                () = tokio::time::sleep(delay) => {}
            }
            self.scheduler.on_timer_fired();
        }

        self.scheduler.stop();
        self.detach();
        self.status.send_modify(|status| {
            status.state = ConnectionState::Closed;
            status.retry = SchedulerState::Stopped;
            status.connection = status
                .connection
                .as_ref()
                .map(|c| c.with_state(ConnectionState::Closed));
        });
    }

    /// Moves frames between the open transport, the outbound queue and the
    /// inbound frame queue until the session ends.
    async fn pump(
        &self,
        transport: &mut dyn Transport,
        mut outbound: mpsc::UnboundedReceiver<String>,
        shutdown: &mut oneshot::Receiver<()>,
    ) -> SessionEnd {
        loop {
            tokio::select! {
                biased;
                _ = &mut *shutdown => return SessionEnd::Shutdown,
                Some(text) = outbound.recv() => {
                    if let Err(e) = transport.send_text(text).await {
                        return SessionEnd::Lost(e.to_string());
                    }
                }
                frame = transport.next_frame() => match frame {
                    Some(Ok(Frame::Text(text))) => {
                        if self.frames.send(text).await.is_err() {
                            tracing::debug!("frame queue closed; stopping session");
                            return SessionEnd::Shutdown;
                        }
                    }
                    Some(Ok(Frame::Close { code, reason })) => {
                        return SessionEnd::Lost(format!("server closed session (code {code:?}): {reason}"));
                    }
                    Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                    None => return SessionEnd::Lost("stream ended".to_string()),
                },
            }
        }
    }

    fn publish(&self, state: ConnectionState, connection: Option<ConnectionInfo>) {
        self.status.send_replace(ConnectionStatus {
            state,
            connection,
            retry: self.scheduler.state(),
        });
    }

    fn attach(&self, tx: mpsc::UnboundedSender<String>) {
        *self.outbound.write().unwrap_or_else(PoisonError::into_inner) = Some(tx);
    }

    fn detach(&self) {
        *self.outbound.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
