//! Composition root for the live event connection.
//!
//! [`LiveClient`] wires the connection manager, the dispatcher and the
//! subscription context together and bounds their lifetime: nothing runs
//! before [`LiveClient::start`], and nothing runs after
//! [`LiveClient::shutdown`]. `shutdown` is the full teardown of the
//! client; [`ConnectionManager::teardown`] alone only stops the session.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::collaborators::{HttpStreamsRefresher, Notifier, StreamsRefresher, TracingNotifier};
use crate::app_state::AppState;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::ws::connection::ConnectionManager;
use crate::ws::dispatcher::Dispatcher;
use crate::ws::handlers::default_router;
use crate::ws::router::EventRouter;
use crate::ws::subscription::SubscriptionContext;
use crate::ws::transport::{Connector, TungsteniteConnector};

#[derive(Debug)]
struct PendingDispatch {
    dispatcher: Dispatcher,
    frames: mpsc::Receiver<String>,
}

#[derive(Debug)]
struct DispatchWorker {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Live connection to the dashboard's event channel.
#[derive(Debug)]
pub struct LiveClient {
    manager: ConnectionManager,
    context: SubscriptionContext,
    state: AppState,
    pending: Mutex<Option<PendingDispatch>>,
    worker: Mutex<Option<DispatchWorker>>,
}

impl LiveClient {
    /// Builds a client from configuration with the production
    /// collaborators: a TLS-capable WebSocket connector, an HTTP streams
    /// refresher and a log-backed notifier.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidAddress`] if the page address in
    /// `config` is unusable.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let state = AppState::new(config.event_bus_capacity);
        let refresher: Arc<dyn StreamsRefresher> = Arc::new(HttpStreamsRefresher::new(
            config.streams_url()?,
            config.api_token.clone(),
            Arc::clone(&state.streams),
        ));
        let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
        let router = default_router(refresher, notifier, config.notify_refresh_failures);
        let connector: Arc<dyn Connector> =
            Arc::new(TungsteniteConnector::new(config.connect_timeout));
        Self::new(config, connector, router, state)
    }

    /// Builds a client with explicit collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidAddress`] if the page address in
    /// `config` is unusable.
    pub fn new(
        config: &ClientConfig,
        connector: Arc<dyn Connector>,
        router: EventRouter,
        state: AppState,
    ) -> Result<Self, ClientError> {
        let target = config.page_context()?.ws_url();
        let (frames_tx, frames_rx) = mpsc::channel(config.frame_queue_capacity.max(1));

        let manager = ConnectionManager::new(
            target,
            connector,
            config.backoff,
            config.max_attempts,
            frames_tx,
        );
        let (dispatcher, last_value) = Dispatcher::new(Arc::new(router), state.event_bus.clone());
        let context = SubscriptionContext::new(manager.status(), last_value, manager.outbound());

        Ok(Self {
            manager,
            context,
            state,
            pending: Mutex::new(Some(PendingDispatch {
                dispatcher,
                frames: frames_rx,
            })),
            worker: Mutex::new(None),
        })
    }

    /// Starts the dispatcher (first call only) and establishes the
    /// connection. Calling it again while connected is a no-op; after the
    /// scheduler gave up it starts a fresh connection attempt.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Internal`] when called outside a tokio runtime.
    pub fn start(&self) -> Result<(), ClientError> {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(PendingDispatch { dispatcher, frames }) = pending {
            let runtime = tokio::runtime::Handle::try_current()
                .map_err(|e| ClientError::Internal(format!("no tokio runtime: {e}")))?;
            let (shutdown, shutdown_rx) = oneshot::channel();
            let task = runtime.spawn(dispatcher.run(frames, shutdown_rx));
            *self.worker.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(DispatchWorker { shutdown, task });
        }

        tracing::info!(target_url = %self.manager.target(), "starting live client");
        self.manager.establish()
    }

    /// Returns a new handle on the subscription context.
    #[must_use]
    pub fn context(&self) -> SubscriptionContext {
        self.context.clone()
    }

    /// Returns the connection manager.
    #[must_use]
    pub const fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    /// Returns the shared application state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Stops the dispatcher, tears the connection down and closes the
    /// streams store. No handler runs and no refresh lands after this
    /// returns.
    ///
    /// The dispatcher stops first, so frames still queued from the
    /// session are dropped rather than handled during teardown.
    pub async fn shutdown(self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            let _ = worker.shutdown.send(());
            if let Err(e) = worker.task.await {
                tracing::error!(error = %e, "dispatcher task failed");
            }
        }

        self.manager.teardown().await;
        self.state.streams.close().await;
        tracing::info!("live client stopped");
    }
}
