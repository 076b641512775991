//! Scripted in-memory connector for lifecycle tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::BoxFuture;
use tokio::sync::{Notify, mpsc};
use tokio::time::Instant;

use super::transport::{Connector, Frame, Transport};
use crate::error::ClientError;

/// What the next `connect` call does.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Outcome {
    Accept,
    Refuse,
}

/// Server side of one accepted mock session.
#[derive(Debug)]
pub(crate) struct MockPeer {
    pub to_client: mpsc::UnboundedSender<Frame>,
    pub from_client: mpsc::UnboundedReceiver<String>,
    pub closed: Arc<AtomicBool>,
}

impl MockPeer {
    pub fn push_text(&self, text: &str) {
        let _ = self.to_client.send(Frame::Text(text.to_string()));
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub(crate) struct MockConnector {
    script: Mutex<VecDeque<Outcome>>,
    attempts: Mutex<Vec<Instant>>,
    accepted: AtomicUsize,
    gate: Option<Arc<Notify>>,
    peers: mpsc::UnboundedSender<MockPeer>,
}

impl MockConnector {
    /// Accepts every connection unless scripted otherwise.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        Self::build(None)
    }

    /// Holds every connect until `gate` is notified.
    pub fn gated(gate: Arc<Notify>) -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        Self::build(Some(gate))
    }

    fn build(gate: Option<Arc<Notify>>) -> (Arc<Self>, mpsc::UnboundedReceiver<MockPeer>) {
        let (peers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            script: Mutex::new(VecDeque::new()),
            attempts: Mutex::new(Vec::new()),
            accepted: AtomicUsize::new(0),
            gate,
            peers,
        };
        (Arc::new(connector), rx)
    }

    pub fn script(&self, outcomes: &[Outcome]) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(outcomes.iter().copied());
    }

    pub fn attempts(&self) -> usize {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    fn connect<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<Box<dyn Transport>, ClientError>> {
        Box::pin(async move {
            self.attempts
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Instant::now());

            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            let outcome = self
                .script
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or(Outcome::Accept);

            match outcome {
                Outcome::Refuse => Err(ClientError::Transport("connection refused".to_string())),
                Outcome::Accept => {
                    let (to_client, inbound) = mpsc::unbounded_channel();
                    let (outbound, from_client) = mpsc::unbounded_channel();
                    let closed = Arc::new(AtomicBool::new(false));
                    let _ = self.peers.send(MockPeer {
                        to_client,
                        from_client,
                        closed: Arc::clone(&closed),
                    });
                    self.accepted.fetch_add(1, Ordering::SeqCst);
                    Ok(Box::new(MockTransport {
                        inbound,
                        outbound,
                        closed,
                    }) as Box<dyn Transport>)
                }
            }
        })
    }
}

struct MockTransport {
    inbound: mpsc::UnboundedReceiver<Frame>,
    outbound: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

impl Transport for MockTransport {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            self.outbound
                .send(text)
                .map_err(|_| ClientError::Transport("peer gone".to_string()))
        })
    }

    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<Frame, ClientError>>> {
        Box::pin(async move { self.inbound.recv().await.map(Ok) })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.closed.store(true, Ordering::SeqCst);
        })
    }
}
