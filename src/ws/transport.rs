//! Transport seam between the connection manager and the network.
//!
//! [`Connector`] opens sessions, [`Transport`] is one open session. The
//! production implementation is [`TungsteniteConnector`]; tests plug in a
//! scripted connector so the whole lifecycle runs without sockets.

use std::fmt;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::error::Error as WsError;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::ClientError;

/// One unit received from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Text payload.
    Text(String),
    /// The peer closed the session.
    Close {
        /// Close code, if the peer sent one.
        code: Option<u16>,
        /// Close reason (may be empty).
        reason: String,
    },
}

/// An open bidirectional session.
///
/// `next_frame` must be cancel-safe: the connection task polls it inside
/// `tokio::select!` alongside outbound sends and shutdown.
pub trait Transport: Send {
    /// Sends one text frame.
    fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<(), ClientError>>;

    /// Waits for the next inbound frame. `None` means the stream ended.
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<Frame, ClientError>>>;

    /// Closes the session. Errors from an already-closed peer are ignored.
    fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// Factory for transport sessions.
pub trait Connector: Send + Sync + fmt::Debug {
    /// Opens a session to `url`.
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Box<dyn Transport>, ClientError>>;
}

/// Connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct TungsteniteConnector {
    connect_timeout: Duration,
}

impl TungsteniteConnector {
    /// Creates a connector that gives up on a handshake after `connect_timeout`.
    #[must_use]
    pub const fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TungsteniteConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl Connector for TungsteniteConnector {
    fn connect<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Box<dyn Transport>, ClientError>> {
        Box::pin(async move {
            tracing::debug!(target_url = url, "opening websocket");
            let (stream, response) =
                tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(url))
                    .await
                    .map_err(|_| ClientError::ConnectTimeout(self.connect_timeout))??;
            tracing::debug!(status = %response.status(), "websocket handshake complete");
            Ok(Box::new(TungsteniteTransport { stream }) as Box<dyn Transport>)
        })
    }
}

struct TungsteniteTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl Transport for TungsteniteTransport {
    fn send_text(&mut self, text: String) -> BoxFuture<'_, Result<(), ClientError>> {
        Box::pin(async move {
            self.stream.send(Message::Text(text.into())).await?;
            Ok(())
        })
    }

    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<Frame, ClientError>>> {
        Box::pin(async move {
            loop {
                let msg = match self.stream.next().await? {
                    Ok(msg) => msg,
                    Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => return None,
                    Err(e) => return Some(Err(e.into())),
                };
                match msg {
                    Message::Text(text) => return Some(Ok(Frame::Text(text.as_str().to_owned()))),
                    Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => return Some(Ok(Frame::Text(text))),
                        Err(_) => {
                            tracing::debug!(bytes = data.len(), "dropping non-utf8 binary frame");
                        }
                    },
                    Message::Close(frame) => {
                        let (code, reason) = frame
                            .map(|f| (Some(u16::from(f.code)), f.reason.to_string()))
                            .unwrap_or((None, String::new()));
                        return Some(Ok(Frame::Close { code, reason }));
                    }
                    // Pings are answered by tungstenite on the next read/write.
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
                }
            }
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Err(e) = self.stream.close(None).await
                && !matches!(e, WsError::ConnectionClosed | WsError::AlreadyClosed)
            {
                tracing::debug!(error = %e, "error while closing websocket");
            }
        })
    }
}
