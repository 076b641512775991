//! End-to-end tests against a real WebSocket server on `/ws/`.
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::sync::mpsc;
use tokio_test::assert_ok;

use iptv_live::app_state::AppState;
use iptv_live::config::ClientConfig;
use iptv_live::domain::StreamsStore;
use iptv_live::service::{HttpStreamsRefresher, LiveClient, Notifier, Severity, StreamsRefresher};
use iptv_live::ws::handlers::default_router;
use iptv_live::ws::messages::InboundEvent;
use iptv_live::ws::reconnect::BackoffPolicy;
use iptv_live::ws::transport::{Connector, TungsteniteConnector};

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Echo,
    CloseFirst,
    BinaryFrames,
}

#[derive(Clone)]
struct ServerState {
    sessions: Arc<AtomicUsize>,
    received: mpsc::UnboundedSender<String>,
    mode: Mode,
}

async fn ws_route(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| session(socket, state))
}

async fn session(mut socket: WebSocket, state: ServerState) {
    let n = state.sessions.fetch_add(1, Ordering::SeqCst) + 1;
    let frame = format!(
        r#"{{"type":"m3u_refresh","message":{{"success":true,"message":"refresh {n}"}}}}"#
    );
    let sent = if state.mode == Mode::BinaryFrames {
        let garbage = Message::Binary(vec![0xff, 0xfe, 0xfd].into());
        let binary = Message::Binary(frame.into_bytes().into());
        socket.send(garbage).await.is_ok() && socket.send(binary).await.is_ok()
    } else {
        socket.send(Message::Text(frame.into())).await.is_ok()
    };
    if !sent {
        return;
    }
    if state.mode == Mode::CloseFirst && n == 1 {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    while let Some(Ok(msg)) = socket.recv().await {
        if let Message::Text(text) = msg {
            let _ = state.received.send(text.to_string());
        }
    }
}

async fn serve(app: Router) -> std::net::SocketAddr {
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind test listener");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("listener address");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

struct Server {
    page_url: String,
    sessions: Arc<AtomicUsize>,
    received: mpsc::UnboundedReceiver<String>,
}

async fn spawn_server(mode: Mode) -> Server {
    let (tx, received) = mpsc::unbounded_channel();
    let sessions = Arc::new(AtomicUsize::new(0));
    let state = ServerState {
        sessions: Arc::clone(&sessions),
        received: tx,
        mode,
    };
    let app = Router::new().route("/ws/", get(ws_route)).with_state(state);

    let addr = serve(app).await;

    Server {
        page_url: format!("http://{addr}/"),
        sessions,
        received,
    }
}

#[derive(Debug, Default)]
struct CountingRefresher(AtomicUsize);

impl StreamsRefresher for CountingRefresher {
    fn refresh(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct CollectingNotifier(Mutex<Vec<(String, Severity)>>);

impl CollectingNotifier {
    fn seen(&self) -> Vec<(String, Severity)> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, text: &str, severity: Severity) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((text.to_string(), severity));
    }
}

fn client_for(
    server: &Server,
) -> (LiveClient, Arc<CountingRefresher>, Arc<CollectingNotifier>) {
    let config = ClientConfig {
        page_url: server.page_url.clone(),
        backoff: BackoffPolicy::Fixed {
            delay: Duration::from_millis(50),
        },
        ..ClientConfig::default()
    };
    let refresher = Arc::new(CountingRefresher::default());
    let notifier = Arc::new(CollectingNotifier::default());
    let router = default_router(
        Arc::clone(&refresher) as Arc<dyn StreamsRefresher>,
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        false,
    );
    let connector: Arc<dyn Connector> = Arc::new(TungsteniteConnector::new(WAIT));
    let client = assert_ok!(LiveClient::new(&config, connector, router, AppState::new(16)));
    (client, refresher, notifier)
}

async fn next_event(rx: &mut tokio::sync::broadcast::Receiver<InboundEvent>) -> InboundEvent {
    let Ok(Ok(event)) = tokio::time::timeout(WAIT, rx.recv()).await else {
        panic!("timed out waiting for a handled event");
    };
    event
}

#[tokio::test]
async fn refresh_event_reaches_collaborators_and_send_reaches_server() {
    let mut server = spawn_server(Mode::Echo).await;
    let (client, refresher, notifier) = client_for(&server);
    let mut events = client.state().event_bus.subscribe();
    let mut context = client.context();

    assert_ok!(client.start());
    let event = next_event(&mut events).await;
    assert_eq!(event.event_type, "m3u_refresh");
    assert_eq!(refresher.0.load(Ordering::SeqCst), 1);
    assert_eq!(
        notifier.seen(),
        vec![("refresh 1".to_string(), Severity::Success)]
    );

    let Ok(ready) = tokio::time::timeout(WAIT, context.wait_until_ready()).await else {
        panic!("never became ready");
    };
    assert!(ready);
    assert_ok!(context.send("ping"));
    let Ok(Some(received)) = tokio::time::timeout(WAIT, server.received.recv()).await else {
        panic!("server never received the message");
    };
    assert_eq!(received, "ping");

    client.shutdown().await;
    assert!(!context.is_ready());
    assert!(context.send("late").is_err());
}

#[tokio::test]
async fn reconnects_after_server_closes_the_session() {
    let server = spawn_server(Mode::CloseFirst).await;
    let (client, refresher, notifier) = client_for(&server);
    let mut events = client.state().event_bus.subscribe();

    assert_ok!(client.start());
    let first = next_event(&mut events).await;
    let second = next_event(&mut events).await;

    let message = |e: &InboundEvent| {
        e.message
            .as_ref()
            .and_then(|m| m.get("message"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };
    assert_eq!(message(&first).as_deref(), Some("refresh 1"));
    assert_eq!(message(&second).as_deref(), Some("refresh 2"));
    assert_eq!(server.sessions.load(Ordering::SeqCst), 2);
    assert_eq!(refresher.0.load(Ordering::SeqCst), 2);
    assert_eq!(notifier.seen().len(), 2);

    client.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_reconnecting() {
    let server = spawn_server(Mode::Echo).await;
    let (client, _refresher, _notifier) = client_for(&server);
    let mut events = client.state().event_bus.subscribe();

    assert_ok!(client.start());
    let _ = next_event(&mut events).await;
    client.shutdown().await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.sessions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn binary_frames_decode_as_text_when_utf8() {
    let server = spawn_server(Mode::BinaryFrames).await;
    let (client, refresher, notifier) = client_for(&server);
    let mut events = client.state().event_bus.subscribe();

    assert_ok!(client.start());
    let event = next_event(&mut events).await;

    assert_eq!(event.event_type, "m3u_refresh");
    assert_eq!(refresher.0.load(Ordering::SeqCst), 1);
    assert_eq!(
        notifier.seen(),
        vec![("refresh 1".to_string(), Severity::Success)]
    );
    assert_eq!(server.sessions.load(Ordering::SeqCst), 1);
    assert!(client.context().is_ready());

    client.shutdown().await;
}

async fn streams_route(State(calls): State<Arc<AtomicUsize>>) -> impl IntoResponse {
    let call = calls.fetch_add(1, Ordering::SeqCst);
    if call == 0 {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Json(serde_json::json!([{"id": 1, "name": "old"}]))
    } else {
        Json(serde_json::json!([{"id": 1, "name": "old"}, {"id": 2, "name": "new"}]))
    }
}

#[tokio::test]
async fn latest_refresh_wins_over_a_slower_earlier_one() {
    let app = Router::new()
        .route("/api/channels/streams/", get(streams_route))
        .with_state(Arc::new(AtomicUsize::new(0)));
    let addr = serve(app).await;

    let store = Arc::new(StreamsStore::new());
    let refresher = HttpStreamsRefresher::new(
        format!("http://{addr}/api/channels/streams/"),
        None,
        Arc::clone(&store),
    );

    refresher.refresh();
    tokio::time::sleep(Duration::from_millis(50)).await;
    refresher.refresh();
    tokio::time::sleep(Duration::from_millis(600)).await;

    let names: Vec<String> = store.list().await.into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["old", "new"]);
    assert_eq!(store.revision(), 1);
    assert_eq!(store.generation().await, 2);
}
