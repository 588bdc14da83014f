//! HTTP/WebSocket client surface (§6): the websocket and NDJSON streaming bindings from
//! §4.5, plus the read-only `/api/*`, `/health` and `/diag` endpoints.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use swim_engine::actors::fanout::FanoutMsg;
use swim_engine::actors::store::StoreMsg;
use swim_engine::bus::{self, SendOutcome};
use swim_engine::{Envelope, Pipeline};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

const CLIENT_QUEUE_CAPACITY: usize = swim_engine::actors::fanout::DEFAULT_CLIENT_CAPACITY;
/// Write timeout per client (spec default 5 s): a stalled client is disconnected rather than
/// letting its queue build up further.
const CLIENT_WRITE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub started_at: Instant,
    next_client_id: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        AppState { pipeline, started_at: Instant::now(), next_client_id: Arc::new(AtomicU64::new(1)) }
    }

    fn next_id(&self) -> u64 {
        self.next_client_id.fetch_add(1, Ordering::Relaxed)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/flights/:gufi", get(get_flight))
        .route("/api/stats", get(get_stats))
        .route("/api/kml", get(list_kml))
        .route("/api/kml/:name", get(get_kml))
        .route("/dstars/:facility/updates", get(dstars_stream))
        .route("/health", get(health))
        .route("/diag", get(diag))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn get_flight(State(state): State<AppState>, Path(gufi): Path<String>) -> Response {
    let flight = ractor::call!(state.pipeline.store, |port| StoreMsg::GetFlight(gufi, port));
    match flight {
        Ok(Some(flight)) => Json(flight).into_response(),
        _ => (axum::http::StatusCode::NOT_FOUND, "flight not found").into_response(),
    }
}

async fn get_stats(State(state): State<AppState>) -> Response {
    match ractor::call!(state.pipeline.store, StoreMsg::Stats) {
        Ok(stats) => Json(json!({
            "msgTotal": stats.msg_total,
            "msgRate": stats.msg_rate,
            "activeFlights": stats.active_flights,
        }))
        .into_response(),
        Err(err) => {
            warn!(error = %err, "stats query failed");
            (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "store unavailable").into_response()
        }
    }
}

/// KML boundary files are an external collaborator (spec §1); this surface exists for
/// interface completeness but serves no static assets in this core.
async fn list_kml() -> Json<Vec<String>> {
    Json(Vec::new())
}

async fn get_kml(Path(_name): Path<String>) -> Response {
    (axum::http::StatusCode::NOT_FOUND, "kml assets are out of scope").into_response()
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": Utc::now() }))
}

async fn diag(State(state): State<AppState>) -> Response {
    let stats = ractor::call!(state.pipeline.store, StoreMsg::Stats).unwrap_or_default();
    let connected = ractor::call!(state.pipeline.fanout, FanoutMsg::ClientCount).unwrap_or_default();
    Json(json!({
        "activeTracks": stats.active_flights,
        "connectedClients": connected,
        "uptimeSec": state.started_at.elapsed().as_secs(),
        "timestamp": Utc::now(),
    }))
    .into_response()
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, None))
}

async fn dstars_stream(State(state): State<AppState>, Path(facility): Path<String>) -> Response {
    // An HTTP streaming binding that never upgrades; the client body is a chunked
    // newline-delimited JSON stream driven by the same per-client queue as the websocket.
    let id = state.next_id();
    let (tx, rx) = bus::channel::<Envelope>(CLIENT_QUEUE_CAPACITY);
    let _ = state.pipeline.fanout.cast(FanoutMsg::Register { id, facility: Some(facility.clone()), sender: tx });

    let fanout = state.pipeline.fanout.clone();
    let stream = futures_util::stream::unfold((rx, fanout), move |(rx, fanout)| async move {
        match rx.recv().await {
            Some(envelope) => {
                let mut line = serde_json::to_string(&envelope).unwrap_or_default();
                line.push('\n');
                Some((Ok::<_, std::io::Error>(line), (rx, fanout)))
            }
            None => {
                let _ = fanout.cast(FanoutMsg::Deregister(id));
                None
            }
        }
    });
    axum::body::Body::from_stream(stream).into_response()
}

async fn handle_socket(socket: WebSocket, state: AppState, facility: Option<String>) {
    let id = state.next_id();
    let (mut sink, mut source) = socket.split();

    let snapshot = ractor::call!(state.pipeline.store, StoreMsg::Snapshot).unwrap_or_default();
    if let Ok(json) = serde_json::to_string(&Envelope::Snapshot { flights: snapshot }) {
        if sink.send(Message::Text(json)).await.is_err() {
            return;
        }
    }

    let (tx, rx) = bus::channel::<Envelope>(CLIENT_QUEUE_CAPACITY);
    let _ = state.pipeline.fanout.cast(FanoutMsg::Register { id, facility, sender: tx });

    // One reader task to notice client-initiated close/ping frames and tear down promptly.
    let reader = tokio::spawn(async move { while source.next().await.is_some() {} });

    loop {
        match tokio::time::timeout(CLIENT_WRITE_TIMEOUT, rx.recv()).await {
            Ok(Some(envelope)) => {
                let Ok(json) = serde_json::to_string(&envelope) else { continue };
                if let SendOutcome::Closed = send_or_close(&mut sink, json).await {
                    break;
                }
            }
            Ok(None) => break,
            Err(_) => {
                debug!(client = id, "websocket write idle past timeout budget");
            }
        }
    }

    reader.abort();
    let _ = state.pipeline.fanout.cast(FanoutMsg::Deregister(id));
}

async fn send_or_close(sink: &mut (impl futures_util::Sink<Message> + Unpin), text: String) -> SendOutcome {
    match sink.send(Message::Text(text)).await {
        Ok(()) => SendOutcome::Delivered,
        Err(_) => SendOutcome::Closed,
    }
}

pub fn socket_addr(listen: std::net::IpAddr, port: u16) -> SocketAddr {
    SocketAddr::new(listen, port)
}
