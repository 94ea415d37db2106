//! WebSocket transport for the command dashboard.
//!
//! ## Connection lifecycle
//!
//! 1. Client connects to `GET /api/ws`. If `server.max_sessions` sessions are
//!    already registered the upgrade is refused with `503`.
//! 2. The connection is registered as a session. With `announce_on_connect`
//!    the first frame it receives is the current status line.
//! 3. Every text frame is one command line; every frame sent back is one
//!    reply or broadcast line. Frames from one client are processed strictly
//!    in arrival order.
//! 4. On close, transport error, or server shutdown the session is
//!    unregistered. Lines already queued get a short window to flush; replies
//!    produced after removal are dropped.
//! 5. A client that cannot keep up with its queue is evicted by the registry;
//!    its writer drains, closes the socket, and the worker exits.
//!
//! ## Frames (client → server)
//!
//! | Frame  | Meaning                                              |
//! |--------|------------------------------------------------------|
//! | text   | `status`, `help`, `calculate:<expr>`, `system:<res>` |
//! | binary | ignored                                              |
//! | close  | ends the session                                     |
//!
//! ## Frames (server → client)
//!
//! | Frame | Example                                  |
//! |-------|------------------------------------------|
//! | text  | `4`, `status: 3 sessions, uptime 120s`   |
//! | text  | `error: unknown command 'foo'`           |

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::AppState;

/// How long a closing session gets to flush lines already queued for it.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// `GET /api/ws` — WebSocket upgrade handler.
///
/// Returns `503 Service Unavailable` when the session limit is reached.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let max = state.config.server.max_sessions;
    if state.dispatcher.sessions().count().await >= max {
        warn!(max, "session limit reached, refusing connection");
        return (StatusCode::SERVICE_UNAVAILABLE, "Session limit reached").into_response();
    }

    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Per-connection worker.
///
/// Splits the socket into a sink (outgoing) and stream (incoming). Outgoing
/// lines are funneled through the session's mpsc queue so the registry can
/// deliver replies and broadcasts without touching the socket.
async fn handle_ws(mut socket: WebSocket, state: AppState) {
    let (tx, mut rx) = mpsc::channel::<String>(state.config.server.outbound_queue_size);
    let mut shutdown = state.shutdown.subscribe();

    let dispatcher = state.dispatcher;
    // Re-checked atomically; the upgrade-time check can race.
    let Some(session_id) = dispatcher.connect(tx).await else {
        let _ = socket.close().await;
        return;
    };

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Task: forward queued lines to the WebSocket sink. Ends when the
    // registry drops the session (queue closed) or the socket fails.
    let mut send_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if ws_sink.send(Message::Text(line.into())).await.is_err() {
                break;
            }
        }
        let _ = ws_sink.close().await;
    });

    // `subscribe` marks the current value seen; a connection accepted after
    // shutdown began would otherwise never be told.
    let stopping = *shutdown.borrow();
    let writer_done = if stopping {
        false
    } else {
        loop {
            tokio::select! {
                frame = ws_stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            dispatcher.handle_message(&session_id, text.as_str()).await;
                        }
                        Some(Ok(Message::Binary(_))) => {
                            debug!(session_id = %session_id, "ignoring binary frame");
                        }
                        Some(Ok(Message::Close(_))) | None => break false,
                        // Ping/pong are answered by axum.
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            debug!(session_id = %session_id, "transport error: {e}");
                            break false;
                        }
                    }
                }
                _ = shutdown.changed() => break false,
                // Writer ended: session evicted or socket gone.
                _ = &mut send_task => break true,
            }
        }
    };

    // Unregistering drops the queue's sender, so the writer drains what is
    // left and exits. A writer stuck on a dead socket is cut off.
    dispatcher.disconnect(&session_id).await;
    if !writer_done && tokio::time::timeout(FLUSH_TIMEOUT, &mut send_task).await.is_err() {
        send_task.abort();
    }
}
