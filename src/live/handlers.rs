use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use time::Date;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::state::AppState;

use super::watch::DayWatch;

pub fn routes() -> Router<AppState> {
    Router::new().route("/users/:uid/logs/:date/live", get(watch_day))
}

/// Live day view: streams a JSON [`DaySnapshot`](super::watch::DaySnapshot)
/// on open and after every committed change to the watched (user, date).
#[instrument(skip(state, ws))]
async fn watch_day(
    State(state): State<AppState>,
    Path((uid, date)): Path<(Uuid, Date)>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| stream_day(state, uid, date, socket))
}

async fn stream_day(state: AppState, uid: Uuid, date: Date, mut socket: WebSocket) {
    let mut watch = match DayWatch::open(&state, uid, date).await {
        Ok(watch) => watch,
        Err(e) => {
            warn!(error = %e, %uid, %date, "failed to open day watch");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    loop {
        tokio::select! {
            snapshot = watch.next() => {
                let Some(snapshot) = snapshot else {
                    // Session stopped (store failure); tell the client.
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                };
                let Ok(json) = serde_json::to_string(&snapshot) else {
                    break;
                };
                if socket.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Pings are answered by axum; client text is ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    // Deterministic release on every exit path.
    watch.close();
}
