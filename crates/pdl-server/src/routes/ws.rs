//! `GET /api/ws`: the broadcast endpoint.
//!
//! A writer task drains the connection's hub queue into the socket; the
//! reader loop handles client frames. Removing the connection from the hub
//! (disconnect or heartbeat timeout) drops the queue and ends the writer,
//! which in turn ends the session even if the peer never sends again.

use std::fmt::Display;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::protocol::{MessageType, WireMessage};
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(app): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app))
}

async fn handle_socket(socket: WebSocket, app: AppState) {
    let (sink, stream) = socket.split();
    let (id, rx) = app.hub.connect();
    run_session(&app, &id, sink, stream, rx).await;
}

/// Pump one connection until either side finishes, then drop it from the hub.
async fn run_session<S, R, E>(
    app: &AppState,
    id: &str,
    mut sink: S,
    mut stream: R,
    mut rx: mpsc::Receiver<WireMessage>,
) where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Send,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let mut writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(Message::Text(msg.encode().into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let reader = async {
        while let Some(frame) = stream.next().await {
            let frame = match frame {
                Ok(f) => f,
                Err(e) => {
                    tracing::debug!(connection = %id, error = %e, "socket read failed");
                    break;
                }
            };
            app.hub.touch(id);
            match frame {
                Message::Text(text) => handle_client_frame(app, id, text.as_str()).await,
                Message::Close(_) => break,
                _ => {}
            }
        }
    };

    tokio::select! {
        _ = reader => writer.abort(),
        _ = &mut writer => {
            tracing::debug!(connection = %id, "outbound queue closed, ending session");
        }
    }

    app.hub.disconnect(id);
}

/// React to one text frame from connection `id`. Replies go through the hub
/// queue so ordering with broadcasts is preserved.
pub async fn handle_client_frame(app: &AppState, id: &str, text: &str) {
    let msg = match WireMessage::decode(text) {
        Ok(m) => m,
        Err(e) => {
            app.hub.send_to(id, WireMessage::error(e.to_string()).with_session(id));
            return;
        }
    };

    match msg.kind {
        MessageType::Subscribe => {
            let Some(project) = msg.project_name else {
                app.hub.send_to(
                    id,
                    WireMessage::error("subscribe requires project_name").with_session(id),
                );
                return;
            };
            app.hub.subscribe(id, &project);
            app.hub.send_to(
                id,
                WireMessage::new(MessageType::Subscribe, serde_json::json!({ "subscribed": true }))
                    .for_project(&project)
                    .with_session(id),
            );
            send_snapshot(app, id, &project).await;
        }
        MessageType::Unsubscribe => {
            let Some(project) = msg.project_name else {
                app.hub.send_to(
                    id,
                    WireMessage::error("unsubscribe requires project_name").with_session(id),
                );
                return;
            };
            let was = app.hub.unsubscribe(id, &project);
            app.hub.send_to(
                id,
                WireMessage::new(
                    MessageType::Unsubscribe,
                    serde_json::json!({ "unsubscribed": was }),
                )
                .for_project(&project)
                .with_session(id),
            );
        }
        MessageType::Ping => {
            app.hub.send_to(
                id,
                WireMessage::new(MessageType::Pong, serde_json::Value::Null).with_session(id),
            );
        }
        MessageType::Pong => {}
        other => {
            app.hub.send_to(
                id,
                WireMessage::error(format!("'{other}' is not accepted from clients"))
                    .with_session(id),
            );
        }
    }
}

/// Full-state frame following a subscribe acknowledgment.
async fn send_snapshot(app: &AppState, id: &str, project: &str) {
    let engine = app.engine.clone();
    let name = project.to_string();
    let loaded = tokio::task::spawn_blocking(move || engine.project(&name)).await;
    match loaded {
        Ok(Ok(p)) => {
            app.mark_seen(&p);
            let payload = serde_json::to_value(&p).unwrap_or_default();
            app.hub.send_to(
                id,
                WireMessage::new(MessageType::ProjectUpdate, payload)
                    .for_project(project)
                    .with_session(id),
            );
        }
        Ok(Err(e)) if e.is_not_found() => {
            app.hub.send_to(id, WireMessage::error(e.to_string()).for_project(project).with_session(id));
        }
        Ok(Err(e)) => {
            tracing::warn!(project, error = %e, "snapshot load failed; subscriber gets no snapshot");
        }
        Err(e) => {
            tracing::warn!(project, error = %e, "snapshot task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::app_state;
    use std::time::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn subscribe_acks_then_snapshots() {
        let dir = TempDir::new().unwrap();
        let app = app_state(dir.path());
        app.engine.create_project("alpha", None, None).unwrap();
        let (id, mut rx) = app.hub.connect();

        handle_client_frame(&app, &id, r#"{"type":"subscribe","project_name":"alpha"}"#).await;

        let ack = rx.try_recv().unwrap();
        assert_eq!(ack.kind, MessageType::Subscribe);
        assert_eq!(ack.session_id.as_deref(), Some(id.as_str()));
        let snapshot = rx.try_recv().unwrap();
        assert_eq!(snapshot.kind, MessageType::ProjectUpdate);
        assert_eq!(snapshot.payload["name"], "alpha");
        assert_eq!(app.hub.subscriber_count("alpha"), 1);
    }

    #[tokio::test]
    async fn subscribe_to_missing_project_reports_error() {
        let dir = TempDir::new().unwrap();
        let app = app_state(dir.path());
        let (id, mut rx) = app.hub.connect();

        handle_client_frame(&app, &id, r#"{"type":"subscribe","project_name":"ghost"}"#).await;
        assert_eq!(rx.try_recv().unwrap().kind, MessageType::Subscribe);
        assert_eq!(rx.try_recv().unwrap().kind, MessageType::Error);
    }

    #[tokio::test]
    async fn unknown_type_yields_error_and_connection_stays() {
        let dir = TempDir::new().unwrap();
        let app = app_state(dir.path());
        let (id, mut rx) = app.hub.connect();

        handle_client_frame(&app, &id, r#"{"type":"teleport"}"#).await;
        let err = rx.try_recv().unwrap();
        assert_eq!(err.kind, MessageType::Error);
        assert!(err.payload["message"].as_str().unwrap().contains("teleport"));
        assert_eq!(app.hub.connection_count(), 1);

        handle_client_frame(&app, &id, r#"{"type":"ping"}"#).await;
        assert_eq!(rx.try_recv().unwrap().kind, MessageType::Pong);
    }

    #[tokio::test]
    async fn subscribe_without_project_is_rejected() {
        let dir = TempDir::new().unwrap();
        let app = app_state(dir.path());
        let (id, mut rx) = app.hub.connect();

        handle_client_frame(&app, &id, r#"{"type":"subscribe"}"#).await;
        assert_eq!(rx.try_recv().unwrap().kind, MessageType::Error);
        assert!(app.hub.subscribed_projects().is_empty());
    }

    #[tokio::test]
    async fn server_types_are_refused_from_clients() {
        let dir = TempDir::new().unwrap();
        let app = app_state(dir.path());
        let (id, mut rx) = app.hub.connect();

        handle_client_frame(&app, &id, r#"{"type":"phase_update","project_name":"alpha"}"#)
            .await;
        assert_eq!(rx.try_recv().unwrap().kind, MessageType::Error);
    }

    #[tokio::test]
    async fn reaped_connection_ends_a_silent_session() {
        let dir = TempDir::new().unwrap();
        let app = app_state(dir.path());
        let (id, rx) = app.hub.connect();
        let (sink, _peer) = futures::channel::mpsc::unbounded::<Message>();
        // Peer that never sends a frame, not even a close.
        let silent = futures::stream::pending::<Result<Message, axum::Error>>();

        let session = tokio::spawn({
            let app = app.clone();
            let id = id.clone();
            async move { run_session(&app, &id, sink, silent, rx).await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(app.hub.reap_idle(Duration::ZERO), vec![id]);

        tokio::time::timeout(Duration::from_secs(2), session)
            .await
            .expect("session outlived its hub entry")
            .unwrap();
        assert_eq!(app.hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn client_close_disconnects_and_stops_writer() {
        let dir = TempDir::new().unwrap();
        let app = app_state(dir.path());
        let (id, rx) = app.hub.connect();
        let (sink, _peer) = futures::channel::mpsc::unbounded::<Message>();
        let frames = futures::stream::iter(vec![Ok::<_, axum::Error>(Message::Close(None))]);

        tokio::time::timeout(Duration::from_secs(2), run_session(&app, &id, sink, frames, rx))
            .await
            .expect("session ignored the close frame");
        assert_eq!(app.hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn session_replies_flow_through_the_writer() {
        let dir = TempDir::new().unwrap();
        let app = app_state(dir.path());
        let (id, rx) = app.hub.connect();
        let (sink, mut peer) = futures::channel::mpsc::unbounded::<Message>();
        let (client, frames) = futures::channel::mpsc::unbounded::<Result<Message, axum::Error>>();

        let session = tokio::spawn({
            let app = app.clone();
            let id = id.clone();
            async move { run_session(&app, &id, sink, frames, rx).await }
        });

        client
            .unbounded_send(Ok(Message::Text(r#"{"type":"ping"}"#.into())))
            .unwrap();
        let reply = tokio::time::timeout(Duration::from_secs(2), peer.next())
            .await
            .unwrap()
            .unwrap();
        let Message::Text(text) = reply else { panic!("expected a text frame") };
        assert_eq!(WireMessage::decode(text.as_str()).unwrap().kind, MessageType::Pong);

        drop(client);
        tokio::time::timeout(Duration::from_secs(2), session).await.unwrap().unwrap();
        assert_eq!(app.hub.connection_count(), 0);
    }
}
