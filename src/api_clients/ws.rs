use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use crate::constants::WS_PATH;
use crate::error::{AppError, AppResult};

use super::stream::StreamEvent;

/// Handle for the bidirectional streaming channel.
///
/// Owns the spawned sender/receiver tasks; dropping the handle tears the
/// connection down. Independent of the token and of any SSE connection.
pub struct WsConnection {
    events: mpsc::UnboundedReceiver<StreamEvent>,
    outbound: mpsc::UnboundedSender<Message>,
    sender_task: JoinHandle<()>,
    receiver_task: JoinHandle<()>,
}

impl WsConnection {
    /// Next inbound event. `None` after a terminal event has been consumed
    /// and the tasks have wound down.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// Queue one JSON frame for sending.
    pub fn send_json(&self, value: &Value) -> AppResult<()> {
        let text = serde_json::to_string(value)
            .map_err(|e| AppError::SerializationError(format!("Failed to serialize frame: {}", e)))?;
        self.outbound
            .send(Message::text(text))
            .map_err(|_| AppError::NetworkError("WebSocket connection is closed".to_string()))
    }

    /// Request a clean close. Events already received still drain.
    pub fn close(&self) {
        let _ = self.outbound.send(Message::Close(None));
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.sender_task.abort();
        self.receiver_task.abort();
    }
}

/// Derive the streaming URL from the HTTP base URL (http→ws, https→wss).
pub fn websocket_url(base_url: &str) -> AppResult<String> {
    let mut url = Url::parse(base_url)
        .map_err(|e| AppError::ConfigError(format!("Invalid base URL: {}", e)))?;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    url.set_scheme(scheme).map_err(|_| {
        AppError::ConfigError(format!("Cannot derive WebSocket scheme from: {}", base_url))
    })?;
    let url = url
        .join(WS_PATH)
        .map_err(|e| AppError::ConfigError(format!("Invalid WebSocket URL: {}", e)))?;
    Ok(url.to_string())
}

pub(crate) async fn connect(base_url: &str, token: Option<String>) -> AppResult<WsConnection> {
    let ws_url = websocket_url(base_url)?;
    info!("Connecting to WebSocket at: {}", ws_url);

    let (ws_stream, _) = connect_async(ws_url.as_str())
        .await
        .map_err(|e| AppError::NetworkError(format!("WebSocket connection failed: {}", e)))?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // The authentication frame goes out before any other client traffic.
    if let Some(token) = token {
        let auth_frame = serde_json::to_string(&json!({"type": "auth", "token": token}))
            .map_err(|e| AppError::SerializationError(format!("Failed to serialize auth frame: {}", e)))?;
        ws_sender
            .send(Message::text(auth_frame))
            .await
            .map_err(|e| AppError::NetworkError(format!("Failed to send auth frame: {}", e)))?;
    }

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let sender_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = ws_sender.send(msg).await {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
        debug!("WebSocket sender task terminated");
    });

    let receiver_task = tokio::spawn(async move {
        let mut terminal_sent = false;
        while let Some(msg) = ws_receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<Value>(&text) {
                    Ok(value) => {
                        if event_tx.send(StreamEvent::Message(value)).is_err() {
                            break;
                        }
                    }
                    // Decode failures are dropped events, not stream-terminating errors.
                    Err(e) => warn!("Dropping undecodable WebSocket frame: {}", e),
                },
                Ok(Message::Close(frame)) => {
                    let (code, reason) = match frame {
                        Some(f) => (Some(u16::from(f.code)), Some(f.reason.to_string())),
                        None => (None, None),
                    };
                    let _ = event_tx.send(StreamEvent::Closed { code, reason });
                    terminal_sent = true;
                    break;
                }
                // Ping/pong/binary frames carry no console traffic.
                Ok(_) => {}
                Err(e) => {
                    let _ = event_tx.send(StreamEvent::Error(e.to_string()));
                    terminal_sent = true;
                    break;
                }
            }
        }
        if !terminal_sent {
            let _ = event_tx.send(StreamEvent::Closed {
                code: None,
                reason: None,
            });
        }
        debug!("WebSocket receiver task terminated");
    });

    Ok(WsConnection {
        events: event_rx,
        outbound: outbound_tx,
        sender_task,
        receiver_task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn test_websocket_url_scheme_mapping() {
        assert_eq!(
            websocket_url("http://localhost:3000").unwrap(),
            "ws://localhost:3000/ws"
        );
        assert_eq!(
            websocket_url("https://example.com").unwrap(),
            "wss://example.com/ws"
        );
    }

    #[tokio::test]
    async fn test_auth_frame_is_first_client_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            let first = ws.next().await.unwrap().unwrap();
            let value: Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
            assert_eq!(value, json!({"type": "auth", "token": "tok123"}));

            ws.send(Message::text(r#"{"event":"tool_reloaded"}"#))
                .await
                .unwrap();
            ws.send(Message::text("not json")).await.unwrap();
            ws.send(Message::text(r#"{"event":"second"}"#)).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let base_url = format!("http://{}", addr);
        let mut conn = connect(&base_url, Some("tok123".to_string()))
            .await
            .unwrap();

        match conn.recv().await.unwrap() {
            StreamEvent::Message(v) => assert_eq!(v["event"], "tool_reloaded"),
            other => panic!("expected message, got {:?}", other),
        }
        // The undecodable frame was dropped, not surfaced and not terminal.
        match conn.recv().await.unwrap() {
            StreamEvent::Message(v) => assert_eq!(v["event"], "second"),
            other => panic!("expected message, got {:?}", other),
        }
        match conn.recv().await.unwrap() {
            StreamEvent::Closed { .. } => {}
            other => panic!("expected close, got {:?}", other),
        }

        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_no_auth_frame_without_token() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            // First client frame must be application traffic, not auth.
            let first = ws.next().await.unwrap().unwrap();
            let value: Value = serde_json::from_str(first.to_text().unwrap()).unwrap();
            assert_eq!(value, json!({"hello": 1}));
            ws.close(None).await.unwrap();
        });

        let base_url = format!("http://{}", addr);
        let mut conn = connect(&base_url, None).await.unwrap();
        conn.send_json(&json!({"hello": 1})).unwrap();

        match conn.recv().await.unwrap() {
            StreamEvent::Closed { .. } => {}
            other => panic!("expected close, got {:?}", other),
        }
        server.await.unwrap();
    }
}
