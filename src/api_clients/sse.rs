use futures::StreamExt;
use log::{debug, warn};
use reqwest_eventsource::{Event, EventSource};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{AppError, AppResult};

use super::stream::StreamEvent;

/// Handle for the one-way server push channel.
pub struct SseConnection {
    events: mpsc::UnboundedReceiver<StreamEvent>,
    task: JoinHandle<()>,
}

impl SseConnection {
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    pub fn close(&self) {
        self.task.abort();
    }
}

impl Drop for SseConnection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub(crate) fn connect(builder: reqwest::RequestBuilder) -> AppResult<SseConnection> {
    let mut es = EventSource::new(builder)
        .map_err(|e| AppError::InternalError(format!("Failed to open event source: {}", e)))?;
    let (event_tx, event_rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => debug!("SSE channel open"),
                Ok(Event::Message(message)) => match serde_json::from_str::<Value>(&message.data) {
                    Ok(value) => {
                        if event_tx.send(StreamEvent::Message(value)).is_err() {
                            break;
                        }
                    }
                    // Same decode-or-drop discipline as the WebSocket channel.
                    Err(e) => warn!("Dropping undecodable SSE event: {}", e),
                },
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    let _ = event_tx.send(StreamEvent::Closed {
                        code: None,
                        reason: None,
                    });
                    break;
                }
                Err(e) => {
                    // EventSource would reconnect on its own; this channel is
                    // non-restartable, so the first failure is terminal.
                    es.close();
                    let _ = event_tx.send(StreamEvent::Error(e.to_string()));
                    break;
                }
            }
        }
        debug!("SSE task terminated");
    });

    Ok(SseConnection {
        events: event_rx,
        task,
    })
}
