use serde_json::Value;

/// One event on a streaming channel (WebSocket or SSE).
///
/// Frames that fail to decode as JSON are logged and dropped; they never
/// appear here and never terminate the stream. `Error` and `Closed` are
/// terminal: the connection does not restart itself.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A decoded inbound JSON message.
    Message(Value),
    /// Transport-level failure, relayed verbatim.
    Error(String),
    /// The channel closed; code and reason come from the WebSocket close
    /// frame when the server supplied one.
    Closed {
        code: Option<u16>,
        reason: Option<String>,
    },
}
