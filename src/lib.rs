//! Headless administration console for a MiloMCP backend.
//!
//! Two layers: an API client that normalizes the backend's REST and
//! JSON-RPC 2.0 calling conventions (plus its WebSocket and SSE streaming
//! channels) into one error model, and a session controller that owns the
//! bearer token lifecycle and infers the caller's role by probing.

pub mod api_clients;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod utils;

pub use api_clients::{ConnectionTest, LogQuery, McpClient, SseConnection, StreamEvent, WsConnection};
pub use auth::{Role, Session, SessionController, TokenManager};
pub use config::ConsoleConfig;
pub use error::{AppError, AppResult};
