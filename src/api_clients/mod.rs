// Root module for API clients
pub mod client_factory;
pub mod error_handling;
pub mod mcp_client;
pub mod rpc;
pub mod sse;
pub mod stream;
pub mod ws;

pub use mcp_client::{ConnectionTest, LogQuery, McpClient};
pub use rpc::RpcRequest;
pub use sse::SseConnection;
pub use stream::StreamEvent;
pub use ws::WsConnection;
