/// Default MiloMCP server base URL when no configuration is provided.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Fixed request timeout in seconds. Once a call is issued it runs to
/// completion; this timeout is the only cancellation-like mechanism.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// TCP connect timeout in seconds.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Path of the bidirectional streaming endpoint, relative to the base URL.
pub const WS_PATH: &str = "/ws";

/// Path of the server-sent-events endpoint, relative to the base URL.
pub const SSE_PATH: &str = "/sse";

/// JSON-RPC protocol version sent in every envelope.
pub const JSONRPC_VERSION: &str = "2.0";

// Keyring coordinates for the persisted bearer token
pub const SERVICE_NAME_FOR_KEYRING: &str = "milomcp-console";
pub const ACCOUNT_NAME_FOR_KEYRING: &str = "default";
