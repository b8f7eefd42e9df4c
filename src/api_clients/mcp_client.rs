use std::sync::Arc;
use std::time::Instant;

use log::{debug, info};
use reqwest::{header, Client, Method};
use serde::Serialize;
use serde_json::Value;

use crate::auth::token_manager::TokenManager;
use crate::config::ConsoleConfig;
use crate::error::{AppError, AppResult};

use super::client_factory;
use super::error_handling::{map_rest_error, map_transport_error};
use super::rpc::{tool_call_params, RpcRequest};

/// Query options for the log endpoints.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub level: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub tool: Option<String>,
}

impl LogQuery {
    fn to_query_string(&self) -> String {
        let mut params = Vec::new();
        if let Some(level) = &self.level {
            params.push(format!("level={}", urlencoding::encode(level)));
        }
        if let Some(limit) = self.limit {
            params.push(format!("limit={}", limit));
        }
        if let Some(offset) = self.offset {
            params.push(format!("offset={}", offset));
        }
        if let Some(tool) = &self.tool {
            params.push(format!("tool={}", urlencoding::encode(tool)));
        }
        if params.is_empty() {
            String::new()
        } else {
            format!("?{}", params.join("&"))
        }
    }
}

/// Result of a connectivity round trip against `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub response_time_ms: u64,
    pub message: String,
}

/// Single chokepoint for all MiloMCP backend calls.
///
/// Normalizes the two calling conventions (plain REST and JSON-RPC 2.0)
/// into one error model. The bearer token lives in the shared
/// `TokenManager`; every outgoing call snapshots it at issue time, so
/// setting or clearing the token never affects calls already in flight.
pub struct McpClient {
    http: Client,
    base_url: String,
    token_manager: Arc<TokenManager>,
}

impl McpClient {
    pub fn new(config: &ConsoleConfig, token_manager: Arc<TokenManager>) -> AppResult<Self> {
        let http = client_factory::create_http_client(config)?;
        Ok(Self {
            http,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            token_manager,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_manager(&self) -> &Arc<TokenManager> {
        &self.token_manager
    }

    /// Set the credential attached to all future outgoing calls.
    /// Not persisted; persistence is the session controller's decision.
    pub async fn set_token(&self, token: impl Into<String>) {
        self.token_manager.set_in_memory(Some(token.into())).await;
    }

    /// Drop the credential for all future outgoing calls.
    pub async fn clear_token(&self) {
        self.token_manager.set_in_memory(None).await;
    }

    /// REST chokepoint: issue one HTTP call and normalize every failure.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        context: &str,
    ) -> AppResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method, &url);

        // Credential snapshot for this call only.
        if let Some(token) = self.token_manager.get().await {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(body) = body {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_transport_error(&e, context))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(map_rest_error(status.as_u16(), &body_text, context));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::InvalidResponse(format!("{}: {}", context, e)))?;
        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            AppError::InvalidResponse(format!("{}: failed to parse response: {}", context, e))
        })
    }

    // ==========================================================================
    // Health and System Endpoints
    // ==========================================================================

    pub async fn get_health(&self) -> AppResult<Value> {
        self.request(Method::GET, "/health", None, "Failed to check server health")
            .await
    }

    pub async fn get_server_info(&self) -> AppResult<Value> {
        self.request(Method::GET, "/info", None, "Failed to get server information")
            .await
    }

    /// Round-trip `/health` and report latency instead of failing.
    pub async fn test_connection(&self) -> ConnectionTest {
        let start = Instant::now();
        match self.get_health().await {
            Ok(_) => {
                let response_time_ms = start.elapsed().as_millis() as u64;
                ConnectionTest {
                    success: true,
                    response_time_ms,
                    message: format!("Connection successful ({}ms)", response_time_ms),
                }
            }
            Err(e) => ConnectionTest {
                success: false,
                response_time_ms: start.elapsed().as_millis() as u64,
                message: e.to_string(),
            },
        }
    }

    // ==========================================================================
    // JSON-RPC 2.0 Support
    // ==========================================================================

    /// Send one JSON-RPC 2.0 request and return the decoded response body.
    ///
    /// A response carrying an `error` member is raised as a normalized
    /// server error using the server-supplied message when present.
    pub async fn json_rpc(
        &self,
        method: &str,
        params: Option<Value>,
        id: Option<String>,
    ) -> AppResult<Value> {
        let context = format!("JSON-RPC call failed: {}", method);
        let envelope = RpcRequest::new(method, params, id);
        let body = serde_json::to_value(&envelope)
            .map_err(|e| AppError::SerializationError(format!("{}: {}", context, e)))?;

        let response = self
            .request(Method::POST, "/jsonrpc", Some(&body), &context)
            .await?;

        if let Some(err) = response.get("error") {
            let message = err
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("JSON-RPC error");
            return Err(AppError::ServerError(format!("{}: {}", context, message)));
        }

        Ok(response)
    }

    // ==========================================================================
    // Tools Management
    // ==========================================================================

    /// List available tools: JSON-RPC dialect first, transparent fallback
    /// to the REST dialect on any RPC failure. Both failing returns the
    /// REST failure, never the RPC one.
    pub async fn get_tools(&self) -> AppResult<Value> {
        match self.json_rpc("tools/list", None, None).await {
            Ok(response) => Ok(response),
            Err(rpc_error) => {
                debug!(
                    "tools/list via JSON-RPC failed ({}), falling back to GET /tools",
                    rpc_error
                );
                self.request(Method::GET, "/tools", None, "Failed to get tools list")
                    .await
            }
        }
    }

    pub async fn get_tool(&self, tool_name: &str) -> AppResult<Value> {
        let path = format!("/tools/{}", urlencoding::encode(tool_name));
        let context = format!("Failed to get tool: {}", tool_name);
        self.request(Method::GET, &path, None, &context).await
    }

    /// Execute a tool via JSON-RPC `tools/call`. `arguments` is omitted
    /// from the params entirely when there is nothing to send.
    pub async fn execute_tool(&self, tool_name: &str, arguments: Option<Value>) -> AppResult<Value> {
        let params = tool_call_params(tool_name, arguments);
        info!("Executing tool: {}", tool_name);
        self.json_rpc("tools/call", Some(params), None).await
    }

    pub async fn reload_tool(&self, tool_name: &str) -> AppResult<Value> {
        let path = format!("/tools/{}/reload", urlencoding::encode(tool_name));
        let context = format!("Failed to reload tool: {}", tool_name);
        self.request(Method::POST, &path, None, &context).await
    }

    pub async fn reload_all_tools(&self) -> AppResult<Value> {
        self.request(Method::POST, "/reload", None, "Failed to reload all tools")
            .await
    }

    pub async fn set_tool_status(&self, tool_name: &str, enabled: bool) -> AppResult<Value> {
        let path = format!("/tools/{}/status", urlencoding::encode(tool_name));
        let context = format!("Failed to set tool status: {}", tool_name);
        let body = serde_json::json!({ "enabled": enabled });
        self.request(Method::PATCH, &path, Some(&body), &context)
            .await
    }

    // ==========================================================================
    // Authentication
    // ==========================================================================

    pub async fn validate_token(&self) -> AppResult<Value> {
        self.request(Method::POST, "/auth/validate", None, "Failed to validate token")
            .await
    }

    pub async fn refresh_token(&self) -> AppResult<Value> {
        self.request(Method::POST, "/auth/refresh", None, "Failed to refresh token")
            .await
    }

    // ==========================================================================
    // Logs and Monitoring
    // ==========================================================================

    pub async fn get_logs(&self, query: &LogQuery) -> AppResult<Value> {
        let path = format!("/logs{}", query.to_query_string());
        self.request(Method::GET, &path, None, "Failed to get logs")
            .await
    }

    pub async fn get_tool_logs(&self, tool_name: &str, query: &LogQuery) -> AppResult<Value> {
        let path = format!(
            "/tools/{}/logs{}",
            urlencoding::encode(tool_name),
            query.to_query_string()
        );
        let context = format!("Failed to get logs for tool: {}", tool_name);
        self.request(Method::GET, &path, None, &context).await
    }

    pub async fn get_stats(&self) -> AppResult<Value> {
        self.request(Method::GET, "/stats", None, "Failed to get system statistics")
            .await
    }

    // ==========================================================================
    // User Management (Admin Only)
    // ==========================================================================

    pub async fn get_users(&self) -> AppResult<Value> {
        self.request(Method::GET, "/admin/users", None, "Failed to get users list")
            .await
    }

    pub async fn add_user(&self, user_data: &Value) -> AppResult<Value> {
        self.request(
            Method::POST,
            "/admin/users",
            Some(user_data),
            "Failed to add user",
        )
        .await
    }

    pub async fn update_user(&self, user_id: &str, user_data: &Value) -> AppResult<Value> {
        let path = format!("/admin/users/{}", urlencoding::encode(user_id));
        self.request(Method::PATCH, &path, Some(user_data), "Failed to update user")
            .await
    }

    pub async fn delete_user(&self, user_id: &str) -> AppResult<Value> {
        let path = format!("/admin/users/{}", urlencoding::encode(user_id));
        self.request(Method::DELETE, &path, None, "Failed to delete user")
            .await
    }

    // ==========================================================================
    // Streaming Channels
    // ==========================================================================

    /// Open the bidirectional streaming channel. When a token is held, the
    /// first client frame is the `{"type":"auth","token":...}` frame.
    pub async fn connect_ws(&self) -> AppResult<super::ws::WsConnection> {
        super::ws::connect(&self.base_url, self.token_manager.get().await).await
    }

    /// Open the one-way server push channel. The bearer header is attached
    /// when a token is held; there is no auth frame on this channel.
    pub async fn connect_sse(&self) -> AppResult<super::sse::SseConnection> {
        let mut builder = self
            .http
            .get(format!("{}{}", self.base_url, crate::constants::SSE_PATH));
        if let Some(token) = self.token_manager.get().await {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        super::sse::connect(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn client_for(server: &mockito::ServerGuard) -> McpClient {
        let config = ConsoleConfig::new(server.url());
        McpClient::new(&config, Arc::new(TokenManager::in_memory())).unwrap()
    }

    #[tokio::test]
    async fn test_bearer_header_attached_when_token_set() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/tools")
            .match_header("authorization", "Bearer abc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tools":[]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        client.set_token("abc").await;
        let result = client
            .request(Method::GET, "/tools", None, "Failed to get tools list")
            .await
            .unwrap();
        assert_eq!(result, json!({"tools": []}));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cleared_token_not_attached_to_later_calls() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        client.set_token("abc").await;
        client.clear_token().await;
        client.get_health().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_2xx_is_normalized_with_context_and_detail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/admin/users")
            .with_status(401)
            .with_body(r#"{"error":{"message":"bad token"}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.get_users().await.unwrap_err();
        assert!(matches!(err, AppError::AuthError(_)));
        assert!(err.to_string().contains("Failed to get users list"));
        assert!(err.to_string().contains("bad token"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        // Nothing listens on this port.
        let config = ConsoleConfig::new("http://127.0.0.1:9");
        let client = McpClient::new(&config, Arc::new(TokenManager::in_memory())).unwrap();
        let err = client.get_health().await.unwrap_err();
        assert!(matches!(err, AppError::NetworkError(_)));
    }

    #[tokio::test]
    async fn test_json_rpc_error_member_is_raised() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/jsonrpc")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":"1","error":{"code":-32601,"message":"method not found"}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.json_rpc("nope", None, None).await.unwrap_err();
        assert!(matches!(err, AppError::ServerError(_)));
        assert!(err.to_string().contains("method not found"));
    }

    #[tokio::test]
    async fn test_json_rpc_error_without_message_uses_generic_text() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/jsonrpc")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":"1","error":{}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.json_rpc("tools/list", None, None).await.unwrap_err();
        assert!(err.to_string().contains("JSON-RPC error"));
    }

    #[tokio::test]
    async fn test_json_rpc_envelope_omits_empty_params_on_wire() {
        let mut server = mockito::Server::new_async().await;
        // Exact body match with a pinned id: proves `params` is absent
        // from the transmitted envelope, not just empty.
        let mock = server
            .mock("POST", "/jsonrpc")
            .match_body(Matcher::Json(json!({
                "jsonrpc": "2.0",
                "method": "tools/list",
                "id": "req-1"
            })))
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":"req-1","result":{"tools":[]}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        client
            .json_rpc("tools/list", Some(json!({})), Some("req-1".to_string()))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_execute_tool_sends_name_only_without_arguments() {
        let mut server = mockito::Server::new_async().await;
        // The absence of an `arguments` key in the params object is pinned
        // down by the tool_call_params unit tests; here we check the wire
        // shape of the call itself.
        let mock = server
            .mock("POST", "/jsonrpc")
            .match_body(Matcher::PartialJson(json!({
                "method": "tools/call",
                "params": {"name": "x"}
            })))
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":"1","result":{}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        client.execute_tool("x", None).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_execute_tool_sends_arguments_when_present() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/jsonrpc")
            .match_body(Matcher::PartialJson(json!({
                "method": "tools/call",
                "params": {"name": "x", "arguments": {"a": 1}}
            })))
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":"1","result":{}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        client.execute_tool("x", Some(json!({"a": 1}))).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_tools_falls_back_to_rest_on_rpc_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/jsonrpc")
            .with_status(500)
            .with_body("rpc dialect broken")
            .create_async()
            .await;
        let rest = server
            .mock("GET", "/tools")
            .with_status(200)
            .with_body(r#"{"tools":[{"name":"calc"}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let tools = client.get_tools().await.unwrap();
        assert_eq!(tools, json!({"tools": [{"name": "calc"}]}));
        rest.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_tools_returns_rest_failure_when_both_dialects_fail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/jsonrpc")
            .with_status(500)
            .create_async()
            .await;
        server
            .mock("GET", "/tools")
            .with_status(403)
            .with_body(r#"{"message":"denied"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.get_tools().await.unwrap_err();
        // The REST failure wins, not the RPC one.
        assert!(matches!(err, AppError::AccessDenied(_)));
        assert!(err.to_string().contains("Failed to get tools list"));
    }

    #[tokio::test]
    async fn test_log_query_string() {
        let query = LogQuery {
            level: Some("error".to_string()),
            limit: Some(50),
            offset: None,
            tool: Some("my tool".to_string()),
        };
        assert_eq!(
            query.to_query_string(),
            "?level=error&limit=50&tool=my%20tool"
        );
        assert_eq!(LogQuery::default().to_query_string(), "");
    }

    #[tokio::test]
    async fn test_tool_name_is_percent_encoded_in_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/tools/my%20tool")
            .with_status(200)
            .with_body(r#"{"name":"my tool"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        client.get_tool("my tool").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_body_on_success_is_null() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/reload")
            .with_status(204)
            .create_async()
            .await;

        let client = client_for(&server);
        assert_eq!(client.reload_all_tools().await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_test_connection_reports_failure_without_error() {
        let config = ConsoleConfig::new("http://127.0.0.1:9");
        let client = McpClient::new(&config, Arc::new(TokenManager::in_memory())).unwrap();
        let result = client.test_connection().await;
        assert!(!result.success);
        assert!(!result.message.is_empty());
    }
}
