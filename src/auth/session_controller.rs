use log::{debug, info, warn};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::api_clients::mcp_client::McpClient;
use crate::error::{AppError, AppResult};

use super::session::Session;
use super::token_manager::TokenManager;

/// Owns the bearer token lifecycle and the derived role.
///
/// The backend has no "who am I" endpoint, so the role is inferred
/// behaviorally: a call to the admin-only user listing, then a call to the
/// tools listing any authenticated user can reach. The admin probe runs
/// strictly first; a token valid for both must classify as admin.
pub struct SessionController {
    client: Arc<McpClient>,
    token_manager: Arc<TokenManager>,
    session: RwLock<Option<Session>>,
}

impl SessionController {
    pub fn new(client: Arc<McpClient>, token_manager: Arc<TokenManager>) -> Self {
        Self {
            client,
            token_manager,
            session: RwLock::new(None),
        }
    }

    /// Authenticate with a candidate token.
    ///
    /// The token is attached to the probe calls but persisted only on
    /// success; a failed login leaves no trace of the candidate. A double
    /// denial is the only path to an auth failure; a network-level failure
    /// during probing propagates as a network error so callers can offer
    /// "retry" instead of "re-login".
    pub async fn login(&self, token: &str) -> AppResult<Session> {
        self.token_manager
            .set_in_memory(Some(token.to_string()))
            .await;

        match self.probe_privileges().await {
            Ok(session) => {
                self.token_manager.set(Some(token.to_string())).await?;
                *self.session.write().await = Some(session.clone());
                info!("Login succeeded, role: {:?}", session.role);
                Ok(session)
            }
            Err(e) => {
                self.token_manager.set_in_memory(None).await;
                Err(e)
            }
        }
    }

    /// Re-check the stored token, refreshing role and permissions in place.
    ///
    /// Returns `Ok(false)` immediately, with no network call, when no token
    /// is held. A denial of both probes tears the session down and returns
    /// `Ok(false)` (the silent re-auth path). A network failure is an error
    /// and leaves the stored session untouched.
    pub async fn validate(&self) -> AppResult<bool> {
        if self.token_manager.get().await.is_none() {
            return Ok(false);
        }

        match self.probe_privileges().await {
            Ok(session) => {
                debug!("Token validated, role: {:?}", session.role);
                *self.session.write().await = Some(session);
                Ok(true)
            }
            Err(AppError::NetworkError(e)) => Err(AppError::NetworkError(e)),
            Err(_) => {
                info!("Stored token no longer valid, clearing session");
                self.logout().await;
                Ok(false)
            }
        }
    }

    /// Clear token and role unconditionally. Idempotent.
    pub async fn logout(&self) {
        if let Err(e) = self.token_manager.set(None).await {
            warn!("Failed to clear persisted token: {}", e);
        }
        *self.session.write().await = None;
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub async fn has_permission(&self, permission: &str) -> bool {
        match &*self.session.read().await {
            Some(session) => session.allows(permission),
            None => false,
        }
    }

    /// Exchange the stored token for a fresh one via `/auth/refresh`.
    /// The session is cleared only when the refresh endpoint itself says
    /// the credential is dead.
    pub async fn refresh(&self) -> AppResult<()> {
        let response = match self.client.refresh_token().await {
            Ok(response) => response,
            Err(AppError::AuthError(e)) => {
                warn!("Refresh endpoint rejected the token, clearing session");
                self.logout().await;
                return Err(AppError::AuthError(e));
            }
            Err(e) => return Err(e),
        };

        let new_token = response
            .get("token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AppError::InvalidResponse("Refresh response carried no token".to_string())
            })?;
        self.token_manager.set(Some(new_token.to_string())).await?;
        info!("Token refreshed");
        Ok(())
    }

    /// Admin probe first, user probe second. Success order decides the
    /// role; probe order is a contract, not an optimization.
    async fn probe_privileges(&self) -> AppResult<Session> {
        match self.client.get_users().await {
            Ok(_) => return Ok(Session::admin()),
            Err(AppError::NetworkError(e)) => return Err(AppError::NetworkError(e)),
            Err(e) => debug!("Admin probe denied: {}", e),
        }

        match self.client.get_tools().await {
            Ok(_) => Ok(Session::user()),
            Err(AppError::NetworkError(e)) => Err(AppError::NetworkError(e)),
            Err(e) => {
                debug!("User probe denied: {}", e);
                Err(AppError::AuthError(
                    "Invalid token or insufficient permissions".to_string(),
                ))
            }
        }
    }
}
