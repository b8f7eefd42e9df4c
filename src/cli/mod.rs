//! Command-line console for a MiloMCP backend.

use clap::{Parser, Subcommand};
use log::warn;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api_clients::{LogQuery, McpClient, StreamEvent};
use crate::auth::{KeyringStore, SessionController, TokenManager, TokenStore};
use crate::config::ConsoleConfig;
use crate::error::{AppError, AppResult};

#[derive(Parser)]
#[command(name = "milomcp")]
#[command(about = "Administration console for a MiloMCP backend", version)]
pub struct Cli {
    /// Backend base URL (default: MILOMCP_SERVER_URL or http://localhost:3000)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Keep the token in memory only; do not touch the OS keyring
    #[arg(long, global = true)]
    no_keyring: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate against the backend and store the token
    Login {
        /// Bearer token issued by the backend
        token: String,
    },

    /// Clear the stored token and session
    Logout,

    /// Show the current session (role and permissions)
    Status,

    /// Check backend health
    Health,

    /// Show backend server information
    Info,

    /// Show system statistics
    Stats,

    /// Reload every tool on the backend
    ReloadAll,

    /// Tool management commands
    Tools {
        #[command(subcommand)]
        action: ToolsCommands,
    },

    /// User management commands (admin only)
    Users {
        #[command(subcommand)]
        action: UsersCommands,
    },

    /// Fetch backend logs
    Logs {
        /// Filter by log level
        #[arg(long)]
        level: Option<String>,

        /// Maximum number of entries
        #[arg(long)]
        limit: Option<u32>,

        /// Skip this many entries
        #[arg(long)]
        offset: Option<u32>,

        /// Filter by tool name
        #[arg(long)]
        tool: Option<String>,
    },

    /// Tail the bidirectional WebSocket channel
    Watch,

    /// Tail the server-sent events channel
    Events,
}

#[derive(Subcommand)]
enum ToolsCommands {
    /// List available tools
    List,

    /// Show one tool's definition
    Show {
        /// Tool name
        name: String,
    },

    /// Execute a tool
    Exec {
        /// Tool name
        name: String,

        /// Tool arguments as a JSON object
        #[arg(long = "args")]
        arguments: Option<String>,
    },

    /// Reload one tool
    Reload {
        /// Tool name
        name: String,
    },

    /// Enable a tool
    Enable {
        /// Tool name
        name: String,
    },

    /// Disable a tool
    Disable {
        /// Tool name
        name: String,
    },
}

#[derive(Subcommand)]
enum UsersCommands {
    /// List users
    List,

    /// Add a user from a JSON object
    Add {
        /// User record as a JSON object
        data: String,
    },

    /// Update a user from a JSON object
    Update {
        /// User id
        id: String,

        /// Fields to update as a JSON object
        data: String,
    },

    /// Delete a user
    Rm {
        /// User id
        id: String,
    },
}

pub async fn run(cli: Cli) -> AppResult<()> {
    let config = match &cli.server {
        Some(url) => ConsoleConfig::new(url.clone()),
        None => ConsoleConfig::default(),
    };

    let token_manager = if cli.no_keyring {
        Arc::new(TokenManager::in_memory())
    } else {
        let store: Arc<dyn TokenStore> = Arc::new(KeyringStore::default());
        Arc::new(TokenManager::new(Some(store)))
    };
    if let Err(e) = token_manager.load().await {
        warn!("Could not load stored token: {}", e);
    }

    let client = Arc::new(McpClient::new(&config, Arc::clone(&token_manager))?);
    let controller = SessionController::new(Arc::clone(&client), token_manager);

    match cli.command {
        Commands::Login { token } => {
            let session = controller.login(&token).await?;
            print_json(&json!({
                "role": session.role,
                "permissions": session.permissions,
            }))
        }
        Commands::Logout => {
            controller.logout().await;
            println!("Logged out");
            Ok(())
        }
        Commands::Status => {
            ensure_session(&controller).await?;
            match controller.session().await {
                Some(session) => print_json(&json!({
                    "server": client.base_url(),
                    "role": session.role,
                    "permissions": session.permissions,
                })),
                None => {
                    println!("Not logged in");
                    Ok(())
                }
            }
        }
        Commands::Health => print_json(&client.get_health().await?),
        Commands::Info => print_json(&client.get_server_info().await?),
        Commands::Stats => {
            ensure_session(&controller).await?;
            print_json(&client.get_stats().await?)
        }
        Commands::ReloadAll => {
            ensure_session(&controller).await?;
            print_json(&client.reload_all_tools().await?)
        }
        Commands::Tools { action } => {
            ensure_session(&controller).await?;
            match action {
                ToolsCommands::List => print_json(&client.get_tools().await?),
                ToolsCommands::Show { name } => print_json(&client.get_tool(&name).await?),
                ToolsCommands::Exec { name, arguments } => {
                    let arguments = arguments.map(|raw| parse_json_arg(&raw)).transpose()?;
                    print_json(&client.execute_tool(&name, arguments).await?)
                }
                ToolsCommands::Reload { name } => print_json(&client.reload_tool(&name).await?),
                ToolsCommands::Enable { name } => {
                    print_json(&client.set_tool_status(&name, true).await?)
                }
                ToolsCommands::Disable { name } => {
                    print_json(&client.set_tool_status(&name, false).await?)
                }
            }
        }
        Commands::Users { action } => {
            ensure_session(&controller).await?;
            match action {
                UsersCommands::List => print_json(&client.get_users().await?),
                UsersCommands::Add { data } => {
                    let data = parse_json_arg(&data)?;
                    print_json(&client.add_user(&data).await?)
                }
                UsersCommands::Update { id, data } => {
                    let data = parse_json_arg(&data)?;
                    print_json(&client.update_user(&id, &data).await?)
                }
                UsersCommands::Rm { id } => print_json(&client.delete_user(&id).await?),
            }
        }
        Commands::Logs {
            level,
            limit,
            offset,
            tool,
        } => {
            ensure_session(&controller).await?;
            let query = LogQuery {
                level,
                limit,
                offset,
                tool,
            };
            print_json(&client.get_logs(&query).await?)
        }
        Commands::Watch => {
            ensure_session(&controller).await?;
            let mut connection = client.connect_ws().await?;
            while let Some(event) = connection.recv().await {
                if !print_stream_event(event) {
                    break;
                }
            }
            Ok(())
        }
        Commands::Events => {
            ensure_session(&controller).await?;
            let mut connection = client.connect_sse().await?;
            while let Some(event) = connection.recv().await {
                if !print_stream_event(event) {
                    break;
                }
            }
            Ok(())
        }
    }
}

/// Router-guard equivalent: commands that need auth re-check the stored
/// token before doing anything, and refuse with a re-login hint.
async fn ensure_session(controller: &SessionController) -> AppResult<()> {
    if controller.validate().await? {
        Ok(())
    } else {
        Err(AppError::AuthError(
            "Not logged in; run `milomcp login <token>` first".to_string(),
        ))
    }
}

/// Print one inbound stream event; returns false on a terminal event.
fn print_stream_event(event: StreamEvent) -> bool {
    match event {
        StreamEvent::Message(message) => {
            println!("{}", message);
            true
        }
        StreamEvent::Error(message) => {
            eprintln!("stream error: {}", message);
            false
        }
        StreamEvent::Closed { code, reason } => {
            eprintln!(
                "stream closed (code: {}, reason: {})",
                code.map_or_else(|| "none".to_string(), |c| c.to_string()),
                reason.unwrap_or_default()
            );
            false
        }
    }
}

fn parse_json_arg(raw: &str) -> AppResult<Value> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::InvalidArgument(format!("Expected a JSON object: {}", e)))
}

fn print_json(value: &Value) -> AppResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::SerializationError(format!("Failed to render output: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}
