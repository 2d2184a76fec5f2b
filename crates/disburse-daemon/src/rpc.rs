//! JSON-RPC server over Unix socket.
//!
//! Listens on a Unix domain socket, accepts connections, and dispatches
//! newline-delimited JSON-RPC calls to the command handlers. A connection
//! that calls `subscribe_events` also receives committed events as
//! `event` notifications until it unsubscribes or disconnects.
//!
//! The `caller` parameter of a mutating method is taken as given: the
//! socket does not authenticate peers. Owner and operator checks are only
//! as strong as access to the socket, which is restricted to the daemon's
//! user (mode 0600).

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;

use disburse_core::{AssetError, DistributorError};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::UnixListener;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::commands;
use crate::events::{Event, EventFilter};
use crate::DaemonState;

/// JSON-RPC request.
#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: serde_json::Value,
}

/// JSON-RPC response.
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version.
    pub jsonrpc: String,
    /// Request ID.
    pub id: serde_json::Value,
    /// Result or error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Server-initiated notification (no `id`).
#[derive(Debug, Serialize)]
pub struct RpcNotification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: &'a Event,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Error name.
    pub message: String,
    /// Optional structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcResponse {
    /// Create a success response.
    pub fn success(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: serde_json::Value, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

impl RpcError {
    fn new(code: i32, message: &str, data: Option<serde_json::Value>) -> Self {
        Self {
            code,
            message: message.to_string(),
            data,
        }
    }

    // Standard JSON-RPC errors

    /// Parse error (-32700).
    pub fn parse_error() -> Self {
        Self::new(-32700, "PARSE_ERROR", None)
    }

    /// Invalid request (-32600).
    pub fn invalid_request() -> Self {
        Self::new(-32600, "INVALID_REQUEST", None)
    }

    /// Method not found (-32601).
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            -32601,
            "METHOD_NOT_FOUND",
            Some(serde_json::json!({"method": method})),
        )
    }

    /// Invalid params (-32602).
    pub fn invalid_params(detail: &str) -> Self {
        Self::new(
            -32602,
            "INVALID_PARAMS",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// Internal error (-32603).
    pub fn internal_error(detail: &str) -> Self {
        Self::new(
            -32603,
            "INTERNAL_ERROR",
            Some(serde_json::json!({"detail": detail})),
        )
    }

    /// Invalid category (-32008), carrying the code as sent.
    pub fn invalid_category(code: u64) -> Self {
        Self::new(
            -32008,
            "INVALID_CATEGORY",
            Some(serde_json::json!({"category": code})),
        )
    }

    /// Map an engine failure to its application error code.
    pub fn engine(err: &DistributorError) -> Self {
        match err {
            DistributorError::Unauthorized => Self::new(-32001, "UNAUTHORIZED", None),
            DistributorError::Paused => Self::new(-32002, "PAUSED", None),
            DistributorError::InvalidAddress => Self::new(-32003, "INVALID_ADDRESS", None),
            DistributorError::NoOp => Self::new(-32004, "NO_OP", None),
            DistributorError::AmountMustBePositive => {
                Self::new(-32005, "AMOUNT_MUST_BE_POSITIVE", None)
            }
            DistributorError::AllAmountsZero => Self::new(-32006, "ALL_AMOUNTS_ZERO", None),
            DistributorError::InsufficientBalance {
                requested,
                available,
            } => Self::new(
                -32007,
                "INSUFFICIENT_BALANCE",
                Some(serde_json::json!({
                    "requested": requested.to_string(),
                    "available": available.to_string(),
                })),
            ),
            DistributorError::InvalidCategory(code) => Self::invalid_category(u64::from(*code)),
            DistributorError::ReserveNotConfigured => {
                Self::new(-32009, "RESERVE_NOT_CONFIGURED", None)
            }
            DistributorError::ExceedsRecoverable {
                requested,
                available,
            } => Self::new(
                -32010,
                "EXCEEDS_RECOVERABLE",
                Some(serde_json::json!({
                    "requested": requested.to_string(),
                    "available": available.to_string(),
                })),
            ),
            DistributorError::Overflow => Self::new(-32011, "OVERFLOW", None),
            DistributorError::Transfer(AssetError::Backend(detail)) => {
                Self::internal_error(detail)
            }
            DistributorError::Transfer(asset_err) => Self::new(
                -32020,
                "TRANSFER_FAILED",
                Some(serde_json::json!({"detail": asset_err.to_string()})),
            ),
        }
    }
}

/// The RPC server.
pub struct RpcServer {
    state: Arc<DaemonState>,
    socket_path: PathBuf,
}

impl RpcServer {
    /// Create a new RPC server.
    pub fn new(state: Arc<DaemonState>, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    /// Run the server, accepting connections.
    pub async fn run(&self) -> anyhow::Result<()> {
        // Remove stale socket file
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)?;
        std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o600))?;
        info!("IPC server listening on {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(state, stream).await {
                            warn!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// An active event subscription on one connection.
struct Subscription {
    receiver: broadcast::Receiver<Event>,
    filter: EventFilter,
}

/// Handle a single client connection.
async fn handle_connection(
    state: Arc<DaemonState>,
    stream: tokio::net::UnixStream,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();
    let mut subscription: Option<Subscription> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break; // EOF
                };
                if line.trim().is_empty() {
                    continue;
                }

                let response = match serde_json::from_str::<RpcRequest>(&line) {
                    Ok(request) if request.method == "subscribe_events" => {
                        match serde_json::from_value::<EventFilter>(request.params.clone()) {
                            Ok(filter) => {
                                subscription = Some(Subscription {
                                    receiver: state.event_bus.subscribe(),
                                    filter,
                                });
                                RpcResponse::success(request.id, serde_json::json!({"subscribed": true}))
                            }
                            Err(e) => RpcResponse::error(
                                request.id,
                                RpcError::invalid_params(&e.to_string()),
                            ),
                        }
                    }
                    Ok(request) if request.method == "unsubscribe_events" => {
                        let was_subscribed = subscription.take().is_some();
                        RpcResponse::success(
                            request.id,
                            serde_json::json!({"unsubscribed": was_subscribed}),
                        )
                    }
                    Ok(request) => dispatch_request(state.clone(), request).await,
                    Err(_) => RpcResponse::error(serde_json::Value::Null, RpcError::parse_error()),
                };
                write_message(&mut writer, &response).await?;
            }
            event = next_event(&mut subscription) => {
                match event {
                    Some(event) => {
                        let notification = RpcNotification {
                            jsonrpc: "2.0",
                            method: "event",
                            params: &event,
                        };
                        write_message(&mut writer, &notification).await?;
                    }
                    None => subscription = None,
                }
            }
        }
    }

    Ok(())
}

/// Next event passing the subscription's filter. Pends forever when there
/// is no subscription; `None` means the bus closed.
async fn next_event(subscription: &mut Option<Subscription>) -> Option<Event> {
    let Some(sub) = subscription.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match sub.receiver.recv().await {
            Ok(event) if sub.filter.matches(&event) => return Some(event),
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

async fn write_message<T: Serialize>(writer: &mut OwnedWriteHalf, message: &T) -> anyhow::Result<()> {
    let mut json = serde_json::to_string(message)?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Dispatch a JSON-RPC request to the appropriate command handler.
pub async fn dispatch_request(state: Arc<DaemonState>, request: RpcRequest) -> RpcResponse {
    let id = request.id.clone();
    if request.jsonrpc != "2.0" {
        return RpcResponse::error(id, RpcError::invalid_request());
    }
    let method = request.method.as_str();
    let params = &request.params;

    debug!("Dispatching RPC method: {}", method);

    let result = match method {
        // Income
        "add_proxy_income" => commands::income::add_proxy_income(&state, params).await,
        "add_standard_income" => commands::income::add_standard_income(&state, params).await,
        "add_extra_income" => commands::income::add_extra_income(&state, params).await,
        "add_natural_income" => commands::income::add_natural_income(&state, params).await,
        "add_base_income" => commands::income::add_base_income(&state, params).await,
        "add_income" => commands::income::add_income(&state, params).await,
        "add_multiple_incomes" => commands::income::add_multiple_incomes(&state, params).await,
        "preview_income" => commands::income::preview_income(&state, params).await,

        // Retained balances
        "withdraw_balance" => commands::account::withdraw_balance(&state, params).await,
        "get_retained_balance" => commands::account::get_retained_balance(&state, params).await,
        "get_total_retained" => commands::account::get_total_retained(&state).await,
        "get_asset_balance" => commands::account::get_asset_balance(&state, params).await,

        // Administration
        "set_role_address" => commands::admin::set_role_address(&state, params).await,
        "set_funding_source" => commands::admin::set_funding_source(&state, params).await,
        "set_asset" => commands::admin::set_asset(&state, params).await,
        "set_operator" => commands::admin::set_operator(&state, params).await,
        "transfer_ownership" => commands::admin::transfer_ownership(&state, params).await,
        "accept_ownership" => commands::admin::accept_ownership(&state, params).await,
        "pause" => commands::admin::pause(&state, params).await,
        "unpause" => commands::admin::unpause(&state, params).await,
        "recover_asset" => commands::admin::recover_asset(&state, params).await,
        "shutdown" => commands::admin::shutdown(&state, params).await,

        // Status
        "get_status" => commands::status::get_status(&state).await,
        "owner" | "operator" | "pending_owner" | "paused" => {
            let field = match method {
                "owner" => "owner",
                "operator" => "operator",
                "pending_owner" => "pending_owner",
                _ => "paused",
            };
            commands::status::governance(&state, field).await
        }
        "get_role_address" => commands::status::get_role_address(&state, params).await,
        "get_events" => commands::status::get_events(&state, params).await,

        _ => Err(RpcError::method_not_found(method)),
    };

    match result {
        Ok(value) => RpcResponse::success(id, value),
        Err(err) => RpcResponse::error(id, err),
    }
}
