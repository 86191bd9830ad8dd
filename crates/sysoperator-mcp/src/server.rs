//! Newline-delimited JSON-RPC server over a pair of byte streams.
//!
//! One reader loop parses messages. `tools/call` requests each run in their
//! own task; everything else is answered inline. A single writer task owns
//! the output stream, so responses never interleave.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use sysoperator_core::{Config, ToolCall, ToolOutcome};
use sysoperator_tools::{classify, Dispatcher, ToolError};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::error::{McpError, TransportError};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError,
    JsonRpcMessage, JsonRpcResponse, ListResourcesResult, ListToolsResult, McpToolDefinition,
    ReadResourceParams, RequestId, JSONRPC_VERSION,
};
use crate::resources::ResourceProvider;

/// How the read loop ended.
enum Exit {
    Eof,
    Shutdown,
    ReadFailed(std::io::Error),
}

/// The protocol server. Cheap to clone; clones share the dispatcher.
#[derive(Clone)]
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
    resources: Arc<ResourceProvider>,
    call_timeout: Option<Duration>,
}

impl McpServer {
    pub fn new(dispatcher: Arc<Dispatcher>, config: &Config) -> Self {
        Self {
            dispatcher,
            resources: Arc::new(ResourceProvider::new(&config.resources.default_inventory)),
            call_timeout: config.execution.call_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Override the per-call deadline.
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Serve on the process's stdin and stdout until EOF or Ctrl-C.
    pub async fn serve_stdio(&self) -> Result<(), McpError> {
        let shutdown = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };
        self.serve(tokio::io::stdin(), tokio::io::stdout(), shutdown).await
    }

    /// Serve until the reader reaches EOF or `shutdown` resolves.
    ///
    /// At EOF, calls already in flight finish and their responses are
    /// written. On shutdown they are aborted, which kills their child
    /// processes and removes their workspaces.
    pub async fn serve<R, W, S>(&self, reader: R, writer: W, shutdown: S) -> Result<(), McpError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_loop(writer, rx));
        let mut lines = BufReader::new(reader).lines();
        let mut calls = JoinSet::new();
        tokio::pin!(shutdown);

        info!("Server started");
        let exit = loop {
            tokio::select! {
                _ = &mut shutdown => break Exit::Shutdown,
                line = lines.next_line() => match line {
                    Ok(Some(line)) => self.accept(&line, &tx, &mut calls).await,
                    Ok(None) => break Exit::Eof,
                    Err(e) => break Exit::ReadFailed(e),
                },
                Some(joined) = calls.join_next(), if !calls.is_empty() => log_join(joined),
            }
        };

        match exit {
            Exit::Eof => debug!(in_flight = calls.len(), "Input closed, finishing calls"),
            _ => {
                info!(in_flight = calls.len(), "Shutting down, aborting calls");
                calls.abort_all();
            }
        }
        while let Some(joined) = calls.join_next().await {
            log_join(joined);
        }

        drop(tx);
        writer_task
            .await
            .map_err(|e| McpError::server(format!("writer task failed: {}", e)))??;
        info!("Server stopped");

        match exit {
            Exit::ReadFailed(e) => Err(TransportError::ReadError(e).into()),
            _ => Ok(()),
        }
    }

    async fn accept(&self, line: &str, tx: &UnboundedSender<String>, calls: &mut JoinSet<()>) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let message = match parse_message(line) {
            Ok(message) => message,
            Err(response) => {
                send(tx, &response);
                return;
            }
        };
        let Some(id) = message.id else {
            debug!(method = %message.method, "Notification");
            return;
        };

        if message.method == "tools/call" {
            let server = self.clone();
            let tx = tx.clone();
            calls.spawn(async move {
                let response = server.respond(id, &message.method, message.params).await;
                send(&tx, &response);
            });
        } else {
            let response = self.respond(id, &message.method, message.params).await;
            send(tx, &response);
        }
    }

    async fn respond(&self, id: RequestId, method: &str, params: Option<Value>) -> JsonRpcResponse<Value> {
        match self.handle(method, params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => {
                debug!(method, code = error.code, message = %error.message, "Request failed");
                JsonRpcResponse::failure(Some(id), error)
            }
        }
    }

    /// Answer one request.
    pub async fn handle(&self, method: &str, params: Option<Value>) -> Result<Value, JsonRpcError> {
        match method {
            "initialize" => {
                if let Ok(params) = parse_params::<InitializeParams>(params) {
                    if let Some(client) = params.client_info {
                        info!(client = %client.name, version = ?client.version, "Client connected");
                    }
                }
                to_value(&InitializeResult::default())
            }
            "ping" => Ok(json!({})),
            "tools/list" => {
                let tools = self
                    .dispatcher
                    .catalog()
                    .into_iter()
                    .map(McpToolDefinition::from)
                    .collect();
                to_value(&ListToolsResult { tools })
            }
            "tools/call" => {
                let params: CallToolParams = parse_params(params)?;
                let result = self.call_tool(params).await?;
                to_value(&result)
            }
            "resources/list" => to_value(&ListResourcesResult {
                resources: self.resources.list().await,
            }),
            "resources/read" => {
                let params: ReadResourceParams = parse_params(params)?;
                to_value(&self.resources.read(&params.uri).await?)
            }
            other => Err(JsonRpcError::method_not_found(format!("Method not found: {}", other))),
        }
    }

    async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult, JsonRpcError> {
        if !self.dispatcher.registry().contains(&params.name) {
            return Err(JsonRpcError::method_not_found(format!("Unknown tool: {}", params.name)));
        }

        let call = ToolCall::new(params.name, params.arguments.unwrap_or(Value::Null));
        let outcome = match self.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.dispatcher.dispatch(&call)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(tool = %call.name, timeout_secs = limit.as_secs(), "Tool call timed out");
                    ToolOutcome::Failure(classify(&call.name, &ToolError::Timeout(limit.as_secs())))
                }
            },
            None => self.dispatcher.dispatch(&call).await,
        };
        Ok(CallToolResult::from(outcome))
    }
}

fn parse_message(line: &str) -> Result<JsonRpcMessage, JsonRpcResponse<Value>> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| JsonRpcResponse::failure(None, JsonRpcError::parse_error(format!("Parse error: {}", e))))?;
    let id = value
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value::<RequestId>(id).ok());

    let message: JsonRpcMessage = serde_json::from_value(value).map_err(|e| {
        JsonRpcResponse::failure(id.clone(), JsonRpcError::invalid_request(format!("Invalid request: {}", e)))
    })?;
    if message.jsonrpc != JSONRPC_VERSION {
        return Err(JsonRpcResponse::failure(
            id,
            JsonRpcError::invalid_request(format!("Unsupported jsonrpc version: {}", message.jsonrpc)),
        ));
    }
    Ok(message)
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal(format!("Failed to encode result: {}", e)))
}

fn send<T: Serialize>(tx: &UnboundedSender<String>, message: &T) {
    match serde_json::to_string(message) {
        Ok(line) => {
            if tx.send(line).is_err() {
                debug!("Writer closed, dropping response");
            }
        }
        Err(e) => error!(error = %e, "Failed to encode response"),
    }
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        if e.is_panic() {
            error!(error = %e, "Tool call task panicked");
        }
    }
}

async fn write_loop<W>(mut writer: W, mut rx: UnboundedReceiver<String>) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(TransportError::WriteError)?;
        writer.write_all(b"\n").await.map_err(TransportError::WriteError)?;
        writer.flush().await.map_err(TransportError::WriteError)?;
    }
    Ok(())
}
