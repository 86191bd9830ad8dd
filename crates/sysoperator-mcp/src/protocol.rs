//! MCP protocol types.
//!
//! This module defines the JSON-RPC 2.0 message types and the MCP-specific
//! structures the server exchanges with its client.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sysoperator_core::{ToolDescriptor, ToolOutcome};

/// Value of every message's `jsonrpc` field.
pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revision announced in `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "sysoperator";

/// A request id, echoed back verbatim in the response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

/// An incoming request or notification.
///
/// Notifications carry no `id` and never get a response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcMessage {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request ID, absent for notifications.
    #[serde(default)]
    pub id: Option<RequestId>,
    /// Method name.
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcMessage {
    /// Whether this message expects no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// The `error` member of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    // Reserved codes from the JSON-RPC 2.0 specification.
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(Self::PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_REQUEST, message)
    }

    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(Self::METHOD_NOT_FOUND, message)
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_PARAMS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Self::INTERNAL_ERROR, message)
    }
}

/// An outgoing response. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse<R> {
    pub jsonrpc: String,
    /// Id of the request this is responding to; `null` when it could not be read.
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<R>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl<R> JsonRpcResponse<R> {
    /// A successful response.
    pub fn success(id: RequestId, result: R) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// An error response.
    pub fn failure(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }
}

// ============================================================================
// MCP Protocol Types
// ============================================================================

/// Who is connecting, as reported in `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Name and version reported back to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Features advertised in the `initialize` result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tools capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
    /// Resources capability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesCapability>,
}

/// Tools capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    /// Whether the server announces changes to the tool list.
    #[serde(default)]
    pub list_changed: bool,
}

/// Resources capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesCapability {
    /// Always false; resources are read on demand.
    #[serde(default)]
    pub subscribe: bool,
    /// Whether the server announces changes to the resource list.
    #[serde(default)]
    pub list_changed: bool,
}

/// `initialize` params. Only logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// MCP protocol version requested by the client.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// `initialize` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol revision announced in `initialize`.
    pub protocol_version: String,
    /// Server capabilities.
    pub capabilities: ServerCapabilities,
    /// Server information.
    pub server_info: ServerInfo,
}

impl Default for InitializeResult {
    fn default() -> Self {
        Self {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
                resources: Some(ResourcesCapability::default()),
            },
            server_info: ServerInfo::default(),
        }
    }
}

/// `tools/list` result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    pub tools: Vec<McpToolDefinition>,
}

/// MCP tool definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpToolDefinition {
    /// Tool name.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the arguments.
    pub input_schema: Value,
}

impl From<ToolDescriptor> for McpToolDefinition {
    fn from(descriptor: ToolDescriptor) -> Self {
        Self {
            name: descriptor.name,
            description: Some(descriptor.description),
            input_schema: descriptor.input_schema,
        }
    }
}

/// `tools/call` params.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    /// Tool name.
    pub name: String,
    /// Tool arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// `tools/call` result. Tool failures set `is_error` rather than failing the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    pub content: Vec<ToolContent>,
    #[serde(default)]
    pub is_error: bool,
}

impl From<ToolOutcome> for CallToolResult {
    fn from(outcome: ToolOutcome) -> Self {
        Self {
            is_error: outcome.is_error(),
            content: vec![ToolContent::text(outcome.text())],
        }
    }
}

/// One block of tool output. Only text is produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
        }
    }
}

/// A resource advertised by resources/list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub uri: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Result of the resources/list request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
}

/// Parameters for the resources/read request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceParams {
    pub uri: String,
}

/// Text contents of a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    pub text: String,
}

/// Result of the resources/read request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResourceResult {
    pub contents: Vec<ResourceContents>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysoperator_core::{ClassifiedError, ErrorKind};

    #[test]
    fn test_request_deserialization() {
        let message: JsonRpcMessage = serde_json::from_str(
            r#"{"jsonrpc": "2.0", "id": 7, "method": "tools/list"}"#,
        )
        .unwrap();
        assert_eq!(message.id, Some(RequestId::Number(7)));
        assert_eq!(message.method, "tools/list");
        assert!(!message.is_notification());
    }

    #[test]
    fn test_notification_has_no_id() {
        let message: JsonRpcMessage = serde_json::from_str(
            r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#,
        )
        .unwrap();
        assert!(message.is_notification());
    }

    #[test]
    fn test_success_serialization() {
        let response = JsonRpcResponse::success(RequestId::from("a"), serde_json::json!({}));
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"jsonrpc":"2.0","id":"a","result":{}}"#);
    }

    #[test]
    fn test_error_without_id_serializes_null() {
        let response: JsonRpcResponse<Value> =
            JsonRpcResponse::failure(None, JsonRpcError::parse_error("Parse error"));
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"id\":null"));
        assert!(json.contains("\"code\":-32700"));
        assert!(response.is_error());
    }

    #[test]
    fn test_initialize_result() {
        let value = serde_json::to_value(InitializeResult::default()).unwrap();
        assert_eq!(value["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(value["serverInfo"]["name"], SERVER_NAME);
        assert!(value["capabilities"]["tools"].is_object());
        assert!(value["capabilities"]["resources"].is_object());
    }

    #[test]
    fn test_call_result_from_outcome() {
        let ok = CallToolResult::from(ToolOutcome::Success("done".to_string()));
        assert!(!ok.is_error);
        assert_eq!(ok.content[0].as_text(), Some("done"));

        let failed = CallToolResult::from(ToolOutcome::Failure(
            ClassifiedError::new(ErrorKind::ExecutionFailed, "failed").with_detail("boom"),
        ));
        assert!(failed.is_error);
        assert_eq!(failed.content[0].as_text(), Some("ExecutionFailed: failed\nDetails: boom"));

        let json = serde_json::to_string(&failed).unwrap();
        assert!(json.contains("\"isError\":true"));
        assert!(json.contains("\"type\":\"text\""));
    }

    #[test]
    fn test_tool_definition_from_descriptor() {
        let definition = McpToolDefinition::from(ToolDescriptor {
            name: "list_inventory".to_string(),
            description: "List Ansible inventory hosts and groups".to_string(),
            input_schema: serde_json::json!({"type": "object"}),
        });
        let value = serde_json::to_value(definition).unwrap();
        assert_eq!(value["inputSchema"]["type"], "object");
    }
}
