//! Drives the server over in-memory pipes the way a client would.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use sysoperator_core::Config;
use sysoperator_mcp::{McpError, McpServer, DEFAULT_INVENTORY_URI};
use sysoperator_tools::{
    builtin_tools, Arg, BuildContext, CommandPlan, Dispatcher, Field, Invocation, Operation,
    ParamSchema, ToolError, ToolRegistry, WorkingDir,
};
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Deserialize)]
struct SleepOptions {
    seconds: u64,
}

fn sleep_plan(opts: &SleepOptions, _ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    Ok(CommandPlan::new(
        "sleep",
        Invocation::new("sh").arg(Arg::file("sleep.sh")),
    )
    .file("sleep.sh", format!("sleep {}\necho done\n", opts.seconds))
    .working_dir(WorkingDir::Workspace))
}

fn registry() -> Arc<ToolRegistry> {
    let mut tools = builtin_tools();
    tools.push(
        Operation::<SleepOptions>::new(
            "sleep",
            "Sleep for a while",
            ParamSchema::new().field(Field::integer("seconds").required().min(0)),
            sleep_plan,
        )
        .into_tool(),
    );
    Arc::new(ToolRegistry::new(tools).unwrap())
}

/// Client end of a running server.
struct Session {
    input: Option<DuplexStream>,
    output: Lines<BufReader<DuplexStream>>,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), McpError>>,
}

impl Session {
    fn start(server: McpServer) -> Self {
        let (input, server_in) = tokio::io::duplex(64 * 1024);
        let (server_out, output) = tokio::io::duplex(64 * 1024);
        let (stop, stopped) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let shutdown = async move {
                let _ = stopped.await;
            };
            server.serve(server_in, server_out, shutdown).await
        });
        Self {
            input: Some(input),
            output: BufReader::new(output).lines(),
            stop: Some(stop),
            handle,
        }
    }

    async fn send_raw(&mut self, line: &str) {
        let input = self.input.as_mut().unwrap();
        input.write_all(line.as_bytes()).await.unwrap();
        input.write_all(b"\n").await.unwrap();
    }

    async fn request(&mut self, id: i64, method: &str, params: Value) {
        let message = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        self.send_raw(&message.to_string()).await;
    }

    async fn recv(&mut self) -> Value {
        let line = tokio::time::timeout(Duration::from_secs(10), self.output.next_line())
            .await
            .expect("response in time")
            .unwrap()
            .expect("server closed output");
        serde_json::from_str(&line).unwrap()
    }

    async fn call(&mut self, id: i64, method: &str, params: Value) -> Value {
        self.request(id, method, params).await;
        self.recv().await
    }

    /// Close input and wait for the server to finish.
    async fn close(mut self) -> Result<(), McpError> {
        self.input.take();
        let result = self.handle.await.unwrap();
        drop(self.stop);
        result
    }
}

fn server_with(root: &Path) -> McpServer {
    let mut config = Config::default();
    config.execution.workspace_root = Some(root.to_path_buf());
    config.resources.default_inventory = root.join("hosts");
    let dispatcher = Dispatcher::new(registry(), &config).with_base_dir(root);
    McpServer::new(Arc::new(dispatcher), &config)
}

fn workspaces(root: &Path) -> Vec<String> {
    std::fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("sysop-"))
        .collect()
}

#[tokio::test]
async fn test_initialize_handshake() {
    let root = TempDir::new().unwrap();
    let mut session = Session::start(server_with(root.path()));

    let response = session
        .call(
            1,
            "initialize",
            json!({"protocolVersion": "2024-11-05", "clientInfo": {"name": "test", "version": "1"}}),
        )
        .await;
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(response["result"]["serverInfo"]["name"], "sysoperator");
    assert!(response["result"]["capabilities"]["tools"].is_object());
    assert!(response["result"]["capabilities"]["resources"].is_object());

    assert!(session.close().await.is_ok());
}

#[tokio::test]
async fn test_tools_list() {
    let root = TempDir::new().unwrap();
    let mut session = Session::start(server_with(root.path()));

    let response = session.call(2, "tools/list", json!({})).await;
    let tools = response["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 19);
    assert_eq!(tools[0]["name"], "run_playbook");
    assert_eq!(tools[0]["inputSchema"]["type"], "object");
    assert!(tools.iter().any(|tool| tool["name"] == "aws_lambda"));
}

#[tokio::test]
async fn test_unknown_tool_is_method_not_found() {
    let root = TempDir::new().unwrap();
    let mut session = Session::start(server_with(root.path()));

    let response = session
        .call(3, "tools/call", json!({"name": "aws_glacier", "arguments": {}}))
        .await;
    assert_eq!(response["id"], 3);
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["message"], "Unknown tool: aws_glacier");
}

#[tokio::test]
async fn test_invalid_arguments_are_tool_errors() {
    let root = TempDir::new().unwrap();
    let mut session = Session::start(server_with(root.path()));

    let response = session
        .call(
            4,
            "tools/call",
            json!({"name": "aws_s3", "arguments": {"action": "create_bucket", "region": "us-east-1"}}),
        )
        .await;
    assert!(response.get("error").is_none());
    assert_eq!(response["result"]["isError"], true);
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("ValidationError: "));
    assert!(text.contains("bucket"));
}

#[tokio::test]
async fn test_malformed_json_gets_parse_error_with_null_id() {
    let root = TempDir::new().unwrap();
    let mut session = Session::start(server_with(root.path()));

    session.send_raw("{\"jsonrpc\": \"2.0\", \"id\": ").await;
    let response = session.recv().await;
    assert_eq!(response["error"]["code"], -32700);
    assert!(response["id"].is_null());

    // The session survives.
    let response = session.call(5, "ping", json!({})).await;
    assert_eq!(response["id"], 5);
    assert_eq!(response["result"], json!({}));
}

#[tokio::test]
async fn test_notifications_get_no_response() {
    let root = TempDir::new().unwrap();
    let mut session = Session::start(server_with(root.path()));

    session
        .send_raw(r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#)
        .await;
    let response = session.call(6, "ping", json!({})).await;
    assert_eq!(response["id"], 6);
}

#[tokio::test]
async fn test_unknown_method() {
    let root = TempDir::new().unwrap();
    let mut session = Session::start(server_with(root.path()));

    let response = session.call(7, "prompts/list", json!({})).await;
    assert_eq!(response["error"]["code"], -32601);
}

#[tokio::test]
async fn test_inventory_resource() {
    let root = TempDir::new().unwrap();
    let mut session = Session::start(server_with(root.path()));

    let response = session.call(8, "resources/list", json!({})).await;
    assert_eq!(response["result"]["resources"], json!([]));

    std::fs::write(root.path().join("hosts"), "[db]\ndb1\n").unwrap();
    let response = session.call(9, "resources/list", json!({})).await;
    assert_eq!(response["result"]["resources"][0]["uri"], DEFAULT_INVENTORY_URI);

    let response = session
        .call(10, "resources/read", json!({"uri": DEFAULT_INVENTORY_URI}))
        .await;
    assert_eq!(response["result"]["contents"][0]["text"], "[db]\ndb1\n");

    let response = session
        .call(11, "resources/read", json!({"uri": "sysoperator://nothing"}))
        .await;
    assert_eq!(response["error"]["code"], -32600);
}

#[tokio::test]
async fn test_eof_finishes_in_flight_calls() {
    let root = TempDir::new().unwrap();
    let mut session = Session::start(server_with(root.path()));

    session
        .request(12, "tools/call", json!({"name": "sleep", "arguments": {"seconds": 1}}))
        .await;
    session.input.take();

    let response = session.recv().await;
    assert_eq!(response["id"], 12);
    assert_eq!(response["result"]["isError"], false);
    assert!(response["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("done"));

    assert!(session.close().await.is_ok());
    assert!(workspaces(root.path()).is_empty());
}

#[tokio::test]
async fn test_slow_call_does_not_block_other_requests() {
    let root = TempDir::new().unwrap();
    let mut session = Session::start(server_with(root.path()));

    session
        .request(13, "tools/call", json!({"name": "sleep", "arguments": {"seconds": 2}}))
        .await;
    let response = session.call(14, "ping", json!({})).await;
    assert_eq!(response["id"], 14);

    let response = session.recv().await;
    assert_eq!(response["id"], 13);
}

#[tokio::test]
async fn test_call_timeout_kills_process_and_removes_workspace() {
    let root = TempDir::new().unwrap();
    let server = server_with(root.path()).with_call_timeout(Some(Duration::from_secs(1)));
    let mut session = Session::start(server);

    let response = session
        .call(15, "tools/call", json!({"name": "sleep", "arguments": {"seconds": 30}}))
        .await;
    assert_eq!(response["result"]["isError"], true);
    let text = response["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("Call timed out after 1 seconds"));
    assert!(workspaces(root.path()).is_empty());
}

#[tokio::test]
async fn test_shutdown_aborts_in_flight_calls() {
    let root = TempDir::new().unwrap();
    let mut session = Session::start(server_with(root.path()));

    session
        .request(16, "tools/call", json!({"name": "sleep", "arguments": {"seconds": 30}}))
        .await;
    let response = session.call(17, "ping", json!({})).await;
    assert_eq!(response["id"], 17);

    session.stop.take().unwrap().send(()).unwrap();
    let finished = tokio::time::timeout(Duration::from_secs(10), &mut session.handle)
        .await
        .expect("server stops promptly")
        .unwrap();
    assert!(finished.is_ok());

    // The aborted call never answers; output is closed.
    assert!(session.output.next_line().await.unwrap().is_none());
    assert!(workspaces(root.path()).is_empty());
}
