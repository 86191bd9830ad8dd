//! End-to-end dispatch tests with real `sh` processes and a scripted probe.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sysoperator_core::{Config, ErrorKind, ToolCall, ToolOutcome};
use sysoperator_tools::{
    builtin_tools, Arg, BuildContext, CapabilityProbe, CommandPlan, Dispatcher, ExecutionResult,
    Field, Invocation, Operation, ParamSchema, ProcessRunner, ToolError, ToolRegistry, WorkingDir,
};
use tempfile::TempDir;

/// Probe with fixed answers.
struct FixedProbe {
    executables: bool,
    credentials: bool,
}

#[async_trait]
impl CapabilityProbe for FixedProbe {
    async fn is_available(&self, _program: &str) -> bool {
        self.executables
    }

    async fn aws_credentials_valid(&self) -> bool {
        self.credentials
    }
}

struct PanickingRunner;

#[async_trait]
impl ProcessRunner for PanickingRunner {
    async fn run(
        &self,
        _program: &str,
        _args: &[String],
        _working_dir: Option<&Path>,
        _stdin: Option<&str>,
    ) -> Result<ExecutionResult, ToolError> {
        panic!("runner exploded");
    }
}

#[derive(Deserialize)]
struct ScriptOptions {
    script: String,
}

/// Stage `script` as `run.sh` and run it with `sh` inside the workspace.
fn run_script(opts: &ScriptOptions, _ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    Ok(
        CommandPlan::new("script", Invocation::new("sh").arg(Arg::file("run.sh")))
            .file("run.sh", opts.script.as_str())
            .working_dir(WorkingDir::Workspace),
    )
}

fn registry() -> Arc<ToolRegistry> {
    let mut tools = builtin_tools();
    tools.push(
        Operation::<ScriptOptions>::new(
            "script",
            "Run a shell script",
            ParamSchema::new().field(Field::non_empty("script").required()),
            run_script,
        )
        .into_tool(),
    );
    Arc::new(ToolRegistry::new(tools).unwrap())
}

fn dispatcher(root: &Path, probe: FixedProbe) -> Dispatcher {
    let mut config = Config::default();
    config.execution.workspace_root = Some(root.to_path_buf());
    Dispatcher::new(registry(), &config)
        .with_probe(Arc::new(probe))
        .with_base_dir(root)
}

fn ready() -> FixedProbe {
    FixedProbe {
        executables: true,
        credentials: true,
    }
}

fn leftovers(root: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(root)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

fn failure_kind(outcome: &ToolOutcome) -> ErrorKind {
    outcome.error().map(|e| e.kind).expect("call should fail")
}

#[tokio::test]
async fn test_script_runs_in_workspace_and_cleans_up() {
    let root = TempDir::new().unwrap();
    let dispatcher = dispatcher(root.path(), ready());

    let outcome = dispatcher
        .dispatch(&ToolCall::new(
            "script",
            json!({"script": "printf 'ran in %s' \"$(basename \"$PWD\")\""}),
        ))
        .await;

    assert!(outcome.is_success(), "{}", outcome.text());
    assert!(outcome.text().starts_with("ran in sysop-script-"));
    assert!(leftovers(root.path()).is_empty());
}

#[tokio::test]
async fn test_failing_script_is_classified_and_cleaned_up() {
    let root = TempDir::new().unwrap();
    let dispatcher = dispatcher(root.path(), ready());

    let outcome = dispatcher
        .dispatch(&ToolCall::new("script", json!({"script": "echo boom >&2; exit 1"})))
        .await;

    let err = outcome.error().expect("call should fail");
    assert_eq!(err.kind, ErrorKind::ExecutionFailed);
    assert_eq!(err.detail.as_deref(), Some("boom"));
    assert!(outcome.text().contains("Details: boom"));
    assert!(leftovers(root.path()).is_empty());
}

#[tokio::test]
async fn test_panicking_runner_still_removes_workspace() {
    let root = TempDir::new().unwrap();
    let dispatcher = Arc::new(dispatcher(root.path(), ready()).with_runner(Arc::new(PanickingRunner)));

    let handle = tokio::spawn({
        let dispatcher = Arc::clone(&dispatcher);
        async move {
            dispatcher
                .dispatch(&ToolCall::new("script", json!({"script": "true"})))
                .await
        }
    });

    assert!(handle.await.unwrap_err().is_panic());
    assert!(leftovers(root.path()).is_empty());
}

#[tokio::test]
async fn test_unknown_tool() {
    let root = TempDir::new().unwrap();
    let outcome = dispatcher(root.path(), ready())
        .dispatch(&ToolCall::new("aws_glacier", json!({})))
        .await;

    assert_eq!(failure_kind(&outcome), ErrorKind::MethodNotFound);
    assert!(outcome.text().contains("aws_glacier"));
}

#[tokio::test]
async fn test_action_requirement_is_a_validation_error() {
    let root = TempDir::new().unwrap();
    let outcome = dispatcher(root.path(), ready())
        .dispatch(&ToolCall::new(
            "aws_s3",
            json!({"action": "create_bucket", "region": "us-east-1"}),
        ))
        .await;

    assert_eq!(failure_kind(&outcome), ErrorKind::ValidationError);
    assert!(outcome.text().contains("bucket"));
    assert!(leftovers(root.path()).is_empty());
}

#[tokio::test]
async fn test_unknown_action_is_unsupported() {
    let root = TempDir::new().unwrap();
    let outcome = dispatcher(root.path(), ready())
        .dispatch(&ToolCall::new(
            "aws_ec2",
            json!({"action": "hibernate", "region": "us-east-1"}),
        ))
        .await;

    assert_eq!(failure_kind(&outcome), ErrorKind::UnsupportedAction);
}

#[tokio::test]
async fn test_missing_executable_is_precondition_failure() {
    let root = TempDir::new().unwrap();
    let probe = FixedProbe {
        executables: false,
        credentials: true,
    };
    let outcome = dispatcher(root.path(), probe)
        .dispatch(&ToolCall::new("aws_s3", json!({"action": "list_buckets", "region": "us-east-1"})))
        .await;

    assert_eq!(failure_kind(&outcome), ErrorKind::PreconditionFailed);
    assert!(outcome
        .text()
        .contains("ansible-playbook is not installed or not found in PATH"));
    assert!(leftovers(root.path()).is_empty());
}

#[tokio::test]
async fn test_invalid_credentials_block_cloud_tools() {
    let root = TempDir::new().unwrap();
    let probe = FixedProbe {
        executables: true,
        credentials: false,
    };
    let outcome = dispatcher(root.path(), probe)
        .dispatch(&ToolCall::new("aws_ec2", json!({"action": "list", "region": "us-east-1"})))
        .await;

    assert_eq!(failure_kind(&outcome), ErrorKind::PreconditionFailed);
    assert!(outcome.text().contains("AWS credentials"));
}

#[tokio::test]
async fn test_missing_playbook_is_precondition_failure() {
    let root = TempDir::new().unwrap();
    let outcome = dispatcher(root.path(), ready())
        .dispatch(&ToolCall::new("check_syntax", json!({"playbook": "missing.yml"})))
        .await;

    assert_eq!(failure_kind(&outcome), ErrorKind::PreconditionFailed);
    assert!(outcome.text().contains("Playbook not found"));
}

#[tokio::test]
async fn test_concurrent_calls_get_their_own_workspaces() {
    let root = TempDir::new().unwrap();
    let dispatcher = dispatcher(root.path(), ready());

    let calls: Vec<ToolCall> = (0..8)
        .map(|i| {
            ToolCall::new(
                "script",
                json!({"script": format!("printf '%s %s' {} \"$PWD\"", i)}),
            )
        })
        .collect();
    let outcomes = futures::future::join_all(calls.iter().map(|call| dispatcher.dispatch(call))).await;

    let mut dirs = Vec::new();
    for (i, outcome) in outcomes.iter().enumerate() {
        let text = outcome.text();
        let (index, dir) = text.split_once(' ').expect("index and directory");
        assert_eq!(index, i.to_string());
        dirs.push(dir.to_string());
    }
    dirs.sort();
    dirs.dedup();
    assert_eq!(dirs.len(), 8);
    assert!(leftovers(root.path()).is_empty());
}
