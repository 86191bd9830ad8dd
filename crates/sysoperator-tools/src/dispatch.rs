//! The per-call state machine.
//!
//! `lookup -> validate -> build -> preconditions -> (workspace) -> execute ->
//! (release) -> outcome`. Every failure is classified here; nothing escapes
//! as a panic or an unclassified error.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use sysoperator_core::{Config, ToolCall, ToolDescriptor, ToolOutcome};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::classify::classify;
use crate::executor::{ProcessExecutor, ProcessRunner};
use crate::plan::{CommandPlan, Precondition, WorkingDir};
use crate::probe::{missing_executable_message, CapabilityProbe, SystemProbe};
use crate::registry::{BuildContext, ToolRegistry};
use crate::workspace::Workspace;
use crate::ToolError;

const AWS_CREDENTIALS_MESSAGE: &str = "AWS credentials are not configured or are invalid";

/// Runs tool calls against a frozen registry.
///
/// A dispatcher holds no per-call state and can serve any number of
/// concurrent calls through a shared reference.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    runner: Arc<dyn ProcessRunner>,
    probe: Arc<dyn CapabilityProbe>,
    context: BuildContext,
    probe_executables: bool,
    verify_aws_credentials: bool,
    workspace_root: Option<PathBuf>,
}

impl Dispatcher {
    /// Create a dispatcher using the system process runner and probe.
    pub fn new(registry: Arc<ToolRegistry>, config: &Config) -> Self {
        Self {
            registry,
            runner: Arc::new(ProcessExecutor::new()),
            probe: Arc::new(SystemProbe),
            context: BuildContext::current(),
            probe_executables: config.execution.probe_executables,
            verify_aws_credentials: config.execution.verify_aws_credentials,
            workspace_root: config.execution.workspace_root.clone(),
        }
    }

    /// Replace the process runner.
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Replace the capability probe.
    pub fn with_probe(mut self, probe: Arc<dyn CapabilityProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Resolve caller-relative paths against `base_dir`.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.context = BuildContext::new(base_dir);
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Catalogue of every registered tool.
    pub fn catalog(&self) -> Vec<ToolDescriptor> {
        self.registry.catalog()
    }

    /// Run one call to completion.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolOutcome {
        let call_id = Uuid::new_v4();
        let span = info_span!("tool_call", tool = %call.name, call_id = %call_id);

        async {
            let started = Instant::now();
            let result = self.try_dispatch(call).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(text) => {
                    info!(elapsed_ms, "Tool call completed");
                    ToolOutcome::Success(text)
                }
                Err(err) => {
                    let classified = classify(&call.name, &err);
                    if classified.kind.is_caller_error() {
                        info!(elapsed_ms, kind = %classified.kind, error = %err, "Tool call rejected");
                    } else {
                        warn!(elapsed_ms, kind = %classified.kind, error = %err, "Tool call failed");
                    }
                    ToolOutcome::Failure(classified)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn try_dispatch(&self, call: &ToolCall) -> Result<String, ToolError> {
        let tool = self
            .registry
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        let args = tool.validate(&call.arguments)?;
        let plan = tool.build(args, &self.context)?;
        for line in plan.command_lines() {
            debug!(operation = %plan.operation, command = %line, "Built command");
        }

        self.check_preconditions(&plan).await?;

        if !plan.needs_workspace() {
            return self.execute(&plan, None).await;
        }

        let workspace = Workspace::create(&plan.operation, self.workspace_root.as_deref()).await?;
        let result = self.execute_in(&plan, &workspace).await;
        workspace.release().await;
        result
    }

    async fn check_preconditions(&self, plan: &CommandPlan) -> Result<(), ToolError> {
        for precondition in &plan.preconditions {
            if let Precondition::PathExists { what, path } = precondition {
                if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                    return Err(ToolError::precondition(format!(
                        "{} not found: {}",
                        what,
                        path.display()
                    )));
                }
            }
        }

        if self.probe_executables {
            let mut checked: Vec<&str> = Vec::new();
            for step in &plan.steps {
                let program = step.program.as_str();
                if checked.contains(&program) {
                    continue;
                }
                if !self.probe.is_available(program).await {
                    return Err(ToolError::precondition(missing_executable_message(program)));
                }
                checked.push(program);
            }
        }

        let needs_credentials = plan
            .preconditions
            .iter()
            .any(|p| matches!(p, Precondition::AwsCredentials));
        if needs_credentials && self.verify_aws_credentials && !self.probe.aws_credentials_valid().await {
            return Err(ToolError::precondition(AWS_CREDENTIALS_MESSAGE));
        }

        Ok(())
    }

    async fn execute_in(&self, plan: &CommandPlan, workspace: &Workspace) -> Result<String, ToolError> {
        for (name, content) in &plan.files {
            workspace.materialize(name, content).await?;
        }
        self.execute(plan, Some(workspace.path())).await
    }

    async fn execute(&self, plan: &CommandPlan, workspace: Option<&Path>) -> Result<String, ToolError> {
        let working_dir = match &plan.working_dir {
            WorkingDir::Inherit => Some(self.context.base_dir.as_path()),
            WorkingDir::Caller(path) => Some(path.as_path()),
            WorkingDir::Workspace => Some(workspace.ok_or_else(|| {
                ToolError::internal(format!("{} requires a workspace", plan.operation))
            })?),
        };

        let mut stdouts = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            let args = step.resolve_args(workspace)?;
            let result = self
                .runner
                .run(&step.program, &args, working_dir, step.stdin.as_deref())
                .await?;

            if !result.exited_cleanly {
                return Err(ToolError::Execution {
                    operation: plan.operation.clone(),
                    program: step.program.clone(),
                    status: result.status,
                    stderr: result.stderr,
                });
            }
            stdouts.push(result.stdout);
        }

        Ok(plan.render_output(&stdouts))
    }
}
