//! Infrastructure-as-code commands through `terraform` or `tflocal`.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::plan::{non_empty, to_json, Arg, CommandPlan, Invocation, OutputStyle, Precondition, WorkingDir};
use crate::registry::{BuildContext, Operation, Tool};
use crate::schema::{Field, ParamSchema};
use crate::ToolError;

const ACTIONS: &[&str] = &[
    "init", "plan", "apply", "destroy", "validate", "output", "import", "workspace",
];

const TFVARS_FILE: &str = "terraform.tfvars";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerraformOptions {
    pub action: String,
    pub working_dir: String,
    pub var_files: Option<Vec<String>>,
    pub vars: Option<Map<String, Value>>,
    pub tfvars: Option<String>,
    pub backend_config: Option<Map<String, Value>>,
    pub use_localstack: bool,
    pub auto_approve: bool,
    pub state: Option<String>,
    pub target: Option<Vec<String>>,
    pub lock_timeout: Option<String>,
    pub refresh: Option<bool>,
    pub workspace: Option<String>,
    pub address: Option<String>,
    pub resource_id: Option<String>,
}

pub fn tools() -> Vec<Arc<dyn Tool>> {
    vec![Operation::<TerraformOptions>::new(
        "terraform",
        "Execute Terraform commands (init, plan, apply, destroy, validate, output, etc.)",
        ParamSchema::new()
            .field(Field::action(ACTIONS))
            .field(Field::non_empty("workingDir").required().describe("Directory containing the configuration"))
            .field(Field::strings("varFiles").describe("Variable definition files"))
            .field(Field::object("vars").describe("Input variables"))
            .field(Field::string("tfvars").describe("Inline tfvars content"))
            .field(Field::object("backendConfig").describe("Backend configuration (init only)"))
            .field(Field::boolean("useLocalstack").default(false).describe("Use tflocal instead of terraform"))
            .field(Field::boolean("autoApprove").default(false).describe("Skip interactive approval"))
            .field(Field::string("state").describe("Path to the state file"))
            .field(Field::strings("target").describe("Resource addresses to target"))
            .field(Field::string("lockTimeout").describe("Duration to retry a state lock"))
            .field(Field::boolean("refresh").describe("Update state prior to planning"))
            .field(Field::string("workspace").describe("Workspace to select"))
            .field(Field::string("address").describe("Resource address (import only)"))
            .field(Field::string("resourceId").describe("Provider resource ID (import only)")),
        build,
    )
    .into_tool()]
}

/// `key=value` for `-var` and `-backend-config`. Structured values are JSON.
fn assignment(key: &str, value: &Value) -> Result<String, ToolError> {
    let rendered = match value {
        Value::String(s) => s.clone(),
        Value::Object(_) | Value::Array(_) => to_json(value)?,
        other => other.to_string(),
    };
    Ok(format!("{}={}", key, rendered))
}

/// Entries sorted by key, so the argv does not depend on map ordering.
fn sorted(map: Option<&Map<String, Value>>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.into_iter().flatten().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

fn build(opts: &TerraformOptions, ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let action = opts.action.as_str();
    if !ACTIONS.contains(&action) {
        return Err(ToolError::unsupported_action("terraform", action));
    }
    if action == "import" {
        let missing: Vec<&str> = [("address", &opts.address), ("resourceId", &opts.resource_id)]
            .into_iter()
            .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
            .map(|(name, _)| name)
            .collect();
        if !missing.is_empty() {
            return Err(ToolError::missing_for_action(action, &missing));
        }
    }

    let takes_vars = matches!(action, "plan" | "apply" | "destroy" | "import");
    let mutates_state = matches!(action, "plan" | "apply" | "destroy");

    let program = if opts.use_localstack { "tflocal" } else { "terraform" };
    let mut step = Invocation::new(program).arg(action);

    if action == "workspace" {
        step = match non_empty(opts.workspace.as_deref()) {
            Some(name) => step.args(["select", name]),
            None => step.arg("list"),
        };
    }

    if takes_vars {
        for file in opts.var_files.iter().flatten() {
            step = step.arg(format!("-var-file={}", file));
        }
        for (key, value) in sorted(opts.vars.as_ref()) {
            step = step.args(["-var".to_string(), assignment(key, value)?]);
        }
        if non_empty(opts.tfvars.as_deref()).is_some() {
            step = step.arg(Arg::file_with_prefix("-var-file=", TFVARS_FILE));
        }
    }

    if action == "init" {
        for (key, value) in sorted(opts.backend_config.as_ref()) {
            step = step.arg(format!("-backend-config={}", assignment(key, value)?));
        }
    }

    if matches!(action, "apply" | "destroy") {
        step = step.flag_if("-auto-approve", opts.auto_approve);
    }

    if mutates_state {
        if let Some(refresh) = opts.refresh {
            step = step.arg(format!("-refresh={}", refresh));
        }
        if let Some(state) = non_empty(opts.state.as_deref()) {
            step = step.arg(format!("-state={}", state));
        }
        for target in opts.target.iter().flatten() {
            step = step.arg(format!("-target={}", target));
        }
        if let Some(timeout) = non_empty(opts.lock_timeout.as_deref()) {
            step = step.arg(format!("-lock-timeout={}", timeout));
        }
    }

    if action == "output" {
        step = step.arg("-json");
    }

    if let (Some(address), Some(id)) = (opts.address.as_deref(), opts.resource_id.as_deref()) {
        if action == "import" {
            step = step.args([address, id]);
        }
    }

    let working_dir = ctx.resolve_path(&opts.working_dir);
    let output = if action == "output" {
        OutputStyle::json("Terraform output completed successfully (no output).")
    } else {
        OutputStyle::text(format!("Terraform {} completed successfully (no output).", action))
    };

    let mut plan = CommandPlan::new(format!("terraform-{}", action), step)
        .require(Precondition::path_exists("Working directory", working_dir.clone()))
        .working_dir(WorkingDir::Caller(working_dir))
        .output(output);
    if takes_vars {
        if let Some(content) = non_empty(opts.tfvars.as_deref()) {
            plan = plan.file(TFVARS_FILE, content);
        }
    }
    Ok(plan)
}
