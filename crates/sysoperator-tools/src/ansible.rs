//! Configuration management tools: playbooks, inventories and ad-hoc commands.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::plan::{non_empty, to_json, CommandPlan, Invocation, OutputStyle, Precondition};
use crate::registry::{BuildContext, Operation, Tool};
use crate::schema::{Field, ParamSchema};
use crate::ToolError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPlaybookOptions {
    pub playbook: String,
    pub extra_vars: Option<Map<String, Value>>,
    pub inventory: Option<String>,
    pub tags: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaybookOptions {
    pub playbook: String,
}

#[derive(Debug, Deserialize)]
pub struct ListInventoryOptions {
    pub inventory: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdHocOptions {
    pub pattern: String,
    pub module: String,
    pub args: Option<String>,
    pub inventory: Option<String>,
    #[serde(rename = "become")]
    pub escalate: bool,
    pub extra_vars: Option<Map<String, Value>>,
}

pub fn tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Operation::<RunPlaybookOptions>::new(
            "run_playbook",
            "Run an Ansible playbook",
            ParamSchema::new()
                .field(Field::non_empty("playbook").required().describe("Path to the playbook file"))
                .field(Field::object("extraVars").describe("Variables passed with --extra-vars"))
                .field(Field::string("inventory").describe("Inventory file or host list"))
                .field(Field::string("tags").describe("Only run plays and tasks tagged with these values"))
                .field(Field::string("limit").describe("Limit selected hosts to a pattern")),
            run_playbook,
        )
        .into_tool(),
        Operation::<ListInventoryOptions>::new(
            "list_inventory",
            "List Ansible inventory hosts and groups",
            ParamSchema::new().field(Field::string("inventory").describe("Inventory file or host list")),
            list_inventory,
        )
        .into_tool(),
        Operation::<PlaybookOptions>::new(
            "check_syntax",
            "Check syntax of an Ansible playbook without executing it",
            ParamSchema::new().field(Field::non_empty("playbook").required()),
            check_syntax,
        )
        .into_tool(),
        Operation::<PlaybookOptions>::new(
            "list_tasks",
            "List all tasks that would be executed by a playbook",
            ParamSchema::new().field(Field::non_empty("playbook").required()),
            list_tasks,
        )
        .into_tool(),
        Operation::<AdHocOptions>::new(
            "run_ad_hoc",
            "Run an Ansible ad-hoc command against specified hosts",
            ParamSchema::new()
                .field(Field::non_empty("pattern").required().describe("Host pattern to target"))
                .field(Field::non_empty("module").default("ping").describe("Module to run"))
                .field(Field::string("args").describe("Module arguments"))
                .field(Field::string("inventory").describe("Inventory file or host list"))
                .field(Field::boolean("become").default(false).describe("Run with privilege escalation"))
                .field(Field::object("extra_vars").describe("Variables passed with --extra-vars")),
            run_ad_hoc,
        )
        .into_tool(),
    ]
}

fn playbook_step(playbook: &str, ctx: &BuildContext) -> (Invocation, Precondition) {
    let path = ctx.resolve_path(playbook);
    let step = Invocation::new("ansible-playbook").arg(path.display().to_string());
    (step, Precondition::path_exists("Playbook", path))
}

fn inventory_arg(inventory: Option<&str>, ctx: &BuildContext) -> Option<(String, Precondition)> {
    non_empty(inventory).map(|inventory| {
        let path = ctx.resolve_path(inventory);
        (path.display().to_string(), Precondition::path_exists("Inventory", path))
    })
}

fn extra_vars_arg(vars: Option<&Map<String, Value>>) -> Result<Option<String>, ToolError> {
    match vars {
        Some(vars) if !vars.is_empty() => to_json(vars).map(Some),
        _ => Ok(None),
    }
}

fn run_playbook(opts: &RunPlaybookOptions, ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let (mut step, playbook_check) = playbook_step(&opts.playbook, ctx);
    let inventory = inventory_arg(opts.inventory.as_deref(), ctx);

    step = step
        .flag_value("-i", inventory.as_ref().map(|(path, _)| path.as_str()))
        .flag_value("--extra-vars", extra_vars_arg(opts.extra_vars.as_ref())?.as_deref())
        .flag_value("--tags", opts.tags.as_deref())
        .flag_value("--limit", opts.limit.as_deref());

    let mut plan = CommandPlan::new("run_playbook", step)
        .require(playbook_check)
        .output(OutputStyle::text("Playbook executed successfully (no output)"));
    if let Some((_, check)) = inventory {
        plan = plan.require(check);
    }
    Ok(plan)
}

fn check_syntax(opts: &PlaybookOptions, ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let (step, check) = playbook_step(&opts.playbook, ctx);
    Ok(CommandPlan::new("check_syntax", step.arg("--syntax-check"))
        .require(check)
        .output(OutputStyle::text("Syntax check passed (no issues found)")))
}

fn list_tasks(opts: &PlaybookOptions, ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let (step, check) = playbook_step(&opts.playbook, ctx);
    Ok(CommandPlan::new("list_tasks", step.arg("--list-tasks"))
        .require(check)
        .output(OutputStyle::text("No tasks found in playbook")))
}

fn list_inventory(opts: &ListInventoryOptions, ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let inventory = inventory_arg(opts.inventory.as_deref(), ctx);
    let step = Invocation::new("ansible-inventory")
        .flag_value("-i", inventory.as_ref().map(|(path, _)| path.as_str()))
        .arg("--list");

    let mut plan = CommandPlan::new("list_inventory", step)
        .output(OutputStyle::json("No inventory data returned"));
    if let Some((_, check)) = inventory {
        plan = plan.require(check);
    }
    Ok(plan)
}

fn run_ad_hoc(opts: &AdHocOptions, ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let inventory = inventory_arg(opts.inventory.as_deref(), ctx);
    let step = Invocation::new("ansible")
        .arg(opts.pattern.as_str())
        .args(["-m", opts.module.as_str()])
        .flag_value("-a", opts.args.as_deref())
        .flag_value("-i", inventory.as_ref().map(|(path, _)| path.as_str()))
        .flag_if("--become", opts.escalate)
        .flag_value("--extra-vars", extra_vars_arg(opts.extra_vars.as_ref())?.as_deref());

    let mut plan = CommandPlan::new("run_ad_hoc", step)
        .output(OutputStyle::text("Command executed successfully (no output)"));
    if let Some((_, check)) = inventory {
        plan = plan.require(check);
    }
    Ok(plan)
}
