//! Cloud resource tools.
//!
//! Every tool here builds a one-play playbook that runs an `amazon.aws`
//! module against localhost, stages it in a fresh workspace and runs
//! `ansible-playbook` on it. Requirements that depend on the chosen action
//! are checked by the builders, not the schemas.

use std::sync::Arc;

use crate::plan::{Arg, CommandPlan, Invocation, Precondition, WorkingDir};
use crate::registry::Tool;
use crate::schema::{Field, FieldIssue};
use crate::yaml::{self, Mapping, Yaml};
use crate::ToolError;

pub mod cloudformation;
pub mod ec2;
pub mod elb;
pub mod iam;
pub mod inventory;
pub mod lambda;
pub mod rds;
pub mod route53;
pub mod s3;
pub mod vpc;

pub(crate) const PLAYBOOK_FILE: &str = "playbook.yml";

pub fn tools() -> Vec<Arc<dyn Tool>> {
    vec![
        ec2::tool(),
        s3::tool(),
        vpc::tool(),
        cloudformation::tool(),
        iam::tool(),
        rds::tool(),
        route53::tool(),
        elb::tool(),
        lambda::tool(),
        inventory::tool(),
    ]
}

pub(crate) fn region_field() -> Field {
    Field::non_empty("region").required().describe("AWS region")
}

/// Module parameters, starting with the region.
pub(crate) fn params(region: &str) -> Mapping {
    Mapping::new().with("region", region)
}

/// A task running `module` and registering its result.
pub(crate) fn module_task(name: &str, module: &str, params: Mapping, register: &str) -> Yaml {
    Mapping::new()
        .with("name", name)
        .with(module, params)
        .with("register", register)
        .into()
}

pub(crate) fn debug_task(name: &str, var: &str) -> Yaml {
    Mapping::new()
        .with("name", name)
        .with("debug", Mapping::new().with("var", var))
        .into()
}

/// The play wrapper: localhost, local connection, no fact gathering.
pub(crate) fn local_play(name: String, tasks: Vec<Yaml>) -> Yaml {
    Yaml::Seq(vec![Mapping::new()
        .with("name", name)
        .with("hosts", "localhost")
        .with("connection", "local")
        .with("gather_facts", false)
        .with("tasks", tasks)
        .into()])
}

/// Stage the playbook in a workspace and run it there.
pub(crate) fn playbook_plan(operation: String, playbook: &Yaml) -> Result<CommandPlan, ToolError> {
    Ok(CommandPlan::new(
        operation,
        Invocation::new("ansible-playbook").arg(Arg::file(PLAYBOOK_FILE)),
    )
    .file(PLAYBOOK_FILE, yaml::to_document(playbook)?)
    .working_dir(WorkingDir::Workspace)
    .require(Precondition::AwsCredentials))
}

/// Plan for `<service>-<action>` running the given tasks.
pub(crate) fn cloud_plan(
    service: &str,
    play_name: String,
    action: &str,
    tasks: Vec<Yaml>,
) -> Result<CommandPlan, ToolError> {
    playbook_plan(format!("{}-{}", service, action), &local_play(play_name, tasks))
}

/// Fail with every field the action needs but did not get.
pub(crate) fn require(action: &str, fields: &[(&str, bool)]) -> Result<(), ToolError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ToolError::missing_for_action(action, &missing))
    }
}

/// Fail when none of several alternative sources was given.
pub(crate) fn require_one_of(action: &str, field: &str, alternatives: &str) -> ToolError {
    ToolError::validation(vec![FieldIssue::new(
        field,
        format!("{} is required for action '{}'", alternatives, action),
    )])
}

pub(crate) fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

pub(crate) fn present_list<T>(value: &Option<Vec<T>>) -> bool {
    value.as_ref().is_some_and(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::registry::build_plan;

    /// Build a plan with the given cloud tool.
    pub fn plan(name: &str, args: serde_json::Value) -> Result<CommandPlan, ToolError> {
        build_plan(&tools(), name, args)
    }

    /// Parse the staged playbook back.
    pub fn playbook(plan: &CommandPlan) -> serde_yaml::Value {
        let doc = plan.file_content(PLAYBOOK_FILE).expect("playbook staged");
        serde_yaml::from_str(doc).expect("playbook parses")
    }

    /// The `index`-th task of the single play.
    pub fn task(plan: &CommandPlan, index: usize) -> serde_yaml::Value {
        playbook(plan)[0]["tasks"][index].clone()
    }
}
