//! EC2 instances.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{cloud_plan, debug_task, module_task, params, present, present_list, region_field, require};
use crate::plan::CommandPlan;
use crate::registry::{BuildContext, Operation, Tool};
use crate::schema::{Field, ParamSchema};
use crate::ToolError;

const ACTIONS: &[&str] = &["list", "create", "terminate", "start", "stop"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ec2Options {
    pub action: String,
    pub region: String,
    pub instance_ids: Option<Vec<String>>,
    pub filters: Option<Map<String, Value>>,
    pub instance_type: Option<String>,
    pub image_id: Option<String>,
    pub key_name: Option<String>,
    pub security_groups: Option<Vec<String>>,
    pub user_data: Option<String>,
    pub count: Option<i64>,
    pub tags: Option<Map<String, Value>>,
    pub wait_for_completion: bool,
    pub termination_protection: Option<bool>,
}

pub fn tool() -> Arc<dyn Tool> {
    Operation::<Ec2Options>::new(
        "aws_ec2",
        "Manage AWS EC2 instances (list, create, terminate, start, stop)",
        ParamSchema::new()
            .field(Field::action(ACTIONS))
            .field(region_field())
            .field(Field::strings("instanceIds").describe("Instance IDs (terminate, start, stop)"))
            .field(Field::object("filters").describe("Filters for list"))
            .field(Field::string("instanceType"))
            .field(Field::string("imageId"))
            .field(Field::string("keyName"))
            .field(Field::strings("securityGroups"))
            .field(Field::string("userData"))
            .field(Field::integer("count").min(1).describe("Exact number of instances to run"))
            .field(Field::object("tags"))
            .field(Field::boolean("waitForCompletion").default(true))
            .field(Field::boolean("terminationProtection")),
        build,
    )
    .into_tool()
}

fn build(opts: &Ec2Options, _ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let action = opts.action.as_str();
    let tasks = match action {
        "list" => vec![
            module_task(
                "List EC2 instances",
                "amazon.aws.ec2_instance_info",
                params(&opts.region).with_opt("filters", opts.filters.clone()),
                "ec2_info",
            ),
            debug_task("Display instances", "ec2_info.instances"),
        ],
        "create" => {
            require(
                action,
                &[
                    ("instanceType", present(&opts.instance_type)),
                    ("imageId", present(&opts.image_id)),
                ],
            )?;
            let module = params(&opts.region)
                .with("state", "present")
                .with_opt("instance_type", opts.instance_type.as_deref())
                .with_opt("image_id", opts.image_id.as_deref())
                .with_opt("key_name", opts.key_name.as_deref())
                .with_opt("security_groups", opts.security_groups.clone())
                .with_opt("user_data", opts.user_data.as_deref())
                .with_opt("exact_count", opts.count)
                .with_opt("tags", opts.tags.clone())
                .with("wait", opts.wait_for_completion)
                .with_opt("termination_protection", opts.termination_protection);
            vec![
                module_task("Create EC2 instance", "amazon.aws.ec2_instance", module, "ec2_create"),
                debug_task("Display created instances", "ec2_create.instances"),
            ]
        }
        "terminate" | "start" | "stop" => {
            require(action, &[("instanceIds", present_list(&opts.instance_ids))])?;
            let state = match action {
                "terminate" => "absent",
                "start" => "running",
                _ => "stopped",
            };
            let module = params(&opts.region)
                .with_opt("instance_ids", opts.instance_ids.clone())
                .with("state", state)
                .with("wait", opts.wait_for_completion);
            let register = format!("ec2_{}", action);
            vec![
                module_task(
                    &format!("{} EC2 instances", capitalize(action)),
                    "amazon.aws.ec2_instance",
                    module,
                    &register,
                ),
                debug_task("Display result", &register),
            ]
        }
        other => return Err(ToolError::unsupported_action("aws_ec2", other)),
    };

    cloud_plan("ec2", format!("AWS EC2 {} operation", action), action, tasks)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{plan, task};
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_passes_filters() {
        let plan = plan(
            "aws_ec2",
            json!({"action": "list", "region": "us-east-1", "filters": {"instance-state-name": "running"}}),
        )
        .unwrap();
        assert_eq!(plan.operation, "ec2-list");
        let list = task(&plan, 0);
        assert_eq!(list["amazon.aws.ec2_instance_info"]["region"], "us-east-1");
        assert_eq!(
            list["amazon.aws.ec2_instance_info"]["filters"]["instance-state-name"],
            "running"
        );
        assert_eq!(task(&plan, 1)["debug"]["var"], "ec2_info.instances");
    }

    #[test]
    fn test_create_requires_type_and_image() {
        let err = plan("aws_ec2", json!({"action": "create", "region": "us-east-1"})).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("instanceType: required for action 'create'"));
        assert!(text.contains("imageId: required for action 'create'"));
    }

    #[test]
    fn test_create_instance() {
        let plan = plan(
            "aws_ec2",
            json!({
                "action": "create",
                "region": "eu-west-1",
                "instanceType": "t3.micro",
                "imageId": "ami-123",
                "count": 2,
                "tags": {"Name": "web"},
                "terminationProtection": true
            }),
        )
        .unwrap();
        let module = &task(&plan, 0)["amazon.aws.ec2_instance"];
        assert_eq!(module["state"], "present");
        assert_eq!(module["instance_type"], "t3.micro");
        assert_eq!(module["exact_count"], 2);
        assert_eq!(module["wait"], true);
        assert_eq!(module["termination_protection"], true);
        assert_eq!(module["tags"]["Name"], "web");
        assert!(module.get("key_name").is_none());
    }

    #[test]
    fn test_state_changes() {
        for (action, state) in [("terminate", "absent"), ("start", "running"), ("stop", "stopped")] {
            let plan = plan(
                "aws_ec2",
                json!({"action": action, "region": "us-east-1", "instanceIds": ["i-1", "i-2"], "waitForCompletion": false}),
            )
            .unwrap();
            let module = &task(&plan, 0)["amazon.aws.ec2_instance"];
            assert_eq!(module["state"], state);
            assert_eq!(module["instance_ids"][1], "i-2");
            assert_eq!(module["wait"], false);
        }

        let err = plan("aws_ec2", json!({"action": "stop", "region": "us-east-1", "instanceIds": []})).unwrap_err();
        assert!(err.to_string().contains("instanceIds: required for action 'stop'"));
    }

    #[test]
    fn test_unknown_action() {
        let err = plan("aws_ec2", json!({"action": "reboot", "region": "us-east-1"})).unwrap_err();
        assert!(matches!(err, ToolError::UnsupportedAction { .. }));
    }
}
