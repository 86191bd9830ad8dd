//! CloudFormation stacks.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{cloud_plan, debug_task, module_task, params, present, region_field, require, require_one_of};
use crate::plan::CommandPlan;
use crate::registry::{BuildContext, Operation, Tool};
use crate::schema::{Field, ParamSchema};
use crate::ToolError;

const ACTIONS: &[&str] = &["list", "create", "update", "delete"];

const TEMPLATE_FILE: &str = "template.cfn";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudFormationOptions {
    pub action: String,
    pub region: String,
    pub stack_name: Option<String>,
    pub template_body: Option<String>,
    pub template_url: Option<String>,
    pub parameters: Option<Map<String, Value>>,
    pub capabilities: Option<Vec<String>>,
    pub tags: Option<Map<String, Value>>,
}

pub fn tool() -> Arc<dyn Tool> {
    Operation::<CloudFormationOptions>::new(
        "aws_cloudformation",
        "Manage AWS CloudFormation stacks",
        ParamSchema::new()
            .field(Field::action(ACTIONS))
            .field(region_field())
            .field(Field::string("stackName"))
            .field(Field::string("templateBody").describe("Inline template (create, update)"))
            .field(Field::string("templateUrl").describe("S3 URL of the template (create, update)"))
            .field(Field::object("parameters").describe("Template parameters"))
            .field(Field::strings("capabilities").describe("e.g. CAPABILITY_IAM"))
            .field(Field::object("tags")),
        build,
    )
    .into_tool()
}

fn build(opts: &CloudFormationOptions, _ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let action = opts.action.as_str();
    let mut template = None;

    let tasks = match action {
        "list" => vec![
            module_task(
                "List CloudFormation stacks",
                "amazon.aws.cloudformation_info",
                params(&opts.region),
                "cfn_info",
            ),
            debug_task("Display stacks", "cfn_info.cloudformation"),
        ],
        "create" | "update" => {
            require(action, &[("stackName", present(&opts.stack_name))])?;
            let module = params(&opts.region)
                .with_opt("stack_name", opts.stack_name.as_deref())
                .with("state", "present");
            let module = if let Some(body) = opts.template_body.as_deref().filter(|b| !b.is_empty()) {
                template = Some(body);
                module.with("template", TEMPLATE_FILE)
            } else if present(&opts.template_url) {
                module.with_opt("template_url", opts.template_url.as_deref())
            } else {
                return Err(require_one_of(action, "templateBody", "templateBody or templateUrl"));
            };
            let module = module
                .with_opt("template_parameters", opts.parameters.clone())
                .with_opt("capabilities", opts.capabilities.clone())
                .with_opt("tags", opts.tags.clone());
            vec![
                module_task("Deploy CloudFormation stack", "amazon.aws.cloudformation", module, "cfn_stack"),
                debug_task("Display stack", "cfn_stack"),
            ]
        }
        "delete" => {
            require(action, &[("stackName", present(&opts.stack_name))])?;
            let module = params(&opts.region)
                .with_opt("stack_name", opts.stack_name.as_deref())
                .with("state", "absent");
            vec![
                module_task("Delete CloudFormation stack", "amazon.aws.cloudformation", module, "cfn_delete"),
                debug_task("Display result", "cfn_delete"),
            ]
        }
        other => return Err(ToolError::unsupported_action("aws_cloudformation", other)),
    };

    let mut plan = cloud_plan(
        "cloudformation",
        format!("AWS CloudFormation {} operation", action),
        action,
        tasks,
    )?;
    if let Some(body) = template {
        plan = plan.file(TEMPLATE_FILE, body);
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{plan, task};
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inline_template_is_staged() {
        let body = "Resources:\n  Bucket:\n    Type: AWS::S3::Bucket\n";
        let plan = plan(
            "aws_cloudformation",
            json!({
                "action": "create",
                "region": "us-east-1",
                "stackName": "app",
                "templateBody": body,
                "parameters": {"Env": "prod"},
                "capabilities": ["CAPABILITY_IAM"]
            }),
        )
        .unwrap();
        assert_eq!(plan.operation, "cloudformation-create");
        assert_eq!(plan.file_content(TEMPLATE_FILE), Some(body));

        let module = &task(&plan, 0)["amazon.aws.cloudformation"];
        assert_eq!(module["template"], TEMPLATE_FILE);
        assert_eq!(module["template_parameters"]["Env"], "prod");
        assert_eq!(module["capabilities"][0], "CAPABILITY_IAM");
        assert!(module.get("template_url").is_none());
    }

    #[test]
    fn test_template_url() {
        let plan = plan(
            "aws_cloudformation",
            json!({"action": "update", "region": "us-east-1", "stackName": "app", "templateUrl": "https://s3/x.yml"}),
        )
        .unwrap();
        assert!(plan.file_content(TEMPLATE_FILE).is_none());
        assert_eq!(task(&plan, 0)["amazon.aws.cloudformation"]["template_url"], "https://s3/x.yml");
    }

    #[test]
    fn test_create_needs_a_template_source() {
        let err = plan(
            "aws_cloudformation",
            json!({"action": "create", "region": "us-east-1", "stackName": "app"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("templateBody or templateUrl is required for action 'create'"));
    }

    #[test]
    fn test_delete() {
        let plan = plan(
            "aws_cloudformation",
            json!({"action": "delete", "region": "us-east-1", "stackName": "app"}),
        )
        .unwrap();
        assert_eq!(task(&plan, 0)["amazon.aws.cloudformation"]["state"], "absent");
        assert!(plan.files.iter().all(|(name, _)| name != TEMPLATE_FILE));
    }
}
