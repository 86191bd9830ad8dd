//! IAM roles and managed policies.
//!
//! Policy documents are staged as JSON files next to the playbook and read
//! back with a `file` lookup, so they never pass through YAML quoting.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::{cloud_plan, debug_task, module_task, params, present, region_field, require};
use crate::plan::CommandPlan;
use crate::registry::{BuildContext, Operation, Tool};
use crate::schema::{Field, ParamSchema};
use crate::yaml::Yaml;
use crate::ToolError;

const ACTIONS: &[&str] = &[
    "list_roles",
    "list_policies",
    "create_role",
    "create_policy",
    "delete_role",
    "delete_policy",
];

const POLICY_FILE: &str = "policy.json";
const TRUST_POLICY_FILE: &str = "assume_role_policy.json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamOptions {
    pub action: String,
    pub region: String,
    pub role_name: Option<String>,
    pub policy_name: Option<String>,
    pub policy_document: Option<Value>,
    pub assume_role_policy_document: Option<Value>,
    pub path: Option<String>,
    pub managed_policies: Option<Vec<String>>,
}

pub fn tool() -> Arc<dyn Tool> {
    Operation::<IamOptions>::new(
        "aws_iam",
        "Manage AWS IAM roles and policies",
        ParamSchema::new()
            .field(Field::action(ACTIONS))
            .field(region_field())
            .field(Field::string("roleName"))
            .field(Field::string("policyName"))
            .field(Field::any("policyDocument").describe("Policy document, as JSON object or text"))
            .field(Field::any("assumeRolePolicyDocument").describe("Trust policy for create_role"))
            .field(Field::string("path"))
            .field(Field::strings("managedPolicies").describe("Policy ARNs to attach (create_role)")),
        build,
    )
    .into_tool()
}

/// Text of a policy document: strings as given, anything else pretty JSON.
fn document_text(document: &Value) -> Result<String, ToolError> {
    match document {
        Value::String(text) => Ok(text.clone()),
        other => serde_json::to_string_pretty(other)
            .map_err(|e| ToolError::internal(format!("JSON encoding failed: {}", e))),
    }
}

fn file_lookup(name: &str) -> Yaml {
    Yaml::template(format!("{{{{ lookup('file', '{}') }}}}", name))
}

fn build(opts: &IamOptions, _ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let action = opts.action.as_str();
    let mut files = Vec::new();

    let tasks = match action {
        "list_roles" => vec![
            module_task("List IAM roles", "amazon.aws.iam_role_info", params(&opts.region), "iam_roles"),
            debug_task("Display roles", "iam_roles.iam_roles"),
        ],
        "list_policies" => vec![
            module_task(
                "List IAM policies",
                "amazon.aws.iam_policy_info",
                params(&opts.region),
                "iam_policies",
            ),
            debug_task("Display policies", "iam_policies"),
        ],
        "create_role" => {
            require(action, &[("roleName", present(&opts.role_name))])?;
            let mut module = params(&opts.region).with_opt("name", opts.role_name.as_deref());
            if let Some(ref document) = opts.assume_role_policy_document {
                files.push((TRUST_POLICY_FILE, document_text(document)?));
                module.push("assume_role_policy_document", file_lookup(TRUST_POLICY_FILE));
            }
            let module = module
                .with("state", "present")
                .with_opt("path", opts.path.as_deref())
                .with_opt("managed_policies", opts.managed_policies.clone());
            vec![
                module_task("Create IAM role", "amazon.aws.iam_role", module, "iam_role"),
                debug_task("Display role", "iam_role"),
            ]
        }
        "create_policy" => {
            require(
                action,
                &[
                    ("policyName", present(&opts.policy_name)),
                    ("policyDocument", opts.policy_document.is_some()),
                ],
            )?;
            if let Some(ref document) = opts.policy_document {
                files.push((POLICY_FILE, document_text(document)?));
            }
            let module = params(&opts.region)
                .with_opt("policy_name", opts.policy_name.as_deref())
                .with("policy_document", file_lookup(POLICY_FILE))
                .with("state", "present")
                .with_opt("path", opts.path.as_deref());
            vec![
                module_task("Create IAM policy", "amazon.aws.iam_policy", module, "iam_policy"),
                debug_task("Display policy", "iam_policy"),
            ]
        }
        "delete_role" => {
            require(action, &[("roleName", present(&opts.role_name))])?;
            let module = params(&opts.region)
                .with_opt("name", opts.role_name.as_deref())
                .with("state", "absent");
            vec![
                module_task("Delete IAM role", "amazon.aws.iam_role", module, "iam_role"),
                debug_task("Display result", "iam_role"),
            ]
        }
        "delete_policy" => {
            require(action, &[("policyName", present(&opts.policy_name))])?;
            let module = params(&opts.region)
                .with_opt("policy_name", opts.policy_name.as_deref())
                .with("state", "absent");
            vec![
                module_task("Delete IAM policy", "amazon.aws.iam_policy", module, "iam_policy"),
                debug_task("Display result", "iam_policy"),
            ]
        }
        other => return Err(ToolError::unsupported_action("aws_iam", other)),
    };

    let mut plan = cloud_plan("iam", format!("AWS IAM {} operation", action), action, tasks)?;
    for (name, content) in files {
        plan = plan.file(name, content);
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{plan, task};
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_role_stages_trust_policy() {
        let trust = json!({"Version": "2012-10-17", "Statement": [{"Effect": "Allow"}]});
        let plan = plan(
            "aws_iam",
            json!({
                "action": "create_role",
                "region": "us-east-1",
                "roleName": "deployer",
                "assumeRolePolicyDocument": trust,
                "managedPolicies": ["arn:aws:iam::aws:policy/ReadOnlyAccess"]
            }),
        )
        .unwrap();
        assert_eq!(plan.operation, "iam-create_role");

        let staged: Value = serde_json::from_str(plan.file_content(TRUST_POLICY_FILE).unwrap()).unwrap();
        assert_eq!(staged, trust);

        let module = &task(&plan, 0)["amazon.aws.iam_role"];
        assert_eq!(module["name"], "deployer");
        assert_eq!(
            module["assume_role_policy_document"],
            "{{ lookup('file', 'assume_role_policy.json') }}"
        );
        assert_eq!(module["managed_policies"][0], "arn:aws:iam::aws:policy/ReadOnlyAccess");
    }

    #[test]
    fn test_create_policy_accepts_text_document() {
        let plan = plan(
            "aws_iam",
            json!({
                "action": "create_policy",
                "region": "us-east-1",
                "policyName": "read-logs",
                "policyDocument": "{\"Version\": \"2012-10-17\"}"
            }),
        )
        .unwrap();
        assert_eq!(plan.file_content(POLICY_FILE), Some("{\"Version\": \"2012-10-17\"}"));
        assert_eq!(
            task(&plan, 0)["amazon.aws.iam_policy"]["policy_document"],
            "{{ lookup('file', 'policy.json') }}"
        );
    }

    #[test]
    fn test_create_policy_requires_document() {
        let err = plan(
            "aws_iam",
            json!({"action": "create_policy", "region": "us-east-1", "policyName": "p"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("policyDocument: required for action 'create_policy'"));
    }

    #[test]
    fn test_listing_needs_no_files() {
        let plan = plan("aws_iam", json!({"action": "list_roles", "region": "us-east-1"})).unwrap();
        assert_eq!(plan.files.len(), 1);
        assert_eq!(task(&plan, 1)["debug"]["var"], "iam_roles.iam_roles");
    }
}
