//! Elastic load balancers of all three generations.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{cloud_plan, debug_task, module_task, params, present, region_field, require};
use crate::plan::CommandPlan;
use crate::registry::{BuildContext, Operation, Tool};
use crate::schema::{Field, ParamSchema};
use crate::ToolError;

const ACTIONS: &[&str] = &["list", "create", "delete"];
const LB_TYPES: &[&str] = &["application", "network", "classic"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElbOptions {
    pub action: String,
    pub region: String,
    pub lb_type: String,
    pub name: Option<String>,
    pub scheme: Option<String>,
    pub subnets: Option<Vec<String>>,
    pub security_groups: Option<Vec<String>>,
    pub listeners: Option<Vec<Value>>,
    pub health_check: Option<Map<String, Value>>,
    pub tags: Option<Map<String, Value>>,
    pub target_groups: Option<Vec<Value>>,
}

pub fn tool() -> Arc<dyn Tool> {
    Operation::<ElbOptions>::new(
        "aws_elb",
        "Manage AWS Elastic Load Balancers (application, network, classic)",
        ParamSchema::new()
            .field(Field::action(ACTIONS))
            .field(region_field())
            .field(Field::string("lbType").one_of(LB_TYPES).default("application"))
            .field(Field::string("name"))
            .field(Field::string("scheme").describe("internet-facing or internal"))
            .field(Field::strings("subnets"))
            .field(Field::strings("securityGroups"))
            .field(Field::objects("listeners"))
            .field(Field::object("healthCheck").describe("Health check settings (classic)"))
            .field(Field::object("tags"))
            .field(Field::objects("targetGroups")),
        build,
    )
    .into_tool()
}

fn build(opts: &ElbOptions, _ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let action = opts.action.as_str();
    let module = format!("amazon.aws.elb_{}_lb", opts.lb_type);

    let tasks = match action {
        "list" => vec![
            module_task(
                "List load balancers",
                &format!("{}_info", module),
                params(&opts.region),
                "elb_info",
            ),
            debug_task("Display load balancers", "elb_info"),
        ],
        "create" => {
            require(action, &[("name", present(&opts.name))])?;
            let settings = params(&opts.region)
                .with_opt("name", opts.name.as_deref())
                .with("state", "present")
                .with_opt("scheme", opts.scheme.as_deref())
                .with_opt("subnets", opts.subnets.clone())
                .with_opt("security_groups", opts.security_groups.clone())
                .with_opt("listeners", opts.listeners.clone())
                .with_opt("health_check", opts.health_check.clone())
                .with_opt("tags", opts.tags.clone())
                .with_opt("target_groups", opts.target_groups.clone());
            vec![
                module_task("Create load balancer", &module, settings, "elb_create"),
                debug_task("Display load balancer", "elb_create"),
            ]
        }
        "delete" => {
            require(action, &[("name", present(&opts.name))])?;
            let settings = params(&opts.region)
                .with_opt("name", opts.name.as_deref())
                .with("state", "absent");
            vec![
                module_task("Delete load balancer", &module, settings, "elb_delete"),
                debug_task("Display result", "elb_delete"),
            ]
        }
        other => return Err(ToolError::unsupported_action("aws_elb", other)),
    };

    cloud_plan(
        "elb",
        format!("AWS ELB {} operation ({})", action, opts.lb_type),
        action,
        tasks,
    )
}
