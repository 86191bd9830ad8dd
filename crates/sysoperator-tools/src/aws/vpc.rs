//! VPC networks and their subnets.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{cloud_plan, debug_task, module_task, params, present, region_field, require};
use crate::plan::CommandPlan;
use crate::registry::{BuildContext, Operation, Tool};
use crate::schema::{Field, ParamSchema};
use crate::yaml::{Mapping, Yaml};
use crate::ToolError;

const ACTIONS: &[&str] = &["list", "create", "delete"];

#[derive(Debug, Deserialize)]
pub struct Subnet {
    pub cidr: String,
    pub az: Option<String>,
    pub tags: Option<Map<String, Value>>,
}

impl From<&Subnet> for Yaml {
    fn from(subnet: &Subnet) -> Self {
        Mapping::new()
            .with("cidr", subnet.cidr.as_str())
            .with_opt("az", subnet.az.as_deref())
            .with_opt("tags", subnet.tags.clone())
            .into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpcOptions {
    pub action: String,
    pub region: String,
    pub vpc_id: Option<String>,
    pub cidr_block: Option<String>,
    pub name: Option<String>,
    pub dns_support: Option<bool>,
    pub dns_hostnames: Option<bool>,
    pub tags: Option<Map<String, Value>>,
    pub subnets: Option<Vec<Subnet>>,
}

pub fn tool() -> Arc<dyn Tool> {
    Operation::<VpcOptions>::new(
        "aws_vpc",
        "Manage AWS VPCs and subnets",
        ParamSchema::new()
            .field(Field::action(ACTIONS))
            .field(region_field())
            .field(Field::string("vpcId").describe("VPC ID (delete)"))
            .field(Field::string("cidrBlock").describe("CIDR block (create)"))
            .field(Field::string("name"))
            .field(Field::boolean("dnsSupport"))
            .field(Field::boolean("dnsHostnames"))
            .field(Field::object("tags"))
            .field(Field::objects("subnets").describe("Subnets to create: {cidr, az?, tags?}")),
        build,
    )
    .into_tool()
}

fn subnet_task(region: &str, subnets: &[Subnet]) -> Yaml {
    let module = params(region)
        .with("vpc_id", Yaml::template("{{ vpc_create.vpc.id }}"))
        .with("cidr", Yaml::template("{{ item.cidr }}"))
        .with("az", Yaml::template("{{ item.az | default(omit) }}"))
        .with("tags", Yaml::template("{{ item.tags | default(omit) }}"))
        .with("state", "present");
    Mapping::new()
        .with("name", "Create subnets")
        .with("amazon.aws.ec2_vpc_subnet", module)
        .with("loop", subnets.iter().map(Yaml::from).collect::<Vec<_>>())
        .with("register", "subnet_create")
        .into()
}

fn build(opts: &VpcOptions, _ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let action = opts.action.as_str();
    let tasks = match action {
        "list" => vec![
            module_task(
                "List VPCs",
                "amazon.aws.ec2_vpc_net_info",
                params(&opts.region),
                "vpc_info",
            ),
            debug_task("Display VPCs", "vpc_info.vpcs"),
        ],
        "create" => {
            require(action, &[("cidrBlock", present(&opts.cidr_block))])?;
            let module = params(&opts.region)
                .with_opt("cidr_block", opts.cidr_block.as_deref())
                .with("state", "present")
                .with_opt("name", opts.name.as_deref())
                .with_opt("dns_support", opts.dns_support)
                .with_opt("dns_hostnames", opts.dns_hostnames)
                .with_opt("tags", opts.tags.clone());
            let mut tasks = vec![
                module_task("Create VPC", "amazon.aws.ec2_vpc_net", module, "vpc_create"),
                debug_task("Display VPC", "vpc_create.vpc"),
            ];
            if let Some(subnets) = opts.subnets.as_deref().filter(|s| !s.is_empty()) {
                tasks.push(subnet_task(&opts.region, subnets));
                tasks.push(debug_task("Display subnets", "subnet_create.results"));
            }
            tasks
        }
        "delete" => {
            require(action, &[("vpcId", present(&opts.vpc_id))])?;
            let module = params(&opts.region)
                .with_opt("vpc_id", opts.vpc_id.as_deref())
                .with("state", "absent");
            vec![
                module_task("Delete VPC", "amazon.aws.ec2_vpc_net", module, "vpc_delete"),
                debug_task("Display result", "vpc_delete"),
            ]
        }
        other => return Err(ToolError::unsupported_action("aws_vpc", other)),
    };

    cloud_plan("vpc", format!("AWS VPC {} operation", action), action, tasks)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{plan, task};
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_with_subnets() {
        let plan = plan(
            "aws_vpc",
            json!({
                "action": "create",
                "region": "us-east-1",
                "cidrBlock": "10.0.0.0/16",
                "name": "main",
                "dnsHostnames": true,
                "subnets": [
                    {"cidr": "10.0.1.0/24", "az": "us-east-1a"},
                    {"cidr": "10.0.2.0/24"}
                ]
            }),
        )
        .unwrap();
        assert_eq!(plan.operation, "vpc-create");

        let vpc = &task(&plan, 0)["amazon.aws.ec2_vpc_net"];
        assert_eq!(vpc["cidr_block"], "10.0.0.0/16");
        assert_eq!(vpc["dns_hostnames"], true);
        assert!(vpc.get("dns_support").is_none());

        let subnets = task(&plan, 2);
        assert_eq!(subnets["amazon.aws.ec2_vpc_subnet"]["vpc_id"], "{{ vpc_create.vpc.id }}");
        assert_eq!(subnets["loop"][0]["az"], "us-east-1a");
        assert_eq!(subnets["loop"][1]["cidr"], "10.0.2.0/24");
        assert!(subnets["loop"][1].get("az").is_none());
        assert_eq!(subnets["register"], "subnet_create");
    }

    #[test]
    fn test_create_without_subnets_has_two_tasks() {
        let plan = plan(
            "aws_vpc",
            json!({"action": "create", "region": "us-east-1", "cidrBlock": "10.0.0.0/16", "subnets": []}),
        )
        .unwrap();
        assert!(task(&plan, 2).is_null());
    }

    #[test]
    fn test_subnet_without_cidr_is_invalid() {
        let err = plan(
            "aws_vpc",
            json!({"action": "create", "region": "us-east-1", "cidrBlock": "10.0.0.0/16", "subnets": [{"az": "a"}]}),
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[test]
    fn test_delete_requires_vpc_id() {
        let err = plan("aws_vpc", json!({"action": "delete", "region": "us-east-1"})).unwrap_err();
        assert!(err.to_string().contains("vpcId: required for action 'delete'"));

        let plan = plan("aws_vpc", json!({"action": "delete", "region": "us-east-1", "vpcId": "vpc-1"})).unwrap();
        assert_eq!(task(&plan, 0)["amazon.aws.ec2_vpc_net"]["state"], "absent");
    }
}
