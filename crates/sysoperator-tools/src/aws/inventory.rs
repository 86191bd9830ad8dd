//! EC2 dynamic inventory: generate the plugin config, list it, and ping
//! whatever it finds.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::region_field;
use crate::plan::{Arg, CommandPlan, Invocation, OutputStyle, Precondition, ReportSection, WorkingDir};
use crate::registry::{BuildContext, Operation, Tool};
use crate::schema::{Field, ParamSchema};
use crate::yaml::{self, Mapping, Yaml};
use crate::ToolError;

const INVENTORY_FILE: &str = "inventory.aws_ec2.yml";
const TEST_PLAYBOOK_FILE: &str = "test_playbook.yml";

#[derive(Debug, Deserialize)]
pub struct KeyedGroup {
    pub key: String,
    pub prefix: Option<String>,
    pub separator: Option<String>,
}

impl From<&KeyedGroup> for Yaml {
    fn from(group: &KeyedGroup) -> Self {
        Mapping::new()
            .with_opt("prefix", group.prefix.as_deref())
            .with("key", group.key.as_str())
            .with_opt("separator", group.separator.as_deref())
            .into()
    }
}

#[derive(Debug, Deserialize)]
pub struct InventoryOptions {
    pub region: String,
    pub filters: Option<Map<String, Value>>,
    pub hostnames: Option<Vec<String>>,
    pub keyed_groups: Option<Vec<KeyedGroup>>,
    pub compose: Option<Map<String, Value>>,
}

pub fn tool() -> Arc<dyn Tool> {
    Operation::<InventoryOptions>::new(
        "aws_dynamic_inventory",
        "Create and test an AWS EC2 dynamic inventory",
        ParamSchema::new()
            .field(region_field())
            .field(Field::object("filters").describe("Instance filters"))
            .field(Field::strings("hostnames").describe("Host name sources, in order of preference"))
            .field(Field::objects("keyed_groups").describe("Groups keyed on host variables: {key, prefix?, separator?}"))
            .field(Field::object("compose").describe("Host variables built from Jinja expressions")),
        build,
    )
    .into_tool()
}

fn inventory_document(opts: &InventoryOptions) -> Yaml {
    Mapping::new()
        .with("plugin", "amazon.aws.aws_ec2")
        .with("regions", vec![opts.region.as_str()])
        .with_opt("filters", opts.filters.clone())
        .with_opt("hostnames", opts.hostnames.clone())
        .with_opt(
            "keyed_groups",
            opts.keyed_groups
                .as_ref()
                .map(|groups| groups.iter().map(Yaml::from).collect::<Vec<_>>()),
        )
        .with_opt("compose", opts.compose.clone())
        .into()
}

fn test_playbook() -> Yaml {
    let ping = Mapping::new()
        .with("name", "Ping hosts found by the dynamic inventory")
        .with("ansible.builtin.ping", Mapping::new());
    Yaml::Seq(vec![Mapping::new()
        .with("name", "Test AWS Dynamic Inventory")
        .with("hosts", "all")
        .with("gather_facts", false)
        .with("tasks", vec![Yaml::from(ping)])
        .into()])
}

fn build(opts: &InventoryOptions, _ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let list = Invocation::new("ansible-inventory")
        .arg("-i")
        .arg(Arg::file(INVENTORY_FILE))
        .arg("--list");
    let ping = Invocation::new("ansible-playbook")
        .arg("-i")
        .arg(Arg::file(INVENTORY_FILE))
        .arg(Arg::file(TEST_PLAYBOOK_FILE));

    Ok(CommandPlan::new("aws-dynamic-inventory", list)
        .then(ping)
        .file(INVENTORY_FILE, yaml::to_document(&inventory_document(opts))?)
        .file(TEST_PLAYBOOK_FILE, yaml::to_document(&test_playbook())?)
        .working_dir(WorkingDir::Workspace)
        .require(Precondition::AwsCredentials)
        .output(OutputStyle::Report {
            sections: vec![
                ReportSection::File {
                    title: format!("AWS dynamic inventory ({})", INVENTORY_FILE),
                    name: INVENTORY_FILE.to_string(),
                },
                ReportSection::Step {
                    title: "Inventory list output".to_string(),
                    index: 0,
                },
                ReportSection::Step {
                    title: "Playbook test output".to_string(),
                    index: 1,
                },
            ],
        }))
}
