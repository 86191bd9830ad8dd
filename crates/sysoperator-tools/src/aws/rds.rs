//! RDS database instances.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{cloud_plan, debug_task, module_task, params, present, region_field, require};
use crate::plan::CommandPlan;
use crate::registry::{BuildContext, Operation, Tool};
use crate::schema::{Field, ParamSchema};
use crate::ToolError;

const ACTIONS: &[&str] = &["list", "create", "delete", "start", "stop"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RdsOptions {
    pub action: String,
    pub region: String,
    pub db_instance_identifier: Option<String>,
    pub db_engine: Option<String>,
    pub db_instance_class: Option<String>,
    pub allocated_storage: Option<i64>,
    pub master_username: Option<String>,
    pub master_password: Option<String>,
    pub vpc_security_group_ids: Option<Vec<String>>,
    pub db_subnet_group_name: Option<String>,
    pub tags: Option<Map<String, Value>>,
    #[serde(rename = "multiAZ")]
    pub multi_az: Option<bool>,
    pub backup_retention_period: Option<i64>,
    pub skip_final_snapshot: bool,
}

pub fn tool() -> Arc<dyn Tool> {
    Operation::<RdsOptions>::new(
        "aws_rds",
        "Manage AWS RDS database instances",
        ParamSchema::new()
            .field(Field::action(ACTIONS))
            .field(region_field())
            .field(Field::string("dbInstanceIdentifier"))
            .field(Field::string("dbEngine").describe("e.g. postgres, mysql"))
            .field(Field::string("dbInstanceClass").describe("e.g. db.t3.micro"))
            .field(Field::integer("allocatedStorage").min(1).describe("Storage in GiB"))
            .field(Field::string("masterUsername"))
            .field(Field::string("masterPassword"))
            .field(Field::strings("vpcSecurityGroupIds"))
            .field(Field::string("dbSubnetGroupName"))
            .field(Field::object("tags"))
            .field(Field::boolean("multiAZ"))
            .field(Field::integer("backupRetentionPeriod").min(0).describe("Days to keep backups"))
            .field(Field::boolean("skipFinalSnapshot").default(false)),
        build,
    )
    .into_tool()
}

fn build(opts: &RdsOptions, _ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let action = opts.action.as_str();
    if !ACTIONS.contains(&action) {
        return Err(ToolError::unsupported_action("aws_rds", action));
    }
    if action == "list" {
        let tasks = vec![
            module_task("List RDS instances", "amazon.aws.rds_instance_info", params(&opts.region), "rds_info"),
            debug_task("Display instances", "rds_info.instances"),
        ];
        return cloud_plan("rds", "AWS RDS list operation".to_string(), action, tasks);
    }

    require(action, &[("dbInstanceIdentifier", present(&opts.db_instance_identifier))])?;
    let module = params(&opts.region).with_opt("db_instance_identifier", opts.db_instance_identifier.as_deref());

    let module = match action {
        "create" => {
            require(
                action,
                &[
                    ("dbEngine", present(&opts.db_engine)),
                    ("dbInstanceClass", present(&opts.db_instance_class)),
                    ("allocatedStorage", opts.allocated_storage.is_some()),
                    ("masterUsername", present(&opts.master_username)),
                    ("masterPassword", present(&opts.master_password)),
                ],
            )?;
            module
                .with_opt("engine", opts.db_engine.as_deref())
                .with_opt("db_instance_class", opts.db_instance_class.as_deref())
                .with_opt("allocated_storage", opts.allocated_storage)
                .with_opt("master_username", opts.master_username.as_deref())
                .with_opt("master_user_password", opts.master_password.as_deref())
                .with("state", "present")
                .with_opt("vpc_security_group_ids", opts.vpc_security_group_ids.clone())
                .with_opt("db_subnet_group_name", opts.db_subnet_group_name.as_deref())
                .with_opt("tags", opts.tags.clone())
                .with_opt("multi_az", opts.multi_az)
                .with_opt("backup_retention_period", opts.backup_retention_period)
        }
        "delete" => module
            .with("state", "absent")
            .with("skip_final_snapshot", opts.skip_final_snapshot),
        "start" => module.with("state", "started"),
        _ => module.with("state", "stopped"),
    };

    let register = format!("rds_{}", action);
    let tasks = vec![
        module_task(&format!("RDS {}", action), "amazon.aws.rds_instance", module, &register),
        debug_task("Display result", &register),
    ];
    cloud_plan("rds", format!("AWS RDS {} operation", action), action, tasks)
}
