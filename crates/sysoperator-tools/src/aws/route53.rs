//! Route53 hosted zones and record sets.

use std::sync::Arc;

use serde::Deserialize;

use super::{cloud_plan, debug_task, module_task, params, present, region_field, require};
use crate::plan::CommandPlan;
use crate::registry::{BuildContext, Operation, Tool};
use crate::schema::{Field, ParamSchema};
use crate::ToolError;

const ACTIONS: &[&str] = &[
    "list_zones",
    "list_records",
    "create_zone",
    "create_record",
    "delete_record",
    "delete_zone",
];

const DEFAULT_TTL: i64 = 300;

/// A record value given as one string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecordValue {
    One(String),
    Many(Vec<String>),
}

impl RecordValue {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            RecordValue::One(value) => vec![value],
            RecordValue::Many(values) => values,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route53Options {
    pub action: String,
    pub region: String,
    pub zone_id: Option<String>,
    pub zone_name: Option<String>,
    pub record_name: Option<String>,
    pub record_type: Option<String>,
    pub record_ttl: Option<i64>,
    pub record_value: Option<RecordValue>,
    pub record_state: String,
    pub comment: Option<String>,
}

pub fn tool() -> Arc<dyn Tool> {
    Operation::<Route53Options>::new(
        "aws_route53",
        "Manage AWS Route53 DNS zones and records",
        ParamSchema::new()
            .field(Field::action(ACTIONS))
            .field(region_field())
            .field(Field::string("zoneId").describe("Hosted zone ID (list_records)"))
            .field(Field::string("zoneName"))
            .field(Field::string("recordName"))
            .field(Field::string("recordType").describe("e.g. A, CNAME, TXT"))
            .field(Field::integer("recordTtl").min(0).describe("Record TTL, 300 when omitted"))
            .field(Field::string_or_array("recordValue"))
            .field(
                Field::string("recordState")
                    .one_of(&["present", "absent"])
                    .default("present"),
            )
            .field(Field::string("comment")),
        build,
    )
    .into_tool()
}

fn build(opts: &Route53Options, _ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let action = opts.action.as_str();
    let values = opts.record_value.clone().map(RecordValue::into_vec);

    let tasks = match action {
        "list_zones" => vec![
            module_task(
                "List hosted zones",
                "amazon.aws.route53_info",
                params(&opts.region).with("query", "hosted_zone"),
                "route53_zones",
            ),
            debug_task("Display zones", "route53_zones.HostedZones"),
        ],
        "list_records" => {
            require(action, &[("zoneId", present(&opts.zone_id))])?;
            let module = params(&opts.region)
                .with("query", "record_sets")
                .with_opt("hosted_zone_id", opts.zone_id.as_deref());
            vec![
                module_task("List records", "amazon.aws.route53_info", module, "route53_records"),
                debug_task("Display records", "route53_records.ResourceRecordSets"),
            ]
        }
        "create_zone" | "delete_zone" => {
            require(action, &[("zoneName", present(&opts.zone_name))])?;
            let state = if action == "create_zone" { "present" } else { "absent" };
            let module = params(&opts.region)
                .with_opt("zone", opts.zone_name.as_deref())
                .with("state", state)
                .with_opt("comment", opts.comment.as_deref().filter(|_| state == "present"));
            vec![
                module_task("Manage hosted zone", "amazon.aws.route53_zone", module, "route53_zone"),
                debug_task("Display result", "route53_zone"),
            ]
        }
        "create_record" | "delete_record" => {
            let has_values = values.as_ref().is_some_and(|v| !v.is_empty());
            let mut needed = vec![
                ("zoneName", present(&opts.zone_name)),
                ("recordName", present(&opts.record_name)),
                ("recordType", present(&opts.record_type)),
            ];
            if action == "create_record" {
                needed.push(("recordValue", has_values));
            }
            require(action, &needed)?;
            let state = if action == "create_record" {
                opts.record_state.as_str()
            } else {
                "absent"
            };
            let module = params(&opts.region)
                .with_opt("zone", opts.zone_name.as_deref())
                .with_opt("record", opts.record_name.as_deref())
                .with_opt("type", opts.record_type.as_deref())
                .with("ttl", opts.record_ttl.unwrap_or(DEFAULT_TTL))
                .with_opt("value", values)
                .with("state", state)
                .with_opt("comment", opts.comment.as_deref());
            vec![
                module_task("Manage DNS record", "amazon.aws.route53", module, "route53_record"),
                debug_task("Display result", "route53_record"),
            ]
        }
        other => return Err(ToolError::unsupported_action("aws_route53", other)),
    };

    cloud_plan("route53", format!("AWS Route53 {} operation", action), action, tasks)
}
