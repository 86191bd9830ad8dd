//! S3 buckets and objects.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{cloud_plan, debug_task, module_task, params, present, region_field, require};
use crate::plan::{CommandPlan, Precondition};
use crate::registry::{BuildContext, Operation, Tool};
use crate::schema::{Field, ParamSchema};
use crate::ToolError;

const ACTIONS: &[&str] = &[
    "list_buckets",
    "create_bucket",
    "delete_bucket",
    "list_objects",
    "upload",
    "download",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Options {
    pub action: String,
    pub region: String,
    pub bucket: Option<String>,
    pub object_key: Option<String>,
    pub local_path: Option<String>,
    pub acl: Option<String>,
    pub tags: Option<Map<String, Value>>,
    pub metadata: Option<Map<String, Value>>,
    pub content_type: Option<String>,
}

pub fn tool() -> Arc<dyn Tool> {
    Operation::<S3Options>::new(
        "aws_s3",
        "Manage AWS S3 buckets and objects",
        ParamSchema::new()
            .field(Field::action(ACTIONS))
            .field(region_field())
            .field(Field::string("bucket").describe("Bucket name"))
            .field(Field::string("objectKey").describe("Object key (upload, download)"))
            .field(Field::string("localPath").describe("Local file to upload or download to"))
            .field(Field::string("acl").describe("Canned ACL, e.g. private"))
            .field(Field::object("tags"))
            .field(Field::object("metadata").describe("Object metadata (upload)"))
            .field(Field::string("contentType").describe("Object content type (upload)")),
        build,
    )
    .into_tool()
}

fn build(opts: &S3Options, ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let action = opts.action.as_str();
    if !ACTIONS.contains(&action) {
        return Err(ToolError::unsupported_action("aws_s3", action));
    }
    let bucket = opts.bucket.as_deref().unwrap_or_default();
    let mut local_file = None;

    let tasks = match action {
        "list_buckets" => vec![
            module_task(
                "List S3 buckets",
                "amazon.aws.s3_bucket_info",
                params(&opts.region),
                "s3_buckets",
            ),
            debug_task("Display buckets", "s3_buckets.buckets"),
        ],
        "create_bucket" | "delete_bucket" => {
            require(action, &[("bucket", present(&opts.bucket))])?;
            let module = if action == "create_bucket" {
                params(&opts.region)
                    .with("name", bucket)
                    .with("state", "present")
                    .with_opt("tags", opts.tags.clone())
                    .with_opt("acl", opts.acl.as_deref())
            } else {
                params(&opts.region)
                    .with("name", bucket)
                    .with("state", "absent")
                    .with("force", true)
            };
            vec![
                module_task("Manage S3 bucket", "amazon.aws.s3_bucket", module, "s3_bucket"),
                debug_task("Display result", "s3_bucket"),
            ]
        }
        "list_objects" => {
            require(action, &[("bucket", present(&opts.bucket))])?;
            vec![
                module_task(
                    "List S3 objects",
                    "amazon.aws.s3_object",
                    params(&opts.region).with("bucket", bucket).with("mode", "list"),
                    "s3_objects",
                ),
                debug_task("Display objects", "s3_objects.s3_keys"),
            ]
        }
        _ => {
            require(
                action,
                &[
                    ("bucket", present(&opts.bucket)),
                    ("objectKey", present(&opts.object_key)),
                    ("localPath", present(&opts.local_path)),
                ],
            )?;
            let path = ctx.resolve_path(opts.local_path.as_deref().unwrap_or_default());
            let module = params(&opts.region)
                .with("bucket", bucket)
                .with_opt("object", opts.object_key.as_deref());
            let module = if action == "upload" {
                local_file = Some(path.clone());
                module
                    .with("src", path.display().to_string())
                    .with("mode", "put")
                    .with_opt("acl", opts.acl.as_deref())
                    .with_opt("tags", opts.tags.clone())
                    .with_opt("metadata", opts.metadata.clone())
                    .with_opt("content_type", opts.content_type.as_deref())
            } else {
                module.with("dest", path.display().to_string()).with("mode", "get")
            };
            vec![
                module_task("Transfer S3 object", "amazon.aws.s3_object", module, "s3_transfer"),
                debug_task("Display result", "s3_transfer"),
            ]
        }
    };

    let mut plan = cloud_plan("s3", format!("AWS S3 {} operation", action), action, tasks)?;
    if let Some(path) = local_file {
        plan = plan.require(Precondition::path_exists("Local file", path));
    }
    Ok(plan)
}
