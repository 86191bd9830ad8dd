//! Lambda functions.
//!
//! Code comes from a local zip, an S3 object, or inline source. Inline
//! source is staged as `lambda_function.py` and zipped before the playbook
//! runs.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{
    debug_task, local_play, module_task, params, playbook_plan, present, region_field, require,
    require_one_of, PLAYBOOK_FILE,
};
use crate::plan::{Arg, CommandPlan, Invocation, Precondition};
use crate::registry::{BuildContext, Operation, Tool};
use crate::schema::{Field, ParamSchema};
use crate::yaml::Mapping;
use crate::ToolError;

const ACTIONS: &[&str] = &["list", "create", "update", "delete", "invoke"];
const INVOCATION_TYPES: &[&str] = &["RequestResponse", "Event", "DryRun"];

const SOURCE_FILE: &str = "lambda_function.py";
const ARCHIVE_FILE: &str = "lambda_function.zip";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LambdaOptions {
    pub action: String,
    pub region: String,
    pub name: Option<String>,
    pub zip_file: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_key: Option<String>,
    pub function_code: Option<String>,
    pub runtime: Option<String>,
    pub handler: Option<String>,
    pub role: Option<String>,
    pub description: Option<String>,
    pub timeout: Option<i64>,
    pub memory_size: Option<i64>,
    pub environment: Option<Map<String, Value>>,
    pub tags: Option<Map<String, Value>>,
    pub payload: Option<Value>,
    pub invocation_type: String,
}

pub fn tool() -> Arc<dyn Tool> {
    Operation::<LambdaOptions>::new(
        "aws_lambda",
        "Manage AWS Lambda functions",
        ParamSchema::new()
            .field(Field::action(ACTIONS))
            .field(region_field())
            .field(Field::string("name").describe("Function name"))
            .field(Field::string("zipFile").describe("Local deployment package"))
            .field(Field::string("s3Bucket").describe("Bucket holding the deployment package"))
            .field(Field::string("s3Key"))
            .field(Field::string("functionCode").describe("Inline Python source"))
            .field(Field::string("runtime").describe("e.g. python3.12"))
            .field(Field::string("handler").describe("e.g. lambda_function.handler"))
            .field(Field::string("role").describe("Execution role ARN"))
            .field(Field::string("description"))
            .field(Field::integer("timeout").min(1).describe("Timeout in seconds"))
            .field(Field::integer("memorySize").min(128).describe("Memory in MB"))
            .field(Field::object("environment").describe("Environment variables"))
            .field(Field::object("tags"))
            .field(Field::any("payload").describe("Invocation payload (invoke)"))
            .field(
                Field::string("invocationType")
                    .one_of(INVOCATION_TYPES)
                    .default("RequestResponse"),
            ),
        build,
    )
    .into_tool()
}

/// Where the deployment package comes from.
enum CodeSource {
    Archive(String),
    Bucket { bucket: String, key: String },
    Inline(String),
}

fn code_source(opts: &LambdaOptions, ctx: &BuildContext) -> Option<CodeSource> {
    if let Some(zip) = opts.zip_file.as_deref().filter(|z| !z.is_empty()) {
        return Some(CodeSource::Archive(ctx.resolve_arg(zip)));
    }
    if let (Some(bucket), Some(key)) = (opts.s3_bucket.as_deref(), opts.s3_key.as_deref()) {
        if !bucket.is_empty() && !key.is_empty() {
            return Some(CodeSource::Bucket {
                bucket: bucket.to_string(),
                key: key.to_string(),
            });
        }
    }
    opts.function_code
        .as_deref()
        .filter(|code| !code.is_empty())
        .map(|code| CodeSource::Inline(code.to_string()))
}

fn deploy_settings(opts: &LambdaOptions, source: &CodeSource) -> Mapping {
    let mut settings = params(&opts.region)
        .with_opt("name", opts.name.as_deref())
        .with("state", "present");
    match source {
        CodeSource::Archive(path) => settings.push("zip_file", path.as_str()),
        CodeSource::Bucket { bucket, key } => {
            settings.push("s3_bucket", bucket.as_str());
            settings.push("s3_key", key.as_str());
        }
        CodeSource::Inline(_) => settings.push("zip_file", ARCHIVE_FILE),
    }
    settings
        .with_opt("runtime", opts.runtime.as_deref())
        .with_opt("handler", opts.handler.as_deref())
        .with_opt("role", opts.role.as_deref())
        .with_opt("description", opts.description.as_deref())
        .with_opt("timeout", opts.timeout)
        .with_opt("memory_size", opts.memory_size)
        .with_opt("environment_variables", opts.environment.clone())
        .with_opt("tags", opts.tags.clone())
}

fn build(opts: &LambdaOptions, ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
    let action = opts.action.as_str();
    if !ACTIONS.contains(&action) {
        return Err(ToolError::unsupported_action("aws_lambda", action));
    }
    if action != "list" {
        require(action, &[("name", present(&opts.name))])?;
    }

    let mut source = None;
    let tasks = match action {
        "list" => vec![
            module_task("List Lambda functions", "amazon.aws.lambda_info", params(&opts.region), "lambda_info"),
            debug_task("Display functions", "lambda_info.functions"),
        ],
        "create" | "update" => {
            let code = code_source(opts, ctx).ok_or_else(|| {
                require_one_of(action, "zipFile", "zipFile, s3Bucket with s3Key, or functionCode")
            })?;
            let settings = deploy_settings(opts, &code);
            source = Some(code);
            vec![
                module_task("Deploy Lambda function", "amazon.aws.lambda", settings, "lambda_deploy"),
                debug_task("Display function", "lambda_deploy"),
            ]
        }
        "delete" => {
            let settings = params(&opts.region)
                .with_opt("name", opts.name.as_deref())
                .with("state", "absent");
            vec![
                module_task("Delete Lambda function", "amazon.aws.lambda", settings, "lambda_delete"),
                debug_task("Display result", "lambda_delete"),
            ]
        }
        _ => {
            let settings = params(&opts.region)
                .with_opt("function_name", opts.name.as_deref())
                .with("invocation_type", opts.invocation_type.as_str())
                .with_opt("payload", opts.payload.clone());
            vec![
                module_task("Invoke Lambda function", "amazon.aws.lambda_invoke", settings, "lambda_invoke"),
                debug_task("Display response", "lambda_invoke"),
            ]
        }
    };

    let play = local_play(format!("AWS Lambda {} operation", action), tasks);
    let mut plan = playbook_plan(format!("lambda-{}", action), &play)?;
    match source {
        Some(CodeSource::Inline(code)) => {
            let zip = Invocation::new("zip")
                .arg("-j")
                .arg(Arg::file(ARCHIVE_FILE))
                .arg(Arg::file(SOURCE_FILE));
            let run = plan.steps.remove(0);
            plan.steps = vec![zip, run];
            plan = plan.file(SOURCE_FILE, code);
        }
        Some(CodeSource::Archive(path)) => {
            plan = plan.require(Precondition::path_exists("Deployment package", path));
        }
        _ => {}
    }
    Ok(plan)
}
