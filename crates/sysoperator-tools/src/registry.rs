//! Tool registry for the operations the server exposes.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use sysoperator_core::ToolDescriptor;
use thiserror::Error;

use crate::plan::CommandPlan;
use crate::schema::{ParamSchema, ValidatedArgs};
use crate::ToolError;

/// Inputs a builder may depend on besides its options.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Directory that caller-relative paths are resolved against.
    pub base_dir: PathBuf,
}

impl BuildContext {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Context rooted at the process working directory.
    pub fn current() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    /// Resolve a path relative to the base directory.
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Resolve a path and render it for an argv.
    pub fn resolve_arg(&self, path: &str) -> String {
        self.resolve_path(path).display().to_string()
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::current()
    }
}

/// A named operation with a parameter schema and a pure plan builder.
pub trait Tool: Send + Sync {
    /// Unique name of this tool.
    fn name(&self) -> &str;

    /// Catalogue entry, including the JSON Schema of the arguments.
    fn descriptor(&self) -> ToolDescriptor;

    /// Validate and normalise raw arguments.
    fn validate(&self, arguments: &serde_json::Value) -> Result<ValidatedArgs, ToolError>;

    /// Build the command plan for validated arguments.
    fn build(&self, args: ValidatedArgs, ctx: &BuildContext) -> Result<CommandPlan, ToolError>;
}

type BuildFn<O> = fn(&O, &BuildContext) -> Result<CommandPlan, ToolError>;

/// A [`Tool`] made of a schema, a typed options record and a builder.
pub struct Operation<O> {
    name: &'static str,
    description: &'static str,
    schema: ParamSchema,
    build: BuildFn<O>,
    _options: PhantomData<fn() -> O>,
}

impl<O> Operation<O>
where
    O: DeserializeOwned + 'static,
{
    pub fn new(
        name: &'static str,
        description: &'static str,
        schema: ParamSchema,
        build: BuildFn<O>,
    ) -> Self {
        Self {
            name,
            description,
            schema,
            build,
            _options: PhantomData,
        }
    }

    /// Box the operation for registration.
    pub fn into_tool(self) -> Arc<dyn Tool> {
        Arc::new(self)
    }
}

impl<O> Tool for Operation<O>
where
    O: DeserializeOwned + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.schema.to_json_schema(),
        }
    }

    fn validate(&self, arguments: &serde_json::Value) -> Result<ValidatedArgs, ToolError> {
        self.schema.validate(arguments)
    }

    fn build(&self, args: ValidatedArgs, ctx: &BuildContext) -> Result<CommandPlan, ToolError> {
        let options: O = args.into_typed()?;
        (self.build)(&options, ctx)
    }
}

/// Errors raised while assembling the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate tool name: {0}")]
    Duplicate(String),
}

/// Immutable lookup table of tools, built once at startup.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    /// Build a registry. Fails on a repeated name.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Result<Self, RegistryError> {
        let mut map = HashMap::with_capacity(tools.len());
        let mut order = Vec::with_capacity(tools.len());

        for tool in tools {
            let name = tool.name().to_string();
            if map.contains_key(&name) {
                return Err(RegistryError::Duplicate(name));
            }
            order.push(name.clone());
            map.insert(name, tool);
        }

        Ok(Self { tools: map, order })
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Catalogue entries in registration order.
    pub fn catalog(&self) -> Vec<ToolDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.descriptor())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Validate and build a plan the way the dispatcher does, rooted at `/work`.
#[cfg(test)]
pub(crate) fn build_plan(
    tools: &[Arc<dyn Tool>],
    name: &str,
    arguments: serde_json::Value,
) -> Result<CommandPlan, ToolError> {
    let tool = tools
        .iter()
        .find(|tool| tool.name() == name)
        .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
    let args = tool.validate(&arguments)?;
    tool.build(args, &BuildContext::new("/work"))
}
