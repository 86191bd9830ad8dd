//! Command plans: the data-only output of a tool builder.

use std::path::{Path, PathBuf};

use crate::shell;
use crate::ToolError;

/// One argv element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// A value passed through as is.
    Literal(String),
    /// A workspace file, resolved to its absolute path once materialised.
    /// The prefix is prepended, as in `-var-file=<path>`.
    WorkspaceFile { prefix: String, name: String },
}

impl Arg {
    /// Reference a workspace file as a standalone argument.
    pub fn file(name: impl Into<String>) -> Self {
        Arg::WorkspaceFile {
            prefix: String::new(),
            name: name.into(),
        }
    }

    /// Reference a workspace file glued to a flag.
    pub fn file_with_prefix(prefix: impl Into<String>, name: impl Into<String>) -> Self {
        Arg::WorkspaceFile {
            prefix: prefix.into(),
            name: name.into(),
        }
    }

    fn resolve(&self, workspace: Option<&Path>) -> Result<String, ToolError> {
        match self {
            Arg::Literal(value) => Ok(value.clone()),
            Arg::WorkspaceFile { prefix, name } => {
                let dir = workspace.ok_or_else(|| {
                    ToolError::internal(format!("{} referenced without a workspace", name))
                })?;
                Ok(format!("{}{}", prefix, dir.join(name).display()))
            }
        }
    }

    fn render(&self) -> String {
        match self {
            Arg::Literal(value) => value.clone(),
            Arg::WorkspaceFile { prefix, name } => format!("{}{}", prefix, name),
        }
    }
}

impl From<&str> for Arg {
    fn from(s: &str) -> Self {
        Arg::Literal(s.to_string())
    }
}

impl From<String> for Arg {
    fn from(s: String) -> Self {
        Arg::Literal(s)
    }
}

/// An optional string, with `""` treated as absent.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// One child process to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<Arg>,
    /// Written to the child's standard input, then closed.
    pub stdin: Option<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `flag value` when the value is present and not empty.
    pub fn flag_value(mut self, flag: &str, value: Option<&str>) -> Self {
        if let Some(value) = non_empty(value) {
            self.args.push(flag.into());
            self.args.push(value.into());
        }
        self
    }

    /// Append `flag` when the condition holds.
    pub fn flag_if(mut self, flag: &str, condition: bool) -> Self {
        if condition {
            self.args.push(flag.into());
        }
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Resolve the argv against the call's workspace.
    pub fn resolve_args(&self, workspace: Option<&Path>) -> Result<Vec<String>, ToolError> {
        self.args.iter().map(|arg| arg.resolve(workspace)).collect()
    }

    /// Shell-quoted rendering, with workspace files shown by name.
    pub fn command_line(&self) -> String {
        shell::join(
            std::iter::once(self.program.clone()).chain(self.args.iter().map(Arg::render)),
        )
    }
}

/// Where the plan's processes run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkingDir {
    /// The server's working directory.
    Inherit,
    /// A directory named by the caller.
    Caller(PathBuf),
    /// A fresh temporary directory.
    Workspace,
}

/// Checks made before anything is spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// A caller-referenced path must exist. `what` names it in the message.
    PathExists { what: String, path: PathBuf },
    /// Cloud credentials must be usable.
    AwsCredentials,
}

impl Precondition {
    pub fn path_exists(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Precondition::PathExists {
            what: what.into(),
            path: path.into(),
        }
    }
}

/// A section of a multi-step report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportSection {
    /// The content of a staged file.
    File { title: String, name: String },
    /// The standard output of a step.
    Step { title: String, index: usize },
}

/// How captured output becomes the result text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputStyle {
    /// Last step's stdout, or the fallback when it is blank.
    Text { empty: String },
    /// Pretty-printed when stdout parses as JSON, fallback when blank.
    Json { empty: String },
    /// Last step's stdout with surrounding whitespace removed.
    Trimmed,
    /// Titled sections separated by blank lines.
    Report { sections: Vec<ReportSection> },
}

impl OutputStyle {
    pub fn text(empty: impl Into<String>) -> Self {
        OutputStyle::Text {
            empty: empty.into(),
        }
    }

    pub fn json(empty: impl Into<String>) -> Self {
        OutputStyle::Json {
            empty: empty.into(),
        }
    }
}

/// Everything needed to run one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    /// Stable label, e.g. `s3-create_bucket`.
    pub operation: String,
    pub steps: Vec<Invocation>,
    /// Auxiliary files, materialised in order before the first step.
    pub files: Vec<(String, String)>,
    pub working_dir: WorkingDir,
    pub preconditions: Vec<Precondition>,
    pub output: OutputStyle,
}

impl CommandPlan {
    /// A single-step plan in the server's working directory.
    pub fn new(operation: impl Into<String>, step: Invocation) -> Self {
        let operation = operation.into();
        let output = OutputStyle::text(format!("{} completed successfully (no output).", operation));
        Self {
            operation,
            steps: vec![step],
            files: Vec::new(),
            working_dir: WorkingDir::Inherit,
            preconditions: Vec::new(),
            output,
        }
    }

    /// Append a step.
    pub fn then(mut self, step: Invocation) -> Self {
        self.steps.push(step);
        self
    }

    /// Declare an auxiliary file.
    pub fn file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.push((name.into(), content.into()));
        self
    }

    pub fn working_dir(mut self, working_dir: WorkingDir) -> Self {
        self.working_dir = working_dir;
        self
    }

    pub fn require(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    pub fn output(mut self, output: OutputStyle) -> Self {
        self.output = output;
        self
    }

    /// Whether running the plan needs a temporary workspace.
    pub fn needs_workspace(&self) -> bool {
        !self.files.is_empty() || self.working_dir == WorkingDir::Workspace
    }

    /// Shell-quoted rendering of each step.
    pub fn command_lines(&self) -> Vec<String> {
        self.steps.iter().map(Invocation::command_line).collect()
    }

    /// Content of a declared file.
    pub fn file_content(&self, name: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, content)| content.as_str())
    }

    /// Turn the captured stdout of each step into the result text.
    pub fn render_output(&self, stdouts: &[String]) -> String {
        let last = stdouts.last().map(String::as_str).unwrap_or("");
        match &self.output {
            OutputStyle::Text { empty } => {
                if last.trim().is_empty() {
                    empty.clone()
                } else {
                    last.to_string()
                }
            }
            OutputStyle::Json { empty } => {
                let trimmed = last.trim();
                if trimmed.is_empty() {
                    return empty.clone();
                }
                serde_json::from_str::<serde_json::Value>(trimmed)
                    .ok()
                    .and_then(|value| serde_json::to_string_pretty(&value).ok())
                    .unwrap_or_else(|| last.to_string())
            }
            OutputStyle::Trimmed => last.trim().to_string(),
            OutputStyle::Report { sections } => sections
                .iter()
                .map(|section| match section {
                    ReportSection::File { title, name } => {
                        format!("{}:\n{}", title, self.file_content(name).unwrap_or(""))
                    }
                    ReportSection::Step { title, index } => format!(
                        "{}:\n{}",
                        title,
                        stdouts.get(*index).map(String::as_str).unwrap_or("")
                    ),
                })
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

/// Compact JSON for an argv value.
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string(value).map_err(|e| ToolError::internal(format!("JSON encoding failed: {}", e)))
}
