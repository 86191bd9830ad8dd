//! Structured YAML documents.
//!
//! Generated playbooks and inventory files are built as an ordered [`Yaml`]
//! tree and written by [`to_document`]. Builders never format YAML text
//! themselves, so caller supplied values can never change the document
//! structure. Caller strings that look like Jinja are tagged `!unsafe` so
//! Ansible passes them through untemplated; expressions the builders write
//! themselves use [`Yaml::Template`].

use serde_json::{Map, Value};
use serde_yaml::value::{Tag, TaggedValue};

use crate::ToolError;

/// A YAML node.
#[derive(Debug, Clone, PartialEq)]
pub enum Yaml {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A Jinja expression Ansible should evaluate.
    Template(String),
    Seq(Vec<Yaml>),
    Map(Mapping),
}

impl Yaml {
    pub fn template(expression: impl Into<String>) -> Self {
        Yaml::Template(expression.into())
    }

    /// Whether this is an empty sequence or mapping.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Yaml::Seq(items) => items.is_empty(),
            Yaml::Map(map) => map.is_empty(),
            _ => false,
        }
    }
}

/// An insertion-ordered mapping with string keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(String, Yaml)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Yaml>) -> Self {
        self.push(key, value);
        self
    }

    /// Append an entry unless the value is absent or an empty collection.
    pub fn with_opt<T: Into<Yaml>>(mut self, key: impl Into<String>, value: Option<T>) -> Self {
        self.push_opt(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<Yaml>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn push_opt<T: Into<Yaml>>(&mut self, key: impl Into<String>, value: Option<T>) {
        if let Some(value) = value {
            let value = value.into();
            if !value.is_empty_collection() {
                self.entries.push((key.into(), value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Yaml> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Yaml)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<&str> for Yaml {
    fn from(s: &str) -> Self {
        Yaml::Str(s.to_string())
    }
}

impl From<String> for Yaml {
    fn from(s: String) -> Self {
        Yaml::Str(s)
    }
}

impl From<&String> for Yaml {
    fn from(s: &String) -> Self {
        Yaml::Str(s.clone())
    }
}

impl From<bool> for Yaml {
    fn from(b: bool) -> Self {
        Yaml::Bool(b)
    }
}

impl From<i64> for Yaml {
    fn from(n: i64) -> Self {
        Yaml::Int(n)
    }
}

impl From<u32> for Yaml {
    fn from(n: u32) -> Self {
        Yaml::Int(i64::from(n))
    }
}

impl From<f64> for Yaml {
    fn from(f: f64) -> Self {
        Yaml::Float(f)
    }
}

impl From<Mapping> for Yaml {
    fn from(map: Mapping) -> Self {
        Yaml::Map(map)
    }
}

impl<T: Into<Yaml>> From<Vec<T>> for Yaml {
    fn from(items: Vec<T>) -> Self {
        Yaml::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl From<Value> for Yaml {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Yaml::Null,
            Value::Bool(b) => Yaml::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Yaml::Int(i),
                None => Yaml::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Yaml::Str(s),
            Value::Array(items) => items.into(),
            Value::Object(map) => map.into(),
        }
    }
}

impl From<Map<String, Value>> for Yaml {
    fn from(map: Map<String, Value>) -> Self {
        let mut mapping = Mapping::new();
        for (key, value) in map {
            mapping.push(key, value);
        }
        Yaml::Map(mapping)
    }
}

impl From<&Yaml> for serde_yaml::Value {
    fn from(node: &Yaml) -> Self {
        match node {
            Yaml::Null => serde_yaml::Value::Null,
            Yaml::Bool(b) => serde_yaml::Value::Bool(*b),
            Yaml::Int(n) => serde_yaml::Value::Number((*n).into()),
            Yaml::Float(f) => serde_yaml::Value::Number((*f).into()),
            Yaml::Str(s) if has_template_markers(s) => {
                serde_yaml::Value::Tagged(Box::new(TaggedValue {
                    tag: Tag::new("unsafe"),
                    value: serde_yaml::Value::String(s.clone()),
                }))
            }
            Yaml::Str(s) | Yaml::Template(s) => serde_yaml::Value::String(s.clone()),
            Yaml::Seq(items) => serde_yaml::Value::Sequence(items.iter().map(Into::into).collect()),
            Yaml::Map(map) => serde_yaml::Value::Mapping(
                map.iter()
                    .map(|(key, value)| (serde_yaml::Value::String(key.to_string()), value.into()))
                    .collect(),
            ),
        }
    }
}

fn has_template_markers(s: &str) -> bool {
    ["{{", "{%", "{#"].iter().any(|marker| s.contains(marker))
}

/// Render a node as a complete YAML document.
pub fn to_document(root: &Yaml) -> Result<String, ToolError> {
    let body = serde_yaml::to_string(&serde_yaml::Value::from(root))
        .map_err(|e| ToolError::internal(format!("Failed to render YAML document: {}", e)))?;
    Ok(format!("---\n{}", body))
}
