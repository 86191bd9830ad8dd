//! Parameter schemas and argument validation.
//!
//! A [`ParamSchema`] describes the fields a tool accepts. Validation checks
//! every field in one pass and reports all problems together, fills in
//! declared defaults, coerces loosely typed scalars and drops unknown fields.
//! The same schema renders the JSON Schema advertised in the tool catalogue.

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::ToolError;

/// Type of a schema field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A string, optionally with a minimum length in characters.
    String { min_len: usize },
    /// A boolean. `"true"`/`"false"` strings are coerced.
    Boolean,
    /// An integer. Integer-valued floats and numeric strings are coerced.
    Integer { minimum: Option<i64> },
    /// A JSON object with arbitrary content.
    Object,
    /// An array whose items all have the given kind.
    Array(Box<FieldKind>),
    /// A single string or an array of strings.
    StringOrArray,
    /// Anything.
    Any,
}

impl FieldKind {
    fn check(&self, value: &Value) -> Result<Value, String> {
        match self {
            FieldKind::String { min_len } => {
                let s = value.as_str().ok_or("expected a string")?;
                if s.chars().count() < *min_len {
                    if *min_len == 1 {
                        return Err("must not be empty".to_string());
                    }
                    return Err(format!("must be at least {} characters", min_len));
                }
                Ok(value.clone())
            }
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                Value::String(s) if s == "true" => Ok(Value::Bool(true)),
                Value::String(s) if s == "false" => Ok(Value::Bool(false)),
                _ => Err("expected a boolean".to_string()),
            },
            FieldKind::Integer { minimum } => {
                let n = match value {
                    Value::Number(n) => n
                        .as_i64()
                        .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    _ => None,
                }
                .ok_or("expected an integer")?;
                if let Some(min) = minimum {
                    if n < *min {
                        return Err(format!("must be at least {}", min));
                    }
                }
                Ok(Value::from(n))
            }
            FieldKind::Object => {
                if value.is_object() {
                    Ok(value.clone())
                } else {
                    Err("expected an object".to_string())
                }
            }
            FieldKind::Array(item) => {
                let items = value.as_array().ok_or("expected an array")?;
                let mut coerced = Vec::with_capacity(items.len());
                for (index, entry) in items.iter().enumerate() {
                    let entry = item
                        .check(entry)
                        .map_err(|message| format!("item {}: {}", index, message))?;
                    coerced.push(entry);
                }
                Ok(Value::Array(coerced))
            }
            FieldKind::StringOrArray => match value {
                Value::String(_) => Ok(value.clone()),
                Value::Array(items) if items.iter().all(Value::is_string) => Ok(value.clone()),
                _ => Err("expected a string or an array of strings".to_string()),
            },
            FieldKind::Any => Ok(value.clone()),
        }
    }

    fn json_schema(&self) -> Value {
        match self {
            FieldKind::String { min_len } if *min_len > 0 => {
                json!({ "type": "string", "minLength": min_len })
            }
            FieldKind::String { .. } => json!({ "type": "string" }),
            FieldKind::Boolean => json!({ "type": "boolean" }),
            FieldKind::Integer { minimum: Some(min) } => json!({ "type": "integer", "minimum": min }),
            FieldKind::Integer { minimum: None } => json!({ "type": "integer" }),
            FieldKind::Object => json!({ "type": "object" }),
            FieldKind::Array(item) => json!({ "type": "array", "items": item.json_schema() }),
            FieldKind::StringOrArray => json!({
                "anyOf": [
                    { "type": "string" },
                    { "type": "array", "items": { "type": "string" } }
                ]
            }),
            FieldKind::Any => json!({}),
        }
    }
}

/// One field of a parameter schema.
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    kind: FieldKind,
    required: bool,
    default: Option<Value>,
    allowed: Option<&'static [&'static str]>,
    description: Option<String>,
}

impl Field {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            allowed: None,
            description: None,
        }
    }

    /// A string field.
    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String { min_len: 0 })
    }

    /// A string field that rejects the empty string.
    pub fn non_empty(name: &'static str) -> Self {
        Self::new(name, FieldKind::String { min_len: 1 })
    }

    /// A boolean field.
    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    /// An integer field.
    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer { minimum: None })
    }

    /// An object field.
    pub fn object(name: &'static str) -> Self {
        Self::new(name, FieldKind::Object)
    }

    /// An array of strings.
    pub fn strings(name: &'static str) -> Self {
        Self::new(name, FieldKind::Array(Box::new(FieldKind::String { min_len: 0 })))
    }

    /// An array of objects.
    pub fn objects(name: &'static str) -> Self {
        Self::new(name, FieldKind::Array(Box::new(FieldKind::Object)))
    }

    /// A string or an array of strings.
    pub fn string_or_array(name: &'static str) -> Self {
        Self::new(name, FieldKind::StringOrArray)
    }

    /// A field accepting any JSON value.
    pub fn any(name: &'static str) -> Self {
        Self::new(name, FieldKind::Any)
    }

    /// The required `action` selector of a multi-action tool.
    ///
    /// Values are checked by the builder, which reports unknown ones as an
    /// unsupported action rather than a validation failure.
    pub fn action(actions: &[&str]) -> Self {
        Self::non_empty("action")
            .required()
            .describe(format!("Action to perform: {}", actions.join(", ")))
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value used when the field is absent.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Restrict a string field to an enumerated set.
    pub fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }

    /// Lower bound for an integer field.
    pub fn min(mut self, minimum: i64) -> Self {
        if let FieldKind::Integer { .. } = self.kind {
            self.kind = FieldKind::Integer {
                minimum: Some(minimum),
            };
        }
        self
    }

    /// Set the description shown in the catalogue.
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn check(&self, value: &Value) -> Result<Value, String> {
        let value = self.kind.check(value)?;
        if let (Some(allowed), Some(s)) = (self.allowed, value.as_str()) {
            if !allowed.contains(&s) {
                return Err(format!(
                    "invalid value '{}', expected one of: {}",
                    s,
                    allowed.join(", ")
                ));
            }
        }
        Ok(value)
    }

    fn json_schema(&self) -> Value {
        let mut schema = self.kind.json_schema();
        if let Value::Object(ref mut map) = schema {
            if let Some(allowed) = self.allowed {
                map.insert("enum".to_string(), json!(allowed));
            }
            if let Some(ref default) = self.default {
                map.insert("default".to_string(), default.clone());
            }
            if let Some(ref description) = self.description {
                map.insert("description".to_string(), json!(description));
            }
        }
        schema
    }
}

/// A problem with one field of a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Field name
    pub field: String,
    /// What is wrong with it
    pub message: String,
}

impl FieldIssue {
    /// Create a new issue.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Join issues into one line.
pub(crate) fn describe_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The accepted fields of one tool.
#[derive(Debug, Clone, Default)]
pub struct ParamSchema {
    fields: Vec<Field>,
}

impl ParamSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Validate and normalise a raw payload.
    ///
    /// `null` values count as absent. Every offending field is reported.
    pub fn validate(&self, raw: &Value) -> Result<ValidatedArgs, ToolError> {
        let empty = Map::new();
        let input = match raw {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                return Err(ToolError::validation(vec![FieldIssue::new(
                    "arguments",
                    "expected an object",
                )]))
            }
        };

        let mut normalized = Map::new();
        let mut issues = Vec::new();

        for field in &self.fields {
            match input.get(field.name).filter(|v| !v.is_null()) {
                Some(value) => match field.check(value) {
                    Ok(value) => {
                        normalized.insert(field.name.to_string(), value);
                    }
                    Err(message) => issues.push(FieldIssue::new(field.name, message)),
                },
                None => {
                    if let Some(ref default) = field.default {
                        normalized.insert(field.name.to_string(), default.clone());
                    } else if field.required {
                        issues.push(FieldIssue::new(field.name, "is required"));
                    }
                }
            }
        }

        if issues.is_empty() {
            Ok(ValidatedArgs { values: normalized })
        } else {
            Err(ToolError::validation(issues))
        }
    }

    /// Render the schema as JSON Schema.
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| (field.name.to_string(), field.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|field| field.required)
            .map(|field| field.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    }
}

/// A payload that passed validation, with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedArgs {
    values: Map<String, Value>,
}

impl ValidatedArgs {
    /// Get a normalised value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Coerce into the tool's typed options record.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(self.values))
            .map_err(|e| ToolError::validation(vec![FieldIssue::new("arguments", e.to_string())]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn playbook_schema() -> ParamSchema {
        ParamSchema::new()
            .field(Field::non_empty("playbook").required().describe("Playbook path"))
            .field(Field::string("inventory"))
            .field(Field::boolean("become").default(false))
            .field(Field::integer("forks").min(1))
            .field(Field::string("mode").one_of(&["check", "run"]))
            .field(Field::strings("tags"))
    }

    fn issue_fields(err: ToolError) -> Vec<String> {
        match err {
            ToolError::Validation(issues) => issues.into_iter().map(|i| i.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_reports_every_invalid_field() {
        let schema = playbook_schema();
        let err = schema
            .validate(&json!({ "inventory": 7, "forks": 0, "mode": "yolo" }))
            .unwrap_err();
        let fields = issue_fields(err);
        assert_eq!(fields, vec!["playbook", "inventory", "forks", "mode"]);
    }

    #[test]
    fn test_defaults_are_filled_in() {
        let args = playbook_schema()
            .validate(&json!({ "playbook": "site.yml" }))
            .unwrap();
        assert_eq!(args.get("become"), Some(&json!(false)));
        assert!(args.get("inventory").is_none());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let args = playbook_schema()
            .validate(&json!({ "playbook": "site.yml", "colour": "blue" }))
            .unwrap();
        assert!(args.get("colour").is_none());
    }

    #[test]
    fn test_empty_string_rejected_for_min_length() {
        let err = playbook_schema().validate(&json!({ "playbook": "" })).unwrap_err();
        assert!(err.to_string().contains("playbook: must not be empty"));
    }

    #[test]
    fn test_null_counts_as_absent() {
        let err = playbook_schema()
            .validate(&json!({ "playbook": null }))
            .unwrap_err();
        assert!(err.to_string().contains("playbook: is required"));

        let args = playbook_schema()
            .validate(&json!({ "playbook": "a.yml", "become": null }))
            .unwrap();
        assert_eq!(args.get("become"), Some(&json!(false)));
    }

    #[test]
    fn test_scalar_coercion() {
        let args = playbook_schema()
            .validate(&json!({ "playbook": "a.yml", "become": "true", "forks": "5" }))
            .unwrap();
        assert_eq!(args.get("become"), Some(&json!(true)));
        assert_eq!(args.get("forks"), Some(&json!(5)));

        let args = playbook_schema()
            .validate(&json!({ "playbook": "a.yml", "forks": 3.0 }))
            .unwrap();
        assert_eq!(args.get("forks"), Some(&json!(3)));
    }

    #[test]
    fn test_array_items_are_checked() {
        let err = playbook_schema()
            .validate(&json!({ "playbook": "a.yml", "tags": ["web", 3] }))
            .unwrap_err();
        assert!(err.to_string().contains("tags: item 1: expected a string"));
    }

    #[test]
    fn test_non_object_payload() {
        let err = playbook_schema().validate(&json!(["site.yml"])).unwrap_err();
        assert_eq!(issue_fields(err), vec!["arguments"]);
    }

    #[test]
    fn test_missing_payload_is_empty_object() {
        let schema = ParamSchema::new().field(Field::string("inventory"));
        assert!(schema.validate(&Value::Null).is_ok());
    }

    #[test]
    fn test_into_typed() {
        #[derive(Deserialize)]
        struct Options {
            playbook: String,
            r#become: bool,
            forks: Option<i64>,
        }

        let options: Options = playbook_schema()
            .validate(&json!({ "playbook": "site.yml", "forks": 10 }))
            .unwrap()
            .into_typed()
            .unwrap();
        assert_eq!(options.playbook, "site.yml");
        assert!(!options.r#become);
        assert_eq!(options.forks, Some(10));
    }

    #[test]
    fn test_json_schema_rendering() {
        let schema = playbook_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["playbook"]));
        assert_eq!(schema["properties"]["playbook"]["minLength"], 1);
        assert_eq!(schema["properties"]["playbook"]["description"], "Playbook path");
        assert_eq!(schema["properties"]["become"]["default"], false);
        assert_eq!(schema["properties"]["mode"]["enum"], json!(["check", "run"]));
        assert_eq!(schema["properties"]["forks"]["minimum"], 1);
        assert_eq!(schema["properties"]["tags"]["items"]["type"], "string");
    }
}
