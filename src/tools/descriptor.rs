//! Tool descriptors: name, description, and parameter schema.

use crate::error::{ManabuError, Result};
use serde_json::{json, Map, Value};

/// Parameter types a tool schema may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Integer,
    String,
    Boolean,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::Integer => "integer",
            ParamType::String => "string",
            ParamType::Boolean => "boolean",
            ParamType::Object => "object",
        }
    }

    fn from_schema_str(s: &str) -> Self {
        match s {
            "integer" => ParamType::Integer,
            "boolean" => ParamType::Boolean,
            "object" => ParamType::Object,
            _ => ParamType::String,
        }
    }

    /// Whether a JSON value is compatible with this parameter type.
    fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::String => value.is_string(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Object => value.is_object(),
        }
    }
}

/// Schema entry for one tool parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
}

/// Immutable description of one callable tool.
///
/// Parameters keep their declaration order; the catalog order is echoed
/// verbatim into model prompts, so it must be deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Vec<(String, ParamSpec)>,
}

impl ToolDescriptor {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: Vec::new(),
        }
    }

    /// Append a parameter to the schema (builder style).
    pub fn with_param(
        mut self,
        name: &str,
        param_type: ParamType,
        description: &str,
        required: bool,
    ) -> Self {
        self.parameters.push((
            name.to_string(),
            ParamSpec {
                param_type,
                description: description.to_string(),
                required,
            },
        ));
        self
    }

    /// Check that `arguments` satisfy this schema: required parameters are
    /// present, and every recognized parameter carries a compatible type.
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<()> {
        for (name, spec) in &self.parameters {
            match arguments.get(name) {
                Some(value) => {
                    if !spec.param_type.matches(value) {
                        return Err(ManabuError::InvalidArguments(format!(
                            "'{}' must be of type {}",
                            name,
                            spec.param_type.as_str()
                        )));
                    }
                }
                None if spec.required => {
                    return Err(ManabuError::InvalidArguments(format!(
                        "missing required parameter '{}'",
                        name
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Render the parameter schema as a JSON-schema object (the shape both
    /// the OpenAI tools API and MCP expect).
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, spec) in &self.parameters {
            properties.insert(
                name.clone(),
                json!({
                    "type": spec.param_type.as_str(),
                    "description": spec.description,
                }),
            );
            if spec.required {
                required.push(Value::String(name.clone()));
            }
        }
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Rebuild a descriptor from a JSON-schema object, as received from a
    /// remote tool host's tools/list. Parameters keep the order the schema
    /// declared them in (serde_json is built with preserve_order).
    pub fn from_input_schema(name: &str, description: &str, schema: &Value) -> Self {
        let required: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut descriptor = ToolDescriptor::new(name, description);
        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (param, meta) in properties {
                let param_type = meta
                    .get("type")
                    .and_then(Value::as_str)
                    .map(ParamType::from_schema_str)
                    .unwrap_or(ParamType::String);
                let param_description = meta
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                descriptor = descriptor.with_param(
                    param,
                    param_type,
                    param_description,
                    required.contains(&param.as_str()),
                );
            }
        }
        descriptor
    }
}
