//! # Action Parameter Schemas
//!
//! Each action declares the arguments it accepts as a list of typed fields.
//! The declaration is rendered to a JSON schema object once, when the action
//! is constructed, and that object is what the model sees as the tool's
//! `parameters`. The schema is advisory: the model uses it to shape its
//! arguments, the handler is what actually reads them.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// JSON type of a declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }
}

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    /// Default shown to the model for optional parameters
    pub default: Option<Value>,
}

impl ParameterSpec {
    /// A required parameter
    pub fn required(name: impl Into<String>, param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
            default: None,
        }
    }

    /// An optional parameter
    pub fn optional(name: impl Into<String>, param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: false,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn to_property(&self) -> Value {
        let mut prop = Map::new();
        prop.insert("type".into(), json!(self.param_type.as_str()));
        if !self.description.is_empty() {
            prop.insert("description".into(), json!(self.description));
        }
        if self.param_type == ParamType::Array {
            prop.insert("items".into(), json!({}));
        }
        if let Some(default) = &self.default {
            prop.insert("default".into(), default.clone());
        }
        Value::Object(prop)
    }
}

/// The full argument declaration of an action
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub params: Vec<ParameterSpec>,
}

impl ParameterSchema {
    /// A schema accepting no arguments
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(params: Vec<ParameterSpec>) -> Self {
        Self { params }
    }

    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Names of the required parameters, in declaration order
    pub fn required_names(&self) -> Vec<&str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Render the declaration as a JSON schema object.
    ///
    /// Fails when a parameter name is empty or declared twice.
    pub fn to_json_schema(&self) -> Result<Value> {
        let mut seen = HashSet::new();
        let mut properties = Map::new();

        for spec in &self.params {
            if spec.name.trim().is_empty() {
                return Err(Error::config_invalid("parameter name must not be empty")
                    .with_operation("schema::to_json_schema"));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(Error::config_invalid(format!(
                    "parameter '{}' declared more than once",
                    spec.name
                ))
                .with_operation("schema::to_json_schema")
                .with_context("parameter", spec.name.clone()));
            }
            properties.insert(spec.name.clone(), spec.to_property());
        }

        Ok(json!({
            "type": "object",
            "properties": properties,
            "required": self.required_names(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_empty_schema() {
        let schema = ParameterSchema::empty().to_json_schema().unwrap();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"], json!({}));
        assert_eq!(schema["required"], json!([]));
    }

    #[test]
    fn test_required_and_optional() {
        let schema = ParameterSchema::empty()
            .param(ParameterSpec::required("path", ParamType::String, "Path to the file"))
            .param(
                ParameterSpec::optional("how", ParamType::String, "Join type")
                    .with_default(json!("inner")),
            )
            .to_json_schema()
            .unwrap();

        assert_eq!(schema["properties"]["path"]["type"], "string");
        assert_eq!(schema["properties"]["path"]["description"], "Path to the file");
        assert_eq!(schema["properties"]["how"]["default"], "inner");
        assert_eq!(schema["required"], json!(["path"]));
    }

    #[test]
    fn test_array_has_items() {
        let schema = ParameterSchema::new(vec![ParameterSpec::optional(
            "args",
            ParamType::Array,
            "Positional arguments",
        )])
        .to_json_schema()
        .unwrap();

        assert!(schema["properties"]["args"]["items"].is_object());
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let result = ParameterSchema::empty()
            .param(ParameterSpec::required("alias", ParamType::String, ""))
            .param(ParameterSpec::required("alias", ParamType::String, ""))
            .to_json_schema();

        assert!(result.is_err_and(|e| e.kind() == ErrorKind::ConfigInvalid));
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = ParameterSchema::new(vec![ParameterSpec::required(" ", ParamType::String, "")])
            .to_json_schema();
        assert!(result.is_err());
    }
}
