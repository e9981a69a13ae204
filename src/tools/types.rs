//! Parameter schema types shared by the model payload and the validator.

use serde_json::{json, Map, Value};

use crate::action::ActionKind;

/// Declared JSON type of a function argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
}

impl FieldType {
    pub fn json_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
        }
    }
}

/// One argument of a callable function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    /// Must be present in the call (possibly as `null` when nullable)
    pub required: bool,
    /// Accepts an explicit `null` meaning "unspecified"
    pub nullable: bool,
    /// Extraction hint for the model; never evaluated
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn required(name: &'static str, ty: FieldType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: true,
            nullable: false,
            description,
        }
    }

    pub const fn optional(name: &'static str, ty: FieldType, description: &'static str) -> Self {
        Self {
            name,
            ty,
            required: false,
            nullable: false,
            description,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    fn property(&self) -> Value {
        let ty = if self.nullable {
            json!([self.ty.json_name(), "null"])
        } else {
            json!(self.ty.json_name())
        };
        json!({
            "type": ty,
            "description": self.description,
        })
    }
}

/// Argument contract of one action kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSchema {
    pub kind: ActionKind,
    pub description: String,
    fields: Vec<FieldSpec>,
}

impl ParameterSchema {
    pub fn new(kind: ActionKind, description: impl Into<String>, fields: Vec<FieldSpec>) -> Self {
        Self {
            kind,
            description: description.into(),
            fields,
        }
    }

    pub fn function_name(&self) -> &'static str {
        self.kind.function_name()
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.required).map(|f| f.name)
    }

    /// JSON Schema object for the function's `parameters`
    pub fn parameters_json(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            properties.insert(field.name.to_string(), field.property());
        }
        let required: Vec<&str> = self.required_fields().collect();

        json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": false,
            "required": required,
        })
    }

    /// Callable-function definition in the chat-completions `tools` format
    pub fn function_definition(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.function_name(),
                "description": self.description,
                "parameters": self.parameters_json(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParameterSchema {
        ParameterSchema::new(
            ActionKind::Transfer,
            "sample",
            vec![
                FieldSpec::required("a", FieldType::String, "first"),
                FieldSpec::required("b", FieldType::Number, "second").nullable(),
                FieldSpec::optional("c", FieldType::Number, "third").nullable(),
            ],
        )
    }

    #[test]
    fn nullable_fields_render_type_union() {
        let params = sample().parameters_json();
        assert_eq!(params["properties"]["a"]["type"], "string");
        assert_eq!(params["properties"]["b"]["type"], json!(["number", "null"]));
        assert_eq!(params["additionalProperties"], false);
    }

    #[test]
    fn only_required_fields_listed() {
        let params = sample().parameters_json();
        assert_eq!(params["required"], json!(["a", "b"]));
    }

    #[test]
    fn definition_carries_function_name() {
        let def = sample().function_definition();
        assert_eq!(def["type"], "function");
        assert_eq!(def["function"]["name"], "transfer_tokens");
        assert_eq!(def["function"]["description"], "sample");
    }
}
