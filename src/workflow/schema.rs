use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Boolean,
}

impl FieldKind {
    fn label(self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
            FieldKind::Boolean => "boolean",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Boolean => value.is_boolean(),
        }
    }

    // A producer kind satisfies a consumer kind when values of the former are
    // always valid values of the latter.
    fn satisfies(self, consumer: FieldKind) -> bool {
        self == consumer || (self == FieldKind::Integer && consumer == FieldKind::Number)
    }
}

fn value_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(Field {
            name: name.into(),
            kind,
        });
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        let object = value.as_object().ok_or(SchemaError::NotAnObject)?;
        for field in &self.fields {
            let found = object
                .get(&field.name)
                .ok_or_else(|| SchemaError::MissingField(field.name.clone()))?;
            if !field.kind.matches(found) {
                return Err(SchemaError::KindMismatch {
                    field: field.name.clone(),
                    expected: field.kind.label(),
                    found: value_label(found),
                });
            }
        }
        Ok(())
    }

    // Checks that every field this schema requires is produced by `producer`
    // with a compatible kind.
    pub fn accepts(&self, producer: &Schema) -> Result<(), SchemaError> {
        for field in &self.fields {
            let produced = producer
                .fields
                .iter()
                .find(|f| f.name == field.name)
                .ok_or_else(|| SchemaError::MissingField(field.name.clone()))?;
            if !produced.kind.satisfies(field.kind) {
                return Err(SchemaError::KindMismatch {
                    field: field.name.clone(),
                    expected: field.kind.label(),
                    found: produced.kind.label(),
                });
            }
        }
        Ok(())
    }
}
