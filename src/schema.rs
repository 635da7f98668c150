//! Field schemas for task input and structured output

use std::collections::BTreeMap;

use log::trace;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Error;

/// One string field of a flat record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec
{   pub name: String
  , pub description: String
  , /// Blank values are rejected
    pub non_empty: bool
}

impl FieldSpec
{   pub fn new(name: &str, description: &str) -> Self
    {   FieldSpec
        {   name: name.to_string()
          , description: description.to_string()
          , non_empty: true
        }
    }

    /// Field that must be present but may be blank
    pub fn allow_empty(mut self) -> Self
    {   self.non_empty = false;
        self
    }
}

/// Flat record of required string fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema
{   pub fields: Vec<FieldSpec>
}

impl Schema
{   pub fn new(fields: Vec<FieldSpec>) -> Self
    {   Schema { fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec>
    {   self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str>
    {   self.fields.iter().map(|f| f.name.as_str())
    }

    /// Check caller input; any problem is a `Validation` error
    pub fn validate_input(
      &self
    , input: &BTreeMap<String, String>
    ) -> Result<(), Error>
    {   if let Some(unknown) = input.keys()
          .find(|k| self.field(k).is_none())
        {   return Err(Error::Validation(
              format!("unexpected input field '{}'", unknown)
            ));
        }
        for field in &self.fields
        {   match input.get(&field.name)
            {   None => {
                  return Err(Error::Validation(
                    format!("missing input field '{}'", field.name)
                  ));
                }
              , Some(v) if field.non_empty && v.trim().is_empty() => {
                  return Err(Error::Validation(
                    format!("input field '{}' must not be empty", field.name)
                  ));
                }
              , Some(_) => {}
            }
        }
        Ok(())
    }

    /// Check a provider payload and keep only declared fields
    pub fn validate_output(
      &self
    , value: &Value
    ) -> Result<BTreeMap<String, String>, Error>
    {   let object = value.as_object()
          .ok_or_else(|| {
            Error::SchemaMismatch(
              format!("expected an object, got {}", kind_of(value))
            )
          })?;

        let mut fields = BTreeMap::new();
        for field in &self.fields
        {   let raw = object.get(&field.name)
              .ok_or_else(|| {
                Error::SchemaMismatch(
                  format!("missing field '{}'", field.name)
                )
              })?;
            let text = raw.as_str()
              .ok_or_else(|| {
                Error::SchemaMismatch(
                  format!(
                    "field '{}' should be a string, got {}",
                    field.name, kind_of(raw)
                  )
                )
              })?;
            if field.non_empty && text.trim().is_empty()
            {   return Err(Error::SchemaMismatch(
                  format!("field '{}' is empty", field.name)
                ));
            }
            fields.insert(field.name.clone(), text.to_string());
        }

        for dropped in object.keys()
          .filter(|k| self.field(k).is_none())
        {   trace!("Dropping undeclared output field '{}'", dropped);
        }
        Ok(fields)
    }

    /// OpenAPI-style object schema understood by the provider
    pub fn to_response_schema(&self) -> Value
    {   let properties: serde_json::Map<String, Value> = self.fields
          .iter()
          .map(|f| {
            (f.name.clone(), json!({
              "type": "STRING",
              "description": f.description,
            }))
          })
          .collect();
        json!({
          "type": "OBJECT",
          "properties": properties,
          "required": self.field_names().collect::<Vec<_>>(),
        })
    }
}

fn kind_of(value: &Value) -> &'static str
{   match value
    {   Value::Null => "null"
      , Value::Bool(_) => "boolean"
      , Value::Number(_) => "number"
      , Value::String(_) => "string"
      , Value::Array(_) => "array"
      , Value::Object(_) => "object"
    }
}
