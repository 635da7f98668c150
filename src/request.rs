//! Request and result types for generation

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::task::TaskKind;

/// Which path produced an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin
{   /// Validated completion payload
    Model
  , /// Static task fallback after exhausting attempts
    Fallback
}

/// Validated output record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output
{   pub fields: BTreeMap<String, String>
  , pub origin: Origin
}

impl Output
{   pub fn new(
      fields: BTreeMap<String, String>
    , origin: Origin
    ) -> Self
    {   Output { fields, origin }
    }

    pub fn get(&self, field: &str) -> Option<&str>
    {   self.fields.get(field).map(String::as_str)
    }

    pub fn is_fallback(&self) -> bool
    {   self.origin == Origin::Fallback
    }
}

/// One generation invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest
{   pub task: TaskKind
  , pub input: BTreeMap<String, String>
}

impl GenerationRequest
{   pub fn new(
      task: TaskKind
    , input: BTreeMap<String, String>
    ) -> Self
    {   GenerationRequest { task, input }
    }

    /// Request whose only input is the description
    pub fn describe(task: TaskKind, description: &str) -> Self
    {   GenerationRequest
        {   task
          , input: BTreeMap::from([
              ("description".to_string(), description.to_string())
            ])
        }
    }
}

/// Outcome of a generation once input validation passed
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult
{   Success
    {   output: Output
      , attempts: usize
    }
  , /// Only reachable with fallback disabled
    Failure
    {   reason: Error
      , attempts: usize
    }
}

impl GenerationResult
{   pub fn output(&self) -> Option<&Output>
    {   match self
        {   GenerationResult::Success { output, .. } => Some(output)
          , GenerationResult::Failure { .. } => None
        }
    }

    pub fn into_output(self) -> Option<Output>
    {   match self
        {   GenerationResult::Success { output, .. } => Some(output)
          , GenerationResult::Failure { .. } => None
        }
    }

    pub fn attempts(&self) -> usize
    {   match self
        {   GenerationResult::Success { attempts, .. }
          | GenerationResult::Failure { attempts, .. } => *attempts
        }
    }
}
