//! Values and the rendered element tree

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Runtime value inside generated source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value
{   Null
  , Bool(bool)
  , Number(f64)
  , Str(String)
  , List(Vec<Value>)
}

impl Value
{   /// Text a value contributes as a child; null and booleans render nothing
    pub fn to_text(&self) -> String
    {   match self
        {   Value::Null | Value::Bool(_) => String::new()
          , Value::Number(n) => {
              if n.fract() == 0.0 && n.abs() < 1e15
              {   format!("{}", *n as i64)
              } else
              {   n.to_string()
              }
            }
          , Value::Str(s) => s.clone()
          , Value::List(items) => items.iter()
              .map(Value::to_text)
              .collect()
        }
    }
}

/// Host-facing output of a compiled component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderNode
{   Element
    {   name: String
      , props: BTreeMap<String, Value>
      , children: Vec<RenderNode>
    }
  , Text
    {   text: String
    }
}

impl RenderNode
{   pub fn name(&self) -> Option<&str>
    {   match self
        {   RenderNode::Element { name, .. } => Some(name)
          , RenderNode::Text { .. } => None
        }
    }

    pub fn children(&self) -> &[RenderNode]
    {   match self
        {   RenderNode::Element { children, .. } => children
          , RenderNode::Text { .. } => &[]
        }
    }

    pub fn prop(&self, key: &str) -> Option<&Value>
    {   match self
        {   RenderNode::Element { props, .. } => props.get(key)
          , RenderNode::Text { .. } => None
        }
    }

    /// Number of nodes in this subtree
    pub fn len(&self) -> usize
    {   1 + self.children().iter().map(RenderNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool
    {   false
    }

    /// Depth-first search for elements named `name`
    pub fn find_all<'a>(&'a self, name: &str) -> Vec<&'a RenderNode>
    {   let mut found = Vec::new();
        self.collect(name, &mut found);
        found
    }

    fn collect<'a>(&'a self, name: &str, found: &mut Vec<&'a RenderNode>)
    {   if self.name() == Some(name)
        {   found.push(self);
        }
        for child in self.children()
        {   child.collect(name, found);
        }
    }

    /// Concatenated text of the subtree
    pub fn text_content(&self) -> String
    {   match self
        {   RenderNode::Text { text } => text.clone()
          , RenderNode::Element { children, .. } => children.iter()
              .map(RenderNode::text_content)
              .collect()
        }
    }

    /// Deterministic markup, stable across runs
    pub fn to_markup(&self) -> String
    {   let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String)
    {   match self
        {   RenderNode::Text { text } => out.push_str(&escape(text))
          , RenderNode::Element { name, props, children } => {
              out.push('<');
              out.push_str(name);
              for (key, value) in props
              {   match value
                  {   Value::Bool(true) => {
                        let _ = write!(out, " {}", key);
                      }
                    , other => {
                        let _ = write!(
                          out, " {}=\"{}\"", key, escape(&other.to_text())
                        );
                      }
                  }
              }
              if children.is_empty()
              {   out.push_str("/>");
                  return;
              }
              out.push('>');
              for child in children
              {   child.write_markup(out);
              }
              let _ = write!(out, "</{}>", name);
            }
        }
    }
}

fn escape(text: &str) -> String
{   text.replace('&', "&amp;")
      .replace('<', "&lt;")
      .replace('>', "&gt;")
      .replace('"', "&quot;")
}
