//! The closed set of names generated source may reference

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::node::Value;

/// Native hook body. Receives evaluated arguments.
pub type HookFn = fn(&[Value]) -> Result<Value, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveCategory
{   Layout
  , Form
  , Display
  , Icon
  , Intrinsic
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveSpec
{   pub category: PrimitiveCategory
  , /// Void primitives reject children
    pub accepts_children: bool
}

impl PrimitiveSpec
{   pub fn container(category: PrimitiveCategory) -> Self
    {   PrimitiveSpec { category, accepts_children: true }
    }

    pub fn void(category: PrimitiveCategory) -> Self
    {   PrimitiveSpec { category, accepts_children: false }
    }
}

#[derive(Debug, Clone)]
pub enum Binding
{   Element(PrimitiveSpec)
  , Hook(HookFn)
  , Value(Value)
}

/// Immutable once handed to a `Renderer`
#[derive(Debug, Clone, Default)]
pub struct Scope
{   bindings: BTreeMap<String, Binding>
}

impl Scope
{   pub fn empty() -> Self
    {   Scope::default()
    }

    pub fn with_element(
      mut self
    , name: &str
    , spec: PrimitiveSpec
    ) -> Self
    {   self.bindings.insert(name.to_string(), Binding::Element(spec));
        self
    }

    pub fn with_hook(mut self, name: &str, hook: HookFn) -> Self
    {   self.bindings.insert(name.to_string(), Binding::Hook(hook));
        self
    }

    pub fn with_value(mut self, name: &str, value: Value) -> Self
    {   self.bindings.insert(name.to_string(), Binding::Value(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Binding>
    {   self.bindings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool
    {   self.bindings.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str>
    {   self.bindings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize
    {   self.bindings.len()
    }

    pub fn is_empty(&self) -> bool
    {   self.bindings.is_empty()
    }

    /// Layout, form and display primitives, icons and hooks
    pub fn standard() -> Self
    {   use PrimitiveCategory::*;

        let mut scope = Scope::empty();
        for name in ["View", "Card", "Badge", "Label", "Text", "Button"]
        {   let category = match name
            {   "View" | "Card" => Layout
              , "Button" | "Label" => Form
              , _ => Display
            };
            scope = scope.with_element(name, PrimitiveSpec::container(category));
        }
        scope = scope
          .with_element("Input", PrimitiveSpec::void(Form))
          .with_element("Avatar", PrimitiveSpec::void(Display))
          .with_element("Progress", PrimitiveSpec::void(Display))
          .with_element("Image", PrimitiveSpec::void(Display))
          .with_element("Skeleton", PrimitiveSpec::void(Display));
        for name in INTRINSIC_CONTAINERS
        {   scope = scope.with_element(name, PrimitiveSpec::container(Intrinsic));
        }
        for name in ["img", "input", "br", "hr"]
        {   scope = scope.with_element(name, PrimitiveSpec::void(Intrinsic));
        }
        for name in ICONS
        {   scope = scope.with_element(name, PrimitiveSpec::void(Icon));
        }
        scope
          .with_hook("useState", use_state)
          .with_hook("useEffect", use_effect)
          .with_hook("useRef", use_ref)
          .with_hook("useMemo", use_memo)
    }
}

const INTRINSIC_CONTAINERS: [&str; 14] = [
  "div", "span", "p", "h1", "h2", "h3", "ul", "ol", "li",
  "section", "header", "footer", "nav", "form",
];

const ICONS: [&str; 20] = [
  "AlertTriangle", "Home", "User", "Settings", "Search", "Mail", "Lock",
  "Bell", "Heart", "Star", "Menu", "Plus", "Minus", "Check", "X",
  "ChevronRight", "ChevronLeft", "ShoppingCart", "Calendar", "Camera",
];

fn at_most(hook: &str, args: &[Value], max: usize) -> Result<(), String>
{   if args.len() > max
    {   return Err(format!(
          "{} expects at most {} argument(s), got {}",
          hook, max, args.len()
        ));
    }
    Ok(())
}

/// Snapshot render: state is its initial value, the setter is inert
fn use_state(args: &[Value]) -> Result<Value, String>
{   at_most("useState", args, 1)?;
    let initial = args.first().cloned().unwrap_or(Value::Null);
    Ok(Value::List(vec![initial, Value::Null]))
}

/// Effects never run in a preview snapshot
fn use_effect(_args: &[Value]) -> Result<Value, String>
{   Ok(Value::Null)
}

fn use_ref(args: &[Value]) -> Result<Value, String>
{   at_most("useRef", args, 1)?;
    Ok(args.first().cloned().unwrap_or(Value::Null))
}

fn use_memo(args: &[Value]) -> Result<Value, String>
{   at_most("useMemo", args, 2)?;
    args.first()
      .cloned()
      .ok_or_else(|| "useMemo expects a value".to_string())
}
