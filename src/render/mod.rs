//! Closed-scope compiler for generated component source
//!
//! Source is parsed into a small markup program, every name it uses is
//! resolved against a fixed [`Scope`], and one trial render is run. Nothing
//! outside the scope is reachable: there are no imports, no I/O and no
//! loops, and parse depth, node count and wall-clock time are bounded.
//! This keeps a misbehaving generation from taking the host down; it is
//! not a security boundary for attacker-controlled source.

pub mod node;
pub mod parse;
pub mod scope;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::config::RenderConfig;

pub use node::{RenderNode, Value};
pub use parse::Program;
pub use scope::{Binding, HookFn, PrimitiveCategory, PrimitiveSpec, Scope};

use parse::{AttrValue, Child, Element, Expr, Pattern, Statement};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileErrorKind
{   Syntax
    {   line: usize
      , column: usize
    }
  , /// Name not in scope, or used as the wrong kind of binding
    Reference
  , /// Well-formed but not allowed, e.g. children on a void primitive
    Structure
  , /// Size, depth, node or time limit exceeded
    Budget
  , /// A hook failed while rendering
    Runtime
  , /// Panic caught at the renderer boundary
    Internal
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError
{   pub kind: CompileErrorKind
  , pub message: String
}

impl CompileError
{   pub fn syntax(line: usize, column: usize, message: impl Into<String>) -> Self
    {   CompileError
        {   kind: CompileErrorKind::Syntax { line, column }
          , message: message.into()
        }
    }

    pub fn reference(message: impl Into<String>) -> Self
    {   CompileError { kind: CompileErrorKind::Reference, message: message.into() }
    }

    pub fn structure(message: impl Into<String>) -> Self
    {   CompileError { kind: CompileErrorKind::Structure, message: message.into() }
    }

    pub fn budget(message: impl Into<String>) -> Self
    {   CompileError { kind: CompileErrorKind::Budget, message: message.into() }
    }

    pub fn runtime(message: impl Into<String>) -> Self
    {   CompileError { kind: CompileErrorKind::Runtime, message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self
    {   CompileError { kind: CompileErrorKind::Internal, message: message.into() }
    }
}

impl fmt::Display for CompileError
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   match &self.kind
        {   CompileErrorKind::Syntax { line, column } => {
              write!(f, "SyntaxError at {}:{}: {}", line, column, self.message)
            }
          , CompileErrorKind::Reference => write!(f, "ReferenceError: {}", self.message)
          , CompileErrorKind::Structure => write!(f, "StructureError: {}", self.message)
          , CompileErrorKind::Budget => write!(f, "BudgetExceeded: {}", self.message)
          , CompileErrorKind::Runtime => write!(f, "RuntimeError: {}", self.message)
          , CompileErrorKind::Internal => write!(f, "InternalError: {}", self.message)
        }
    }
}

impl std::error::Error for CompileError {}

/// Result of compiling a non-failing source
#[derive(Debug, Clone)]
pub enum CompileOutcome
{   /// Nothing generated yet
    Empty
  , Component(CompiledComponent)
}

impl CompileOutcome
{   pub fn is_empty(&self) -> bool
    {   matches!(self, CompileOutcome::Empty)
    }

    pub fn component(&self) -> Option<&CompiledComponent>
    {   match self
        {   CompileOutcome::Component(c) => Some(c)
          , CompileOutcome::Empty => None
        }
    }

    pub fn into_component(self) -> Option<CompiledComponent>
    {   match self
        {   CompileOutcome::Component(c) => Some(c)
          , CompileOutcome::Empty => None
        }
    }
}

/// An invokable unit. Never mutated; replaced wholesale on new source.
#[derive(Debug, Clone)]
pub struct CompiledComponent
{   program: Arc<Program>
  , scope: Arc<Scope>
  , limits: RenderConfig
}

impl CompiledComponent
{   /// Render the component. Output depends only on program and scope.
    pub fn render(&self) -> Result<RenderNode, CompileError>
    {   guard(|| {
          Evaluator::new(&self.scope, &self.limits).run(&self.program)
        })
    }

    pub fn program(&self) -> &Program
    {   &self.program
    }
}

/// Compiles source against one fixed scope
#[derive(Debug, Clone)]
pub struct Renderer
{   scope: Arc<Scope>
  , limits: RenderConfig
}

impl Renderer
{   pub fn new(scope: Scope, limits: RenderConfig) -> Self
    {   Renderer
        {   scope: Arc::new(scope)
          , limits
        }
    }

    /// Standard scope, default limits
    pub fn standard() -> Self
    {   Renderer::new(Scope::standard(), RenderConfig::default())
    }

    pub fn scope(&self) -> &Scope
    {   &self.scope
    }

    pub fn limits(&self) -> &RenderConfig
    {   &self.limits
    }

    /// Compile on the calling thread. Never panics past this call.
    pub fn compile(&self, source: &str) -> Result<CompileOutcome, CompileError>
    {   let result = guard(|| self.compile_unguarded(source));
        if let Err(e) = &result
        {   warn!("Compile failed: {}", e);
        }
        result
    }

    /// Compile on a blocking worker under the wall-clock budget
    pub async fn compile_isolated(
      &self
    , source: String
    ) -> Result<CompileOutcome, CompileError>
    {   let renderer = self.clone();
        let budget = Duration::from_millis(self.limits.time_budget_ms);
        let job = tokio::task::spawn_blocking(move || renderer.compile(&source));
        match tokio::time::timeout(budget, job).await
        {   Ok(Ok(result)) => result
          , Ok(Err(join_error)) => {
              warn!("Compile worker failed: {}", join_error);
              Err(CompileError::internal(join_error.to_string()))
            }
          , Err(_) => {
              warn!("Compile exceeded {:?}", budget);
              Err(CompileError::budget(format!(
                "compilation exceeded {}ms", self.limits.time_budget_ms
              )))
            }
        }
    }

    fn compile_unguarded(&self, source: &str) -> Result<CompileOutcome, CompileError>
    {   if source.trim().is_empty()
        {   return Ok(CompileOutcome::Empty);
        }
        if source.len() > self.limits.max_source_bytes
        {   return Err(CompileError::budget(format!(
              "source is {} bytes, limit is {}",
              source.len(), self.limits.max_source_bytes
            )));
        }
        let program = parse::parse(source, self.limits.max_depth)?;
        Resolver::new(&self.scope, source).program(&program)?;

        let component = CompiledComponent
        {   program: Arc::new(program)
          , scope: self.scope.clone()
          , limits: self.limits.clone()
        };
        let tree = component.render()?;
        debug!("Compiled component with {} nodes", tree.len());
        Ok(CompileOutcome::Component(component))
    }
}

impl Default for Renderer
{   fn default() -> Self
    {   Renderer::standard()
    }
}

/// Convert panics into `Internal` errors
fn guard<T>(f: impl FnOnce() -> Result<T, CompileError>) -> Result<T, CompileError>
{   panic::catch_unwind(AssertUnwindSafe(f))
      .unwrap_or_else(|payload| {
        let message = payload.downcast_ref::<&str>()
          .map(|s| s.to_string())
          .or_else(|| payload.downcast_ref::<String>().cloned())
          .unwrap_or_else(|| "panic while compiling".to_string());
        Err(CompileError::internal(message))
      })
}

// ===== Static resolution =====

struct Resolver<'a>
{   scope: &'a Scope
  , src: &'a str
  , locals: BTreeSet<String>
}

impl<'a> Resolver<'a>
{   fn new(scope: &'a Scope, src: &'a str) -> Self
    {   Resolver { scope, src, locals: BTreeSet::new() }
    }

    fn at(&self, pos: parse::Pos) -> String
    {   let (line, column) = pos.locate(self.src);
        format!(" (line {}, column {})", line, column)
    }

    fn program(&mut self, program: &Program) -> Result<(), CompileError>
    {   for statement in &program.statements
        {   match statement
            {   Statement::Bind { pattern, value, pos } => {
                  self.expr(value)?;
                  for name in pattern.names()
                  {   if self.scope.contains(name)
                      {   return Err(CompileError::structure(format!(
                            "'{}' shadows a scope name{}", name, self.at(*pos)
                          )));
                      }
                      if !self.locals.insert(name.to_string())
                      {   return Err(CompileError::structure(format!(
                            "'{}' has already been declared{}", name, self.at(*pos)
                          )));
                      }
                  }
                }
              , Statement::Call(call) => self.expr(call)?
            }
        }
        self.element(&program.root)
    }

    fn expr(&self, expr: &Expr) -> Result<(), CompileError>
    {   match expr
        {   Expr::Ident { name, pos } => {
              if self.locals.contains(name)
              {   return Ok(());
              }
              match self.scope.get(name)
              {   Some(Binding::Value(_)) => Ok(())
                , Some(Binding::Hook(_)) => Err(CompileError::reference(format!(
                    "{} is a hook and must be called{}", name, self.at(*pos)
                  )))
                , Some(Binding::Element(_)) => Err(CompileError::reference(format!(
                    "{} is a component, not a value{}", name, self.at(*pos)
                  )))
                , None => Err(CompileError::reference(format!(
                    "{} is not defined{}", name, self.at(*pos)
                  )))
              }
            }
          , Expr::Call { callee, args, pos } => {
              match self.scope.get(callee)
              {   Some(Binding::Hook(_)) => {}
                , Some(_) => {
                    return Err(CompileError::reference(format!(
                      "{} is not a function{}", callee, self.at(*pos)
                    )));
                  }
                , None if self.locals.contains(callee) => {
                    return Err(CompileError::reference(format!(
                      "{} is not callable during render{}", callee, self.at(*pos)
                    )));
                  }
                , None => {
                    return Err(CompileError::reference(format!(
                      "{} is not defined{}", callee, self.at(*pos)
                    )));
                  }
              }
              args.iter().try_for_each(|a| self.expr(a))
            }
          , Expr::Str(_) | Expr::Num(_) | Expr::Bool(_) | Expr::Null => Ok(())
        }
    }

    fn element(&self, element: &Element) -> Result<(), CompileError>
    {   if let Some(name) = &element.name
        {   match self.scope.get(name)
            {   Some(Binding::Element(spec)) => {
                  if !spec.accepts_children && !element.children.is_empty()
                  {   return Err(CompileError::structure(format!(
                        "<{}> cannot have children{}", name, self.at(element.pos)
                      )));
                  }
                }
              , Some(_) => {
                  return Err(CompileError::reference(format!(
                    "{} is not a component{}", name, self.at(element.pos)
                  )));
                }
              , None => {
                  return Err(CompileError::reference(format!(
                    "{} is not defined{}", name, self.at(element.pos)
                  )));
                }
            }
        }
        for attr in &element.attrs
        {   if let AttrValue::Expr(expr) = &attr.value
            {   self.expr(expr)?;
            }
        }
        for child in &element.children
        {   match child
            {   Child::Element(e) => self.element(e)?
              , Child::Expr(e) => self.expr(e)?
              , Child::Text(_) => {}
            }
        }
        Ok(())
    }
}

// ===== Evaluation =====

struct Evaluator<'a>
{   scope: &'a Scope
  , limits: &'a RenderConfig
  , locals: BTreeMap<String, Value>
  , nodes: usize
  , deadline: Instant
}

impl<'a> Evaluator<'a>
{   fn new(scope: &'a Scope, limits: &'a RenderConfig) -> Self
    {   Evaluator
        {   scope
          , limits
          , locals: BTreeMap::new()
          , nodes: 0
          , deadline: Instant::now() + Duration::from_millis(limits.time_budget_ms)
        }
    }

    fn run(mut self, program: &Program) -> Result<RenderNode, CompileError>
    {   for statement in &program.statements
        {   match statement
            {   Statement::Bind { pattern, value, .. } => {
                  let value = self.expr(value)?;
                  self.bind(pattern, value)?;
                }
              , Statement::Call(call) => {
                  self.expr(call)?;
                }
            }
        }
        let mut roots = self.element(&program.root)?;
        if roots.len() == 1
        {   Ok(roots.remove(0))
        } else
        {   Ok(RenderNode::Element
            {   name: "Fragment".to_string()
              , props: BTreeMap::new()
              , children: roots
            })
        }
    }

    fn bind(&mut self, pattern: &Pattern, value: Value) -> Result<(), CompileError>
    {   match pattern
        {   Pattern::Name(name) => {
              self.locals.insert(name.clone(), value);
            }
          , Pattern::Array(names) => {
              let Value::List(items) = value
              else
              {   return Err(CompileError::runtime(format!(
                    "cannot destructure [{}]: value is not iterable",
                    names.join(", ")
                  )));
              };
              for (i, name) in names.iter().enumerate()
              {   self.locals.insert(
                    name.clone(),
                    items.get(i).cloned().unwrap_or(Value::Null)
                  );
              }
            }
        }
        Ok(())
    }

    fn expr(&self, expr: &Expr) -> Result<Value, CompileError>
    {   match expr
        {   Expr::Str(s) => Ok(Value::Str(s.clone()))
          , Expr::Num(n) => Ok(Value::Number(*n))
          , Expr::Bool(b) => Ok(Value::Bool(*b))
          , Expr::Null => Ok(Value::Null)
          , Expr::Ident { name, .. } => {
              if let Some(v) = self.locals.get(name)
              {   return Ok(v.clone());
              }
              match self.scope.get(name)
              {   Some(Binding::Value(v)) => Ok(v.clone())
                , _ => Err(CompileError::reference(format!("{} is not defined", name)))
              }
            }
          , Expr::Call { callee, args, .. } => {
              let Some(Binding::Hook(hook)) = self.scope.get(callee)
              else
              {   return Err(CompileError::reference(format!(
                    "{} is not a function", callee
                  )));
              };
              let args = args.iter()
                .map(|a| self.expr(a))
                .collect::<Result<Vec<_>, _>>()?;
              hook(&args).map_err(CompileError::runtime)
            }
        }
    }

    fn tick(&mut self) -> Result<(), CompileError>
    {   self.nodes += 1;
        if self.nodes > self.limits.max_nodes
        {   return Err(CompileError::budget(format!(
              "render produced more than {} nodes", self.limits.max_nodes
            )));
        }
        if Instant::now() > self.deadline
        {   return Err(CompileError::budget(format!(
              "render exceeded {}ms", self.limits.time_budget_ms
            )));
        }
        Ok(())
    }

    /// Fragments flatten, so one element may yield several nodes
    fn element(&mut self, element: &Element) -> Result<Vec<RenderNode>, CompileError>
    {   let mut children = Vec::new();
        for child in &element.children
        {   match child
            {   Child::Element(e) => children.extend(self.element(e)?)
              , Child::Text(text) => {
                  self.tick()?;
                  children.push(RenderNode::Text { text: text.clone() });
                }
              , Child::Expr(e) => {
                  let text = self.expr(e)?.to_text();
                  if !text.is_empty()
                  {   self.tick()?;
                      children.push(RenderNode::Text { text });
                  }
                }
            }
        }

        let Some(name) = &element.name
        else
        {   return Ok(children);
        };
        self.tick()?;
        let mut props = BTreeMap::new();
        for attr in &element.attrs
        {   let value = match &attr.value
            {   AttrValue::Str(s) => Value::Str(s.clone())
              , AttrValue::Expr(e) => self.expr(e)?
              , AttrValue::Flag => Value::Bool(true)
            };
            props.insert(attr.name.clone(), value);
        }
        Ok(vec![RenderNode::Element { name: name.clone(), props, children }])
    }
}
