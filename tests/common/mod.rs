#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use craftify::error::Error;
use craftify::schema::Schema;
use craftify::{Completion, RetryPolicy};
use serde_json::{json, Value};

/// One scripted completion answer
pub struct Step
{   pub delay: Duration
  , pub result: Result<Value, Error>
}

pub fn ok(value: Value) -> Step
{   Step { delay: Duration::ZERO, result: Ok(value) }
}

pub fn fail(error: Error) -> Step
{   Step { delay: Duration::ZERO, result: Err(error) }
}

pub fn slow(delay: Duration, value: Value) -> Step
{   Step { delay, result: Ok(value) }
}

/// Completion stub counting its invocations.
///
/// Answers come from `routes` when the prompt contains the route's
/// needle, otherwise from the script in call order. An exhausted
/// script keeps failing.
pub struct ScriptedCompletion
{   script: Mutex<VecDeque<Step>>
  , routes: Vec<(String, Duration, Value)>
  , calls: AtomicUsize
  , prompts: Mutex<Vec<String>>
  , hints: Mutex<Vec<Option<String>>>
}

impl ScriptedCompletion
{   pub fn new(steps: Vec<Step>) -> Self
    {   ScriptedCompletion
        {   script: Mutex::new(steps.into())
          , routes: Vec::new()
          , calls: AtomicUsize::new(0)
          , prompts: Mutex::new(Vec::new())
          , hints: Mutex::new(Vec::new())
        }
    }

    pub fn failing() -> Self
    {   ScriptedCompletion::new(Vec::new())
    }

    pub fn routed(routes: Vec<(&str, Duration, Value)>) -> Self
    {   let mut stub = ScriptedCompletion::new(Vec::new());
        stub.routes = routes.into_iter()
          .map(|(needle, delay, value)| (needle.to_string(), delay, value))
          .collect();
        stub
    }

    pub fn calls(&self) -> usize
    {   self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String>
    {   self.prompts.lock().unwrap().clone()
    }

    pub fn hints(&self) -> Vec<Option<String>>
    {   self.hints.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for ScriptedCompletion
{   async fn complete(
      &self
    , prompt: &str
    , _schema: &Schema
    , model_hint: Option<&str>
    ) -> Result<Value, Error>
    {   self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.hints.lock().unwrap().push(model_hint.map(str::to_string));

        if let Some((_, delay, value)) = self.routes.iter()
          .find(|(needle, _, _)| prompt.contains(needle.as_str()))
        {   tokio::time::sleep(*delay).await;
            return Ok(value.clone());
        }

        let step = self.script.lock().unwrap().pop_front();
        match step
        {   Some(step) => {
              if !step.delay.is_zero()
              {   tokio::time::sleep(step.delay).await;
              }
              step.result
            }
          , None => Err(Error::ApiError("upstream unavailable".to_string()))
        }
    }
}

/// Default attempt budget with no waiting between attempts
pub fn instant_policy() -> RetryPolicy
{   RetryPolicy::new(3, 0)
}

pub fn app_code(code: &str, explanation: &str) -> Value
{   json!({ "componentCode": code, "explanation": explanation })
}

pub fn description(text: &str) -> std::collections::BTreeMap<String, String>
{   std::collections::BTreeMap::from([
      ("description".to_string(), text.to_string())
    ])
}
