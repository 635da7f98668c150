//! Turns a description into a validated structured artifact

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info, warn};

use crate::config::CraftConfig;
use crate::error::Error;
use crate::failover::RetryPolicy;
use crate::providers::Completion;
use crate::request::{GenerationRequest, GenerationResult, Origin, Output};
use crate::task::{GenerationTask, TaskCatalog, TaskKind};

/// Runs tasks against a completion capability with retry and fallback.
///
/// Per call: `Requesting -> Validating -> (Done | Retry-wait -> Requesting)`
/// until the attempt budget is spent or an error is not retryable, then
/// the task fallback is returned.
/// The only error that escapes `generate` is invalid caller input.
#[derive(Clone)]
pub struct Orchestrator
{   completion: Arc<dyn Completion>
  , catalog: Arc<TaskCatalog>
  , policy: RetryPolicy
}

impl Orchestrator
{   pub fn new(
      completion: Arc<dyn Completion>
    , policy: RetryPolicy
    ) -> Self
    {   Orchestrator
        {   completion
          , catalog: Arc::new(TaskCatalog::builtin())
          , policy
        }
    }

    /// Orchestrator using the retry section of a validated config
    pub fn from_config(
      completion: Arc<dyn Completion>
    , config: &CraftConfig
    ) -> Result<Self, Error>
    {   config.validate()?;
        Ok(Orchestrator::new(completion, RetryPolicy::from(&config.retry)))
    }

    pub fn with_catalog(mut self, catalog: TaskCatalog) -> Self
    {   self.catalog = Arc::new(catalog);
        self
    }

    pub fn policy(&self) -> &RetryPolicy
    {   &self.policy
    }

    pub fn catalog(&self) -> &TaskCatalog
    {   &self.catalog
    }

    pub fn task(&self, kind: TaskKind) -> &GenerationTask
    {   self.catalog.get(kind)
    }

    pub async fn run(
      &self
    , request: GenerationRequest
    ) -> Result<GenerationResult, Error>
    {   self.generate(request.task, &request.input).await
    }

    /// Convenience for the single-field description tasks
    pub async fn generate_from_description(
      &self
    , kind: TaskKind
    , description: &str
    ) -> Result<GenerationResult, Error>
    {   self.run(GenerationRequest::describe(kind, description)).await
    }

    pub async fn generate(
      &self
    , kind: TaskKind
    , input: &BTreeMap<String, String>
    ) -> Result<GenerationResult, Error>
    {   let task = self.catalog.get(kind);
        task.input_schema.validate_input(input)
          .map_err(|e| {
            warn!("Rejected input for {}: {}", task.task_id, e);
            e
          })?;

        let prompt = task.render_prompt(input);
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;
        let mut attempts = 0;

        for attempt in 1..=max_attempts
        {   let delay = self.policy.delay_before_attempt(attempt);
            if !delay.is_zero()
            {   tokio::time::sleep(delay).await;
            }

            debug!(
              "{} attempt {}/{}",
              task.task_id, attempt, max_attempts
            );
            attempts = attempt;
            match self.attempt(task, &prompt).await
            {   Ok(output) => {
                  info!(
                    "{} succeeded on attempt {}/{}",
                    task.task_id, attempt, max_attempts
                  );
                  return Ok(GenerationResult::Success
                  {   output
                    , attempts: attempt
                  });
                }
              , Err(e) => {
                  warn!(
                    "{} attempt {}/{} failed: {}",
                    task.task_id, attempt, max_attempts, e
                  );
                  let retryable = e.is_retryable();
                  last_error = Some(e);
                  if !retryable
                  {   break;
                  }
                }
            }
        }

        let reason = last_error
          .unwrap_or_else(|| Error::Other("no attempt made".to_string()));
        if self.policy.fallback_enabled
        {   info!(
              "{} gave up after {} attempts, using fallback (last error: {})",
              task.task_id, attempts, reason
            );
            Ok(GenerationResult::Success
            {   output: task.fallback()
              , attempts
            })
        } else
        {   Ok(GenerationResult::Failure
            {   reason
              , attempts
            })
        }
    }

    /// One bounded call plus validation
    async fn attempt(
      &self
    , task: &GenerationTask
    , prompt: &str
    ) -> Result<Output, Error>
    {   let call = self.completion.complete(
          prompt,
          &task.output_schema,
          task.model_hint.as_deref()
        );
        let value = tokio::time::timeout(self.policy.attempt_timeout, call)
          .await
          .map_err(|_| Error::Timeout)??;
        let fields = task.output_schema.validate_output(&value)?;
        Ok(Output::new(fields, Origin::Model))
    }
}
