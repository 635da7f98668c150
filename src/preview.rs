//! Live preview slot: request sequencing and display state

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::render::{CompileError, CompileOutcome, CompiledComponent, Renderer};

/// Monotonically increasing tag for one generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   write!(f, "#{}", self.0)
    }
}

/// Hands out request ids; safe to share between tasks
#[derive(Debug, Default)]
pub struct RequestSequencer
{   next: AtomicU64
}

impl RequestSequencer
{   pub fn new() -> Self
    {   RequestSequencer::default()
    }

    pub fn next(&self) -> RequestId
    {   RequestId(self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// What `apply` did with a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Applied
{   Accepted
  , /// A newer request was already applied
    Stale
}

/// Last settled outcome; shown whenever nothing newer is loading
#[derive(Debug, Clone)]
enum Settled
{   Empty
  , Ready(CompiledComponent)
  , Failed(CompileError)
}

/// What the host should draw right now
#[derive(Debug)]
pub enum PreviewView<'a>
{   /// Nothing generated yet
    Placeholder
  , /// Generation in flight; keep showing the previous component if any
    Loading
    {   showing: Option<&'a CompiledComponent>
    }
  , Component(&'a CompiledComponent)
  , /// Distinct from loading; never silently reverts to an older component
    Error(&'a CompileError)
}

/// One preview pane. Results older than the newest applied one are dropped.
#[derive(Debug)]
pub struct PreviewSlot
{   renderer: Renderer
  , settled: Settled
  , loading: bool
  , last_good: Option<CompiledComponent>
  , newest_begun: Option<RequestId>
  , newest_applied: Option<RequestId>
}

impl PreviewSlot
{   pub fn new(renderer: Renderer) -> Self
    {   PreviewSlot
        {   renderer
          , settled: Settled::Empty
          , loading: false
          , last_good: None
          , newest_begun: None
          , newest_applied: None
        }
    }

    pub fn renderer(&self) -> &Renderer
    {   &self.renderer
    }

    /// Mark a request as in flight
    pub fn begin(&mut self, id: RequestId)
    {   debug!("Preview begin {}", id);
        if self.newest_begun.map_or(true, |n| id > n)
        {   self.newest_begun = Some(id);
        }
        if !self.is_stale(id)
        {   self.loading = true;
        }
    }

    fn is_stale(&self, id: RequestId) -> bool
    {   self.newest_applied.map_or(false, |n| id <= n)
    }

    /// Compile `source` for request `id` and show the outcome
    pub fn apply(&mut self, id: RequestId, source: &str) -> Applied
    {   if self.is_stale(id)
        {   info!("Discarding stale preview result {}", id);
            return Applied::Stale;
        }
        self.newest_applied = Some(id);
        let outcome = self.renderer.compile(source);
        self.settle(id, outcome);
        Applied::Accepted
    }

    /// Like `apply` but compiles on a blocking worker
    pub async fn apply_isolated(&mut self, id: RequestId, source: String) -> Applied
    {   if self.is_stale(id)
        {   info!("Discarding stale preview result {}", id);
            return Applied::Stale;
        }
        self.newest_applied = Some(id);
        let outcome = self.renderer.compile_isolated(source).await;
        self.settle(id, outcome);
        Applied::Accepted
    }

    fn settle(
      &mut self
    , id: RequestId
    , outcome: Result<CompileOutcome, CompileError>
    )
    {   self.settled = match outcome
        {   Ok(CompileOutcome::Empty) => {
              self.last_good = None;
              Settled::Empty
            }
          , Ok(CompileOutcome::Component(component)) => {
              self.last_good = Some(component.clone());
              Settled::Ready(component)
            }
          , Err(e) => {
              warn!("Preview {} failed to compile: {}", id, e);
              Settled::Failed(e)
            }
        };
        // a newer request is still generating; keep the spinner up
        self.loading = self.newest_begun.map_or(false, |n| n > id);
    }

    /// Request `id` produced nothing to show; reveal the last settled outcome
    pub fn abandon(&mut self, id: RequestId)
    {   if self.newest_begun != Some(id) || !self.loading
        {   return;
        }
        debug!("Preview abandon {}", id);
        self.loading = false;
    }

    pub fn view(&self) -> PreviewView<'_>
    {   if self.loading
        {   return PreviewView::Loading
            {   showing: self.last_good.as_ref()
            };
        }
        match &self.settled
        {   Settled::Empty => PreviewView::Placeholder
          , Settled::Ready(c) => PreviewView::Component(c)
          , Settled::Failed(e) => PreviewView::Error(e)
        }
    }

    pub fn current(&self) -> Option<&CompiledComponent>
    {   match &self.settled
        {   Settled::Ready(c) if !self.loading => Some(c)
          , _ => None
        }
    }
}

impl Default for PreviewSlot
{   fn default() -> Self
    {   PreviewSlot::new(Renderer::standard())
    }
}
