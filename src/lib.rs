pub mod error;
pub mod config;
pub mod failover;
pub mod schema;
pub mod task;
pub mod request;
pub mod providers;
pub mod orchestrator;
pub mod render;
pub mod preview;
pub mod project;
pub mod builder;
pub mod client;

/*

craftify turns a natural-language app description into generated UI code
and a live preview:

  description -> Orchestrator (prompt, completion, schema check,
                 retry with backoff, fallback) -> Output
  Output.componentCode -> Renderer (closed-scope compile) -> RenderNode

src/
├── lib.rs           # Re-exports and the channel API of the backend
├── error.rs         # Error and ErrorKind
├── config.rs        # Provider, retry and render configuration
├── failover.rs      # RetryPolicy
├── schema.rs        # Input/output field schemas
├── task.rs          # The three built-in generation tasks
├── request.rs       # GenerationRequest / GenerationResult / Output
├── orchestrator.rs  # generate(): retry, validation, fallback
├── providers/       # Completion trait and the Gemini client
├── render/          # Markup parser, scope, compiler
├── preview.rs       # Request ids and preview display state
├── project.rs       # Owner-scoped project records
├── builder.rs       # End-to-end app builder flow
└── client.rs        # CraftBackend actor

*/

pub use builder::{AppBuilder, BuildReply};
pub use client::CraftBackend;
pub use config::CraftConfig;
pub use error::{Error, ErrorKind};
pub use failover::RetryPolicy;
pub use orchestrator::Orchestrator;
pub use preview::{Applied, PreviewSlot, PreviewView, RequestId};
pub use providers::{Completion, GeminiClient};
pub use render::{CompileError, CompileOutcome, CompiledComponent, RenderNode, Renderer, Scope};
pub use request::{GenerationRequest, GenerationResult, Origin, Output};
pub use task::{GenerationTask, TaskCatalog, TaskKind};

/// Install env_logger, honouring RUST_LOG, defaulting to info.
/// Safe to call more than once.
pub fn init_logging()
{   let _ = env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).try_init();
}

/// CRAFTIFY BACKEND INTERFACE:

// ===== Generate =====

/// A generation result tagged with its request id
#[derive(Debug, Clone, PartialEq)]
pub struct Generated
{   pub request_id: RequestId
  , pub result: GenerationResult
}

pub type GenerateReply = Result<Generated, crate::error::Error>;
pub type GenerateReplySender
  = tokio::sync::mpsc::UnboundedSender<GenerateReply>;

pub struct GenerateArgs
{   pub request: GenerationRequest
  , pub reply: GenerateReplySender
}

// ===== GetTasks =====

pub type GetTasksReply
  = Result<Vec<(TaskKind, String)>, crate::error::Error>;
pub type GetTasksReplySender
  = tokio::sync::mpsc::UnboundedSender<GetTasksReply>;

pub struct GetTasksArgs
{   pub reply: GetTasksReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== CraftHand (sender side) =====

pub struct CraftHand
{   pub generate_tx
      : tokio::sync::mpsc::UnboundedSender<GenerateArgs>
  , pub get_tasks_tx
      : tokio::sync::mpsc::UnboundedSender<GetTasksArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== CraftFoot (receiver side) =====

pub struct CraftFoot
{   pub generate_rx
      : tokio::sync::mpsc::UnboundedReceiver<GenerateArgs>
  , pub get_tasks_rx
      : tokio::sync::mpsc::UnboundedReceiver<GetTasksArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}
