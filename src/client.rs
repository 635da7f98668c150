use log::{debug, error, info};
use tokio::sync::mpsc;

use crate::error::Error;
use crate::orchestrator::Orchestrator;
use crate::preview::RequestSequencer;
use crate::request::GenerationRequest;
use crate::task::TaskKind;
use crate::CraftFoot;

/// Public API for the Craftify backend - owns the task
pub struct CraftBackend
{   hand: crate::CraftHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl CraftBackend
{   /// Create and spawn a new backend around an orchestrator
    /// Returns immediately - spawns background task
    pub fn new(orchestrator: Orchestrator) -> Self
    {   debug!("Creating CraftBackend with task ownership");

        let (generate_tx, generate_rx)
          = mpsc::unbounded_channel();
        let (get_tasks_tx, get_tasks_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::CraftHand
        {   generate_tx
          , get_tasks_tx
          , kill_process_tx
        };

        let foot = crate::CraftFoot
        {   generate_rx
          , get_tasks_rx
          , kill_process_rx
        };

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, orchestrator).await
        });

        CraftBackend
        {   hand
          , _task_handle
        }
    }

    /// Queue a generation - returns almost immediately
    pub async fn generate(
      &self
    , request: GenerationRequest
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GenerateReply>,
        Error
      >
    {   debug!("generate queuing command for task: {:?}", request.task);
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GenerateArgs
        {   request
          , reply: reply_tx
        };

        self.hand.generate_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// List task ids - returns almost immediately
    pub async fn get_tasks(
      &self
    ) -> Result<
        mpsc::UnboundedReceiver<crate::GetTasksReply>,
        Error
      >
    {   debug!("get_tasks queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::GetTasksArgs
        {   reply: reply_tx
        };

        self.hand.get_tasks_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self)
      -> Result<(), Error>
    {   debug!("Shutting down CraftBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            Error::Other(
              "Backend already shutdown".to_string()
            )
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend shutdown timeout");
            Err(Error::Timeout)
        }
    }
}

/// Main backend event loop
///
/// tokio::select! only routes. Generations run on their own tasks so a
/// slow upstream never blocks the next command; every reply carries the
/// request id so callers can discard stale results.
async fn run_backend_loop(
  foot: crate::CraftFoot
, orchestrator: Orchestrator
)
{   debug!("Starting CraftBackend event loop");
    let sequencer = RequestSequencer::new();
    let CraftFoot
    {   mut generate_rx
      , mut get_tasks_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = generate_rx.recv() => {
          let request_id = sequencer.next();
          debug!("Received Generate {} for {:?}", request_id, cmd.request.task);
          let orchestrator = orchestrator.clone();
          tokio::spawn(async move {
            let result = orchestrator.run(cmd.request).await;
            let _ = cmd.reply.send(
              result.map(|result| crate::Generated { request_id, result })
            );
          });
        }
      , Some(cmd) = get_tasks_rx.recv() => {
          debug!("Received GetTasks");
          let tasks = TaskKind::ALL.iter()
            .map(|kind| (*kind, orchestrator.task(*kind).task_id.clone()))
            .collect();
          let _ = cmd.reply.send(Ok(tasks));
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("CraftBackend shutting down");
          break;
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}
