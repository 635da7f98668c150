//! The app builder flow: describe an app, persist the code, preview it

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use crate::error::Error;
use crate::orchestrator::Orchestrator;
use crate::preview::{Applied, PreviewSlot, RequestId, RequestSequencer};
use crate::project::{live_url, OwnerContext, Project, ProjectStatus, ProjectStore, ProjectType};
use crate::render::Renderer;
use crate::request::{GenerationRequest, GenerationResult, Origin, Output};
use crate::task::TaskKind;

/// Assistant answer to one chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildReply
{   pub request_id: RequestId
  , pub message: String
  , pub explanation: String
  , pub origin: Origin
  , pub applied: Applied
}

pub struct AppBuilder
{   orchestrator: Orchestrator
  , store: Arc<dyn ProjectStore>
  , sequencer: RequestSequencer
  , preview: Mutex<PreviewSlot>
}

impl AppBuilder
{   pub fn new(
      orchestrator: Orchestrator
    , store: Arc<dyn ProjectStore>
    , renderer: Renderer
    ) -> Self
    {   AppBuilder
        {   orchestrator
          , store
          , sequencer: RequestSequencer::new()
          , preview: Mutex::new(PreviewSlot::new(renderer))
        }
    }

    pub async fn preview(&self) -> MutexGuard<'_, PreviewSlot>
    {   self.preview.lock().await
    }

    pub async fn create_project(
      &self
    , owner: &OwnerContext
    , name: &str
    , description: &str
    , project_type: ProjectType
    ) -> Result<Project, Error>
    {   if name.trim().is_empty()
        {   return Err(Error::Validation("project name must not be empty".to_string()));
        }
        let project = Project::new(owner, name.trim(), description, project_type);
        self.store.put(owner, project.clone()).await?;
        info!("Created project {} for {}", project.id, owner.owner_id);
        Ok(project)
    }

    pub async fn project(
      &self
    , owner: &OwnerContext
    , project_id: &str
    ) -> Result<Project, Error>
    {   self.store.get(owner, project_id).await?
          .ok_or_else(|| Error::NotFound(format!("project {}", project_id)))
    }

    pub async fn projects(&self, owner: &OwnerContext) -> Result<Vec<Project>, Error>
    {   self.store.list(owner).await
    }

    /// Generate app code for `description`, persist it and show it
    pub async fn send_message(
      &self
    , owner: &OwnerContext
    , project_id: &str
    , description: &str
    ) -> Result<BuildReply, Error>
    {   let request = GenerationRequest::describe(TaskKind::AppCode, description);
        self.orchestrator.task(TaskKind::AppCode)
          .input_schema
          .validate_input(&request.input)?;
        self.project(owner, project_id).await?;

        let request_id = self.sequencer.next();
        self.preview.lock().await.begin(request_id);

        let output = match self.orchestrator.run(request).await
        {   Ok(GenerationResult::Success { output, .. }) => output
          , Ok(GenerationResult::Failure { reason, attempts }) => {
              warn!("{} failed after {} attempts: {}", request_id, attempts, reason);
              self.preview.lock().await.abandon(request_id);
              return Err(reason);
            }
          , Err(e) => {
              self.preview.lock().await.abandon(request_id);
              return Err(e);
            }
        };

        let code = output.get("componentCode").unwrap_or_default().to_string();
        let explanation = output.get("explanation").unwrap_or_default().to_string();

        let applied = self.preview.lock().await.apply(request_id, &code);

        // placeholders and superseded results never overwrite stored code
        if output.origin == Origin::Model && applied == Applied::Accepted
        {   self.store.update(owner, project_id, Box::new(move |project: &mut Project| {
              project.generated_code = Some(code);
            })).await?;
        }

        let message = match output.origin
        {   Origin::Model => format!(
              "I have generated the code for a {}. You can view it in the Code tab or export it.",
              description.trim()
            )
          , Origin::Fallback => {
              "Something went wrong while generating your app. A placeholder is shown; please try again."
                .to_string()
            }
        };
        Ok(BuildReply
        {   request_id
          , message
          , explanation
          , origin: output.origin
          , applied
        })
    }

    /// Generate a theme and store it on the project
    pub async fn generate_theme(
      &self
    , owner: &OwnerContext
    , project_id: &str
    , description: &str
    ) -> Result<Output, Error>
    {   self.project(owner, project_id).await?;
        let output = self.generated(TaskKind::Theme, description).await?;
        if output.origin == Origin::Model
        {   let theme_code = output.get("themeCode").map(str::to_string);
            self.store.update(owner, project_id, Box::new(move |project: &mut Project| {
              project.theme_code = theme_code;
            })).await?;
        }
        Ok(output)
    }

    pub async fn suggest_improvements(&self, description: &str) -> Result<String, Error>
    {   let output = self.generated(TaskKind::Suggestions, description).await?;
        Ok(output.get("suggestions").unwrap_or_default().to_string())
    }

    async fn generated(&self, kind: TaskKind, description: &str) -> Result<Output, Error>
    {   match self.orchestrator.generate_from_description(kind, description).await?
        {   GenerationResult::Success { output, .. } => Ok(output)
          , GenerationResult::Failure { reason, .. } => Err(reason)
        }
    }

    /// Move a project with generated code to `live`
    pub async fn publish(
      &self
    , owner: &OwnerContext
    , project_id: &str
    ) -> Result<Project, Error>
    {   let project = self.store.update(owner, project_id, Box::new(|project: &mut Project| {
          project.status = if project.generated_code.is_some()
          {   ProjectStatus::Publishing
          } else
          {   ProjectStatus::Failed
          };
        })).await?;
        if project.status == ProjectStatus::Failed
        {   return Err(Error::Validation(
              "no code has been generated to publish".to_string()
            ));
        }
        info!(
          "Publishing {} ({}): preparing {}",
          project.name, project.id, project.project_type.artifact()
        );

        let project = self.store.update(owner, project_id, Box::new(|project: &mut Project| {
          project.live_url = Some(live_url(&project.name, &project.id));
          project.status = ProjectStatus::Live;
        })).await?;
        info!("Project {} is live", project.id);
        Ok(project)
    }
}
