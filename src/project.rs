//! Project records and the owner-scoped store capability

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::Error;

/// The authenticated owner a persistence call acts for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerContext
{   pub owner_id: String
}

impl OwnerContext
{   pub fn new(owner_id: &str) -> Self
    {   OwnerContext { owner_id: owner_id.to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType
{   FlutterAll
  , FlutterMobile
  , FlutterWeb
  , AndroidOnly
  , IosOnly
  , WebOnly
}

impl ProjectType
{   /// Build artifact a publish prepares
    pub fn artifact(&self) -> &'static str
    {   match self
        {   ProjectType::FlutterAll
          | ProjectType::FlutterMobile
          | ProjectType::FlutterWeb => "flutter build"
          , ProjectType::AndroidOnly
          | ProjectType::IosOnly => "mobile store bundle"
          , ProjectType::WebOnly => "static web bundle"
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus
{   Draft
  , Publishing
  , Live
  , Failed
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project
{   pub id: String
  , pub owner_id: String
  , pub name: String
  , pub description: String
  , pub project_type: ProjectType
  , pub status: ProjectStatus
  , pub generated_code: Option<String>
  , pub theme_code: Option<String>
  , pub live_url: Option<String>
  , pub created_at: DateTime<Utc>
  , pub updated_at: DateTime<Utc>
}

impl Project
{   pub fn new(
      owner: &OwnerContext
    , name: &str
    , description: &str
    , project_type: ProjectType
    ) -> Self
    {   let now = Utc::now();
        Project
        {   id: uuid::Uuid::new_v4().to_string()
          , owner_id: owner.owner_id.clone()
          , name: name.to_string()
          , description: description.to_string()
          , project_type
          , status: ProjectStatus::Draft
          , generated_code: None
          , theme_code: None
          , live_url: None
          , created_at: now
          , updated_at: now
        }
    }

    pub fn touch(&mut self)
    {   self.updated_at = Utc::now();
    }
}

/// `https://<slug>-<id prefix>.craftify.app`
pub fn live_url(name: &str, id: &str) -> String
{   let slug = name
      .to_lowercase()
      .split_whitespace()
      .collect::<Vec<_>>()
      .join("-");
    let prefix: String = id.chars().take(6).collect();
    format!("https://{}-{}.craftify.app", slug, prefix)
}

/// In-place edit applied by [`ProjectStore::update`]
pub type ProjectChange = Box<dyn FnOnce(&mut Project) + Send>;

/// Per-owner, per-id project persistence
#[async_trait]
pub trait ProjectStore: Send + Sync
{   async fn get(
      &self
    , owner: &OwnerContext
    , id: &str
    ) -> Result<Option<Project>, Error>;

    /// Insert or replace; the record must belong to `owner`
    async fn put(
      &self
    , owner: &OwnerContext
    , project: Project
    ) -> Result<(), Error>;

    /// Apply `change` to the stored record atomically and return the
    /// result. Fields the change leaves alone keep their stored values.
    async fn update(
      &self
    , owner: &OwnerContext
    , id: &str
    , change: ProjectChange
    ) -> Result<Project, Error>;

    /// Newest first
    async fn list(
      &self
    , owner: &OwnerContext
    ) -> Result<Vec<Project>, Error>;
}

#[derive(Debug, Default)]
pub struct InMemoryProjectStore
{   projects: RwLock<HashMap<(String, String), Project>>
}

impl InMemoryProjectStore
{   pub fn new() -> Self
    {   InMemoryProjectStore::default()
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore
{   async fn get(
      &self
    , owner: &OwnerContext
    , id: &str
    ) -> Result<Option<Project>, Error>
    {   let projects = self.projects.read().await;
        Ok(projects.get(&(owner.owner_id.clone(), id.to_string())).cloned())
    }

    async fn put(
      &self
    , owner: &OwnerContext
    , project: Project
    ) -> Result<(), Error>
    {   if project.owner_id != owner.owner_id
        {   warn!(
              "{} tried to write project {} owned by {}",
              owner.owner_id, project.id, project.owner_id
            );
            return Err(Error::Forbidden(format!("project {}", project.id)));
        }
        debug!("Storing project {} for {}", project.id, owner.owner_id);
        let mut projects = self.projects.write().await;
        projects.insert((owner.owner_id.clone(), project.id.clone()), project);
        Ok(())
    }

    async fn update(
      &self
    , owner: &OwnerContext
    , id: &str
    , change: ProjectChange
    ) -> Result<Project, Error>
    {   let mut projects = self.projects.write().await;
        let key = (owner.owner_id.clone(), id.to_string());
        let stored = projects.get_mut(&key)
          .ok_or_else(|| Error::NotFound(format!("project {}", id)))?;

        let mut next = stored.clone();
        change(&mut next);
        if next.id != stored.id || next.owner_id != stored.owner_id
        {   warn!("{} tried to re-key project {}", owner.owner_id, id);
            return Err(Error::Forbidden(format!("project {}", id)));
        }
        next.touch();
        debug!("Updated project {} for {}", id, owner.owner_id);
        *stored = next.clone();
        Ok(next)
    }

    async fn list(
      &self
    , owner: &OwnerContext
    ) -> Result<Vec<Project>, Error>
    {   let projects = self.projects.read().await;
        let mut owned: Vec<Project> = projects.values()
          .filter(|p| p.owner_id == owner.owner_id)
          .cloned()
          .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }
}
