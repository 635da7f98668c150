use async_trait::async_trait;
use log::{debug, error, info, trace};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::config::ProviderConfig;
use crate::error::Error;
use crate::schema::Schema;

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part
{   pub text: String
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content
{   #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
  , pub parts: Vec<Part>
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig
{   pub response_mime_type: String
  , pub response_schema: Value
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
  , pub generation_config: GenerationConfig
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse
{   #[serde(default)]
    pub candidates: Vec<Candidate>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate
{   pub content: Option<Content>
  , #[serde(default)]
    pub finish_reason: Option<String>
}

// ===== Gemini Client Actor =====

type CompleteReply = Result<Value, Error>;

/// Commands for GeminiClient actor
pub enum GeminiCommand
{   Complete
    {   prompt: String
      , response_schema: Value
      , model: Option<String>
      , reply: mpsc::UnboundedSender<CompleteReply>
    }
  , SetApiKey
    {   key: String
      , reply: mpsc::UnboundedSender<Result<(), Error>>
    }
  , Shutdown
}

/// Gemini client state
pub struct GeminiClientState
{   api_key: Option<String>
  , config: ProviderConfig
  , http_client: reqwest::Client
}

impl GeminiClientState
{   pub fn new(
      api_key: Option<String>
    , config: ProviderConfig
    ) -> Self
    {   debug!("Creating GeminiClientState for {}", config.api_base);
        let http_client = reqwest::Client::builder()
          .timeout(std::time::Duration::from_secs(config.timeout_secs))
          .build()
          .unwrap_or_else(|e| {
            error!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
          });
        GeminiClientState
        {   api_key
          , config
          , http_client
        }
    }

    fn get_api_key(&self) -> Result<&str, Error>
    {   match self.api_key.as_deref()
        {   Some(key) if !key.trim().is_empty() => Ok(key)
          , _ => {
              error!("No Gemini API key configured");
              Err(Error::MissingApiKey("Gemini".to_string()))
            }
        }
    }

    async fn handle_complete(
      &self
    , prompt: String
    , response_schema: Value
    , model: Option<String>
    ) -> Result<Value, Error>
    {   let api_key = self.get_api_key()?;
        let model = model.unwrap_or_else(|| self.config.model.clone());
        debug!("Handling complete for: {}", model);

        let request = GenerateContentRequest
        {   contents: vec![
              Content
              {   role: Some("user".to_string())
                , parts: vec![Part { text: prompt }]
              }
            ]
          , generation_config: GenerationConfig
            {   response_mime_type: "application/json".to_string()
              , response_schema
              , temperature: Some(self.config.temperature)
            }
        };

        trace!("Gemini request: {:?}", request);

        let url = format!(
          "{}/models/{}:generateContent",
          self.config.api_base.trim_end_matches('/'),
          model
        );
        let response = self.http_client
          .post(url)
          .header("x-goog-api-key", api_key)
          .header("Content-Type", "application/json")
          .json(&request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            if e.is_timeout()
            {   Error::Timeout
            } else
            {   Error::HttpError(e.to_string())
            }
          })?;

        let status = response.status();
        trace!("Gemini response status: {}", status);

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {   error!("Gemini rate limit hit");
            return Err(Error::RateLimitExceeded);
        }
        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Gemini API error {}: {}", status, error_text);
            return Err(Error::ApiError(
              format!("Gemini error {}: {}", status.as_u16(), error_text)
            ));
        }

        let body: GenerateContentResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            Error::ParseError(e.to_string())
          })?;

        let text = first_candidate_text(&body)
          .ok_or_else(|| {
            error!("No candidates in response");
            Error::NoCandidates
          })?;
        trace!("Gemini candidate text: {}", text);

        serde_json::from_str(strip_code_fence(&text))
          .map_err(|e| {
            error!("Candidate is not JSON: {}", e);
            Error::ParseError(e.to_string())
          })
    }

    fn handle_set_api_key(&mut self, key: String)
      -> Result<(), Error>
    {   if key.trim().is_empty()
        {   return Err(Error::MissingApiKey("Gemini".to_string()));
        }
        debug!("Setting Gemini API key");
        self.api_key = Some(key);
        Ok(())
    }
}

fn first_candidate_text(body: &GenerateContentResponse) -> Option<String>
{   let content = body.candidates.first()?.content.as_ref()?;
    let text: String = content.parts
      .iter()
      .map(|p| p.text.as_str())
      .collect();
    if text.trim().is_empty()
    {   None
    } else
    {   Some(text)
    }
}

/// Drop a surrounding ```json fence some models add anyway
pub fn strip_code_fence(text: &str) -> &str
{   let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```")
    else
    {   return trimmed;
    };
    let inner = match inner.find('\n')
    {   Some(newline) => &inner[newline + 1..]
      , None => inner
    };
    inner.trim_end()
      .strip_suffix("```")
      .unwrap_or(inner)
      .trim()
}

/// Public Gemini client interface
pub struct GeminiClient
{   tx: mpsc::UnboundedSender<GeminiCommand>
  , _task: tokio::task::JoinHandle<()>
}

impl GeminiClient
{   /// Create and spawn a new Gemini client
    pub fn new(
      api_key: Option<String>
    , config: ProviderConfig
    ) -> Self
    {   debug!("Creating GeminiClient");
        let (cmd_tx, cmd_rx)
          = mpsc::unbounded_channel();

        let _task = tokio::spawn(async move {
          run_gemini_loop(cmd_rx, api_key, config).await;
        });

        GeminiClient
        {   tx: cmd_tx
          , _task
        }
    }

    /// Queue set_api_key request
    pub async fn set_api_key(
      &self
    , key: String
    ) -> Result<(), Error>
    {   let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
        self.tx.send(GeminiCommand::SetApiKey {
          key,
          reply: reply_tx,
        }).map_err(|_| disconnected())?;
        reply_rx.recv().await.unwrap_or_else(|| Err(disconnected()))
    }

    /// Shutdown the client
    pub async fn shutdown(self)
      -> Result<(), Error>
    {   debug!("Shutting down GeminiClient");
        self.tx.send(GeminiCommand::Shutdown)
          .map_err(|_| {
            Error::Other(
              "Client already shutdown".to_string()
            )
          })
    }
}

fn disconnected() -> Error
{   error!("Gemini client disconnected");
    Error::Other("Gemini client disconnected".to_string())
}

#[async_trait]
impl super::Completion for GeminiClient
{   async fn complete(
      &self
    , prompt: &str
    , schema: &Schema
    , model_hint: Option<&str>
    ) -> Result<Value, Error>
    {   let (reply_tx, mut reply_rx) = mpsc::unbounded_channel();
        self.tx.send(GeminiCommand::Complete {
          prompt: prompt.to_string(),
          response_schema: schema.to_response_schema(),
          model: model_hint.map(str::to_string),
          reply: reply_tx,
        }).map_err(|_| disconnected())?;
        reply_rx.recv().await.unwrap_or_else(|| Err(disconnected()))
    }
}

/// Main gemini event loop
///
/// Each completion runs on its own task so one slow request does not
/// hold up the next.
async fn run_gemini_loop(
  mut cmd_rx: mpsc::UnboundedReceiver<GeminiCommand>
, api_key: Option<String>
, config: ProviderConfig
)
{   debug!("Starting Gemini client loop");
    let mut state = std::sync::Arc::new(
      GeminiClientState::new(api_key, config)
    );

    loop
    { match cmd_rx.recv().await
      {   Some(GeminiCommand::Complete {
            prompt, response_schema, model, reply
          }) => {
            debug!("Processing Complete");
            let state = state.clone();
            tokio::spawn(async move {
              let result = state
                .handle_complete(prompt, response_schema, model)
                .await;
              let _ = reply.send(result);
            });
          }
        , Some(GeminiCommand::SetApiKey { key, reply }) => {
            debug!("Processing SetApiKey");
            let mut next = GeminiClientState
            {   api_key: state.api_key.clone()
              , config: state.config.clone()
              , http_client: state.http_client.clone()
            };
            let result = next.handle_set_api_key(key);
            if result.is_ok()
            {   state = std::sync::Arc::new(next);
            }
            let _ = reply.send(result);
          }
        , Some(GeminiCommand::Shutdown) => {
            info!("Gemini client shutting down");
            break;
          }
        , None => {
            debug!("Command channel closed");
            break;
          }
      }
    }
}
