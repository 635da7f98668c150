use std::fmt;

use crate::render::CompileError;

/// Coarse classification used by retry and propagation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind
{   /// Caller supplied malformed input, never retried
    Validation
  , /// Completion capability failed or returned junk, retried
    Upstream
  , /// Generated source could not be compiled or rendered
    Compile
  , /// Crate was configured with impossible values
    Configuration
  , /// Project store rejected or could not find a record
    Storage
}

/// Custom error type for Craftify operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq)]
pub enum Error
{   /// Input did not satisfy the task's input schema
    Validation(String)
  , /// API key is missing for the completion provider
    MissingApiKey(String)
  , /// HTTP request error
    HttpError(String)
  , /// API returned an error response
    ApiError(String)
  , /// Failed to parse API response
    ParseError(String)
  , /// No candidates in API response
    NoCandidates
  , /// Structured output did not match the output schema
    SchemaMismatch(String)
  , /// Rate limit exceeded
    RateLimitExceeded
  , /// Attempt exceeded its time budget
    Timeout
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Generated source failed to compile
    Compile(CompileError)
  , /// Record does not exist for this owner
    NotFound(String)
  , /// Record belongs to another owner
    Forbidden(String)
  , /// Generic error
    Other(String)
}

impl Error
{   pub fn kind(&self) -> ErrorKind
    {   match self
        {   Error::Validation(_) => ErrorKind::Validation
          , Error::HttpError(_)
          | Error::ApiError(_)
          | Error::ParseError(_)
          | Error::NoCandidates
          | Error::SchemaMismatch(_)
          | Error::RateLimitExceeded
          | Error::Timeout
          | Error::Other(_) => ErrorKind::Upstream
          , Error::MissingApiKey(_)
          | Error::InvalidConfiguration(_) => ErrorKind::Configuration
          , Error::Compile(_) => ErrorKind::Compile
          , Error::NotFound(_)
          | Error::Forbidden(_) => ErrorKind::Storage
        }
    }

    /// Whether the orchestrator may spend another attempt on this
    pub fn is_retryable(&self) -> bool
    {   self.kind() == ErrorKind::Upstream
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::Validation(msg) => {
              write!(f, "Invalid input: {}", msg)
            }
          , Error::MissingApiKey(provider) => {
              write!(f, "Missing API key for: {}", provider)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError(msg) => {
              write!(f, "API error: {}", msg)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::NoCandidates => {
              write!(f, "API response contained no candidates")
            }
          , Error::SchemaMismatch(msg) => {
              write!(f,
                "Output does not match schema: {}",
                msg
              )
            }
          , Error::RateLimitExceeded => {
              write!(f, "API rate limit exceeded")
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Compile(err) => {
              write!(f, "Compile error: {}", err)
            }
          , Error::NotFound(what) => {
              write!(f, "Not found: {}", what)
            }
          , Error::Forbidden(what) => {
              write!(f, "Forbidden: {}", what)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

impl From<CompileError> for Error
{   fn from(e: CompileError) -> Self
    {   Error::Compile(e)
    }
}
