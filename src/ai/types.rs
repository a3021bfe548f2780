use async_trait::async_trait;

#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
        }
    }
}

/// Generated text plus the token telemetry reported by the service.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Completion {
    pub response: String,
    /// Output token count.
    pub eval_count: u64,
    /// Input token count.
    pub prompt_eval_count: u64,
    /// Generation time in nanoseconds.
    pub eval_duration_ns: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
}

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("http error: {0}")]
    Http(String),
    #[error("request timed out")]
    Timeout,
    #[error("completion service returned {code}: {body}")]
    Status { code: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Http(e.to_string())
        }
    }
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn generate(&self, req: CompletionRequest) -> Result<Completion, LlmError>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError>;
}
