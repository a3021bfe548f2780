use crate::ai::build_llm_http_client;
use crate::ai::types::{Completion, CompletionRequest, CompletionService, LlmError, ModelInfo};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_GENERATE_TIMEOUT: Duration = Duration::from_secs(300);
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct GenerateReply {
    #[serde(default)]
    response: String,
    #[serde(default)]
    eval_count: u64,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_duration: u64,
}

impl From<GenerateReply> for Completion {
    fn from(r: GenerateReply) -> Self {
        Completion {
            response: r.response,
            eval_count: r.eval_count,
            prompt_eval_count: r.prompt_eval_count,
            eval_duration_ns: r.eval_duration,
        }
    }
}

#[derive(Deserialize, Debug)]
struct TagsReply {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize, Debug)]
struct TagEntry {
    name: String,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_llm_http_client(timeout)?,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl CompletionService for OllamaClient {
    async fn generate(&self, req: CompletionRequest) -> Result<Completion, LlmError> {
        let body = GenerateBody {
            model: &req.model,
            prompt: &req.prompt,
            stream: false,
        };

        let resp = self
            .client
            .post(self.endpoint("/api/generate"))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let raw = resp.text().await?;
        if !status.is_success() {
            return Err(LlmError::Status {
                code: status.as_u16(),
                body: raw,
            });
        }

        let reply: GenerateReply = serde_json::from_str(&raw)
            .map_err(|e| LlmError::InvalidResponse(format!("json parse failed: {e}, raw={raw}")))?;
        Ok(reply.into())
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
        let resp = self
            .client
            .get(self.endpoint("/api/tags"))
            .timeout(DISCOVERY_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let tags: TagsReply = resp
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Ok(tags
            .models
            .into_iter()
            .map(|m| ModelInfo { name: m.name })
            .collect())
    }
}
