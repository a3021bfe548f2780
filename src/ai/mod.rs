pub mod ollama;
pub mod types;

pub use ollama::OllamaClient;
pub use types::{CompletionRequest, CompletionService, LlmError};

use log::warn;
use std::time::Duration;

pub(crate) fn build_llm_http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder().timeout(timeout);

    if let Ok(raw) = std::env::var("LLM_PROXY") {
        let t = raw.trim();
        if !t.is_empty() {
            let url = if t.contains("://") {
                t.to_string()
            } else {
                format!("socks5h://{}", t)
            };
            let proxy = reqwest::Proxy::all(&url).map_err(|e| LlmError::Http(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
    }

    builder.build().map_err(|e| LlmError::Http(e.to_string()))
}

/// Model discovery never fails: any transport or decoding problem yields an
/// empty list.
pub async fn discover_models(service: &dyn CompletionService) -> Vec<String> {
    match service.list_models().await {
        Ok(models) => models.into_iter().map(|m| m.name).collect(),
        Err(e) => {
            warn!("model discovery failed, using empty list: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::{Completion, ModelInfo};
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl CompletionService for Unreachable {
        async fn generate(&self, _req: CompletionRequest) -> Result<Completion, LlmError> {
            Err(LlmError::Http("connection refused".to_string()))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
            Err(LlmError::Http("connection refused".to_string()))
        }
    }

    struct TwoModels;

    #[async_trait]
    impl CompletionService for TwoModels {
        async fn generate(&self, _req: CompletionRequest) -> Result<Completion, LlmError> {
            Ok(Completion::default())
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
            Ok(vec![
                ModelInfo {
                    name: "llama3:8b".to_string(),
                },
                ModelInfo {
                    name: "qwen2.5-coder:7b".to_string(),
                },
            ])
        }
    }

    #[tokio::test]
    async fn discovery_failure_degrades_to_empty_list() {
        assert!(discover_models(&Unreachable).await.is_empty());
    }

    #[tokio::test]
    async fn discovery_returns_model_names_in_order() {
        assert_eq!(
            discover_models(&TwoModels).await,
            vec!["llama3:8b".to_string(), "qwen2.5-coder:7b".to_string()]
        );
    }
}
