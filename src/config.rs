use crate::ai::ollama::{DEFAULT_BASE_URL, DEFAULT_GENERATE_TIMEOUT};
use crate::storage::UrlStore;
use std::path::PathBuf;
use std::time::Duration;

/// Startup settings, read from the environment (after `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub prompts_path: PathBuf,
    pub url_override: Option<String>,
    pub generate_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("MODELBENCH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        let prompts_path = std::env::var("MODELBENCH_PROMPTS")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("prompt.yml"));
        let url_override = std::env::var("OLLAMA_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let generate_timeout = std::env::var("OLLAMA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_GENERATE_TIMEOUT);

        Self {
            data_dir,
            prompts_path,
            url_override,
            generate_timeout,
        }
    }

    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("log.csv")
    }

    pub fn url_file(&self) -> PathBuf {
        self.data_dir.join("ollama_url.txt")
    }

    pub fn preview_dir(&self) -> PathBuf {
        self.data_dir.join("previews")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// `OLLAMA_URL` wins over the persisted file, which wins over the default.
    pub fn initial_base_url(&self, store: &UrlStore) -> String {
        match &self.url_override {
            Some(url) => url.clone(),
            None => store.load_or(DEFAULT_BASE_URL),
        }
    }
}
