use sha2::{Digest, Sha256};

pub fn sha256_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Output tokens per second, undefined when the service reports no duration.
pub fn tokens_per_sec(eval_count: u64, eval_duration_ns: u64) -> Option<f64> {
    if eval_duration_ns == 0 {
        return None;
    }
    Some(eval_count as f64 / (eval_duration_ns as f64 / 1e9))
}

/// Statistics captured once per successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub timestamp: String,
    pub ollama_url: String,
    pub model: String,
    pub prompt_template_name: String,
    pub prompt_sha256: String,
    pub prompt_length_chars: usize,
    pub response_length_chars: usize,
    pub generation_time_sec: f64,
    pub eval_count: u64,
    pub eval_duration_ns: u64,
    pub prompt_count: u64,
    pub tokens_per_sec: Option<f64>,
    pub preview_url: String,
}

impl Telemetry {
    pub fn eval_duration_sec(&self) -> f64 {
        self.eval_duration_ns as f64 / 1e9
    }

    /// Log attributes in a fixed order.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("timestamp", self.timestamp.clone()),
            ("ollama_url", self.ollama_url.clone()),
            ("model", self.model.clone()),
            ("prompt_template_name", self.prompt_template_name.clone()),
            ("prompt_sha256", self.prompt_sha256.clone()),
            ("prompt_length_chars", self.prompt_length_chars.to_string()),
            ("response_length_chars", self.response_length_chars.to_string()),
            ("generation_time_sec", format!("{:.3}", self.generation_time_sec)),
            ("eval_count", self.eval_count.to_string()),
            ("eval_duration", format!("{:.2}", self.eval_duration_sec())),
            ("prompt_count", self.prompt_count.to_string()),
            (
                "tokens_per_sec",
                self.tokens_per_sec
                    .map(|v| format!("{:.2}", v))
                    .unwrap_or_default(),
            ),
            ("preview_url", self.preview_url.clone()),
        ]
    }

    /// Human-readable summary shown in the job table.
    pub fn stats_line(&self) -> String {
        let tps = self
            .tokens_per_sec
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "n/a".to_string());
        format!(
            "{} tokens; {:.2}s; {} tokens/s",
            self.eval_count,
            self.eval_duration_sec(),
            tps
        )
    }
}
