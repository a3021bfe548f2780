use crate::ai::{CompletionRequest, CompletionService};
use crate::batch::model::JobOutput;
use crate::generate::parser::extract_html;
use crate::generate::telemetry::{sha256_text, tokens_per_sec, Telemetry};
use crate::storage::{EvalLog, PreviewStore};
use chrono::Local;
use log::info;
use std::sync::Arc;
use std::time::Instant;

/// What one job asks of the completion service.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub generation_id: String,
    pub model: String,
    pub prompt_name: String,
    pub prompt_text: String,
}

/// Runs one generation end to end: completion call, HTML extraction,
/// preview artifact, telemetry row set.
pub struct GenerationService {
    completion: Arc<dyn CompletionService>,
    base_url: String,
    eval_log: Arc<EvalLog>,
    previews: Arc<PreviewStore>,
}

impl GenerationService {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        base_url: impl Into<String>,
        eval_log: Arc<EvalLog>,
        previews: Arc<PreviewStore>,
    ) -> Self {
        Self {
            completion,
            base_url: base_url.into(),
            eval_log,
            previews,
        }
    }

    pub async fn generate(&self, req: &GenerationRequest) -> anyhow::Result<JobOutput> {
        let start = Instant::now();
        let completion = self
            .completion
            .generate(CompletionRequest::new(&req.model, &req.prompt_text))
            .await?;

        let html = extract_html(&completion.response);
        let preview_url = self.previews.write(&req.generation_id, &html)?;

        let telemetry = Telemetry {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            ollama_url: self.base_url.clone(),
            model: req.model.clone(),
            prompt_template_name: req.prompt_name.clone(),
            prompt_sha256: sha256_text(&req.prompt_text),
            prompt_length_chars: req.prompt_text.chars().count(),
            response_length_chars: completion.response.chars().count(),
            generation_time_sec: start.elapsed().as_secs_f64(),
            eval_count: completion.eval_count,
            eval_duration_ns: completion.eval_duration_ns,
            prompt_count: completion.prompt_eval_count,
            tokens_per_sec: tokens_per_sec(completion.eval_count, completion.eval_duration_ns),
            preview_url: preview_url.clone(),
        };
        // no telemetry, no artifact
        if let Err(e) = self
            .eval_log
            .append(&req.generation_id, &telemetry.attributes())
        {
            self.previews.discard(&req.generation_id);
            return Err(e.into());
        }

        info!(
            "generation {} done: model={} {}",
            req.generation_id,
            req.model,
            telemetry.stats_line()
        );

        Ok(JobOutput {
            raw_output: completion.response,
            html_output: html,
            stats: telemetry.stats_line(),
            preview_url,
        })
    }
}
