use crate::batch::model::{Batch, Job};
use crate::generate::prompt::MANUAL_PROMPT_NAME;

/// One pending job per (model, prompt) pair, model-major. Repeated model
/// names collapse to their first occurrence.
pub fn build_jobs(models: &[String], prompts: &[(String, String)]) -> Vec<Job> {
    let mut seen: Vec<&str> = Vec::new();
    let mut jobs = Vec::with_capacity(models.len() * prompts.len());
    for model in models {
        if seen.contains(&model.as_str()) {
            continue;
        }
        seen.push(model);
        for (name, text) in prompts {
            jobs.push(Job::new(model.clone(), name.clone(), text.clone()));
        }
    }
    jobs
}

/// Cross-product jobs plus at most one manual-prompt job at the end. The
/// manual job targets the first selected model and uses its text verbatim.
pub fn build_batch(
    models: &[String],
    prompts: &[(String, String)],
    manual_prompt: Option<&str>,
) -> Batch {
    let mut jobs = build_jobs(models, prompts);
    let manual = manual_prompt.map(str::trim).filter(|p| !p.is_empty());
    if let (Some(text), Some(model)) = (manual, models.first()) {
        jobs.push(Job::new(model.clone(), MANUAL_PROMPT_NAME, text));
    }
    Batch::new(jobs)
}
