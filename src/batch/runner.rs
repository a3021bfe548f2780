use crate::batch::model::{Batch, JobStatus};
use crate::generate::{GenerationRequest, GenerationService};
use log::{info, warn};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

const DEFAULT_PAUSE: Duration = Duration::from_millis(100);

/// How a `run` call ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub done: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: bool,
}

/// Executes the pending jobs of one batch, one at a time, in batch order.
pub struct BatchRunner {
    generator: Arc<GenerationService>,
    pause: Duration,
}

impl BatchRunner {
    pub fn new(generator: Arc<GenerationService>) -> Self {
        Self {
            generator,
            pause: DEFAULT_PAUSE,
        }
    }

    /// Delay after each finished job so pollers can catch the intermediate state.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Runs `batch` to completion. A failed job never stops the batch; only
    /// the batch's cancellation flag does, and only between jobs.
    pub async fn run<F>(&self, batch: Arc<Batch>, on_update: Option<F>) -> RunSummary
    where
        F: Fn(&Batch),
    {
        let notify = |b: &Batch| {
            if let Some(cb) = on_update.as_ref() {
                cb(b);
            }
        };
        let mut summary = RunSummary::default();

        for idx in 0..batch.len() {
            if batch.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let Some(req) = Self::claim(&batch, idx) else {
                summary.skipped += 1;
                continue;
            };
            notify(&batch);
            info!(
                "▶ job {} started: model={} prompt={}",
                req.generation_id, req.model, req.prompt_name
            );

            let result = self.generator.generate(&req).await;
            if let Some(mut job) = batch.job_mut(idx) {
                let transition = match result {
                    Ok(output) => {
                        summary.done += 1;
                        job.complete(output)
                    }
                    Err(e) => {
                        summary.failed += 1;
                        // error types already carry their source in the message
                        warn!("✗ job {} failed: {}", req.generation_id, e);
                        job.fail(e.to_string())
                    }
                };
                if let Err(e) = transition {
                    warn!("job {}: {}", req.generation_id, e);
                }
            }
            notify(&batch);
            sleep(self.pause).await;
        }

        if batch.is_cancelled() {
            summary.cancelled = true;
        }
        info!(
            "batch finished: done={} failed={} skipped={} cancelled={}",
            summary.done, summary.failed, summary.skipped, summary.cancelled
        );
        summary
    }

    /// Moves a pending job to running and returns its request. Jobs in any
    /// other state are left alone.
    fn claim(batch: &Batch, idx: usize) -> Option<GenerationRequest> {
        let mut job = batch.job_mut(idx)?;
        if job.status() != JobStatus::Pending {
            return None;
        }
        job.start().ok()?;
        Some(GenerationRequest {
            generation_id: job.id().to_string(),
            model: job.model().to_string(),
            prompt_name: job.prompt_name().to_string(),
            prompt_text: job.prompt_text().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::{Completion, CompletionRequest, CompletionService, LlmError, ModelInfo};
    use crate::batch::builder::{build_batch, build_jobs};
    use crate::batch::model::{BatchSlot, Job};
    use crate::generate::prompt::{PromptLibrary, SYSTEM_PROMPT};
    use crate::storage::{EvalLog, PreviewStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    enum Behavior {
        Reply(Completion),
        Timeout,
        FailModel(&'static str),
    }

    struct MockService {
        behavior: Behavior,
        calls: Mutex<Vec<CompletionRequest>>,
    }

    impl MockService {
        fn new(behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                behavior,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<CompletionRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionService for MockService {
        async fn generate(&self, req: CompletionRequest) -> Result<Completion, LlmError> {
            self.calls.lock().unwrap().push(req.clone());
            match &self.behavior {
                Behavior::Reply(c) => Ok(c.clone()),
                Behavior::Timeout => Err(LlmError::Timeout),
                Behavior::FailModel(bad) if req.model == *bad => Err(LlmError::Status {
                    code: 500,
                    body: "model crashed".to_string(),
                }),
                Behavior::FailModel(_) => Ok(hi_completion()),
            }
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
            Ok(Vec::new())
        }
    }

    /// Blocks every call until released, so a test can act mid-batch.
    struct GatedService {
        entered: Notify,
        release: Notify,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionService for GatedService {
        async fn generate(&self, _req: CompletionRequest) -> Result<Completion, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
            Ok(hi_completion())
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
            Ok(Vec::new())
        }
    }

    fn hi_completion() -> Completion {
        Completion {
            response: "```html\n<p>hi</p>\n```".to_string(),
            eval_count: 10,
            prompt_eval_count: 5,
            eval_duration_ns: 1_000_000_000,
        }
    }

    struct Fixture {
        dir: TempDir,
        eval_log: Arc<EvalLog>,
        previews: Arc<PreviewStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let eval_log = Arc::new(EvalLog::new(dir.path().join("log.csv")));
            let previews = Arc::new(PreviewStore::new(dir.path().join("previews")));
            Self {
                dir,
                eval_log,
                previews,
            }
        }

        fn runner(&self, service: Arc<dyn CompletionService>) -> BatchRunner {
            let generator = GenerationService::new(
                service,
                "http://localhost:11434",
                self.eval_log.clone(),
                self.previews.clone(),
            );
            BatchRunner::new(Arc::new(generator)).with_pause(Duration::from_millis(1))
        }

        fn preview_count(&self) -> usize {
            match std::fs::read_dir(self.dir.path().join("previews")) {
                Ok(entries) => entries.count(),
                Err(_) => 0,
            }
        }
    }

    fn one(s: &str) -> Vec<String> {
        vec![s.to_string()]
    }

    #[tokio::test]
    async fn successful_generation_end_to_end() {
        let fx = Fixture::new();
        let lib = PromptLibrary::from_yaml_str("- name: greet\n  prompt: Say hi\n").unwrap();
        let prompts = lib.resolve(&one("greet")).unwrap();
        let batch = Arc::new(build_batch(&one("m1"), &prompts, None));
        assert_eq!(batch.len(), 1);
        assert_eq!(
            batch.job(0).unwrap().prompt_text(),
            format!("{}\n\nSay hi", SYSTEM_PROMPT)
        );

        let service = MockService::new(Behavior::Reply(hi_completion()));
        let summary = fx
            .runner(service.clone())
            .run(batch.clone(), None::<fn(&Batch)>)
            .await;
        assert_eq!(summary.done, 1);

        let job = batch.job(0).unwrap().clone();
        assert_eq!(job.status(), JobStatus::Done);
        assert_eq!(job.html_output(), Some("<p>hi</p>"));
        assert!(job.stats().contains("10 tokens"));
        assert!(job.stats().contains("10.0 tokens/s"));
        assert!(job.preview_url().unwrap().ends_with(&format!("{}.html", job.id())));
        assert_eq!(fx.preview_count(), 1);
        assert_eq!(
            std::fs::read_to_string(fx.previews.path_for(job.id())).unwrap(),
            "<p>hi</p>"
        );

        let calls = service.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "m1");
        assert_eq!(calls[0].prompt, job.prompt_text());

        let attrs = fx.eval_log.entity_attributes(job.id()).unwrap();
        assert_eq!(attrs.get("model").map(String::as_str), Some("m1"));
        assert_eq!(attrs.get("eval_count").map(String::as_str), Some("10"));
        assert_eq!(attrs.get("tokens_per_sec").map(String::as_str), Some("10.00"));
        assert_eq!(attrs.get("prompt_template_name").map(String::as_str), Some("greet"));
        assert_eq!(attrs.len(), 13);
    }

    #[tokio::test]
    async fn timeout_marks_job_error_without_artifacts() {
        let fx = Fixture::new();
        let batch = Arc::new(Batch::new(vec![Job::new("m1", "greet", "Say hi")]));
        let summary = fx
            .runner(MockService::new(Behavior::Timeout))
            .run(batch.clone(), None::<fn(&Batch)>)
            .await;
        assert_eq!(summary.failed, 1);

        let job = batch.job(0).unwrap().clone();
        assert_eq!(job.status(), JobStatus::Error);
        assert!(!job.raw_output().unwrap_or_default().is_empty());
        assert!(job.html_output().is_none());
        assert!(job.preview_url().is_none());
        assert_eq!(fx.preview_count(), 0);
        assert!(fx.eval_log.entity_attributes(job.id()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn log_write_failure_leaves_no_artifact() {
        let fx = Fixture::new();
        // a directory where the log file should be makes every append fail
        let log_path = fx.dir.path().join("log.csv");
        std::fs::create_dir(&log_path).unwrap();
        let batch = Arc::new(Batch::new(vec![Job::new("m1", "greet", "Say hi")]));

        let summary = fx
            .runner(MockService::new(Behavior::Reply(hi_completion())))
            .run(batch.clone(), None::<fn(&Batch)>)
            .await;
        assert_eq!(summary.failed, 1);

        let job = batch.job(0).unwrap().clone();
        assert_eq!(job.status(), JobStatus::Error);
        let reason = job.raw_output().unwrap_or_default().to_string();
        assert!(reason.starts_with("evaluation log io error: "));
        let cause = reason.trim_start_matches("evaluation log io error: ");
        assert!(!cause.is_empty());
        assert_eq!(reason.matches(cause).count(), 1);
        assert!(job.preview_url().is_none());
        assert!(!fx.previews.path_for(job.id()).exists());
        assert_eq!(fx.preview_count(), 0);
        assert_eq!(std::fs::read_dir(&log_path).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let fx = Fixture::new();
        let models = vec!["bad".to_string(), "good".to_string()];
        let prompts = vec![("a".to_string(), "x".to_string())];
        let batch = Arc::new(Batch::new(build_jobs(&models, &prompts)));

        let summary = fx
            .runner(MockService::new(Behavior::FailModel("bad")))
            .run(batch.clone(), None::<fn(&Batch)>)
            .await;

        assert_eq!(summary, RunSummary { done: 1, failed: 1, skipped: 0, cancelled: false });
        assert_eq!(batch.job(0).unwrap().status(), JobStatus::Error);
        assert!(batch.job(0).unwrap().raw_output().unwrap().contains("500"));
        assert_eq!(batch.job(1).unwrap().status(), JobStatus::Done);
    }

    #[tokio::test]
    async fn non_pending_jobs_are_skipped() {
        let fx = Fixture::new();
        let batch = Arc::new(Batch::new(vec![
            Job::new("m1", "a", "x"),
            Job::new("m1", "b", "y"),
        ]));
        {
            let mut job = batch.job_mut(0).unwrap();
            job.start().unwrap();
            job.fail("marked by hand").unwrap();
        }

        let service = MockService::new(Behavior::Reply(hi_completion()));
        let summary = fx
            .runner(service.clone())
            .run(batch.clone(), None::<fn(&Batch)>)
            .await;

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.done, 1);
        assert_eq!(service.calls().len(), 1);
        assert_eq!(batch.job(0).unwrap().raw_output(), Some("marked by hand"));
    }

    #[tokio::test]
    async fn observers_see_running_then_terminal_states() {
        let fx = Fixture::new();
        let batch = Arc::new(Batch::new(vec![
            Job::new("m1", "a", "x"),
            Job::new("m2", "a", "x"),
        ]));
        let seen: Mutex<Vec<Vec<JobStatus>>> = Mutex::new(Vec::new());
        let record = |b: &Batch| {
            let statuses = b.snapshot().iter().map(|j| j.status()).collect();
            seen.lock().unwrap().push(statuses);
        };

        fx.runner(MockService::new(Behavior::Reply(hi_completion())))
            .run(batch.clone(), Some(record))
            .await;

        use JobStatus::*;
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                vec![Running, Pending],
                vec![Done, Pending],
                vec![Done, Running],
                vec![Done, Done],
            ]
        );

        // every job's history is monotonic
        let history = seen.lock().unwrap().clone();
        for idx in 0..2 {
            let rank = |s: JobStatus| match s {
                Pending => 0,
                Running => 1,
                Done | Error => 2,
            };
            let ranks: Vec<_> = history.iter().map(|snap| rank(snap[idx])).collect();
            assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[tokio::test]
    async fn replacing_the_batch_does_not_leak_old_runner_writes() {
        let fx = Fixture::new();
        let gate = Arc::new(GatedService {
            entered: Notify::new(),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let runner = Arc::new(fx.runner(gate.clone()));
        let slot = Arc::new(BatchSlot::new());

        let old = Arc::new(Batch::new(vec![
            Job::new("m1", "a", "x"),
            Job::new("m1", "b", "y"),
        ]));
        slot.replace(old.clone());
        let handle = {
            let runner = runner.clone();
            let batch = slot.current();
            tokio::spawn(async move { runner.run(batch, None::<fn(&Batch)>).await })
        };

        gate.entered.notified().await;
        let fresh = Arc::new(Batch::new(vec![Job::new("m9", "z", "q")]));
        let replaced = slot.replace(fresh.clone());
        assert!(Arc::ptr_eq(&replaced, &old));

        // let the old runner finish both of its jobs
        gate.release.notify_one();
        gate.entered.notified().await;
        gate.release.notify_one();
        let summary = handle.await.unwrap();
        assert_eq!(summary.done, 2);

        assert!(Arc::ptr_eq(&slot.current(), &fresh));
        assert!(!Arc::ptr_eq(&fresh, &old));
        let untouched = fresh.job(0).unwrap();
        assert_eq!(untouched.status(), JobStatus::Pending);
        assert!(untouched.raw_output().is_none());
        assert_eq!(old.stats().done, 2);
        assert_eq!(gate.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancellation_stops_before_the_next_job() {
        let fx = Fixture::new();
        let gate = Arc::new(GatedService {
            entered: Notify::new(),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        });
        let runner = Arc::new(fx.runner(gate.clone()));
        let batch = Arc::new(Batch::new(vec![
            Job::new("m1", "a", "x"),
            Job::new("m1", "b", "y"),
            Job::new("m1", "c", "z"),
        ]));

        let handle = {
            let runner = runner.clone();
            let batch = batch.clone();
            tokio::spawn(async move { runner.run(batch, None::<fn(&Batch)>).await })
        };
        gate.entered.notified().await;
        batch.cancel();
        gate.release.notify_one();
        let summary = handle.await.unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.done, 1);
        assert_eq!(gate.calls.load(Ordering::SeqCst), 1);
        assert_eq!(batch.job(0).unwrap().status(), JobStatus::Done);
        assert_eq!(batch.job(1).unwrap().status(), JobStatus::Pending);
        assert_eq!(batch.job(2).unwrap().status(), JobStatus::Pending);
    }
}
