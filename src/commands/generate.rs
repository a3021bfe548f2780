use crate::app_state::AppEvent;
use crate::batch::{Batch, BatchRunner, BatchSlot, RunSummary};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Installs `batch` as the current one and spawns its runner.
///
/// The previous batch is cancelled and its runner awaited first, so at most
/// one job is ever in flight across batches. Updates from a batch that is no
/// longer current are not pushed to the UI.
pub fn launch(
    slot: Arc<BatchSlot>,
    batch: Batch,
    runner: BatchRunner,
    previous: Option<JoinHandle<RunSummary>>,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
) -> JoinHandle<RunSummary> {
    let batch = Arc::new(batch);
    let old = slot.replace(batch.clone());
    old.cancel();

    let total = batch.len();
    let _ = evt_tx.send(AppEvent::Jobs(batch.snapshot()));
    let _ = evt_tx.send(AppEvent::Log(format!("▶ batch started: {} jobs", total)));

    tokio::spawn(async move {
        if let Some(prev) = previous {
            let _ = prev.await;
        }

        let tx = evt_tx.clone();
        let current = slot.clone();
        let on_update = move |b: &Batch| {
            if std::ptr::eq(current.current().as_ref(), b) {
                let _ = tx.send(AppEvent::Jobs(b.snapshot()));
            }
        };

        let summary = runner.run(batch, Some(on_update)).await;
        let msg = if summary.cancelled {
            format!(
                "■ batch cancelled: {} done, {} failed",
                summary.done, summary.failed
            )
        } else {
            format!(
                "✓ batch finished: {} done, {} failed",
                summary.done, summary.failed
            )
        };
        let _ = evt_tx.send(AppEvent::Log(msg));
        summary
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::{Completion, CompletionRequest, CompletionService, LlmError, ModelInfo};
    use crate::batch::builder::build_jobs;
    use crate::batch::JobStatus;
    use crate::generate::GenerationService;
    use crate::storage::{EvalLog, PreviewStore};
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Echo;

    #[async_trait]
    impl CompletionService for Echo {
        async fn generate(&self, req: CompletionRequest) -> Result<Completion, LlmError> {
            Ok(Completion {
                response: format!("```html\n<p>{}</p>\n```", req.model),
                eval_count: 4,
                prompt_eval_count: 2,
                eval_duration_ns: 500_000_000,
            })
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
            Ok(Vec::new())
        }
    }

    fn runner(dir: &TempDir) -> BatchRunner {
        let service = GenerationService::new(
            Arc::new(Echo),
            "http://localhost:11434",
            Arc::new(EvalLog::new(dir.path().join("log.csv"))),
            Arc::new(PreviewStore::new(dir.path().join("previews"))),
        );
        BatchRunner::new(Arc::new(service)).with_pause(Duration::from_millis(1))
    }

    fn batch(models: &[&str]) -> Batch {
        let models: Vec<String> = models.iter().map(|m| m.to_string()).collect();
        Batch::new(build_jobs(&models, &[("p".to_string(), "prompt".to_string())]))
    }

    #[tokio::test]
    async fn relaunch_cancels_previous_batch() {
        let dir = TempDir::new().unwrap();
        let slot = Arc::new(BatchSlot::new());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let first = launch(slot.clone(), batch(&["a", "b", "c"]), runner(&dir), None, tx.clone());
        let old = slot.current();
        let second = launch(slot.clone(), batch(&["d", "e"]), runner(&dir), Some(first), tx);

        assert!(old.is_cancelled());
        let summary = second.await.unwrap();
        assert_eq!(summary.done, 2);
        assert!(!summary.cancelled);

        let current = slot.current();
        assert!(!Arc::ptr_eq(&current, &old));
        assert_eq!(current.stats().done, 2);
        assert!(old
            .snapshot()
            .iter()
            .all(|j| j.status() != JobStatus::Running));

        let mut saw_snapshot = false;
        while let Ok(evt) = rx.try_recv() {
            if let AppEvent::Jobs(jobs) = evt {
                saw_snapshot = true;
                assert!(jobs.len() == 3 || jobs.len() == 2);
            }
        }
        assert!(saw_snapshot);
    }
}
