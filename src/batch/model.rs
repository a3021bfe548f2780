use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Error,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }

    /// pending -> running -> done | error, nothing else.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Done)
                | (JobStatus::Running, JobStatus::Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("illegal job transition {from} -> {to}")]
pub struct TransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Everything a finished generation hands back to its job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutput {
    pub raw_output: String,
    pub html_output: String,
    pub stats: String,
    pub preview_url: String,
}

/// One (model, prompt) generation request and its lifecycle.
#[derive(Debug, Clone)]
pub struct Job {
    id: String,
    model: String,
    prompt_name: String,
    prompt_text: String,
    status: JobStatus,
    raw_output: Option<String>,
    html_output: Option<String>,
    stats: String,
    preview_url: Option<String>,
}

impl Job {
    pub fn new(
        model: impl Into<String>,
        prompt_name: impl Into<String>,
        prompt_text: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            model: model.into(),
            prompt_name: prompt_name.into(),
            prompt_text: prompt_text.into(),
            status: JobStatus::Pending,
            raw_output: None,
            html_output: None,
            stats: String::new(),
            preview_url: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn short_id(&self) -> &str {
        self.id.get(..8).unwrap_or(&self.id)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn prompt_name(&self) -> &str {
        &self.prompt_name
    }

    pub fn prompt_text(&self) -> &str {
        &self.prompt_text
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn raw_output(&self) -> Option<&str> {
        self.raw_output.as_deref()
    }

    pub fn html_output(&self) -> Option<&str> {
        self.html_output.as_deref()
    }

    pub fn stats(&self) -> &str {
        &self.stats
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.preview_url.as_deref()
    }

    fn advance(&mut self, next: JobStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.advance(JobStatus::Running)
    }

    pub fn complete(&mut self, output: JobOutput) -> Result<(), TransitionError> {
        self.advance(JobStatus::Done)?;
        self.raw_output = Some(output.raw_output);
        self.html_output = Some(output.html_output);
        self.stats = output.stats;
        self.preview_url = Some(output.preview_url);
        Ok(())
    }

    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        self.advance(JobStatus::Error)?;
        self.raw_output = Some(reason.into());
        Ok(())
    }
}

/// Batch status counts for the UI header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub done: usize,
    pub error: usize,
}

impl BatchStats {
    pub fn from_jobs(jobs: &[Job]) -> Self {
        let mut stats = BatchStats {
            total: jobs.len(),
            ..Default::default()
        };
        for job in jobs {
            match job.status() {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Running => stats.running += 1,
                JobStatus::Done => stats.done += 1,
                JobStatus::Error => stats.error += 1,
            }
        }
        stats
    }
}

/// An ordered set of jobs created and run together.
///
/// Jobs sit behind their own locks so a runner can update one job while
/// observers snapshot the rest; nobody holds a lock across an await.
#[derive(Debug, Default)]
pub struct Batch {
    jobs: Vec<RwLock<Job>>,
    cancelled: AtomicBool,
}

impl Batch {
    pub fn new(jobs: Vec<Job>) -> Self {
        Self {
            jobs: jobs.into_iter().map(RwLock::new).collect(),
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn job(&self, index: usize) -> Option<RwLockReadGuard<'_, Job>> {
        self.jobs
            .get(index)
            .map(|j| j.read().unwrap_or_else(|e| e.into_inner()))
    }

    pub(crate) fn job_mut(&self, index: usize) -> Option<RwLockWriteGuard<'_, Job>> {
        self.jobs
            .get(index)
            .map(|j| j.write().unwrap_or_else(|e| e.into_inner()))
    }

    /// Owned copies of every job, in batch order.
    pub fn snapshot(&self) -> Vec<Job> {
        self.jobs
            .iter()
            .map(|j| j.read().unwrap_or_else(|e| e.into_inner()).clone())
            .collect()
    }

    pub fn stats(&self) -> BatchStats {
        BatchStats::from_jobs(&self.snapshot())
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Holder of the current batch. Replacing it swaps the whole `Arc`, so
/// readers see either the old batch or the new one, never a mix. A runner
/// keeps the `Arc` it started with and never looks at the slot again.
#[derive(Debug, Default)]
pub struct BatchSlot {
    current: RwLock<Arc<Batch>>,
}

impl BatchSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Arc<Batch> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Installs `batch` and returns the one it replaced.
    pub fn replace(&self, batch: Arc<Batch>) -> Arc<Batch> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, batch)
    }
}
