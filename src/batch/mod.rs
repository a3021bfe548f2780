pub mod builder;
pub mod model;
pub mod runner;

pub use builder::build_batch;
pub use model::{Batch, BatchSlot, BatchStats, Job, JobStatus};
pub use runner::{BatchRunner, RunSummary};
