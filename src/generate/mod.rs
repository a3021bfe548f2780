pub mod parser;
pub mod prompt;
pub mod service;
pub mod telemetry;

pub use prompt::PromptLibrary;
pub use service::{GenerationRequest, GenerationService};
