pub mod eav_log;
pub mod preview;
pub mod url_store;

pub use eav_log::{EvalLog, EvalLogError};
pub use preview::PreviewStore;
pub use url_store::UrlStore;
