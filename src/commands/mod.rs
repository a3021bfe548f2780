pub mod app_command;
pub mod evaluate;
pub mod generate;

pub use app_command::{AppCommand, Selection};
