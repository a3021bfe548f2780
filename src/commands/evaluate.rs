use crate::app_state::AppEvent;
use crate::evaluation::{save_evaluation, Evaluation};
use crate::storage::EvalLog;
use log::error;
use tokio::sync::mpsc;

pub fn save(
    log: &EvalLog,
    job_id: Option<&str>,
    scores: [u8; 4],
    comments: &str,
    evt_tx: &mpsc::UnboundedSender<AppEvent>,
) {
    let evaluation = match Evaluation::new(scores, comments) {
        Ok(e) => e,
        Err(e) => {
            let _ = evt_tx.send(AppEvent::Error(format!("✗ {}", e)));
            return;
        }
    };

    match save_evaluation(log, job_id, &evaluation) {
        Ok(outcome) => {
            let _ = evt_tx.send(AppEvent::Message(outcome.message().to_string()));
        }
        Err(e) => {
            error!("cannot write evaluation: {}", e);
            let _ = evt_tx.send(AppEvent::Error(format!("✗ evaluation not saved: {}", e)));
        }
    }
}

/// Prints the reconciled log attributes of one generation.
pub fn history(log: &EvalLog, job_id: Option<&str>, evt_tx: &mpsc::UnboundedSender<AppEvent>) {
    let Some(id) = job_id else {
        let _ = evt_tx.send(AppEvent::Message("No generation selected.".to_string()));
        return;
    };

    match log.entity_attributes(id) {
        Ok(attrs) if attrs.is_empty() => {
            let _ = evt_tx.send(AppEvent::Message(format!("no log entries for {}", id)));
        }
        Ok(attrs) => {
            let _ = evt_tx.send(AppEvent::Log(format!("── {} ──", id)));
            for (attribute, value) in attrs {
                let _ = evt_tx.send(AppEvent::Log(format!("  {} = {}", attribute, value)));
            }
        }
        Err(e) => {
            let _ = evt_tx.send(AppEvent::Error(format!("✗ cannot read log: {}", e)));
        }
    }
}
