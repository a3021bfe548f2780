use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

pub const HEADER: [&str; 3] = ["entity", "attribute", "value"];

// Shared by every `EvalLog` in the process, whatever file it points at.
static WRITE_LOCK: Mutex<()> = Mutex::new(());

#[derive(thiserror::Error, Debug)]
pub enum EvalLogError {
    #[error("evaluation log io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("evaluation log csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("evaluation log lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EavRow {
    pub entity: String,
    pub attribute: String,
    pub value: String,
}

/// Append-only entity/attribute/value log backed by a CSV file.
///
/// Every `append` call lands as a single write so a generation or an
/// evaluation is either fully logged or not at all.
pub struct EvalLog {
    path: PathBuf,
}

impl EvalLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Appends one row per attribute for `entity_id`, returning the row count.
    pub fn append<K, V>(&self, entity_id: &str, attributes: &[(K, V)]) -> Result<usize, EvalLogError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if attributes.is_empty() {
            return Ok(0);
        }
        let _guard = WRITE_LOCK.lock().map_err(|_| EvalLogError::Poisoned)?;

        let needs_header = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };

        let mut wtr = csv::Writer::from_writer(Vec::new());
        if needs_header {
            wtr.write_record(HEADER)?;
        }
        for (k, v) in attributes {
            wtr.write_record([entity_id, k.as_ref(), v.as_ref()])?;
        }
        let buf = wtr
            .into_inner()
            .map_err(|e| EvalLogError::Io(e.into_error()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&buf)?;
        file.flush()?;

        info!("logged {} attributes for {}", attributes.len(), entity_id);
        Ok(attributes.len())
    }

    /// All rows in log order. A log that does not exist yet reads as empty.
    pub fn read_all(&self) -> Result<Vec<EavRow>, EvalLogError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)?;
        let mut rows = Vec::new();
        for rec in rdr.deserialize() {
            rows.push(rec?);
        }
        Ok(rows)
    }

    /// Current attribute values for one entity. Duplicate attributes are
    /// reconciled last-row-wins in log order.
    pub fn entity_attributes(
        &self,
        entity_id: &str,
    ) -> Result<BTreeMap<String, String>, EvalLogError> {
        let mut out = BTreeMap::new();
        for row in self.read_all()? {
            if row.entity == entity_id {
                out.insert(row.attribute, row.value);
            }
        }
        Ok(out)
    }
}
