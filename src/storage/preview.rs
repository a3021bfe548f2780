use log::warn;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One HTML file per generation, named by the generation id and never
/// rewritten.
pub struct PreviewStore {
    dir: PathBuf,
}

impl PreviewStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, generation_id: &str) -> PathBuf {
        self.dir.join(format!("{}.html", generation_id))
    }

    /// Writes the artifact and returns a `file://` URL for it.
    pub fn write(&self, generation_id: &str, html: &str) -> std::io::Result<String> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(generation_id);
        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        file.write_all(html.as_bytes())?;
        Ok(file_url(&path))
    }

    /// Best-effort removal of an artifact whose generation was not logged.
    pub fn discard(&self, generation_id: &str) {
        let path = self.path_for(generation_id);
        if let Err(e) = std::fs::remove_file(&path) {
            warn!("cannot remove preview {}: {}", path.display(), e);
        }
    }
}

pub fn file_url(path: &Path) -> String {
    let abs = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file://{}", abs.display())
}
