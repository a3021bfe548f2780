use std::path::PathBuf;

/// Single-line file holding the last used completion-service base URL.
pub struct UrlStore {
    path: PathBuf,
}

impl UrlStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load_or(&self, default: &str) -> String {
        match std::fs::read_to_string(&self.path) {
            Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => default.to_string(),
        }
    }

    pub fn save(&self, url: &str) -> std::io::Result<String> {
        let url = url.trim().to_string();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, &url)?;
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_uses_default() {
        let dir = TempDir::new().unwrap();
        let store = UrlStore::new(dir.path().join("ollama_url.txt"));
        assert_eq!(store.load_or("http://localhost:11434"), "http://localhost:11434");
    }

    #[test]
    fn saved_url_is_trimmed_and_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ollama_url.txt");
        let store = UrlStore::new(&path);

        assert_eq!(store.save("  http://a:11434 \n").unwrap(), "http://a:11434");
        store.save("http://b:11434").unwrap();
        assert_eq!(store.load_or("x"), "http://b:11434");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "http://b:11434");
    }
}
