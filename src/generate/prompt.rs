use serde::Deserialize;
use std::path::Path;

pub const SYSTEM_PROMPT: &str =
    "You're a helpful coding assistant. Return only the requested code and nothing else.";

/// Name used for jobs built from the free-form prompt.
pub const MANUAL_PROMPT_NAME: &str = "manual";

#[derive(thiserror::Error, Debug)]
pub enum PromptError {
    #[error("cannot read prompt file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid prompt file: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unknown prompt template: {0}")]
    UnknownTemplate(String),
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PromptTemplate {
    pub name: String,
    pub prompt: String,
}

/// Prompt templates loaded once at startup, in file order.
#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    templates: Vec<PromptTemplate>,
}

impl PromptLibrary {
    pub fn from_yaml_str(raw: &str) -> Result<Self, PromptError> {
        let templates: Option<Vec<PromptTemplate>> = serde_yaml::from_str(raw)?;
        Ok(Self {
            templates: templates.unwrap_or_default(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, PromptError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&raw)
    }

    pub fn names(&self) -> Vec<String> {
        self.templates.iter().map(|t| t.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// System preamble followed by the template body.
    pub fn build_full_prompt(&self, name: &str) -> Result<String, PromptError> {
        let template = self
            .templates
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| PromptError::UnknownTemplate(name.to_string()))?;
        Ok(format!("{}\n\n{}", SYSTEM_PROMPT, template.prompt)
            .trim()
            .to_string())
    }

    /// Resolves each selected name into `(name, full prompt)` pairs, keeping
    /// selection order.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<(String, String)>, PromptError> {
        names
            .iter()
            .map(|n| Ok((n.clone(), self.build_full_prompt(n)?)))
            .collect()
    }
}
