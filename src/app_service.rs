use crate::ai::{discover_models, CompletionService, LlmError, OllamaClient};
use crate::app_state::{AppEvent, SettingsView};
use crate::batch::{build_batch, BatchRunner, BatchSlot, RunSummary};
use crate::commands::app_command::HELP_TEXT;
use crate::commands::{evaluate, generate, AppCommand, Selection};
use crate::config::AppConfig;
use crate::generate::{GenerationService, PromptLibrary};
use crate::storage::{EvalLog, PreviewStore, UrlStore};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Builds a completion service for a base URL.
pub type ServiceFactory =
    Arc<dyn Fn(&str, Duration) -> Result<Arc<dyn CompletionService>, LlmError> + Send + Sync>;

pub fn ollama_factory() -> ServiceFactory {
    Arc::new(|base_url, timeout| {
        let client = OllamaClient::new(base_url, timeout)?;
        Ok(Arc::new(client) as Arc<dyn CompletionService>)
    })
}

/// Pushes the current batch to the UI.
pub fn refresh_ui(slot: &BatchSlot, tx: &mpsc::UnboundedSender<AppEvent>) {
    let _ = tx.send(AppEvent::Jobs(slot.current().snapshot()));
}

/// Actor-side state: selections, the batch slot and the persistence stores.
pub struct Workbench {
    config: AppConfig,
    url_store: UrlStore,
    base_url: String,
    available_models: Vec<String>,
    selected_models: Vec<String>,
    selected_prompts: Vec<String>,
    manual_prompt: Option<String>,
    prompts: Arc<PromptLibrary>,
    slot: Arc<BatchSlot>,
    eval_log: Arc<EvalLog>,
    previews: Arc<PreviewStore>,
    factory: ServiceFactory,
    runner_task: Option<JoinHandle<RunSummary>>,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
}

impl Workbench {
    pub fn new(
        config: AppConfig,
        prompts: PromptLibrary,
        slot: Arc<BatchSlot>,
        factory: ServiceFactory,
        evt_tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let url_store = UrlStore::new(config.url_file());
        let base_url = config.initial_base_url(&url_store);
        let eval_log = Arc::new(EvalLog::new(config.log_file()));
        let previews = Arc::new(PreviewStore::new(config.preview_dir()));
        let selected_prompts = prompts.names();

        Self {
            config,
            url_store,
            base_url,
            available_models: Vec::new(),
            selected_models: Vec::new(),
            selected_prompts,
            manual_prompt: None,
            prompts: Arc::new(prompts),
            slot,
            eval_log,
            previews,
            factory,
            runner_task: None,
            evt_tx,
        }
    }

    pub fn settings_view(&self) -> SettingsView {
        SettingsView {
            base_url: self.base_url.clone(),
            available_models: self.available_models.clone(),
            selected_models: self.selected_models.clone(),
            prompt_names: self.prompts.names(),
            selected_prompts: self.selected_prompts.clone(),
            manual_prompt: self.manual_prompt.clone(),
        }
    }

    fn publish_settings(&self) {
        let _ = self.evt_tx.send(AppEvent::Settings(self.settings_view()));
    }

    fn message(&self, msg: impl Into<String>) {
        let _ = self.evt_tx.send(AppEvent::Message(msg.into()));
    }

    fn error(&self, msg: impl Into<String>) {
        let _ = self.evt_tx.send(AppEvent::Error(msg.into()));
    }

    pub async fn handle(&mut self, cmd: AppCommand) {
        match cmd {
            AppCommand::SetUrl { url } => {
                match self.url_store.save(&url) {
                    Ok(saved) => {
                        info!("ollama url set to {}", saved);
                        self.message(format!("✓ Ollama URL: {}", saved));
                        self.base_url = saved;
                    }
                    Err(e) => {
                        self.error(format!("✗ cannot save URL: {}", e));
                        return;
                    }
                }
                // a new host means a new model list
                self.discover().await;
            }
            AppCommand::Discover => self.discover().await,
            AppCommand::SelectModels(selection) => self.select_models(selection),
            AppCommand::SelectPrompts(selection) => self.select_prompts(selection),
            AppCommand::ManualPrompt(text) => {
                match &text {
                    Some(t) => self.message(format!("manual prompt set ({} chars)", t.chars().count())),
                    None => self.message("manual prompt cleared"),
                }
                self.manual_prompt = text;
                self.publish_settings();
            }
            AppCommand::Generate => self.generate(),
            AppCommand::Cancel => {
                // only unstarted jobs can be cancelled
                let batch = self.slot.current();
                if batch.is_empty() || batch.stats().pending == 0 {
                    self.message("nothing to cancel");
                } else {
                    batch.cancel();
                    info!("batch cancel requested");
                    self.message("■ cancel requested; the running job will finish first");
                }
            }
            AppCommand::Evaluate {
                job_id,
                scores,
                comments,
            } => evaluate::save(&self.eval_log, job_id.as_deref(), scores, &comments, &self.evt_tx),
            AppCommand::History { job_id } => {
                evaluate::history(&self.eval_log, job_id.as_deref(), &self.evt_tx)
            }
            // handled by the UI
            AppCommand::Comment(_) => {}
            AppCommand::Help => self.message(HELP_TEXT),
            AppCommand::Quit => self.message("bye"),
            AppCommand::Unknown(msg) => {
                if !msg.is_empty() {
                    self.error(msg);
                }
            }
        }
    }

    async fn discover(&mut self) {
        let service = match (self.factory)(&self.base_url, self.config.generate_timeout) {
            Ok(s) => s,
            Err(e) => {
                self.error(format!("✗ cannot build client: {}", e));
                return;
            }
        };
        let models = discover_models(service.as_ref()).await;
        if models.is_empty() {
            self.message(format!("⚠ no models found at {}", self.base_url));
        } else {
            self.message(format!("✓ {} models at {}", models.len(), self.base_url));
        }

        // drop vanished models, default to everything discovered
        self.selected_models.retain(|m| models.contains(m));
        if self.selected_models.is_empty() {
            self.selected_models = models.clone();
        }
        self.available_models = models;
        self.publish_settings();
    }

    fn select_models(&mut self, selection: Selection) {
        self.selected_models = match selection {
            Selection::All => self.available_models.clone(),
            Selection::Named(names) => {
                for n in names.iter().filter(|n| !self.available_models.contains(n)) {
                    warn!("model {} not in discovered list", n);
                    self.message(format!("⚠ {} was not discovered; keeping it anyway", n));
                }
                names
            }
        };
        self.message(format!("models: {}", self.selected_models.join(", ")));
        self.publish_settings();
    }

    fn select_prompts(&mut self, selection: Selection) {
        let names = match selection {
            Selection::All => self.prompts.names(),
            Selection::Named(names) => names,
        };
        // all or nothing: one bad name keeps the old selection
        if let Err(e) = self.prompts.resolve(&names) {
            self.error(format!("✗ {}", e));
            return;
        }
        self.selected_prompts = names;
        self.message(format!("prompts: {}", self.selected_prompts.join(", ")));
        self.publish_settings();
    }

    fn generate(&mut self) {
        let pairs = match self.prompts.resolve(&self.selected_prompts) {
            Ok(p) => p,
            Err(e) => {
                self.error(format!("✗ {}", e));
                return;
            }
        };
        let batch = build_batch(&self.selected_models, &pairs, self.manual_prompt.as_deref());
        if batch.is_empty() {
            self.error("Nothing to generate: select at least one model and a prompt.");
            return;
        }

        // each batch gets a client for the URL current at launch
        let service = match (self.factory)(&self.base_url, self.config.generate_timeout) {
            Ok(s) => s,
            Err(e) => {
                self.error(format!("✗ cannot build client: {}", e));
                return;
            }
        };
        let generator = GenerationService::new(
            service,
            self.base_url.clone(),
            self.eval_log.clone(),
            self.previews.clone(),
        );
        info!(
            "launching batch of {} jobs against {}",
            batch.len(),
            self.base_url
        );
        let handle = generate::launch(
            self.slot.clone(),
            batch,
            BatchRunner::new(Arc::new(generator)),
            self.runner_task.take(),
            self.evt_tx.clone(),
        );
        self.runner_task = Some(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::{Completion, CompletionRequest, ModelInfo};
    use crate::batch::JobStatus;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FakeOllama;

    #[async_trait]
    impl CompletionService for FakeOllama {
        async fn generate(&self, req: CompletionRequest) -> Result<Completion, LlmError> {
            Ok(Completion {
                response: format!("Sure!\n```html\n<h1>{}</h1>\n```", req.model),
                eval_count: 20,
                prompt_eval_count: 8,
                eval_duration_ns: 2_000_000_000,
            })
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>, LlmError> {
            Ok(vec![
                ModelInfo {
                    name: "llama3:8b".to_string(),
                },
                ModelInfo {
                    name: "phi3:mini".to_string(),
                },
            ])
        }
    }

    const PROMPTS: &str = "- name: landing\n  prompt: Build a landing page.\n- name: form\n  prompt: Build a signup form.\n";

    fn workbench(dir: &TempDir) -> (Workbench, mpsc::UnboundedReceiver<AppEvent>) {
        let config = AppConfig {
            data_dir: dir.path().to_path_buf(),
            prompts_path: dir.path().join("prompt.yml"),
            url_override: None,
            generate_timeout: Duration::from_secs(5),
        };
        let factory: ServiceFactory =
            Arc::new(|_, _| Ok(Arc::new(FakeOllama) as Arc<dyn CompletionService>));
        let (tx, rx) = mpsc::unbounded_channel();
        let wb = Workbench::new(
            config,
            PromptLibrary::from_yaml_str(PROMPTS).unwrap(),
            Arc::new(BatchSlot::new()),
            factory,
            tx,
        );
        (wb, rx)
    }

    fn errors(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(evt) = rx.try_recv() {
            if let AppEvent::Error(m) = evt {
                out.push(m);
            }
        }
        out
    }

    #[tokio::test]
    async fn generate_without_models_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (mut wb, mut rx) = workbench(&dir);

        wb.handle(AppCommand::Generate).await;
        assert!(errors(&mut rx)[0].starts_with("Nothing to generate"));
        assert!(wb.slot.current().is_empty());
    }

    #[tokio::test]
    async fn discover_select_and_generate() {
        let dir = TempDir::new().unwrap();
        let (mut wb, mut rx) = workbench(&dir);

        wb.handle(AppCommand::Discover).await;
        assert_eq!(wb.selected_models, vec!["llama3:8b", "phi3:mini"]);

        wb.handle(AppCommand::SelectModels(Selection::Named(vec![
            "phi3:mini".to_string(),
        ])))
        .await;
        wb.handle(AppCommand::ManualPrompt(Some("Draw a cat".to_string())))
            .await;
        wb.handle(AppCommand::Generate).await;

        let summary = wb.runner_task.take().unwrap().await.unwrap();
        assert_eq!(summary.done, 3);
        assert!(errors(&mut rx).is_empty());

        let jobs = wb.slot.current().snapshot();
        assert_eq!(jobs.len(), 3);
        assert!(jobs.iter().all(|j| j.status() == JobStatus::Done));
        assert_eq!(jobs[2].prompt_name(), "manual");
        assert_eq!(jobs[2].prompt_text(), "Draw a cat");
        assert_eq!(jobs[0].html_output(), Some("<h1>phi3:mini</h1>"));

        let attrs = wb.eval_log.entity_attributes(jobs[0].id()).unwrap();
        assert_eq!(attrs.get("model").map(String::as_str), Some("phi3:mini"));
        assert_eq!(attrs.get("prompt_template_name").map(String::as_str), Some("landing"));
    }

    #[tokio::test]
    async fn unknown_prompt_selection_keeps_previous() {
        let dir = TempDir::new().unwrap();
        let (mut wb, mut rx) = workbench(&dir);

        wb.handle(AppCommand::SelectPrompts(Selection::Named(vec![
            "nope".to_string(),
        ])))
        .await;
        assert!(errors(&mut rx)[0].contains("nope"));
        assert_eq!(wb.selected_prompts, vec!["landing", "form"]);
    }

    #[tokio::test]
    async fn set_url_persists_and_rediscovers() {
        let dir = TempDir::new().unwrap();
        let (mut wb, _rx) = workbench(&dir);

        wb.handle(AppCommand::SetUrl {
            url: "  http://gpu-box:11434 ".to_string(),
        })
        .await;
        assert_eq!(wb.base_url, "http://gpu-box:11434");
        assert_eq!(wb.available_models.len(), 2);

        let reopened = UrlStore::new(dir.path().join("ollama_url.txt"));
        assert_eq!(reopened.load_or("x"), "http://gpu-box:11434");
    }
}
