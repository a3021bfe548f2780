use crate::batch::{BatchStats, Job, JobStatus};
use crate::commands::AppCommand;
use crossterm::event::KeyCode;
use ratatui::widgets::ListState;
use std::str::FromStr;
use tokio::sync::mpsc;

#[derive(PartialEq, Debug, Clone)]
pub enum ViewMode {
    Jobs,
    Source,
    Preview,
    Evaluation,
}

#[derive(PartialEq, Debug, Clone)]
pub enum InputMode {
    Normal,
    Command,
}

#[derive(PartialEq, Debug, Clone)]
pub enum FocusArea {
    Menu,
    MainView,
}

/// Workspace selections echoed back to the UI for the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsView {
    pub base_url: String,
    pub available_models: Vec<String>,
    pub selected_models: Vec<String>,
    pub prompt_names: Vec<String>,
    pub selected_prompts: Vec<String>,
    pub manual_prompt: Option<String>,
}

#[derive(Debug)]
pub enum AppEvent {
    Log(String),
    Message(String),
    Error(String),
    /// Snapshot of the current batch.
    Jobs(Vec<Job>),
    Settings(SettingsView),
}

pub const MENU_ITEMS: [&str; 4] = ["Jobs", "HTML Source", "Preview", "Evaluation"];

pub struct App {
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub focus_area: FocusArea,
    pub menu_selected_index: usize,
    pub jobs: Vec<Job>,
    pub batch_stats: BatchStats,
    pub selected_index: usize,
    pub job_list_state: ListState,
    pub settings: SettingsView,
    pub detail_scroll: u16,
    pub draft_scores: [Option<u8>; 4],
    pub draft_criterion: usize,
    pub draft_comment: String,
    pub command_input: String,
    pub command_cursor: usize,
    pub command_history: Vec<String>,
    pub command_history_index: Option<usize>,
    pub log_messages: Vec<String>,
    pub cmd_tx: mpsc::UnboundedSender<AppCommand>,
    pub evt_rx: Option<mpsc::UnboundedReceiver<AppEvent>>,
}

impl App {
    pub fn new(
        startup_info: Vec<String>,
        cmd_tx: mpsc::UnboundedSender<AppCommand>,
        evt_rx: mpsc::UnboundedReceiver<AppEvent>,
    ) -> App {
        let mut log_messages = vec!["modelbench started".to_string()];
        log_messages.extend(startup_info);

        App {
            view_mode: ViewMode::Jobs,
            input_mode: InputMode::Normal,
            focus_area: FocusArea::Menu,
            menu_selected_index: 0,
            jobs: Vec::new(),
            batch_stats: BatchStats::default(),
            selected_index: 0,
            job_list_state: {
                let mut s = ListState::default();
                s.select(Some(0));
                s
            },
            settings: SettingsView::default(),
            detail_scroll: 0,
            draft_scores: [None; 4],
            draft_criterion: 0,
            draft_comment: String::new(),
            command_input: String::new(),
            command_cursor: 0,
            command_history: Vec::new(),
            command_history_index: None,
            log_messages,
            cmd_tx,
            evt_rx: Some(evt_rx),
        }
    }

    pub fn add_log(&mut self, msg: String) {
        self.log_messages.push(msg);
    }

    pub fn selected_job(&self) -> Option<&Job> {
        self.jobs.get(self.selected_index)
    }

    pub fn selected_job_id(&self) -> Option<String> {
        self.selected_job().map(|j| j.id().to_string())
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Log(msg) | AppEvent::Message(msg) | AppEvent::Error(msg) => {
                self.log_messages.push(msg)
            }
            AppEvent::Jobs(jobs) => {
                let previous = self.selected_job_id();
                self.batch_stats = BatchStats::from_jobs(&jobs);
                self.jobs = jobs;
                // a new batch resets the selection
                if previous.is_some() && self.jobs.iter().all(|j| Some(j.id()) != previous.as_deref()) {
                    self.selected_index = 0;
                    self.detail_scroll = 0;
                }
                self.clamp_selection();
            }
            AppEvent::Settings(settings) => self.settings = settings,
        }
    }

    /// Suggested completion for the command being typed.
    pub fn get_completion_hint(&self) -> Option<String> {
        let input = self.command_input.trim();
        if input.is_empty() {
            return None;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.len() == 1 && !self.command_input.ends_with(' ') {
            for cmd in crate::commands::app_command::COMMAND_NAMES {
                if cmd.starts_with(parts[0]) && cmd != parts[0] {
                    return Some(cmd[parts[0].len()..].to_string());
                }
            }
            return None;
        }

        let candidates: &[String] = match parts[0] {
            "models" | "model" => &self.settings.available_models,
            "prompts" | "prompt" => &self.settings.prompt_names,
            _ => return None,
        };
        let cur = if self.command_input.ends_with(' ') || self.command_input.ends_with(',') {
            ""
        } else {
            parts
                .last()
                .and_then(|p| p.rsplit(',').next())
                .unwrap_or("")
        };
        if cur.is_empty() {
            return None;
        }
        candidates
            .iter()
            .find(|c| c.starts_with(cur) && c.as_str() != cur)
            .map(|c| c[cur.len()..].to_string())
    }

    pub fn clamp_selection(&mut self) {
        if self.selected_index >= self.jobs.len() {
            self.selected_index = self.jobs.len().saturating_sub(1);
        }
        self.job_list_state.select(Some(self.selected_index));
    }

    fn reset_command_input(&mut self) {
        self.command_input.clear();
        self.command_cursor = 0;
        self.input_mode = InputMode::Normal;
    }

    /// Parses and dispatches one command line. Returns true on quit.
    pub fn submit_command(&mut self, line: &str) -> bool {
        let cmd = AppCommand::from_str(line).unwrap_or_else(|_| AppCommand::Unknown(line.to_string()));
        match cmd {
            AppCommand::Quit => return true,
            // comments stay local until the draft is saved
            AppCommand::Comment(text) => {
                self.add_log(format!("draft comment set ({} chars)", text.chars().count()));
                self.draft_comment = text;
            }
            // job-scoped commands target the highlighted job
            AppCommand::Evaluate { scores, comments, .. } => {
                let _ = self.cmd_tx.send(AppCommand::Evaluate {
                    job_id: self.selected_job_id(),
                    scores,
                    comments,
                });
            }
            AppCommand::History { .. } => {
                let _ = self.cmd_tx.send(AppCommand::History {
                    job_id: self.selected_job_id(),
                });
            }
            other => {
                let _ = self.cmd_tx.send(other);
            }
        }
        false
    }

    /// Saves the key-driven draft for the selected job.
    pub fn submit_draft(&mut self) {
        let [Some(a), Some(b), Some(c), Some(d)] = self.draft_scores else {
            self.add_log("✗ score all four criteria before saving".to_string());
            return;
        };
        let _ = self.cmd_tx.send(AppCommand::Evaluate {
            job_id: self.selected_job_id(),
            scores: [a, b, c, d],
            comments: self.draft_comment.clone(),
        });
        self.draft_scores = [None; 4];
        self.draft_comment.clear();
    }

    fn select_view(&mut self, index: usize) {
        self.menu_selected_index = index;
        self.detail_scroll = 0;
        self.view_mode = match index {
            0 => ViewMode::Jobs,
            1 => ViewMode::Source,
            2 => ViewMode::Preview,
            _ => ViewMode::Evaluation,
        };
    }

    pub fn handle_key_event(&mut self, key: KeyCode) -> bool {
        // command line owns every key until Enter or Esc
        if self.input_mode == InputMode::Command {
            match key {
                KeyCode::Enter => {
                    let cmd_owned = self.command_input.trim().to_string();
                    self.reset_command_input();
                    if cmd_owned.is_empty() {
                        return false;
                    }
                    self.command_history.push(cmd_owned.clone());
                    self.command_history_index = None;
                    return self.submit_command(&cmd_owned);
                }
                KeyCode::Esc => {
                    self.reset_command_input();
                }
                KeyCode::Tab => {
                    if let Some(hint) = self.get_completion_hint() {
                        let insert = format!("{} ", hint);
                        self.command_input.insert_str(self.command_cursor, &insert);
                        self.command_cursor += insert.len();
                    }
                }
                // history walks backwards from the newest entry
                KeyCode::Up => {
                    if self.command_history.is_empty() {
                        return false;
                    }
                    let next = match self.command_history_index {
                        None => self.command_history.len().saturating_sub(1),
                        Some(i) => i.saturating_sub(1),
                    };
                    self.command_history_index = Some(next);
                    if let Some(cmd) = self.command_history.get(next) {
                        self.command_input = cmd.clone();
                        self.command_cursor = self.command_input.len();
                    }
                }
                KeyCode::Down => {
                    let Some(i) = self.command_history_index else {
                        return false;
                    };
                    let n = i + 1;
                    // past the newest entry: back to an empty line
                    if n >= self.command_history.len() {
                        self.command_history_index = None;
                        self.command_input.clear();
                        self.command_cursor = 0;
                        return false;
                    }
                    self.command_history_index = Some(n);
                    if let Some(cmd) = self.command_history.get(n) {
                        self.command_input = cmd.clone();
                        self.command_cursor = self.command_input.len();
                    }
                }
                // cursor is a byte offset on a char boundary
                KeyCode::Backspace => {
                    if self.command_cursor > 0 {
                        let prev = self.command_input[..self.command_cursor]
                            .char_indices()
                            .last()
                            .map(|(i, _)| i)
                            .unwrap_or(0);
                        self.command_input.remove(prev);
                        self.command_cursor = prev;
                    }
                }
                KeyCode::Delete => {
                    if self.command_cursor < self.command_input.len() {
                        self.command_input.remove(self.command_cursor);
                    }
                }
                KeyCode::Left => {
                    if let Some((i, _)) = self.command_input[..self.command_cursor].char_indices().last() {
                        self.command_cursor = i;
                    }
                }
                KeyCode::Right => {
                    if let Some(c) = self.command_input[self.command_cursor..].chars().next() {
                        self.command_cursor += c.len_utf8();
                    }
                }
                KeyCode::Home => self.command_cursor = 0,
                KeyCode::End => self.command_cursor = self.command_input.len(),
                KeyCode::Char(c) => {
                    self.command_input.insert(self.command_cursor, c);
                    self.command_cursor += c.len_utf8();
                }
                _ => {}
            }
            return false;
        }

        match key {
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Command;
                self.command_input.clear();
                self.command_cursor = 0;
            }
            KeyCode::Char('q') => return true,
            KeyCode::Left => self.focus_area = FocusArea::Menu,
            KeyCode::Right => self.focus_area = FocusArea::MainView,
            KeyCode::Up => {
                if self.focus_area == FocusArea::Menu {
                    self.menu_selected_index = self.menu_selected_index.saturating_sub(1);
                } else {
                    // rows, scroll or criterion depending on the view
                    match self.view_mode {
                        ViewMode::Jobs => {
                            if self.selected_index > 0 {
                                self.selected_index -= 1;
                            }
                        }
                        ViewMode::Source | ViewMode::Preview => {
                            self.detail_scroll = self.detail_scroll.saturating_sub(1);
                        }
                        ViewMode::Evaluation => {
                            self.draft_criterion = self.draft_criterion.saturating_sub(1);
                        }
                    }
                }
            }
            KeyCode::Down => {
                if self.focus_area == FocusArea::Menu {
                    if self.menu_selected_index < MENU_ITEMS.len() - 1 {
                        self.menu_selected_index += 1;
                    }
                } else {
                    match self.view_mode {
                        ViewMode::Jobs => {
                            if self.selected_index < self.jobs.len().saturating_sub(1) {
                                self.selected_index += 1;
                            }
                        }
                        ViewMode::Source | ViewMode::Preview => {
                            self.detail_scroll = self.detail_scroll.saturating_add(1);
                        }
                        ViewMode::Evaluation => {
                            if self.draft_criterion < 3 {
                                self.draft_criterion += 1;
                            }
                        }
                    }
                }
            }
            // open the highlighted view, or the source of the highlighted job
            KeyCode::Enter | KeyCode::Char('c') => {
                if self.focus_area == FocusArea::Menu {
                    self.select_view(self.menu_selected_index);
                    self.focus_area = FocusArea::MainView;
                } else if self.view_mode == ViewMode::Jobs && !self.jobs.is_empty() {
                    self.select_view(1);
                }
            }
            // back to the job list
            KeyCode::Char('x') => {
                if self.focus_area == FocusArea::MainView && self.view_mode != ViewMode::Jobs {
                    self.select_view(0);
                }
            }
            KeyCode::Char(d @ '1'..='5') => {
                if self.focus_area == FocusArea::MainView && self.view_mode == ViewMode::Evaluation {
                    self.draft_scores[self.draft_criterion] = d.to_digit(10).map(|v| v as u8);
                    // advance to the next criterion
                    if self.draft_criterion < 3 {
                        self.draft_criterion += 1;
                    }
                }
            }
            KeyCode::Char('s') => {
                if self.focus_area == FocusArea::MainView && self.view_mode == ViewMode::Evaluation {
                    self.submit_draft();
                }
            }
            _ => {}
        }
        false
    }
}

pub fn status_symbol(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "○",
        JobStatus::Running => "▶",
        JobStatus::Done => "✓",
        JobStatus::Error => "✗",
    }
}
