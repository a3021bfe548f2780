mod ai;
mod app_service;
mod app_state;
mod batch;
mod commands;
mod config;
mod evaluation;
mod generate;
mod storage;
mod ui;

use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{info, warn};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::app_service::{ollama_factory, refresh_ui, Workbench};
use crate::app_state::{App, AppEvent};
use crate::batch::BatchSlot;
use crate::commands::AppCommand;
use crate::config::AppConfig;
use crate::generate::PromptLibrary;
use crate::ui::draw;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // .env before config so its values count as environment
    let env_loaded = dotenv::dotenv().is_ok();
    let config = AppConfig::from_env();

    // the terminal belongs to the TUI, logs go to a file
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let log_dir = config.logs_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = std::fs::File::create(log_dir.join(format!("app-{}.log", ts)))?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Warn)
        .filter_module("modelbench", log::LevelFilter::Info)
        .init();

    let mut startup_info = Vec::new();
    if env_loaded {
        startup_info.push("✓ loaded .env".to_string());
    }
    startup_info.push(format!("data dir: {}", config.data_dir.display()));

    let prompts = match PromptLibrary::load(&config.prompts_path) {
        Ok(lib) if lib.is_empty() => {
            warn!("no prompt templates in {}", config.prompts_path.display());
            startup_info.push(format!(
                "⚠ no prompt templates in {}, only manual prompts",
                config.prompts_path.display()
            ));
            lib
        }
        Ok(lib) => {
            startup_info.push(format!(
                "✓ {} prompt templates from {}",
                lib.len(),
                config.prompts_path.display()
            ));
            lib
        }
        // keep going; the manual prompt still works
        Err(e) => {
            warn!("prompt templates unavailable: {}", e);
            startup_info.push(format!("⚠ {}: {}", config.prompts_path.display(), e));
            PromptLibrary::default()
        }
    };

    // UI -> actor commands, actor -> UI events
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<AppCommand>();
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<AppEvent>();
    let slot = Arc::new(BatchSlot::new());

    let mut workbench = Workbench::new(
        config,
        prompts,
        slot.clone(),
        ollama_factory(),
        evt_tx.clone(),
    );
    startup_info.push(format!("Ollama URL: {}", workbench.settings_view().base_url));
    info!("starting with {:?}", workbench.settings_view());

    // poll the current batch even when no job changes state
    {
        let slot = slot.clone();
        let tx = evt_tx.clone();
        tokio::spawn(async move {
            loop {
                refresh_ui(&slot, &tx);
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        });
    }

    // actor: commands are handled one at a time, discovery first
    tokio::spawn(async move {
        workbench.handle(AppCommand::Discover).await;
        while let Some(cmd) = cmd_rx.recv().await {
            workbench.handle(cmd).await;
        }
    });

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(startup_info, cmd_tx, evt_rx);
    let res = match app.evt_rx.take() {
        Some(rx) => run_app_loop(&mut terminal, &mut app, rx).await,
        None => Ok(()),
    };

    // restore the terminal before reporting any loop error
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

async fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut evt_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| draw(f, app))?;

        // drain everything queued since the last frame
        while let Ok(event) = evt_rx.try_recv() {
            app.apply_event(event);
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key_event(key.code) {
                    return Ok(());
                }
            }
        }
    }
}
