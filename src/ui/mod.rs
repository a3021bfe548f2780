use crate::app_state::{status_symbol, App, FocusArea, InputMode, ViewMode, MENU_ITEMS};
use crate::batch::{Job, JobStatus};
use crate::evaluation::scales;
use crate::generate::parser::html_to_text;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

const GENERATING: &str = "Generating…";

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length(4), // header
            Constraint::Min(0),    // menu + main view
            Constraint::Min(8),    // command line + log
        ])
        .split(f.size());

    render_top_bar(f, chunks[0], app);

    let middle_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Length(20), Constraint::Min(0)])
        .split(chunks[1]);

    render_left_menu(f, middle_chunks[0], app);
    render_main_view(f, middle_chunks[1], app);
    render_bottom_bar(f, chunks[2], app);
}

fn pane(title: String, focused: bool) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .style(if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::White)
        })
}

fn status_color(status: JobStatus) -> Color {
    match status {
        JobStatus::Pending => Color::Yellow,
        JobStatus::Running => Color::Cyan,
        JobStatus::Done => Color::Green,
        JobStatus::Error => Color::Red,
    }
}

fn render_top_bar(f: &mut Frame, area: Rect, app: &App) {
    let s = &app.settings;
    let stats = &app.batch_stats;
    let manual = match &s.manual_prompt {
        Some(_) => " +manual",
        None => "",
    };
    let lines = vec![
        Line::from(vec![
            Span::styled(
                " modelbench ",
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" {}", s.base_url)),
            Span::styled(
                format!(
                    "   jobs {} | pending {} | running {} | done {} | error {}",
                    stats.total, stats.pending, stats.running, stats.done, stats.error
                ),
                Style::default().fg(Color::Gray),
            ),
        ]),
        Line::from(vec![
            Span::styled(" models: ", Style::default().fg(Color::Yellow)),
            Span::raw(s.selected_models.join(", ")),
            Span::styled("  prompts: ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{}{}", s.selected_prompts.join(", "), manual)),
        ]),
    ];

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(paragraph, area);
}

fn render_left_menu(f: &mut Frame, area: Rect, app: &App) {
    let menu_items: Vec<ListItem> = MENU_ITEMS
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let is_selected = i == app.menu_selected_index;
            let is_active = matches!(
                (i, &app.view_mode),
                (0, ViewMode::Jobs)
                    | (1, ViewMode::Source)
                    | (2, ViewMode::Preview)
                    | (3, ViewMode::Evaluation)
            );

            let style = if is_selected {
                if app.focus_area == FocusArea::Menu {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                }
            } else if is_active {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };

            let prefix = if is_active { "● " } else { "○ " };
            ListItem::new(format!("{}{}", prefix, text)).style(style)
        })
        .collect();

    let title = if app.focus_area == FocusArea::Menu {
        "Menu (Enter/c)"
    } else {
        "Menu (← focus)"
    };
    let menu = List::new(menu_items).block(pane(title.to_string(), app.focus_area == FocusArea::Menu));
    f.render_widget(menu, area);
}

fn job_header(job: &Job) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{} {}", status_symbol(job.status()), job.status()),
            Style::default().fg(status_color(job.status())),
        ),
        Span::raw(format!(
            "  {} · {} · {}",
            job.short_id(),
            job.model(),
            job.prompt_name()
        )),
    ])
}

fn render_main_view(f: &mut Frame, area: Rect, app: &mut App) {
    let focused = app.focus_area == FocusArea::MainView;
    match app.view_mode {
        ViewMode::Jobs => {
            let items: Vec<ListItem> = app
                .jobs
                .iter()
                .map(|job| {
                    let color = status_color(job.status());
                    // error rows show the failure reason in place of stats
                    let stats = match job.status() {
                        JobStatus::Done => job.stats().to_string(),
                        JobStatus::Error => job.raw_output().unwrap_or_default().to_string(),
                        _ => String::new(),
                    };
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!("{} {:<8}", status_symbol(job.status()), job.status().as_str()),
                            Style::default().fg(color),
                        ),
                        Span::raw(format!(
                            "{:<9} {:<24} {:<16} ",
                            job.short_id(),
                            job.model(),
                            job.prompt_name()
                        )),
                        Span::styled(stats, Style::default().fg(Color::Gray)),
                    ]))
                })
                .collect();

            let title = if focused {
                format!("Jobs ({}) ↑↓ select, Enter source, ← menu", app.jobs.len())
            } else {
                format!("Jobs ({})", app.jobs.len())
            };
            let list = List::new(items)
                .block(pane(title, focused))
                .highlight_style(
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::White)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol(">> ");
            // keep the widget state in step with key handling
            app.job_list_state.select(Some(app.selected_index));
            f.render_stateful_widget(list, area, &mut app.job_list_state);
        }
        ViewMode::Source => {
            let lines: Vec<Line> = match app.selected_job() {
                None => vec![Line::from("No generation selected.")],
                Some(job) => {
                    let mut lines = vec![job_header(job), Line::from("")];
                    match (job.status(), job.html_output()) {
                        // raw source, no highlighting
                        (JobStatus::Done, Some(html)) => {
                            lines.extend(html.lines().map(|l| Line::from(l.to_string())));
                        }
                        (JobStatus::Error, _) => lines.push(Line::from(Span::styled(
                            job.raw_output().unwrap_or_default().to_string(),
                            Style::default().fg(Color::Red),
                        ))),
                        _ => lines.push(Line::from(GENERATING)),
                    }
                    lines
                }
            };
            let title = if focused {
                "HTML Source (↑↓ scroll, x back)"
            } else {
                "HTML Source"
            };
            let paragraph = Paragraph::new(lines)
                .block(pane(title.to_string(), focused))
                .scroll((app.detail_scroll, 0));
            f.render_widget(paragraph, area);
        }
        ViewMode::Preview => {
            let lines: Vec<Line> = match app.selected_job() {
                None => vec![Line::from("No generation selected.")],
                Some(job) => {
                    let mut lines = vec![job_header(job)];
                    match (job.preview_url(), job.html_output()) {
                        (Some(url), Some(html)) => {
                            lines.push(Line::from(Span::styled(
                                url.to_string(),
                                Style::default()
                                    .fg(Color::Blue)
                                    .add_modifier(Modifier::UNDERLINED),
                            )));
                            lines.push(Line::from(""));
                            // no browser here, text only
                            lines.extend(html_to_text(html).lines().map(|l| Line::from(l.to_string())));
                        }
                        _ if job.status() == JobStatus::Error => lines.push(Line::from(
                            Span::styled(
                                job.raw_output().unwrap_or_default().to_string(),
                                Style::default().fg(Color::Red),
                            ),
                        )),
                        _ => lines.push(Line::from(GENERATING)),
                    }
                    lines
                }
            };
            let title = if focused {
                "Preview (↑↓ scroll, x back)"
            } else {
                "Preview"
            };
            let paragraph = Paragraph::new(lines)
                .block(pane(title.to_string(), focused))
                .wrap(Wrap { trim: false })
                .scroll((app.detail_scroll, 0));
            f.render_widget(paragraph, area);
        }
        ViewMode::Evaluation => {
            let mut lines = match app.selected_job() {
                Some(job) => vec![job_header(job), Line::from("")],
                None => vec![Line::from("No generation to evaluate."), Line::from("")],
            };
            for (i, scale) in scales::ALL.iter().enumerate() {
                let current = i == app.draft_criterion;
                let marker = if current { "▸ " } else { "  " };
                let title_style = if current {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::White)
                };
                let picked = app.draft_scores[i]
                    .and_then(|s| scale.label(s))
                    .unwrap_or("—");
                lines.push(Line::from(vec![
                    Span::styled(format!("{}{:<20}", marker, scale.title), title_style),
                    Span::styled(picked, Style::default().fg(Color::Green)),
                ]));
                // levels only for the criterion being scored
                if current {
                    for level in scale.levels {
                        lines.push(Line::from(Span::styled(
                            format!("      {}", level),
                            Style::default().fg(Color::Gray),
                        )));
                    }
                }
            }
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled("  Comments: ", Style::default().fg(Color::Yellow)),
                Span::raw(app.draft_comment.clone()),
            ]));
            lines.push(Line::from(Span::styled(
                "  1-5 score · ↑↓ criterion · s save · /comment <text> · /eval a b c d [text]",
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::ITALIC),
            )));

            let paragraph = Paragraph::new(lines).block(pane("Evaluation".to_string(), focused));
            f.render_widget(paragraph, area);
        }
    }
}

fn render_bottom_bar(f: &mut Frame, area: Rect, app: &App) {
    let bottom_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let command_prompt = if app.input_mode == InputMode::Command {
        let mut spans = vec![Span::styled(
            "cmd: ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )];
        // cursor drawn as an underscore between the two halves
        let cur = app.command_cursor.min(app.command_input.len());
        let (left, right) = app.command_input.split_at(cur);
        spans.push(Span::raw(left));
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(right));

        // dimmed Tab completion
        if let Some(hint) = app.get_completion_hint() {
            spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
        }
        Line::from(spans)
    } else {
        Line::from(vec![
            Span::styled("cmd: ", Style::default().fg(Color::Yellow)),
            Span::raw("/ command  ←→ focus  ↑↓ move  Enter/c open  x back  q quit"),
        ])
    };
    let command_paragraph = Paragraph::new(command_prompt).block(
        Block::default()
            .borders(Borders::ALL)
            .title(if app.input_mode == InputMode::Command {
                "Command (Enter run, Esc cancel, Tab complete)"
            } else {
                "Command"
            })
            .style(if app.input_mode == InputMode::Command {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            }),
    );
    f.render_widget(command_paragraph, bottom_chunks[0]);

    let log_items: Vec<ListItem> = app
        .log_messages
        .iter()
        // newest first
        .rev()
        .take(20)
        .map(|msg| {
            let style = if msg.starts_with('✓') {
                Style::default().fg(Color::Green)
            } else if msg.starts_with('✗') {
                Style::default().fg(Color::Red)
            } else if msg.starts_with('⚠') {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(msg.as_str()).style(style)
        })
        .collect();

    let log = List::new(log_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Log ({})", app.log_messages.len()))
            .style(Style::default().fg(Color::White)),
    );
    f.render_widget(log, bottom_chunks[1]);
}
