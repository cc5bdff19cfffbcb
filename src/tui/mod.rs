mod charts;
mod export;
mod help;
mod state;

use crate::cli::Cli;
use crate::model::{DashboardEvent, DashboardSnapshot, JobPhase, Post, MAX_POLLS};
use crate::orchestrator::{self, UiCommand};
use crate::view::format_score;
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{
    apply_event, label_color, next_ticker, phase_color, push_wrapped_status_kv, UiState,
    TAB_COUNT, TAB_HELP, TAB_POSTS, TAB_SUMMARY,
};
use std::{io, rc::Rc, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels keep the controller from ever blocking on the UI.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<DashboardEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let controller = crate::cli::build_controller(&args)?.with_events(event_tx);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(event_rx, cmd_tx));

    let res = orchestrator::run_controller(controller, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    mut event_rx: UnboundedReceiver<DashboardEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        info: "Loading results…".into(),
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &mut state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if let (KeyModifiers::CONTROL, KeyCode::Char('c')) = (k.modifiers, k.code) {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
                if state.query_editing {
                    handle_query_key(&mut state, &cmd_tx, k.code);
                    continue;
                }
                match k.code {
                    KeyCode::Char('q') => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyCode::Char('/') => {
                        state.query_editing = true;
                        state.query_input = state
                            .snapshot
                            .as_ref()
                            .map(|s| s.filter.query.clone())
                            .unwrap_or_default();
                        state.tab = TAB_POSTS;
                    }
                    KeyCode::Char('l') => {
                        if let Some(s) = state.snapshot.as_ref() {
                            let _ = cmd_tx.send(UiCommand::SetLabel(s.filter.label.next()));
                        }
                    }
                    KeyCode::Char('t') => {
                        if let Some(s) = state.snapshot.as_ref() {
                            let next = next_ticker(&s.filter.ticker, &s.available_tickers);
                            let _ = cmd_tx.send(UiCommand::SetTicker(next));
                        }
                    }
                    KeyCode::Char('s') => {
                        if let Some(s) = state.snapshot.as_ref() {
                            let _ = cmd_tx.send(UiCommand::SetSort(s.sort.next()));
                        }
                    }
                    KeyCode::Char('a') => {
                        if state.job_phase().is_busy() {
                            state.info = "Analysis already in progress".into();
                        } else {
                            state.info = "Starting analysis…".into();
                            let _ = cmd_tx.send(UiCommand::Analyze);
                        }
                    }
                    KeyCode::Char('r') => {
                        state.info = "Reloading results…".into();
                        let _ = cmd_tx.send(UiCommand::Reload);
                    }
                    KeyCode::Char('e') => {
                        export::export_and_show_path(&mut state, "JSON", export::export_view_json);
                    }
                    KeyCode::Char('c') => {
                        export::export_and_show_path(&mut state, "CSV", export::export_view_csv);
                    }
                    KeyCode::Tab => {
                        state.tab = (state.tab + 1) % TAB_COUNT;
                    }
                    KeyCode::Char('?') => {
                        state.tab = TAB_HELP;
                    }
                    KeyCode::Up | KeyCode::Char('k') => {
                        if state.tab == TAB_POSTS {
                            state.select_prev();
                        }
                    }
                    KeyCode::Down | KeyCode::Char('j') => {
                        if state.tab == TAB_POSTS {
                            state.select_next();
                        }
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Keys while the search box has focus. Every edit is sent, so the list filters as you type.
fn handle_query_key(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>, code: KeyCode) {
    match code {
        KeyCode::Enter => {
            state.query_editing = false;
        }
        KeyCode::Esc => {
            state.query_editing = false;
            state.query_input.clear();
            let _ = cmd_tx.send(UiCommand::SetQuery(String::new()));
        }
        KeyCode::Backspace => {
            state.query_input.pop();
            let _ = cmd_tx.send(UiCommand::SetQuery(state.query_input.clone()));
        }
        KeyCode::Char(c) => {
            state.query_input.push(c);
            let _ = cmd_tx.send(UiCommand::SetQuery(state.query_input.clone()));
        }
        _ => {}
    }
}

fn frame_layout(area: Rect) -> Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area)
}

fn posts_layout(area: Rect, has_advisory: bool) -> Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(if has_advisory { 3 } else { 0 }),
                Constraint::Length(3), // Filter/sort header
                Constraint::Min(3),    // Post list
                Constraint::Length(8), // Selected post details
                Constraint::Length(3), // Status row
            ]
            .as_ref(),
        )
        .split(area)
}

/// Post rows that fit inside the bordered list for a full frame of this size.
fn visible_list_rows(area: Rect, has_advisory: bool) -> usize {
    let list = posts_layout(frame_layout(area)[1], has_advisory)[2];
    list.height.saturating_sub(2) as usize
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &mut UiState) {
    let has_advisory = state
        .snapshot
        .as_ref()
        .is_some_and(|s| s.advisory.is_some());
    state.set_list_rows(visible_list_rows(area, has_advisory));
    let state = &*state;

    let chunks = frame_layout(area);

    let tabs = Tabs::new(vec![
        Line::from("Posts"),
        Line::from("Summary"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("sentiment-dash"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_POSTS => draw_posts(chunks[1], f, state),
        TAB_SUMMARY => charts::draw_summary(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}

fn draw_posts(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let advisory = state.snapshot.as_ref().and_then(|s| s.advisory.as_deref());
    let main = posts_layout(area, advisory.is_some());

    if let Some(advisory) = advisory {
        let banner = Paragraph::new(advisory.to_string())
            .style(Style::default().fg(Color::Yellow))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Notice"));
        f.render_widget(banner, main[0]);
    }

    draw_filter_header(main[1], f, state);

    match state.snapshot.as_ref() {
        Some(snapshot) => {
            draw_post_list(main[2], f, state, snapshot);
            draw_post_detail(main[3], f, snapshot.view.get(state.selected));
        }
        None => {
            f.render_widget(
                Paragraph::new("Loading…").block(Block::default().borders(Borders::ALL)),
                main[2],
            );
        }
    }

    draw_status(main[4], f, state);
}

fn draw_filter_header(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Magenta));
    let mut spans = vec![key("/"), Span::raw(" Search: ")];
    if state.query_editing {
        spans.push(Span::styled(
            format!("{}▏", state.query_input),
            Style::default().fg(Color::Yellow),
        ));
    } else {
        let q = state
            .snapshot
            .as_ref()
            .map(|s| s.filter.query.as_str())
            .unwrap_or("");
        spans.push(Span::raw(if q.is_empty() { "-" } else { q }.to_string()));
    }
    if let Some(s) = state.snapshot.as_ref() {
        spans.extend([
            Span::raw("  "),
            key("l"),
            Span::raw(" Label: "),
            Span::styled(
                s.filter.label.as_str(),
                Style::default().fg(label_color(s.filter.label.as_str())),
            ),
            Span::raw("  "),
            key("t"),
            Span::raw(" Ticker: "),
            Span::raw(if s.filter.ticker.is_empty() {
                "all".to_string()
            } else {
                s.filter.ticker.clone()
            }),
            Span::raw("  "),
            key("s"),
            Span::raw(" Sort: "),
            Span::raw(s.sort.label()),
        ]);
    }
    let p = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_post_list(
    area: Rect,
    f: &mut ratatui::Frame,
    state: &UiState,
    snapshot: &DashboardSnapshot,
) {
    let title = format!(
        "Posts ({} of {}){}",
        snapshot.view.len(),
        snapshot.total,
        if snapshot.loading { " loading…" } else { "" }
    );
    let block = Block::default().borders(Borders::ALL).title(title);

    if snapshot.view.is_empty() {
        let msg = if snapshot.loading {
            "Loading…"
        } else {
            "No posts match your filters."
        };
        f.render_widget(Paragraph::new(msg).block(block), area);
        return;
    }

    let rows = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = snapshot
        .view
        .iter()
        .enumerate()
        .skip(state.scroll_offset)
        .take(rows)
        .map(|(i, p)| post_line(p, i == state.selected))
        .collect();
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn post_line(p: &Post, selected: bool) -> Line<'static> {
    let label = p.display_label();
    let color = label_color(&label);
    let mut spans = vec![
        Span::raw(if selected { "▶ " } else { "  " }),
        Span::styled(format!("{label:<7}"), Style::default().fg(color)),
        Span::raw(" "),
        Span::styled(
            format!("{:>6}", format_score(p.compound)),
            Style::default().fg(color),
        ),
        Span::raw("  "),
        Span::raw(p.title.clone()),
    ];
    if !p.tickers.is_empty() {
        spans.push(Span::styled(
            format!("  {}", p.tickers.join(" ")),
            Style::default().fg(Color::Cyan),
        ));
    }
    let line = Line::from(spans);
    if selected {
        line.style(Style::default().add_modifier(Modifier::BOLD))
    } else {
        line
    }
}

fn draw_post_detail(area: Rect, f: &mut ratatui::Frame, post: Option<&Post>) {
    let block = Block::default().borders(Borders::ALL).title("Details");
    let Some(p) = post else {
        f.render_widget(Paragraph::new("").block(block), area);
        return;
    };
    let mut lines = Vec::new();
    push_wrapped_status_kv(&mut lines, "Title", &p.title, area.width);
    let parts: Vec<String> = [("pos", p.pos), ("neu", p.neu), ("neg", p.neg)]
        .iter()
        .filter_map(|(name, v)| v.map(|v| format!("{name} {v:.3}")))
        .collect();
    push_wrapped_status_kv(
        &mut lines,
        "Score",
        &format!("{} {}", format_score(p.compound), parts.join(" ")),
        area.width,
    );
    if let Some(features) = p.features.as_ref() {
        let mut parts = Vec::new();
        if let Some(v) = features.emoji_count {
            parts.push(format!("emoji {v}"));
        }
        if let Some(v) = features.caps_ratio {
            parts.push(format!("caps {:.0}%", v * 100.0));
        }
        if let Some(v) = features.len_tokens {
            parts.push(format!("tokens {v}"));
        }
        push_wrapped_status_kv(&mut lines, "Features", &parts.join(", "), area.width);
    }
    if let Some(link) = p.permalink.as_deref() {
        push_wrapped_status_kv(&mut lines, "Link", link, area.width);
    }
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn job_summary(state: &UiState) -> Span<'static> {
    let Some(job) = state.snapshot.as_ref().map(|s| &s.job) else {
        return Span::raw("");
    };
    let text = match job.phase {
        JobPhase::Idle => "Analysis: idle".to_string(),
        JobPhase::Starting => "Analysis: starting…".to_string(),
        JobPhase::Running => format!("Analysis: running (poll {}/{MAX_POLLS})", job.polls),
        JobPhase::Succeeded => format!(
            "Analysis: done{}",
            job.last_completed_at
                .as_deref()
                .map(|t| format!(" ({t})"))
                .unwrap_or_default()
        ),
        JobPhase::Failed | JobPhase::TimedOut => format!(
            "Analysis: {}",
            job.error_message.as_deref().unwrap_or("failed")
        ),
    };
    Span::styled(text, Style::default().fg(phase_color(job.phase)))
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let line = Line::from(vec![
        job_summary(state),
        Span::raw("  "),
        Span::styled(state.info.clone(), Style::default().fg(Color::Gray)),
    ]);
    let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(Line::from(
        vec![
            Span::raw("Status  "),
            Span::styled("a", Style::default().fg(Color::Magenta)),
            Span::raw(" analyze  "),
            Span::styled("?", Style::default().fg(Color::Magenta)),
            Span::raw(" help"),
        ],
    )));
    f.render_widget(p, area);
}
