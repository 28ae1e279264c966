mod charts;
mod help;
mod state;

use crate::cli::Cli;
use crate::model::{ControllerEvent, Severity};
use crate::orchestrator::{self, RunController, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
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
use state::{FormField, UiState, TAB_ABOUT, TAB_DASHBOARD, TAB_HELP};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure and task switching in the hot path.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<ControllerEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let settings = crate::cli::build_settings(&args)?;
    let controller =
        RunController::new(settings, event_tx).context("failed to create engine client")?;

    if args.start_on_launch {
        let _ = cmd_tx.send(UiCommand::Start(crate::cli::build_form(&args)));
    }

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

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

/// Outcome of a key press.
#[derive(Debug)]
enum KeyAction {
    None,
    Send(UiCommand),
    Quit,
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<ControllerEvent>,
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
        form: crate::cli::build_form(&args),
        engine_url: args.engine_url.clone(),
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.dashboard.apply(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            let now = Instant::now();
            if state.tab == TAB_ABOUT {
                state.tick_about(now);
            }
            terminal.draw(|f| draw(f.area(), f, &state, now)).ok();
            last_tick = now;
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match handle_key(&mut state, k, Instant::now()) {
                    KeyAction::None => {}
                    KeyAction::Send(cmd) => {
                        let _ = cmd_tx.send(cmd);
                    }
                    KeyAction::Quit => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn handle_key(state: &mut UiState, k: KeyEvent, now: Instant) -> KeyAction {
    if let Some(field) = state.editing {
        match k.code {
            KeyCode::Enter | KeyCode::Esc => {
                state.editing = None;
                state.info = "Form updated".into();
            }
            KeyCode::Tab | KeyCode::Down => state.editing = Some(field.next()),
            KeyCode::BackTab | KeyCode::Up => state.editing = Some(field.prev()),
            KeyCode::Backspace => state.backspace(),
            KeyCode::Char('c') if k.modifiers.contains(KeyModifiers::CONTROL) => {
                return KeyAction::Quit;
            }
            KeyCode::Char(c) => state.type_char(c),
            _ => {}
        }
        return KeyAction::None;
    }

    let controls = state.dashboard.controls();
    match (k.modifiers, k.code) {
        (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => KeyAction::Quit,
        (_, KeyCode::Char('s')) => {
            if controls.start_enabled {
                state.info.clear();
                KeyAction::Send(UiCommand::Start(state.form.clone()))
            } else {
                state.info = "Start is unavailable while a test is active".into();
                KeyAction::None
            }
        }
        (_, KeyCode::Char('p')) => {
            if controls.pause_enabled {
                KeyAction::Send(UiCommand::PauseResume)
            } else {
                state.info = "No running test to pause".into();
                KeyAction::None
            }
        }
        (_, KeyCode::Char('x')) => {
            if controls.stop_enabled {
                KeyAction::Send(UiCommand::Stop)
            } else {
                state.info = "No running test to stop".into();
                KeyAction::None
            }
        }
        (_, KeyCode::Char('u')) => {
            if state.dashboard.busy {
                state.info = "Waiting for the engine...".into();
                KeyAction::None
            } else {
                KeyAction::Send(UiCommand::UpdateConfig {
                    users: state.form.users.clone(),
                    duration: state.form.duration.clone(),
                })
            }
        }
        (_, KeyCode::Char('d')) => {
            if controls.report_enabled {
                KeyAction::Send(UiCommand::DownloadReport)
            } else {
                state.info = "Report is available once a test has finished".into();
                KeyAction::None
            }
        }
        (_, KeyCode::Char('c')) => KeyAction::Send(UiCommand::ClearLog),
        (_, KeyCode::Char('e')) => {
            state.tab = TAB_DASHBOARD;
            state.editing = Some(FormField::TargetUrl);
            state.info = "Editing form (enter/esc to finish)".into();
            KeyAction::None
        }
        (_, KeyCode::Tab) => {
            let new_tab = (state.tab + 1) % 3;
            if new_tab == TAB_ABOUT {
                state.open_about(now);
            } else {
                state.tab = new_tab;
            }
            KeyAction::None
        }
        (_, KeyCode::Char('?')) => {
            state.tab = TAB_HELP;
            KeyAction::None
        }
        _ => KeyAction::None,
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, now: Instant) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Dashboard"),
        Line::from("About"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("stress-console"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_DASHBOARD => draw_dashboard(chunks[1], f, state, now),
        TAB_ABOUT => draw_about(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, state: &UiState, now: Instant) {
    let progress = state.dashboard.progress_at(now);

    let mut rows = vec![
        Constraint::Length(8), // Form + counters
        Constraint::Length(12), // Response chart + distribution
    ];
    if progress.is_some() {
        rows.push(Constraint::Length(3));
    }
    rows.push(Constraint::Min(3)); // Event log
    rows.push(Constraint::Length(3)); // Controls / info

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(rows)
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(main[0]);
    draw_form(top[0], f, state);
    draw_counters(top[1], f, state);

    let mid = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)].as_ref())
        .split(main[1]);
    charts::render_response_chart(f, mid[0], &state.dashboard);
    charts::render_distribution(f, mid[1], &state.dashboard);

    let mut next = 2;
    if let Some(p) = progress.as_ref() {
        charts::render_progress(f, main[next], p);
        next += 1;
    }
    draw_log(main[next], f, state);
    draw_controls(main[next + 1], f, state);
}

fn draw_form(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines = Vec::new();
    for field in FormField::ALL {
        let focused = state.editing == Some(field);
        let value = state.field(field);
        let value_style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let cursor = if focused { "_" } else { "" };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<13}", field.label()), Style::default().fg(Color::Gray)),
            Span::styled(format!("{value}{cursor}"), value_style),
        ]));
    }
    state::push_wrapped_status_kv(&mut lines, "Engine", &state.engine_url, area.width);

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Run"));
    f.render_widget(p, area);
}

fn draw_counters(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let d = &state.dashboard;
    let status_color = match d.status {
        crate::model::RunStatus::Running => Color::Green,
        crate::model::RunStatus::Paused => Color::Yellow,
        crate::model::RunStatus::Stopped => Color::Red,
        crate::model::RunStatus::Idle => Color::Gray,
    };
    let gray = Style::default().fg(Color::Gray);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Status:   ", gray),
            Span::styled(d.status.label(), Style::default().fg(status_color)),
            Span::raw(if d.busy { "  (waiting for engine)" } else { "" }),
        ]),
        Line::from(vec![
            Span::styled("Total:    ", gray),
            Span::raw(d.total_requests.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Success:  ", gray),
            Span::styled(d.successful_requests.to_string(), Style::default().fg(Color::Green)),
        ]),
        Line::from(vec![
            Span::styled("Failed:   ", gray),
            Span::styled(d.failed_requests.to_string(), Style::default().fg(Color::Red)),
        ]),
        Line::from(vec![
            Span::styled("Average:  ", gray),
            Span::raw(d.average_display()),
        ]),
    ];
    if let Some(path) = d.last_report.as_ref() {
        lines.push(Line::from(vec![
            Span::styled("Report:   ", gray),
            Span::raw(path.display().to_string()),
        ]));
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Stats"));
    f.render_widget(p, area);
}

fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::Info => Style::default().fg(Color::Gray),
        Severity::Success => Style::default().fg(Color::Green),
        Severity::Warning => Style::default().fg(Color::Yellow),
        Severity::Error => Style::default().fg(Color::Red),
    }
}

fn draw_log(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    // newest entries at the bottom; show as many as fit
    let visible = area.height.saturating_sub(2) as usize;
    let log = &state.dashboard.log;
    let lines: Vec<Line> = log[log.len().saturating_sub(visible)..]
        .iter()
        .map(|e| {
            Line::from(vec![
                Span::styled(format!("[{}] ", e.clock()), Style::default().fg(Color::DarkGray)),
                Span::styled(e.message.clone(), severity_style(e.severity)),
            ])
        })
        .collect();
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Log"));
    f.render_widget(p, area);
}

fn draw_controls(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let c = state.dashboard.controls();
    let key = |k: &'static str, label: &'static str, enabled: bool| {
        let (ks, ls) = if enabled {
            (Style::default().fg(Color::Magenta), Style::default())
        } else {
            (
                Style::default().fg(Color::DarkGray),
                Style::default().fg(Color::DarkGray),
            )
        };
        vec![
            Span::styled(k, ks),
            Span::raw(" "),
            Span::styled(label, ls),
            Span::raw("  "),
        ]
    };
    let mut spans = Vec::new();
    spans.extend(key("s", "Start", c.start_enabled));
    spans.extend(key("p", c.pause_label, c.pause_enabled));
    spans.extend(key("x", "Stop", c.stop_enabled));
    spans.extend(key("d", "Report", c.report_enabled));
    spans.extend(key("e", "Edit", state.editing.is_none()));
    spans.extend(key("c", "Clear log", true));
    if !state.info.is_empty() {
        spans.push(Span::styled(
            format!("| {}", state.info),
            Style::default().fg(Color::Cyan),
        ));
    }
    let p = Paragraph::new(Line::from(spans))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(p, area);
}

fn draw_about(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines = vec![
        Line::from("stress-console drives a remote load-test engine over HTTP."),
        Line::from("Configure a run, start it, and watch results arrive once per poll."),
        Line::from(""),
    ];
    for c in &state.about {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:>12}", c.display()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(c.label.clone(), Style::default().fg(Color::Gray)),
        ]));
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("About"));
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunStatus;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn start_sends_current_form() {
        let mut s = UiState::default();
        s.form.target_url = "http://localhost:3000".into();
        match handle_key(&mut s, press(KeyCode::Char('s')), Instant::now()) {
            KeyAction::Send(UiCommand::Start(form)) => {
                assert_eq!(form.target_url, "http://localhost:3000")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn disabled_controls_send_nothing() {
        let mut s = UiState::default();
        assert!(matches!(
            handle_key(&mut s, press(KeyCode::Char('x')), Instant::now()),
            KeyAction::None
        ));
        s.dashboard.apply(ControllerEvent::StatusChanged(RunStatus::Running));
        s.dashboard.apply(ControllerEvent::Busy(true));
        assert!(matches!(
            handle_key(&mut s, press(KeyCode::Char('p')), Instant::now()),
            KeyAction::None
        ));
        assert!(matches!(
            handle_key(&mut s, press(KeyCode::Char('s')), Instant::now()),
            KeyAction::None
        ));
        s.dashboard.apply(ControllerEvent::Busy(false));
        assert!(matches!(
            handle_key(&mut s, press(KeyCode::Char('p')), Instant::now()),
            KeyAction::Send(UiCommand::PauseResume)
        ));
    }

    #[test]
    fn editing_captures_keys() {
        let mut s = UiState::default();
        handle_key(&mut s, press(KeyCode::Char('e')), Instant::now());
        assert_eq!(s.editing, Some(FormField::TargetUrl));
        // 's' and 'q' are text while editing
        handle_key(&mut s, press(KeyCode::Char('s')), Instant::now());
        assert!(matches!(
            handle_key(&mut s, press(KeyCode::Char('q')), Instant::now()),
            KeyAction::None
        ));
        assert_eq!(s.form.target_url, "sq");
        handle_key(&mut s, press(KeyCode::Tab), Instant::now());
        assert_eq!(s.editing, Some(FormField::Users));
        handle_key(&mut s, press(KeyCode::Esc), Instant::now());
        assert_eq!(s.editing, None);
    }

    #[test]
    fn tab_cycles_and_opens_about() {
        let mut s = UiState::default();
        handle_key(&mut s, press(KeyCode::Tab), Instant::now());
        assert_eq!(s.tab, TAB_ABOUT);
        assert_eq!(s.about.len(), 3);
        handle_key(&mut s, press(KeyCode::Tab), Instant::now());
        assert_eq!(s.tab, TAB_HELP);
        handle_key(&mut s, press(KeyCode::Tab), Instant::now());
        assert_eq!(s.tab, TAB_DASHBOARD);
    }

    #[test]
    fn quit_keys() {
        let mut s = UiState::default();
        assert!(matches!(
            handle_key(&mut s, press(KeyCode::Char('q')), Instant::now()),
            KeyAction::Quit
        ));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(matches!(handle_key(&mut s, ctrl_c, Instant::now()), KeyAction::Quit));
    }
}
