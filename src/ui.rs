use crate::client::{
    AppSnapshot,
    HistoryEntry,
};
use color_eyre::eyre::Result;
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use itertools::Itertools;
use ratatui::{
    prelude::*,
    widgets::*,
};
use roll_under::{
    Phase,
    WinStatus,
    presentation::DieFace,
};
use std::io::{
    Write,
    stdout,
};
use unicode_width::UnicodeWidthStr;

/// Wagers are entered and shown in whole units of this many base units.
const DECIMAL_PLACES: u32 = 6;
const SPIN_FACES: [u8; 6] = [1, 4, 2, 6, 3, 5];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserEvent {
    Quit,
    ThresholdUp,
    ThresholdDown,
    ThresholdUpCoarse,
    ThresholdDownCoarse,
    Play,
    OpenWagerModal,
    SetWager(u64),
    Redraw,
}

#[derive(Default)]
pub struct UiState {
    mode: Mode,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    WagerModal(WagerState),
    QuitModal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct WagerState {
    units: u64,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(stdout(), crossterm::terminal::EnterAlternateScreen)?;
    // one persistent Terminal so buffers survive between draws
    let backend = CrosstermBackend::new(stdout());
    state.terminal = Some(Terminal::new(backend)?);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn ring_bell() -> Result<()> {
    let mut out = stdout();
    out.write_all(b"\x07")?;
    out.flush()?;
    Ok(())
}

pub fn input_event_stream() -> EventStream {
    EventStream::new()
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

/// Maps a terminal event to a user intent, updating modal state on the way.
pub fn interpret_event(state: &mut UiState, event: &Event) -> Option<UserEvent> {
    let Event::Key(KeyEvent { code, kind, .. }) = event else {
        return match event {
            Event::Resize(..) => Some(UserEvent::Redraw),
            _ => None,
        };
    };
    if *kind != KeyEventKind::Press {
        return None;
    }
    match &mut state.mode {
        Mode::WagerModal(ws) => {
            return match code {
                KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Enter => {
                    let amount = ws.units.saturating_mul(unit());
                    state.mode = Mode::Normal;
                    Some(UserEvent::SetWager(amount))
                }
                KeyCode::Up | KeyCode::Char('+') => {
                    ws.units = ws.units.saturating_add(1);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Down | KeyCode::Char('-') => {
                    ws.units = ws.units.saturating_sub(1);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Backspace => {
                    ws.units /= 10;
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) => {
                    let digit = c.to_digit(10)?;
                    ws.units = ws.units.saturating_mul(10).saturating_add(u64::from(digit));
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::QuitModal => {
            return match code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::Normal => {}
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            Some(UserEvent::Redraw)
        }
        KeyCode::Right | KeyCode::Up | KeyCode::Char('+') => Some(UserEvent::ThresholdUp),
        KeyCode::Left | KeyCode::Down | KeyCode::Char('-') => {
            Some(UserEvent::ThresholdDown)
        }
        KeyCode::PageUp | KeyCode::Char(']') => Some(UserEvent::ThresholdUpCoarse),
        KeyCode::PageDown | KeyCode::Char('[') => Some(UserEvent::ThresholdDownCoarse),
        KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('r') => Some(UserEvent::Play),
        KeyCode::Char('w') => {
            state.mode = Mode::WagerModal(WagerState::default());
            Some(UserEvent::OpenWagerModal)
        }
        _ => None,
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // status bar
            Constraint::Length(11), // die + stats
            Constraint::Length(3),  // slider
            Constraint::Length(3),  // history
            Constraint::Min(4),     // status / errors
            Constraint::Length(3),  // help
        ])
        .split(f.area());

    draw_top(f, chunks[0], snap);
    draw_table(f, chunks[1], snap);
    draw_slider(f, chunks[2], snap);
    draw_history(f, chunks[3], snap);
    draw_bottom(f, chunks[4], chunks[5], snap);
    draw_modals(f, state, snap);
}

fn draw_top(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let net_style = if snap.net < 0 {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Green)
    };
    let line = Line::from(vec![
        Span::raw(format!(
            "d{} | Wager: {} | Phase: {:?} | Session: ",
            snap.side_count,
            format_units(snap.wager, DECIMAL_PLACES),
            snap.phase
        )),
        Span::styled(format_signed_units(snap.net, DECIMAL_PLACES), net_style),
    ]);
    let widget =
        Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Roll Under"));
    f.render_widget(widget, area);
}

fn draw_table(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    draw_die(f, cols[0], snap);
    draw_stats(f, cols[1], snap);
}

fn draw_die(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines: Vec<Line> = Vec::new();
    let (title, style) = match (snap.state.is_animating, snap.state.win_status) {
        (true, _) => ("Rolling...", Style::default().fg(Color::Yellow)),
        (false, Some(WinStatus::Win)) => (
            snap.headline.unwrap_or_default(),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        (false, Some(WinStatus::Loss)) => (
            snap.headline.unwrap_or_default(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        (false, None) => ("Place your bet", Style::default().fg(Color::DarkGray)),
    };
    lines.push(Line::styled(title, style));

    let face = if snap.state.is_animating {
        Some(SPIN_FACES[snap.spin_frame % SPIN_FACES.len()])
    } else {
        snap.face.map(DieFace::value)
    };
    for row in face_pips(face) {
        lines.push(Line::from(row));
    }

    let result = match snap.state.displayed_result {
        Some(n) => format!("Rolled {n}"),
        None => String::from("-"),
    };
    lines.push(Line::styled(result, Style::default().add_modifier(Modifier::BOLD)));
    if let Some(m) = snap.state.achieved_multiplier {
        lines.push(Line::from(format!("Won at {m}")));
    }

    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Die"));
    f.render_widget(widget, area);
}

fn draw_stats(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let payout = if snap.exceeds_pool {
        Span::styled("Too high", Style::default().fg(Color::Red))
    } else {
        Span::raw(format_units(snap.potential_payout, DECIMAL_PLACES))
    };
    let lines = vec![
        Line::from(format!("Roll under: {}", snap.roll_under)),
        Line::from(format!("Win chance: {:.0}%", snap.win_chance)),
        Line::from(format!("Multiplier: {}", snap.multiplier)),
        Line::from(vec![Span::raw("Payout on win: "), payout]),
        Line::from(format!(
            "Table: {}",
            snap.table_fingerprint.chars().take(12).collect::<String>()
        )),
        Line::from(match snap.last_cue {
            Some(cue) => format!("Last cue: {cue}"),
            None => String::new(),
        }),
    ];
    let widget =
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Bet"));
    f.render_widget(widget, area);
}

fn draw_slider(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let ratio = if snap.side_count == 0 {
        0.0
    } else {
        f64::from(snap.threshold) / f64::from(snap.side_count)
    };
    let locked = matches!(
        snap.phase,
        Phase::Submitting | Phase::AwaitingResult | Phase::RevealDelay
    );
    let color = if locked { Color::DarkGray } else { Color::Cyan };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(format!(
            "Threshold {} / {}",
            snap.threshold, snap.max_threshold
        )))
        .gauge_style(Style::default().fg(color))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!("Roll under {}", snap.roll_under));
    f.render_widget(gauge, area);
}

fn draw_history(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let width = usize::from(area.width.saturating_sub(2));
    let line = if snap.history.is_empty() {
        Line::styled("None", Style::default().fg(Color::DarkGray))
    } else {
        let items = snap.history.iter().map(history_item);
        Line::from(fit_to_width(items, width))
    };
    let widget =
        Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("History"));
    f.render_widget(widget, area);
}

fn draw_bottom(f: &mut Frame, area: Rect, help_area: Rect, snap: &AppSnapshot) {
    let status_widget = if snap.errors.is_empty() {
        Paragraph::new(snap.status.as_str())
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Status"))
            .style(Style::default().fg(Color::Green))
    } else {
        let lines: Vec<Line> = snap.errors.iter().map(|e| Line::from(e.clone())).collect();
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("Errors"))
            .style(Style::default().fg(Color::Red))
    };
    f.render_widget(status_widget, area);

    let help = Paragraph::new(
        "←/→ threshold | [/] ±10 | w wager | space/enter roll | q/Esc quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, help_area);
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    match &state.mode {
        Mode::WagerModal(ws) => {
            let area = centered_rect(40, 25, f.area());
            f.render_widget(Clear, area);
            let text = vec![
                Line::from(format!(
                    "Current: {}",
                    format_units(snap.wager, DECIMAL_PLACES)
                )),
                Line::from(format!("New wager: {}", ws.units)),
                Line::from("digits / +/- to edit, Enter confirm, Esc cancel"),
            ];
            let widget = Paragraph::new(text)
                .block(Block::default().borders(Borders::ALL).title("Set Wager"));
            f.render_widget(widget, area);
        }
        Mode::QuitModal => {
            let area = centered_rect(30, 15, f.area());
            f.render_widget(Clear, area);
            let widget = Paragraph::new("Quit? (y/n)")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Confirm"));
            f.render_widget(widget, area);
        }
        Mode::Normal => {}
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn unit() -> u64 {
    10u64.saturating_pow(DECIMAL_PLACES)
}

fn format_units(amount: u64, decimal_places: u32) -> String {
    let one_unit = 10u64.saturating_pow(decimal_places);
    let whole = amount / one_unit;
    let fractional = amount % one_unit;
    if fractional == 0 {
        format!("{whole}")
    } else {
        let width = decimal_places as usize;
        format!(
            "{whole}.{}",
            format!("{fractional:0width$}").trim_end_matches('0')
        )
    }
}

fn format_signed_units(amount: i128, decimal_places: u32) -> String {
    let magnitude = u64::try_from(amount.unsigned_abs()).unwrap_or(u64::MAX);
    let sign = if amount < 0 { "-" } else { "+" };
    format!("{sign}{}", format_units(magnitude, decimal_places))
}

fn history_item(entry: &HistoryEntry) -> String {
    let mark = match entry.resolution.win_status {
        WinStatus::Win => "W",
        WinStatus::Loss => "L",
    };
    format!(
        "{} {}{}",
        entry.at.format("%H:%M:%S"),
        entry.resolution.displayed_result,
        mark
    )
}

/// Joins newest-first items, dropping whatever no longer fits on one line.
fn fit_to_width(items: impl Iterator<Item = String>, width: usize) -> String {
    let mut used = 0;
    items
        .take_while(|item| {
            let needed = if used == 0 { item.width() } else { item.width() + 3 };
            used += needed;
            used <= width
        })
        .join(" | ")
}

fn face_pips(face: Option<u8>) -> [&'static str; 3] {
    match face {
        Some(1) => ["     ", "  ●  ", "     "],
        Some(2) => ["●    ", "     ", "    ●"],
        Some(3) => ["●    ", "  ●  ", "    ●"],
        Some(4) => ["●   ●", "     ", "●   ●"],
        Some(5) => ["●   ●", "  ●  ", "●   ●"],
        Some(6) => ["●   ●", "●   ●", "●   ●"],
        _ => ["     ", "  ?  ", "     "],
    }
}
