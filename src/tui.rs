use std::io::Stdout;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Clear as WidgetClear;
use ratatui::widgets::{Block, BorderType, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap};

use crate::finder;
use crate::prompt::{MenuItem, Presenter, Prompt};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

// horizontally centered, fixed number of rows
fn centered_rows(percent_x: u16, rows: u16, r: Rect) -> Rect {
    let rows = rows.min(r.height);
    let top = r.y + (r.height - rows) / 2;
    let band = Rect { x: r.x, y: top, width: r.width, height: rows };
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(band)[1]
}

fn render_base(f: &mut ratatui::Frame, hint: &str) -> Rect {
    let area = f.area();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Blue))
        .title(Line::from(Span::styled(
            " 📦 picksync - folder backup ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )))
        .title_bottom(Line::from(Span::styled(format!(" {} ", hint), Style::default().fg(Color::Gray))));
    let inner = block.inner(area);
    f.render_widget(block, area);
    inner
}

fn popup_block(title: &str, color: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
        .title(format!(" {} ", title))
        .title_style(Style::default().fg(color).add_modifier(Modifier::BOLD))
}

fn highlight() -> Style {
    Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn text_rows(text: &str) -> u16 {
    (text.lines().count() as u16).saturating_add(1)
}

/// Move a list selection by `delta`, clamped to `len`.
fn step(state: &mut ListState, len: usize, delta: isize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let cur = state.selected().unwrap_or(0) as isize;
    let next = (cur + delta).clamp(0, len as isize - 1);
    state.select(Some(next as usize));
}

// Ctrl+C is folded into Esc; raw mode swallows the signal.
fn next_key() -> Result<Option<KeyEvent>> {
    if let Event::Key(key) = event::read()?
        && key.kind == KeyEventKind::Press
    {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(Some(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        }
        return Ok(Some(key));
    }
    Ok(None)
}

/// Line editing for the input box. Ctrl+U clears; other Ctrl/Alt chords are ignored.
fn edit_line(buf: &mut String, key: &KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            buf.pop();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => buf.clear(),
        KeyCode::Char(_) if key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {}
        KeyCode::Char(c) => buf.push(c),
        _ => {}
    }
}

/// Entries of the directory browser: `..` (when there is a parent) then children.
fn browser_entries(dir: &Path) -> Vec<(String, PathBuf)> {
    let mut entries = Vec::new();
    if let Some(parent) = dir.parent() {
        entries.push(("..".to_string(), parent.to_path_buf()));
    }
    for sub in finder::subdirectories(dir) {
        let name = sub
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| sub.display().to_string());
        entries.push((format!("{}/", name), sub));
    }
    entries
}

fn existing_ancestor(start: &Path) -> PathBuf {
    let mut cur = start.to_path_buf();
    while !cur.is_dir() {
        match cur.parent() {
            Some(p) => cur = p.to_path_buf(),
            None => break,
        }
    }
    cur
}

pub fn setup_terminal() -> Result<Tui> {
    let mut stdout = std::io::stdout();
    enable_raw_mode()?;
    if let Err(e) = execute!(stdout, EnterAlternateScreen, Hide) {
        let _ = disable_raw_mode();
        return Err(e.into());
    }
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore_terminal(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, Show)?;
    terminal.show_cursor()?;
    Ok(())
}

/// ratatui rendition of the dialog toolkit. Every call is a small modal loop.
///
/// The terminal is restored when the presenter is closed or dropped, so an
/// error anywhere in the session still leaves a usable shell behind.
pub struct TerminalPresenter {
    terminal: Tui,
    active: bool,
}

impl TerminalPresenter {
    pub fn start() -> Result<Self> {
        let mut terminal = setup_terminal()?;
        terminal.clear()?;
        Ok(Self { terminal, active: true })
    }

    pub fn close(&mut self) -> Result<()> {
        if self.active {
            self.active = false;
            restore_terminal(&mut self.terminal)?;
        }
        Ok(())
    }
}

impl Drop for TerminalPresenter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("terminal restore failed: {:#}", e);
        }
    }
}

impl Presenter for TerminalPresenter {
    fn message(&mut self, title: &str, text: &str) -> Result<()> {
        loop {
            self.terminal.draw(|f| {
                let base = render_base(f, "Enter/Esc: OK");
                let area = centered_rows(70, text_rows(text) + 4, base);
                let mut lines: Vec<Line> = text.lines().map(|l| Line::from(l.to_string())).collect();
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled("[ OK ]", highlight())));
                let para = Paragraph::new(lines)
                    .block(popup_block(title, Color::Cyan))
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: false });
                f.render_widget(WidgetClear, area);
                f.render_widget(para, area);
            })?;
            if let Some(key) = next_key()? {
                match key.code {
                    KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') | KeyCode::Char('q') => {
                        return Ok(());
                    }
                    _ => {}
                }
            }
        }
    }

    fn confirm(&mut self, title: &str, question: &str) -> Result<bool> {
        let mut yes = true;
        loop {
            self.terminal.draw(|f| {
                let base = render_base(f, "←/→: Switch | y/n | Enter: Confirm | Esc: No");
                let area = centered_rows(70, text_rows(question) + 5, base);
                let mut lines: Vec<Line> =
                    question.lines().map(|l| Line::from(l.to_string())).collect();
                lines.push(Line::from(""));
                lines.push(Line::from(vec![
                    Span::styled(
                        " Yes ",
                        if yes {
                            Style::default().fg(Color::White).bg(Color::Green).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(Color::Gray)
                        },
                    ),
                    Span::raw("     "),
                    Span::styled(
                        " No ",
                        if !yes {
                            Style::default().fg(Color::White).bg(Color::Red).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(Color::Gray)
                        },
                    ),
                ]));
                let para = Paragraph::new(lines)
                    .block(popup_block(title, Color::Yellow))
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: false });
                f.render_widget(WidgetClear, area);
                f.render_widget(para, area);
            })?;
            if let Some(key) = next_key()? {
                match key.code {
                    KeyCode::Left | KeyCode::Right | KeyCode::Tab => yes = !yes,
                    KeyCode::Char('y') | KeyCode::Char('Y') => return Ok(true),
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => return Ok(false),
                    KeyCode::Enter => return Ok(yes),
                    _ => {}
                }
            }
        }
    }

    fn menu(&mut self, title: &str, text: &str, items: &[MenuItem<'_>]) -> Result<Prompt<usize>> {
        let mut state = ListState::default();
        state.select(if items.is_empty() { None } else { Some(0) });
        loop {
            self.terminal.draw(|f| {
                let base = render_base(f, "↑/↓: Move | Enter: Select | Esc: Back");
                let rows = text_rows(text) + items.len() as u16 + 3;
                let area = centered_rows(70, rows, base);
                let block = popup_block(title, Color::Green);
                let inner = block.inner(area);
                f.render_widget(WidgetClear, area);
                f.render_widget(block, area);
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(text_rows(text)), Constraint::Min(1)])
                    .split(inner);
                f.render_widget(Paragraph::new(text.to_string()).wrap(Wrap { trim: false }), chunks[0]);
                let list_items: Vec<ListItem> = items
                    .iter()
                    .map(|(tag, label)| {
                        ListItem::new(Line::from(vec![
                            Span::styled(format!("{:>2}  ", tag), Style::default().fg(Color::Yellow)),
                            Span::raw(label.to_string()),
                        ]))
                    })
                    .collect();
                let list = List::new(list_items).highlight_style(highlight()).highlight_symbol("▶ ");
                f.render_stateful_widget(list, chunks[1], &mut state);
            })?;
            if let Some(key) = next_key()? {
                match key.code {
                    KeyCode::Up | KeyCode::Char('k') => step(&mut state, items.len(), -1),
                    KeyCode::Down | KeyCode::Char('j') => step(&mut state, items.len(), 1),
                    KeyCode::Home => step(&mut state, items.len(), isize::MIN / 2),
                    KeyCode::End => step(&mut state, items.len(), isize::MAX / 2),
                    KeyCode::Enter => {
                        if let Some(idx) = state.selected() {
                            return Ok(Prompt::Confirmed(idx));
                        }
                    }
                    KeyCode::Esc => return Ok(Prompt::Cancelled),
                    KeyCode::Char(c) => {
                        let tag = c.to_string();
                        if let Some(pos) = items.iter().position(|(t, _)| *t == tag) {
                            state.select(Some(pos));
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn input(&mut self, title: &str, text: &str, default: &str) -> Result<Prompt<String>> {
        let mut buf = default.to_string();
        loop {
            self.terminal.draw(|f| {
                let base = render_base(f, "Enter: OK | Ctrl+U: Clear | Esc: Cancel");
                let area = centered_rows(70, text_rows(text) + 5, base);
                let block = popup_block(title, Color::Green);
                let inner = block.inner(area);
                f.render_widget(WidgetClear, area);
                f.render_widget(block, area);
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(text_rows(text)), Constraint::Length(3)])
                    .split(inner);
                f.render_widget(Paragraph::new(text.to_string()).wrap(Wrap { trim: false }), chunks[0]);
                let field_block = Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow));
                let field_inner = field_block.inner(chunks[1]);
                let visible = field_inner.width.saturating_sub(1) as usize;
                let chars: Vec<char> = buf.chars().collect();
                let shown: String = chars[chars.len().saturating_sub(visible)..].iter().collect();
                let cursor_x = field_inner.x + shown.chars().count() as u16;
                f.render_widget(Paragraph::new(shown).block(field_block), chunks[1]);
                f.set_cursor_position((cursor_x, field_inner.y));
            })?;
            if let Some(key) = next_key()? {
                match key.code {
                    KeyCode::Enter => return Ok(Prompt::Confirmed(buf)),
                    KeyCode::Esc => return Ok(Prompt::Cancelled),
                    _ => edit_line(&mut buf, &key),
                }
            }
        }
    }

    fn checklist(&mut self, title: &str, text: &str, items: &[String]) -> Result<Prompt<Vec<usize>>> {
        let mut checked = vec![false; items.len()];
        let mut state = ListState::default();
        state.select(if items.is_empty() { None } else { Some(0) });
        loop {
            self.terminal.draw(|f| {
                let base = render_base(f, "↑/↓: Move | Space: Toggle | a: All | Enter: OK | Esc: Cancel");
                let area = centered_rect(80, 80, base);
                let block = popup_block(title, Color::Green);
                let inner = block.inner(area);
                f.render_widget(WidgetClear, area);
                f.render_widget(block, area);
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(text_rows(text)), Constraint::Min(1)])
                    .split(inner);
                let marked = checked.iter().filter(|c| **c).count();
                f.render_widget(
                    Paragraph::new(format!("{}  ({} checked)", text, marked)).wrap(Wrap { trim: false }),
                    chunks[0],
                );
                let list_items: Vec<ListItem> = items
                    .iter()
                    .zip(checked.iter())
                    .map(|(label, on)| {
                        let mark = if *on {
                            Span::styled("[x] ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
                        } else {
                            Span::raw("[ ] ")
                        };
                        ListItem::new(Line::from(vec![mark, Span::raw(label.clone())]))
                    })
                    .collect();
                let list = List::new(list_items).highlight_style(highlight()).highlight_symbol("▶ ");
                f.render_stateful_widget(list, chunks[1], &mut state);
            })?;
            if let Some(key) = next_key()? {
                match key.code {
                    KeyCode::Up | KeyCode::Char('k') => step(&mut state, items.len(), -1),
                    KeyCode::Down | KeyCode::Char('j') => step(&mut state, items.len(), 1),
                    KeyCode::PageUp => step(&mut state, items.len(), -10),
                    KeyCode::PageDown => step(&mut state, items.len(), 10),
                    KeyCode::Char(' ') => {
                        if let Some(idx) = state.selected() {
                            checked[idx] = !checked[idx];
                        }
                    }
                    KeyCode::Char('a') => {
                        let all = checked.iter().all(|c| *c);
                        checked.iter_mut().for_each(|c| *c = !all);
                    }
                    KeyCode::Enter => {
                        let picked = checked
                            .iter()
                            .enumerate()
                            .filter_map(|(i, on)| on.then_some(i))
                            .collect();
                        return Ok(Prompt::Confirmed(picked));
                    }
                    KeyCode::Esc => return Ok(Prompt::Cancelled),
                    _ => {}
                }
            }
        }
    }

    fn show_text(&mut self, title: &str, body: &str) -> Result<()> {
        let total = body.lines().count();
        let mut offset = 0usize;
        let mut page = 10usize;
        loop {
            self.terminal.draw(|f| {
                let base = render_base(f, "↑/↓/PgUp/PgDn: Scroll | Enter/Esc: Close");
                let area = centered_rect(90, 85, base);
                page = area.height.saturating_sub(2).max(1) as usize;
                let para = Paragraph::new(body.to_string())
                    .block(popup_block(
                        &format!("{} ({}/{})", title, (offset + 1).min(total.max(1)), total.max(1)),
                        Color::Cyan,
                    ))
                    .scroll((offset.min(u16::MAX as usize) as u16, 0));
                f.render_widget(WidgetClear, area);
                f.render_widget(para, area);
            })?;
            let max_offset = total.saturating_sub(page);
            if let Some(key) = next_key()? {
                match key.code {
                    KeyCode::Down | KeyCode::Char('j') => offset = (offset + 1).min(max_offset),
                    KeyCode::Up | KeyCode::Char('k') => offset = offset.saturating_sub(1),
                    KeyCode::PageDown | KeyCode::Char(' ') => offset = (offset + page).min(max_offset),
                    KeyCode::PageUp => offset = offset.saturating_sub(page),
                    KeyCode::Home => offset = 0,
                    KeyCode::End => offset = max_offset,
                    KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') => return Ok(()),
                    _ => {}
                }
            }
        }
    }

    fn pick_directory(&mut self, title: &str, start: &Path) -> Result<Prompt<PathBuf>> {
        let mut current = existing_ancestor(start);
        let mut entries = browser_entries(&current);
        let mut state = ListState::default();
        state.select(if entries.is_empty() { None } else { Some(0) });
        loop {
            self.terminal.draw(|f| {
                let base = render_base(
                    f,
                    "↑/↓: Move | →: Open | ←: Up | Enter: Select highlighted | .: Select current | Esc: Cancel",
                );
                let area = centered_rect(80, 85, base);
                let block = popup_block(title, Color::Green);
                let inner = block.inner(area);
                f.render_widget(WidgetClear, area);
                f.render_widget(block, area);
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(2), Constraint::Min(1)])
                    .split(inner);
                f.render_widget(
                    Paragraph::new(Line::from(vec![
                        Span::styled("📁 ", Style::default()),
                        Span::styled(
                            current.display().to_string(),
                            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                        ),
                    ])),
                    chunks[0],
                );
                let list_items: Vec<ListItem> =
                    entries.iter().map(|(label, _)| ListItem::new(label.clone())).collect();
                let list = List::new(list_items).highlight_style(highlight()).highlight_symbol("▶ ");
                f.render_stateful_widget(list, chunks[1], &mut state);
            })?;
            let Some(key) = next_key()? else { continue };
            let highlighted = state.selected().and_then(|i| entries.get(i)).cloned();
            let mut open: Option<PathBuf> = None;
            match key.code {
                KeyCode::Up | KeyCode::Char('k') => step(&mut state, entries.len(), -1),
                KeyCode::Down | KeyCode::Char('j') => step(&mut state, entries.len(), 1),
                KeyCode::PageUp => step(&mut state, entries.len(), -10),
                KeyCode::PageDown => step(&mut state, entries.len(), 10),
                KeyCode::Right | KeyCode::Tab => open = highlighted.map(|(_, p)| p),
                KeyCode::Left | KeyCode::Backspace => open = current.parent().map(Path::to_path_buf),
                KeyCode::Enter => match highlighted {
                    Some((label, p)) if label == ".." => open = Some(p),
                    Some((_, p)) => return Ok(Prompt::Confirmed(p)),
                    None => return Ok(Prompt::Confirmed(current)),
                },
                KeyCode::Char('.') => return Ok(Prompt::Confirmed(current)),
                KeyCode::Esc => return Ok(Prompt::Cancelled),
                _ => {}
            }
            if let Some(next) = open {
                let previous = std::mem::replace(&mut current, next);
                entries = browser_entries(&current);
                let back_to = entries.iter().position(|(_, p)| *p == previous);
                state.select(back_to.or(if entries.is_empty() { None } else { Some(0) }));
            }
        }
    }

    fn progress(&mut self, title: &str, percent: u16, status: &str) -> Result<()> {
        self.terminal.draw(|f| {
            let base = render_base(f, "Transfer running, please wait");
            let area = centered_rows(70, 5, base);
            let gauge = Gauge::default()
                .block(popup_block(title, Color::Cyan))
                .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
                .percent(percent.min(100))
                .label(status.to_string());
            f.render_widget(WidgetClear, area);
            f.render_widget(gauge, area);
        })?;
        Ok(())
    }

    fn discard_pending_input(&mut self) -> Result<()> {
        let mut dropped = 0usize;
        while event::poll(Duration::ZERO)? {
            event::read()?;
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!("discarded {} pending terminal events", dropped);
        }
        Ok(())
    }

    fn release_terminal(&mut self, task: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        self.terminal.clear()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen, Show)?;
        disable_raw_mode()?;

        let outcome = task();

        enable_raw_mode()?;
        execute!(self.terminal.backend_mut(), EnterAlternateScreen, Hide)?;
        self.terminal.clear()?;
        outcome
    }
}
