use crate::diary_entry::DiaryEntry;
use color_eyre::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::io::{stdout, Stdout};
use unicode_width::UnicodeWidthStr;

pub enum Action {
    Write,
    View,
    Edit,
    Delete,
    Search,
    Quit,
}

/// Title and body as typed into the entry form.
pub struct EntryForm {
    pub title: String,
    pub body: String,
}

pub struct UI {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    status: Option<Status>,
}

enum Status {
    Info(String),
    Warning(String),
    Error(String),
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Title,
    Body,
}

/// Editable text with a cursor kept on a char boundary.
struct TextField {
    text: String,
    cursor: usize,
}

impl TextField {
    fn new(text: &str) -> Self {
        TextField {
            text: text.to_string(),
            cursor: text.len(),
        }
    }

    fn insert(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    fn backspace(&mut self) {
        if let Some((idx, _)) = self.text[..self.cursor].char_indices().next_back() {
            self.text.remove(idx);
            self.cursor = idx;
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.text.len() {
            self.text.remove(self.cursor);
        }
    }

    fn left(&mut self) {
        if let Some((idx, _)) = self.text[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    fn right(&mut self) {
        if let Some(c) = self.text[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    /// Cursor as (column, line) in terminal cells.
    fn cursor_cell(&self) -> (u16, u16) {
        let before = &self.text[..self.cursor];
        let line = before.matches('\n').count();
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].width();
        (saturating_u16(column), saturating_u16(line))
    }
}

fn saturating_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

impl UI {
    pub fn new() -> Result<Self> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;

        Ok(UI {
            terminal,
            status: None,
        })
    }

    pub fn set_info(&mut self, message: impl Into<String>) {
        self.status = Some(Status::Info(message.into()));
    }

    pub fn set_warning(&mut self, message: impl Into<String>) {
        self.status = Some(Status::Warning(message.into()));
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.status = Some(Status::Error(message.into()));
    }

    pub fn display(&mut self, titles: &[String]) -> Result<()> {
        let status = self.status.as_ref().map(status_line);
        self.terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .margin(1)
                .constraints([
                    Constraint::Length(3),
                    Constraint::Min(0),
                    Constraint::Length(1),
                    Constraint::Length(3),
                ])
                .split(f.area());

            render_heading(f, chunks[0], "Personal Diary");

            let items: Vec<ListItem> = titles
                .iter()
                .map(|title| ListItem::new(Line::from(Span::raw(title.clone()))))
                .collect();
            let entries_list =
                List::new(items).block(Block::default().borders(Borders::ALL).title("Entries"));
            f.render_widget(entries_list, chunks[1]);

            if let Some(status) = status {
                f.render_widget(Paragraph::new(status), chunks[2]);
            }

            let controls = if titles.is_empty() {
                key_hints(&[("w", "write"), ("q", "quit")])
            } else {
                key_hints(&[
                    ("w", "write"),
                    ("v", "view"),
                    ("e", "edit"),
                    ("d", "delete"),
                    ("s", "search"),
                    ("q", "quit"),
                ])
            };
            let controls_paragraph = Paragraph::new(controls)
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center);
            f.render_widget(controls_paragraph, chunks[3]);
        })?;

        Ok(())
    }

    pub fn handle_input(&mut self, has_entries: bool) -> Result<Option<Action>> {
        let Some(code) = read_key()? else {
            return Ok(None);
        };
        let action = match code {
            KeyCode::Char('w') => Some(Action::Write),
            KeyCode::Char('q') => Some(Action::Quit),
            KeyCode::Char('v') if has_entries => Some(Action::View),
            KeyCode::Char('e') if has_entries => Some(Action::Edit),
            KeyCode::Char('d') if has_entries => Some(Action::Delete),
            KeyCode::Char('s') if has_entries => Some(Action::Search),
            _ => None,
        };
        if action.is_some() {
            self.status = None;
        }
        Ok(action)
    }

    pub fn get_new_entry(&mut self) -> Result<Option<EntryForm>> {
        self.entry_form("New Diary Entry", "", "")
    }

    /// Returns the edited title and body, `None` if cancelled.
    pub fn edit_entry(&mut self, entry: &DiaryEntry) -> Result<Option<EntryForm>> {
        self.entry_form("Edit Diary Entry", &entry.title, &entry.body)
    }

    fn entry_form(&mut self, heading: &str, title: &str, body: &str) -> Result<Option<EntryForm>> {
        let mut title = TextField::new(title);
        let mut body = TextField::new(body);
        let mut focus = Field::Title;

        loop {
            self.terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Min(10),
                        Constraint::Length(3),
                    ])
                    .split(f.area());

                render_heading(f, chunks[0], heading);

                let title_input = Paragraph::new(title.text.as_str())
                    .block(field_block("Title", focus == Field::Title));
                f.render_widget(title_input, chunks[1]);

                let body_input = Paragraph::new(body.text.as_str())
                    .block(field_block("Entry", focus == Field::Body));
                f.render_widget(body_input, chunks[2]);

                let (field, area) = match focus {
                    Field::Title => (&title, chunks[1]),
                    Field::Body => (&body, chunks[2]),
                };
                let (column, line) = field.cursor_cell();
                f.set_cursor_position((
                    (area.x + 1).saturating_add(column),
                    (area.y + 1).saturating_add(line),
                ));

                render_instructions(
                    f,
                    chunks[3],
                    "Tab: Switch field, Ctrl+S: Save, Esc: Cancel",
                );
            })?;

            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let field = match focus {
                Field::Title => &mut title,
                Field::Body => &mut body,
            };
            match key.code {
                KeyCode::Esc => return Ok(None),
                KeyCode::Char('s')
                    if key
                        .modifiers
                        .contains(crossterm::event::KeyModifiers::CONTROL) =>
                {
                    break
                }
                KeyCode::Tab | KeyCode::BackTab => {
                    focus = match focus {
                        Field::Title => Field::Body,
                        Field::Body => Field::Title,
                    }
                }
                KeyCode::Enter if focus == Field::Title => focus = Field::Body,
                KeyCode::Enter => field.insert('\n'),
                KeyCode::Char(c) => field.insert(c),
                KeyCode::Backspace => field.backspace(),
                KeyCode::Delete => field.delete(),
                KeyCode::Left => field.left(),
                KeyCode::Right => field.right(),
                _ => {}
            }
        }

        Ok(Some(EntryForm {
            title: title.text,
            body: body.text,
        }))
    }

    /// Pick one title from a list. `None` on Esc.
    pub fn select_entry(&mut self, heading: &str, titles: &[String]) -> Result<Option<String>> {
        if titles.is_empty() {
            return Ok(None);
        }
        let mut selected_index = 0;

        loop {
            self.terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Min(10),
                        Constraint::Length(3),
                    ])
                    .split(f.area());

                render_heading(f, chunks[0], heading);

                let items: Vec<ListItem> = titles
                    .iter()
                    .map(|title| ListItem::new(Line::from(Span::raw(title.clone()))))
                    .collect();

                let entries_list = List::new(items)
                    .block(Block::default().borders(Borders::ALL).title("Entries"))
                    .highlight_style(Style::default().add_modifier(Modifier::BOLD))
                    .highlight_symbol("> ");

                f.render_stateful_widget(
                    entries_list,
                    chunks[1],
                    &mut ListState::default().with_selected(Some(selected_index)),
                );

                render_instructions(f, chunks[2], "Up/Down: Navigate, Enter: Select, Esc: Back");
            })?;

            match read_key()? {
                Some(KeyCode::Up) => selected_index = selected_index.saturating_sub(1),
                Some(KeyCode::Down) => {
                    if selected_index < titles.len() - 1 {
                        selected_index += 1;
                    }
                }
                Some(KeyCode::Enter) => return Ok(Some(titles[selected_index].clone())),
                Some(KeyCode::Esc) => return Ok(None),
                _ => {}
            }
        }
    }

    pub fn view_full_entry(&mut self, entry: &DiaryEntry) -> Result<()> {
        loop {
            self.terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Min(10),
                        Constraint::Length(3),
                    ])
                    .split(f.area());

                render_heading(
                    f,
                    chunks[0],
                    &format!("{} ({})", entry.title, entry.timestamp),
                );

                let content = Paragraph::new(entry.body.as_str())
                    .wrap(Wrap { trim: false })
                    .block(Block::default().borders(Borders::ALL).title("Entry"));
                f.render_widget(content, chunks[1]);

                render_instructions(f, chunks[2], "Esc: Back");
            })?;

            if let Some(KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) = read_key()? {
                break;
            }
        }

        Ok(())
    }

    /// Empty string when cancelled.
    pub fn get_search_query(&mut self) -> Result<String> {
        let mut query = TextField::new("");

        loop {
            self.terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints([
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Min(1),
                    ])
                    .split(f.area());

                render_heading(f, chunks[0], "Search Entries");

                let search_input = Paragraph::new(query.text.as_str())
                    .block(Block::default().borders(Borders::ALL).title("Search Query"));
                f.render_widget(search_input, chunks[1]);
                let (column, _) = query.cursor_cell();
                f.set_cursor_position(((chunks[1].x + 1).saturating_add(column), chunks[1].y + 1));

                render_instructions(f, chunks[2], "Enter: Submit, Esc: Cancel");
            })?;

            match read_key()? {
                Some(KeyCode::Enter) => break,
                Some(KeyCode::Char(c)) => query.insert(c),
                Some(KeyCode::Backspace) => query.backspace(),
                Some(KeyCode::Left) => query.left(),
                Some(KeyCode::Right) => query.right(),
                Some(KeyCode::Esc) => return Ok(String::new()),
                _ => {}
            }
        }

        Ok(query.text)
    }

    /// Lists matching titles; returns the one chosen for viewing.
    pub fn display_search_results(&mut self, results: &[String]) -> Result<Option<String>> {
        self.select_entry(&format!("Search Results ({})", results.len()), results)
    }

    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        loop {
            self.terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .margin(1)
                    .constraints([Constraint::Length(3), Constraint::Min(1)])
                    .split(f.area());

                render_heading(f, chunks[0], question);
                render_instructions(f, chunks[1], "y: Yes, n/Esc: No");
            })?;

            match read_key()? {
                Some(KeyCode::Char('y') | KeyCode::Char('Y')) => return Ok(true),
                Some(KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc) => return Ok(false),
                _ => {}
            }
        }
    }
}

impl Drop for UI {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}

/// Next key press, ignoring releases and non-key events.
fn read_key() -> Result<Option<KeyCode>> {
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(Some(key.code)),
        _ => Ok(None),
    }
}

fn render_heading(f: &mut Frame, area: Rect, text: &str) {
    let heading = Paragraph::new(text.to_string())
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center);
    f.render_widget(heading, area);
}

fn render_instructions(f: &mut Frame, area: Rect, text: &str) {
    let instructions = Paragraph::new(text.to_string())
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center);
    f.render_widget(instructions, area);
}

fn field_block(title: &str, focused: bool) -> Block<'static> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .title(title.to_string())
}

fn key_hints(hints: &[(&'static str, &'static str)]) -> Line<'static> {
    let mut spans = vec![Span::raw("Press ")];
    for (i, (key, label)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(", "));
        }
        spans.push(Span::styled(
            *key,
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!(" to {label}")));
    }
    Line::from(spans)
}

fn status_line(status: &Status) -> Line<'static> {
    let (text, color) = match status {
        Status::Info(text) => (text.clone(), Color::Green),
        Status::Warning(text) => (format!("Warning: {text}"), Color::Yellow),
        Status::Error(text) => (format!("Error: {text}"), Color::Red),
    };
    Line::from(Span::styled(text, Style::default().fg(color)))
}
