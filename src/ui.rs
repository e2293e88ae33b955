use crate::presentation::{format_currency, Action, StatusKind, Teller, EMPTY_HISTORY_TEXT};
use crate::store::KeyValueStore;
use crate::transaction::TransactionKind;
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Deposit,
    Withdraw,
}

impl Field {
    pub fn next(&self) -> Self {
        match self {
            Field::Deposit => Field::Withdraw,
            Field::Withdraw => Field::Deposit,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Field::Deposit => "Deposit amount",
            Field::Withdraw => "Withdrawal amount",
        }
    }

    fn action(&self) -> Action {
        match self {
            Field::Deposit => Action::Deposit,
            Field::Withdraw => Action::Withdraw,
        }
    }
}

pub struct App<S: KeyValueStore> {
    pub teller: Teller<S>,
    pub deposit_input: String,
    pub withdraw_input: String,
    pub focus: Field,
    pub confirming_reset: bool,
    pub should_quit: bool,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(teller: Teller<S>) -> Self {
        Self {
            teller,
            deposit_input: String::new(),
            withdraw_input: String::new(),
            focus: Field::Deposit,
            confirming_reset: false,
            should_quit: false,
        }
    }

    pub fn input(&self, field: Field) -> &str {
        match field {
            Field::Deposit => &self.deposit_input,
            Field::Withdraw => &self.withdraw_input,
        }
    }

    fn input_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::Deposit => &mut self.deposit_input,
            Field::Withdraw => &mut self.withdraw_input,
        }
    }

    /// Run the action of the focused field; its input is cleared on success
    pub fn submit(&mut self) {
        let field = self.focus;
        let input = self.input(field).to_string();

        if self.teller.submit(field.action(), &input) {
            self.input_mut(field).clear();
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.confirming_reset {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.confirming_reset = false;
                    // The teller puts the failure on the status line
                    if let Err(e) = self.teller.reset(true) {
                        tracing::debug!(error = %e, "account left unchanged");
                    }
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    self.confirming_reset = false;
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.focus = self.focus.next();
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Backspace => {
                self.input_mut(self.focus).pop();
            }
            KeyCode::Char('b') => {
                self.teller.query_balance();
            }
            KeyCode::Char('r') => self.confirming_reset = true,
            KeyCode::Char(c) if c.is_ascii_digit() || matches!(c, ',' | '.' | '-' | '+' | ' ') => {
                self.input_mut(self.focus).push(c);
            }
            _ => {}
        }
    }
}

pub fn run_ui<S: KeyValueStore>(app: &mut App<S>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend, S: KeyValueStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> io::Result<()> {
    loop {
        app.teller.clear_expired_status(Instant::now());
        terminal.draw(|f| ui(f, app))?;

        // Poll instead of blocking so expired status messages disappear on their own
        if !event::poll(TICK)? {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui<S: KeyValueStore>(f: &mut Frame, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Balance
            Constraint::Length(3), // Inputs
            Constraint::Length(3), // Status message
            Constraint::Min(0),    // History
            Constraint::Length(3), // Key help
        ])
        .split(f.size());

    render_balance(f, chunks[0], app);
    render_inputs(f, chunks[1], app);
    render_status(f, chunks[2], app);
    render_history(f, chunks[3], app);
    render_help(f, chunks[4]);

    if app.confirming_reset {
        render_confirm(f, f.size());
    }
}

fn render_balance<S: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let line = Line::from(vec![
        Span::styled("ATM Simulator", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("  |  Balance: "),
        Span::styled(
            format_currency(app.teller.ledger().balance()),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
    ]);

    let header = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_inputs<S: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    for (field, column) in [Field::Deposit, Field::Withdraw].into_iter().zip(columns.iter()) {
        let focused = field == app.focus;
        let border = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let mut text = app.input(field).to_string();
        if focused {
            text.push('▏');
        }

        let input = Paragraph::new(text).block(
            Block::default()
                .title(field.title())
                .borders(Borders::ALL)
                .border_style(border),
        );
        f.render_widget(input, *column);
    }
}

fn render_status<S: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let (text, color) = match app.teller.status(Instant::now()) {
        Some(status) => {
            let color = match status.kind {
                StatusKind::Info => Color::Green,
                StatusKind::Error => Color::Red,
            };
            (status.text.clone(), color)
        }
        None => (String::new(), Color::White),
    };

    let status = Paragraph::new(Span::styled(text, Style::default().fg(color)))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, area);
}

fn render_history<S: KeyValueStore>(f: &mut Frame, area: Rect, app: &App<S>) {
    let rows = app.teller.history_rows();

    let items: Vec<ListItem> = if rows.is_empty() {
        vec![ListItem::new(Span::styled(
            EMPTY_HISTORY_TEXT,
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        rows.iter()
            .map(|row| {
                let color = match row.kind {
                    TransactionKind::Deposit => Color::Green,
                    TransactionKind::Withdrawal => Color::Red,
                };
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:<11}", row.kind.as_str()),
                        Style::default().fg(color).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(format!(" {:>16}  ", row.amount)),
                    Span::styled(format!("({})", row.when), Style::default().fg(Color::DarkGray)),
                ]))
            })
            .collect()
    };

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("History ({})", rows.len())),
    );
    f.render_widget(list, area);
}

fn render_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(
        "Tab: switch field | Enter: confirm | b: balance | r: reset | q: quit",
    )
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, area);
}

fn render_confirm(f: &mut Frame, area: Rect) {
    let popup = centered_rect(50, 5, area);

    let dialog = Paragraph::new(vec![
        Line::from("Really reset the balance and the history?"),
        Line::from(Span::styled("y: yes   n: no", Style::default().fg(Color::Yellow))),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .title("Reset account")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    );

    f.render_widget(Clear, popup);
    f.render_widget(dialog, popup);
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let width = area.width * percent_x / 100;
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height: height.min(area.height),
    }
}
