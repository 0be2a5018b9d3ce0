use anyhow::Result;
use clv_ledger::{
    format_rupiah, sync_store, CustomerInput, LedgerConfig, LedgerError, RecordStore, Segment,
    SqliteSheet,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Ledger,
    Dashboard,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Ledger => Page::Dashboard,
            Page::Dashboard => Page::Ledger,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Ledger => "Customer Ledger",
            Page::Dashboard => "Dashboard",
        }
    }
}

// ============================================================================
// INPUT FORM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Add,
    /// Edit the record at this position (valid for the current render only)
    Edit(usize),
    Import,
}

#[derive(Debug, Clone)]
pub struct Form {
    pub mode: FormMode,
    /// ID, Margin, Biaya_Akuisisi (Import uses only the first field as a path)
    pub fields: [String; 3],
    pub focus: usize,
}

impl Form {
    fn new(mode: FormMode) -> Self {
        Form {
            mode,
            fields: Default::default(),
            focus: 0,
        }
    }

    fn field_count(&self) -> usize {
        match self.mode {
            FormMode::Import => 1,
            _ => 3,
        }
    }

    fn labels(&self) -> &'static [&'static str] {
        match self.mode {
            FormMode::Import => &["CSV path"],
            _ => &["Customer ID", "Total Margin (Rp)", "Acquisition Cost (Rp)"],
        }
    }

    fn to_input(&self) -> std::result::Result<CustomerInput, String> {
        let parse = |label: &str, raw: &str| {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(0);
            }
            raw.parse::<u64>()
                .map_err(|_| format!("{label} must be a non-negative integer"))
        };

        Ok(CustomerInput {
            id: Some(self.fields[0].clone()),
            margin: parse("Margin", &self.fields[1])?,
            acquisition_cost: parse("Acquisition cost", &self.fields[2])?,
        })
    }
}

// ============================================================================
// APP STATE
// ============================================================================

pub struct App {
    pub store: RecordStore,
    pub config: LedgerConfig,
    pub state: TableState,
    pub current_page: Page,
    pub form: Option<Form>,
    pub status: Option<(String, Color)>,
}

impl App {
    pub fn new(store: RecordStore, config: LedgerConfig) -> Self {
        let mut state = TableState::default();
        if !store.is_empty() {
            state.select(Some(0));
        }

        Self {
            store,
            config,
            state,
            current_page: Page::Ledger,
            form: None,
            status: None,
        }
    }

    fn info(&mut self, msg: impl Into<String>) {
        self.status = Some((msg.into(), Color::Green));
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.status = Some((msg.into(), Color::Yellow));
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.status = Some((msg.into(), Color::Red));
    }

    pub fn next(&mut self) {
        let len = self.store.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.store.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    /// Keep the selection inside the table after deletions
    fn clamp_selection(&mut self) {
        let len = self.store.len();
        match self.state.selected() {
            _ if len == 0 => self.state.select(None),
            Some(i) if i >= len => self.state.select(Some(len - 1)),
            None => self.state.select(Some(0)),
            _ => {}
        }
    }

    pub fn open_form(&mut self, mode: FormMode) {
        let mut form = Form::new(mode);
        if let FormMode::Edit(index) = mode {
            match self.store.get(index) {
                Some(rec) => {
                    form.fields = [
                        rec.id().to_string(),
                        rec.margin().to_string(),
                        rec.acquisition_cost().to_string(),
                    ];
                }
                None => return,
            }
        }
        self.form = Some(form);
    }

    pub fn submit_form(&mut self) {
        let Some(form) = self.form.take() else {
            return;
        };

        if form.mode == FormMode::Import {
            let path = PathBuf::from(form.fields[0].trim());
            match self.store.import_csv_path(&path) {
                Ok(count) => self.info(format!("CSV imported: {} records", count)),
                Err(e) => self.error(format!("Import failed: {:#}", e)),
            }
            self.clamp_selection();
            return;
        }

        let input = match form.to_input() {
            Ok(input) => input,
            Err(msg) => {
                self.error(msg);
                self.form = Some(form);
                return;
            }
        };

        match form.mode {
            FormMode::Add => match self.store.add(input) {
                Ok(rec) => {
                    let msg = format!(
                        "Customer '{}' added (CLV = {})",
                        rec.id(),
                        format_rupiah(rec.clv() as f64)
                    );
                    self.info(msg);
                    let last = self.store.len() - 1;
                    self.state.select(Some(last));
                }
                Err(e) => self.error(e.to_string()),
            },
            FormMode::Edit(index) => match self.store.edit(index, input) {
                Ok(true) => self.info(format!("Row {} updated", index)),
                Ok(false) => self.warn(format!("Row {} no longer exists", index)),
                Err(e) => self.error(e.to_string()),
            },
            FormMode::Import => {}
        }
    }

    pub fn delete_selected(&mut self) {
        if let Some(i) = self.state.selected() {
            if let Some(rec) = self.store.delete_at(i) {
                self.info(format!("Deleted row {} ('{}')", i, rec.id()));
            }
        }
        self.clamp_selection();
    }

    /// Delete every record sharing the selected record's ID
    pub fn delete_selected_id(&mut self) {
        let Some(id) = self
            .state
            .selected()
            .and_then(|i| self.store.get(i))
            .map(|r| r.id().to_string())
        else {
            return;
        };

        let removed = self.store.delete(&[id.as_str()]);
        self.info(format!("Deleted {} rows with ID '{}'", removed, id));
        self.clamp_selection();
    }

    pub fn export(&mut self) {
        let path = PathBuf::from(&self.config.export_file_name);
        match self.store.export_csv_path(&path) {
            Ok(()) => self.info(format!("Exported {} rows to {}", self.store.len(), path.display())),
            Err(e) => self.error(format!("Export failed: {:#}", e)),
        }
    }

    pub fn sync(&mut self) {
        let mut sheet = match SqliteSheet::from_config(&self.config) {
            Ok(sheet) => sheet,
            Err(e @ LedgerError::Connection(_)) => {
                self.warn(e.to_string());
                return;
            }
            Err(e) => {
                self.error(e.to_string());
                return;
            }
        };

        match sync_store(&self.store, &mut sheet) {
            Ok(report) => self.info(format!(
                "Saved {} rows to {} [{}]",
                report.rows_written, report.target, report.worksheet
            )),
            Err(e) => self.error(e.to_string()),
        }
    }

    /// Apply one key press. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if let Some(form) = self.form.as_mut() {
            let count = form.field_count();
            match key.code {
                KeyCode::Esc => self.form = None,
                KeyCode::Enter => self.submit_form(),
                KeyCode::Tab | KeyCode::Down => form.focus = (form.focus + 1) % count,
                KeyCode::BackTab | KeyCode::Up => form.focus = (form.focus + count - 1) % count,
                KeyCode::Backspace => {
                    form.fields[form.focus].pop();
                }
                KeyCode::Char(c) => form.fields[form.focus].push(c),
                _ => {}
            }
            return false;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.current_page = self.current_page.next(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::Home => self.clamp_selection_to(0),
            KeyCode::End => self.clamp_selection_to(usize::MAX),
            KeyCode::Char('a') => self.open_form(FormMode::Add),
            KeyCode::Char('i') => self.open_form(FormMode::Import),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(i) = self.state.selected() {
                    self.open_form(FormMode::Edit(i));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => self.delete_selected(),
            KeyCode::Char('D') => self.delete_selected_id(),
            KeyCode::Char('x') => self.export(),
            KeyCode::Char('s') => self.sync(),
            _ => {}
        }
        false
    }

    fn clamp_selection_to(&mut self, i: usize) {
        if self.store.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(i.min(self.store.len() - 1)));
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
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

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.form.is_some() {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_form(f, content_chunks[1], app);
    } else {
        match app.current_page {
            Page::Ledger => render_table(f, chunks[1], app),
            Page::Dashboard => render_dashboard(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn segment_color(segment: Segment) -> Color {
    match segment {
        Segment::High => Color::Green,
        Segment::Mid => Color::Yellow,
        Segment::Low => Color::Red,
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![];
    for (i, page) in [Page::Ledger, Page::Dashboard].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title().to_string(), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Customers: {}", app.store.len()),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" 📊 CLV Ledger "),
    );

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["#", "ID", "Margin", "Biaya_Akuisisi", "CLV", "Segment"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.store.records().iter().enumerate().map(|(i, r)| {
        let color = segment_color(r.segment());
        Row::new(vec![
            Cell::from(i.to_string()),
            Cell::from(r.id().to_string()),
            Cell::from(r.margin().to_string()),
            Cell::from(r.acquisition_cost().to_string()),
            Cell::from(r.clv().to_string()).style(Style::default().fg(color)),
            Cell::from(r.segment().label()).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    let title = if app.store.is_empty() {
        " No data yet: press 'a' to add or 'i' to import a CSV ".to_string()
    } else {
        " Customers ".to_string()
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Length(18),
            Constraint::Length(14),
            Constraint::Length(16),
            Constraint::Length(14),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &App) {
    let Some(summary) = app.store.summary() else {
        let empty = Paragraph::new("No data yet. Add customers or import a CSV.")
            .block(Block::default().borders(Borders::ALL).title(" Dashboard "));
        f.render_widget(empty, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(8),
            Constraint::Length(7),
        ])
        .split(area);

    let metrics = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("  Total Customers: ", Style::default().fg(Color::Cyan)),
            Span::raw(summary.count.to_string()),
        ]),
        Line::from(vec![
            Span::styled("  Average CLV:     ", Style::default().fg(Color::Cyan)),
            Span::raw(format_rupiah(summary.mean_clv)),
        ]),
        Line::from(vec![
            Span::styled("  Median CLV:      ", Style::default().fg(Color::Cyan)),
            Span::raw(format_rupiah(summary.median_clv)),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title(" Metrics "));
    f.render_widget(metrics, chunks[0]);

    let bars: Vec<(&str, u64)> = summary
        .distribution
        .iter()
        .map(|b| (b.segment.short_name(), b.count as u64))
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Segment Distribution "),
        )
        .data(bars.as_slice())
        .bar_width(9)
        .bar_gap(3)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    f.render_widget(chart, chunks[1]);

    let rows = summary.per_segment.iter().map(|s| {
        Row::new(vec![
            Cell::from(s.segment.label()).style(Style::default().fg(segment_color(s.segment))),
            Cell::from(s.count.to_string()),
            Cell::from(format_rupiah(s.mean_clv)),
            Cell::from(format_rupiah(s.median_clv)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(20),
            Constraint::Length(20),
        ],
    )
    .header(
        Row::new(vec!["Segment", "Count", "Avg CLV", "Median CLV"])
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title(" Per Segment "));
    f.render_widget(table, chunks[2]);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let Some(form) = &app.form else {
        return;
    };

    let title = match form.mode {
        FormMode::Add => " Add Customer ".to_string(),
        FormMode::Edit(i) => format!(" Edit Row {} ", i),
        FormMode::Import => " Import CSV ".to_string(),
    };

    let mut lines = vec![Line::from("")];
    for (i, label) in form.labels().iter().enumerate() {
        let focused = i == form.focus;
        let label_style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        let cursor = if focused { "▏" } else { "" };

        lines.push(Line::from(Span::styled(format!("  {}", label), label_style)));
        lines.push(Line::from(format!("  > {}{}", form.fields[i], cursor)));
        lines.push(Line::from(""));
    }
    lines.push(Line::from(Span::styled(
        "  Tab: next field  Enter: save  Esc: cancel",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(title),
    );

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let line = match &app.status {
        Some((msg, color)) => Line::from(Span::styled(msg.clone(), Style::default().fg(*color))),
        None => Line::from(Span::styled(
            "a: add  e: edit  d: delete row  D: delete ID  i: import  x: export  s: save to sheet  Tab: page  q: quit",
            Style::default().fg(Color::DarkGray),
        )),
    };

    let status = Paragraph::new(vec![line]).block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}
