use crate::aggregator::{ProblematicEntrySet, ReportEntry};
use crate::detector::{IssueCounts, Rule};
use crate::record::{Field, RecordSet};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use std::io;

const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    All,
    ByRule(Rule),
}

impl FilterType {
    pub fn title(&self) -> &str {
        match self {
            FilterType::All => "All problematic entries",
            FilterType::ByRule(Rule::Duplicate) => "Duplicates",
            FilterType::ByRule(Rule::InvalidEmail) => "Invalid emails",
            FilterType::ByRule(Rule::InvalidName) => "Invalid names",
        }
    }
}

pub struct App<'a> {
    pub records: &'a RecordSet,
    pub report: &'a ProblematicEntrySet<'a>,
    pub counts: IssueCounts,
    /// Indices into `report.entries()` matching the active filter
    pub filtered: Vec<usize>,
    pub state: TableState,
    pub filter: FilterType,
    pub show_detail: bool,
}

impl<'a> App<'a> {
    pub fn new(records: &'a RecordSet, report: &'a ProblematicEntrySet<'a>, counts: IssueCounts) -> Self {
        let mut app = Self {
            records,
            report,
            counts,
            filtered: Vec::new(),
            state: TableState::default(),
            filter: FilterType::All,
            show_detail: false,
        };
        app.apply_filter(FilterType::All);
        app
    }

    pub fn apply_filter(&mut self, filter: FilterType) {
        self.filter = filter;
        self.filtered = self
            .report
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| match filter {
                FilterType::All => true,
                FilterType::ByRule(rule) => e.rules.contains(rule),
            })
            .map(|(i, _)| i)
            .collect();

        self.state
            .select(if self.filtered.is_empty() { None } else { Some(0) });
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_entry(&self) -> Option<&'a ReportEntry<'a>> {
        let report: &'a ProblematicEntrySet<'a> = self.report;
        self.state
            .selected()
            .and_then(|i| self.filtered.get(i))
            .and_then(|&index| report.entries().get(index))
    }

    pub fn next(&mut self) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i < len - 1 => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.filtered.len();
        if len == 0 {
            return;
        }
        let i = self
            .state
            .selected()
            .map(|i| (i + PAGE_SIZE).min(len - 1))
            .unwrap_or(0);
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.filtered.is_empty() {
            return;
        }
        let i = self
            .state
            .selected()
            .map(|i| i.saturating_sub(PAGE_SIZE))
            .unwrap_or(0);
        self.state.select(Some(i));
    }

    fn field(&self, entry: &ReportEntry, field: Field) -> String {
        self.records
            .field(entry.record, field)
            .unwrap_or("∅")
            .to_string()
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Char('1') => app.apply_filter(FilterType::All),
                KeyCode::Char('2') => app.apply_filter(FilterType::ByRule(Rule::Duplicate)),
                KeyCode::Char('3') => app.apply_filter(FilterType::ByRule(Rule::InvalidEmail)),
                KeyCode::Char('4') => app.apply_filter(FilterType::ByRule(Rule::InvalidName)),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home if !app.filtered.is_empty() => app.state.select(Some(0)),
                KeyCode::End if !app.filtered.is_empty() => {
                    app.state.select(Some(app.filtered.len() - 1))
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Counts
            Constraint::Min(0),    // Entries
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn rule_color(rule: Rule) -> Color {
    match rule {
        Rule::Duplicate => Color::Yellow,
        Rule::InvalidEmail => Color::Red,
        Rule::InvalidName => Color::Magenta,
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            format!("Records: {}", app.records.len()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled(
            format!("Reported: {}", app.report.len()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
    ];

    for rule in Rule::ALL {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            format!("{}: {}", rule.name(), app.counts.get(rule)),
            Style::default().fg(rule_color(rule)),
        ));
    }

    let header = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Row", "First name", "Last name", "Email", "Issues"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let entries = app.report.entries();
    let rows: Vec<Row> = app
        .filtered
        .iter()
        .map(|&index| {
            let entry = &entries[index];
            let issues: Vec<Span> = entry
                .rules
                .iter()
                .map(|r| Span::styled(format!("{} ", r.name()), Style::default().fg(rule_color(r))))
                .collect();

            Row::new(vec![
                Cell::from((entry.row + 1).to_string()),
                Cell::from(truncate(&app.field(entry, Field::FirstName), 20)),
                Cell::from(truncate(&app.field(entry, Field::LastName), 20)),
                Cell::from(truncate(&app.field(entry, Field::Email), 32)),
                Cell::from(Line::from(issues)),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(7),
            Constraint::Length(22),
            Constraint::Length(22),
            Constraint::Length(34),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" {} ", app.filter.title())),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Entry Details ");

    let entry = match app.selected_entry() {
        Some(e) => e,
        None => {
            f.render_widget(Paragraph::new("No entry selected").block(block), area);
            return;
        }
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let mut content = vec![
        Line::from(vec![
            Span::styled("  Source row: ", label),
            Span::raw((entry.row + 1).to_string()),
        ]),
        Line::from(""),
    ];

    for (column, value) in app
        .records
        .schema()
        .columns()
        .iter()
        .zip(entry.record.values())
    {
        content.push(Line::from(vec![
            Span::styled(format!("  {}: ", column), label),
            match value {
                Some(v) => Span::raw(v.clone()),
                None => Span::styled("NULL", Style::default().fg(Color::DarkGray)),
            },
        ]));
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  ISSUES",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
    )));
    for rule in entry.rules.iter() {
        content.push(Line::from(vec![
            Span::styled(format!("  • {}: ", rule.name()), Style::default().fg(rule_color(rule))),
            Span::raw(rule.description()),
        ]));
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Press Enter to close",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    let detail_panel = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: false });

    f.render_widget(detail_panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let key = Style::default().fg(Color::Yellow);

    let status_spans = vec![
        Span::styled(
            format!(" Row: {}/{} ", selected, app.filtered.len()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("1-4", key),
        Span::raw(" Filter | "),
        Span::styled("Enter", key),
        Span::raw(" Details | "),
        Span::styled("↑/↓", key),
        Span::raw(" Nav | "),
        Span::styled("PgUp/PgDn", key),
        Span::raw(" Fast | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
