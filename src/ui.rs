use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gpa_planner::schedule::{hours, DAY_ORDER};
use gpa_planner::{
    slot_column, CourseRecord, GradeSheet, RegistrationStatus, SectionListing, StatusKind,
    Timetable, MAX_ATTEMPTS,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    GradeSheet,
    Summary,
    Timetable,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::GradeSheet => Page::Summary,
            Page::Summary => Page::Timetable,
            Page::Timetable => Page::GradeSheet,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::GradeSheet => Page::Timetable,
            Page::Summary => Page::GradeSheet,
            Page::Timetable => Page::Summary,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::GradeSheet => "Grade Sheet",
            Page::Summary => "Summary",
            Page::Timetable => "Timetable",
        }
    }
}

pub struct App {
    pub sheet: GradeSheet,
    pub listing: SectionListing,
    pub state: TableState,
    pub sections_state: TableState,
    pub current_page: Page,

    /// Attempt slot under the cursor (0-based)
    pub slot: usize,

    /// In-progress cell edit
    pub editing: Option<String>,

    /// Which listing sections are drawn on the timetable
    pub selected_sections: Vec<bool>,

    pub message: Option<String>,
}

impl App {
    pub fn new(sheet: GradeSheet, listing: SectionListing) -> Self {
        let mut state = TableState::default();
        if !sheet.is_empty() {
            state.select(Some(0));
        }

        let mut sections_state = TableState::default();
        if !listing.sections.is_empty() {
            sections_state.select(Some(0));
        }

        let selected_sections = vec![true; listing.sections.len()];

        Self {
            sheet,
            listing,
            state,
            sections_state,
            current_page: Page::GradeSheet,
            slot: 0,
            editing: None,
            selected_sections,
            message: None,
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    pub fn selected_record(&self) -> Option<&CourseRecord> {
        self.state.selected().and_then(|i| self.sheet.record_at(i))
    }

    fn active_state(&mut self) -> (&mut TableState, usize) {
        match self.current_page {
            Page::Timetable => (&mut self.sections_state, self.listing.sections.len()),
            _ => (&mut self.state, self.sheet.len()),
        }
    }

    pub fn next(&mut self) {
        let (state, len) = self.active_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (state, len) = self.active_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let (state, len) = self.active_state();
        if len == 0 {
            return;
        }
        let i = state.selected().map_or(0, |i| (i + 20).min(len - 1));
        state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let (state, _) = self.active_state();
        let i = state.selected().map_or(0, |i| i.saturating_sub(20));
        state.select(Some(i));
    }

    pub fn next_slot(&mut self) {
        self.slot = (self.slot + 1) % MAX_ATTEMPTS;
    }

    pub fn previous_slot(&mut self) {
        self.slot = (self.slot + MAX_ATTEMPTS - 1) % MAX_ATTEMPTS;
    }

    // ------------------------------------------------------------------------
    // Cell editing
    // ------------------------------------------------------------------------

    pub fn begin_edit(&mut self) {
        let current = self
            .selected_record()
            .and_then(|r| r.attempts.get(self.slot))
            .map(|s| s.as_str().to_string())
            .unwrap_or_default();
        self.editing = Some(current);
    }

    pub fn push_char(&mut self, c: char) {
        if let Some(buffer) = self.editing.as_mut() {
            if buffer.chars().count() < 8 {
                buffer.push(c);
            }
        }
    }

    pub fn pop_char(&mut self) {
        if let Some(buffer) = self.editing.as_mut() {
            buffer.pop();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    pub fn commit_edit(&mut self) {
        let Some(buffer) = self.editing.take() else {
            return;
        };
        self.write_cell(&buffer);
    }

    pub fn clear_cell(&mut self) {
        self.write_cell("");
    }

    fn write_cell(&mut self, raw: &str) {
        let Some(row) = self.state.selected() else {
            return;
        };
        let code = self.sheet.record_at(row).map(|r| r.code().to_string()).unwrap_or_default();

        let report = self.sheet.edit_cell(row, self.slot, raw);
        self.message = Some(if report.changed() {
            format!(
                "{} {} updated, GPA {:.2}",
                code,
                slot_column(self.slot),
                self.sheet.aggregate().final_gpa
            )
        } else {
            format!("{} unchanged", code)
        });
    }

    // ------------------------------------------------------------------------
    // Timetable
    // ------------------------------------------------------------------------

    pub fn toggle_section(&mut self) {
        if let Some(flag) = self
            .sections_state
            .selected()
            .and_then(|i| self.selected_sections.get_mut(i))
        {
            *flag = !*flag;
        }
    }

    pub fn timetable(&self) -> Timetable {
        let chosen: Vec<_> = self
            .listing
            .sections
            .iter()
            .zip(&self.selected_sections)
            .filter(|(_, on)| **on)
            .map(|(s, _)| s)
            .collect();
        Timetable::build(&chosen)
    }
}

pub fn status_color(status: &RegistrationStatus) -> Color {
    match status.kind() {
        StatusKind::CurrentlyRegistered => Color::Yellow,
        StatusKind::Passed => Color::Green,
        StatusKind::BlockedByPrerequisite => Color::DarkGray,
        StatusKind::FailedRetakeable => Color::Red,
        StatusKind::EligibleToRegister => Color::Cyan,
    }
}

/// "#rrggbb" → terminal colour
pub fn hex_color(hex: &str) -> Color {
    let digits = hex.trim_start_matches('#');
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|h| u8::from_str_radix(h, 16).ok())
    };
    match (digits.len(), channel(0), channel(2), channel(4)) {
        (6, Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::White,
    }
}

/// Block index covering each of `width` columns of a day row
pub fn day_columns(timetable: &Timetable, row: usize, width: usize) -> Vec<Option<usize>> {
    let start = hours(timetable.start);
    let span = (hours(timetable.end) - start).max(1.0);

    (0..width)
        .map(|c| {
            let t = start + (c as f64 + 0.5) / width as f64 * span;
            timetable
                .blocks
                .iter()
                .position(|b| b.row == row && b.x <= t && t < b.x + b.width)
        })
        .collect()
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

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // Edit mode swallows everything but confirm / cancel
        if app.editing.is_some() {
            match key.code {
                KeyCode::Enter => app.commit_edit(),
                KeyCode::Esc => app.cancel_edit(),
                KeyCode::Backspace => app.pop_char(),
                KeyCode::Char(c) => app.push_char(c),
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    app.previous_page();
                } else {
                    app.next_page();
                }
            }
            KeyCode::BackTab => app.previous_page(),
            KeyCode::Enter if app.current_page == Page::GradeSheet => app.begin_edit(),
            KeyCode::Delete | KeyCode::Backspace if app.current_page == Page::GradeSheet => {
                app.clear_cell()
            }
            KeyCode::Right | KeyCode::Char('l') => app.next_slot(),
            KeyCode::Left | KeyCode::Char('h') => app.previous_slot(),
            KeyCode::Char(' ') if app.current_page == Page::Timetable => app.toggle_section(),
            KeyCode::Down | KeyCode::Char('j') => app.next(),
            KeyCode::Up | KeyCode::Char('k') => app.previous(),
            KeyCode::PageDown => app.page_down(),
            KeyCode::PageUp => app.page_up(),
            _ => {}
        }
    }
}

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

    match app.current_page {
        Page::GradeSheet => render_sheet(f, chunks[1], app),
        Page::Summary => render_summary(f, chunks[1], app),
        Page::Timetable => render_timetable(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let aggregate = app.sheet.aggregate();

    let mut tab_spans = vec![];
    for (i, page) in [Page::GradeSheet, Page::Summary, Page::Timetable].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("{} ({})", app.sheet.student_name(), app.sheet.student_id()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("GPA {:.2}{}", aggregate.final_gpa, if aggregate.provisional { "*" } else { "" }),
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_sheet(f: &mut Frame, area: Rect, app: &mut App) {
    let mut titles = vec!["Code".to_string(), "Name".to_string(), "Cr".to_string()];
    titles.extend((0..MAX_ATTEMPTS).map(|i| format!("A{}", i + 1)));
    titles.extend(["Load", "Effort", "Status"].map(String::from));

    let header_cells = titles.into_iter().map(|h| {
        Cell::from(h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let selected = app.state.selected();
    let rows = app.sheet.records().iter().enumerate().map(|(row, record)| {
        let color = status_color(&record.status);

        let mut cells = vec![
            Cell::from(record.course.code.clone()),
            Cell::from(truncate(&record.course.name, 28)),
            Cell::from(record.course.credit_hours.to_string()),
        ];

        for (i, slot) in record.attempts.slots().iter().enumerate() {
            let under_cursor = selected == Some(row) && i == app.slot;
            let text = match (&app.editing, under_cursor) {
                (Some(buffer), true) => format!("{}_", buffer),
                _ => slot.as_str().to_string(),
            };
            let style = if under_cursor {
                Style::default().fg(Color::Black).bg(Color::Yellow)
            } else if slot.is_registered() {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            cells.push(Cell::from(text).style(style));
        }

        cells.push(Cell::from(format!("{:.2}", record.adjusted_load)));
        cells.push(Cell::from(format!("{:.2}", record.subject_effort)));
        cells.push(Cell::from(record.status.to_string()).style(Style::default().fg(color)));

        Row::new(cells).height(1)
    });

    let mut widths = vec![Constraint::Length(10), Constraint::Length(30), Constraint::Length(3)];
    widths.extend(std::iter::repeat(Constraint::Length(5)).take(MAX_ATTEMPTS));
    widths.extend([Constraint::Length(7), Constraint::Length(7), Constraint::Min(20)]);

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(" Courses "),
        )
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_summary(f: &mut Frame, area: Rect, app: &App) {
    let aggregate = app.sheet.aggregate();
    let counts = app.sheet.status_counts();

    let mut content = vec![
        Line::from(""),
        Line::from(Span::styled(
            "  Session Totals",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(format!("  Subject effort      {:>8.2}", aggregate.total_subject_effort)),
        Line::from(format!("  Adjusted load       {:>8.2}", aggregate.total_adjusted_load)),
        Line::from(vec![
            Span::raw("  Final GPA           "),
            Span::styled(
                format!("{:>8.2}", aggregate.final_gpa),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
        ]),
    ];

    if aggregate.provisional {
        content.push(Line::from(Span::styled(
            format!(
                "  Provisional: {} course(s) registered, counted as 0 points",
                aggregate.pending_courses
            ),
            Style::default().fg(Color::Yellow),
        )));
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Registration Status",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )));
    content.push(Line::from(""));

    for kind in StatusKind::ALL {
        let count = counts.get(&kind).copied().unwrap_or(0);
        let codes: Vec<&str> = app.sheet.with_status(kind).iter().map(|r| r.code()).collect();
        content.push(Line::from(vec![
            Span::styled(format!("  {:<24}", kind.label()), Style::default().fg(Color::Yellow)),
            Span::raw(format!("{:>3}  ", count)),
            Span::styled(codes.join(" "), Style::default().fg(Color::DarkGray)),
        ]));
    }

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Summary "),
    );
    f.render_widget(paragraph, area);
}

fn render_timetable(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(11), Constraint::Min(0)])
        .split(area);

    let timetable = app.timetable();

    // Day grid
    let grid_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(format!(
            " Week {}–{} ",
            timetable.start.format("%H:%M"),
            timetable.end.format("%H:%M")
        ));
    let inner = grid_block.inner(chunks[0]);
    let width = inner.width.saturating_sub(5) as usize;

    let mut lines = Vec::new();
    for (row, day) in DAY_ORDER.iter().enumerate() {
        let mut spans = vec![Span::styled(format!("{:<5}", day.to_string()), Style::default().fg(Color::Yellow))];
        let columns = day_columns(&timetable, row, width);

        let mut c = 0;
        while c < columns.len() {
            let run = columns[c..].iter().take_while(|b| **b == columns[c]).count();
            match columns[c].and_then(|i| timetable.blocks.get(i)) {
                Some(block) => {
                    let text: String = block.code.chars().chain(std::iter::repeat(' ')).take(run).collect();
                    spans.push(Span::styled(
                        text,
                        Style::default().fg(Color::Black).bg(hex_color(block.color)),
                    ));
                }
                None => spans.push(Span::styled("·".repeat(run), Style::default().fg(Color::DarkGray))),
            }
            c += run;
        }
        lines.push(Line::from(spans));
    }

    if !timetable.unscheduled.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("No meeting time: {}", timetable.unscheduled.join(", ")),
            Style::default().fg(Color::Red),
        )));
    }

    f.render_widget(Paragraph::new(lines).block(grid_block), chunks[0]);

    // Section picker
    let header = Row::new(["", "Code", "Name", "Time", "Teacher", "Status"].map(|h| {
        Cell::from(h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    }))
    .style(Style::default().bg(Color::DarkGray));

    let rows = app
        .listing
        .sections
        .iter()
        .zip(&app.selected_sections)
        .map(|(section, on)| {
            Row::new(vec![
                Cell::from(if *on { "[x]" } else { "[ ]" }),
                Cell::from(section.code.clone()),
                Cell::from(truncate(&section.name, 28)),
                Cell::from(truncate(&section.time, 30)),
                Cell::from(section.teacher.clone()),
                Cell::from(section.status.clone()),
            ])
        });

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(10),
            Constraint::Length(30),
            Constraint::Length(32),
            Constraint::Length(20),
            Constraint::Min(8),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Sections "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, chunks[1], &mut app.sections_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let mut status_spans = vec![];
    if let Some(message) = &app.message {
        status_spans.push(Span::styled(format!(" {} ", message), Style::default().fg(Color::Green)));
        status_spans.push(Span::raw("| "));
    }

    if app.editing.is_some() {
        status_spans.extend([
            key("Enter"),
            Span::raw(" Save | "),
            key("Esc"),
            Span::raw(" Cancel"),
        ]);
    } else {
        match app.current_page {
            Page::GradeSheet => status_spans.extend([
                Span::styled(format!("{} ", slot_column(app.slot)), Style::default().fg(Color::Cyan)),
                Span::raw("| "),
                key("Enter"),
                Span::raw(" Edit | "),
                key("Del"),
                Span::raw(" Clear | "),
                key("←/→"),
                Span::raw(" Attempt | "),
            ]),
            Page::Timetable => status_spans.extend([key("Space"), Span::raw(" Toggle | ")]),
            Page::Summary => {}
        }
        status_spans.extend([
            key("Tab"),
            Span::raw(" Page | "),
            key("↑/↓"),
            Span::raw(" Nav | "),
            Span::styled("q", Style::default().fg(Color::Red)),
            Span::raw(" Quit"),
        ]);
    }

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
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpa_planner::{Course, CourseRegistry, PlannerConfig};
    use std::path::Path;

    fn app() -> App {
        let catalog = CourseRegistry::from_courses(vec![
            Course::new("Y", "Prerequisite", 3),
            Course::new("X", "Dependent", 3).with_prerequisite("Y"),
        ])
        .unwrap();
        let listing = SectionListing::from_reader(
            "Code,Name,Time,Status,Teacher,Students\nY,Prerequisite,Sun 08:00-09:00,Open,Dr. A,10\n"
                .as_bytes(),
            Path::new("sections.csv"),
        )
        .unwrap();
        App::new(GradeSheet::new(&catalog, PlannerConfig::default()), listing)
    }

    #[test]
    fn test_page_cycle() {
        let mut app = app();
        app.next_page();
        assert_eq!(app.current_page, Page::Summary);
        app.previous_page();
        app.previous_page();
        assert_eq!(app.current_page, Page::Timetable);
    }

    #[test]
    fn test_edit_commits_through_sheet() {
        let mut app = app();
        app.begin_edit();
        app.push_char('b');
        app.commit_edit();

        assert!(app.editing.is_none());
        assert_eq!(app.sheet.record("Y").unwrap().status, RegistrationStatus::Passed);
        assert_eq!(app.sheet.record("X").unwrap().status, RegistrationStatus::EligibleToRegister);
        assert!(app.message.as_deref().unwrap_or("").contains("GPA 3.00"));
    }

    #[test]
    fn test_cancel_leaves_sheet_untouched() {
        let mut app = app();
        let revision = app.sheet.revision();
        app.begin_edit();
        app.push_char('A');
        app.cancel_edit();

        assert_eq!(app.sheet.revision(), revision);
    }

    #[test]
    fn test_slot_cursor_wraps() {
        let mut app = app();
        app.previous_slot();
        assert_eq!(app.slot, MAX_ATTEMPTS - 1);
        app.next_slot();
        assert_eq!(app.slot, 0);
    }

    #[test]
    fn test_toggle_section_empties_timetable() {
        let mut app = app();
        assert_eq!(app.timetable().blocks.len(), 1);

        app.toggle_section();
        assert!(app.timetable().blocks.is_empty());
    }

    #[test]
    fn test_hex_color() {
        assert_eq!(hex_color("#1f77b4"), Color::Rgb(0x1f, 0x77, 0xb4));
        assert_eq!(hex_color("nope"), Color::White);
    }

    #[test]
    fn test_day_columns_cover_block() {
        let app = app();
        let timetable = app.timetable();
        // 07:00–10:00 over 3 columns: only the middle hour is the block
        let columns = day_columns(&timetable, 0, 3);
        assert_eq!(columns, vec![None, Some(0), None]);
        assert!(day_columns(&timetable, 1, 3).iter().all(Option::is_none));
    }
}
