use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;
use tracing::warn;

use crate::db::Database;
use crate::models::JobStatus;
use crate::ranker::RankedJob;

struct AppState {
    matches: Vec<RankedJob>,
    selected: usize,
    scroll_offset: u16,
}

impl AppState {
    fn new(matches: Vec<RankedJob>) -> Self {
        Self {
            matches,
            selected: 0,
            scroll_offset: 0,
        }
    }

    fn current(&self) -> Option<&RankedJob> {
        self.matches.get(self.selected)
    }

    fn next(&mut self) {
        if !self.matches.is_empty() && self.selected < self.matches.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn set_status(&mut self, db: &Database, status: JobStatus) {
        let Some(entry) = self.matches.get_mut(self.selected) else {
            return;
        };
        match db.update_job_status(entry.job.id, status) {
            Ok(()) => entry.job.status = status,
            Err(e) => warn!(id = entry.job.id, "failed to update status: {e:#}"),
        }
    }
}

fn status_for_key(code: KeyCode) -> Option<JobStatus> {
    match code {
        KeyCode::Char('n') => Some(JobStatus::New),
        KeyCode::Char('r') => Some(JobStatus::Reviewing),
        KeyCode::Char('a') => Some(JobStatus::Applied),
        KeyCode::Char('x') => Some(JobStatus::Rejected),
        KeyCode::Char('c') => Some(JobStatus::Closed),
        _ => None,
    }
}

pub fn run_browse(db: &Database, matches: Vec<RankedJob>) -> Result<()> {
    if matches.is_empty() {
        println!("No matching jobs.");
        return Ok(());
    }

    let mut state = AppState::new(matches);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, db);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    db: &Database,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                code => {
                    if let Some(status) = status_for_key(code) {
                        state.set_status(db, status);
                    }
                }
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn score_style(score: u32) -> Style {
    match score {
        70.. => Style::default().fg(Color::Green),
        40..=69 => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::DarkGray),
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(60),
        ])
        .split(frame.area());

    // Left panel: ranked list
    let items: Vec<ListItem> = state
        .matches
        .iter()
        .map(|entry| {
            let job = &entry.job;
            let location = if job.location.is_empty() { "?" } else { job.location.as_str() };
            let line = Line::from(vec![
                Span::styled(
                    format!("{:>3} ", entry.job_match.score),
                    score_style(entry.job_match.score),
                ),
                Span::raw(format!(
                    "#{:<4} {} | {}",
                    job.id,
                    shorten(&job.title, 32),
                    location
                )),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Matches ({}) ", state.matches.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: match detail
    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let help_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let help = Paragraph::new(
        " j/k:navigate  J/K:scroll  n:new r:reviewing a:applied x:reject c:close  q:quit"
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, help_area[1]);
}

fn build_detail(state: &AppState) -> Text<'_> {
    let Some(entry) = state.current() else {
        return Text::raw("No job selected");
    };
    let job = &entry.job;
    let job_match = &entry.job_match;

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        job.title.as_str(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if !job.location.is_empty() {
        lines.push(Line::from(format!("Location: {}", job.location)));
    }
    lines.push(Line::from(format!("Status: {}", job.status)));
    if let Some(url) = &job.url {
        lines.push(Line::from(format!("URL: {}", url)));
    }
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(
        format!("Match score: {}/100", job_match.score),
        score_style(job_match.score).add_modifier(Modifier::BOLD),
    )));
    if job_match.reasons.is_empty() {
        lines.push(Line::from(Span::styled(
            "  (nothing in your profile matched)",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for reason in &job_match.reasons {
        lines.push(Line::from(format!("  - {}", reason)));
    }
    if !job_match.matched_keywords.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("  Keywords: {}", job_match.matched_keywords.join(", ")),
            Style::default().fg(Color::Cyan),
        )));
    }
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(
        "DESCRIPTION",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    for line in textwrap::fill(&job.description, 70).lines() {
        lines.push(Line::from(format!("  {}", line)));
    }

    if let Some(requirements) = &job.requirements {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "REQUIREMENTS",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(requirements, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}

fn shorten(s: &str, max: usize) -> String {
    if textwrap::core::display_width(s) <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
