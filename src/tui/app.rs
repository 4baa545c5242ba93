//! Interactive TUI application.

#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_sign_loss)]

use crate::config::Catalog;
use crate::dns::report::{default_export_path, export_csv, format_latency};
use crate::dns::types::{AddressFamily, RunConfig, RunReport, Transport};
use crate::dns::{ChannelSink, Orchestrator, RunEvent};
use crate::error::{Error, Result};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, BorderType, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

const STATUS_READY: &str = "Ready to test DNS servers";

/// Rows of the config view, in display order.
const CONFIG_ROWS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum View {
    #[default]
    Test,
    History,
    Config,
    Help,
}

impl View {
    const ALL: [Self; 4] = [Self::Test, Self::History, Self::Config, Self::Help];

    fn title(self) -> &'static str {
        match self {
            Self::Test => "Test",
            Self::History => "History",
            Self::Config => "Config",
            Self::Help => "Help",
        }
    }
}

pub struct App {
    catalog: Catalog,
    /// Selection flags, one per catalog provider.
    selected: Vec<bool>,
    config: RunConfig,
    orchestrator: Orchestrator,
    report: Option<RunReport>,
    status: String,
    current_view: View,
    tab_index: usize,
    testing: bool,
    tested_count: usize,
    total_count: usize,
    cursor: usize,
    config_cursor: usize,
    /// Channel sender handed to each run's sink.
    event_tx: Option<mpsc::UnboundedSender<RunEvent>>,
    /// Table state for scrolling.
    table_state: TableState,
}

impl App {
    #[must_use]
    pub fn new(catalog: Catalog, orchestrator: Orchestrator) -> Self {
        let selected = vec![false; catalog.len()];
        Self {
            catalog,
            selected,
            config: RunConfig::default(),
            orchestrator,
            report: None,
            status: STATUS_READY.to_string(),
            current_view: View::default(),
            tab_index: 0,
            testing: false,
            tested_count: 0,
            total_count: 0,
            cursor: 0,
            config_cursor: 0,
            event_tx: None,
            table_state: TableState::default().with_selected(Some(0)),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        // Create channel for run events
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.event_tx = Some(tx);

        // Initialize terminal with raw mode and alternate screen
        let mut terminal = ratatui::init();

        let res = self.run_loop(&mut terminal, &mut rx).await;

        // Restore terminal state
        ratatui::restore();
        self.orchestrator.cancel();

        res
    }

    async fn run_loop(
        &mut self,
        terminal: &mut ratatui::DefaultTerminal,
        rx: &mut mpsc::UnboundedReceiver<RunEvent>,
    ) -> Result<()> {
        loop {
            // 1. Process all pending run events
            while let Ok(event) = rx.try_recv() {
                self.handle_event(event);
            }

            // 2. Render UI
            terminal
                .draw(|f| self.draw(f))
                .map_err(|e| Error::tui(e.to_string()))?;

            // 3. Handle keyboard events (non-blocking with 50ms timeout)
            if crossterm::event::poll(Duration::from_millis(50))? {
                if let crossterm::event::Event::Key(key) = crossterm::event::read()? {
                    if key.kind == crossterm::event::KeyEventKind::Press && !self.handle_key(key) {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: RunEvent) {
        match event {
            RunEvent::Started { total } => {
                self.total_count = total;
                self.tested_count = 0;
            }
            RunEvent::Progress { done, total } => {
                self.total_count = total;
                self.tested_count = self.tested_count.max(done);
            }
            RunEvent::Status(message) => {
                self.status = message;
            }
            RunEvent::Completed(report) => {
                self.testing = false;
                self.tested_count = self.total_count;
                self.report = Some(*report);
            }
        }
    }

    fn handle_key(&mut self, key: crossterm::event::KeyEvent) -> bool {
        use crossterm::event::KeyCode;

        match key.code {
            KeyCode::Char('c')
                if key
                    .modifiers
                    .contains(crossterm::event::KeyModifiers::CONTROL) =>
            {
                return false;
            }

            KeyCode::Tab => {
                self.switch_view((self.tab_index + 1) % View::ALL.len());
            }
            KeyCode::Char(c @ '1'..='4') => {
                self.switch_view(c as usize - '1' as usize);
            }

            KeyCode::Char('q') if self.current_view == View::Help => {
                self.switch_view(0);
            }
            KeyCode::Esc if self.current_view == View::Help => {
                self.switch_view(0);
            }
            KeyCode::Char('q') => return false,

            _ => match self.current_view {
                View::Test => self.handle_test_key(key.code),
                View::Config => self.handle_config_key(key.code),
                View::History | View::Help => {}
            },
        }

        true
    }

    fn handle_test_key(&mut self, code: crossterm::event::KeyCode) {
        use crossterm::event::KeyCode;

        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor = self.cursor.saturating_sub(1);
                self.table_state.select(Some(self.cursor));
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let max = self.catalog.len().saturating_sub(1);
                self.cursor = (self.cursor + 1).min(max);
                self.table_state.select(Some(self.cursor));
            }
            KeyCode::Char(' ') => {
                if let Some(flag) = self.selected.get_mut(self.cursor) {
                    *flag = !*flag;
                }
            }
            KeyCode::Char('a') => {
                let all = self.selected.iter().all(|s| *s);
                self.selected.iter_mut().for_each(|s| *s = !all);
            }
            KeyCode::Enter | KeyCode::Char('r') => {
                if !self.testing {
                    self.start_test();
                }
            }
            KeyCode::Char('x') if self.testing => {
                self.orchestrator.cancel();
                self.status = "Cancelling...".to_string();
            }
            KeyCode::Char('e') => self.export_results(),
            _ => {}
        }
    }

    fn handle_config_key(&mut self, code: crossterm::event::KeyCode) {
        use crossterm::event::KeyCode;

        let (increase, decrease, toggle) = match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.config_cursor = self.config_cursor.saturating_sub(1);
                return;
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.config_cursor = (self.config_cursor + 1).min(CONFIG_ROWS - 1);
                return;
            }
            KeyCode::Right | KeyCode::Char('+' | 'l') => (true, false, false),
            KeyCode::Left | KeyCode::Char('-' | 'h') => (false, true, false),
            KeyCode::Char(' ') | KeyCode::Enter => (false, false, true),
            _ => return,
        };

        let config = &mut self.config;
        match self.config_cursor {
            0 if increase => config.increase_tests(),
            0 if decrease => config.decrease_tests(),
            1 if increase => config.increase_timeout(),
            1 if decrease => config.decrease_timeout(),
            2 if increase || decrease || toggle => {
                config.transport = match config.transport {
                    Transport::Udp => Transport::Tcp,
                    Transport::Tcp => Transport::Udp,
                };
            }
            3 if increase || decrease || toggle => {
                config.family = match config.family {
                    AddressFamily::V4 => AddressFamily::V6,
                    AddressFamily::V6 => AddressFamily::V4,
                };
            }
            4 if increase || decrease || toggle => config.parallel = !config.parallel,
            _ => {}
        }
    }

    fn switch_view(&mut self, index: usize) {
        self.tab_index = index;
        self.current_view = View::ALL[index];
    }

    fn start_test(&mut self) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };

        let providers = self.catalog.select_indices(&self.selected);
        let sink = Arc::new(ChannelSink::from_sender(tx));

        // The orchestrator reports empty selections through the sink.
        match self.orchestrator.start(providers, self.config, sink) {
            Ok(_) => {
                self.testing = true;
                self.report = None;
                self.tested_count = 0;
            }
            Err(Error::AlreadyRunning) => {}
            Err(e) => self.status = e.to_string(),
        }
    }

    fn export_results(&mut self) {
        let Some(report) = &self.report else {
            self.status = "Nothing to export yet".to_string();
            return;
        };

        let path = default_export_path(chrono::Local::now());
        self.status = match export_csv(&path, &report.results) {
            Ok(()) => format!("Results exported to {}", path.display()),
            Err(e) => {
                tracing::error!("Export failed: {e}");
                format!("Export failed: {e}")
            }
        };
    }

    fn draw(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(2),
                Constraint::Min(10),
                Constraint::Length(3),
            ])
            .split(f.area());

        self.draw_title_bar(f, chunks[0]);
        self.draw_tabs(f, chunks[1]);

        match self.current_view {
            View::Test => self.draw_test(f, chunks[2]),
            View::History => self.draw_history(f, chunks[2]),
            View::Config => self.draw_config(f, chunks[2]),
            View::Help => self.draw_help(f, chunks[2]),
        }

        self.draw_progress(f, chunks[3]);
    }

    fn draw_title_bar(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(20), Constraint::Min(10)])
            .split(area);

        let title = Paragraph::new("DNS Speed Test").style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
        f.render_widget(title, chunks[0]);

        let selected = self.selected.iter().filter(|s| **s).count();
        let counts = Paragraph::new(format!(
            "{}/{} providers selected, {} domains",
            selected,
            self.catalog.len(),
            self.catalog.domains.len()
        ))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(ratatui::layout::Alignment::Right);
        f.render_widget(counts, chunks[1]);
    }

    fn draw_tabs(&self, f: &mut Frame, area: Rect) {
        let mut tab_text = String::new();
        for (i, view) in View::ALL.iter().enumerate() {
            if i == self.tab_index {
                tab_text.push_str(&format!("[{}] ", view.title()));
            } else {
                tab_text.push_str(&format!(" {} ", view.title()));
            }
        }
        let tabs = Paragraph::new(tab_text)
            .style(Style::default().fg(Color::White))
            .block(Block::default().border_type(BorderType::Plain));
        f.render_widget(tabs, area);
    }

    fn draw_test(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(area);

        let show_v6 = self.config.family == AddressFamily::V6;
        let rows: Vec<Row> = self
            .catalog
            .providers
            .iter()
            .zip(&self.selected)
            .map(|(p, on)| {
                let mark = if *on { "[x]" } else { "[ ]" };
                let addr = match (show_v6, p.ipv6) {
                    (true, Some(v6)) => format!("{}, {}", p.ipv4, v6),
                    _ => p.ipv4.to_string(),
                };
                Row::new(vec![
                    Cell::from(mark),
                    Cell::from(p.name.clone()),
                    Cell::from(addr).style(Style::default().fg(Color::DarkGray)),
                ])
            })
            .collect();

        let providers = Table::new(
            rows,
            [
                Constraint::Length(4),
                Constraint::Length(22),
                Constraint::Min(15),
            ],
        )
        .block(
            Block::default()
                .title(" DNS Providers ")
                .border_type(BorderType::Rounded),
        )
        .row_highlight_style(Style::default().bg(Color::Blue));

        // Use stateful rendering for scroll support
        f.render_stateful_widget(providers, chunks[0], &mut self.table_state);

        let Some(report) = &self.report else {
            let msg = if self.testing {
                "Testing DNS servers..."
            } else {
                "Select providers with [Space], start with [Enter]"
            };
            let empty_msg = Paragraph::new(msg)
                .style(Style::default().fg(Color::DarkGray))
                .alignment(ratatui::layout::Alignment::Center);
            f.render_widget(empty_msg, chunks[1]);
            return;
        };

        let rows: Vec<Row> = report
            .results
            .iter()
            .enumerate()
            .map(|(idx, r)| {
                let latency_style = if r.success() {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::Red)
                };
                Row::new(vec![
                    Cell::from(format!("{}", idx + 1)),
                    Cell::from(r.provider.name.clone()),
                    Cell::from(r.address.to_string()),
                    Cell::from(format_latency(r)).style(latency_style),
                    Cell::from(format!("{}/{}", r.success_count, r.total_probes)),
                ])
            })
            .collect();

        let results = Table::new(
            rows,
            [
                Constraint::Length(3),
                Constraint::Length(21),
                Constraint::Length(16),
                Constraint::Length(18),
                Constraint::Length(7),
            ],
        )
        .block(
            Block::default()
                .title(" DNS Provider Latency Results ")
                .border_type(BorderType::Rounded),
        );
        f.render_widget(results, chunks[1]);
    }

    fn draw_history(&self, f: &mut Frame, area: Rect) {
        let history = self.orchestrator.history();
        if history.is_empty() {
            let msg = Paragraph::new("No test runs yet")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(ratatui::layout::Alignment::Center);
            f.render_widget(msg, area);
            return;
        }

        let mut rows = Vec::new();
        for run in history.all().iter().rev() {
            rows.push(
                Row::new(vec![
                    Cell::from(format!("Test Run: {}", run.timestamp.format("%Y-%m-%d %H:%M:%S"))),
                    Cell::from(""),
                ])
                .style(Style::default().fg(Color::Cyan)),
            );
            for r in &run.results {
                let text = r.latency.mean().map_or_else(|| "Failed".to_string(), |d| format!("{:?}", d));
                rows.push(Row::new(vec![Cell::from(format!("  {}", r.provider.name)), Cell::from(text)]));
            }
        }

        let table = Table::new(rows, [Constraint::Length(32), Constraint::Min(12)]).block(
            Block::default()
                .title(" Test History ")
                .border_type(BorderType::Rounded),
        );
        f.render_widget(table, area);
    }

    fn draw_config(&self, f: &mut Frame, area: Rect) {
        let c = &self.config;
        let items = [
            ("Tests per domain", c.tests_per_domain.to_string()),
            ("Timeout", format!("{:?}", c.timeout)),
            ("Use TCP for DNS queries", yes_no(c.transport == Transport::Tcp)),
            ("Use IPv6 when available", yes_no(c.family == AddressFamily::V6)),
            ("Run tests in parallel", yes_no(c.parallel)),
        ];

        let rows: Vec<Row> = items
            .iter()
            .enumerate()
            .map(|(i, (label, value))| {
                let style = if i == self.config_cursor {
                    Style::default().bg(Color::Blue)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(format!("  {}", label)),
                    Cell::from(value.clone()).style(Style::default().fg(Color::Yellow)),
                ])
                .style(style)
            })
            .collect();

        let table = Table::new(rows, [Constraint::Length(28), Constraint::Min(10)]).block(
            Block::default()
                .title(" Configuration (Up/Down select, Left/Right or -/+ change, Space toggle) ")
                .border_type(BorderType::Rounded),
        );
        f.render_widget(table, area);
    }

    fn draw_help(&self, f: &mut Frame, area: Rect) {
        let help_items = [
            ("Space", "Toggle provider selection"),
            ("a", "Select all / none"),
            ("Enter or r", "Start test"),
            ("x", "Cancel the running test"),
            ("e", "Export results to CSV"),
            ("j/k or Up/Down", "Navigate"),
            ("1/2/3/4", "Switch tabs (Test/History/Config/Help)"),
            ("Tab", "Cycle through tabs"),
            ("q", "Quit application"),
        ];

        let rows: Vec<Row> = help_items
            .iter()
            .map(|(key, desc)| {
                Row::new(vec![
                    Cell::from(format!("  {}  ", key)).style(Style::default().fg(Color::Yellow)),
                    Cell::from(*desc).style(Style::default().fg(Color::White)),
                ])
            })
            .collect();

        let help_table = Table::new(rows, [Constraint::Length(18), Constraint::Min(30)])
            .block(
                Block::default()
                    .title(" Keyboard Shortcuts ")
                    .border_type(BorderType::Rounded),
            )
            .column_spacing(2);

        f.render_widget(help_table, area);
    }

    fn draw_progress(&self, f: &mut Frame, area: Rect) {
        let progress = self.progress_percent();
        let title = format!(
            " {} ({}/{}, {}%) ",
            self.status, self.tested_count, self.total_count, progress
        );

        let gauge = Gauge::default()
            .block(Block::default().title(title).border_type(BorderType::Rounded))
            .gauge_style(Style::default().fg(Color::Cyan))
            .percent(progress);

        f.render_widget(gauge, area);
    }

    fn progress_percent(&self) -> u16 {
        if self.total_count > 0 {
            ((self.tested_count as f64 / self.total_count as f64) * 100.0).min(100.0) as u16
        } else {
            0
        }
    }
}

fn yes_no(value: bool) -> String {
    if value { "yes" } else { "no" }.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::testing::ScriptedLookup;
    use crate::dns::types::ProbeOutcome;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn app() -> App {
        let catalog = Catalog::default();
        let lookup = Arc::new(ScriptedLookup::constant(ProbeOutcome::success(
            std::time::Duration::from_millis(4),
        )));
        let orchestrator = Orchestrator::new(lookup, catalog.domains.clone());
        App::new(catalog, orchestrator)
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_toggle_selection() {
        let mut app = app();
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.catalog.select_indices(&app.selected)[0].name, "Cloudflare Secondary");

        press(&mut app, KeyCode::Char('a'));
        assert!(app.selected.iter().all(|s| *s));
        press(&mut app, KeyCode::Char('a'));
        assert!(app.selected.iter().all(|s| !*s));
    }

    #[test]
    fn test_config_keys_are_clamped() {
        let mut app = app();
        press(&mut app, KeyCode::Char('3'));
        for _ in 0..15 {
            press(&mut app, KeyCode::Char('+'));
        }
        assert_eq!(app.config.tests_per_domain, 10);

        press(&mut app, KeyCode::Down);
        for _ in 0..15 {
            press(&mut app, KeyCode::Char('-'));
        }
        assert_eq!(app.config.timeout, std::time::Duration::from_secs(1));

        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.config.transport, Transport::Tcp);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));
        assert_eq!(app.config.family, AddressFamily::V6);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char(' '));
        assert!(!app.config.parallel);
    }

    #[test]
    fn test_quit_and_help_navigation() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.current_view, View::History);
        press(&mut app, KeyCode::Char('4'));
        assert_eq!(app.current_view, View::Help);
        assert!(press(&mut app, KeyCode::Esc));
        assert_eq!(app.current_view, View::Test);
        assert!(!press(&mut app, KeyCode::Char('q')));
    }

    #[tokio::test]
    async fn test_start_without_selection_reports_status() {
        let mut app = app();
        let (tx, mut rx) = mpsc::unbounded_channel();
        app.event_tx = Some(tx);

        press(&mut app, KeyCode::Enter);
        assert!(!app.testing);
        if let Some(event) = rx.recv().await {
            app.handle_event(event);
        }
        assert_eq!(app.status, "Please select at least one DNS provider");
    }

    #[tokio::test]
    async fn test_run_updates_progress_and_report() {
        let mut app = app();
        let (tx, mut rx) = mpsc::unbounded_channel();
        app.event_tx = Some(tx);

        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Enter);
        assert!(app.testing);

        while app.testing {
            let Some(event) = rx.recv().await else { break };
            app.handle_event(event);
        }

        let report = app.report.as_ref().unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(app.tested_count, 21);
        assert_eq!(app.progress_percent(), 100);
        assert_eq!(app.status, "Testing completed");
        assert_eq!(app.orchestrator.history().len(), 1);
    }
}
