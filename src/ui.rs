use std::time::Duration;

use chrono::Local;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{
        Bar, BarChart, BarGroup, Block, Cell, Clear, Gauge, Paragraph, Row, Table, TableState,
        Tabs, Wrap,
    },
};

use crate::aggregate::{DailyCount, DashboardSummary, HourlyCount};
use crate::domain::{AVATAR_PLACEHOLDER, CMDMode, HELP_TEXT};
use crate::model::{Model, Page, Status};
use crate::record::UserRecord;
use crate::table::TableView;

pub const HEADER_HEIGHT: u16 = 3;
pub const STATUSLINE_HEIGHT: u16 = 1;
pub const KPI_HEIGHT: u16 = 5;
pub const RECENT_HEIGHT: u16 = 9;
pub const SEARCH_HEIGHT: u16 = 3;
const STATUS_MESSAGE_FADE: Duration = Duration::from_secs(5);
const MAX_PAGE_BUTTONS: usize = 20;

#[derive(Debug, Default)]
pub struct DashboardUI {}

impl DashboardUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(STATUSLINE_HEIGHT),
            ])
            .split(frame.area());

        self.draw_header(model, frame, chunks[0]);
        match model.page() {
            Page::Dashboard => self.draw_dashboard(model, frame, chunks[1]),
            Page::Users => self.draw_users(model, frame, chunks[1]),
        }
        self.draw_statusline(model, frame, chunks[2]);

        if model.show_detail()
            && let Some(record) = model.selected()
        {
            self.draw_detail_popup(record, frame);
        }
        if model.show_help() {
            self.draw_help_popup(frame);
        }
    }

    fn draw_header(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let selected: usize = match model.page() {
            Page::Dashboard => 0,
            Page::Users => 1,
        };
        let tabs = Tabs::new(vec![Line::from(" Dashboard "), Line::from(" Users ")])
            .select(selected)
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .block(
                Block::bordered()
                    .title(Line::from(" userdash ".bold()))
                    .title(Line::from(model.source_label().to_string().dim()).right_aligned())
                    .border_set(border::THICK),
            );
        frame.render_widget(tabs, area);
    }

    // -------------------- Dashboard page ---------------------- //

    fn draw_dashboard(&self, model: &Model, frame: &mut Frame, area: Rect) {
        if model.status == Status::Loading && model.records().is_empty() {
            let loading = Paragraph::new("Loading...")
                .centered()
                .block(Block::bordered().title(" User Dashboard "));
            frame.render_widget(loading, area);
            return;
        }

        let summary = model.summary();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(KPI_HEIGHT),
                Constraint::Min(8),
                Constraint::Length(RECENT_HEIGHT),
            ])
            .split(area);

        let kpi = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(30), Constraint::Min(0)])
            .split(rows[0]);
        self.draw_total(summary, frame, kpi[0]);
        self.draw_avatar_split(summary, frame, kpi[1]);

        let charts = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(rows[1]);
        self.draw_daily(&summary.daily, frame, charts[0]);
        self.draw_hourly(&summary.hourly, frame, charts[1]);

        self.draw_recent(&summary.recent, frame, rows[2]);
    }

    fn draw_total(&self, summary: &DashboardSummary, frame: &mut Frame, area: Rect) {
        let text = Text::from(vec![
            Line::from(summary.total.to_string().bold().blue()),
            Line::from("Total Users".dim()),
        ]);
        let total = Paragraph::new(text)
            .centered()
            .block(Block::bordered());
        frame.render_widget(total, area);
    }

    fn draw_avatar_split(&self, summary: &DashboardSummary, frame: &mut Frame, area: Rect) {
        let split = &summary.avatars;
        let label = format!(
            "With Avatar {} / Without Avatar {}",
            split.with_avatar, split.without_avatar
        );
        let gauge = Gauge::default()
            .block(Block::bordered().title(" Avatar Distribution "))
            .gauge_style(Style::default().fg(Color::Blue).bg(Color::LightRed))
            .ratio(split.ratio())
            .label(label);
        frame.render_widget(gauge, area);
    }

    fn draw_daily(&self, daily: &[DailyCount], frame: &mut Frame, area: Rect) {
        let bars: Vec<Bar> = daily
            .iter()
            .map(|d| {
                Bar::default()
                    .value(d.count as u64)
                    .label(Line::from(d.date.format("%d").to_string()))
            })
            .collect();
        let chart = BarChart::default()
            .block(Block::bordered().title(" Users Created (Last 30 Days) "))
            .data(BarGroup::default().bars(&bars))
            .bar_width(Self::bar_width(area, daily.len()))
            .bar_gap(1)
            .bar_style(Style::default().fg(Color::Green))
            .value_style(Style::default().fg(Color::Black).bg(Color::Green));
        frame.render_widget(chart, area);
    }

    fn draw_hourly(&self, hourly: &[HourlyCount], frame: &mut Frame, area: Rect) {
        let bar_width = Self::bar_width(area, hourly.len());
        let bars: Vec<Bar> = hourly
            .iter()
            .map(|h| {
                let label = if bar_width >= 5 { h.label() } else { h.hour.to_string() };
                Bar::default().value(h.count as u64).label(Line::from(label))
            })
            .collect();
        let chart = BarChart::default()
            .block(Block::bordered().title(" Signup Time of Day "))
            .data(BarGroup::default().bars(&bars))
            .bar_width(bar_width)
            .bar_gap(1)
            .bar_style(Style::default().fg(Color::Magenta))
            .value_style(Style::default().fg(Color::Black).bg(Color::Magenta));
        frame.render_widget(chart, area);
    }

    // Widest bar that still fits all buckets next to each other
    fn bar_width(area: Rect, buckets: usize) -> u16 {
        if buckets == 0 {
            return 1;
        }
        let inner = area.width.saturating_sub(2) as usize;
        (inner / buckets).saturating_sub(1).max(1) as u16
    }

    fn draw_recent(&self, recent: &[UserRecord], frame: &mut Frame, area: Rect) {
        let rows: Vec<Row> = recent
            .iter()
            .map(|r| {
                Row::new(vec![
                    Cell::from(avatar_flag(r)),
                    Cell::from(r.name.clone()),
                    Cell::from(local_date(r)),
                ])
            })
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Percentage(60),
                Constraint::Min(10),
            ],
        )
        .header(
            Row::new(vec!["Avatar", "Name", "Joined"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::bordered().title(" Recently Joined Users "));
        frame.render_widget(table, area);
    }

    // -------------------- Users page ---------------------- //

    fn draw_users(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(SEARCH_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        let view = model.table_view();
        self.draw_search(model, frame, chunks[0]);
        self.draw_user_table(model, &view, frame, chunks[1]);
        self.draw_pagination(model, &view, frame, chunks[2]);
    }

    fn draw_search(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let state = model.table_state();
        let line = match model.prompt() {
            Some((CMDMode::Search, input)) => Line::from(vec![
                "Search: ".bold(),
                Span::raw(with_cursor(&input.input, input.cursor_pos)),
            ]),
            _ if state.search_text.is_empty() => {
                Line::from("Press / to search by name or email".dim())
            }
            _ => Line::from(vec![
                "Search: ".bold(),
                Span::raw(state.search_text.clone()),
                "  (Esc clears)".dim(),
            ]),
        };
        let sort = format!(" Sort: {} ({}) ", state.sort_key, state.sort_order);
        let search = Paragraph::new(line).block(
            Block::bordered()
                .title(" User List ")
                .title(Line::from(sort).right_aligned()),
        );
        frame.render_widget(search, area);
    }

    fn draw_user_table(&self, model: &Model, view: &TableView, frame: &mut Frame, area: Rect) {
        let rows: Vec<Row> = view
            .page_items
            .iter()
            .map(|r| {
                Row::new(vec![
                    Cell::from(avatar_flag(r)),
                    Cell::from(r.name.clone()),
                    Cell::from(r.email.clone()),
                    Cell::from(local_time(r)),
                ])
            })
            .collect();

        let empty = rows.is_empty();
        let table = Table::new(
            rows,
            [
                Constraint::Length(6),
                Constraint::Percentage(30),
                Constraint::Percentage(45),
                Constraint::Length(19),
            ],
        )
        .header(
            Row::new(vec!["Avatar", "Name", "Email", "Created At"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::bordered())
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        let mut state = TableState::default();
        if !empty {
            state.select(Some(model.cursor_row()));
        }
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_pagination(&self, model: &Model, view: &TableView, frame: &mut Frame, area: Rect) {
        let current = model.table_state().current_page;
        let mut spans: Vec<Span> = Vec::new();
        if view.total_pages <= MAX_PAGE_BUTTONS {
            for page in 1..=view.total_pages {
                let button = format!(" {page} ");
                if page == current {
                    spans.push(button.black().on_blue());
                } else {
                    spans.push(Span::raw(button));
                }
            }
            spans.push(Span::raw("  "));
        }
        spans.push(
            format!(
                "Page {}/{} ({} users)",
                current, view.total_pages, view.total_matches
            )
            .dim(),
        );
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    // -------------------- Status line and popups ---------------------- //

    fn draw_statusline(&self, model: &Model, frame: &mut Frame, area: Rect) {
        let line = match model.prompt() {
            Some((CMDMode::GotoPage, input)) => Line::from(vec![
                ":".bold(),
                Span::raw(with_cursor(&input.input, input.cursor_pos)),
                "  go to page".dim(),
            ]),
            _ => {
                let message = model.status_message().to_string();
                let span = if model.status == Status::Failed {
                    message.red()
                } else if model.status_message_age() > STATUS_MESSAGE_FADE {
                    message.dim()
                } else {
                    Span::raw(message)
                };
                Line::from(vec![span, "   ? help  q quit".dim()])
            }
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_detail_popup(&self, record: &UserRecord, frame: &mut Frame) {
        let area = popup_area(frame.area(), 64, 10);
        let avatar = match record.avatar.as_deref() {
            Some(url) if record.has_avatar() => url.to_string(),
            _ => format!("{AVATAR_PLACEHOLDER} (placeholder)"),
        };
        let text = Text::from(vec![
            Line::from(record.name.clone().bold()),
            Line::from(""),
            Line::from(vec!["Avatar: ".bold(), Span::raw(avatar)]),
            Line::from(vec!["Email: ".bold(), Span::raw(record.email.clone())]),
            Line::from(vec!["Created At: ".bold(), Span::raw(local_time(record))]),
            Line::from(vec!["Id: ".bold(), Span::raw(record.id.clone())]),
        ]);
        let popup = Paragraph::new(text).wrap(Wrap { trim: true }).block(
            Block::bordered()
                .title(" User ")
                .title_bottom(Line::from(vec![
                    " Close ".into(),
                    "<Esc> ".blue().bold(),
                    " Copy ".into(),
                    "<y> ".blue().bold(),
                ]))
                .border_set(border::THICK),
        );
        frame.render_widget(Clear, area);
        frame.render_widget(popup, area);
    }

    fn draw_help_popup(&self, frame: &mut Frame) {
        let height = HELP_TEXT.lines().count() as u16 + 2;
        let area = popup_area(frame.area(), 56, height);
        let help = Paragraph::new(HELP_TEXT)
            .alignment(Alignment::Left)
            .block(Block::bordered().title(" Help ").border_set(border::THICK));
        frame.render_widget(Clear, area);
        frame.render_widget(help, area);
    }
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn with_cursor(input: &str, cursor_pos: usize) -> String {
    let mut out: String = input.chars().take(cursor_pos).collect();
    out.push('▏');
    out.extend(input.chars().skip(cursor_pos));
    out
}

fn avatar_flag(record: &UserRecord) -> String {
    if record.has_avatar() { "●" } else { "○" }.to_string()
}

fn local_time(record: &UserRecord) -> String {
    record
        .created()
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "Invalid Date".to_string())
}

fn local_date(record: &UserRecord) -> String {
    record
        .created()
        .map(|dt| dt.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DashConfig, Message};
    use crate::record::user;
    use ratatui::{Terminal, backend::TestBackend};

    fn render(model: &Model) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        let mut ui = DashboardUI::new();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn model_with_users() -> Model {
        let mut model = Model::init(&DashConfig::default());
        let mut ann = user("1", "Ann", "ann@x.com", Some("2024-01-02T05:00:00Z"));
        ann.avatar = Some("https://img/ann.png".to_string());
        let records = vec![user("2", "Bob", "bob@x.com", Some("2024-01-01T10:00:00Z")), ann];
        model.update(Some(Message::DataLoaded(records))).unwrap();
        model
    }

    #[test]
    fn dashboard_shows_kpis_and_charts() {
        let screen = render(&model_with_users());
        assert!(screen.contains("Total Users"));
        assert!(screen.contains("Avatar Distribution"));
        assert!(screen.contains("Signup Time of Day"));
        assert!(screen.contains("Recently Joined Users"));
    }

    #[test]
    fn empty_model_renders() {
        let screen = render(&Model::init(&DashConfig::default()));
        assert!(screen.contains("Total Users"));
    }

    #[test]
    fn users_page_lists_current_page_and_details() {
        let mut model = model_with_users();
        model.update(Some(Message::ShowUsers)).unwrap();
        let screen = render(&model);
        assert!(screen.contains("ann@x.com"));
        assert!(screen.contains("Page 1/1 (2 users)"));

        model.update(Some(Message::Enter)).unwrap();
        let screen = render(&model);
        assert!(screen.contains("https://img/ann.png"));

        model.update(Some(Message::Help)).unwrap();
        assert!(render(&model).contains("Help"));
    }

    #[test]
    fn cursor_is_drawn_inside_input() {
        assert_eq!(with_cursor("ann", 1), "a▏nn");
        assert_eq!(with_cursor("", 0), "▏");
    }

    #[test]
    fn popup_fits_small_screens() {
        let area = popup_area(Rect::new(0, 0, 40, 5), 64, 10);
        assert_eq!(area, Rect::new(0, 0, 40, 5));
    }
}
