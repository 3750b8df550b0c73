use arboard::Clipboard;
use chrono::{Local, Utc};
use ratatui::crossterm::event::KeyEvent;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace};

use crate::aggregate::DashboardSummary;
use crate::domain::{CMDMode, DashConfig, DashError, Message};
use crate::inputter::{InputResult, Inputter};
use crate::record::UserRecord;
use crate::source::{Loader, Source};
use crate::state::{Action, ViewState};
use crate::table::{TableView, TableViewState, compute_view};

#[derive(Debug, PartialEq)]
pub enum Status {
    Loading,
    Ready,
    Failed,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Page {
    Dashboard,
    Users,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    Browse,
    Detail,
    Popup,
    CmdInput,
}

pub struct Model {
    config: DashConfig,
    pub status: Status,
    page: Page,
    modus: Modus,
    previous_modus: Modus,
    records: Vec<UserRecord>,
    summary: DashboardSummary,
    view_state: ViewState,
    cursor_row: usize, // Row of the cursor within the current page
    loader: Option<Loader>,
    load_started: Instant,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &DashConfig) -> Self {
        Self {
            config: config.clone(),
            status: Status::Ready,
            page: Page::Dashboard,
            modus: Modus::Browse,
            previous_modus: Modus::Browse,
            records: Vec::new(),
            summary: DashboardSummary::empty(Utc::now().date_naive()),
            view_state: ViewState::default(),
            cursor_row: 0,
            loader: None,
            load_started: Instant::now(),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            status_message: "Started userdash!".to_string(),
            last_status_message_update: Instant::now(),
        }
    }

    // -------------------- Loading ---------------------- //

    /// Starts fetching the snapshot in the background unless a fetch is already running.
    pub fn request_load(&mut self) {
        if self.loader.is_some() {
            self.set_status_message("Already loading ...");
            return;
        }
        match Source::detect(&self.config.source) {
            Ok(source) => {
                info!("Loading users from {source}");
                self.set_status_message(format!("Loading users from {source} ..."));
                self.load_started = Instant::now();
                self.status = Status::Loading;
                self.loader = Some(Loader::spawn(
                    source,
                    Duration::from_secs(self.config.request_timeout),
                ));
            }
            Err(e) => self.load_failed(e.to_string()),
        }
    }

    /// Hands a finished fetch over to [`Model::update`].
    pub fn poll_loader(&mut self) -> Result<(), DashError> {
        let result = match self.loader.as_mut() {
            Some(loader) => loader.poll(),
            None => None,
        };
        if let Some(result) = result {
            self.loader = None;
            let message = match result {
                Ok(records) => Message::DataLoaded(records),
                Err(e) => Message::LoadFailed(e.to_string()),
            };
            self.update(Some(message))?;
        }
        Ok(())
    }

    fn data_loaded(&mut self, records: Vec<UserRecord>) {
        let loading_duration = self.load_started.elapsed().as_millis();
        self.records = records;
        self.summary = DashboardSummary::build(
            &self.records,
            Utc::now().date_naive(),
            &Local,
            self.config.recent_count,
        );
        // A new snapshot starts on the first page with nothing selected
        self.dispatch(Action::SetCurrentPage(1));
        self.dispatch(Action::ClearSelection);
        // Details of the old snapshot close, also when hidden under the help popup
        if self.modus == Modus::Detail {
            self.modus = Modus::Browse;
        }
        if self.previous_modus == Modus::Detail {
            self.previous_modus = Modus::Browse;
        }
        self.cursor_row = 0;
        self.status = Status::Ready;
        debug!("Snapshot holds {} users", self.records.len());
        self.set_status_message(format!(
            "Loaded {} users in {}ms ...",
            self.records.len(),
            loading_duration
        ));
    }

    fn load_failed(&mut self, reason: String) {
        error!("Loading users failed: {reason}");
        self.status = Status::Failed;
        self.set_status_message(format!("Failed to load users: {reason}"));
    }

    // -------------------- Accessors for the UI ---------------------- //

    pub fn page(&self) -> Page {
        self.page
    }

    pub fn summary(&self) -> &DashboardSummary {
        &self.summary
    }

    pub fn records(&self) -> &[UserRecord] {
        &self.records
    }

    pub fn table_state(&self) -> &TableViewState {
        &self.view_state.table
    }

    /// Recomputed on every call, nothing is cached.
    pub fn table_view(&self) -> TableView {
        compute_view(&self.records, &self.view_state.table)
    }

    pub fn cursor_row(&self) -> usize {
        self.cursor_row
    }

    pub fn selected(&self) -> Option<&UserRecord> {
        self.view_state.selected.as_ref()
    }

    pub fn show_detail(&self) -> bool {
        self.modus == Modus::Detail && self.view_state.selected.is_some()
    }

    pub fn show_help(&self) -> bool {
        self.modus == Modus::Popup
    }

    pub fn prompt(&self) -> Option<(CMDMode, &InputResult)> {
        match (self.modus, self.cmd_mode) {
            (Modus::CmdInput, Some(mode)) => Some((mode, &self.last_input)),
            _ => None,
        }
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn source_label(&self) -> &str {
        &self.config.source
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CmdInput
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
    }

    pub fn status_message_age(&self) -> Duration {
        self.last_status_message_update.elapsed()
    }

    fn dispatch(&mut self, action: Action) {
        let state = std::mem::take(&mut self.view_state);
        self.view_state = state.reduce(action);
    }

    // -------------------- Message handling ---------------------- //

    pub fn update(&mut self, message: Option<Message>) -> Result<(), DashError> {
        let Some(msg) = message else {
            return Ok(());
        };

        // Fetch results arrive independent of what the user is doing
        let msg = match msg {
            Message::DataLoaded(records) => {
                self.data_loaded(records);
                return Ok(());
            }
            Message::LoadFailed(reason) => {
                self.load_failed(reason);
                return Ok(());
            }
            other => other,
        };

        match self.modus {
            Modus::Browse => match msg {
                Message::Quit => self.quit(),
                Message::SwitchPage => self.switch_page(),
                Message::ShowDashboard => self.page = Page::Dashboard,
                Message::ShowUsers => self.page = Page::Users,
                Message::Reload => self.request_load(),
                Message::Help => self.open_help(),
                msg if self.page == Page::Users => self.update_users_page(msg),
                _ => (),
            },
            Modus::Detail => match msg {
                Message::Quit => self.quit(),
                Message::Help => self.open_help(),
                Message::CopyRecord => self.copy_record(),
                Message::Enter | Message::Exit => self.exit(),
                _ => (),
            },
            Modus::Popup => match msg {
                Message::Quit => self.quit(),
                Message::Enter | Message::Exit | Message::Help => self.exit(),
                _ => (),
            },
            Modus::CmdInput => {
                if let Message::RawKey(key) = msg {
                    self.raw_input(key)
                }
            }
        }
        Ok(())
    }

    fn update_users_page(&mut self, msg: Message) {
        match msg {
            Message::MoveUp => self.move_cursor_up(),
            Message::MoveDown => self.move_cursor_down(),
            Message::NextPage => self.next_page(),
            Message::PrevPage => self.prev_page(),
            Message::FirstPage => self.go_to_page(1),
            Message::LastPage => {
                let total = self.table_view().total_pages;
                self.go_to_page(total.max(1));
            }
            Message::Search => self.enter_cmd_mode(CMDMode::Search),
            Message::GotoPage => self.enter_cmd_mode(CMDMode::GotoPage),
            Message::ToggleSortKey => {
                let key = self.view_state.table.sort_key.toggled();
                self.dispatch(Action::SetSortKey(key));
                self.sort_changed();
            }
            Message::ToggleSortOrder => {
                let order = self.view_state.table.sort_order.toggled();
                self.dispatch(Action::SetSortOrder(order));
                self.sort_changed();
            }
            Message::CopyRecord => self.copy_record(),
            Message::Enter => self.select_under_cursor(),
            Message::Exit => self.exit(),
            _ => (),
        }
    }

    // -------------------- Control handling functions ---------------------- //

    fn switch_page(&mut self) {
        self.page = match self.page {
            Page::Dashboard => Page::Users,
            Page::Users => Page::Dashboard,
        };
        trace!("Switched to {:?}", self.page);
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::Browse => {
                // Esc on the table drops an active search
                if self.page == Page::Users && !self.view_state.table.search_text.is_empty() {
                    self.dispatch(Action::SetSearchText(String::new()));
                    self.cursor_row = 0;
                    self.set_status_message("Search cleared");
                }
            }
            Modus::Detail => {
                self.dispatch(Action::ClearSelection);
                self.modus = Modus::Browse;
                self.previous_modus = Modus::Detail;
            }
            Modus::Popup => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::Popup;
            }
            Modus::CmdInput => {}
        }
    }

    fn open_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
    }

    fn sort_changed(&mut self) {
        let state = &self.view_state.table;
        let message = format!("Sorted by {} ({})", state.sort_key, state.sort_order);
        self.cursor_row = 0;
        self.set_status_message(message);
    }

    fn go_to_page(&mut self, page: usize) {
        trace!("Go to page {page}");
        self.dispatch(Action::SetCurrentPage(page));
        self.cursor_row = 0;
    }

    fn next_page(&mut self) {
        let total = self.table_view().total_pages.max(1);
        let page = (self.view_state.table.current_page + 1).min(total);
        if page != self.view_state.table.current_page {
            self.go_to_page(page);
        }
    }

    fn prev_page(&mut self) {
        let total = self.table_view().total_pages.max(1);
        let page = self
            .view_state
            .table
            .current_page
            .saturating_sub(1)
            .clamp(1, total);
        if page != self.view_state.table.current_page {
            self.go_to_page(page);
        }
    }

    fn move_cursor_up(&mut self) {
        self.cursor_row = self.cursor_row.saturating_sub(1);
    }

    fn move_cursor_down(&mut self) {
        let rows = self.table_view().page_items.len();
        if self.cursor_row + 1 < rows {
            self.cursor_row += 1;
        }
    }

    fn record_under_cursor(&self) -> Option<UserRecord> {
        self.table_view().page_items.into_iter().nth(self.cursor_row)
    }

    fn select_under_cursor(&mut self) {
        match self.record_under_cursor() {
            Some(record) => {
                trace!("Select user {}", record.id);
                self.dispatch(Action::SelectRecord(record));
                self.previous_modus = self.modus;
                self.modus = Modus::Detail;
            }
            None => self.set_status_message("No user on this page"),
        }
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {mode:?} ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CmdInput;
        self.cmd_mode = Some(mode);

        self.input.clear();
        if mode == CMDMode::Search {
            // Continue editing the active search
            let current = self.view_state.table.search_text.clone();
            self.input.set(&current);
        }
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);

        // Searching is live, every edit is applied right away
        if self.cmd_mode == Some(CMDMode::Search)
            && self.last_input.input != self.view_state.table.search_text
        {
            self.dispatch(Action::SetSearchText(self.last_input.input.clone()));
            self.cursor_row = 0;
        }

        if self.last_input.finished {
            self.handle_cmd_input();
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);

        self.modus = self.previous_modus;
        self.previous_modus = Modus::CmdInput;

        let cmd_input = self.last_input.input.clone();
        match self.cmd_mode {
            Some(CMDMode::Search) => {
                let matches = self.table_view().total_matches;
                if cmd_input.is_empty() {
                    self.set_status_message("Search cleared");
                } else {
                    self.set_status_message(format!("Found {matches} users for \"{cmd_input}\""));
                }
            }
            Some(CMDMode::GotoPage) if !self.last_input.canceled => {
                match cmd_input.trim().parse::<usize>() {
                    Ok(page) => {
                        self.go_to_page(page);
                        let total = self.table_view().total_pages;
                        if page == 0 || page > total {
                            self.set_status_message(format!("Page {page} is empty ({total} pages)"));
                        }
                    }
                    Err(_) => self.set_status_message(format!("\"{cmd_input}\" is not a page number")),
                }
            }
            Some(CMDMode::GotoPage) => {}
            None => info!("Cmd mode is none!"),
        }

        self.cmd_mode = None;
    }

    fn copy_record(&mut self) {
        let record = match self.modus {
            Modus::Detail => self.view_state.selected.clone(),
            _ => self.record_under_cursor(),
        };
        let Some(record) = record else {
            self.set_status_message("Nothing to copy");
            return;
        };
        let line = record_as_csv(&record);
        trace!("Copy: {line}");

        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    error!("Clipboard unavailable: {e:?}");
                    self.set_status_message("Clipboard unavailable");
                    return;
                }
            }
        }
        let copied = self.clipboard.as_mut().map(|c| c.set_text(line));
        match copied {
            Some(Ok(_)) => self.set_status_message(format!("Copied {} to clipboard", record.name)),
            Some(Err(e)) => {
                error!("Error copying to clipboard: {e:?}");
                self.set_status_message("Copying to clipboard failed");
            }
            None => {}
        }
    }
}

fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',' || c == '"');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}

/// One CSV line: id, name, email, avatar, createdAt.
pub fn record_as_csv(record: &UserRecord) -> String {
    [
        record.id.as_str(),
        record.name.as_str(),
        record.email.as_str(),
        record.avatar.as_deref().unwrap_or(""),
        record.created_at.as_deref().unwrap_or(""),
    ]
    .iter()
    .map(|c| wrap_cell_content(c))
    .collect::<Vec<String>>()
    .join(",")
}
