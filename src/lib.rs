use crossterm::event::{KeyCode, KeyEvent};
use std::path::PathBuf;
use std::sync::mpsc::Sender;

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

use ratatui::widgets::{Block, Borders, Paragraph, TableState};

pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod markdown;
pub mod partition;
pub mod session;
pub mod widgets;

pub use cli::Args;
pub use config::{AppConfig, ConfigManager, DisplayConfig};

use chat::{ChatSession, SubmitOutcome};
use client::{AnalyticsClient, AnalyticsSnapshot, ClientError, FileMeta};
use partition::TypePartition;
use session::SessionStore;
use widgets::chat_panel::{ChatPanel, ChatPanelState};
use widgets::controls::Controls;
use widgets::debug::DebugState;
use widgets::stats_table::StatsTable;
use widgets::text_input::{TextInput, TextInputEvent};

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "anaflow";

/// Effective runtime options after layering CLI arguments over the config
/// file over built-in defaults. CLI wins wherever it is given.
pub struct RuntimeOptions {
    pub server_url: String,
    pub token_file: PathBuf,
    pub placeholder: String,
    pub chat_open: bool,
    pub debug: bool,
}

impl RuntimeOptions {
    pub fn from_args_and_config(args: &Args, config: &AppConfig) -> color_eyre::Result<Self> {
        let token_file = args
            .token_file
            .clone()
            .or_else(|| config.session.token_file.clone())
            .map(Ok)
            .unwrap_or_else(|| ConfigManager::new(APP_NAME).map(|m| m.config_path("token")))?;

        Ok(RuntimeOptions {
            server_url: args
                .server
                .clone()
                .unwrap_or_else(|| config.server.base_url.clone()),
            token_file,
            placeholder: args
                .placeholder
                .clone()
                .unwrap_or_else(|| config.display.placeholder.clone()),
            chat_open: args.chat_open || config.display.chat_open,
            debug: args.debug || config.debug.enabled,
        })
    }
}

/// Events flowing through the application channel. User input and network
/// completions all arrive here; completions carry the generation they were
/// issued under so stale ones can be discarded after a dataset switch.
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    /// Switch the view to a dataset and start its fetches
    Open(String),
    MetadataLoaded {
        generation: u64,
        result: Result<FileMeta, ClientError>,
    },
    StatsLoaded {
        generation: u64,
        result: Result<AnalyticsSnapshot, ClientError>,
    },
    ChatResolved {
        generation: u64,
        result: Result<String, ClientError>,
    },
    /// The stored credential is missing or was rejected by the server
    Unauthenticated,
    Exit,
    Crash(String),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    Normal,
    Chat,
    OpenDataset,
}

pub struct App {
    events: Sender<AppEvent>,
    client: AnalyticsClient,
    session_store: SessionStore,
    display: DisplayConfig,

    dataset_id: String,
    /// Bumped on every dataset switch; completions from older generations
    /// are discarded on arrival instead of mutating the new view
    generation: u64,

    meta: Option<FileMeta>,
    snapshot: Option<AnalyticsSnapshot>,
    meta_pending: bool,
    stats_pending: bool,
    stats_failed: bool,
    fetch_error: Option<String>,
    selected_type: Option<String>,
    table_state: TableState,

    chat: ChatSession,
    chat_input: TextInput,
    chat_panel_state: ChatPanelState,
    chat_open: bool,

    pub input_mode: InputMode,
    open_input: TextInput,

    pub debug: DebugState,
    unauthenticated: bool,
}

impl App {
    pub fn new(
        events: Sender<AppEvent>,
        client: AnalyticsClient,
        session_store: SessionStore,
        config: &AppConfig,
    ) -> App {
        let mut chat_input = TextInput::new("Type your message...");
        chat_input.set_focused(false);

        App {
            events,
            client,
            session_store,
            display: config.display.clone(),
            dataset_id: String::new(),
            generation: 0,
            meta: None,
            snapshot: None,
            meta_pending: false,
            stats_pending: false,
            stats_failed: false,
            fetch_error: None,
            selected_type: None,
            table_state: TableState::default(),
            chat: ChatSession::new(),
            chat_input,
            chat_panel_state: ChatPanelState::default(),
            chat_open: config.display.chat_open,
            input_mode: InputMode::Normal,
            open_input: TextInput::new("dataset id"),
            debug: DebugState::default(),
            unauthenticated: false,
        }
    }

    pub fn enable_debug(&mut self) {
        self.debug.enabled = true;
    }

    pub fn set_chat_open(&mut self, open: bool) {
        self.chat_open = open;
        if open {
            self.input_mode = InputMode::Chat;
            self.chat_input.set_focused(true);
            // Re-opening snaps the log back to the newest message
            self.chat_panel_state = ChatPanelState::default();
        }
    }

    pub fn send_event(&mut self, event: AppEvent) -> color_eyre::Result<()> {
        self.events.send(event)?;
        Ok(())
    }

    /// Message to print after the terminal is restored, if the session ended
    /// because the user is not (or no longer) authenticated
    pub fn sign_off(&self) -> Option<String> {
        if self.unauthenticated {
            Some(format!(
                "Not logged in (or the session expired). Refresh the token at {} and try again.",
                self.session_store.token_file().display()
            ))
        } else {
            None
        }
    }

    pub fn event(&mut self, event: &AppEvent) -> Option<AppEvent> {
        self.debug.num_events += 1;
        match event {
            AppEvent::Key(key) => self.key(key),
            AppEvent::Resize(_cols, _rows) => None,
            AppEvent::Open(dataset_id) => self.open(dataset_id.clone()),
            AppEvent::MetadataLoaded { generation, result } => {
                if *generation != self.generation {
                    self.debug.discarded_stale += 1;
                    return None;
                }
                self.meta_pending = false;
                match result {
                    Ok(meta) => {
                        self.meta = Some(meta.clone());
                        None
                    }
                    Err(ClientError::Auth) => Some(AppEvent::Unauthenticated),
                    Err(e) => {
                        self.fetch_error = Some(e.to_string());
                        None
                    }
                }
            }
            AppEvent::StatsLoaded { generation, result } => {
                if *generation != self.generation {
                    self.debug.discarded_stale += 1;
                    return None;
                }
                self.stats_pending = false;
                match result {
                    Ok(snapshot) => {
                        self.selected_type =
                            partition::validate_selection(snapshot, self.selected_type.as_deref());
                        self.table_state = TableState::default();
                        if !snapshot.columns.is_empty() {
                            self.table_state.select(Some(0));
                        }
                        self.snapshot = Some(snapshot.clone());
                        None
                    }
                    Err(ClientError::Auth) => Some(AppEvent::Unauthenticated),
                    Err(_) => {
                        // Metadata alone still renders; the stats panel is omitted
                        self.stats_failed = true;
                        None
                    }
                }
            }
            AppEvent::ChatResolved { generation, result } => {
                if *generation != self.generation {
                    self.debug.discarded_stale += 1;
                    return None;
                }
                self.chat.resolve(result.clone());
                None
            }
            AppEvent::Unauthenticated => {
                self.unauthenticated = true;
                Some(AppEvent::Exit)
            }
            _ => None,
        }
    }

    /// Switch to a dataset: reset all per-dataset state and start the two
    /// analytics fetches under a fresh generation
    fn open(&mut self, dataset_id: String) -> Option<AppEvent> {
        self.dataset_id = dataset_id;
        self.generation += 1;
        self.debug.generation = self.generation;

        self.meta = None;
        self.snapshot = None;
        self.stats_failed = false;
        self.fetch_error = None;
        self.selected_type = None;
        self.table_state = TableState::default();

        // Chat is scoped to one dataset: a switch starts an empty log
        self.chat = ChatSession::new();
        self.chat_panel_state = ChatPanelState::default();
        self.chat_input.clear();

        let token = match self.session_store.load() {
            Some(token) => token,
            None => return Some(AppEvent::Unauthenticated),
        };

        self.meta_pending = true;
        self.stats_pending = true;
        self.spawn_fetches(token);
        None
    }

    fn spawn_fetches(&self, token: String) {
        let generation = self.generation;

        {
            let client = self.client.clone();
            let tx = self.events.clone();
            let dataset_id = self.dataset_id.clone();
            let token = token.clone();
            std::thread::spawn(move || {
                let result = client.file_metadata(&dataset_id, &token);
                let _ = tx.send(AppEvent::MetadataLoaded { generation, result });
            });
        }

        {
            let client = self.client.clone();
            let tx = self.events.clone();
            let dataset_id = self.dataset_id.clone();
            std::thread::spawn(move || {
                let result = client.column_statistics(&dataset_id, &token);
                let _ = tx.send(AppEvent::StatsLoaded { generation, result });
            });
        }
    }

    fn spawn_chat(&self, message: String, token: String) {
        let generation = self.generation;
        let client = self.client.clone();
        let tx = self.events.clone();
        let dataset_id = self.dataset_id.clone();
        std::thread::spawn(move || {
            let result = client.chat_exchange(&dataset_id, &token, &message);
            let _ = tx.send(AppEvent::ChatResolved { generation, result });
        });
    }

    fn key(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        match self.input_mode {
            InputMode::OpenDataset => self.key_open_dataset(key),
            InputMode::Chat => self.key_chat(key),
            InputMode::Normal => self.key_normal(key),
        }
    }

    fn key_open_dataset(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        match self.open_input.input(key) {
            TextInputEvent::Submit => {
                let dataset_id = self.open_input.value().trim().to_string();
                self.open_input.clear();
                self.open_input.set_focused(false);
                self.input_mode = InputMode::Normal;
                if dataset_id.is_empty() {
                    None
                } else {
                    Some(AppEvent::Open(dataset_id))
                }
            }
            TextInputEvent::Cancel => {
                self.open_input.clear();
                self.open_input.set_focused(false);
                self.input_mode = InputMode::Normal;
                None
            }
            TextInputEvent::None => None,
        }
    }

    fn key_chat(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        match key.code {
            KeyCode::Up => {
                self.chat_panel_state.scroll_up();
                return None;
            }
            KeyCode::Down => {
                self.chat_panel_state.scroll_down();
                return None;
            }
            _ => {}
        }

        match self.chat_input.input(key) {
            TextInputEvent::Submit => {
                let token = self.session_store.load();
                let draft = self.chat_input.value();
                match self.chat.submit(&draft, token.as_deref()) {
                    SubmitOutcome::Dispatched(message) => {
                        self.chat_input.clear();
                        // submit only dispatches when a token was present
                        if let Some(token) = token {
                            self.spawn_chat(message, token);
                        }
                    }
                    SubmitOutcome::Ignored | SubmitOutcome::NotAuthenticated => {}
                }
                None
            }
            TextInputEvent::Cancel => {
                self.input_mode = InputMode::Normal;
                self.chat_input.set_focused(false);
                None
            }
            TextInputEvent::None => None,
        }
    }

    fn key_normal(&mut self, key: &KeyEvent) -> Option<AppEvent> {
        match key.code {
            KeyCode::Char('q') => Some(AppEvent::Exit),
            KeyCode::Char('c') => {
                if self.chat_open {
                    self.chat_open = false;
                    self.chat_input.set_focused(false);
                } else {
                    self.set_chat_open(true);
                }
                None
            }
            KeyCode::Tab if self.chat_open => {
                self.input_mode = InputMode::Chat;
                self.chat_input.set_focused(true);
                None
            }
            KeyCode::Char('o') => {
                self.input_mode = InputMode::OpenDataset;
                self.open_input.set_focused(true);
                None
            }
            KeyCode::Left => {
                self.cycle_type(-1);
                None
            }
            KeyCode::Right => {
                self.cycle_type(1);
                None
            }
            KeyCode::Up => {
                self.move_row(-1);
                None
            }
            KeyCode::Down => {
                self.move_row(1);
                None
            }
            _ => None,
        }
    }

    fn cycle_type(&mut self, direction: isize) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };
        let types = partition::available_types(snapshot);
        if types.is_empty() {
            return;
        }
        let current = self
            .selected_type
            .as_ref()
            .and_then(|t| types.iter().position(|candidate| candidate == t))
            .unwrap_or(0);
        let next = (current as isize + direction).rem_euclid(types.len() as isize) as usize;
        self.selected_type = Some(types[next].clone());
        self.table_state = TableState::default();
        self.table_state.select(Some(0));
    }

    fn move_row(&mut self, direction: isize) {
        let Some(snapshot) = &self.snapshot else {
            return;
        };
        let partition = TypePartition::derive(snapshot, self.selected_type.as_deref());
        let rows = partition.visible_columns.len();
        if rows == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0) as isize;
        let next = (current + direction).clamp(0, rows as isize - 1) as usize;
        self.table_state.select(Some(next));
    }

    fn format_upload_date(&self, raw: &str) -> String {
        chrono::DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.format(&self.display.timestamp_format).to_string())
            .unwrap_or_else(|_| raw.to_string())
    }

    fn render_error(&self, message: &str, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title("Error");
        let lines = vec![
            Line::from(Span::styled(
                message.to_string(),
                Style::default().fg(Color::Red),
            )),
            Line::default(),
            Line::from(Span::styled(
                "Press o to open another dataset, or q to quit.",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        Paragraph::new(lines).block(block).render(area, buf);
    }

    fn render_header(&self, meta: &FileMeta, area: Rect, buf: &mut Buffer) {
        let lines = vec![
            Line::from(Span::styled(
                format!("Analytics for {}", meta.filename),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled(
                    format!("Uploaded {}", self.format_upload_date(&meta.upload_date)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(
                    format!("  ({})", meta.id),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
        ];
        Paragraph::new(lines).render(area, buf);
    }

    fn render_stats(&mut self, area: Rect, buf: &mut Buffer) {
        if let Some(snapshot) = &self.snapshot {
            let partition = TypePartition::derive(snapshot, self.selected_type.as_deref());
            let table = StatsTable::new(&partition, &self.display.placeholder)
                .with_dimmed(self.input_mode == InputMode::Chat);
            ratatui::widgets::StatefulWidget::render(&table, area, buf, &mut self.table_state);
        } else {
            let note = if self.stats_pending {
                "Loading statistics..."
            } else if self.stats_failed {
                "Statistics are unavailable for this dataset."
            } else {
                "No statistics to show."
            };
            Paragraph::new(note)
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().borders(Borders::ALL).title("Column Statistics"))
                .render(area, buf);
        }
    }

    fn render_open_prompt(&self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title("Open dataset");
        let inner = block.inner(area);
        block.render(area, buf);
        self.open_input.render(inner, buf);
    }
}

impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Fill(1), Constraint::Length(1)])
            .split(area);
        let main_area = outer[0];
        let controls_area = outer[1];

        let column_count = self.snapshot.as_ref().map(|s| s.columns.len());
        Controls::new()
            .with_column_count(column_count)
            .with_dimmed(self.input_mode != InputMode::Normal)
            .with_chat_open(self.chat_open)
            .render(controls_area, buf);

        if let Some(message) = self.fetch_error.clone() {
            self.render_error(&message, main_area, buf);
        } else if let Some(meta) = self.meta.clone() {
            let body = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Fill(1)])
                .split(main_area);
            self.render_header(&meta, body[0], buf);

            let content = body[1];
            if self.chat_open {
                let split = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Fill(1), Constraint::Length(46)])
                    .split(content);
                self.render_stats(split[0], buf);
                let panel = ChatPanel::new(
                    &self.chat,
                    &self.chat_input,
                    self.input_mode == InputMode::Chat,
                );
                ratatui::widgets::StatefulWidget::render(
                    &panel,
                    split[1],
                    buf,
                    &mut self.chat_panel_state,
                );
            } else {
                self.render_stats(content, buf);
            }
        } else {
            let text = format!("Loading {}...", self.dataset_id);
            Paragraph::new(text)
                .style(Style::default().fg(Color::DarkGray))
                .render(main_area, buf);
        }

        if self.input_mode == InputMode::OpenDataset {
            let prompt_area = Rect {
                x: main_area.x + main_area.width / 4,
                y: main_area.y + main_area.height / 3,
                width: main_area.width / 2,
                height: 3,
            };
            ratatui::widgets::Clear.render(prompt_area, buf);
            self.render_open_prompt(prompt_area, buf);
        }

        if self.debug.enabled {
            (&self.debug).render(controls_area, buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    fn snapshot(json: &str) -> AnalyticsSnapshot {
        serde_json::from_str(json).unwrap()
    }

    fn meta() -> FileMeta {
        FileMeta {
            id: "abc".to_string(),
            filename: "people.csv".to_string(),
            upload_date: "2024-05-01T12:00:00Z".to_string(),
        }
    }

    fn test_app() -> App {
        let (tx, _rx) = channel::<AppEvent>();
        let client = AnalyticsClient::new("http://127.0.0.1:1", Duration::from_secs(1));
        let dir = std::env::temp_dir().join("anaflow-test-no-token");
        let store = SessionStore::new(dir.join("token"));
        App::new(tx, client, store, &AppConfig::default())
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut app = test_app();
        app.dataset_id = "abc".to_string();
        app.generation = 2;

        let event = AppEvent::StatsLoaded {
            generation: 1,
            result: Ok(snapshot(r#"{"filename": "old.csv", "columns": []}"#)),
        };
        assert!(app.event(&event).is_none());
        assert!(app.snapshot.is_none());
        assert_eq!(app.debug.discarded_stale, 1);
    }

    #[test]
    fn test_stale_metadata_completion_is_discarded() {
        let mut app = test_app();
        app.generation = 2;

        let event = AppEvent::MetadataLoaded {
            generation: 1,
            result: Ok(meta()),
        };
        assert!(app.event(&event).is_none());
        assert!(app.meta.is_none());
        assert_eq!(app.debug.discarded_stale, 1);
    }

    #[test]
    fn test_current_generation_completion_applies() {
        let mut app = test_app();
        app.generation = 2;

        let event = AppEvent::StatsLoaded {
            generation: 2,
            result: Ok(snapshot(
                r#"{"filename": "people.csv", "columns": [
                    {"name": "age", "type": "Integer", "stats": {"mean": 30}}
                ]}"#,
            )),
        };
        assert!(app.event(&event).is_none());
        assert_eq!(app.selected_type.as_deref(), Some("Integer"));
        assert!(app.snapshot.is_some());
    }

    #[test]
    fn test_auth_rejection_requests_sign_out() {
        let mut app = test_app();
        let event = AppEvent::MetadataLoaded {
            generation: 0,
            result: Err(ClientError::Auth),
        };
        let followup = app.event(&event);
        assert!(matches!(followup, Some(AppEvent::Unauthenticated)));

        let exit = app.event(&AppEvent::Unauthenticated);
        assert!(matches!(exit, Some(AppEvent::Exit)));
        assert!(app.sign_off().is_some());
    }

    #[test]
    fn test_metadata_fetch_failure_shows_error_panel() {
        let mut app = test_app();
        let event = AppEvent::MetadataLoaded {
            generation: 0,
            result: Err(ClientError::Service { status: 500 }),
        };
        assert!(app.event(&event).is_none());
        assert!(app.fetch_error.is_some());
    }

    #[test]
    fn test_stats_fetch_failure_is_partial_not_fatal() {
        let mut app = test_app();
        app.event(&AppEvent::MetadataLoaded {
            generation: 0,
            result: Ok(meta()),
        });
        app.event(&AppEvent::StatsLoaded {
            generation: 0,
            result: Err(ClientError::Service { status: 500 }),
        });

        assert!(app.fetch_error.is_none());
        assert!(app.meta.is_some());
        assert!(app.stats_failed);
        assert!(app.snapshot.is_none());
    }

    #[test]
    fn test_selection_revalidated_on_new_snapshot() {
        let mut app = test_app();
        app.event(&AppEvent::StatsLoaded {
            generation: 0,
            result: Ok(snapshot(
                r#"{"filename": "a.csv", "columns": [
                    {"name": "x", "type": "Integer", "stats": {}}
                ]}"#,
            )),
        });
        assert_eq!(app.selected_type.as_deref(), Some("Integer"));

        // A later snapshot without that type resets the selection
        app.event(&AppEvent::StatsLoaded {
            generation: 0,
            result: Ok(snapshot(
                r#"{"filename": "a.csv", "columns": [
                    {"name": "y", "type": "Float", "stats": {}}
                ]}"#,
            )),
        });
        assert_eq!(app.selected_type.as_deref(), Some("Float"));
    }

    #[test]
    fn test_open_without_token_signals_unauthenticated() {
        let mut app = test_app();
        let followup = app.event(&AppEvent::Open("abc".to_string()));
        assert!(matches!(followup, Some(AppEvent::Unauthenticated)));
        assert!(!app.meta_pending);
    }

    #[test]
    fn test_stale_chat_completion_leaves_log_untouched() {
        let mut app = test_app();
        app.generation = 3;
        app.event(&AppEvent::ChatResolved {
            generation: 2,
            result: Ok("stale answer".to_string()),
        });
        assert!(app.chat.messages().is_empty());
        assert_eq!(app.debug.discarded_stale, 1);
    }
}
