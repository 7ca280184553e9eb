use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use fintrack_core::{
    BackendClient, ChatController, ChatRole, ClientError, Config, ExchangeTicket, UploadError,
    UploadReceipt, EXAMPLE_PROMPTS,
};
use crate::clipboard::copy_to_clipboard;
use crate::picker::{FilePicker, Pick};

const COPIED_MARKER: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Sidebar,
    Chat,
    Input,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub controller: ChatController<BackendClient>,
    pub backend_url: String,
    pub config_path: Option<PathBuf>,

    // Question input
    pub input: String,
    pub cursor: usize, // cursor position in chars

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub chat_total_lines: u16,
    pub follow_bottom: bool,
    pub selected_message: Option<usize>,
    pub copied: Option<(usize, Instant)>,
    pub prompt_state: ListState,

    // File picker
    pub show_picker: bool,
    pub picker: FilePicker,

    // Outstanding backend calls
    pub upload_task: Option<JoinHandle<Result<UploadReceipt, UploadError>>>,
    pub exchange_task: Option<(ExchangeTicket, JoinHandle<Result<String, ClientError>>)>,

    // Animation state
    pub animation_frame: u8,

    // Panel areas for mouse hit-testing (updated during render)
    pub sidebar_area: Option<Rect>,
    pub chat_area: Option<Rect>,
}

impl App {
    pub fn new(config: &Config, initial_file: Option<PathBuf>) -> Self {
        let client = config.client();
        let mut controller = ChatController::new(Arc::new(client));

        let start_dir = initial_file
            .as_ref()
            .and_then(|f| f.parent().map(|p| p.to_path_buf()))
            .filter(|p| p.is_dir())
            .or_else(|| config.last_directory.clone().filter(|p| p.is_dir()))
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(file) = initial_file {
            controller.upload.select(file);
        }

        let mut prompt_state = ListState::default();
        prompt_state.select(Some(0));

        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            focus: FocusPane::Sidebar,
            controller,
            backend_url: config.backend_url.clone(),
            config_path: Config::get_config_path().ok(),

            input: String::new(),
            cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_total_lines: 0,
            follow_bottom: true,
            selected_message: None,
            copied: None,
            prompt_state,

            show_picker: false,
            picker: FilePicker::new(start_dir),

            upload_task: None,
            exchange_task: None,

            animation_frame: 0,

            sidebar_area: None,
            chat_area: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.controller.session.is_ready()
    }

    pub fn is_processing(&self) -> bool {
        self.controller.upload.is_processing()
    }

    pub fn is_thinking(&self) -> bool {
        self.controller.session.is_awaiting_reply()
    }

    pub fn open_picker(&mut self) {
        if self.is_processing() {
            return;
        }
        self.picker.refresh();
        self.show_picker = true;
    }

    pub fn picker_choose(&mut self) {
        if let Pick::File(path) = self.picker.choose() {
            tracing::info!(path = %path.display(), "file selected");
            self.controller.upload.select(path);
            self.show_picker = false;
        }
    }

    pub fn submit_upload(&mut self) {
        if self.upload_task.is_some() {
            return;
        }
        if let Some(job) = self.controller.start_upload() {
            self.upload_task = Some(tokio::spawn(job.run()));
        }
    }

    pub fn submit_input(&mut self) {
        if self.is_thinking() || self.input.trim().is_empty() {
            return;
        }
        let question = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.send_message(&question);
    }

    pub fn send_example(&mut self, index: usize) {
        if !self.controller.session.messages().is_empty() || self.is_thinking() {
            return;
        }
        if let Some(prompt) = EXAMPLE_PROMPTS.get(index) {
            self.input.clear();
            self.cursor = 0;
            self.send_message(prompt);
        }
    }

    fn send_message(&mut self, question: &str) {
        if let Some((ticket, job)) = self.controller.start_exchange(question) {
            self.exchange_task = Some((ticket, tokio::spawn(job.run())));
            self.input_mode = InputMode::Normal;
            self.focus = FocusPane::Input;
            self.follow_bottom = true;
        }
    }

    /// Apply the outcome of any backend call that has completed
    pub async fn poll_tasks(&mut self) {
        if self.upload_task.as_ref().is_some_and(|h| h.is_finished()) {
            if let Some(handle) = self.upload_task.take() {
                let outcome = handle.await.unwrap_or_else(|err| {
                    Err(UploadError::Client(ClientError::Interrupted(err.to_string())))
                });
                let succeeded = outcome.is_ok();
                self.controller.finish_upload(outcome);
                if succeeded {
                    self.on_document_ready();
                }
            }
        }

        if self.exchange_task.as_ref().is_some_and(|(_, h)| h.is_finished()) {
            if let Some((ticket, handle)) = self.exchange_task.take() {
                let outcome = handle
                    .await
                    .unwrap_or_else(|err| Err(ClientError::Interrupted(err.to_string())));
                self.controller.finish_exchange(ticket, outcome);
                self.follow_bottom = true;
                self.selected_message = None;
            }
        }
    }

    fn on_document_ready(&mut self) {
        self.input.clear();
        self.cursor = 0;
        self.selected_message = None;
        self.copied = None;
        self.chat_scroll = 0;
        self.follow_bottom = true;
        self.focus = FocusPane::Input;
        self.input_mode = InputMode::Editing;

        let dir = self.controller.upload.selected().and_then(|p| p.parent());
        if let (Some(config_path), Some(dir)) = (&self.config_path, dir) {
            if let Err(err) = Config::save_last_directory_at(config_path, dir) {
                tracing::warn!(error = %err, "could not remember directory");
            }
        }
    }

    /// Tick animation frame and expire transient state (called by Tick event)
    pub fn tick(&mut self) {
        if self.is_thinking() || self.is_processing() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        let now = Instant::now();
        self.controller.notifications.prune(now);
        if self
            .copied
            .is_some_and(|(_, at)| now.duration_since(at) >= COPIED_MARKER)
        {
            self.copied = None;
        }
    }

    fn assistant_indices(&self) -> Vec<usize> {
        self.controller
            .session
            .messages()
            .iter()
            .enumerate()
            .filter(|(_, m)| m.role == ChatRole::Assistant)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn select_next_message(&mut self) {
        let indices = self.assistant_indices();
        self.selected_message = match self.selected_message {
            None => indices.first().copied(),
            Some(current) => indices.iter().copied().find(|&i| i > current).or(Some(current)),
        };
    }

    pub fn select_prev_message(&mut self) {
        let indices = self.assistant_indices();
        self.selected_message = match self.selected_message {
            None => indices.last().copied(),
            Some(current) => indices.iter().rev().copied().find(|&i| i < current).or(Some(current)),
        };
    }

    /// Copy the raw text of the selected assistant message
    pub fn copy_selected(&mut self) {
        let Some(index) = self.selected_message else {
            return;
        };
        let Some(message) = self.controller.session.messages().get(index) else {
            return;
        };
        match copy_to_clipboard(&message.content) {
            Ok(()) => self.copied = Some((index, Instant::now())),
            Err(err) => {
                tracing::warn!(error = %err, "copy failed");
                self.controller.notifications.error("Copy failed", err.to_string());
            }
        }
    }

    pub fn is_copied(&self, index: usize) -> bool {
        self.copied.is_some_and(|(i, _)| i == index)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_bottom = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_bottom = self.chat_scroll >= max;
    }

    pub fn scroll_to_top(&mut self) {
        self.follow_bottom = false;
        self.chat_scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
        self.chat_scroll = self.max_scroll();
    }

    pub fn max_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn prompt_nav_down(&mut self) {
        let i = self.prompt_state.selected().map_or(0, |i| (i + 1) % EXAMPLE_PROMPTS.len());
        self.prompt_state.select(Some(i));
    }

    pub fn prompt_nav_up(&mut self) {
        let len = EXAMPLE_PROMPTS.len();
        let i = self.prompt_state.selected().map_or(0, |i| (i + len - 1) % len);
        self.prompt_state.select(Some(i));
    }
}
