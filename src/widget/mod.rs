pub mod embed;
pub mod history;
pub mod render;
pub mod style;

use crate::api::gateway::Gateway;
use crate::api::{classify, ApiError, BotReply, ChatMessage, MessageRequest};
use crate::config::{self, WidgetConfig, WidgetSettings};
use crate::db::models::Message;
use crate::db::Database;
use history::History;
use render::{Carousel, CardMedia, ViewItem};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const NOT_FOUND_TEXT: &str = "К сожалению, ничего не найдено";
pub const UNEXPECTED_TEXT: &str = "Получен неожиданный формат ответа";
pub const SEND_ERROR_TEXT: &str = "Ошибка при отправке сообщения";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputState {
    Idle,
    Sending,
}

/// One mounted chat widget bound to one chat id.
///
/// Owns its configuration, conversation and UI state; nothing is shared
/// between instances except the storage file, where each instance only
/// touches its own key.
pub struct ChatWidget {
    chat_id: String,
    config: WidgetConfig,
    settings: WidgetSettings,
    gateway: Gateway,
    history: History,
    messages: Vec<Message>,
    transcript: Vec<ViewItem>,
    panel: PanelState,
    input_state: InputState,
    input: String,
}

impl ChatWidget {
    /// Fetch the chat's configuration, then mount.
    pub async fn load(chat_id: &str, settings: WidgetSettings, db: Arc<Database>) -> Self {
        let gateway = Gateway::new(&settings);
        let config = config::load_config(&gateway, chat_id).await;
        Self::mount_with(chat_id, config, settings, gateway, db)
    }

    /// Mount with an already known configuration and replay stored history.
    pub fn mount(
        chat_id: &str,
        config: WidgetConfig,
        settings: WidgetSettings,
        db: Arc<Database>,
    ) -> Self {
        let gateway = Gateway::new(&settings);
        Self::mount_with(chat_id, config, settings, gateway, db)
    }

    fn mount_with(
        chat_id: &str,
        config: WidgetConfig,
        settings: WidgetSettings,
        gateway: Gateway,
        db: Arc<Database>,
    ) -> Self {
        let mut widget = Self {
            chat_id: chat_id.to_string(),
            history: History::new(db, chat_id),
            config,
            settings,
            gateway,
            messages: Vec::new(),
            transcript: Vec::new(),
            panel: PanelState::Closed,
            input_state: InputState::Idle,
            input: String::new(),
        };
        widget.push_greeting();

        let stored = widget.history.load();
        let restored = stored.len();
        for message in stored {
            widget.append(message, true);
        }
        tracing::info!(
            chat_id = %widget.chat_id,
            restored,
            position = ?widget.config.position,
            "Chat widget mounted"
        );
        widget
    }

    fn push_greeting(&mut self) {
        if !self.config.welcome_message.trim().is_empty() {
            self.transcript
                .push(render::greeting(&self.config.welcome_message, &self.config));
        }
    }

    // ── Accessors ──

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn transcript(&self) -> &[ViewItem] {
        &self.transcript
    }

    pub fn panel(&self) -> PanelState {
        self.panel
    }

    pub fn is_open(&self) -> bool {
        self.panel == PanelState::Open
    }

    pub fn input_state(&self) -> InputState {
        self.input_state
    }

    pub fn is_sending(&self) -> bool {
        self.input_state == InputState::Sending
    }

    /// Input field and send button are disabled while a request is out.
    pub fn controls_disabled(&self) -> bool {
        self.is_sending()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn storage_key(&self) -> &str {
        self.history.key()
    }

    pub fn stylesheet(&self) -> String {
        style::stylesheet(&self.config)
    }

    pub fn shell_html(&self) -> String {
        style::shell_html(&self.config, self.is_open())
    }

    pub fn transcript_html(&self) -> String {
        self.transcript
            .iter()
            .map(|item| item.to_html(&self.config))
            .collect()
    }

    pub fn embed_snippet(&self) -> String {
        embed::snippet(&self.settings.script_url, &self.chat_id)
    }

    // ── Panel ──

    pub fn open(&mut self) {
        self.panel = PanelState::Open;
    }

    pub fn close(&mut self) {
        self.panel = PanelState::Closed;
    }

    /// Launcher button.
    pub fn toggle(&mut self) {
        match self.panel {
            PanelState::Open => self.close(),
            PanelState::Closed => self.open(),
        }
    }

    /// Only the centered modal has an overlay to click.
    pub fn click_overlay(&mut self) {
        if self.config.is_modal() {
            self.close();
        }
    }

    pub fn auto_open_delay(&self) -> Option<Duration> {
        self.config
            .auto_open
            .then(|| Duration::from_millis(self.config.auto_open_delay))
    }

    /// Wait out the configured delay and open the panel.
    pub async fn run_auto_open(&mut self) {
        let Some(delay) = self.auto_open_delay() else {
            return;
        };
        tokio::time::sleep(delay).await;
        if !self.is_open() {
            tracing::debug!(chat_id = %self.chat_id, "Auto-opening chat widget");
            self.open();
        }
    }

    // ── Conversation ──

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Start a send cycle: idle → sending.
    ///
    /// Returns `None` without side effects when the trimmed input is empty
    /// or a request is already in flight.
    pub fn begin_send(&mut self) -> Option<MessageRequest> {
        if self.is_sending() {
            tracing::debug!(chat_id = %self.chat_id, "Send ignored, request already in flight");
            return None;
        }
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return None;
        }

        let history = self.history_for(&text);
        self.input.clear();
        self.input_state = InputState::Sending;
        self.append(Message::user(text.clone()), false);
        self.transcript.push(ViewItem::Typing);

        Some(MessageRequest {
            message: text,
            chat_id: self.chat_id.clone(),
            assistant_id: self.config.assistant_id.clone(),
            history,
        })
    }

    /// Prior turns (bounded by `contextLength`) followed by the current one.
    fn history_for(&self, current: &str) -> Vec<ChatMessage> {
        let start = match self.config.context_length {
            Some(limit) => self.messages.len().saturating_sub(limit),
            None => 0,
        };
        let mut turns: Vec<ChatMessage> = self.messages[start..]
            .iter()
            .filter_map(Message::to_turn)
            .collect();
        turns.push(ChatMessage {
            role: "user".to_string(),
            content: current.to_string(),
        });
        turns
    }

    pub async fn dispatch(&self, request: &MessageRequest) -> Result<Value, ApiError> {
        self.gateway.post_message(request).await
    }

    /// End a send cycle: sending → idle, whatever the outcome, and append
    /// exactly one bot entry.
    pub fn finish_send(&mut self, outcome: Result<Value, ApiError>) -> Option<&Message> {
        if !self.is_sending() {
            return None;
        }
        self.transcript.retain(|item| *item != ViewItem::Typing);
        self.input_state = InputState::Idle;

        let reply = match outcome {
            Ok(body) => {
                tracing::debug!(chat_id = %self.chat_id, response = %body, "Backend response");
                match classify(&body) {
                    BotReply::Text(text) => Message::bot(text),
                    BotReply::Results(items) => Message::results(items),
                    BotReply::Empty => Message::bot(NOT_FOUND_TEXT),
                    BotReply::Unrecognized(raw) => {
                        tracing::warn!(chat_id = %self.chat_id, response = %raw, "Unknown response type");
                        Message::bot(UNEXPECTED_TEXT)
                    }
                }
            }
            Err(e) => {
                tracing::error!(chat_id = %self.chat_id, error = %e, "Failed to send message");
                Message::bot(SEND_ERROR_TEXT)
            }
        };
        self.append(reply, false);
        self.messages.last()
    }

    /// Full send cycle for the current input (send button or Enter).
    pub async fn submit(&mut self) -> Option<&Message> {
        let request = self.begin_send()?;
        let outcome = self.dispatch(&request).await;
        self.finish_send(outcome)
    }

    /// Render, record and (unless replaying) persist one entry.
    fn append(&mut self, message: Message, skip_save: bool) {
        self.transcript.push(render::render_message(
            &message,
            &self.config,
            &self.settings.booking_base_url,
        ));
        self.messages.push(message);
        if !skip_save {
            self.history.save(&self.messages);
        }
    }

    /// Forget the conversation, in memory and in storage.
    pub fn clear_history(&mut self) {
        self.messages.clear();
        self.transcript.clear();
        self.push_greeting();
        if self.is_sending() {
            self.transcript.push(ViewItem::Typing);
        }
        self.history.clear();
    }

    /// Photo strip of card `card` inside transcript item `item`.
    pub fn carousel_mut(&mut self, item: usize, card: usize) -> Option<&mut Carousel> {
        match self.transcript.get_mut(item)? {
            ViewItem::Cards(group) => match &mut group.cards.get_mut(card)?.media {
                CardMedia::Carousel(carousel) => Some(carousel),
                CardMedia::Placeholder => None,
            },
            _ => None,
        }
    }
}
