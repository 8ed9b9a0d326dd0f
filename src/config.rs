use crate::api::gateway::Gateway;
use crate::lenient;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    BottomRight,
    BottomLeft,
    TopRight,
    TopLeft,
    CenterModal,
}

impl Position {
    pub fn is_modal(self) -> bool {
        self == Position::CenterModal
    }

    /// Offsets of the floating container. The modal variant keeps its
    /// launcher button in the bottom-right corner.
    pub fn offsets(self) -> &'static str {
        match self {
            Position::BottomRight | Position::CenterModal => "bottom:20px;right:20px;",
            Position::BottomLeft => "bottom:20px;left:20px;",
            Position::TopRight => "top:20px;right:20px;",
            Position::TopLeft => "top:20px;left:20px;",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

/// Per-chat widget configuration served by the config endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetConfig {
    pub position: Position,
    pub theme: Theme,
    pub primary_color: String,
    pub border_radius: u32,
    pub width: u32,
    pub height: u32,
    pub button_icon: String,
    pub button_text: String,
    pub placeholder: String,
    pub show_timestamp: bool,
    pub assistant_id: String,
    pub welcome_message: String,
    pub auto_open: bool,
    /// Milliseconds.
    pub auto_open_delay: u64,
    /// Prior turns sent with each message; `None` sends all of them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_length: Option<usize>,
    pub show_avatar: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            position: Position::BottomRight,
            theme: Theme::Light,
            primary_color: "#3b82f6".to_string(),
            border_radius: 16,
            width: 400,
            height: 600,
            button_icon: "💬".to_string(),
            button_text: "Чат".to_string(),
            placeholder: "Напишите сообщение...".to_string(),
            show_timestamp: true,
            assistant_id: String::new(),
            welcome_message: String::new(),
            auto_open: false,
            auto_open_delay: 3000,
            context_length: None,
            show_avatar: false,
            avatar_url: None,
        }
    }
}

impl WidgetConfig {
    /// Shallow-merge a config endpoint response over the defaults.
    ///
    /// Each field is taken only when present and well-typed; anything else
    /// keeps its default. A non-object body yields the defaults unchanged.
    pub fn merged(raw: &Value) -> Self {
        let mut cfg = Self::default();
        let Some(obj) = raw.as_object() else {
            return cfg;
        };

        if let Some(position) = variant::<Position>(obj, "position") {
            cfg.position = position;
        }
        if let Some(theme) = variant::<Theme>(obj, "theme") {
            cfg.theme = theme;
        }
        if let Some(color) = lenient::text(obj.get("primaryColor")).filter(|c| is_css_color(c)) {
            cfg.primary_color = color;
        }
        if let Some(radius) = lenient::count(obj.get("borderRadius")) {
            cfg.border_radius = clamp_u32(radius);
        }
        if let Some(width) = lenient::positive(obj.get("width")) {
            cfg.width = clamp_u32(width);
        }
        if let Some(height) = lenient::positive(obj.get("height")) {
            cfg.height = clamp_u32(height);
        }
        if let Some(icon) = lenient::text(obj.get("buttonIcon")) {
            cfg.button_icon = icon;
        }
        if let Some(text) = lenient::text(obj.get("buttonText")) {
            cfg.button_text = text;
        }
        if let Some(placeholder) = lenient::text(obj.get("placeholder")) {
            cfg.placeholder = placeholder;
        }
        if let Some(show) = lenient::flag(obj.get("showTimestamp")) {
            cfg.show_timestamp = show;
        }
        if let Some(assistant) = lenient::text(obj.get("assistantId")) {
            cfg.assistant_id = assistant;
        }
        if let Some(welcome) = lenient::text(obj.get("welcomeMessage")) {
            cfg.welcome_message = welcome;
        }
        if let Some(auto_open) = lenient::flag(obj.get("autoOpen")) {
            cfg.auto_open = auto_open;
        }
        if let Some(delay) = lenient::count(obj.get("autoOpenDelay")) {
            cfg.auto_open_delay = delay;
        }
        if let Some(turns) = lenient::positive(obj.get("contextLength")) {
            cfg.context_length = usize::try_from(turns).ok();
        }
        if let Some(show) = lenient::flag(obj.get("showAvatar")) {
            cfg.show_avatar = show;
        }
        if let Some(url) = lenient::text(obj.get("avatarUrl")) {
            cfg.avatar_url = Some(url);
        }

        cfg
    }

    pub fn is_modal(&self) -> bool {
        self.position.is_modal()
    }

    /// Header and launcher caption, e.g. "💬 Чат".
    pub fn caption(&self) -> String {
        format!("{} {}", self.button_icon, self.button_text)
    }
}

fn variant<T: serde::de::DeserializeOwned>(obj: &Map<String, Value>, key: &str) -> Option<T> {
    serde_json::from_value(obj.get(key)?.clone()).ok()
}

fn clamp_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, or `rgb(...)`/`rgba(...)` with
/// numeric arguments. Anything else could escape the declaration it is
/// interpolated into.
fn is_css_color(value: &str) -> bool {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    let args = value
        .strip_prefix("rgba(")
        .or_else(|| value.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'));
    match args {
        Some(args) => {
            !args.trim().is_empty()
                && args
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, ' ' | ',' | '.' | '%' | '/'))
        }
        None => false,
    }
}

/// Fetch the chat's configuration and merge it over the defaults.
///
/// Never fails: network errors, error statuses and malformed bodies all
/// fall back to [`WidgetConfig::default`].
pub async fn load_config(gateway: &Gateway, chat_id: &str) -> WidgetConfig {
    match gateway.fetch_config(chat_id).await {
        Ok(raw) => {
            tracing::debug!(chat_id, config = %raw, "Chat config loaded");
            let cfg = WidgetConfig::merged(&raw);
            if cfg.assistant_id.is_empty() {
                tracing::warn!(chat_id, "No assistantId in chat config");
            }
            cfg
        }
        Err(e) => {
            tracing::warn!(chat_id, error = %e, "Failed to load chat config, using defaults");
            WidgetConfig::default()
        }
    }
}

// ── Process settings ──

/// Where the widget's collaborators live. These are local to the host
/// process, unlike [`WidgetConfig`] which is fetched per chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetSettings {
    pub api_url: String,
    pub config_url: String,
    pub script_url: String,
    pub booking_base_url: String,
    pub request_timeout_secs: u64,
    pub storage_dir: PathBuf,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            api_url: "https://functions.poehali.dev/eac81e19-553b-4100-981e-e0202e5cb64d"
                .to_string(),
            config_url: "https://functions.poehali.dev/533d0cc9-ea8a-4dc2-94a2-6f0b0850b815"
                .to_string(),
            script_url: "/widget.js".to_string(),
            booking_base_url: "https://qqrenta.ru".to_string(),
            request_timeout_secs: 30,
            storage_dir: PathBuf::from(".chat-widget"),
        }
    }
}

impl WidgetSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}
