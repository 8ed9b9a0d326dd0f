pub mod api;
pub mod config;
pub mod db;
mod lenient;
pub mod logging;
pub mod widget;

pub use api::{classify, ApiError, BotReply, ChatMessage, MessageRequest};
pub use config::{Position, Theme, WidgetConfig, WidgetSettings};
pub use db::models::{Message, Photo, ResultItem};
pub use db::Database;
pub use widget::{ChatWidget, InputState, PanelState};

use std::sync::Arc;

/// Embed entry point: load the chat's configuration, mount the widget and
/// replay its stored conversation. Never fails; an unreachable config
/// endpoint yields a widget with default settings.
pub async fn init_chat_widget(
    chat_id: &str,
    settings: WidgetSettings,
    db: Arc<Database>,
) -> ChatWidget {
    tracing::info!(chat_id, "Initializing chat widget");
    ChatWidget::load(chat_id, settings, db).await
}

/// Open the storage file under `settings.storage_dir`.
pub fn open_database(settings: &WidgetSettings) -> rusqlite::Result<Arc<Database>> {
    Database::new(&settings.storage_dir).map(Arc::new)
}
