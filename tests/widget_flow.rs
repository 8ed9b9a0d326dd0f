use chat_widget_lib::widget::render::ViewItem;
use chat_widget_lib::widget::{NOT_FOUND_TEXT, SEND_ERROR_TEXT};
use chat_widget_lib::{init_chat_widget, ChatWidget, Database, Message, Position, Theme, WidgetConfig, WidgetSettings};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_for(server: &MockServer) -> WidgetSettings {
    WidgetSettings {
        api_url: format!("{}/message", server.uri()),
        config_url: format!("{}/config", server.uri()),
        request_timeout_secs: 1,
        ..WidgetSettings::default()
    }
}

fn memory_db() -> Arc<Database> {
    Arc::new(Database::in_memory().unwrap())
}

async fn mount_config(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn mounted(server: &MockServer, db: Arc<Database>) -> ChatWidget {
    ChatWidget::mount("abc123", WidgetConfig::default(), settings_for(server), db)
}

#[tokio::test]
async fn config_failure_falls_back_to_defaults() {
    chat_widget_lib::logging::init();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "boom" })))
        .expect(1)
        .mount(&server)
        .await;

    let widget = init_chat_widget("abc123", settings_for(&server), memory_db()).await;

    assert_eq!(widget.config(), &WidgetConfig::default());
    assert_eq!(widget.config().theme, Theme::Light);
    assert_eq!(widget.config().position, Position::BottomRight);
    assert_eq!(widget.config().button_text, "Чат");
    assert!(widget.shell_html().contains("💬 Чат"));
}

#[tokio::test]
async fn malformed_config_falls_back_to_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let widget = init_chat_widget("abc123", settings_for(&server), memory_db()).await;
    assert_eq!(widget.config(), &WidgetConfig::default());
}

#[tokio::test]
async fn partial_config_is_merged_over_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/config"))
        .and(query_param("id", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "theme": "dark" })))
        .expect(1)
        .mount(&server)
        .await;

    let widget = init_chat_widget("abc123", settings_for(&server), memory_db()).await;
    assert_eq!(
        widget.config(),
        &WidgetConfig {
            theme: Theme::Dark,
            ..WidgetConfig::default()
        }
    );
    assert!(widget.stylesheet().contains("#1a1a1a"));
}

#[tokio::test]
async fn text_reply_is_rendered_and_stored() {
    let server = MockServer::start().await;
    mount_config(&server, json!({ "assistantId": "asst_42" })).await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .and(body_partial_json(json!({
            "message": "hello",
            "chatId": "abc123",
            "assistant_id": "asst_42",
            "history": [{ "role": "user", "content": "hello" }]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "type": "text", "message": "hi there" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let db = memory_db();
    let mut widget = init_chat_widget("abc123", settings_for(&server), db.clone()).await;
    widget.set_input("hello");
    let reply = widget.submit().await.cloned().unwrap();

    assert_eq!(reply.text(), Some("hi there"));
    let entries: Vec<_> = widget
        .messages()
        .iter()
        .map(|m| (m.text().unwrap().to_string(), m.is_user()))
        .collect();
    assert_eq!(
        entries,
        vec![("hello".to_string(), true), ("hi there".to_string(), false)]
    );

    let stored: Vec<Message> =
        serde_json::from_str(&db.get_item("gpt-chat-history-abc123").unwrap().unwrap()).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].text(), Some("hi there"));
}

#[tokio::test]
async fn empty_json_results_show_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "mode": "json", "response": [] })))
        .mount(&server)
        .await;

    let mut widget = mounted(&server, memory_db());
    widget.set_input("find flats");
    widget.submit().await;

    assert_eq!(widget.messages().len(), 2);
    assert_eq!(widget.messages()[1].text(), Some(NOT_FOUND_TEXT));
    assert!(widget.transcript().iter().all(|item| item.as_cards().is_none()));
}

#[tokio::test]
async fn unparseable_body_shows_connection_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ definitely not json"))
        .mount(&server)
        .await;

    let mut widget = mounted(&server, memory_db());
    widget.set_input("hello");
    widget.submit().await;

    let bot: Vec<_> = widget.messages().iter().filter(|m| !m.is_user()).collect();
    assert_eq!(bot.len(), 1);
    assert_eq!(bot[0].text(), Some(SEND_ERROR_TEXT));
    assert!(!widget.controls_disabled());
    assert!(!widget.transcript().contains(&ViewItem::Typing));
}

#[tokio::test]
async fn error_status_with_json_body_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(
            ResponseTemplate::new(502).set_body_json(json!({ "mode": "text", "response": "upstream busy" })),
        )
        .mount(&server)
        .await;

    let mut widget = mounted(&server, memory_db());
    widget.set_input("hello");
    let reply = widget.submit().await.cloned().unwrap();
    assert_eq!(reply.text(), Some("upstream busy"));
}

#[tokio::test]
async fn unreachable_backend_shows_connection_error() {
    let server = MockServer::start().await;
    let settings = WidgetSettings {
        api_url: "http://127.0.0.1:9/message".to_string(),
        ..settings_for(&server)
    };
    let mut widget = ChatWidget::mount("abc123", WidgetConfig::default(), settings, memory_db());
    widget.set_input("hello");
    let reply = widget.submit().await.cloned().unwrap();
    assert_eq!(reply.text(), Some(SEND_ERROR_TEXT));
    assert!(!widget.is_sending());
}

#[tokio::test]
async fn hung_backend_times_out_and_recovers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "type": "text", "message": "too late" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut widget = mounted(&server, memory_db());
    widget.set_input("hello");
    let reply = widget.submit().await.cloned().unwrap();

    assert_eq!(reply.text(), Some(SEND_ERROR_TEXT));
    assert!(!widget.is_sending());
}

#[tokio::test]
async fn only_one_request_in_flight() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "type": "text", "message": "pong" })))
        .expect(1)
        .mount(&server)
        .await;

    let mut widget = mounted(&server, memory_db());
    widget.set_input("ping");
    let request = widget.begin_send().unwrap();

    // Second Enter press while the first request is still out.
    widget.set_input("ping");
    assert!(widget.submit().await.is_none());
    assert_eq!(widget.messages().len(), 1);

    let outcome = widget.dispatch(&request).await;
    widget.finish_send(outcome);
    assert_eq!(widget.messages().len(), 2);
    assert_eq!(widget.messages()[1].text(), Some("pong"));
}

#[tokio::test]
async fn reload_restores_conversation_without_resaving() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "results",
            "results": [
                { "id": "hotels-1", "title": "Hotel", "photos": [{ "sm": "s.jpg" }], "price_total": 9000 },
                { "id": "r2", "name": "Room" }
            ]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let settings = WidgetSettings {
        storage_dir: dir.path().to_path_buf(),
        ..settings_for(&server)
    };
    let db = chat_widget_lib::open_database(&settings).unwrap();

    let mut live = ChatWidget::mount("abc123", WidgetConfig::default(), settings.clone(), db.clone());
    live.set_input("find hotels");
    live.submit().await;
    let stored = db.get_item(live.storage_key()).unwrap();
    drop(db);

    let db = chat_widget_lib::open_database(&settings).unwrap();
    let replayed = ChatWidget::mount("abc123", WidgetConfig::default(), settings, db.clone());

    assert_eq!(replayed.messages(), live.messages());
    assert_eq!(replayed.transcript(), live.transcript());
    assert_eq!(db.get_item(replayed.storage_key()).unwrap(), stored);

    let cards = replayed.transcript()[1].as_cards().unwrap();
    assert_eq!(
        cards.cards[0].booking_url.as_deref(),
        Some("https://qqrenta.ru/hotels/hotels-1")
    );
    assert_eq!(cards.cards[1].title.as_deref(), Some("Room"));
}

#[tokio::test]
async fn context_length_from_config_limits_history() {
    let server = MockServer::start().await;
    mount_config(&server, json!({ "contextLength": 1 })).await;
    Mock::given(method("POST"))
        .and(path("/message"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "type": "text", "message": "ok" })))
        .mount(&server)
        .await;

    let mut widget = init_chat_widget("abc123", settings_for(&server), memory_db()).await;
    widget.set_input("first");
    widget.submit().await;
    widget.set_input("second");
    let request = widget.begin_send().unwrap();

    let contents: Vec<_> = request.history.iter().map(|t| t.content.as_str()).collect();
    assert_eq!(contents, vec!["ok", "second"]);
}

#[tokio::test(start_paused = true)]
async fn auto_open_waits_for_delay() {
    let mut widget = ChatWidget::mount(
        "abc123",
        WidgetConfig {
            auto_open: true,
            auto_open_delay: 5_000,
            ..WidgetConfig::default()
        },
        WidgetSettings::default(),
        memory_db(),
    );
    assert!(!widget.is_open());
    widget.run_auto_open().await;
    assert!(widget.is_open());
}
