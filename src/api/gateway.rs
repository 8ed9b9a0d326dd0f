use super::{ApiError, MessageRequest};
use crate::config::WidgetSettings;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// HTTP client for the two remote collaborators: the config endpoint and
/// the message endpoint.
#[derive(Debug, Clone)]
pub struct Gateway {
    client: Client,
    api_url: String,
    config_url: String,
    timeout: Duration,
}

impl Gateway {
    pub fn new(settings: &WidgetSettings) -> Self {
        Self {
            client: Client::new(),
            api_url: settings.api_url.clone(),
            config_url: settings.config_url.clone(),
            timeout: settings.request_timeout(),
        }
    }

    /// GET the raw per-chat configuration. Error statuses are failures.
    pub async fn fetch_config(&self, chat_id: &str) -> Result<Value, ApiError> {
        let resp = self
            .client
            .get(&self.config_url)
            .query(&[("id", chat_id)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status,
                message: text,
            });
        }

        let text = resp.text().await.map_err(ApiError::from_transport)?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// POST one turn. The body is parsed as JSON whatever the status, so a
    /// structured error reply still reaches the classifier.
    pub async fn post_message(&self, request: &MessageRequest) -> Result<Value, ApiError> {
        tracing::debug!(
            chat_id = %request.chat_id,
            history = request.history.len(),
            "Sending message request"
        );

        let resp = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = resp.status();
        let text = resp.text().await.map_err(ApiError::from_transport)?;

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => {
                if !status.is_success() {
                    tracing::warn!(status = status.as_u16(), "Message endpoint returned error status");
                }
                Ok(body)
            }
            Err(_) if !status.is_success() => Err(ApiError::Api {
                status: status.as_u16(),
                message: text,
            }),
            Err(e) => Err(ApiError::Parse(e.to_string())),
        }
    }
}
