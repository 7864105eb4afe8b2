use crate::config::Settings;
use crate::delivery::DeliveryChannel;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";
// Client timeout must sit above the long-poll window.
const DEFAULT_TIMEOUT_SECS: u64 = 70;
const POLL_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let token = settings.require_telegram_token()?.to_string();
        let chat_id = settings.require_telegram_chat_id()?.to_string();
        let base_url =
            std::env::var("TELEGRAM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build telegram http client")?;

        Ok(Self {
            http,
            base_url,
            token,
            chat_id,
        })
    }

    /// The one chat this bot is allowed to talk to.
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    fn url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.base_url.trim_end_matches('/'),
            self.token
        )
    }

    async fn call<B: Serialize, T: DeserializeOwned>(&self, method: &str, body: &B) -> Result<T> {
        let res = self
            .http
            .post(self.url(method))
            .json(body)
            .send()
            .await
            .with_context(|| format!("telegram {method} request failed"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read telegram response body")?;
        let envelope: ApiEnvelope<T> = serde_json::from_str(&text)
            .with_context(|| format!("failed to decode telegram {method} response: {text}"))?;

        if !envelope.ok {
            anyhow::bail!(
                "telegram {method} failed (HTTP {status}): {}",
                envelope.description.unwrap_or_default()
            );
        }
        envelope
            .result
            .with_context(|| format!("telegram {method} returned no result"))
    }

    pub async fn send_message(&self, text: &str, markdown: bool) -> Result<()> {
        let mut body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        if markdown {
            body["parse_mode"] = serde_json::Value::String("Markdown".to_string());
        }
        let _: serde_json::Value = self.call("sendMessage", &body).await?;
        Ok(())
    }

    /// Long-polls for updates; returns after `POLL_TIMEOUT_SECS` at the latest.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["message"],
        });
        self.call("getUpdates", &body).await
    }
}

#[async_trait::async_trait]
impl DeliveryChannel for TelegramClient {
    async fn send(&self, text: &str, markdown: bool) -> Result<()> {
        self.send_message(text, markdown).await
    }
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub text: Option<String>,
    pub chat: Chat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_get_updates_envelope() {
        let v = json!({
            "ok": true,
            "result": [
                {
                    "update_id": 42,
                    "message": {
                        "message_id": 7,
                        "text": "/analyze",
                        "chat": {"id": 123456, "type": "private"}
                    }
                }
            ]
        });

        let envelope: ApiEnvelope<Vec<Update>> = serde_json::from_value(v).unwrap();
        assert!(envelope.ok);
        let updates = envelope.result.unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].update_id, 42);
        let message = updates[0].message.as_ref().unwrap();
        assert_eq!(message.text.as_deref(), Some("/analyze"));
        assert_eq!(message.chat.id, 123456);
    }

    #[test]
    fn error_envelope_carries_description() {
        let v = json!({"ok": false, "error_code": 400, "description": "Bad Request: can't parse entities"});
        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_value(v).unwrap();
        assert!(!envelope.ok);
        assert!(envelope.description.unwrap().contains("can't parse entities"));
    }
}
