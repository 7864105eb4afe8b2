use crate::config::Settings;
use crate::llm::error::AdvisoryError;
use crate::llm::{AdvisoryGenerator, AdvisoryRequest};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";
const DEFAULT_TIMEOUT_SECS: u64 = 90;

// Lower temperature keeps the response close to the requested section format.
const TEMPERATURE: f32 = 0.3;

const SYSTEM_PROMPT: &str = r#"You are an investment advisor specializing in Russian stocks.
You will analyze a portfolio and relevant news to provide actionable advice for each position.
For each position, provide a recommendation (BUY/SELL/HOLD) and a brief, easy-to-understand explanation.
Additionally, suggest a few trading opportunities: stocks not currently in the portfolio that present attractive long or short positions (LONG/SHORT), with a brief explanation.
Use clear language suitable for non-financial experts ("for beginners").
Format your response as:

SUMMARY:
[Overall portfolio assessment and 1-2 key insights]

RECOMMENDATIONS:
[ticker]: [NAME] - [BUY/SELL/HOLD]
Explanation: [1-2 sentences explaining the recommendation]

OPPORTUNITIES:
[ticker]: [NAME] - [LONG/SHORT]
Explanation: [1-2 sentences explaining the opportunity]

Отвечай на русском языке.
Пожалуйста, используйте заголовки строго на английском языке как "SUMMARY:", "RECOMMENDATIONS:", and "OPPORTUNITIES:"."#;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.require_openai_api_key()?.to_string();
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build openai http client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    fn user_prompt(request: &AdvisoryRequest) -> String {
        let mut prompt = format!(
            "Here is the current portfolio information:\n\n{}\n\nRecent news about Russia:\n\n{}\n\nPlease provide investment recommendations for each position in the portfolio, and suggest trading opportunities (LONG/SHORT) for other relevant stocks.\n\nОтвечай на русском языке.",
            request.portfolio_text, request.news_text
        );
        if request.monthly_reminder {
            prompt.push_str(
                "\n\nThis is a monthly review. Please also include a reminder to add funds and redistribute the portfolio.",
            );
        }
        prompt
    }

    async fn create_completion(&self, req: ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("OpenAI request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read OpenAI response body")?;
        if !status.is_success() {
            return Err(AdvisoryError {
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
            }
            .into());
        }

        serde_json::from_str::<ChatCompletionResponse>(&text)
            .with_context(|| format!("failed to decode OpenAI response: {text}"))
    }
}

#[async_trait::async_trait]
impl AdvisoryGenerator for OpenAiClient {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, request: &AdvisoryRequest) -> Result<String> {
        let req = ChatCompletionRequest {
            model: self.model.clone(),
            temperature: TEMPERATURE,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user",
                    content: Self::user_prompt(request),
                },
            ],
        };

        let res = self.create_completion(req).await?;
        let choice = res.choices.into_iter().next().ok_or_else(|| AdvisoryError {
            stage: "choices",
            detail: "model returned no choices".to_string(),
            raw_output: None,
        })?;
        Ok(choice.message.content)
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> Settings {
        Settings {
            broker_token: None,
            broker_account_id: None,
            broker_base_url: None,
            openai_api_key: Some("sk-test".to_string()),
            telegram_token: None,
            telegram_chat_id: None,
            news_api_key: None,
            news_query: None,
            sentry_dsn: None,
            utc_offset_hours: 3,
            daily_report_hour: 7,
        }
    }

    #[test]
    fn provider_name_identifies_the_model_vendor() {
        let client = OpenAiClient::from_settings(&settings()).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn decodes_chat_completion_response() {
        let v = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {
                    "index": 0,
                    "finish_reason": "stop",
                    "message": {"role": "assistant", "content": "SUMMARY:\nAll good."}
                }
            ]
        });

        let parsed: ChatCompletionResponse = serde_json::from_value(v).unwrap();
        assert_eq!(parsed.choices.len(), 1);
        assert!(parsed.choices[0].message.content.starts_with("SUMMARY:"));
    }

    #[test]
    fn monthly_reminder_extends_user_prompt() {
        let base = AdvisoryRequest {
            portfolio_text: "Positions:\n".to_string(),
            news_text: String::new(),
            monthly_reminder: false,
        };
        let monthly = AdvisoryRequest {
            monthly_reminder: true,
            ..base.clone()
        };

        let plain = OpenAiClient::user_prompt(&base);
        let with_reminder = OpenAiClient::user_prompt(&monthly);
        assert!(!plain.contains("monthly review"));
        assert!(with_reminder.contains("monthly review"));
        assert!(with_reminder.starts_with(&plain));
    }
}
