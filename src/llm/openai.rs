//! OpenAI-compatible chat completions client (also works with Ollama's `/v1`)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use super::streaming::sse_token_stream;
use super::CompletionProvider;
use super::StreamingResponse;
use crate::config::AppConfig;
use crate::errors::ProfragError;
use crate::errors::Result;
use crate::models::ConversationMessage;

#[derive(Clone)]
pub struct ChatCompletionClient {
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: Option<f32>,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ConversationMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

impl ChatCompletionClient {
    pub fn new(endpoint: String, api_key: Option<String>, model: String) -> Result<Self> {
        // No overall timeout: it would also cap how long the body may stream.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ProfragError::HttpError(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model,
            temperature: None,
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut client = Self::new(
            config.llm_endpoint().to_string(),
            config.llm.llm_key.clone(),
            config.llm_model().to_string(),
        )?;
        client.temperature = config.llm.temperature;
        Ok(client)
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionClient {
    async fn complete_stream(
        &self,
        messages: &[ConversationMessage],
    ) -> Result<StreamingResponse> {
        let url = format!("{}/chat/completions", self.endpoint);
        debug!("Calling chat completions API: {} ({} messages)", url, messages.len());

        let mut request = self.client.post(&url).json(&ChatRequest {
            model: &self.model,
            messages,
            stream: true,
            temperature: self.temperature,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProfragError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProfragError::LlmError(format!(
                "Chat completions API error ({status}): {error_text}"
            )));
        }

        info!("Completion stream opened with model {}", self.model);
        Ok(StreamingResponse::new(sse_token_stream(
            response.bytes_stream(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::body_partial_json;
    use wiremock::matchers::header;
    use wiremock::matchers::method;
    use wiremock::matchers::path;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;

    use super::*;

    fn sse_body(fragments: &[&str]) -> String {
        let mut body = String::new();
        for fragment in fragments {
            body.push_str(&format!(
                "data: {}\n\n",
                json!({"choices": [{"index": 0, "delta": {"content": fragment}}]})
            ));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    #[tokio::test]
    async fn test_streams_fragments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-3.5-turbo",
                "stream": true,
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "hi"}
                ]
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_body(&["Hello", ", ", "world"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(
            format!("{}/v1", server.uri()),
            Some("sk-test".to_string()),
            "gpt-3.5-turbo".to_string(),
        )
        .unwrap();

        let messages = vec![
            ConversationMessage::system("be brief"),
            ConversationMessage::user("hi"),
        ];
        let response = client.complete_stream(&messages).await.unwrap();
        assert_eq!(response.collect_all().await.unwrap(), "Hello, world");
    }

    #[tokio::test]
    async fn test_error_status_fails_before_first_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client =
            ChatCompletionClient::new(server.uri(), None, "gpt-3.5-turbo".to_string()).unwrap();
        let result = client
            .complete_stream(&[ConversationMessage::user("hi")])
            .await;

        match result {
            Err(ProfragError::LlmError(message)) => assert!(message.contains("429")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_temperature_is_sent_when_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"temperature": 0.5})))
            .respond_with(ResponseTemplate::new(200).set_body_string(sse_body(&["ok"])))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(server.uri(), None, "m".to_string())
            .unwrap()
            .with_temperature(0.5);
        let response = client
            .complete_stream(&[ConversationMessage::user("hi")])
            .await
            .unwrap();
        assert_eq!(response.collect_all().await.unwrap(), "ok");
    }
}
