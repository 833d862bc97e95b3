//! HTTP client for the hosted chat service
//!
//! Thin wrapper over `reqwest` implementing the three live-chatbot
//! endpoints. Streaming response bodies are returned as-is; decoding
//! belongs to [`crate::protocol`].

use crate::error::ChatError;
use crate::types::{
    ApiErrorBody, Chatbot, CompletionRequest, CreateChatRequest, CreateChatResponse,
};
use reqwest::Client;
use std::time::Duration;

/// Production API endpoint
pub const DEFAULT_BASE_URL: &str = "https://adrenal.ai/api";

/// Client for the live chatbot endpoints
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client against the given API base URL.
    ///
    /// Only a connect timeout is set: completion responses stream for
    /// arbitrarily long, so a total request timeout would sever them.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn live_url(&self, publish_id: &str) -> String {
        format!("{}/chatbot/{}/live", self.base_url, publish_id)
    }

    /// Fetch chatbot metadata: `GET /chatbot/{publish_id}/live`
    pub async fn fetch_chatbot(&self, publish_id: &str) -> Result<Chatbot, ChatError> {
        let response = self
            .http
            .get(self.live_url(publish_id))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, publish_id, "chatbot metadata fetch rejected");
            return Err(ChatError::status("Failed to load chatbot"));
        }

        response
            .json()
            .await
            .map_err(|e| ChatError::status(format!("Failed to load chatbot: {e}")))
    }

    /// Create a chat session: `POST /chatbot/{publish_id}/live`
    ///
    /// Carries the first user message; returns the chat id to reuse for
    /// every later completion request in the conversation.
    pub async fn create_chat(
        &self,
        publish_id: &str,
        first_message: &str,
    ) -> Result<String, ChatError> {
        let response = self
            .http
            .post(self.live_url(publish_id))
            .json(&CreateChatRequest {
                message: first_message,
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, publish_id, "chat creation rejected");
            return Err(ChatError::status("Failed to create chat"));
        }

        let body: CreateChatResponse = response
            .json()
            .await
            .map_err(|_| ChatError::status("Failed to create chat"))?;
        Ok(body.chat_id)
    }

    /// Start a streaming completion:
    /// `POST /chatbot/{publish_id}/live/{chat_id}`
    ///
    /// On success the raw response is handed back for incremental
    /// decoding. On a non-success status the structured error body is
    /// read: a `model_not_available` code becomes the tier-specific
    /// upgrade error, anything else a generic failure.
    pub async fn start_completion(
        &self,
        publish_id: &str,
        chat_id: &str,
        request: &CompletionRequest,
    ) -> Result<reqwest::Response, ChatError> {
        let url = format!("{}/{}", self.live_url(publish_id), chat_id);
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Bodies that are not JSON fall back to the generic failure.
        let body = response.json::<ApiErrorBody>().await.unwrap_or_default();
        tracing::warn!(%status, code = ?body.code, "completion request rejected");

        if body.code.as_deref() == Some("model_not_available") {
            Err(ChatError::model_not_available(
                body.subscription_tier.as_deref(),
            ))
        } else {
            Err(ChatError::status("Failed to send message"))
        }
    }
}

fn transport_error(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::network(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        ChatError::network(format!("Connection failed: {e}"))
    } else {
        ChatError::network(format!("Request failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatErrorKind;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_chatbot_parses_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chatbot/pub-1/live"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "title": "Support Bot",
                "description": "Answers questions",
                "live": true,
                "messages_initial": "Hi there!"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let chatbot = client.fetch_chatbot("pub-1").await.unwrap();
        assert_eq!(chatbot.title, "Support Bot");
        assert!(chatbot.live);
        assert_eq!(chatbot.messages_initial.as_deref(), Some("Hi there!"));
    }

    #[tokio::test]
    async fn test_fetch_chatbot_non_success_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/chatbot/pub-1/live"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let err = client.fetch_chatbot("pub-1").await.unwrap_err();
        assert_eq!(err.kind, ChatErrorKind::Status);
        assert_eq!(err.message, "Failed to load chatbot");
    }

    #[tokio::test]
    async fn test_create_chat_sends_first_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chatbot/pub-1/live"))
            .and(body_json(serde_json::json!({"message": "Hello"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"chat_id": "chat-42"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let chat_id = client.create_chat("pub-1", "Hello").await.unwrap();
        assert_eq!(chat_id, "chat-42");
    }

    #[tokio::test]
    async fn test_completion_model_not_available_maps_tier() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chatbot/pub-1/live/chat-42"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "code": "model_not_available",
                "subscription_tier": "free"
            })))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let request = CompletionRequest {
            id: "req-1".to_string(),
            messages: vec![],
        };
        let err = client
            .start_completion("pub-1", "chat-42", &request)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ChatErrorKind::ModelNotAvailable);
        assert!(err.message.contains("premium"));
    }

    #[tokio::test]
    async fn test_completion_other_failures_are_generic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chatbot/pub-1/live/chat-42"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri());
        let request = CompletionRequest {
            id: "req-1".to_string(),
            messages: vec![],
        };
        let err = client
            .start_completion("pub-1", "chat-42", &request)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ChatErrorKind::Status);
        assert_eq!(err.message, "Failed to send message");
    }
}
