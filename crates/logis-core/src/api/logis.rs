use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;

use super::{ChatBackend, ChatRequest, ChatResponse, HealthReport};
use crate::error::ApiError;

/// FastAPI puts the exception text of a failed request under `detail`.
#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Clone)]
pub struct LogisClient {
    client: Client,
    base_url: String,
    health_timeout: Option<Duration>,
    chat_timeout: Option<Duration>,
}

impl LogisClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            health_timeout: None,
            chat_timeout: None,
        }
    }

    pub fn with_health_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn with_chat_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.chat_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check_status(url: &str, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .map(|err| err.detail)
            .unwrap_or(body);

        Err(ApiError::Status {
            url: url.to_string(),
            status,
            detail,
        })
    }
}

#[async_trait]
impl ChatBackend for LogisClient {
    async fn health(&self) -> Result<HealthReport, ApiError> {
        let url = self.url("/health");

        let mut request = self.client.get(&url);
        if let Some(timeout) = self.health_timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;
        let response = Self::check_status(&url, response).await?;

        // Reachable is all that counts; a body we can't read just means no count.
        Ok(response.json::<HealthReport>().await.unwrap_or_default())
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError> {
        let url = self.url("/chat");

        let mut builder = self.client.post(&url).json(request);
        if let Some(timeout) = self.chat_timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;
        let response = Self::check_status(&url, response).await?;

        response
            .json::<ChatResponse>()
            .await
            .map_err(|source| ApiError::Decode { url, source })
    }
}
