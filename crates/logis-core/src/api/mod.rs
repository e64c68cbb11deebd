pub mod logis;

pub use logis::LogisClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Body of `POST /chat`. `session_id` is sent as `null` until the backend
/// has issued one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub response: String,
}

/// What `GET /health` told us. Only reachability matters to the controller;
/// the product count is shown on the welcome panel when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "productos")]
    pub product_count: Option<u64>,
}

/// The backend surface the session controller drives.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn health(&self) -> Result<HealthReport, ApiError>;

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ApiError>;
}
