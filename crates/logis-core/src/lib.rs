pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod shortcuts;
pub mod state;

// Re-export main types for convenience
pub use api::{ChatBackend, ChatRequest, ChatResponse, HealthReport, LogisClient};
pub use config::Config;
pub use controller::{RejectReason, SendOutcome, SessionController, FALLBACK_MESSAGE};
pub use error::ApiError;
pub use shortcuts::{QuickQuery, PRODUCT_LINES, QUICK_QUERIES};
pub use state::{ChatRole, ChatTurn, ConversationState};
