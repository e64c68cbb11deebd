//! Session controller: owns the conversation and the single in-flight request.
//!
//! Front ends call [`SessionController::send`] and [`SessionController::reset`]
//! and render from [`SessionController::subscribe`]. Every mutation is
//! published on its own, so a subscriber sees the user turn before the
//! request resolves.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::{ChatBackend, ChatRequest};
use crate::state::{ChatTurn, ConversationState};

/// Assistant turn appended in place of any transport or protocol failure.
pub const FALLBACK_MESSAGE: &str = "He encontrado un error al conectar con el servidor. Verificá que la API esté corriendo en el puerto 8000.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The resolved text was empty after trimming
    EmptyMessage,
    /// Another request is still in flight
    RequestInFlight,
}

/// How a call to `send` ended. Rejections are informational; nothing changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Rejected(RejectReason),
    Answered,
    Fallback,
}

struct Admission {
    message: String,
    session_id: Option<String>,
    epoch: u64,
}

/// Clears `pending` when dropped, whether the request resolved, the result
/// handling panicked, or the `send` future was dropped mid-flight.
struct PendingGuard<'a> {
    state: &'a watch::Sender<ConversationState>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|state| state.pending = false);
    }
}

pub struct SessionController<B> {
    backend: Arc<B>,
    state: Arc<watch::Sender<ConversationState>>,
}

impl<B> Clone for SessionController<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
        }
    }
}

impl<B: ChatBackend + 'static> SessionController<B> {
    /// Create the controller and spawn its one-shot health probe.
    ///
    /// The returned handle resolves to the probe result; front ends can ignore
    /// it and watch `connected` instead.
    pub fn start(backend: B) -> (Self, JoinHandle<bool>) {
        let controller = Self::new(backend);
        let prober = controller.clone();
        let probe = tokio::spawn(async move { prober.probe_health().await });
        (controller, probe)
    }

    pub(crate) fn new(backend: B) -> Self {
        let (state, _) = watch::channel(ConversationState::default());
        Self {
            backend: Arc::new(backend),
            state: Arc::new(state),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Receiver that wakes after every state change.
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ConversationState {
        self.state.borrow().clone()
    }

    pub fn set_draft(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_modify(|state| state.draft = text);
    }

    pub fn edit_draft(&self, edit: impl FnOnce(&mut String)) {
        self.state.send_modify(|state| edit(&mut state.draft));
    }

    async fn probe_health(&self) -> bool {
        let (connected, product_count) = match self.backend.health().await {
            Ok(report) => {
                info!(
                    status = report.status.as_deref().unwrap_or("-"),
                    product_count = ?report.product_count,
                    "backend reachable"
                );
                (true, report.product_count)
            }
            Err(err) => {
                warn!(error = %err, "backend health probe failed");
                (false, None)
            }
        };

        self.state.send_modify(|state| {
            state.connected = connected;
            state.product_count = product_count;
        });
        connected
    }

    /// Send `text`, or the current draft when `text` is `None`.
    ///
    /// Ignored when the trimmed text is empty or a request is already in
    /// flight. Otherwise the user turn is appended, the draft cleared, and the
    /// call suspends until the backend answers; exactly one assistant turn
    /// follows, either the reply or [`FALLBACK_MESSAGE`]. Backend errors never
    /// escape this method.
    pub async fn send(&self, text: Option<&str>) -> SendOutcome {
        let mut verdict = Err(RejectReason::EmptyMessage);
        self.state.send_if_modified(|state| {
            let message = text.unwrap_or(state.draft.as_str()).trim().to_owned();
            if message.is_empty() {
                return false;
            }
            if state.pending {
                verdict = Err(RejectReason::RequestInFlight);
                return false;
            }

            state.turns.push(ChatTurn::user(message.clone()));
            state.draft.clear();
            state.pending = true;
            verdict = Ok(Admission {
                message,
                session_id: state.session_id.clone(),
                epoch: state.epoch,
            });
            true
        });

        let admission = match verdict {
            Ok(admission) => admission,
            Err(reason) => {
                debug!(?reason, "send ignored");
                return SendOutcome::Rejected(reason);
            }
        };

        let _pending = PendingGuard { state: &self.state };

        let request = ChatRequest {
            message: admission.message,
            session_id: admission.session_id,
        };
        debug!(session_id = ?request.session_id, "chat request in flight");
        let result = self.backend.chat(&request).await;

        let mut outcome = SendOutcome::Fallback;
        self.state.send_modify(|state| {
            if state.epoch != admission.epoch {
                warn!("conversation was reset while a request was in flight; appending its reply to the new conversation");
            }

            match result {
                Ok(reply) => {
                    debug!(session_id = %reply.session_id, "chat request answered");
                    state.session_id = Some(reply.session_id);
                    state.turns.push(ChatTurn::assistant(reply.response));
                    outcome = SendOutcome::Answered;
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        status = ?err.status().map(|status| status.as_u16()),
                        timed_out = err.is_timeout(),
                        "chat request failed, appending fallback turn"
                    );
                    state.turns.push(ChatTurn::assistant(FALLBACK_MESSAGE));
                }
            }
        });

        outcome
    }

    /// Start a new conversation. An in-flight request is not cancelled.
    pub fn reset(&self) {
        self.state.send_modify(|state| {
            state.turns.clear();
            state.session_id = None;
            state.epoch += 1;
        });
        info!("conversation reset");
    }
}
