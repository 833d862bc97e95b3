//! Chat error types

use thiserror::Error;

/// Chat error with classification
///
/// The message doubles as the user-facing text of a synthesized error
/// turn, so constructors keep it presentable.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Network, message)
    }

    pub fn status(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Status, message)
    }

    /// The completion endpoint rejected the request because the chatbot's
    /// configured model is not covered by the owner's plan.
    pub fn model_not_available(subscription_tier: Option<&str>) -> Self {
        let models = if subscription_tier == Some("free") {
            "premium"
        } else {
            "higher tier"
        };
        Self::new(
            ChatErrorKind::ModelNotAvailable,
            format!(
                "This chatbot is using features not available in your current plan. \
                 Please upgrade to access {models} models."
            ),
        )
    }

    /// The caller stopped the request. Terminates the pipeline silently;
    /// never surfaced as an error turn.
    pub fn cancelled() -> Self {
        Self::new(ChatErrorKind::Cancelled, "request cancelled")
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ChatErrorKind::Cancelled
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    /// Transport-level failure (connect, timeout, broken stream)
    Network,
    /// Non-success HTTP status without a recognized error code
    Status,
    /// `model_not_available` error code from the completion endpoint
    ModelNotAvailable,
    /// Caller-initiated cancellation, not a failure
    Cancelled,
}
