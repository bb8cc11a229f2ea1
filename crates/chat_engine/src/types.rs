use std::fmt;

pub type RequestId = u64;

/// One parsed line of the upstream NDJSON stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpstreamEvent {
    /// Text to forward. `None` for events without text or with an empty string.
    pub content_delta: Option<String>,
    pub is_final: bool,
    pub model: Option<String>,
    pub done_reason: Option<String>,
    /// Counters reported on the final event.
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Usage {
    pub prompt_eval_count: Option<u64>,
    pub eval_count: Option<u64>,
    /// Nanoseconds.
    pub total_duration: Option<u64>,
    /// Nanoseconds.
    pub eval_duration: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The relay accepted the request; body fragments follow.
    Started { request_id: RequestId },
    /// Decoded text, in arrival order.
    Fragment { request_id: RequestId, text: String },
    Finished {
        request_id: RequestId,
        result: Result<(), FailureKind>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StreamError {
    pub kind: FailureKind,
    pub message: String,
}

impl StreamError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Protocol, message)
    }

    pub(crate) fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "request cancelled")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Prompt was empty after trimming; nothing was sent.
    InvalidInput,
    /// Non-success status, missing body, or an in-band error event.
    Upstream { status: Option<u16> },
    /// A complete line was not a well-formed event, or the bytes were not UTF-8.
    Protocol,
    Transport,
    Timeout,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidInput => write!(f, "invalid input"),
            FailureKind::Upstream { status: Some(code) } => write!(f, "upstream status {code}"),
            FailureKind::Upstream { status: None } => write!(f, "upstream error"),
            FailureKind::Protocol => write!(f, "protocol error"),
            FailureKind::Transport => write!(f, "transport error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
