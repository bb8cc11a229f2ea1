use crate::{FailureReason, RequestId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the prompt input.
    InputChanged(String),
    /// User pressed Enter (no modifier) or clicked Send.
    PromptSubmitted,
    /// User asked to stop the current reply.
    CancelRequested,
    /// The relay answered with a success status; the body is about to stream.
    ResponseStarted { request_id: RequestId },
    /// One decoded text fragment of the reply body, in arrival order.
    FragmentReceived { request_id: RequestId, text: String },
    /// The reply body ended cleanly.
    StreamCompleted { request_id: RequestId },
    /// The request failed before or while streaming.
    RequestFailed {
        request_id: RequestId,
        reason: FailureReason,
    },
    /// The request stopped because cancellation was observed.
    RequestCancelled { request_id: RequestId },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
