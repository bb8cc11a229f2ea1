use crate::RequestId;

/// Side effects requested by [`crate::update`]; executed by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start streaming a reply for `prompt`.
    SendPrompt { request_id: RequestId, prompt: String },
    /// Stop the in-flight request at the next fragment boundary.
    CancelRequest { request_id: RequestId },
}
