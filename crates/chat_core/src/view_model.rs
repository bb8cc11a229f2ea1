use crate::{FailureReason, MessageStatus, Role, SessionPhase};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub phase: SessionPhase,
    /// Submission is disabled while true.
    pub busy: bool,
    pub input: String,
    pub messages: Vec<MessageView>,
    pub last_failure: Option<FailureReason>,
    pub dirty: bool,
}

impl AppViewModel {
    /// The trailing assistant message while it is still receiving text.
    pub fn in_progress(&self) -> Option<&MessageView> {
        self.messages
            .last()
            .filter(|message| message.status == MessageStatus::Streaming)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub role: Role,
    pub content: String,
    pub status: MessageStatus,
}
