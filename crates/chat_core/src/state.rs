use crate::view_model::{AppViewModel, MessageView};
use crate::{MessageStatus, Transcript};

pub type RequestId = u64;

/// Fixed, non-technical text shown in place of a reply that failed.
pub const ERROR_NOTICE: &str = "A server error occurred. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    /// Request issued, no response head yet.
    Sending,
    /// Response body is being appended to the transcript.
    Streaming,
    /// The last request failed; a new prompt may be submitted.
    Failed,
}

impl SessionPhase {
    pub fn is_busy(self) -> bool {
        matches!(self, SessionPhase::Sending | SessionPhase::Streaming)
    }
}

/// Why a request ended without a complete reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    HttpStatus(u16),
    Transport,
    Protocol,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    input: String,
    phase: SessionPhase,
    transcript: Transcript,
    last_request_id: RequestId,
    active_request: Option<RequestId>,
    cancel_requested: bool,
    last_failure: Option<FailureReason>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            phase: self.phase,
            busy: self.is_busy(),
            input: self.input.clone(),
            messages: self
                .transcript
                .messages()
                .iter()
                .map(|message| MessageView {
                    role: message.role(),
                    content: message.content().to_string(),
                    status: message.status(),
                })
                .collect(),
            last_failure: self.last_failure,
            dirty: self.dirty,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn active_request(&self) -> Option<RequestId> {
        self.active_request
    }

    /// Returns whether anything visible changed since the last call, and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn is_current(&self, request_id: RequestId) -> bool {
        self.active_request == Some(request_id)
    }

    pub(crate) fn cancel_requested(&self) -> bool {
        self.cancel_requested
    }

    pub(crate) fn set_input(&mut self, text: String) {
        if self.input != text {
            self.input = text;
            self.dirty = true;
        }
    }

    /// Records the user turn and the empty reply slot, and allocates a request id.
    ///
    /// Callers must check `is_busy()` first.
    pub(crate) fn begin_exchange(&mut self) -> (RequestId, String) {
        let prompt = std::mem::take(&mut self.input);
        // The busy guard keeps these from failing: no reply is in progress here.
        let _ = self.transcript.push_user(prompt.clone());
        let _ = self.transcript.open_assistant();

        self.last_request_id += 1;
        self.active_request = Some(self.last_request_id);
        self.cancel_requested = false;
        self.last_failure = None;
        self.phase = SessionPhase::Sending;
        self.dirty = true;
        (self.last_request_id, prompt)
    }

    pub(crate) fn mark_streaming(&mut self) {
        if self.phase == SessionPhase::Sending {
            self.phase = SessionPhase::Streaming;
            self.dirty = true;
        }
    }

    pub(crate) fn append_fragment(&mut self, text: &str) -> bool {
        self.mark_streaming();
        if text.is_empty() {
            return false;
        }
        let appended = self.transcript.append_to_last(text).is_ok();
        self.dirty |= appended;
        appended
    }

    pub(crate) fn complete(&mut self) {
        let _ = self.transcript.finish_last(MessageStatus::Complete);
        self.end_request(SessionPhase::Idle);
    }

    pub(crate) fn fail(&mut self, reason: FailureReason) {
        let _ = self
            .transcript
            .replace_last(ERROR_NOTICE, MessageStatus::Failed);
        self.last_failure = Some(reason);
        self.end_request(SessionPhase::Failed);
    }

    pub(crate) fn request_cancel(&mut self) {
        self.cancel_requested = true;
    }

    pub(crate) fn cancelled(&mut self) {
        let _ = self.transcript.finish_last(MessageStatus::Cancelled);
        self.end_request(SessionPhase::Idle);
    }

    fn end_request(&mut self, phase: SessionPhase) {
        self.active_request = None;
        self.cancel_requested = false;
        self.phase = phase;
        self.dirty = true;
    }
}
