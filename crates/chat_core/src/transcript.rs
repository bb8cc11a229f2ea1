use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStatus {
    /// Still receiving appends. Only the trailing assistant message may be here.
    Streaming,
    Complete,
    /// Content was replaced by [`crate::ERROR_NOTICE`].
    Failed,
    /// Stopped by the user; keeps whatever arrived before the stop.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    role: Role,
    content: String,
    status: MessageStatus,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            status: MessageStatus::Complete,
        }
    }

    pub fn assistant_placeholder() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            status: MessageStatus::Streaming,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == MessageStatus::Streaming
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptError {
    /// The last message is missing, frozen, or not from the assistant.
    NoMessageInProgress,
    /// An assistant reply is already streaming.
    AlreadyInProgress,
}

impl fmt::Display for TranscriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptError::NoMessageInProgress => write!(f, "no message in progress"),
            TranscriptError::AlreadyInProgress => write!(f, "a message is already in progress"),
        }
    }
}

impl std::error::Error for TranscriptError {}

/// Ordered, append-only list of messages for one session.
///
/// Messages are shared behind `Arc`. A snapshot taken with [`Transcript::snapshot`]
/// keeps pointing at the values it saw: every write replaces the trailing
/// message copy-on-write, so holders of an older `Arc` never observe a partial
/// update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Arc<Message>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Arc<Message>] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last().map(Arc::as_ref)
    }

    /// Cheap copy of the current message handles.
    pub fn snapshot(&self) -> Vec<Arc<Message>> {
        self.messages.clone()
    }

    pub fn in_progress(&self) -> Option<&Message> {
        self.last().filter(|message| message.is_in_progress())
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> Result<(), TranscriptError> {
        if self.in_progress().is_some() {
            return Err(TranscriptError::AlreadyInProgress);
        }
        self.messages.push(Arc::new(Message::user(text)));
        Ok(())
    }

    pub fn open_assistant(&mut self) -> Result<(), TranscriptError> {
        if self.in_progress().is_some() {
            return Err(TranscriptError::AlreadyInProgress);
        }
        self.messages.push(Arc::new(Message::assistant_placeholder()));
        Ok(())
    }

    /// Appends `text` to the in-progress message.
    pub fn append_to_last(&mut self, text: &str) -> Result<(), TranscriptError> {
        let last = self.in_progress_slot()?;
        Arc::make_mut(last).content.push_str(text);
        Ok(())
    }

    /// Freezes the in-progress message with its current content.
    pub fn finish_last(&mut self, status: MessageStatus) -> Result<(), TranscriptError> {
        let last = self.in_progress_slot()?;
        Arc::make_mut(last).status = status;
        Ok(())
    }

    /// Freezes the in-progress message after substituting its content.
    pub fn replace_last(
        &mut self,
        content: impl Into<String>,
        status: MessageStatus,
    ) -> Result<(), TranscriptError> {
        let last = self.in_progress_slot()?;
        *last = Arc::new(Message {
            role: last.role,
            content: content.into(),
            status,
        });
        Ok(())
    }

    fn in_progress_slot(&mut self) -> Result<&mut Arc<Message>, TranscriptError> {
        self.messages
            .last_mut()
            .filter(|message| message.is_in_progress())
            .ok_or(TranscriptError::NoMessageInProgress)
    }
}
