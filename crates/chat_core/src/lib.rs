//! Chat core: the transcript reassembler as a pure state machine.
//!
//! Network IO lives elsewhere; this crate only folds messages describing what
//! happened on the wire into an append-only [`Transcript`].
mod effect;
mod msg;
mod state;
mod transcript;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{AppState, FailureReason, RequestId, SessionPhase, ERROR_NOTICE};
pub use transcript::{Message, MessageStatus, Role, Transcript, TranscriptError};
pub use update::update;
pub use view_model::{AppViewModel, MessageView};
