use std::sync::Arc;

use chat_core::{Effect, FailureReason, Msg};
use chat_engine::{ClientSettings, EngineEvent, EngineHandle, EventSink, FailureKind, StreamError};
use chat_logging::{chat_info, chat_warn};

/// Executes core effects on the engine and feeds engine events back as `Msg`.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new<F>(settings: ClientSettings, dispatch: F) -> Result<Self, StreamError>
    where
        F: Fn(Msg) + Send + Sync + 'static,
    {
        let sink: Arc<dyn EventSink> = Arc::new(MsgSink { dispatch });
        let engine = EngineHandle::new(settings, sink)?;
        Ok(Self { engine })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SendPrompt { request_id, prompt } => {
                    chat_info!(
                        "SendPrompt request_id={} prompt_len={}",
                        request_id,
                        prompt.len()
                    );
                    self.engine.send(request_id, prompt);
                }
                Effect::CancelRequest { request_id } => {
                    chat_info!("CancelRequest request_id={}", request_id);
                    self.engine.cancel(request_id);
                }
            }
        }
    }
}

struct MsgSink<F> {
    dispatch: F,
}

impl<F> EventSink for MsgSink<F>
where
    F: Fn(Msg) + Send + Sync,
{
    fn emit(&self, event: EngineEvent) {
        (self.dispatch)(map_event(event));
    }
}

fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Started { request_id } => Msg::ResponseStarted { request_id },
        EngineEvent::Fragment { request_id, text } => Msg::FragmentReceived { request_id, text },
        EngineEvent::Finished {
            request_id,
            result: Ok(()),
        } => Msg::StreamCompleted { request_id },
        EngineEvent::Finished {
            request_id,
            result: Err(FailureKind::Cancelled),
        } => Msg::RequestCancelled { request_id },
        EngineEvent::Finished {
            request_id,
            result: Err(kind),
        } => {
            chat_warn!("request {} failed: {}", request_id, kind);
            Msg::RequestFailed {
                request_id,
                reason: map_failure(&kind),
            }
        }
    }
}

fn map_failure(kind: &FailureKind) -> FailureReason {
    match kind {
        FailureKind::Upstream { status: Some(code) } => FailureReason::HttpStatus(*code),
        FailureKind::Transport => FailureReason::Transport,
        FailureKind::Timeout => FailureReason::Timeout,
        FailureKind::InvalidInput
        | FailureKind::Upstream { status: None }
        | FailureKind::Protocol
        | FailureKind::Cancelled => FailureReason::Protocol,
    }
}
