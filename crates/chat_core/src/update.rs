use crate::{AppState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages about a request other than the active one are dropped, so late
/// fragments from a cancelled or failed request never reach the transcript.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::InputChanged(text) => {
            state.set_input(text);
            Vec::new()
        }
        Msg::PromptSubmitted => {
            if state.is_busy() || state.input().trim().is_empty() {
                return (state, Vec::new());
            }
            let (request_id, prompt) = state.begin_exchange();
            vec![Effect::SendPrompt { request_id, prompt }]
        }
        Msg::CancelRequested => match state.active_request() {
            Some(request_id) if !state.cancel_requested() => {
                state.request_cancel();
                vec![Effect::CancelRequest { request_id }]
            }
            _ => Vec::new(),
        },
        Msg::ResponseStarted { request_id } => {
            if state.is_current(request_id) {
                state.mark_streaming();
            }
            Vec::new()
        }
        Msg::FragmentReceived { request_id, text } => {
            if state.is_current(request_id) {
                state.append_fragment(&text);
            }
            Vec::new()
        }
        Msg::StreamCompleted { request_id } => {
            if state.is_current(request_id) {
                state.complete();
            }
            Vec::new()
        }
        Msg::RequestFailed { request_id, reason } => {
            if state.is_current(request_id) {
                state.fail(reason);
            }
            Vec::new()
        }
        Msg::RequestCancelled { request_id } => {
            if state.is_current(request_id) {
                state.cancelled();
            }
            Vec::new()
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
