use serde::Deserialize;

use crate::{FailureKind, StreamError, UpstreamEvent, Usage};

#[derive(Debug, Deserialize)]
struct WireEvent {
    model: Option<String>,
    message: Option<WireMessage>,
    done: Option<bool>,
    done_reason: Option<String>,
    error: Option<String>,
    prompt_eval_count: Option<u64>,
    eval_count: Option<u64>,
    total_duration: Option<u64>,
    eval_duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    content: Option<String>,
}

/// Parses one line of the upstream stream.
///
/// Returns `Ok(None)` for blank lines. An object with none of `message`, `done`
/// or `error` is rejected, as is any known key with the wrong type. An `error`
/// key is the upstream reporting a failure in-band.
pub fn parse_event_line(line: &str) -> Result<Option<UpstreamEvent>, StreamError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let value: serde_json::Value = serde_json::from_str(line)
        .map_err(|err| StreamError::protocol(format!("invalid JSON line: {err}")))?;
    if !value.is_object() {
        return Err(StreamError::protocol("expected a JSON object per line"));
    }
    let wire: WireEvent = serde_json::from_value(value)
        .map_err(|err| StreamError::protocol(format!("unexpected event field: {err}")))?;

    if let Some(message) = wire.error {
        return Err(StreamError::new(
            FailureKind::Upstream { status: None },
            format!("upstream reported: {message}"),
        ));
    }
    if wire.message.is_none() && wire.done.is_none() {
        return Err(StreamError::protocol(
            "event has neither `message` nor `done`",
        ));
    }

    let usage = Usage {
        prompt_eval_count: wire.prompt_eval_count,
        eval_count: wire.eval_count,
        total_duration: wire.total_duration,
        eval_duration: wire.eval_duration,
    };
    let has_usage = usage != Usage::default();

    Ok(Some(UpstreamEvent {
        content_delta: wire
            .message
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty()),
        is_final: wire.done.unwrap_or(false),
        model: wire.model,
        done_reason: wire.done_reason,
        usage: has_usage.then_some(usage),
    }))
}
