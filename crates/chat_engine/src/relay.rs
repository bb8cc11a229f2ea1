use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chat_logging::{chat_debug, chat_info, chat_warn};
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::decode::Utf8StreamDecoder;
use crate::event::parse_event_line;
use crate::lines::LineSplitter;
use crate::upstream::{OutboundChatRequest, ReqwestUpstream, Upstream, UpstreamBody, UpstreamSettings};
use crate::{FailureKind, StreamError, UpstreamEvent};

/// Plain reply text as bytes: content deltas only, no framing.
///
/// Items are produced on demand, so a slow consumer holds back upstream reads.
/// The stream ends after its first error and never yields again.
pub type TextStream = BoxStream<'static, Result<Bytes, StreamError>>;

/// Turns a prompt into a stream of reply text from the upstream model server.
#[derive(Clone)]
pub struct Relay {
    upstream: Arc<dyn Upstream>,
    model: String,
    idle_timeout: Duration,
}

impl Relay {
    pub fn new(upstream: Arc<dyn Upstream>, settings: &UpstreamSettings) -> Self {
        Self {
            upstream,
            model: settings.model.clone(),
            idle_timeout: settings.idle_timeout,
        }
    }

    pub fn with_reqwest(settings: &UpstreamSettings) -> Result<Self, StreamError> {
        let upstream = ReqwestUpstream::new(settings)?;
        Ok(Self::new(Arc::new(upstream), settings))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Validates the prompt, opens the upstream stream and returns the text
    /// stream once the upstream answered with a success status.
    pub async fn start(
        &self,
        prompt: &str,
        cancel: CancellationToken,
    ) -> Result<TextStream, StreamError> {
        if prompt.trim().is_empty() {
            return Err(StreamError::new(
                FailureKind::InvalidInput,
                "prompt must not be empty",
            ));
        }

        chat_info!(
            "relay start model={} prompt_len={}",
            self.model,
            prompt.len()
        );
        let request = OutboundChatRequest::single_turn(&self.model, prompt);
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::cancelled()),
            opened = self.upstream.open(&request) => opened,
        };
        let body = body.inspect_err(|err| chat_warn!("upstream open failed: {err}"))?;

        Ok(text_stream(body, cancel, self.idle_timeout))
    }
}

/// Decodes an upstream NDJSON body into reply text.
///
/// Chunk boundaries may fall anywhere, including inside a JSON line or a
/// multi-byte character.
pub fn text_stream(
    body: UpstreamBody,
    cancel: CancellationToken,
    idle_timeout: Duration,
) -> TextStream {
    stream::try_unfold(
        RelayState::new(body, cancel, idle_timeout),
        |mut state| async move {
            loop {
                if state.cancel.is_cancelled() {
                    chat_debug!("relay cancelled after {} deltas", state.stats.deltas);
                    return Err(StreamError::cancelled());
                }
                if let Some(bytes) = state.pending.pop_front() {
                    return Ok(Some((bytes, state)));
                }
                // Raised only after every delta decoded before it went out.
                if let Some(err) = state.failed.take() {
                    return Err(err);
                }
                let Some(body) = state.body.as_mut() else {
                    return Ok(None);
                };

                let next = tokio::select! {
                    biased;
                    _ = state.cancel.cancelled() => continue,
                    next = tokio::time::timeout(state.idle_timeout, body.next()) => next,
                };
                match next {
                    Err(_) => {
                        return Err(StreamError::new(
                            FailureKind::Timeout,
                            format!("no upstream data for {:?}", state.idle_timeout),
                        ))
                    }
                    Ok(Some(Ok(chunk))) => state.ingest(&chunk),
                    Ok(Some(Err(err))) => {
                        chat_warn!("upstream read failed: {err}");
                        return Err(err);
                    }
                    Ok(None) => state.end_of_body(),
                }
            }
        },
    )
    .boxed()
}

#[derive(Debug, Default)]
struct RelayStats {
    events: u64,
    deltas: u64,
    bytes: u64,
}

struct RelayState {
    /// `None` once the stream reached a terminal point (final event, end of
    /// body or failure); dropping it releases the upstream connection.
    body: Option<UpstreamBody>,
    decoder: Utf8StreamDecoder,
    lines: LineSplitter,
    pending: VecDeque<Bytes>,
    /// Terminal error, held back until `pending` is drained.
    failed: Option<StreamError>,
    cancel: CancellationToken,
    idle_timeout: Duration,
    stats: RelayStats,
}

impl RelayState {
    fn new(body: UpstreamBody, cancel: CancellationToken, idle_timeout: Duration) -> Self {
        Self {
            body: Some(body),
            decoder: Utf8StreamDecoder::new(),
            lines: LineSplitter::new(),
            pending: VecDeque::new(),
            failed: None,
            cancel,
            idle_timeout,
            stats: RelayStats::default(),
        }
    }

    fn is_open(&self) -> bool {
        self.body.is_some()
    }

    fn fail(&mut self, err: StreamError) {
        if self.body.take().is_some() {
            chat_warn!("dropping relay stream: {err}");
            self.failed = Some(err);
        }
    }

    fn ingest(&mut self, chunk: &[u8]) {
        let mut text = String::new();
        let decoded = self.decoder.decode_into(chunk, &mut text);
        self.consume_lines(&text);
        if let Err(err) = decoded {
            self.fail(StreamError::protocol(err.to_string()));
        }
    }

    fn end_of_body(&mut self) {
        let mut tail = String::new();
        let flushed = self.decoder.finish_into(&mut tail);
        self.consume_lines(&tail);
        if let Err(err) = flushed {
            self.fail(StreamError::protocol(err.to_string()));
            return;
        }
        if let Some(rest) = self.lines.finish() {
            if self.is_open() {
                self.handle_line(&rest);
            }
        }
        if !self.is_open() {
            return;
        }

        if self.stats.events == 0 {
            self.fail(StreamError::new(
                FailureKind::Upstream { status: None },
                "upstream closed without sending any events",
            ));
            return;
        }
        chat_warn!(
            "upstream closed before final event after {} deltas",
            self.stats.deltas
        );
        self.body = None;
    }

    fn consume_lines(&mut self, text: &str) {
        for line in self.lines.push(text) {
            if !self.is_open() {
                break;
            }
            self.handle_line(&line);
        }
    }

    fn handle_line(&mut self, line: &str) {
        let event = match parse_event_line(line) {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(err) => return self.fail(err),
        };
        self.stats.events += 1;

        if let Some(delta) = &event.content_delta {
            self.stats.deltas += 1;
            self.stats.bytes += delta.len() as u64;
        }
        let is_final = event.is_final;
        let summary = is_final.then(|| summarize(&event, &self.stats));
        if let Some(delta) = event.content_delta {
            self.pending.push_back(Bytes::from(delta));
        }
        if let Some(summary) = summary {
            chat_info!("relay done {summary}");
            self.body = None;
        }
    }
}

fn summarize(event: &UpstreamEvent, stats: &RelayStats) -> String {
    let usage = event.usage.unwrap_or_default();
    format!(
        "model={} reason={} eval_count={:?} total_duration_ns={:?} deltas={} bytes={}",
        event.model.as_deref().unwrap_or("-"),
        event.done_reason.as_deref().unwrap_or("-"),
        usage.eval_count,
        usage.total_duration,
        stats.deltas,
        stats.bytes,
    )
}
