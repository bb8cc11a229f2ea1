use std::time::Duration;

use chat_logging::{chat_debug, chat_info, chat_trace};
use futures_util::StreamExt;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::decode::Utf8StreamDecoder;
use crate::upstream::map_reqwest_error;
use crate::{EngineEvent, FailureKind, RequestId, StreamError};

pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub relay_url: String,
    pub connect_timeout: Duration,
    /// Longest wait for the next body fragment.
    pub idle_timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(120),
        }
    }
}

impl ClientSettings {
    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.relay_url.trim_end_matches('/'))
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Serialize)]
struct PromptBody<'a> {
    prompt: &'a str,
}

/// Sends prompts to the relay and reports the reply as decoded fragments.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    chat_url: String,
    idle_timeout: Duration,
}

impl ChatClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, StreamError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| StreamError::new(FailureKind::Transport, err.to_string()))?;
        Ok(Self {
            client,
            chat_url: settings.chat_url(),
            idle_timeout: settings.idle_timeout,
        })
    }

    /// Streams one reply into `sink`.
    ///
    /// Emits `Started` once the relay answered with success, then one
    /// `Fragment` per non-empty decoded chunk. The terminal `Finished` event is
    /// left to the caller, which owns the request lifecycle.
    pub async fn send(
        &self,
        request_id: RequestId,
        prompt: &str,
        cancel: &CancellationToken,
        sink: &dyn EventSink,
    ) -> Result<(), StreamError> {
        let request = self.client.post(&self.chat_url).json(&PromptBody { prompt });
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(StreamError::cancelled()),
            sent = request.send() => sent.map_err(map_reqwest_error)?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::new(
                FailureKind::Upstream {
                    status: Some(status.as_u16()),
                },
                status.to_string(),
            ));
        }
        chat_info!("request {request_id} streaming from {}", self.chat_url);
        sink.emit(EngineEvent::Started { request_id });

        let mut decoder = Utf8StreamDecoder::new();
        let mut body = response.bytes_stream();
        let mut fragments = 0_u64;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(StreamError::cancelled()),
                next = tokio::time::timeout(self.idle_timeout, body.next()) => next,
            };
            let mut text = String::new();
            let (decoded, done) = match next {
                Err(_) => {
                    return Err(StreamError::new(
                        FailureKind::Timeout,
                        format!("no reply data for {:?}", self.idle_timeout),
                    ))
                }
                Ok(Some(chunk)) => {
                    let chunk = chunk.map_err(map_reqwest_error)?;
                    (decoder.decode_into(&chunk, &mut text), false)
                }
                Ok(None) => (decoder.finish_into(&mut text), true),
            };
            // Text before an invalid byte still reaches the sink.
            if !text.is_empty() {
                fragments += 1;
                chat_trace!("request {request_id} fragment {fragments} len={}", text.len());
                sink.emit(EngineEvent::Fragment { request_id, text });
            }
            decoded.map_err(|err| StreamError::protocol(err.to_string()))?;
            if done {
                break;
            }
        }

        chat_debug!("request {request_id} finished after {fragments} fragments");
        Ok(())
    }
}
