use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::Serialize;

use crate::{FailureKind, StreamError};

pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "hf.co/unsloth/Qwen3-4B-Instruct-2507-GGUF:Q4_K_M";

/// Raw upstream body, chunked however the network delivered it.
pub type UpstreamBody = BoxStream<'static, Result<Bytes, StreamError>>;

#[derive(Debug, Clone)]
pub struct UpstreamSettings {
    pub base_url: String,
    pub model: String,
    pub connect_timeout: Duration,
    /// Longest wait for the next body chunk before the stream fails.
    pub idle_timeout: Duration,
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UPSTREAM_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(120),
        }
    }
}

impl UpstreamSettings {
    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub role: &'static str,
    pub content: String,
}

/// Body of the outbound `/api/chat` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundChatRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    pub stream: bool,
}

impl OutboundChatRequest {
    pub fn single_turn(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatTurn {
                role: "user",
                content: prompt.into(),
            }],
            stream: true,
        }
    }
}

#[async_trait::async_trait]
pub trait Upstream: Send + Sync {
    /// Sends the request and returns the body once a success status arrived.
    async fn open(&self, request: &OutboundChatRequest) -> Result<UpstreamBody, StreamError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestUpstream {
    client: reqwest::Client,
    chat_url: String,
}

impl ReqwestUpstream {
    pub fn new(settings: &UpstreamSettings) -> Result<Self, StreamError> {
        // No overall timeout: a long generation is still healthy as long as
        // chunks keep arriving, which the relay's idle timeout checks.
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| StreamError::new(FailureKind::Transport, err.to_string()))?;
        Ok(Self {
            client,
            chat_url: settings.chat_url(),
        })
    }
}

#[async_trait::async_trait]
impl Upstream for ReqwestUpstream {
    async fn open(&self, request: &OutboundChatRequest) -> Result<UpstreamBody, StreamError> {
        let response = self
            .client
            .post(&self.chat_url)
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::new(
                FailureKind::Upstream {
                    status: Some(status.as_u16()),
                },
                status.to_string(),
            ));
        }
        if response.content_length() == Some(0) {
            return Err(StreamError::new(
                FailureKind::Upstream { status: None },
                "upstream response has no body",
            ));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(map_reqwest_error))
            .boxed())
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> StreamError {
    if err.is_timeout() {
        return StreamError::new(FailureKind::Timeout, err.to_string());
    }
    StreamError::new(FailureKind::Transport, err.to_string())
}
