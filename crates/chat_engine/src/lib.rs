//! Chat engine: relay pipeline and client IO.
//!
//! The relay side turns an upstream NDJSON chat stream into plain reply text.
//! The client side posts prompts to the relay and reports decoded fragments.
mod client;
mod decode;
mod engine;
mod event;
mod lines;
mod relay;
mod types;
mod upstream;

pub use client::{ChannelEventSink, ChatClient, ClientSettings, EventSink, DEFAULT_RELAY_URL};
pub use decode::{DecodeError, Utf8StreamDecoder};
pub use engine::EngineHandle;
pub use event::parse_event_line;
pub use lines::LineSplitter;
pub use relay::{text_stream, Relay, TextStream};
pub use types::{EngineEvent, FailureKind, RequestId, StreamError, UpstreamEvent, Usage};
pub use upstream::{
    ChatTurn, OutboundChatRequest, ReqwestUpstream, Upstream, UpstreamBody, UpstreamSettings,
    DEFAULT_MODEL, DEFAULT_UPSTREAM_URL,
};
