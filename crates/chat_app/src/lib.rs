//! Streaming chat relay: an HTTP server that forwards prompts to a local
//! model server, and a terminal front end that reassembles the streamed reply.
pub mod platform;
pub mod server;
