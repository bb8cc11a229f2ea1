//! Terminal chat front end: logging setup, effect execution and rendering.
mod app;
mod effects;
pub mod logging;
mod ui;

pub use app::run_chat;
pub use effects::EffectRunner;
