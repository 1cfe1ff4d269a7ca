//! Message types for inter-layer communication.
//!
//! UI events flow from the terminal thread to the App actor; render state
//! flows back. Session state travels separately on the session's watch
//! channel.

pub mod ui_events;
pub mod render;

pub use ui_events::UiEvent;
pub use render::RenderState;
