//! App layer - form state and session driving
//!
//! The App actor owns the `Session`, receives UI events, runs session
//! operations and emits render state.

pub mod state;
pub mod actor;
pub mod commands;

pub use state::AppState;
pub use actor::AppActor;
