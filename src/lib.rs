//! # Portal Auth
//!
//! Client-side session management for the compliance portal API, with a
//! terminal login shell on top.
//!
//! ## Features
//! - Credential login (form-encoded) returning a bearer token
//! - Current-user profile fetch with the token attached
//! - Token persisted in `~/.portal-auth/access_token` across restarts
//! - Startup validation of a persisted token, implicit logout when it is rejected
//! - Snapshot channel for renderers (loading / error / user)
//!
//! ## Architecture
//! - Session layer - owns user, token, loading and error state
//! - Network layer - `AuthApi` seam, reqwest implementation
//! - App layer (actor) - form state, drives the session from UI events
//! - UI layer (Ratatui) - synchronous terminal rendering

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage;
pub mod network;
pub mod session;
pub mod messages;
pub mod app;
pub mod ui;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, StorageError};
pub use models::{Credentials, TokenResponse, User};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use network::{AuthApi, HttpAuthApi};
pub use session::{InvalidationPolicy, Session, SessionSnapshot};
pub use messages::{RenderState, UiEvent};
pub use app::{AppActor, AppState};
