//! Render state - data structure sent from App layer to UI for rendering

use crate::messages::ui_events::FormField;

/// Form and popup state needed by the UI to render
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderState {
    // Login form
    pub username: String,
    /// Length in chars only; the password itself never leaves the App actor
    pub password_len: usize,
    pub focused: FormField,
    pub cursor_position: usize,
    /// Client-side form message (missing fields)
    pub form_error: Option<String>,

    // Popups
    pub show_help: bool,

    /// API server shown in the status bar
    pub api_base_url: String,
}
