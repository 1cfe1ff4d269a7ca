//! App state - pure data structure with no I/O logic

use crate::messages::ui_events::FormField;
use crate::messages::RenderState;

/// Login form and popup state - pure data, no I/O
#[derive(Debug, Default)]
pub struct AppState {
    pub username: String,
    pub password: String,
    pub focused: FormField,
    /// Byte offset into the focused field
    pub cursor_position: usize,
    pub form_error: Option<String>,
    pub show_help: bool,
    pub api_base_url: String,
}

impl AppState {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        AppState {
            api_base_url: api_base_url.into(),
            ..Default::default()
        }
    }

    pub fn current_input(&self) -> &str {
        match self.focused {
            FormField::Username => &self.username,
            FormField::Password => &self.password,
        }
    }

    pub fn current_input_mut(&mut self) -> &mut String {
        match self.focused {
            FormField::Username => &mut self.username,
            FormField::Password => &mut self.password,
        }
    }

    pub fn to_render_state(&self) -> RenderState {
        let input = self.current_input();
        let cursor = self.cursor_position.min(input.len());
        RenderState {
            username: self.username.clone(),
            password_len: self.password.chars().count(),
            focused: self.focused,
            cursor_position: input[..cursor].chars().count(),
            form_error: self.form_error.clone(),
            show_help: self.show_help,
            api_base_url: self.api_base_url.clone(),
        }
    }
}
