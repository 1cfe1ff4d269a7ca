//! Form commands - state transitions triggered by UI events

use crate::app::state::AppState;
use crate::constants::MISSING_CREDENTIALS;
use crate::models::Credentials;

impl AppState {
    // ========================
    // Text editing
    // ========================

    pub fn enter_char(&mut self, c: char) {
        let cursor_pos = self.cursor_position;
        let input = self.current_input_mut();
        if cursor_pos <= input.len() {
            input.insert(cursor_pos, c);
            self.cursor_position = cursor_pos + c.len_utf8();
        }
        self.form_error = None;
    }

    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            let cursor_pos = self.cursor_position;
            let input = self.current_input_mut();
            let prev_pos = input[..cursor_pos]
                .char_indices()
                .last()
                .map(|(i, _)| i)
                .unwrap_or(0);
            input.remove(prev_pos);
            self.cursor_position = prev_pos;
        }
    }

    pub fn move_cursor_left(&mut self) {
        let cursor_pos = self.cursor_position;
        self.cursor_position = self.current_input()[..cursor_pos]
            .char_indices()
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0);
    }

    pub fn move_cursor_right(&mut self) {
        let cursor_pos = self.cursor_position;
        let input = self.current_input();
        if let Some(c) = input[cursor_pos..].chars().next() {
            self.cursor_position = cursor_pos + c.len_utf8();
        }
    }

    // ========================
    // Focus
    // ========================

    pub fn next_field(&mut self) {
        self.focused = self.focused.next();
        self.cursor_position = self.current_input().len();
    }

    pub fn prev_field(&mut self) {
        self.focused = self.focused.prev();
        self.cursor_position = self.current_input().len();
    }

    // ========================
    // Submit
    // ========================

    /// Credentials to submit, or `None` (with a form error) when a field is empty
    pub fn prepare_submit(&mut self) -> Option<Credentials> {
        let credentials = Credentials::new(self.username.clone(), self.password.clone());
        if credentials.is_complete() {
            self.form_error = None;
            Some(credentials)
        } else {
            self.form_error = Some(MISSING_CREDENTIALS.to_string());
            None
        }
    }

    /// Reset the password after a successful login or a logout
    pub fn clear_password(&mut self) {
        self.password.clear();
        self.focused = crate::messages::ui_events::FormField::Username;
        self.cursor_position = self.username.len();
    }

    // ========================
    // Popups
    // ========================

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn close_help(&mut self) {
        self.show_help = false;
    }
}
