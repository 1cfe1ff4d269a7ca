//! UI events - messages from UI layer to App layer

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Which screen is shown; derived from the session
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub enum Screen {
    #[default]
    Login,
    Profile,
}

/// Focused field of the login form
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub enum FormField {
    #[default]
    Username,
    Password,
}

impl FormField {
    pub fn next(&self) -> FormField {
        match self {
            FormField::Username => FormField::Password,
            FormField::Password => FormField::Username,
        }
    }

    pub fn prev(&self) -> FormField {
        // two fields, so cycling back is the same as forward
        self.next()
    }
}

/// Events generated from user input in the UI layer
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    // Login form
    NextField,
    PrevField,
    CharInput(char),
    Backspace,
    CursorLeft,
    CursorRight,
    Submit,

    // Profile
    Logout,
    RefreshProfile,

    // Popups
    ToggleHelp,
    CloseHelp,

    // System
    Quit,
}

/// Convert a key event to a UiEvent based on the current screen
pub fn key_to_ui_event(key: KeyEvent, screen: Screen, show_help: bool) -> Option<UiEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char('c') = key.code {
            return Some(UiEvent::Quit);
        }
        return None;
    }

    if show_help {
        return Some(UiEvent::CloseHelp);
    }

    match screen {
        Screen::Login => handle_login_keys(key),
        Screen::Profile => handle_profile_keys(key),
    }
}

/// Login form: every printable key is text input
fn handle_login_keys(key: KeyEvent) -> Option<UiEvent> {
    match key.code {
        KeyCode::Esc => Some(UiEvent::Quit),
        KeyCode::F(1) => Some(UiEvent::ToggleHelp),
        KeyCode::Tab | KeyCode::Down => Some(UiEvent::NextField),
        KeyCode::BackTab | KeyCode::Up => Some(UiEvent::PrevField),
        KeyCode::Enter => Some(UiEvent::Submit),
        KeyCode::Backspace => Some(UiEvent::Backspace),
        KeyCode::Left => Some(UiEvent::CursorLeft),
        KeyCode::Right => Some(UiEvent::CursorRight),
        KeyCode::Char(c) => Some(UiEvent::CharInput(c)),
        _ => None,
    }
}

fn handle_profile_keys(key: KeyEvent) -> Option<UiEvent> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(UiEvent::Quit),
        KeyCode::Char('?') | KeyCode::F(1) => Some(UiEvent::ToggleHelp),
        KeyCode::Char('l') => Some(UiEvent::Logout),
        KeyCode::Char('r') => Some(UiEvent::RefreshProfile),
        _ => None,
    }
}
