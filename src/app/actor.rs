//! App actor - message loop processing UI events against the session

use std::collections::VecDeque;
use std::future::Future;

use tokio::sync::mpsc;

use crate::app::state::AppState;
use crate::messages::ui_events::Screen;
use crate::messages::{RenderState, UiEvent};
use crate::network::AuthApi;
use crate::session::Session;
use crate::storage::TokenStore;

/// UI event source that keeps listening while a session request runs
struct Inbox {
    rx: mpsc::UnboundedReceiver<UiEvent>,
    /// Events that arrived during a request, handled once it completes
    backlog: VecDeque<UiEvent>,
    closed: bool,
}

impl Inbox {
    fn new(rx: mpsc::UnboundedReceiver<UiEvent>) -> Self {
        Inbox {
            rx,
            backlog: VecDeque::new(),
            closed: false,
        }
    }

    async fn next(&mut self) -> Option<UiEvent> {
        if let Some(event) = self.backlog.pop_front() {
            return Some(event);
        }
        if self.closed {
            return None;
        }
        let event = self.rx.recv().await;
        self.closed = event.is_none();
        event
    }

    /// Drive `op` to completion unless Quit arrives first (`None`).
    ///
    /// Dropping `op` on Quit cancels the request; the session releases
    /// its loading flag on drop.
    async fn until_quit<F: Future>(&mut self, op: F) -> Option<F::Output> {
        tokio::pin!(op);
        loop {
            tokio::select! {
                biased;

                out = &mut op => return Some(out),
                event = self.rx.recv(), if !self.closed => match event {
                    Some(UiEvent::Quit) => {
                        tracing::info!("Quit while a request was in flight, cancelling it");
                        return None;
                    }
                    Some(event) => self.backlog.push_back(event),
                    None => self.closed = true,
                },
            }
        }
    }
}

/// App actor: sole owner of the session
pub struct AppActor<A, S> {
    state: AppState,
    session: Session<A, S>,
    render_tx: mpsc::UnboundedSender<RenderState>,
}

impl<A: AuthApi, S: TokenStore> AppActor<A, S> {
    pub fn new(
        session: Session<A, S>,
        api_base_url: impl Into<String>,
        render_tx: mpsc::UnboundedSender<RenderState>,
    ) -> Self {
        AppActor {
            state: AppState::new(api_base_url),
            session,
            render_tx,
        }
    }

    /// Run the actor message loop until Quit or the UI hangs up
    pub async fn run(mut self, ui_rx: mpsc::UnboundedReceiver<UiEvent>) -> Session<A, S> {
        let mut inbox = Inbox::new(ui_rx);

        self.render();
        if inbox.until_quit(self.session.initialize()).await.is_none() {
            return self.session;
        }
        self.render();

        while let Some(event) = inbox.next().await {
            if self.handle_ui_event(event, &mut inbox).await {
                break;
            }
            self.render();
        }
        self.session
    }

    pub fn screen(&self) -> Screen {
        if self.session.is_authenticated() {
            Screen::Profile
        } else {
            Screen::Login
        }
    }

    /// Handle a UI event, returns true if quit was requested
    async fn handle_ui_event(&mut self, event: UiEvent, inbox: &mut Inbox) -> bool {
        match (self.screen(), event) {
            (_, UiEvent::Quit) => return true,
            (_, UiEvent::ToggleHelp) => self.state.toggle_help(),
            (_, UiEvent::CloseHelp) => self.state.close_help(),

            (Screen::Login, UiEvent::NextField) => self.state.next_field(),
            (Screen::Login, UiEvent::PrevField) => self.state.prev_field(),
            (Screen::Login, UiEvent::CharInput(c)) => self.state.enter_char(c),
            (Screen::Login, UiEvent::Backspace) => self.state.delete_char(),
            (Screen::Login, UiEvent::CursorLeft) => self.state.move_cursor_left(),
            (Screen::Login, UiEvent::CursorRight) => self.state.move_cursor_right(),
            (Screen::Login, UiEvent::Submit) => return self.submit(inbox).await,

            (Screen::Profile, UiEvent::Logout) => {
                self.session.logout();
                self.state.clear_password();
            }
            (Screen::Profile, UiEvent::RefreshProfile) => {
                return inbox.until_quit(self.session.fetch_profile()).await.is_none();
            }

            (screen, event) => {
                tracing::trace!(?screen, ?event, "Ignoring event");
            }
        }
        false
    }

    /// Submit the form; returns true if quit was requested meanwhile
    async fn submit(&mut self, inbox: &mut Inbox) -> bool {
        if self.session.is_loading() {
            return false;
        }
        let Some(credentials) = self.state.prepare_submit() else {
            return false;
        };
        // Show the cleared form error before the request goes out
        self.render();

        match inbox.until_quit(self.session.login(&credentials)).await {
            Some(true) if self.session.is_authenticated() => {
                self.state.clear_password();
                false
            }
            Some(_) => false,
            None => true,
        }
    }

    fn render(&self) {
        let _ = self.render_tx.send(self.state.to_render_state());
    }
}
