//! Portal Auth - terminal login shell
//!
//! Architecture:
//! - UI Layer (Ratatui) - synchronous terminal rendering
//! - App Layer - actor owning the session, processing UI events
//! - Session snapshots on a watch channel for loading/error/user display

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{prelude::*, widgets::*};
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

use portal_auth::constants::{APP_NAME, APP_VERSION, LOG_FILE_NAME};
use portal_auth::messages::ui_events::{key_to_ui_event, FormField, Screen};
use portal_auth::ui::{centered_rect, flag_span, format_timestamp, masked, render_input};
use portal_auth::{
    AppActor, Config, FileTokenStore, HttpAuthApi, RenderState, Session, SessionSnapshot, UiEvent,
};

/// Terminal cleanup guard
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging to file; the terminal belongs to the UI
    let file_appender = tracing_appender::rolling::never(".", LOG_FILE_NAME);
    let (non_blocking, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;
    tracing::info!(
        api = %config.api_base_url,
        config_dir = %config.config_dir.display(),
        policy = ?config.invalidation,
        "Starting {} {}", APP_NAME, APP_VERSION
    );

    let session = Session::new(
        HttpAuthApi::from_config(&config),
        FileTokenStore::new(config.token_path()),
        config.invalidation,
    );
    let session_rx = session.subscribe();

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let guard = TerminalGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (ui_tx, ui_rx) = mpsc::unbounded_channel::<UiEvent>();
    let (render_tx, mut render_rx) = mpsc::unbounded_channel::<RenderState>();

    let app_actor = AppActor::new(session, config.api_base_url.clone(), render_tx);
    let app_handle = tokio::spawn(app_actor.run(ui_rx));

    let ui_result = run_ui_loop(&mut terminal, ui_tx, &mut render_rx, session_rx).await;

    // Hand the terminal back before the actor winds down
    drop(guard);
    ui_result?;

    // The actor cancels an in-flight request on Quit, so this returns promptly
    if let Err(e) = app_handle.await {
        tracing::warn!(error = %e, "App actor ended abnormally");
    }
    tracing::info!("Exiting");
    Ok(())
}

/// Run the synchronous UI rendering loop
async fn run_ui_loop(
    terminal: &mut Terminal<impl Backend>,
    ui_tx: mpsc::UnboundedSender<UiEvent>,
    render_rx: &mut mpsc::UnboundedReceiver<RenderState>,
    session_rx: watch::Receiver<SessionSnapshot>,
) -> anyhow::Result<()> {
    let mut current_state = RenderState::default();

    loop {
        let session = session_rx.borrow().clone();
        let screen = if session.is_authenticated {
            Screen::Profile
        } else {
            Screen::Login
        };

        terminal.draw(|f| draw_ui(f, &current_state, &session, screen))?;

        // Poll for events with timeout
        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if let Some(event) = key_to_ui_event(key, screen, current_state.show_help) {
                    let quit = event == UiEvent::Quit;
                    let _ = ui_tx.send(event);
                    if quit {
                        break;
                    }
                }
            }
        }

        // Check for state updates (non-blocking)
        while let Ok(state) = render_rx.try_recv() {
            current_state = state;
        }
    }

    Ok(())
}

// ============================================================================
// UI Drawing Functions
// ============================================================================

fn draw_ui(f: &mut Frame, state: &RenderState, session: &SessionSnapshot, screen: Screen) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title bar
            Constraint::Min(0),    // Content
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    draw_title_bar(f, state, chunks[0]);

    match screen {
        Screen::Login => draw_login(f, state, session, chunks[1]),
        Screen::Profile => draw_profile(f, session, chunks[1]),
    }

    draw_status_bar(f, session, screen, chunks[2]);

    if state.show_help {
        draw_help_popup(f, area);
    }
}

fn draw_title_bar(f: &mut Frame, state: &RenderState, area: Rect) {
    let title = Line::from(vec![
        Span::styled(
            format!(" {} ", APP_NAME),
            Style::default().fg(Color::Black).bg(Color::Cyan).bold(),
        ),
        Span::raw(" "),
        Span::styled(state.api_base_url.clone(), Style::default().fg(Color::DarkGray)),
    ]);
    f.render_widget(Paragraph::new(title), area);
}

fn draw_login(f: &mut Frame, state: &RenderState, session: &SessionSnapshot, area: Rect) {
    let form_area = centered_rect(50, 60, area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Sign in ");
    let inner = block.inner(form_area);
    f.render_widget(block, form_area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Username
            Constraint::Length(3), // Password
            Constraint::Length(1), // Spacer
            Constraint::Length(2), // Message
            Constraint::Min(0),
        ])
        .split(inner);

    let username_focused = state.focused == FormField::Username;
    f.render_widget(
        render_input(state.username.as_str(), " Username ", username_focused),
        rows[0],
    );
    f.render_widget(
        render_input(masked(state.password_len), " Password ", !username_focused),
        rows[1],
    );

    if !session.loading && !state.show_help {
        let field = if username_focused { rows[0] } else { rows[1] };
        f.set_cursor_position((field.x + 1 + state.cursor_position as u16, field.y + 1));
    }

    let message = if session.loading {
        Line::styled("Signing in...", Style::default().fg(Color::Yellow))
    } else if let Some(err) = &state.form_error {
        Line::styled(err.clone(), Style::default().fg(Color::Red))
    } else if let Some(err) = &session.last_error {
        Line::styled(err.clone(), Style::default().fg(Color::Red))
    } else {
        Line::styled("Enter to sign in", Style::default().fg(Color::DarkGray))
    };
    f.render_widget(Paragraph::new(message).wrap(Wrap { trim: true }), rows[3]);
}

fn draw_profile(f: &mut Frame, session: &SessionSnapshot, area: Rect) {
    let Some(user) = &session.user else {
        return;
    };

    let label = |s: &'static str| {
        Span::styled(format!("{:<12}", s), Style::default().fg(Color::DarkGray))
    };
    let optional = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    let mut title = vec![Span::styled(
        user.display_name().to_string(),
        Style::default().fg(Color::Cyan).bold(),
    )];
    if session.is_admin {
        title.push(Span::raw(" "));
        title.push(Span::styled(
            " ADMIN ",
            Style::default().fg(Color::Black).bg(Color::Magenta).bold(),
        ));
    }

    let lines = vec![
        Line::from(title),
        Line::raw(""),
        Line::from(vec![label("Username"), Span::raw(user.username.clone())]),
        Line::from(vec![label("Email"), Span::raw(user.email.clone())]),
        Line::from(vec![label("User ID"), Span::raw(user.id.to_string())]),
        Line::from(vec![label("Company"), Span::raw(optional(&user.company))]),
        Line::from(vec![label("Position"), Span::raw(optional(&user.position))]),
        Line::from(vec![label("Country"), Span::raw(optional(&user.country))]),
        Line::from(vec![
            label("Member since"),
            Span::raw(format_timestamp(user.created_at.as_ref())),
        ]),
        Line::from(vec![
            label("Last login"),
            Span::raw(format_timestamp(user.last_login.as_ref())),
        ]),
        Line::raw(""),
        Line::from(vec![
            flag_span("active", user.is_active),
            Span::raw("  "),
            flag_span("verified", user.is_verified),
            Span::raw("  "),
            flag_span("superuser", user.is_superuser),
        ]),
    ];

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Profile "),
    );
    f.render_widget(panel, centered_rect(60, 70, area));
}

fn draw_status_bar(f: &mut Frame, session: &SessionSnapshot, screen: Screen, area: Rect) {
    let status = if session.loading {
        " Loading... "
    } else {
        match screen {
            Screen::Login => " Tab:next field | Enter:sign in | F1:help | Esc:quit ",
            Screen::Profile => " r:refresh | l:logout | ?:help | q:quit ",
        }
    };

    let bar = Paragraph::new(status).style(Style::default().fg(Color::DarkGray));
    f.render_widget(bar, area);
}

fn draw_help_popup(f: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);

    let help_text = r#"
 PORTAL AUTH - Keyboard Shortcuts

 SIGN IN
   Tab / Shift+Tab    Switch username / password
   ← / →              Move cursor
   Enter              Sign in
   Esc                Quit

 PROFILE
   r                  Reload profile from server
   l                  Log out (removes saved token)
   q / Esc            Quit

 GENERAL
   F1 / ?             Toggle this help
   Ctrl+C             Quit

 Press any key to close...
"#;

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));

    let help = Paragraph::new(help_text)
        .block(block)
        .style(Style::default().fg(Color::White));

    f.render_widget(Clear, popup_area);
    f.render_widget(help, popup_area);
}
