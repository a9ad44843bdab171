//! bankform - Terminal Online Banking Forms
//!
//! Registration, card applications and utility payments as multi-step
//! terminal forms backed by a simulated bank.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bankform::application::{App, AppMode};
use bankform::infrastructure::{config_path, AppConfig, FileSessionStore};
use bankform::presentation::{render_ui, InputHandler};

/// Sends logs to `path`; the terminal belongs to the UI.
fn init_logging(path: &Path) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

/// Entry point for the bankform terminal application.
///
/// Loads the config, restores the saved session and runs the event loop
/// until the user quits.
///
/// # Errors
///
/// Returns an error if the log or session file cannot be opened, or if
/// terminal setup fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // The log file comes from the config, so a bad config is only reported
    // once the subscriber is installed.
    let (config, config_error) = match AppConfig::from_env() {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };
    init_logging(&config.log_file)?;
    info!("bankform v{}", env!("CARGO_PKG_VERSION"));
    if let Some(e) = config_error {
        warn!(path = %config_path().display(), error = %e, "config unusable, using defaults");
    }

    let store = Arc::new(FileSessionStore::open(&config.session_file)?);
    let mut app = App::new(&config, store)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "terminal loop failed");
        println!("{err:?}");
    }

    info!("bankform stopped");
    Ok(())
}

/// Main application event loop.
///
/// Continues running until the user presses 'q' on the welcome screen or
/// the dashboard.
fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| render_ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                match key.code {
                    KeyCode::Char('q') if matches!(app.mode, AppMode::Welcome | AppMode::Dashboard) => {
                        return Ok(());
                    }
                    _ => InputHandler::handle_key_event(app, key.code, key.modifiers),
                }
            }
        }
    }
}
