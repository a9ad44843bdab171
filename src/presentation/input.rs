use crate::application::{App, AppMode};
use crossterm::event::{KeyCode, KeyModifiers};

pub struct InputHandler;

impl InputHandler {
    pub fn handle_key_event(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        match app.mode {
            AppMode::Welcome => Self::handle_welcome_mode(app, key),
            AppMode::Dashboard => Self::handle_dashboard_mode(app, key),
            AppMode::Help => Self::handle_help_mode(app, key),
            AppMode::Login | AppMode::Register | AppMode::AddCard | AppMode::Utilities => {
                Self::handle_form_mode(app, key, modifiers)
            }
        }
    }

    fn handle_welcome_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Char('l') => app.open(AppMode::Login),
            KeyCode::Char('r') => app.open(AppMode::Register),
            KeyCode::F(1) | KeyCode::Char('?') => app.open(AppMode::Help),
            _ => {}
        }
    }

    fn handle_dashboard_mode(app: &mut App, key: KeyCode) {
        app.status_message = None;
        match key {
            KeyCode::Char('a') => app.open(AppMode::AddCard),
            KeyCode::Char('u') => app.open(AppMode::Utilities),
            KeyCode::Char('b') => app.toggle_card_block(),
            KeyCode::Char('e') => app.export_payments(),
            KeyCode::Char('o') => app.logout(),
            KeyCode::Right | KeyCode::Char('l') => app.select_card(true),
            KeyCode::Left | KeyCode::Char('h') => app.select_card(false),
            KeyCode::F(1) | KeyCode::Char('?') => app.open(AppMode::Help),
            _ => {}
        }
    }

    fn handle_form_mode(app: &mut App, key: KeyCode, modifiers: KeyModifiers) {
        match key {
            KeyCode::Tab | KeyCode::Down => app.focus_next(),
            KeyCode::BackTab | KeyCode::Up => app.focus_prev(),
            KeyCode::Left | KeyCode::Right => app.cycle_choice(),
            KeyCode::Enter => app.confirm(),
            KeyCode::Esc => app.back(),
            KeyCode::Backspace => app.backspace(),
            KeyCode::F(1) => app.open(AppMode::Help),
            KeyCode::Char(c) if !modifiers.contains(KeyModifiers::CONTROL) => app.input_char(c),
            _ => {}
        }
    }

    fn handle_help_mode(app: &mut App, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('?') | KeyCode::Char('q') => {
                app.back();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if app.help_scroll > 0 {
                    app.help_scroll -= 1;
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                app.help_scroll += 1;
            }
            KeyCode::PageUp => {
                app.help_scroll = app.help_scroll.saturating_sub(5);
            }
            KeyCode::PageDown => {
                app.help_scroll += 5;
            }
            KeyCode::Home => {
                app.help_scroll = 0;
            }
            _ => {}
        }
    }
}
