use crate::application::{fields, App, AppMode, FieldKind, FieldSpec, RegistrationStep, StepController};
use crate::domain::{
    format_currency, format_phone_number, mask_card_number, Currency, PasswordStrength, StrengthLabel,
    UtilityProvider,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Gauge, Paragraph, Row, Table, Wrap},
    Frame,
};

pub fn render_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    match app.mode {
        AppMode::Welcome => render_welcome(f, chunks[1]),
        AppMode::Login => render_form(f, app, chunks[1], "Sign in"),
        AppMode::Register => render_registration(f, app, chunks[1]),
        AppMode::Dashboard => render_dashboard(f, app, chunks[1]),
        AppMode::AddCard => render_add_card(f, app, chunks[1]),
        AppMode::Utilities => render_utilities(f, app, chunks[1]),
        AppMode::Help => {}
    }
    render_status_bar(f, app, chunks[2]);

    if matches!(app.mode, AppMode::Help) {
        render_help_popup(f, app.help_scroll);
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let user = app
        .auth
        .user()
        .map(|user| user.full_name())
        .unwrap_or_else(|| "not signed in".to_string());
    let header = Paragraph::new(format!("bankform - Online Banking | {user}"))
        .style(Style::default().fg(Color::Cyan));
    f.render_widget(header, area);
}

fn render_welcome(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(Span::styled(
            "Welcome to bankform",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("l  Sign in"),
        Line::from("r  Create an account"),
        Line::from("?  Help"),
        Line::from("q  Quit"),
    ];
    let widget = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("Welcome"));
    f.render_widget(widget, area);
}

/// Display text of a field value; secrets are masked.
fn display_value(app: &App, controller: &StepController, field: &FieldSpec) -> String {
    let form = &controller.form;
    match field.kind {
        FieldKind::Secret => "*".repeat(form.text(field.name).chars().count()),
        FieldKind::Toggle => {
            let on = form.value(field.name).is_some_and(|value| value.as_bool());
            let mark = if on { "[x]" } else { "[ ]" };
            mark.to_string()
        }
        FieldKind::Choice => {
            let text = form.text(field.name);
            let label = match field.name {
                fields::CARD_ID => app
                    .auth
                    .cards()
                    .into_iter()
                    .find(|card| card.id == text)
                    .map(|card| format!("{} ({})", mask_card_number(&card.number, 4), card.currency.id()))
                    .unwrap_or(text),
                fields::PROVIDER => UtilityProvider::from_id(&text)
                    .map(|provider| format!("{} - {}", provider.name(), provider.description()))
                    .unwrap_or(text),
                _ => text.to_uppercase(),
            };
            format!("< {label} >")
        }
        FieldKind::Text => form.text(field.name),
    }
}

fn field_lines(app: &App, controller: &StepController, specs: &[FieldSpec]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (index, field) in specs.iter().enumerate() {
        let focused = index == app.focus;
        let label_style = if focused {
            Style::default().bg(Color::LightBlue).fg(Color::Black)
        } else {
            Style::default().fg(Color::Yellow)
        };
        let value = display_value(app, controller, field);
        let cursor = if focused && matches!(field.kind, FieldKind::Text | FieldKind::Secret) {
            "_"
        } else {
            ""
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:<28}", field.label), label_style),
            Span::raw(" "),
            Span::raw(format!("{value}{cursor}")),
        ]));
        if let Some(error) = controller.form.error(field.name) {
            lines.push(Line::from(Span::styled(
                format!("  {error}"),
                Style::default().fg(Color::Red),
            )));
        }
    }
    if let Some(error) = controller.submit_error() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }
    lines
}

fn render_form(f: &mut Frame, app: &App, area: Rect, title: &str) {
    let Some(controller) = app.controller() else {
        return;
    };
    let specs = app.visible_fields();
    let widget = Paragraph::new(field_lines(app, controller, &specs))
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

fn render_registration(f: &mut Frame, app: &App, area: Rect) {
    let controller = &app.registration.controller;
    let step = app.registration.current_step();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let progress = RegistrationStep::ALL
        .iter()
        .map(|s| {
            let style = if *s == step {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else if s.index() < step.index() {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            Span::styled(format!(" {}. {} ", s.index(), s.title()), style)
        })
        .collect::<Vec<_>>();
    let header = Paragraph::new(Line::from(progress)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Step {} of {}", controller.current(), controller.total())),
    );
    f.render_widget(header, chunks[0]);

    match step {
        RegistrationStep::Personal => render_personal_step(f, app, chunks[1]),
        RegistrationStep::Security => render_security_step(f, app, chunks[1]),
        RegistrationStep::Review => render_review_step(f, app, chunks[1]),
    }
}

fn render_personal_step(f: &mut Frame, app: &App, area: Rect) {
    render_form(f, app, area, RegistrationStep::Personal.title());
}

fn render_security_step(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);
    render_form(f, app, chunks[0], RegistrationStep::Security.title());
    render_strength_gauge(f, app.registration.password_strength(), chunks[1]);
}

fn render_strength_gauge(f: &mut Frame, strength: PasswordStrength, area: Rect) {
    let color = match strength.label() {
        StrengthLabel::Weak => Color::Red,
        StrengthLabel::Moderate => Color::Yellow,
        StrengthLabel::Strong => Color::Green,
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Password strength"))
        .gauge_style(Style::default().fg(color))
        .percent(u16::from(strength.score()))
        .label(strength.label().to_string());
    f.render_widget(gauge, area);
}

fn render_review_step(f: &mut Frame, app: &App, area: Rect) {
    let form = &app.registration.controller.form;
    let employed = form
        .value(fields::EMPLOYMENT)
        .is_some_and(|value| value.as_bool());
    let row = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{label:<12}"), Style::default().fg(Color::Yellow)),
            Span::raw(value),
        ])
    };
    let mut lines = vec![
        row("Name", format!("{} {}", form.text(fields::NAME), form.text(fields::SURNAME))),
        row("Email", form.text(fields::EMAIL)),
        row("Phone", format_phone_number(&form.text(fields::PHONE))),
        row("Employment", if employed { "Employed" } else { "Not employed" }.to_string()),
        Line::from(""),
        Line::from("Press Enter to create your account."),
    ];
    if let Some(error) = app.registration.controller.submit_error() {
        lines.push(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
    }
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(RegistrationStep::Review.title()),
    );
    f.render_widget(widget, area);
}

fn render_dashboard(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(6), Constraint::Min(0)])
        .split(area);

    if let Some(user) = app.auth.user() {
        let info = Paragraph::new(vec![
            Line::from(format!("{} | {}", user.email, format_phone_number(&user.phone))),
            Line::from(if user.employment { "Employed" } else { "Not employed" }),
        ])
        .block(Block::default().borders(Borders::ALL).title(user.full_name()));
        f.render_widget(info, chunks[0]);
    }

    let current = app.auth.current_card().map(|card| card.id);
    let header = Row::new(["", "Card", "Type", "System", "Balance", "Limit", "Status"])
        .style(Style::default().fg(Color::Yellow));
    let rows = app.auth.cards().into_iter().map(|card| {
        let selected = current.as_deref() == Some(card.id.as_str());
        let style = if selected {
            Style::default().bg(Color::Blue).fg(Color::White)
        } else {
            Style::default()
        };
        Row::new(vec![
            Cell::from(if selected { ">" } else { " " }),
            Cell::from(mask_card_number(&card.number, 4)),
            Cell::from(card.card_type.id().to_uppercase()),
            Cell::from(card.system.id().to_uppercase()),
            Cell::from(format_currency(card.balance, card.currency)),
            Cell::from(
                card.limit
                    .map(|limit| format_currency(limit, card.currency))
                    .unwrap_or_else(|| "-".to_string()),
            ),
            Cell::from(if card.is_blocked { "Blocked" } else { "Active" }),
        ])
        .style(style)
    });
    let widths = [
        Constraint::Length(1),
        Constraint::Length(22),
        Constraint::Length(8),
        Constraint::Length(11),
        Constraint::Length(16),
        Constraint::Length(16),
        Constraint::Length(7),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Cards"))
        .column_spacing(1);
    f.render_widget(table, chunks[1]);

    let payments = app.auth.payments();
    let rows = payments.iter().rev().map(|payment| {
        Row::new(vec![
            Cell::from(payment.paid_at.format("%d.%m.%Y %H:%M").to_string()),
            Cell::from(payment.provider.name()),
            Cell::from(payment.customer_code.clone()),
            Cell::from(format!("-{}", format_currency(payment.amount, Currency::Azn))),
        ])
    });
    let widths = [
        Constraint::Length(17),
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(16),
    ];
    let table = Table::new(rows, widths)
        .header(Row::new(["Date", "Provider", "Code", "Amount"]).style(Style::default().fg(Color::Yellow)))
        .block(Block::default().borders(Borders::ALL).title("Payments"))
        .column_spacing(1);
    f.render_widget(table, chunks[2]);
}

fn render_add_card(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(4)])
        .split(area);
    render_form(f, app, chunks[0], "New card");

    let flow = &app.card_flow;
    let mut lines = Vec::new();
    if let Some(error) = flow.controller.form.error(fields::ELIGIBILITY) {
        lines.push(Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red))));
    }
    match flow.decision() {
        Some(decision) => {
            lines.push(Line::from(Span::styled(
                decision.title(),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(decision.message()));
        }
        None if !flow.can_submit() => {
            lines.push(Line::from("Enter: check credit eligibility"));
        }
        None => {
            lines.push(Line::from("Enter: create card"));
        }
    }
    let widget = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Credit"));
    f.render_widget(widget, chunks[1]);
}

fn render_utilities(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)])
        .split(area);
    let provider = app.payment_flow.provider();
    render_form(
        f,
        app,
        chunks[0],
        &format!("Pay {} ({} digit code)", provider.name(), provider.code_length()),
    );

    let text = app
        .payment_flow
        .success_message()
        .unwrap_or("Enter: pay");
    let widget = Paragraph::new(text)
        .style(Style::default().fg(Color::Green))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(widget, chunks[1]);
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let hint = match app.mode {
        AppMode::Welcome => "l: sign in | r: register | ?: help | q: quit".to_string(),
        AppMode::Login | AppMode::AddCard | AppMode::Utilities => {
            "Tab/↑↓: move | Space: toggle/choose | Enter: submit | Esc: back".to_string()
        }
        AppMode::Register => "Tab/↑↓: move | Space: toggle | Enter: next | Esc: previous step".to_string(),
        AppMode::Dashboard => {
            "a: add card | u: pay bills | ←→: select card | e: export payments | o: sign out | ?: help | q: quit"
                .to_string()
        }
        AppMode::Help => "↑↓/jk: scroll | PgUp/PgDn: fast scroll | Home: top | Esc/q: close help".to_string(),
    };
    let text = app.status_message.clone().unwrap_or(hint);

    let input = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(match app.mode {
            AppMode::Welcome | AppMode::Dashboard => Style::default(),
            AppMode::Login | AppMode::Register => Style::default().fg(Color::Green),
            AppMode::AddCard => Style::default().fg(Color::Magenta),
            AppMode::Utilities => Style::default().fg(Color::Yellow),
            AppMode::Help => Style::default().fg(Color::Cyan),
        });
    f.render_widget(input, area);
}

fn render_help_popup(f: &mut Frame, scroll: usize) {
    let area = f.area();
    let popup_area = Rect {
        x: area.width / 10,
        y: area.height / 10,
        width: area.width * 4 / 5,
        height: area.height * 4 / 5,
    };

    f.render_widget(Clear, popup_area);

    let help_lines: Vec<&str> = HELP_TEXT.lines().collect();
    let visible_height = popup_area.height.saturating_sub(2) as usize;

    let start_line = scroll.min(help_lines.len().saturating_sub(visible_height));
    let end_line = (start_line + visible_height).min(help_lines.len());

    let visible_text = help_lines[start_line..end_line].join("\n");

    let help_widget = Paragraph::new(visible_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("bankform Help (Line {}/{})", start_line + 1, help_lines.len()))
                .style(Style::default().fg(Color::Cyan)),
        )
        .style(Style::default().fg(Color::White));

    f.render_widget(help_widget, popup_area);
}

const HELP_TEXT: &str = r#"BANKFORM KEY REFERENCE

=== FORMS ===
Tab / ↓         Next field (the field you leave is checked)
Shift+Tab / ↑   Previous field
Space / ←→      Toggle a checkbox or change a choice
Backspace       Delete the last character
Enter           Next step, check eligibility, or submit
Esc             Previous step, or leave the form

=== REGISTRATION ===
Step 1          Name, surname, email, phone (+994 XX XXX XX XX), employment
Step 2          Password and confirmation
                At least 8 characters with upper case, lower case and a digit
Step 3          Review and create the account

=== CARDS ===
Debit, credit and premium cards in AZN, USD, EUR, GBP, RUB or TRY
Credit cards need employment, a monthly income of at least 300 AZN
and a desired limit of at least 100 AZN. The limit is capped at three
times the monthly income. Check eligibility before creating the card.

=== UTILITIES ===
Azerqaz         Gas, 9 digit customer code
Azersu          Water, 9 digit customer code
Azerishiq       Electricity, 10 digit customer code
Amounts must be above 0 and at most 10000 AZN.

=== DASHBOARD ===
a               Add a card
u               Pay a utility bill
← →             Select the current card
b               Block or unblock the current card
e               Export payment history to CSV
o               Sign out
?  / F1         Show this help
q               Quit

=== HELP NAVIGATION ===
↑↓ or j/k       Scroll help text up/down one line
Page Up/Down    Scroll help text up/down 5 lines
Home            Jump to top of help text
Esc/F1/?/q      Close this help window"#;
