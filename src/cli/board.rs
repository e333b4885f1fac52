//! Interactive terminal board.
//!
//! Cards are drawn at their canvas positions (or stacked per type in the
//! organized view). Mouse presses become pointer actions: dragging a card body
//! moves the card, clicking a field or button edits the card. Prompts run on
//! the normal screen with the board suspended.

use std::io::{self, Stdout, Write};

use anyhow::Result;
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{
        disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use tracing::debug;
use uuid::Uuid;

use super::tag::run_tag_manager;
use super::Workspace;
use super::ui::{confirm_skippable, editor_input, term_size, text_input, truncate, StatusBar};
use crate::app::App;
use crate::canvas::layout::{
    canvas_origin, canvas_placements, cell_to_point, hit_test, organized_placements, Hit,
    Placement, CARD_COLS, COLUMN_GAP, HEADER_ROWS,
};
use crate::canvas::{organize, Action, AppState, CardButton, PointerTarget, ViewMode};
use crate::models::{Card, CardType};
use crate::store::Notice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardExit {
    Quit,
    SignedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Create(CardType),
    ToggleView,
    TagManager,
    SignOut,
    Quit,
}

fn key_command(key: KeyEvent) -> Option<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Command::Quit);
    }
    match key.code {
        KeyCode::Char('n') => Some(Command::Create(CardType::Note)),
        KeyCode::Char('i') => Some(Command::Create(CardType::Idea)),
        KeyCode::Char('t') => Some(Command::Create(CardType::Task)),
        KeyCode::Char('p') => Some(Command::Create(CardType::Project)),
        KeyCode::Char('v') => Some(Command::ToggleView),
        KeyCode::Char('g') => Some(Command::TagManager),
        KeyCode::Char('o') => Some(Command::SignOut),
        KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
        _ => None,
    }
}

/// Follow-up a click on a card control asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickIntent {
    EditTitle(Uuid),
    EditContent(Uuid),
    ToggleActive(Uuid),
    ManageTags(Uuid),
    Delete(Uuid),
}

fn intent_for(hit: &Hit) -> Option<ClickIntent> {
    let id = hit.card_id;
    match hit.target {
        PointerTarget::CardBody => None,
        PointerTarget::TextInput => Some(ClickIntent::EditTitle(id)),
        PointerTarget::TextArea => Some(ClickIntent::EditContent(id)),
        PointerTarget::Button(CardButton::ToggleActive) => Some(ClickIntent::ToggleActive(id)),
        PointerTarget::Button(CardButton::Tags) => Some(ClickIntent::ManageTags(id)),
        PointerTarget::Button(CardButton::Delete) => Some(ClickIntent::Delete(id)),
    }
}

fn placements(state: &AppState) -> Vec<Placement> {
    match state.view {
        ViewMode::Canvas => canvas_placements(&state.cards),
        ViewMode::Organized => organized_placements(&organize(&state.cards)),
    }
}

/// Turn a left-button mouse event into pointer actions
fn handle_mouse(app: &mut App, mouse: MouseEvent) -> (Option<ClickIntent>, Vec<Notice>) {
    let pointer = cell_to_point(mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let Some(hit) = hit_test(&placements(app.state()), mouse.column, mouse.row) else {
                return (None, Vec::new());
            };
            let notices = app.dispatch(Action::PointerDown {
                card_id: hit.card_id,
                target: hit.target,
                pointer,
                card_origin: hit.card_origin,
            });
            (intent_for(&hit), notices)
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            let notices = app.dispatch(Action::PointerMove {
                pointer,
                canvas_origin: canvas_origin(),
            });
            (None, notices)
        }
        MouseEventKind::Up(MouseButton::Left) => (None, app.dispatch(Action::PointerUp)),
        _ => (None, Vec::new()),
    }
}

/// Raw mode, alternate screen and mouse capture for as long as it lives
struct TerminalSession {
    out: Stdout,
}

impl TerminalSession {
    fn enter() -> Result<Self> {
        let mut out = io::stdout();
        enable_raw_mode()?;
        execute!(out, EnterAlternateScreen, EnableMouseCapture, cursor::Hide)?;
        Ok(Self { out })
    }

    fn leave(&mut self) -> io::Result<()> {
        execute!(self.out, DisableMouseCapture, LeaveAlternateScreen, cursor::Show)?;
        disable_raw_mode()
    }

    /// Run `f` on the normal screen, then return to the board
    fn suspended<T>(&mut self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.leave()?;
        let result = f();
        enable_raw_mode()?;
        execute!(self.out, EnterAlternateScreen, EnableMouseCapture, cursor::Hide)?;
        result
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

/// Only an explicit yes deletes. A declined or skipped prompt keeps the card.
fn delete_if_confirmed(app: &mut App, id: Uuid, answer: Option<bool>) -> Vec<Notice> {
    match answer {
        Some(true) => app.dispatch(Action::DeleteCard(id)),
        Some(false) | None => {
            debug!(card = %id, "delete cancelled");
            Vec::new()
        }
    }
}

fn perform(app: &mut App, intent: ClickIntent, term: &mut TerminalSession) -> Result<Vec<Notice>> {
    let notices = match intent {
        ClickIntent::EditTitle(id) => {
            let current = app.state().card(id).map(|c| c.title.clone()).unwrap_or_default();
            match term.suspended(|| text_input("title:", Some(&current)))? {
                Some(title) => app.dispatch(Action::RenameCard { id, title }),
                None => Vec::new(),
            }
        }
        ClickIntent::EditContent(id) => {
            let current = app.state().card(id).map(|c| c.content.clone()).unwrap_or_default();
            match term.suspended(|| editor_input("content:", &current))? {
                Some(content) => app.dispatch(Action::SetContent { id, content }),
                None => Vec::new(),
            }
        }
        ClickIntent::ToggleActive(id) => app.dispatch(Action::ToggleActive(id)),
        ClickIntent::ManageTags(id) => term.suspended(|| run_tag_manager(app, Some(id)))?,
        ClickIntent::Delete(id) => {
            let answer = term.suspended(|| confirm_skippable("Delete this card?"))?;
            delete_if_confirmed(app, id, answer)
        }
    };
    Ok(notices)
}

fn sign_out(workspace: &mut Workspace) -> Vec<Notice> {
    match workspace.sign_out() {
        Ok(true) => Vec::new(),
        Ok(false) => vec![Notice::new("Not signed in.")],
        Err(e) => vec![Notice::new(format!("Sign-out failed: {}", e))],
    }
}

/// Run the board until the user quits or the session ends
pub fn run_board(workspace: &mut Workspace) -> Result<BoardExit> {
    debug!(cards = workspace.app.state().cards.len(), "opening board");
    let mut term = TerminalSession::enter()?;
    let mut notice: Option<String> = None;

    loop {
        if workspace.take_signed_out() {
            return Ok(BoardExit::SignedOut);
        }
        let owner = workspace.owner_label();
        render(&mut term.out, workspace.app.state(), &owner, notice.as_deref())?;

        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let notices = match key_command(key) {
                    Some(Command::Quit) => return Ok(BoardExit::Quit),
                    Some(Command::SignOut) => sign_out(workspace),
                    Some(Command::Create(card_type)) => {
                        workspace.app.dispatch(Action::CreateCard(card_type))
                    }
                    Some(Command::ToggleView) => workspace.app.dispatch(Action::ToggleView),
                    Some(Command::TagManager) => {
                        term.suspended(|| run_tag_manager(&mut workspace.app, None))?
                    }
                    None => Vec::new(),
                };
                notice = notices.last().map(|n| n.message.clone());
            }
            Event::Mouse(mouse) => {
                let (intent, mut notices) = handle_mouse(&mut workspace.app, mouse);
                if let Some(intent) = intent {
                    notices.extend(perform(&mut workspace.app, intent, &mut term)?);
                }
                if let Some(last) = notices.last() {
                    notice = Some(last.message.clone());
                }
            }
            _ => {}
        }
    }
}

// ==================== RENDERING ====================

/// Text of a card, one string of `CARD_COLS` characters per row
fn card_lines(card: &Card) -> Vec<String> {
    let inner = CARD_COLS as usize - 2;
    let field = |s: &str, width: usize| format!("{:<width$}", truncate(s, width), width = width);

    let mut content = card.content.lines();
    let first = content.next().unwrap_or("");
    let second = content.next().unwrap_or("");
    let tags: Vec<String> = card.tags.iter().map(|t| format!("#{}", t.name)).collect();
    let active = if card.is_active { "[ Activo ]" } else { "[Inactivo]" };

    vec![
        format!("┌{}┐", "─".repeat(inner)),
        format!("│ ◆ {}│", field(&card.title, inner - 3)),
        format!("│ {}│", field(first, inner - 1)),
        format!("│ {}│", field(second, inner - 1)),
        format!("│ {}│", field(&tags.join(" "), inner - 1)),
        format!("│{} [#] [Eliminar] │", active),
        format!("└{}┘", "─".repeat(inner)),
    ]
}

fn hex_to_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let value = u32::from_str_radix(hex, 16).ok()?;
    Some(Color::Rgb {
        r: (value >> 16) as u8,
        g: (value >> 8) as u8,
        b: value as u8,
    })
}

/// Print `text` at a cell, clipped to the screen
fn put(out: &mut impl Write, col: u16, row: u16, text: &str, size: (u16, u16)) -> io::Result<()> {
    let (width, height) = size;
    if col >= width || row >= height {
        return Ok(());
    }
    let visible: String = text.chars().take((width - col) as usize).collect();
    queue!(out, cursor::MoveTo(col, row), Print(visible))
}

fn draw_card(out: &mut impl Write, card: &Card, p: &Placement, size: (u16, u16)) -> io::Result<()> {
    let color = if card.is_active {
        hex_to_color(&card.color).unwrap_or(Color::Reset)
    } else {
        Color::DarkGrey
    };
    queue!(out, SetForegroundColor(color))?;
    for (i, line) in card_lines(card).iter().enumerate() {
        put(out, p.col, p.row.saturating_add(i as u16), line, size)?;
    }
    queue!(out, ResetColor)
}

fn render(out: &mut impl Write, state: &AppState, owner: &str, notice: Option<&str>) -> Result<()> {
    let size = term_size();
    queue!(out, Clear(ClearType::All))?;

    let title = format!(
        "IdeaCanvas  {}  {} ({} cards, {} tags)",
        owner,
        state.view.as_str(),
        state.cards.len(),
        state.tags.len()
    );
    put(out, 0, 0, &title, size)?;
    let hints = StatusBar::new()
        .action("n", "ota")
        .action("i", "dea")
        .action("t", "area")
        .action("p", "royecto")
        .separator()
        .action("v", "iew")
        .action("g", " tags")
        .action("o", " sign out")
        .action("q", "uit")
        .render();
    put(out, 0, 1, &hints, size)?;
    if let Some(message) = notice {
        queue!(out, SetForegroundColor(Color::Red))?;
        put(out, 0, HEADER_ROWS - 1, message, size)?;
        queue!(out, ResetColor)?;
    }

    if state.view == ViewMode::Organized {
        for (i, column) in organize(&state.cards).iter().enumerate() {
            let heading = format!("{} ({})", column.heading(), column.cards.len());
            put(out, i as u16 * (CARD_COLS + COLUMN_GAP), HEADER_ROWS, &heading, size)?;
        }
    }

    for placement in placements(state) {
        if let Some(card) = state.card(placement.card_id) {
            draw_card(out, card, &placement, size)?;
        }
    }

    out.flush()?;
    Ok(())
}
