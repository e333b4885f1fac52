use anyhow::{anyhow, Result};

use super::ui::{confirm, editor_input, report, short_id, status, truncate};
use super::{resolve_card, CardCommand};
use crate::app::App;
use crate::canvas::Action;
use crate::models::{Card, CardType};

pub fn run_card(app: &mut App, command: CardCommand) -> Result<()> {
    match command {
        CardCommand::New(args) => {
            let card_type = CardType::from_name(&args.card_type).ok_or_else(|| {
                anyhow!(
                    "Unknown card type `{}`. Use note, idea, task or project.",
                    args.card_type
                )
            })?;
            run_card_new(app, card_type)
        }
        CardCommand::List => {
            run_card_list(app);
            Ok(())
        }
        CardCommand::Rename(args) => {
            let id = resolve_card(app.state(), &args.id)?;
            report(&app.dispatch(Action::RenameCard {
                id,
                title: args.title,
            }));
            status("Saved.");
            Ok(())
        }
        CardCommand::Write(args) => run_card_write(app, &args.id, args.content),
        CardCommand::Move(args) => {
            let id = resolve_card(app.state(), &args.id)?;
            report(&app.dispatch(Action::MoveCard {
                id,
                x: args.x,
                y: args.y,
            }));
            if let Some(card) = app.state().card(id) {
                status(&format!("Moved to ({:.0}, {:.0}).", card.x, card.y));
            }
            Ok(())
        }
        CardCommand::Toggle(args) => {
            let id = resolve_card(app.state(), &args.id)?;
            report(&app.dispatch(Action::ToggleActive(id)));
            if let Some(card) = app.state().card(id) {
                status(active_label(card));
            }
            Ok(())
        }
        CardCommand::Delete(args) => run_card_delete(app, &args.id, args.force),
    }
}

fn run_card_new(app: &mut App, card_type: CardType) -> Result<()> {
    let notices = app.dispatch(Action::CreateCard(card_type));
    report(&notices);
    if let Some(card) = app.state().cards.first() {
        println!("{}  {}", short_id(&card.id), card.title);
    }
    Ok(())
}

fn run_card_list(app: &App) {
    let cards = &app.state().cards;
    if cards.is_empty() {
        status("No cards.");
        return;
    }
    for card in cards {
        println!("{}", format_card_line(card));
    }
}

fn run_card_write(app: &mut App, identifier: &str, content: Option<String>) -> Result<()> {
    let id = resolve_card(app.state(), identifier)?;
    let content = match content {
        Some(content) => content,
        None => {
            let current = app
                .state()
                .card(id)
                .map(|c| c.content.clone())
                .unwrap_or_default();
            match editor_input("content:", &current)? {
                Some(content) => content,
                None => return Ok(()),
            }
        }
    };
    report(&app.dispatch(Action::SetContent { id, content }));
    status("Saved.");
    Ok(())
}

fn run_card_delete(app: &mut App, identifier: &str, force: bool) -> Result<()> {
    let id = resolve_card(app.state(), identifier)?;
    if let Some(card) = app.state().card(id) {
        println!("{}", format_card_line(card));
        println!();
    }

    if !force && !confirm("Delete this card?")? {
        status("Cancelled.");
        return Ok(());
    }

    report(&app.dispatch(Action::DeleteCard(id)));
    status("Deleted.");
    Ok(())
}

fn active_label(card: &Card) -> &'static str {
    if card.is_active {
        "Activo"
    } else {
        "Inactivo"
    }
}

/// One listing line: id, type, status, title, position and tags
pub fn format_card_line(card: &Card) -> String {
    let tags: Vec<&str> = card.tags.iter().map(|t| t.name.as_str()).collect();
    let mut line = format!(
        "{}  {:<8}  {:<8}  {:<30}  ({:.0}, {:.0})",
        short_id(&card.id),
        card.card_type.label(),
        active_label(card),
        truncate(&card.title, 30),
        card.x,
        card.y
    );
    if !tags.is_empty() {
        line.push_str("  #");
        line.push_str(&tags.join(" #"));
    }
    line
}
