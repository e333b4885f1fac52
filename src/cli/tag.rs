use anyhow::Result;
use uuid::Uuid;

use super::ui::{report, select, short_id, status, text_input};
use super::{resolve_card, resolve_tag, TagCommand};
use crate::app::App;
use crate::canvas::{Action, AppState};
use crate::store::Notice;

pub fn run_tag(app: &mut App, command: TagCommand) -> Result<()> {
    match command {
        TagCommand::New(args) => {
            let before = app.state().tags.len();
            report(&app.dispatch(Action::CreateTag(args.name)));
            match app.state().tags.get(before) {
                Some(tag) => println!("{}  {}  {}", short_id(&tag.id), tag.color, tag.name),
                None => status("Tag name cannot be empty."),
            }
        }
        TagCommand::List => {
            let tags = &app.state().tags;
            if tags.is_empty() {
                status("No tags.");
            }
            for tag in tags {
                println!("{}  {}  {}", short_id(&tag.id), tag.color, tag.name);
            }
        }
        TagCommand::Toggle(args) => {
            let card_id = resolve_card(app.state(), &args.card)?;
            let tag_id = resolve_tag(app.state(), &args.tag)?;
            report(&app.dispatch(Action::ToggleCardTag { card_id, tag_id }));
            let attached = app
                .state()
                .card(card_id)
                .is_some_and(|c| c.has_tag(tag_id));
            status(if attached { "Tagged." } else { "Untagged." });
        }
    }
    Ok(())
}

const NEW_TAG: &str = "+ new tag";

/// Menu entries for the tag manager. With a card, each tag shows whether it
/// is attached.
pub fn tag_menu(state: &AppState, card_id: Option<Uuid>) -> Vec<String> {
    let card = card_id.and_then(|id| state.card(id));
    let mut options: Vec<String> = state
        .tags
        .iter()
        .map(|tag| match card {
            Some(card) if card.has_tag(tag.id) => format!("[x] {}", tag.name),
            Some(_) => format!("[ ] {}", tag.name),
            None => format!("{}  {}", tag.name, tag.color),
        })
        .collect();
    options.push(NEW_TAG.to_string());
    options
}

/// Interactive tag manager: create tags and, for a card, toggle them.
/// Runs until the prompt is skipped with Esc.
pub fn run_tag_manager(app: &mut App, card_id: Option<Uuid>) -> Result<Vec<Notice>> {
    let mut notices = Vec::new();
    loop {
        let prompt = match card_id.and_then(|id| app.state().card(id)) {
            Some(card) => format!("tags for {}:", card.title),
            None => "tags:".to_string(),
        };
        let options = tag_menu(app.state(), card_id);
        let Some(index) = select(&prompt, &options)? else {
            break;
        };

        if index == app.state().tags.len() {
            if let Some(name) = text_input("tag name:", None)? {
                notices.extend(app.dispatch(Action::CreateTag(name)));
            }
            continue;
        }

        if let (Some(card_id), Some(tag)) = (card_id, app.state().tags.get(index)) {
            let tag_id = tag.id;
            notices.extend(app.dispatch(Action::ToggleCardTag { card_id, tag_id }));
        }
    }
    Ok(notices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::SpawnWindow;
    use crate::models::CardType;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_tag_menu_marks_attached_tags() {
        let mut state = AppState::new(None, SpawnWindow::default());
        let mut rng = StdRng::seed_from_u64(4);
        state.dispatch(Action::CreateCard(CardType::Idea), &mut rng, Utc::now());
        state.dispatch(Action::CreateTag("home".into()), &mut rng, Utc::now());
        state.dispatch(Action::CreateTag("work".into()), &mut rng, Utc::now());
        let card_id = state.cards[0].id;
        let tag_id = state.tags[1].id;
        state.dispatch(Action::ToggleCardTag { card_id, tag_id }, &mut rng, Utc::now());

        assert_eq!(
            tag_menu(&state, Some(card_id)),
            vec!["[ ] home", "[x] work", NEW_TAG]
        );

        let plain = tag_menu(&state, None);
        assert_eq!(plain.len(), 3);
        assert!(plain[0].starts_with("home  #"));
    }
}
