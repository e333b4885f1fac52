//! In-memory organizer state and its transitions.
//!
//! Every user action is an [`Action`] applied by [`AppState::dispatch`]. The
//! transition is applied to local state immediately and returns the
//! [`Effect`]s a backend should execute. Nothing here performs I/O.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

mod drag;
mod effect;
pub mod layout;
mod view;

pub use drag::{CardButton, DragController, DragState, Point, PointerTarget};
pub use effect::{Collection, Effect, FailurePolicy};
pub use view::{organize, Column, ViewMode};

use crate::models::{Card, CardPatch, CardType, Tag};

/// Area in which new cards are placed: `[x_min, x_min + width)` by `[y_min, y_min + height)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnWindow {
    pub x_min: f64,
    pub y_min: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for SpawnWindow {
    fn default() -> Self {
        Self {
            x_min: 100.0,
            y_min: 100.0,
            width: 300.0,
            height: 200.0,
        }
    }
}

impl SpawnWindow {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        Point::new(
            self.x_min + rng.gen::<f64>() * self.width,
            self.y_min + rng.gen::<f64>() * self.height,
        )
    }

    #[cfg(test)]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x_min
            && p.x < self.x_min + self.width
            && p.y >= self.y_min
            && p.y < self.y_min + self.height
    }
}

/// Collections read from a backend at startup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub cards: Vec<Card>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Loaded(Snapshot),
    CreateCard(CardType),
    RenameCard { id: Uuid, title: String },
    SetContent { id: Uuid, content: String },
    /// Set a card's position; coordinates are clamped to non-negative
    MoveCard { id: Uuid, x: f64, y: f64 },
    SetActive { id: Uuid, active: bool },
    ToggleActive(Uuid),
    DeleteCard(Uuid),
    CreateTag(String),
    ToggleCardTag { card_id: Uuid, tag_id: Uuid },
    SetView(ViewMode),
    ToggleView,
    PointerDown {
        card_id: Uuid,
        target: PointerTarget,
        pointer: Point,
        card_origin: Point,
    },
    PointerMove { pointer: Point, canvas_origin: Point },
    PointerUp,
}

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub cards: Vec<Card>,
    pub tags: Vec<Tag>,
    pub view: ViewMode,
    pub drag: DragController,
    /// Owning user; `None` for the device-local variant
    pub owner: Option<Uuid>,
    pub spawn: SpawnWindow,
}

impl AppState {
    pub fn new(owner: Option<Uuid>, spawn: SpawnWindow) -> Self {
        Self {
            owner,
            spawn,
            ..Self::default()
        }
    }

    pub fn card(&self, id: Uuid) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    fn card_mut(&mut self, id: Uuid) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == id)
    }

    pub fn tag(&self, id: Uuid) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }

    /// Apply an action and return the effects to persist it.
    pub fn dispatch<R: Rng + ?Sized>(
        &mut self,
        action: Action,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Vec<Effect> {
        let effects = match action {
            Action::Loaded(snapshot) => {
                self.cards = snapshot.cards;
                self.tags = snapshot.tags;
                self.drag.reset();
                Vec::new()
            }
            Action::CreateCard(card_type) => self.create_card(card_type, rng, now),
            Action::RenameCard { id, title } => self.patch_card(id, CardPatch::Title(title), now),
            Action::SetContent { id, content } => {
                self.patch_card(id, CardPatch::Content(content), now)
            }
            Action::MoveCard { id, x, y } => {
                let p = Point::new(x, y).clamp_non_negative();
                self.patch_card(id, CardPatch::Position { x: p.x, y: p.y }, now)
            }
            Action::SetActive { id, active } => self.patch_card(id, CardPatch::Active(active), now),
            Action::ToggleActive(id) => match self.card(id) {
                Some(card) => {
                    let active = !card.is_active;
                    self.patch_card(id, CardPatch::Active(active), now)
                }
                None => Vec::new(),
            },
            Action::DeleteCard(id) => self.delete_card(id),
            Action::CreateTag(name) => self.create_tag(&name, rng),
            Action::ToggleCardTag { card_id, tag_id } => self.toggle_card_tag(card_id, tag_id),
            Action::SetView(view) => {
                self.set_view(view);
                Vec::new()
            }
            Action::ToggleView => {
                self.set_view(self.view.toggled());
                Vec::new()
            }
            Action::PointerDown {
                card_id,
                target,
                pointer,
                card_origin,
            } => {
                if self.view.allows_drag() && self.card(card_id).is_some() {
                    self.drag.pointer_down(card_id, target, pointer, card_origin);
                }
                Vec::new()
            }
            Action::PointerMove {
                pointer,
                canvas_origin,
            } => {
                if let Some((id, p)) = self.drag.pointer_move(pointer, canvas_origin) {
                    if let Some(card) = self.card_mut(id) {
                        card.x = p.x;
                        card.y = p.y;
                    }
                }
                Vec::new()
            }
            Action::PointerUp => match self.drag.pointer_up() {
                Some(id) => match self.card(id) {
                    Some(card) => {
                        let patch = CardPatch::Position {
                            x: card.x,
                            y: card.y,
                        };
                        self.patch_card(id, patch, now)
                    }
                    None => Vec::new(),
                },
                None => Vec::new(),
            },
        };

        if !effects.is_empty() {
            debug!(count = effects.len(), "dispatch queued effects");
        }
        effects
    }

    fn create_card<R: Rng + ?Sized>(
        &mut self,
        card_type: CardType,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Vec<Effect> {
        let position = self.spawn.sample(rng);
        let mut card = Card::new(card_type, position.x, position.y, now);
        card.user_id = self.owner;
        self.cards.insert(0, card.clone());
        vec![Effect::InsertCard(card)]
    }

    fn patch_card(&mut self, id: Uuid, patch: CardPatch, now: DateTime<Utc>) -> Vec<Effect> {
        match self.card_mut(id) {
            Some(card) => {
                card.apply(&patch, now);
                vec![Effect::UpdateCard {
                    id,
                    patch,
                    updated_at: now,
                }]
            }
            None => Vec::new(),
        }
    }

    fn delete_card(&mut self, id: Uuid) -> Vec<Effect> {
        let before = self.cards.len();
        self.cards.retain(|c| c.id != id);
        if self.cards.len() == before {
            return Vec::new();
        }
        if self.drag.dragging() == Some(id) {
            self.drag.reset();
        }
        vec![Effect::DeleteCard(id)]
    }

    fn create_tag<R: Rng + ?Sized>(&mut self, name: &str, rng: &mut R) -> Vec<Effect> {
        let Some(mut tag) = Tag::new(name, rng) else {
            return Vec::new();
        };
        tag.user_id = self.owner;
        self.tags.push(tag.clone());
        vec![Effect::InsertTag(tag)]
    }

    fn toggle_card_tag(&mut self, card_id: Uuid, tag_id: Uuid) -> Vec<Effect> {
        let tag = self.tag(tag_id).cloned();
        let Some(card) = self.card_mut(card_id) else {
            return Vec::new();
        };

        if card.has_tag(tag_id) {
            card.tags.retain(|t| t.id != tag_id);
            vec![Effect::UnlinkTag { card_id, tag_id }]
        } else {
            match tag {
                Some(tag) => {
                    card.tags.push(tag);
                    vec![Effect::LinkTag { card_id, tag_id }]
                }
                None => Vec::new(),
            }
        }
    }

    fn set_view(&mut self, view: ViewMode) {
        self.view = view;
        if !view.allows_drag() {
            self.drag.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    fn state_with_card(card_type: CardType) -> (AppState, Uuid) {
        let mut state = AppState::new(None, SpawnWindow::default());
        state.dispatch(Action::CreateCard(card_type), &mut rng(), Utc::now());
        let id = state.cards[0].id;
        (state, id)
    }

    #[test]
    fn test_create_card_defaults() {
        let mut rng = rng();
        let now = Utc::now();
        for &card_type in CardType::all() {
            let mut state = AppState::new(None, SpawnWindow::default());
            let effects = state.dispatch(Action::CreateCard(card_type), &mut rng, now);

            let card = &state.cards[0];
            assert_eq!(card.title, format!("Nuevo {}", card_type.label()));
            assert_eq!(card.content, "");
            assert_eq!(card.color, card_type.color());
            assert!(card.is_active);
            assert!(state.spawn.contains(Point::new(card.x, card.y)));
            assert_eq!(effects, vec![Effect::InsertCard(card.clone())]);
        }
    }

    #[test]
    fn test_new_cards_are_prepended_and_owned() {
        let owner = Uuid::new_v4();
        let mut state = AppState::new(Some(owner), SpawnWindow::default());
        let mut rng = rng();
        state.dispatch(Action::CreateCard(CardType::Note), &mut rng, Utc::now());
        state.dispatch(Action::CreateCard(CardType::Idea), &mut rng, Utc::now());
        assert_eq!(state.cards[0].card_type, CardType::Idea);
        assert_eq!(state.cards[1].card_type, CardType::Note);
        assert!(state.cards.iter().all(|c| c.user_id == Some(owner)));
    }

    #[test]
    fn test_rename_changes_only_title() {
        let (mut state, id) = state_with_card(CardType::Task);
        let before = state.cards[0].clone();
        let later = before.updated_at + chrono::Duration::seconds(3);

        let effects = state.dispatch(
            Action::RenameCard {
                id,
                title: "Ship it".into(),
            },
            &mut rng(),
            later,
        );

        let after = &state.cards[0];
        assert_eq!(after.title, "Ship it");
        assert_eq!(after.updated_at, later);
        assert_eq!(after.content, before.content);
        assert_eq!((after.x, after.y), (before.x, before.y));
        assert_eq!(after.color, before.color);
        assert_eq!(after.is_active, before.is_active);
        assert_eq!(after.created_at, before.created_at);
        assert_eq!(
            effects,
            vec![Effect::UpdateCard {
                id,
                patch: CardPatch::Title("Ship it".into()),
                updated_at: later
            }]
        );
    }

    #[test]
    fn test_toggle_active_is_self_inverse() {
        let (mut state, id) = state_with_card(CardType::Note);
        let original = state.cards[0].is_active;
        let mut rng = rng();

        let first = state.dispatch(Action::ToggleActive(id), &mut rng, Utc::now());
        assert_eq!(state.cards[0].is_active, !original);
        assert!(matches!(
            first[0],
            Effect::UpdateCard {
                patch: CardPatch::Active(false),
                ..
            }
        ));

        state.dispatch(Action::ToggleActive(id), &mut rng, Utc::now());
        assert_eq!(state.cards[0].is_active, original);
    }

    #[test]
    fn test_move_card_clamps() {
        let (mut state, id) = state_with_card(CardType::Note);
        state.dispatch(
            Action::MoveCard {
                id,
                x: -15.0,
                y: 42.0,
            },
            &mut rng(),
            Utc::now(),
        );
        assert_eq!((state.cards[0].x, state.cards[0].y), (0.0, 42.0));
    }

    #[test]
    fn test_toggle_tag_twice_restores_membership() {
        let (mut state, card_id) = state_with_card(CardType::Idea);
        let mut rng = rng();
        state.dispatch(Action::CreateTag("urgent".into()), &mut rng, Utc::now());
        let tag_id = state.tags[0].id;
        let original: Vec<Uuid> = state.cards[0].tags.iter().map(|t| t.id).collect();

        let added = state.dispatch(Action::ToggleCardTag { card_id, tag_id }, &mut rng, Utc::now());
        assert_eq!(added, vec![Effect::LinkTag { card_id, tag_id }]);
        assert!(state.cards[0].has_tag(tag_id));

        let removed = state.dispatch(Action::ToggleCardTag { card_id, tag_id }, &mut rng, Utc::now());
        assert_eq!(removed, vec![Effect::UnlinkTag { card_id, tag_id }]);
        let after: Vec<Uuid> = state.cards[0].tags.iter().map(|t| t.id).collect();
        assert_eq!(after, original);
    }

    #[test]
    fn test_toggle_unknown_tag_or_card_is_noop() {
        let (mut state, card_id) = state_with_card(CardType::Idea);
        let mut rng = rng();
        let effects = state.dispatch(
            Action::ToggleCardTag {
                card_id,
                tag_id: Uuid::new_v4(),
            },
            &mut rng,
            Utc::now(),
        );
        assert!(effects.is_empty());
        assert!(state.cards[0].tags.is_empty());

        state.dispatch(Action::CreateTag("x".into()), &mut rng, Utc::now());
        let tag_id = state.tags[0].id;
        let effects = state.dispatch(
            Action::ToggleCardTag {
                card_id: Uuid::new_v4(),
                tag_id,
            },
            &mut rng,
            Utc::now(),
        );
        assert!(effects.is_empty());
    }

    #[test]
    fn test_drag_sequence() {
        let (mut state, id) = state_with_card(CardType::Project);
        let mut rng = rng();
        state.dispatch(Action::MoveCard { id, x: 100.0, y: 100.0 }, &mut rng, Utc::now());
        let canvas_origin = Point::new(0.0, 90.0);
        let (cx, cy) = (state.cards[0].x, state.cards[0].y);
        let card_origin = Point::new(canvas_origin.x + cx, canvas_origin.y + cy);
        let press = Point::new(card_origin.x + 12.0, card_origin.y + 7.0);

        state.dispatch(
            Action::PointerDown {
                card_id: id,
                target: PointerTarget::CardBody,
                pointer: press,
                card_origin,
            },
            &mut rng,
            Utc::now(),
        );
        assert_eq!(state.drag.dragging(), Some(id));

        let effects = state.dispatch(
            Action::PointerMove {
                pointer: Point::new(500.0, 400.0),
                canvas_origin,
            },
            &mut rng,
            Utc::now(),
        );
        assert!(effects.is_empty());
        assert_eq!(state.cards[0].x, 500.0 - 12.0);
        assert_eq!(state.cards[0].y, 400.0 - 90.0 - 7.0);

        // Moving past the top-left edge clamps
        state.dispatch(
            Action::PointerMove {
                pointer: Point::new(3.0, 95.0),
                canvas_origin,
            },
            &mut rng,
            Utc::now(),
        );
        assert_eq!((state.cards[0].x, state.cards[0].y), (0.0, 0.0));

        state.dispatch(
            Action::PointerMove {
                pointer: Point::new(300.0, 290.0),
                canvas_origin,
            },
            &mut rng,
            Utc::now(),
        );
        let up = state.dispatch(Action::PointerUp, &mut rng, Utc::now());
        assert_eq!((state.cards[0].x, state.cards[0].y), (288.0, 193.0));
        assert!(matches!(
            up.as_slice(),
            [Effect::UpdateCard { patch: CardPatch::Position { x, y }, .. }] if *x == 288.0 && *y == 193.0
        ));
        assert_eq!(state.drag.state(), DragState::Idle);
    }

    #[test]
    fn test_press_on_controls_does_not_drag() {
        let (mut state, id) = state_with_card(CardType::Note);
        let before = (state.cards[0].x, state.cards[0].y);
        let mut rng = rng();
        state.dispatch(
            Action::PointerDown {
                card_id: id,
                target: PointerTarget::TextArea,
                pointer: Point::new(10.0, 10.0),
                card_origin: Point::ORIGIN,
            },
            &mut rng,
            Utc::now(),
        );
        state.dispatch(
            Action::PointerMove {
                pointer: Point::new(300.0, 300.0),
                canvas_origin: Point::ORIGIN,
            },
            &mut rng,
            Utc::now(),
        );
        let up = state.dispatch(Action::PointerUp, &mut rng, Utc::now());
        assert!(up.is_empty());
        assert_eq!((state.cards[0].x, state.cards[0].y), before);
    }

    #[test]
    fn test_organized_view_disables_drag() {
        let (mut state, id) = state_with_card(CardType::Note);
        let mut rng = rng();
        let effects = state.dispatch(Action::ToggleView, &mut rng, Utc::now());
        assert!(effects.is_empty());
        assert_eq!(state.view, ViewMode::Organized);

        state.dispatch(
            Action::PointerDown {
                card_id: id,
                target: PointerTarget::CardBody,
                pointer: Point::new(1.0, 1.0),
                card_origin: Point::ORIGIN,
            },
            &mut rng,
            Utc::now(),
        );
        assert_eq!(state.drag.state(), DragState::Idle);
    }

    #[test]
    fn test_delete_card_and_unknown_id() {
        let (mut state, id) = state_with_card(CardType::Note);
        let mut rng = rng();
        state.dispatch(Action::CreateTag("t".into()), &mut rng, Utc::now());
        let tag_id = state.tags[0].id;
        state.dispatch(Action::ToggleCardTag { card_id: id, tag_id }, &mut rng, Utc::now());

        let effects = state.dispatch(Action::DeleteCard(id), &mut rng, Utc::now());
        assert_eq!(effects, vec![Effect::DeleteCard(id)]);
        assert!(state.card(id).is_none());
        assert_eq!(state.tags.len(), 1);

        let effects = state.dispatch(Action::DeleteCard(id), &mut rng, Utc::now());
        assert!(effects.is_empty());
    }

    #[test]
    fn test_create_tag() {
        let mut state = AppState::new(None, SpawnWindow::default());
        let mut rng = rng();

        let effects = state.dispatch(Action::CreateTag("urgent".into()), &mut rng, Utc::now());
        assert_eq!(state.tags.len(), 1);
        let tag = &state.tags[0];
        assert_eq!(tag.name, "urgent");
        assert_eq!(tag.color.len(), 7);
        assert!(u32::from_str_radix(&tag.color[1..], 16).is_ok());
        assert_eq!(effects, vec![Effect::InsertTag(tag.clone())]);

        let effects = state.dispatch(Action::CreateTag("   ".into()), &mut rng, Utc::now());
        assert!(effects.is_empty());
        assert_eq!(state.tags.len(), 1);
    }

    #[test]
    fn test_updates_to_unknown_card_are_noops() {
        let mut state = AppState::new(None, SpawnWindow::default());
        let id = Uuid::new_v4();
        let mut rng = rng();
        for action in [
            Action::RenameCard { id, title: "x".into() },
            Action::SetContent { id, content: "x".into() },
            Action::MoveCard { id, x: 1.0, y: 1.0 },
            Action::SetActive { id, active: false },
            Action::ToggleActive(id),
        ] {
            assert!(state.dispatch(action, &mut rng, Utc::now()).is_empty());
        }
    }

    #[test]
    fn test_loaded_replaces_collections() {
        let (mut state, _) = state_with_card(CardType::Note);
        let snapshot = Snapshot {
            cards: Vec::new(),
            tags: Vec::new(),
        };
        let effects = state.dispatch(Action::Loaded(snapshot), &mut rng(), Utc::now());
        assert!(effects.is_empty());
        assert!(state.cards.is_empty());
    }
}
