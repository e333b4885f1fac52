use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::{report_failure, Notice, Persistence};
use crate::canvas::{AppState, Collection, Effect, Snapshot};
use crate::error::Result;
use crate::models::{Card, Tag};

pub const CARDS_SLOT: &str = "ideacanvas.cards";
pub const TAGS_SLOT: &str = "ideacanvas.tags";

/// String-keyed slots on disk, one file per key
#[derive(Debug, Clone)]
pub struct SlotStore {
    dir: PathBuf,
}

impl SlotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), value)?;
        Ok(())
    }

    /// Rename a slot's file to `<key>.<timestamp>.bad` so the next write
    /// starts fresh while the old contents stay on disk.
    pub fn set_aside(&self, key: &str) -> Result<PathBuf> {
        let target = self.dir.join(format!(
            "{}.{}.bad",
            key,
            Utc::now().format("%Y%m%dT%H%M%S%.3f")
        ));
        fs::rename(self.path(key), &target)?;
        Ok(target)
    }
}

/// Device-local backend: whole collections rewritten after each change
#[derive(Debug, Clone)]
pub struct LocalStore {
    slots: SlotStore,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            slots: SlotStore::new(dir),
        }
    }

    pub fn slots(&self) -> &SlotStore {
        &self.slots
    }

    fn read_slot<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        let Some(raw) = self.slots.get(key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                // Fails the load if the file cannot be moved, so it is never overwritten
                let kept = self.slots.set_aside(key)?;
                warn!(slot = key, error = %e, kept = %kept.display(), "unreadable slot set aside");
                Ok(Vec::new())
            }
        }
    }

    /// Write a collection unless it is empty. An empty collection would erase
    /// whatever the slot held before, so it is skipped.
    fn write_slot<T: Serialize>(&self, key: &str, items: &[T]) -> Result<bool> {
        if items.is_empty() {
            debug!(slot = key, "skipping write of empty collection");
            return Ok(false);
        }
        let json = serde_json::to_string(items)?;
        self.slots.set(key, &json)?;
        Ok(true)
    }

    pub fn save_cards(&self, cards: &[Card]) -> Result<bool> {
        self.write_slot(CARDS_SLOT, cards)
    }

    pub fn save_tags(&self, tags: &[Tag]) -> Result<bool> {
        self.write_slot(TAGS_SLOT, tags)
    }
}

impl Persistence for LocalStore {
    fn load(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            cards: self.read_slot(CARDS_SLOT)?,
            tags: self.read_slot(TAGS_SLOT)?,
        })
    }

    fn persist(&mut self, effects: &[Effect], state: &AppState) -> Vec<Notice> {
        let mut notices = Vec::new();

        for collection in [Collection::Cards, Collection::Tags] {
            let touched: Vec<&Effect> = effects
                .iter()
                .filter(|e| e.collection() == collection)
                .collect();
            if touched.is_empty() {
                continue;
            }

            let result = match collection {
                Collection::Cards => self.save_cards(&state.cards),
                Collection::Tags => self.save_tags(&state.tags),
            };
            if let Err(e) = result {
                let reason = e.to_string();
                for effect in touched {
                    report_failure(effect, &reason, &mut notices);
                }
            }
        }

        notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{Action, SpawnWindow};
    use crate::models::CardType;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn apply(store: &mut LocalStore, state: &mut AppState, action: Action, rng: &mut StdRng) -> Vec<Notice> {
        let effects = state.dispatch(action, rng, Utc::now());
        store.persist(&effects, state)
    }

    #[test]
    fn test_missing_slots_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("never-created"));
        let snapshot = store.load().unwrap();
        assert!(snapshot.cards.is_empty());
        assert!(snapshot.tags.is_empty());
    }

    #[test]
    fn test_changes_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::new(dir.path());
        let mut state = AppState::new(None, SpawnWindow::default());
        let mut rng = StdRng::seed_from_u64(21);

        apply(&mut store, &mut state, Action::CreateCard(CardType::Idea), &mut rng);
        let id = state.cards[0].id;
        apply(&mut store, &mut state, Action::RenameCard { id, title: "Garden".into() }, &mut rng);
        apply(&mut store, &mut state, Action::CreateTag("home".into()), &mut rng);
        let tag_id = state.tags[0].id;
        apply(&mut store, &mut state, Action::ToggleCardTag { card_id: id, tag_id }, &mut rng);

        let reloaded = LocalStore::new(dir.path()).load().unwrap();
        assert_eq!(reloaded.cards, state.cards);
        assert_eq!(reloaded.tags, state.tags);
        assert_eq!(reloaded.cards[0].tags[0].name, "home");
    }

    #[test]
    fn test_deleting_last_card_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::new(dir.path());
        let mut state = AppState::new(None, SpawnWindow::default());
        let mut rng = StdRng::seed_from_u64(22);

        apply(&mut store, &mut state, Action::CreateCard(CardType::Note), &mut rng);
        let id = state.cards[0].id;
        apply(&mut store, &mut state, Action::DeleteCard(id), &mut rng);
        assert!(state.cards.is_empty());

        // The slot still holds the card from before the delete
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.cards.len(), 1);
        assert_eq!(reloaded.cards[0].id, id);
    }

    #[test]
    fn test_view_toggle_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::new(dir.path());
        let mut state = AppState::new(None, SpawnWindow::default());
        let mut rng = StdRng::seed_from_u64(23);

        apply(&mut store, &mut state, Action::ToggleView, &mut rng);
        assert!(store.slots().get(CARDS_SLOT).unwrap().is_none());
        assert!(store.slots().get(TAGS_SLOT).unwrap().is_none());
    }

    fn set_aside_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.extension().map_or(false, |ext| ext == "bad"))
            .collect()
    }

    #[test]
    fn test_corrupt_slot_is_set_aside_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::new(dir.path());
        store.slots().set(CARDS_SLOT, "{not json").unwrap();

        let snapshot = store.load().unwrap();
        assert!(snapshot.cards.is_empty());

        let mut state = AppState::new(None, SpawnWindow::default());
        let mut rng = StdRng::seed_from_u64(24);
        state.dispatch(Action::Loaded(snapshot), &mut rng, Utc::now());
        apply(&mut store, &mut state, Action::CreateCard(CardType::Note), &mut rng);

        let kept = set_aside_files(dir.path());
        assert_eq!(kept.len(), 1);
        assert_eq!(fs::read_to_string(&kept[0]).unwrap(), "{not json");
        assert_eq!(store.load().unwrap().cards.len(), 1);
    }

    #[test]
    fn test_unknown_card_type_keeps_every_stored_card() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalStore::new(dir.path());
        let now = Utc::now();
        let mut memo = serde_json::to_value(Card::new(CardType::Idea, 0.0, 0.0, now)).unwrap();
        memo["type"] = "memo".into();
        let idea = serde_json::to_value(Card::new(CardType::Idea, 10.0, 10.0, now)).unwrap();
        store
            .slots()
            .set(CARDS_SLOT, &serde_json::to_string(&vec![memo, idea]).unwrap())
            .unwrap();

        let snapshot = store.load().unwrap();
        assert_eq!(snapshot.cards.len(), 2);
        assert_eq!(snapshot.cards[0].card_type, CardType::Note);
        assert_eq!(snapshot.cards[1].card_type, CardType::Idea);

        let mut state = AppState::new(None, SpawnWindow::default());
        let mut rng = StdRng::seed_from_u64(25);
        state.dispatch(Action::Loaded(snapshot), &mut rng, now);
        apply(&mut store, &mut state, Action::CreateCard(CardType::Task), &mut rng);

        assert_eq!(store.load().unwrap().cards.len(), 3);
        assert!(set_aside_files(dir.path()).is_empty());
    }
}
