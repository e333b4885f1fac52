use std::rc::Rc;

use tracing::debug;
use uuid::Uuid;

use super::{run_effects, ExecuteEffect, Notice, Persistence};
use crate::canvas::{AppState, Effect, Snapshot};
use crate::db::Database;
use crate::error::Result;

/// Relational backend scoped to one signed-in user. One statement per effect.
pub struct RemoteStore {
    db: Rc<Database>,
    user_id: Uuid,
}

impl RemoteStore {
    pub fn new(db: Rc<Database>, user_id: Uuid) -> Self {
        Self { db, user_id }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }
}

impl ExecuteEffect for RemoteStore {
    fn execute(&self, effect: &Effect) -> Result<()> {
        match effect {
            Effect::InsertCard(card) => self.db.insert_card(card, self.user_id),
            Effect::UpdateCard {
                id,
                patch,
                updated_at,
            } => {
                debug!(card = %id, field = patch.field(), "updating card");
                self.db
                    .update_card_field(*id, self.user_id, patch, *updated_at)
                    .map(|_| ())
            }
            Effect::DeleteCard(id) => self.db.delete_card(*id, self.user_id).map(|_| ()),
            Effect::InsertTag(tag) => self.db.insert_tag(tag, self.user_id),
            Effect::LinkTag { card_id, tag_id } => self.db.link_tag(*card_id, *tag_id),
            Effect::UnlinkTag { card_id, tag_id } => {
                self.db.unlink_tag(*card_id, *tag_id).map(|_| ())
            }
        }
    }
}

impl Persistence for RemoteStore {
    fn load(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            cards: self.db.list_cards_for_user(self.user_id)?,
            tags: self.db.list_tags_for_user(self.user_id)?,
        })
    }

    fn persist(&mut self, effects: &[Effect], _state: &AppState) -> Vec<Notice> {
        run_effects(&*self, effects)
    }
}
