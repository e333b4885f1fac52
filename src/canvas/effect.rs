use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Card, CardPatch, Tag};

/// A persistence call queued by a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    InsertCard(Card),
    UpdateCard {
        id: Uuid,
        patch: CardPatch,
        updated_at: DateTime<Utc>,
    },
    DeleteCard(Uuid),
    InsertTag(Tag),
    LinkTag { card_id: Uuid, tag_id: Uuid },
    UnlinkTag { card_id: Uuid, tag_id: Uuid },
}

/// What happens when the backend rejects an effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Tell the user
    Alert,
    /// Log and move on
    Log,
}

/// Which stored collection an effect writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Cards,
    Tags,
}

impl Effect {
    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            Self::InsertCard(_) | Self::DeleteCard(_) | Self::InsertTag(_) => FailurePolicy::Alert,
            Self::UpdateCard { .. } | Self::LinkTag { .. } | Self::UnlinkTag { .. } => {
                FailurePolicy::Log
            }
        }
    }

    /// Tag associations live on the cards
    pub fn collection(&self) -> Collection {
        match self {
            Self::InsertTag(_) => Collection::Tags,
            _ => Collection::Cards,
        }
    }

    /// Card column an update writes
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::UpdateCard { patch, .. } => Some(patch.field()),
            _ => None,
        }
    }

    /// Short description used in notices and logs
    pub fn describe(&self) -> &'static str {
        match self {
            Self::InsertCard(_) => "create card",
            Self::UpdateCard { .. } => "update card",
            Self::DeleteCard(_) => "delete card",
            Self::InsertTag(_) => "create tag",
            Self::LinkTag { .. } | Self::UnlinkTag { .. } => "toggle tag",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardType;

    #[test]
    fn test_create_and_delete_alert_others_log() {
        let card = Card::new(CardType::Note, 0.0, 0.0, Utc::now());
        assert_eq!(Effect::InsertCard(card.clone()).failure_policy(), FailurePolicy::Alert);
        assert_eq!(Effect::DeleteCard(card.id).failure_policy(), FailurePolicy::Alert);
        let update = Effect::UpdateCard {
            id: card.id,
            patch: CardPatch::Active(false),
            updated_at: Utc::now(),
        };
        assert_eq!(update.failure_policy(), FailurePolicy::Log);
        assert_eq!(update.field(), Some("is_active"));
        assert_eq!(Effect::DeleteCard(card.id).field(), None);
        let link = Effect::LinkTag {
            card_id: card.id,
            tag_id: Uuid::new_v4(),
        };
        assert_eq!(link.failure_policy(), FailurePolicy::Log);
        assert_eq!(link.collection(), Collection::Cards);
    }
}
