use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Tag;

/// Kind of card. Each kind has a fixed label and color.
///
/// Deserializes leniently: an unknown stored type reads as `Note`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum CardType {
    #[default]
    Note,
    Idea,
    Task,
    Project,
}

impl CardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Idea => "idea",
            Self::Task => "task",
            Self::Project => "project",
        }
    }

    /// Parse a stored type. Unknown values fall back to `Note`.
    pub fn parse(s: &str) -> Self {
        Self::from_name(s).unwrap_or_default()
    }

    /// Strict parse for user input
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "note" | "nota" => Some(Self::Note),
            "idea" => Some(Self::Idea),
            "task" | "tarea" => Some(Self::Task),
            "project" | "proyecto" => Some(Self::Project),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Note => "Nota",
            Self::Idea => "Idea",
            Self::Task => "Tarea",
            Self::Project => "Proyecto",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Note => "#a8e6cf",
            Self::Idea => "#4ecdc4",
            Self::Task => "#ffe66d",
            Self::Project => "#ff6b6b",
        }
    }

    /// All types in display order (also the column order of the organized view)
    pub fn all() -> &'static [CardType] {
        &[Self::Note, Self::Idea, Self::Task, Self::Project]
    }
}

impl From<String> for CardType {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

/// Field-level change to a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CardPatch {
    Title(String),
    Content(String),
    Position { x: f64, y: f64 },
    Active(bool),
}

impl CardPatch {
    /// Column touched by this patch, for logging
    pub fn field(&self) -> &'static str {
        match self {
            Self::Title(_) => "title",
            Self::Content(_) => "content",
            Self::Position { .. } => "position",
            Self::Active(_) => "is_active",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub title: String,
    pub content: String,
    pub color: String,
    pub x: f64,
    pub y: f64,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl Card {
    /// New card of the given type at a position. Title and color come from the type.
    pub fn new(card_type: CardType, x: f64, y: f64, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_type,
            title: format!("Nuevo {}", card_type.label()),
            content: String::new(),
            color: card_type.color().to_string(),
            x,
            y,
            is_active: true,
            user_id: None,
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
        }
    }

    /// Apply a patch and touch `updated_at`. Positions are stored as given.
    pub fn apply(&mut self, patch: &CardPatch, now: DateTime<Utc>) {
        match patch {
            CardPatch::Title(title) => self.title = title.clone(),
            CardPatch::Content(content) => self.content = content.clone(),
            CardPatch::Position { x, y } => {
                self.x = *x;
                self.y = *y;
            }
            CardPatch::Active(active) => self.is_active = *active,
        }
        self.updated_at = now;
    }

    pub fn has_tag(&self, tag_id: Uuid) -> bool {
        self.tags.iter().any(|t| t.id == tag_id)
    }
}
