use serde::{Deserialize, Serialize};

use crate::models::{Card, CardType};

/// How the cards are presented. Switching never touches the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Free positioning, drag enabled
    #[default]
    Canvas,
    /// One column per card type, drag disabled
    Organized,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Canvas => Self::Organized,
            Self::Organized => Self::Canvas,
        }
    }

    pub fn allows_drag(self) -> bool {
        matches!(self, Self::Canvas)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Canvas => "canvas",
            Self::Organized => "organized",
        }
    }
}

/// Cards of one type, in store order
#[derive(Debug)]
pub struct Column<'a> {
    pub card_type: CardType,
    pub cards: Vec<&'a Card>,
}

impl Column<'_> {
    /// Column heading, e.g. "Tareas"
    pub fn heading(&self) -> String {
        format!("{}s", self.card_type.label())
    }
}

/// Group cards into one column per type, in type order
pub fn organize(cards: &[Card]) -> Vec<Column<'_>> {
    CardType::all()
        .iter()
        .map(|&card_type| Column {
            card_type,
            cards: cards.iter().filter(|c| c.card_type == card_type).collect(),
        })
        .collect()
}
