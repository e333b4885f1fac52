//! Card geometry on the terminal board.
//!
//! Canvas coordinates are in points; one terminal cell is `CELL_W` x `CELL_H`
//! points. A card occupies `CARD_COLS` x `CARD_ROWS` cells:
//!
//! ```text
//! row 0  ┌──────────────────────────┐
//! row 1  │ ◆ title field            │
//! row 2  │ content field            │
//! row 3  │ content field            │
//! row 4  │ tags                     │
//! row 5  │[ Activo ] [#] [Eliminar] │
//! row 6  └──────────────────────────┘
//! ```

use uuid::Uuid;

use super::{CardButton, Column, Point, PointerTarget};
use crate::models::Card;

pub const CELL_W: f64 = 10.0;
pub const CELL_H: f64 = 20.0;
pub const CARD_COLS: u16 = 28;
pub const CARD_ROWS: u16 = 7;
/// Rows above the canvas used by the header bar
pub const HEADER_ROWS: u16 = 3;
/// Blank cells between organized columns
pub const COLUMN_GAP: u16 = 2;

pub const TITLE_COLS: (u16, u16) = (4, 26);
pub const CONTENT_ROWS: (u16, u16) = (2, 3);
pub const TAG_ROW: u16 = 4;
pub const BUTTON_ROW: u16 = 5;
pub const ACTIVE_BUTTON_COLS: (u16, u16) = (1, 10);
pub const TAGS_BUTTON_COLS: (u16, u16) = (12, 14);
pub const DELETE_BUTTON_COLS: (u16, u16) = (16, 25);

/// Screen position of the canvas's (0, 0)
pub fn canvas_origin() -> Point {
    Point::new(0.0, HEADER_ROWS as f64 * CELL_H)
}

/// Top-left corner of a terminal cell, in points
pub fn cell_to_point(col: u16, row: u16) -> Point {
    Point::new(col as f64 * CELL_W, row as f64 * CELL_H)
}

/// Screen position of a card's top-left corner, in points
pub fn card_origin(card: &Card) -> Point {
    let origin = canvas_origin();
    Point::new(origin.x + card.x, origin.y + card.y)
}

/// Terminal cell of a card's top-left corner
pub fn card_cell(card: &Card) -> (u16, u16) {
    let p = card_origin(card);
    (to_cell(p.x / CELL_W), to_cell(p.y / CELL_H))
}

fn to_cell(v: f64) -> u16 {
    v.floor().clamp(0.0, u16::MAX as f64) as u16
}

/// What a pointer press inside a card lands on, given the cell offset from
/// the card's top-left corner.
pub fn target_at(local_col: u16, local_row: u16) -> PointerTarget {
    let inner = local_col >= 1 && local_col < CARD_COLS - 1;
    if !inner {
        return PointerTarget::CardBody;
    }

    let within = |(start, end): (u16, u16), v: u16| v >= start && v <= end;

    match local_row {
        1 if within(TITLE_COLS, local_col) => PointerTarget::TextInput,
        r if within(CONTENT_ROWS, r) => PointerTarget::TextArea,
        BUTTON_ROW if within(ACTIVE_BUTTON_COLS, local_col) => {
            PointerTarget::Button(CardButton::ToggleActive)
        }
        BUTTON_ROW if within(TAGS_BUTTON_COLS, local_col) => PointerTarget::Button(CardButton::Tags),
        BUTTON_ROW if within(DELETE_BUTTON_COLS, local_col) => {
            PointerTarget::Button(CardButton::Delete)
        }
        _ => PointerTarget::CardBody,
    }
}

/// Where a card is drawn on the board
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub card_id: Uuid,
    pub col: u16,
    pub row: u16,
    /// Screen position of the card's top-left corner, in points
    pub origin: Point,
}

/// Cards at their own canvas positions, in drawing order
pub fn canvas_placements(cards: &[Card]) -> Vec<Placement> {
    cards
        .iter()
        .map(|card| {
            let (col, row) = card_cell(card);
            Placement {
                card_id: card.id,
                col,
                row,
                origin: card_origin(card),
            }
        })
        .collect()
}

/// Cards stacked in their type's column, one row of headings above
pub fn organized_placements(columns: &[Column<'_>]) -> Vec<Placement> {
    let mut placements = Vec::new();
    for (i, column) in columns.iter().enumerate() {
        let col = i as u16 * (CARD_COLS + COLUMN_GAP);
        for (j, card) in column.cards.iter().enumerate() {
            let row = (HEADER_ROWS + 1).saturating_add((j as u16).saturating_mul(CARD_ROWS));
            placements.push(Placement {
                card_id: card.id,
                col,
                row,
                origin: cell_to_point(col, row),
            });
        }
    }
    placements
}

/// Result of hit-testing a pointer press
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub card_id: Uuid,
    pub target: PointerTarget,
    pub card_origin: Point,
}

/// Find the topmost card under a terminal cell. Later placements draw on top.
pub fn hit_test(placements: &[Placement], col: u16, row: u16) -> Option<Hit> {
    placements.iter().rev().find_map(|p| {
        let inside = col >= p.col
            && col < p.col.saturating_add(CARD_COLS)
            && row >= p.row
            && row < p.row.saturating_add(CARD_ROWS);
        inside.then(|| Hit {
            card_id: p.card_id,
            target: target_at(col - p.col, row - p.row),
            card_origin: p.origin,
        })
    })
}
