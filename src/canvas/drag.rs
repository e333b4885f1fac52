//! Pointer drag state machine.
//!
//! `Idle` becomes `Dragging` on pointer-down over a card body and returns to
//! `Idle` on pointer-up. There is no cancel path: releasing the pointer always
//! commits the last position.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A point in screen or canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset_from(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn clamp_non_negative(self) -> Point {
        Point::new(self.x.max(0.0), self.y.max(0.0))
    }
}

/// Controls on a card that keep pointer-down for themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardButton {
    ToggleActive,
    Tags,
    Delete,
}

/// What the pointer landed on inside a card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Anywhere on the card that is not an interactive control
    CardBody,
    /// The title field
    TextInput,
    /// The content field
    TextArea,
    Button(CardButton),
}

impl PointerTarget {
    pub fn is_interactive(&self) -> bool {
        !matches!(self, Self::CardBody)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging { card_id: Uuid, grab_offset: Point },
}

#[derive(Debug, Clone, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn dragging(&self) -> Option<Uuid> {
        match self.state {
            DragState::Dragging { card_id, .. } => Some(card_id),
            DragState::Idle => None,
        }
    }

    /// Start a drag when the pointer goes down on a card body.
    ///
    /// `card_origin` is the card's top-left corner in the same coordinate
    /// space as `pointer`. Returns true when a drag started.
    pub fn pointer_down(
        &mut self,
        card_id: Uuid,
        target: PointerTarget,
        pointer: Point,
        card_origin: Point,
    ) -> bool {
        if target.is_interactive() || self.dragging().is_some() {
            return false;
        }
        self.state = DragState::Dragging {
            card_id,
            grab_offset: pointer.offset_from(card_origin),
        };
        true
    }

    /// New canvas position for the dragged card, clamped to non-negative.
    pub fn pointer_move(&self, pointer: Point, canvas_origin: Point) -> Option<(Uuid, Point)> {
        match self.state {
            DragState::Dragging {
                card_id,
                grab_offset,
            } => {
                let position = pointer
                    .offset_from(canvas_origin)
                    .offset_from(grab_offset)
                    .clamp_non_negative();
                Some((card_id, position))
            }
            DragState::Idle => None,
        }
    }

    /// Finish the drag. Returns the card that was being dragged.
    pub fn pointer_up(&mut self) -> Option<Uuid> {
        let card_id = self.dragging();
        self.state = DragState::Idle;
        card_id
    }

    pub fn reset(&mut self) {
        self.state = DragState::Idle;
    }
}
