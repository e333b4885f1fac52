//! Glue between the state machine and a persistence backend.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::canvas::{Action, AppState, Snapshot, SpawnWindow, ViewMode};
use crate::error::Result;
use crate::store::{Notice, Persistence};

pub struct App {
    state: AppState,
    persistence: Box<dyn Persistence>,
    rng: StdRng,
}

impl App {
    /// Load the backend's collections and start from them
    pub fn new(
        persistence: Box<dyn Persistence>,
        owner: Option<uuid::Uuid>,
        spawn: SpawnWindow,
    ) -> Result<Self> {
        Self::with_rng(persistence, owner, spawn, StdRng::from_entropy())
    }

    pub fn with_rng(
        persistence: Box<dyn Persistence>,
        owner: Option<uuid::Uuid>,
        spawn: SpawnWindow,
        rng: StdRng,
    ) -> Result<Self> {
        let snapshot = persistence.load()?;
        info!(
            cards = snapshot.cards.len(),
            tags = snapshot.tags.len(),
            "loaded collections"
        );
        let mut app = Self {
            state: AppState::new(owner, spawn),
            persistence,
            rng,
        };
        app.dispatch(Action::Loaded(snapshot));
        Ok(app)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Drop the signed-out owner's collections and go back to the canvas
    pub fn clear(&mut self) {
        self.state.owner = None;
        self.dispatch(Action::Loaded(Snapshot::default()));
        self.dispatch(Action::SetView(ViewMode::Canvas));
    }

    /// Apply an action locally, then persist its effects
    pub fn dispatch(&mut self, action: Action) -> Vec<Notice> {
        let effects = self.state.dispatch(action, &mut self.rng, Utc::now());
        if effects.is_empty() {
            return Vec::new();
        }
        self.persistence.persist(&effects, &self.state)
    }
}
