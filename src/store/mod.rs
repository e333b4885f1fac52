//! Persistence backends and the effect runner.
//!
//! A backend loads the initial [`Snapshot`] and persists the effects of every
//! dispatch. Failures never roll back local state: `Alert` failures come back
//! as [`Notice`]s for the user, `Log` failures are only logged.

use std::fmt;

use tracing::{error, warn};

use crate::canvas::{AppState, Effect, FailurePolicy, Snapshot};
use crate::error::Result;

mod local;
mod remote;

pub use local::{LocalStore, SlotStore, CARDS_SLOT, TAGS_SLOT};
pub use remote::RemoteStore;

/// Message to surface to the user after a failed write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub trait Persistence {
    /// Read the collections once at startup
    fn load(&self) -> Result<Snapshot>;

    /// Persist the effects of one dispatch. `state` is the state after the transition.
    fn persist(&mut self, effects: &[Effect], state: &AppState) -> Vec<Notice>;
}

/// A store that executes effects one call at a time
pub trait ExecuteEffect {
    fn execute(&self, effect: &Effect) -> Result<()>;
}

/// Execute effects in order, applying each effect's failure policy. No retries.
pub fn run_effects<X: ExecuteEffect + ?Sized>(store: &X, effects: &[Effect]) -> Vec<Notice> {
    let mut notices = Vec::new();
    for effect in effects {
        if let Err(e) = store.execute(effect) {
            report_failure(effect, &e.to_string(), &mut notices);
        }
    }
    notices
}

pub(crate) fn report_failure(effect: &Effect, reason: &str, notices: &mut Vec<Notice>) {
    match effect.failure_policy() {
        FailurePolicy::Alert => {
            error!(action = effect.describe(), field = effect.field(), error = %reason, "persistence call failed");
            notices.push(Notice::new(format!("Could not {}: {}", effect.describe(), reason)));
        }
        FailurePolicy::Log => {
            warn!(action = effect.describe(), field = effect.field(), error = %reason, "persistence call failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::{Card, CardPatch, CardType};
    use chrono::Utc;
    use std::cell::RefCell;

    /// Records calls and fails every one of them
    #[derive(Default)]
    struct FailingStore {
        calls: RefCell<Vec<&'static str>>,
    }

    impl ExecuteEffect for FailingStore {
        fn execute(&self, effect: &Effect) -> Result<()> {
            self.calls.borrow_mut().push(effect.describe());
            Err(StoreError::Io(std::io::Error::other("offline")))
        }
    }

    #[test]
    fn test_alert_failures_become_notices() {
        let store = FailingStore::default();
        let card = Card::new(CardType::Note, 0.0, 0.0, Utc::now());
        let effects = vec![
            Effect::InsertCard(card.clone()),
            Effect::UpdateCard {
                id: card.id,
                patch: CardPatch::Title("x".into()),
                updated_at: Utc::now(),
            },
            Effect::DeleteCard(card.id),
        ];

        let notices = run_effects(&store, &effects);
        // Every effect is attempted exactly once
        assert_eq!(
            *store.calls.borrow(),
            vec!["create card", "update card", "delete card"]
        );
        assert_eq!(notices.len(), 2);
        assert!(notices[0].message.starts_with("Could not create card"));
        assert!(notices[1].message.contains("offline"));
    }
}
