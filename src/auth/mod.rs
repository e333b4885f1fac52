//! Sign-in state for the remote backend.
//!
//! [`AuthClient`] keeps the single stored session in the [`Database`] and
//! notifies subscribers when it changes. The external redirect flow sits
//! behind [`IdentityProvider`].

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{info, warn};

use crate::db::{new_session, Database};
use crate::error::AuthError;
use crate::models::Session;

mod google;

pub use google::{parse_callback_request, GoogleProvider, PROVIDER_GOOGLE};

/// What a provider hands back after a successful redirect flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    /// Verified email address of the account
    pub email: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

pub trait IdentityProvider {
    /// Name stored with the session
    fn name(&self) -> &str;

    /// Run the interactive authorization flow
    fn authorize(&self) -> Result<Authorization, AuthError>;

    /// Invalidate the session's tokens with the provider
    fn revoke(&self, session: &Session) -> Result<(), AuthError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
}

type Listener = Rc<dyn Fn(&AuthEvent)>;
type Listeners = RefCell<Vec<(u64, Listener)>>;

/// Handle returned by [`AuthClient::on_auth_state_change`]
pub struct Subscription {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

pub struct AuthClient {
    db: Rc<Database>,
    listeners: Rc<Listeners>,
    next_id: Cell<u64>,
}

impl AuthClient {
    pub fn new(db: Rc<Database>) -> Self {
        Self {
            db,
            listeners: Rc::new(RefCell::new(Vec::new())),
            next_id: Cell::new(0),
        }
    }

    pub fn get_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.db.get_session()?)
    }

    /// Like [`get_session`](Self::get_session) but an absent session is an error
    pub fn require_session(&self) -> Result<Session, AuthError> {
        self.get_session()?.ok_or(AuthError::NotSignedIn)
    }

    pub fn on_auth_state_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AuthEvent) + 'static,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        Subscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    fn notify(&self, event: &AuthEvent) {
        // Snapshot so a listener may subscribe or unsubscribe while being called
        let listeners: Vec<Listener> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Run the provider's flow, then store the session for the verified email.
    pub fn sign_in_with_oauth(&self, provider: &dyn IdentityProvider) -> Result<Session, AuthError> {
        let authorization = provider.authorize()?;
        let user = self.db.upsert_user(&authorization.email)?;
        let session = new_session(
            &user,
            provider.name(),
            authorization.access_token,
            authorization.refresh_token,
        );
        self.db.save_session(&session)?;

        info!(email = %session.email, provider = provider.name(), "signed in");
        self.notify(&AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Forget the stored session. Token revocation is best effort.
    ///
    /// Returns false when nobody was signed in.
    pub fn sign_out(&self, provider: Option<&dyn IdentityProvider>) -> Result<bool, AuthError> {
        let Some(session) = self.db.get_session()? else {
            return Ok(false);
        };

        if let Some(provider) = provider.filter(|p| p.name() == session.provider) {
            if let Err(e) = provider.revoke(&session) {
                warn!(error = %e, "token revocation failed");
            }
        }

        self.db.delete_session()?;
        info!(email = %session.email, "signed out");
        self.notify(&AuthEvent::SignedOut);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProvider {
        email: Option<&'static str>,
        revoked: Cell<u32>,
    }

    impl FakeProvider {
        fn signing_in(email: &'static str) -> Self {
            Self {
                email: Some(email),
                revoked: Cell::new(0),
            }
        }
    }

    impl IdentityProvider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        fn authorize(&self) -> Result<Authorization, AuthError> {
            match self.email {
                Some(email) => Ok(Authorization {
                    email: email.to_string(),
                    access_token: Some("access".into()),
                    refresh_token: None,
                }),
                None => Err(AuthError::Provider("consent denied".into())),
            }
        }

        fn revoke(&self, _session: &Session) -> Result<(), AuthError> {
            self.revoked.set(self.revoked.get() + 1);
            Err(AuthError::Provider("offline".into()))
        }
    }

    fn client() -> AuthClient {
        AuthClient::new(Rc::new(Database::open_memory().unwrap()))
    }

    #[test]
    fn test_sign_in_stores_session_and_notifies() {
        let auth = client();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let _sub = auth.on_auth_state_change(move |e| sink.borrow_mut().push(e.clone()));

        assert!(auth.get_session().unwrap().is_none());
        let session = auth
            .sign_in_with_oauth(&FakeProvider::signing_in("mia@example.com"))
            .unwrap();

        assert_eq!(session.email, "mia@example.com");
        assert_eq!(session.provider, "fake");
        assert_eq!(auth.require_session().unwrap(), session);
        assert_eq!(*events.borrow(), vec![AuthEvent::SignedIn(session)]);
    }

    #[test]
    fn test_same_email_keeps_user_id() {
        let auth = client();
        let provider = FakeProvider::signing_in("mia@example.com");
        let first = auth.sign_in_with_oauth(&provider).unwrap();
        auth.sign_out(None).unwrap();
        let second = auth.sign_in_with_oauth(&provider).unwrap();
        assert_eq!(first.user_id, second.user_id);
    }

    #[test]
    fn test_failed_authorization_leaves_no_session() {
        let auth = client();
        let provider = FakeProvider {
            email: None,
            revoked: Cell::new(0),
        };
        assert!(matches!(
            auth.sign_in_with_oauth(&provider),
            Err(AuthError::Provider(_))
        ));
        assert!(matches!(auth.require_session(), Err(AuthError::NotSignedIn)));
    }

    #[test]
    fn test_sign_out_survives_revoke_failure() {
        let auth = client();
        let provider = FakeProvider::signing_in("mia@example.com");
        auth.sign_in_with_oauth(&provider).unwrap();

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        let _sub = auth.on_auth_state_change(move |e| sink.borrow_mut().push(e.clone()));

        assert!(auth.sign_out(Some(&provider)).unwrap());
        assert_eq!(provider.revoked.get(), 1);
        assert!(auth.get_session().unwrap().is_none());
        assert_eq!(*events.borrow(), vec![AuthEvent::SignedOut]);

        assert!(!auth.sign_out(Some(&provider)).unwrap());
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let auth = client();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let sub = auth.on_auth_state_change(move |_| counter.set(counter.get() + 1));

        let provider = FakeProvider::signing_in("mia@example.com");
        auth.sign_in_with_oauth(&provider).unwrap();
        sub.unsubscribe();
        auth.sign_out(None).unwrap();
        assert_eq!(count.get(), 1);
    }
}
