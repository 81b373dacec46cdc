//! Session manager
//!
//! Holds at most one current session. A session is only a weak reference to
//! a user: every read re-checks the repository and drops the session if its
//! user was deleted or is no longer active.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::invariants::assert_session_authenticated;
use crate::models::{Presence, Session, User};
use crate::repository::UserRepository;
use crate::storage::DurableStore;

pub struct SessionManager {
    current: Option<Session>,
    store: Arc<dyn DurableStore>,
}

impl SessionManager {
    /// Wrap a hydrated session; it is not trusted until the first [`current`](Self::current)
    pub fn new(current: Option<Session>, store: Arc<dyn DurableStore>) -> Self {
        Self { current, store }
    }

    /// Replace whatever session exists with `session`
    #[instrument(skip(self, session), fields(user_id = %session.id))]
    pub fn establish(&mut self, session: Session) -> Result<Session> {
        self.commit(Some(session.clone()))?;
        info!(username = %session.username, "Session established");
        Ok(session)
    }

    /// The live session, re-validated against `users`
    pub fn current(&mut self, users: &UserRepository) -> Result<Option<Session>> {
        let Some(session) = &self.current else {
            return Ok(None);
        };

        match users.find_by_id(&session.id) {
            Some(user) if user.is_active() => {
                assert_session_authenticated(session, users.list());
                Ok(Some(session.clone()))
            }
            found => {
                warn!(
                    user_id = %session.id,
                    status = found.map(|u| u.status.as_str()),
                    "Dropping session whose user is gone or not active"
                );
                self.commit(None)?;
                Ok(None)
            }
        }
    }

    /// Unvalidated view of the stored session
    pub(crate) fn peek(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Put back a session cleared by a step whose follow-up write failed
    pub(crate) fn restore(&mut self, session: Option<Session>) -> Result<()> {
        self.commit(session)
    }

    /// Clear the session; a no-op without one
    #[instrument(skip(self))]
    pub fn logout(&mut self) -> Result<Option<Session>> {
        if self.current.is_none() {
            return Ok(None);
        }

        let previous = self.current.clone();
        self.commit(None)?;
        if let Some(session) = &previous {
            info!(username = %session.username, "Logged out");
        }
        Ok(previous)
    }

    /// Clear the session iff it belongs to `user_id`; returns whether it did
    #[instrument(skip(self))]
    pub fn force_logout(&mut self, user_id: &str) -> Result<bool> {
        match &self.current {
            Some(session) if session.id == user_id => {
                self.commit(None)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Change the presence of the live session
    #[instrument(skip(self, users))]
    pub fn set_presence(
        &mut self,
        users: &UserRepository,
        presence: Presence,
    ) -> Result<Option<Session>> {
        let Some(mut session) = self.current(users)? else {
            return Ok(None);
        };

        if session.presence != presence {
            session.presence = presence;
            self.commit(Some(session.clone()))?;
        }
        Ok(Some(session))
    }

    /// Copy display fields from the user behind the session
    pub fn refresh_profile(&mut self, user: &User) -> Result<()> {
        match &self.current {
            Some(session) if session.id == user.id && session.avatar != user.avatar => {
                let mut next = session.clone();
                next.avatar = user.avatar.clone();
                self.commit(Some(next))
            }
            _ => Ok(()),
        }
    }

    fn commit(&mut self, next: Option<Session>) -> Result<()> {
        if let Err(e) = self.store.save_session(next.as_ref()) {
            tracing::error!(error = %e, "Failed to persist session, keeping previous state");
            return Err(e.into());
        }

        self.current = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{Role, UserPatch, UserStatus};
    use crate::storage::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        users: UserRepository,
        sessions: SessionManager,
    }

    fn setup() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let mut users = UserRepository::new(Vec::new(), store.clone());
        for name in ["alice", "bob"] {
            users
                .create(User::new(name.into(), "pw".into(), UserStatus::Active, Role::User))
                .unwrap();
        }
        let sessions = SessionManager::new(None, store.clone());
        Fixture {
            store,
            users,
            sessions,
        }
    }

    fn login(f: &mut Fixture, name: &str) -> Session {
        let user = f.users.find_by_username(name).unwrap().clone();
        f.sessions.establish(Session::for_user(&user)).unwrap()
    }

    #[test]
    fn test_establish_persists() {
        let mut f = setup();
        login(&mut f, "alice");

        let current = f.sessions.current(&f.users).unwrap().unwrap();
        assert_eq!(current.username, "alice");
        assert_eq!(f.store.load().unwrap().current_session, Some(current));
    }

    #[test]
    fn test_logout_is_idempotent() {
        let mut f = setup();
        assert!(f.sessions.logout().unwrap().is_none());

        login(&mut f, "alice");
        let cleared = f.sessions.logout().unwrap().unwrap();
        assert_eq!(cleared.username, "alice");
        assert!(f.sessions.current(&f.users).unwrap().is_none());
        assert!(f.store.load().unwrap().current_session.is_none());

        assert!(f.sessions.logout().unwrap().is_none());
    }

    #[test]
    fn test_force_logout_only_matching_user() {
        let mut f = setup();
        assert!(!f.sessions.force_logout("alice").unwrap());

        login(&mut f, "alice");
        assert!(!f.sessions.force_logout("bob").unwrap());
        assert!(f.sessions.peek().is_some());

        assert!(f.sessions.force_logout("alice").unwrap());
        assert!(f.sessions.peek().is_none());
        assert!(f.store.load().unwrap().current_session.is_none());
    }

    #[test]
    fn test_lazy_invalidation_on_status_change() {
        let mut f = setup();
        login(&mut f, "alice");

        f.users
            .update("alice", UserPatch::status(UserStatus::Suspended))
            .unwrap();
        assert!(f.sessions.peek().is_some());

        assert!(f.sessions.current(&f.users).unwrap().is_none());
        assert!(f.sessions.peek().is_none());
        assert!(f.store.load().unwrap().current_session.is_none());
    }

    #[test]
    fn test_lazy_invalidation_on_delete() {
        let mut f = setup();
        login(&mut f, "bob");
        f.users.delete("bob").unwrap();

        assert!(f.sessions.current(&f.users).unwrap().is_none());
    }

    #[test]
    fn test_hydrated_session_is_revalidated() {
        let f = setup();
        let ghost = User::new("ghost".into(), "pw".into(), UserStatus::Active, Role::User);
        let mut sessions = SessionManager::new(Some(Session::for_user(&ghost)), f.store.clone());

        assert!(sessions.current(&f.users).unwrap().is_none());
    }

    #[test]
    fn test_set_presence() {
        let mut f = setup();
        assert!(f
            .sessions
            .set_presence(&f.users, Presence::Away)
            .unwrap()
            .is_none());

        login(&mut f, "alice");
        let session = f
            .sessions
            .set_presence(&f.users, Presence::Away)
            .unwrap()
            .unwrap();
        assert_eq!(session.presence, Presence::Away);
        assert_eq!(
            f.store.load().unwrap().current_session.unwrap().presence,
            Presence::Away
        );
    }

    #[test]
    fn test_refresh_profile_copies_avatar() {
        let mut f = setup();
        login(&mut f, "alice");

        let user = f
            .users
            .update("alice", UserPatch::avatar(Some("new.png".into())))
            .unwrap();
        f.sessions.refresh_profile(&user).unwrap();
        assert_eq!(f.sessions.peek().unwrap().avatar.as_deref(), Some("new.png"));

        let other = f.users.find_by_id("bob").unwrap().clone();
        f.sessions.refresh_profile(&other).unwrap();
        assert_eq!(f.sessions.peek().unwrap().username, "alice");
    }

    #[test]
    fn test_failed_write_keeps_session() {
        let mut f = setup();
        login(&mut f, "alice");
        f.store.set_read_only(true);

        let err = f.sessions.logout().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
        assert_eq!(f.sessions.peek().unwrap().username, "alice");
    }
}
