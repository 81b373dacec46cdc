//! Console - composition root for the account engine
//!
//! Owns the user repository and session manager behind one lock. Every
//! public method takes the lock once and runs to completion, so a
//! read-modify-write never interleaves with another.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, instrument, warn};

use crate::auth::AuthService;
use crate::config::Config;
use crate::credentials::{self, CredentialVerifier};
use crate::error::{Error, Result};
use crate::models::{Presence, Role, Session, User, UserPatch, UserStats};
use crate::moderation::{Deletion, ForceLogout, Moderation};
use crate::repository::UserRepository;
use crate::seed;
use crate::session::SessionManager;
use crate::storage::{self, DurableStore};

struct Engine {
    users: UserRepository,
    sessions: SessionManager,
}

impl Engine {
    fn moderation(&mut self) -> Moderation<'_> {
        Moderation::new(&mut self.users, &mut self.sessions)
    }
}

/// Account lifecycle and session engine for one process
pub struct Console {
    engine: Mutex<Engine>,
    auth: AuthService,
}

impl Console {
    /// Open the configured store and hydrate from it
    #[instrument(skip(config), fields(backend = ?config.storage.backend))]
    pub fn open(config: &Config) -> Result<Self> {
        let store = storage::open_store(config)?;
        let verifier: Arc<dyn CredentialVerifier> =
            Arc::from(credentials::verifier_for(config.credentials.scheme));
        Self::hydrate(store, verifier, config.seed.demo_accounts)
    }

    /// Hydrate from an existing store without seeding
    pub fn with_store(
        store: Arc<dyn DurableStore>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Result<Self> {
        Self::hydrate(store, verifier, false)
    }

    /// Hydrate from `store`, seeding the demo accounts if it has never held users
    pub fn hydrate(
        store: Arc<dyn DurableStore>,
        verifier: Arc<dyn CredentialVerifier>,
        seed_demo_accounts: bool,
    ) -> Result<Self> {
        let snapshot = store.load()?;

        let users = match snapshot.users {
            Some(users) => users,
            None if seed_demo_accounts => {
                let users = seed::demo_accounts(verifier.as_ref())?;
                store.save_users(&users)?;
                info!(count = users.len(), "Seeded demo accounts");
                users
            }
            None => Vec::new(),
        };

        let users = UserRepository::hydrate(users, store.clone())?;
        info!(
            users = users.len(),
            has_session = snapshot.current_session.is_some(),
            "Console hydrated"
        );

        Ok(Self {
            engine: Mutex::new(Engine {
                users,
                sessions: SessionManager::new(snapshot.current_session, store),
            }),
            auth: AuthService::new(verifier),
        })
    }

    fn engine(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Auth ---

    pub fn login(&self, username: &str, password: &str) -> Result<Session> {
        let mut engine = self.engine();
        let Engine { users, sessions } = &mut *engine;
        self.auth.login(users, sessions, username, password)
    }

    pub fn signup(&self, username: &str, password: &str) -> Result<User> {
        require_credentials(username, password)?;
        self.auth.signup(&mut self.engine().users, username, password)
    }

    pub fn logout(&self) -> Result<Option<Session>> {
        self.engine().sessions.logout()
    }

    // --- Session ---

    /// The authenticated session, re-validated on every call
    pub fn current_session(&self) -> Result<Option<Session>> {
        let mut engine = self.engine();
        let Engine { users, sessions } = &mut *engine;
        sessions.current(users)
    }

    pub fn set_presence(&self, presence: Presence) -> Result<Option<Session>> {
        let mut engine = self.engine();
        let Engine { users, sessions } = &mut *engine;
        sessions.set_presence(users, presence)
    }

    /// Change the logged-in user's avatar; no-op without a session
    #[instrument(skip(self))]
    pub fn set_avatar(&self, avatar: Option<String>) -> Result<Option<Session>> {
        let mut engine = self.engine();
        let Engine { users, sessions } = &mut *engine;

        let Some(session) = sessions.current(users)? else {
            return Ok(None);
        };

        let previous = users.find_by_id(&session.id).and_then(|u| u.avatar.clone());
        let user = users.update(&session.id, UserPatch::avatar(avatar))?;
        if let Err(e) = sessions.refresh_profile(&user) {
            if let Err(revert) = users.update(&user.id, UserPatch::avatar(previous)) {
                warn!(error = %revert, "Could not revert avatar after failed session write");
            }
            return Err(e);
        }
        Ok(sessions.peek().cloned())
    }

    // --- Moderation ---

    pub fn approve(&self, id: &str) -> Result<User> {
        self.engine().moderation().approve(id)
    }

    pub fn reject(&self, id: &str) -> Result<User> {
        self.engine().moderation().reject(id)
    }

    pub fn suspend(&self, id: &str) -> Result<User> {
        self.engine().moderation().suspend(id)
    }

    pub fn reinstate(&self, id: &str) -> Result<User> {
        self.engine().moderation().reinstate(id)
    }

    pub fn ban(&self, id: &str) -> Result<User> {
        self.engine().moderation().ban(id)
    }

    pub fn delete(&self, id: &str) -> Result<Deletion> {
        self.engine().moderation().delete(id)
    }

    pub fn add_user(&self, username: &str, password: &str, role: Role) -> Result<User> {
        require_credentials(username, password)?;
        self.engine()
            .moderation()
            .add_user(self.auth.verifier(), username, password, role)
    }

    pub fn force_logout(&self, id: &str) -> Result<ForceLogout> {
        self.engine().moderation().force_logout(id)
    }

    // --- Read ---

    pub fn list_users(&self) -> Vec<User> {
        self.engine().users.list().to_vec()
    }

    pub fn search_users(&self, query: &str) -> Vec<User> {
        self.engine()
            .users
            .search(query)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn find_user(&self, id: &str) -> Option<User> {
        self.engine().users.find_by_id(id).cloned()
    }

    pub fn user_stats(&self) -> UserStats {
        self.engine().users.stats()
    }
}

fn require_credentials(username: &str, password: &str) -> Result<()> {
    if username.is_empty() || password.is_empty() {
        return Err(Error::InvalidInput(
            "Username and password are required.".into(),
        ));
    }
    Ok(())
}
