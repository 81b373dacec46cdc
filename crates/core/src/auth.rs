//! Login and signup
//!
//! Status checks always run before the credential check, so a pending,
//! banned or suspended account never reveals whether a password was right.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::credentials::CredentialVerifier;
use crate::error::{Error, Result};
use crate::models::{Role, Session, User, UserStatus};
use crate::repository::UserRepository;
use crate::session::SessionManager;

pub struct AuthService {
    verifier: Arc<dyn CredentialVerifier>,
}

impl AuthService {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &dyn CredentialVerifier {
        self.verifier.as_ref()
    }

    /// Check a login attempt without touching session state
    pub fn authenticate<'a>(
        &self,
        users: &'a UserRepository,
        username: &str,
        password: &str,
    ) -> Result<&'a User> {
        let user = users
            .find_by_username(username)
            .ok_or_else(|| Error::UserNotFound(username.to_string()))?;

        match user.status {
            UserStatus::Pending => return Err(Error::AccountPending),
            UserStatus::Banned => return Err(Error::AccountBanned),
            UserStatus::Suspended => return Err(Error::AccountSuspended),
            UserStatus::Active => {}
        }

        if !self.verifier.verify(&user.password_secret, password) {
            return Err(Error::IncorrectPassword);
        }

        Ok(user)
    }

    /// Authenticate and make the user the current session
    #[instrument(skip(self, users, sessions, password))]
    pub fn login(
        &self,
        users: &UserRepository,
        sessions: &mut SessionManager,
        username: &str,
        password: &str,
    ) -> Result<Session> {
        let user = match self.authenticate(users, username, password) {
            Ok(user) => user,
            Err(e) => {
                warn!(reason = ?e.kind(), "Login rejected");
                return Err(e);
            }
        };

        sessions.establish(Session::for_user(user))
    }

    /// Register a pending account; no session is created
    #[instrument(skip(self, users, password))]
    pub fn signup(
        &self,
        users: &mut UserRepository,
        username: &str,
        password: &str,
    ) -> Result<User> {
        if users.find_by_username(username).is_some() {
            return Err(Error::DuplicateUsername(username.to_string()));
        }

        let secret = self.verifier.seal(password)?;
        let user = users.create(User::new(
            username.to_string(),
            secret,
            UserStatus::Pending,
            Role::User,
        ))?;

        info!("Account created, waiting for approval");
        Ok(user)
    }
}
