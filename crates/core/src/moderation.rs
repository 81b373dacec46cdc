//! Moderation controller
//!
//! Admin operations over account status. Legal transitions:
//!
//! - pending -> active (approve), pending -> banned (reject)
//! - active -> suspended (suspend), suspended -> active (reinstate)
//! - active | suspended -> banned (ban)
//! - any -> removed (delete), clearing the session first if it belongs to the user
//!
//! Anything else fails with [`Error::InvalidTransition`].

use tracing::{info, instrument, warn};

use crate::credentials::CredentialVerifier;
use crate::error::{Error, Result};
use crate::models::{ModerationAction, Role, User, UserPatch, UserStatus};
use crate::repository::UserRepository;
use crate::session::SessionManager;

/// Result of a forced logout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForceLogout {
    /// Targeted user's name, or the id itself if no such user exists
    pub username: String,
    /// Whether the current session belonged to the user and was cleared
    pub session_cleared: bool,
}

/// Result of deleting an account
#[derive(Debug, Clone, PartialEq)]
pub struct Deletion {
    pub user: User,
    pub session_cleared: bool,
}

/// Borrowed view over the repository and session manager for one admin action
pub struct Moderation<'a> {
    users: &'a mut UserRepository,
    sessions: &'a mut SessionManager,
}

impl<'a> Moderation<'a> {
    pub fn new(users: &'a mut UserRepository, sessions: &'a mut SessionManager) -> Self {
        Self { users, sessions }
    }

    /// Apply a status transition from the table
    #[instrument(skip(self))]
    pub fn transition(&mut self, id: &str, action: ModerationAction) -> Result<User> {
        let user = self
            .users
            .find_by_id(id)
            .ok_or_else(|| Error::UserNotFound(id.to_string()))?;

        let from = user.status;
        let to = from.apply(action).ok_or_else(|| Error::InvalidTransition {
            id: id.to_string(),
            from,
            action,
        })?;

        let updated = self.users.update(id, UserPatch::status(to))?;
        info!(%from, %to, "Account status changed");
        Ok(updated)
    }

    pub fn approve(&mut self, id: &str) -> Result<User> {
        self.transition(id, ModerationAction::Approve)
    }

    pub fn reject(&mut self, id: &str) -> Result<User> {
        self.transition(id, ModerationAction::Reject)
    }

    pub fn suspend(&mut self, id: &str) -> Result<User> {
        self.transition(id, ModerationAction::Suspend)
    }

    pub fn reinstate(&mut self, id: &str) -> Result<User> {
        self.transition(id, ModerationAction::Reinstate)
    }

    pub fn ban(&mut self, id: &str) -> Result<User> {
        self.transition(id, ModerationAction::Ban)
    }

    /// Remove an account for good; its session is cleared before the record goes
    #[instrument(skip(self))]
    pub fn delete(&mut self, id: &str) -> Result<Deletion> {
        if self.users.find_by_id(id).is_none() {
            return Err(Error::UserNotFound(id.to_string()));
        }

        let previous = self.sessions.peek().cloned();
        let session_cleared = self.sessions.force_logout(id)?;
        let user = match self.users.delete(id) {
            Ok(user) => user,
            Err(e) => {
                if session_cleared {
                    if let Err(restore) = self.sessions.restore(previous) {
                        warn!(error = %restore, "Could not restore session after failed delete");
                    }
                }
                return Err(e);
            }
        };

        info!(username = %user.username, session_cleared, "Account deleted");
        Ok(Deletion {
            user,
            session_cleared,
        })
    }

    /// Create an account that skips the approval queue
    #[instrument(skip(self, verifier, password))]
    pub fn add_user(
        &mut self,
        verifier: &dyn CredentialVerifier,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<User> {
        if self.users.find_by_username(username).is_some() {
            return Err(Error::DuplicateUsername(username.to_string()));
        }

        let secret = verifier.seal(password)?;
        let user = self.users.create(User::new(
            username.to_string(),
            secret,
            UserStatus::Active,
            role,
        ))?;

        info!(%role, "Account added and approved");
        Ok(user)
    }

    /// End the user's session if it is the current one; never fails for lack of a session
    #[instrument(skip(self))]
    pub fn force_logout(&mut self, id: &str) -> Result<ForceLogout> {
        let username = self
            .users
            .find_by_id(id)
            .map(|u| u.username.clone())
            .unwrap_or_else(|| id.to_string());

        let session_cleared = self.sessions.force_logout(id)?;
        info!(%username, session_cleared, "Forced logout");

        Ok(ForceLogout {
            username,
            session_cleared,
        })
    }
}
