//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use std::collections::HashSet;

use crate::models::{Session, User};

/// Validate a user collection: unique usernames, id mirrors username
pub fn assert_user_collection_invariants(users: &[User]) {
    if !cfg!(debug_assertions) {
        return;
    }

    let mut seen = HashSet::with_capacity(users.len());
    for user in users {
        debug_assert!(
            seen.insert(user.username.as_str()),
            "Duplicate username '{}' in user collection",
            user.username
        );

        debug_assert!(
            user.id == user.username,
            "User id '{}' does not match username '{}'",
            user.id,
            user.username
        );

        debug_assert!(
            !user.username.is_empty(),
            "User with empty username in collection"
        );
    }
}

/// Validate that a session about to be reported as live is authenticated
pub fn assert_session_authenticated(session: &Session, users: &[User]) {
    debug_assert!(
        users.iter().any(|u| u.id == session.id && u.is_active()),
        "Session for '{}' reported live but its user is missing or not active",
        session.id
    );
}
