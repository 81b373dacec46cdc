//! User repository
//!
//! In-memory user collection that writes through to the durable store.
//! Every mutation builds the next collection, persists it, and only then
//! swaps it in, so a failed write leaves memory exactly as it was.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::instrument;

use crate::error::{Error, Result, StoreError, StoreResult};
use crate::invariants::assert_user_collection_invariants;
use crate::models::{User, UserPatch, UserStats};
use crate::storage::DurableStore;

pub struct UserRepository {
    users: Vec<User>,
    store: Arc<dyn DurableStore>,
}

impl UserRepository {
    /// Wrap a collection built in-process
    pub fn new(users: Vec<User>, store: Arc<dyn DurableStore>) -> Self {
        Self { users, store }
    }

    /// Wrap a collection read back from the store, refusing one that breaks identity rules
    pub fn hydrate(users: Vec<User>, store: Arc<dyn DurableStore>) -> Result<Self> {
        if let Err(e) = check_loaded(&users) {
            tracing::error!(error = %e, "Refusing stored user collection");
            return Err(e.into());
        }
        Ok(Self::new(users, store))
    }

    /// Insert a new user; usernames are unique and case-sensitive
    #[instrument(skip(self, candidate), fields(username = %candidate.username))]
    pub fn create(&mut self, candidate: User) -> Result<User> {
        if self.find_by_username(&candidate.username).is_some() {
            return Err(Error::DuplicateUsername(candidate.username));
        }

        let mut next = self.users.clone();
        next.push(candidate.clone());
        self.commit(next)?;
        Ok(candidate)
    }

    pub fn find_by_username(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Merge `patch` into the user with `id`
    #[instrument(skip(self, patch))]
    pub fn update(&mut self, id: &str, patch: UserPatch) -> Result<User> {
        let index = self.index_of(id)?;

        let mut next = self.users.clone();
        next[index].apply_patch(patch);
        let updated = next[index].clone();
        self.commit(next)?;
        Ok(updated)
    }

    /// Remove the user with `id` permanently
    #[instrument(skip(self))]
    pub fn delete(&mut self, id: &str) -> Result<User> {
        let index = self.index_of(id)?;

        let mut next = self.users.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        Ok(removed)
    }

    /// All users in insertion order
    pub fn list(&self) -> &[User] {
        &self.users
    }

    /// Users whose name contains `query`, ignoring case
    pub fn search(&self, query: &str) -> Vec<&User> {
        let needle = query.to_lowercase();
        self.users
            .iter()
            .filter(|u| u.username.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn stats(&self) -> UserStats {
        UserStats::from_users(&self.users)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.users
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| Error::UserNotFound(id.to_string()))
    }

    fn commit(&mut self, next: Vec<User>) -> Result<()> {
        assert_user_collection_invariants(&next);

        if let Err(e) = self.store.save_users(&next) {
            tracing::error!(error = %e, "Failed to persist users, keeping previous state");
            return Err(e.into());
        }

        self.users = next;
        Ok(())
    }
}

/// Usernames non-empty and unique, ids equal to usernames
fn check_loaded(users: &[User]) -> StoreResult<()> {
    let mut seen = HashSet::with_capacity(users.len());
    for user in users {
        if user.username.is_empty() {
            return Err(StoreError::Corrupt("user with empty username".into()));
        }
        if user.id != user.username {
            return Err(StoreError::Corrupt(format!(
                "user id '{}' does not match username '{}'",
                user.id, user.username
            )));
        }
        if !seen.insert(user.username.as_str()) {
            return Err(StoreError::Corrupt(format!(
                "duplicate username '{}'",
                user.username
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::{Role, UserStatus};
    use crate::storage::MemoryStore;

    fn setup() -> (Arc<MemoryStore>, UserRepository) {
        let store = Arc::new(MemoryStore::new());
        let repo = UserRepository::new(Vec::new(), store.clone());
        (store, repo)
    }

    fn user(name: &str) -> User {
        User::new(name.into(), "pw".into(), UserStatus::Active, Role::User)
    }

    #[test]
    fn test_create_and_find() {
        let (store, mut repo) = setup();
        repo.create(user("alice")).unwrap();

        assert_eq!(repo.find_by_username("alice").unwrap().id, "alice");
        assert_eq!(repo.find_by_id("alice").unwrap().username, "alice");
        assert!(repo.find_by_username("bob").is_none());
        assert!(repo.find_by_id("bob").is_none());

        let persisted = store.load().unwrap().users.unwrap();
        assert_eq!(persisted.len(), 1);
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let (_, mut repo) = setup();
        repo.create(user("alice")).unwrap();

        let err = repo.create(user("alice")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateUsername);
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_username_match_is_case_sensitive() {
        let (_, mut repo) = setup();
        repo.create(user("alice")).unwrap();
        repo.create(user("Alice")).unwrap();

        assert_eq!(repo.len(), 2);
        assert!(repo.find_by_username("ALICE").is_none());
    }

    #[test]
    fn test_list_keeps_insertion_order() {
        let (_, mut repo) = setup();
        for name in ["zed", "amy", "mike"] {
            repo.create(user(name)).unwrap();
        }

        let names: Vec<_> = repo.list().iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["zed", "amy", "mike"]);
    }

    #[test]
    fn test_update_merges_and_persists() {
        let (store, mut repo) = setup();
        repo.create(user("alice")).unwrap();

        let updated = repo
            .update("alice", UserPatch::status(UserStatus::Suspended))
            .unwrap();
        assert_eq!(updated.status, UserStatus::Suspended);
        assert_eq!(updated.email, "alice@example.com");

        let persisted = store.load().unwrap().users.unwrap();
        assert_eq!(persisted[0].status, UserStatus::Suspended);
    }

    #[test]
    fn test_update_and_delete_missing() {
        let (_, mut repo) = setup();
        let err = repo.update("ghost", UserPatch::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserNotFound);

        let err = repo.delete("ghost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserNotFound);
    }

    #[test]
    fn test_delete_removes_permanently() {
        let (store, mut repo) = setup();
        repo.create(user("alice")).unwrap();
        repo.create(user("bob")).unwrap();

        let removed = repo.delete("alice").unwrap();
        assert_eq!(removed.username, "alice");
        assert!(repo.find_by_id("alice").is_none());
        assert_eq!(store.load().unwrap().users.unwrap().len(), 1);

        // Name is free again
        repo.create(user("alice")).unwrap();
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let (store, mut repo) = setup();
        repo.create(user("alice")).unwrap();
        store.set_read_only(true);

        let err = repo.create(user("bob")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
        assert!(repo.find_by_username("bob").is_none());

        let err = repo
            .update("alice", UserPatch::status(UserStatus::Banned))
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(repo.find_by_id("alice").unwrap().status, UserStatus::Active);

        repo.delete("alice").unwrap_err();
        assert!(repo.find_by_id("alice").is_some());

        store.set_read_only(false);
        repo.create(user("bob")).unwrap();
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_hydrate_rejects_broken_collections() {
        let store = Arc::new(MemoryStore::new());

        let err = UserRepository::hydrate(vec![user("bob"), user("bob")], store.clone())
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::PersistenceFailure);
        assert!(matches!(err, Error::PersistenceFailure(StoreError::Corrupt(_))));

        let mut renamed = user("john_doe");
        renamed.id = "user1".into();
        let err = UserRepository::hydrate(vec![renamed], store.clone()).err().unwrap();
        assert!(matches!(err, Error::PersistenceFailure(StoreError::Corrupt(_))));

        let repo = UserRepository::hydrate(vec![user("alice"), user("bob")], store).unwrap();
        assert_eq!(repo.len(), 2);
    }

    #[test]
    fn test_search_ignores_case() {
        let (_, mut repo) = setup();
        for name in ["john_doe", "jane_smith", "JOHNNY"] {
            repo.create(user(name)).unwrap();
        }

        let found: Vec<_> = repo.search("john").iter().map(|u| u.username.clone()).collect();
        assert_eq!(found, vec!["john_doe", "JOHNNY"]);
        assert_eq!(repo.search("").len(), 3);
        assert!(repo.search("zzz").is_empty());
    }
}
