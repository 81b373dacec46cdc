//! JSON file backend
//!
//! One `<key>.json` file per record inside a directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::instrument;

use super::KeyValueStore;
use crate::error::StoreResult;

/// Directory of JSON record files
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store directory, creating it if needed
    pub fn open(dir: PathBuf) -> StoreResult<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match fs::read_to_string(self.record_path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Written to a temporary sibling, synced, then renamed over the record
    #[instrument(skip(self, value), fields(dir = %self.dir.display()))]
    fn put(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.record_path(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));

        let mut file = fs::File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &path)?;
        Ok(())
    }

    #[instrument(skip(self), fields(dir = %self.dir.display()))]
    fn remove(&self, key: &str) -> StoreResult<()> {
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, Session, User, UserStatus};
    use crate::storage::{DurableStore, SESSION_KEY};
    use tempfile::tempdir;

    #[test]
    fn test_record_files() {
        let dir = tempdir().unwrap();
        let store = FileStore::open(dir.path().join("store")).unwrap();

        let user = User::new("bob".into(), "pw".into(), UserStatus::Active, Role::User);
        store.save_users(std::slice::from_ref(&user)).unwrap();
        store.save_session(Some(&Session::for_user(&user))).unwrap();

        assert!(store.dir().join("offchat-users.json").exists());
        assert!(store.dir().join("offchat-current-user.json").exists());
        assert!(!store.dir().join(".offchat-users.json.tmp").exists());

        store.save_session(None).unwrap();
        assert!(store.get(SESSION_KEY).unwrap().is_none());
        assert!(!store.dir().join("offchat-current-user.json").exists());
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store");

        {
            let store = FileStore::open(path.clone()).unwrap();
            store.put("k", "v1").unwrap();
            store.put("k", "v2").unwrap();
        }

        let store = FileStore::open(path).unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        assert!(store.get("missing").unwrap().is_none());
    }
}
