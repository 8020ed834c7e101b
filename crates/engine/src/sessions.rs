//! SessionStore: registry of lock-holder identities
//!
//! Sessions live in their own table inside the same transactional root as
//! the key/value data, so the existence check made by `KvStore::lock` and
//! the lock write happen against one consistent view.

use std::sync::Arc;

use tracing::{debug, info};

use coordkv_core::{Error, Result, Session, TABLE_SESSIONS};

use crate::database::Database;

/// Session registry facade
#[derive(Clone)]
pub struct SessionStore {
    db: Arc<Database>,
}

impl SessionStore {
    /// Create new SessionStore instance
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Register (or replace) a session at log index `idx`
    pub fn register(&self, idx: u64, mut session: Session) -> Result<()> {
        if session.id.is_empty() {
            return Err(Error::MissingSession);
        }
        session.create_index = idx;

        let mut txn = self.db.begin_write();
        let tables = txn.tables_mut();
        tables.sessions.insert(session.id.clone(), session.clone());
        tables.bump_index(TABLE_SESSIONS, idx);
        txn.commit();

        info!(target: "coordkv::sessions", id = %session.id, node = %session.node, index = idx, "Session registered");
        Ok(())
    }

    /// Look up a session, returning the sessions watermark alongside it
    pub fn get(&self, id: &str) -> Result<(u64, Option<Session>)> {
        let txn = self.db.begin_read();
        let tables = txn.tables();
        Ok((tables.index(TABLE_SESSIONS), tables.sessions.get(id).cloned()))
    }

    /// All sessions, ordered by id
    pub fn list(&self) -> Result<(u64, Vec<Session>)> {
        let txn = self.db.begin_read();
        let tables = txn.tables();
        let sessions = tables.sessions.iter().map(|(_, s)| s.clone()).collect();
        Ok((tables.index(TABLE_SESSIONS), sessions))
    }

    /// Remove a session; returns whether it existed
    ///
    /// Locks held by the session are left in place.
    pub fn destroy(&self, idx: u64, id: &str) -> Result<bool> {
        let mut txn = self.db.begin_write();
        let tables = txn.tables_mut();
        if tables.sessions.remove(id).is_none() {
            debug!(target: "coordkv::sessions", id, "Destroy of unknown session");
            return Ok(false);
        }
        tables.bump_index(TABLE_SESSIONS, idx);
        txn.commit();

        info!(target: "coordkv::sessions", id, index = idx, "Session destroyed");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> SessionStore {
        SessionStore::new(Arc::new(Database::new()))
    }

    #[test]
    fn test_register_and_get() {
        let store = setup();
        store.register(7, Session::with_id("abc", "node1")).unwrap();

        let (idx, session) = store.get("abc").unwrap();
        let session = session.unwrap();
        assert_eq!(idx, 7);
        assert_eq!(session.node, "node1");
        assert_eq!(session.create_index, 7);
    }

    #[test]
    fn test_register_rejects_empty_id() {
        let store = setup();
        let err = store.register(1, Session::with_id("", "node1")).unwrap_err();
        assert!(matches!(err, Error::MissingSession));
        assert_eq!(store.list().unwrap(), (0, Vec::new()));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let store = setup();
        let a = Session::new("node1");
        let b = Session::new("node1");
        assert_ne!(a.id, b.id);
        store.register(1, a).unwrap();
        store.register(2, b).unwrap();
        assert_eq!(store.list().unwrap().1.len(), 2);
    }

    #[test]
    fn test_list_is_ordered() {
        let store = setup();
        store.register(1, Session::with_id("b", "n")).unwrap();
        store.register(2, Session::with_id("a", "n")).unwrap();
        let (idx, sessions) = store.list().unwrap();
        let ids: Vec<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(idx, 2);
    }

    #[test]
    fn test_destroy() {
        let store = setup();
        store.register(1, Session::with_id("a", "n")).unwrap();
        assert!(store.destroy(2, "a").unwrap());
        assert!(!store.destroy(3, "a").unwrap());
        assert_eq!(store.get("a").unwrap(), (2, None));
    }
}
