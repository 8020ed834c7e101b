//! Replicated apply determinism
//!
//! Two replicas applying the same log must end in identical state, and a
//! replica bootstrapped from a snapshot must continue applying the rest of
//! the log to the same result.

use std::sync::Arc;

use coordkv::{Database, DirEntry, KvStore, Session, SessionStore, StateSnapshot};

/// One replicated log entry
#[derive(Debug, Clone)]
enum Command {
    Register(&'static str),
    Set(&'static str, &'static str),
    Cas(&'static str, u64),
    Delete(&'static str),
    DeleteCas(&'static str, u64),
    DeleteTree(&'static str),
    Lock(&'static str, &'static str),
    Unlock(&'static str, &'static str),
    Reap(u64),
}

struct Replica {
    db: Arc<Database>,
    kv: KvStore,
    sessions: SessionStore,
}

impl Replica {
    fn new() -> Self {
        Self::from_db(Arc::new(Database::new()))
    }

    fn from_db(db: Arc<Database>) -> Self {
        Self {
            kv: KvStore::new(db.clone()),
            sessions: SessionStore::new(db.clone()),
            db,
        }
    }

    fn apply(&self, idx: u64, cmd: &Command) {
        match cmd {
            Command::Register(id) => self.sessions.register(idx, Session::with_id(*id, "node")).unwrap(),
            Command::Set(k, v) => self.kv.set(idx, DirEntry::new(*k, v.as_bytes().to_vec())).unwrap(),
            Command::Cas(k, cidx) => {
                let entry = DirEntry::new(*k, b"cas".to_vec()).with_modify_index(*cidx);
                self.kv.set_cas(idx, entry).unwrap();
            }
            Command::Delete(k) => self.kv.delete(idx, k).unwrap(),
            Command::DeleteCas(k, cidx) => {
                self.kv.delete_cas(idx, *cidx, k).unwrap();
            }
            Command::DeleteTree(p) => self.kv.delete_tree(idx, p).unwrap(),
            Command::Lock(k, s) => {
                self.kv.lock(idx, DirEntry::new(*k, Vec::new()).with_session(*s)).unwrap();
            }
            Command::Unlock(k, s) => {
                self.kv.unlock(idx, DirEntry::new(*k, Vec::new()).with_session(*s)).unwrap();
            }
            Command::Reap(threshold) => {
                self.kv.reap_tombstones(*threshold).unwrap();
            }
        }
    }

    fn apply_log(&self, log: &[(u64, Command)]) {
        for (idx, cmd) in log {
            self.apply(*idx, cmd);
        }
    }
}

fn log() -> Vec<(u64, Command)> {
    use Command::*;
    vec![
        (1, Register("s1")),
        (2, Register("s2")),
        (3, Set("config/a", "1")),
        (4, Set("config/b", "2")),
        (5, Set("config/c/d", "3")),
        (6, Lock("leader", "s1")),
        (7, Lock("leader", "s2")),
        (8, Cas("config/a", 3)),
        (9, Cas("config/a", 3)),
        (10, Delete("config/b")),
        (11, DeleteCas("config/a", 1)),
        (12, Unlock("leader", "s1")),
        (13, Lock("leader", "s2")),
        (14, DeleteTree("config/c/")),
        (15, Set("config/e", "4")),
        (16, Reap(12)),
        (17, Set("jobs/1", "queued")),
        (18, Delete("jobs/1")),
    ]
}

fn assert_same_state(a: &StateSnapshot, b: &StateSnapshot) {
    assert!(a.kvs().eq(b.kvs()), "live entries differ");
    assert!(a.tombstones().eq(b.tombstones()), "tombstones differ");
    assert!(a.sessions().eq(b.sessions()), "sessions differ");
    assert!(a.indexes().eq(b.indexes()), "watermarks differ");
}

#[test]
fn test_replicas_converge() {
    let log = log();
    let a = Replica::new();
    let b = Replica::new();
    a.apply_log(&log);
    b.apply_log(&log);

    assert_same_state(&a.db.snapshot(), &b.db.snapshot());

    let leader = a.kv.get("leader").unwrap().1.unwrap();
    assert_eq!(leader.session.as_deref(), Some("s2"));
    assert_eq!(leader.lock_index, 2);

    let (_, cfg) = a.kv.get("config/a").unwrap();
    let cfg = cfg.unwrap();
    assert_eq!(cfg.value, b"cas");
    assert_eq!(cfg.modify_index, 8);

    // Only the deletes after the reap threshold keep tombstones
    let stones: Vec<(String, u64)> = a
        .db
        .snapshot()
        .tombstones()
        .map(|s| (s.key.clone(), s.index))
        .collect();
    assert_eq!(
        stones,
        vec![("config/c/d".to_string(), 14), ("jobs/1".to_string(), 18)]
    );
}

#[test]
fn test_snapshot_bootstrap_then_catch_up() {
    let log = log();
    let (head, tail) = log.split_at(10);

    let leader = Replica::new();
    leader.apply_log(head);

    let mut stream = Vec::new();
    leader.db.snapshot().persist(&mut stream).unwrap();

    let follower_db = Arc::new(Database::new());
    follower_db.restore_from(&mut stream.as_slice()).unwrap();
    let follower = Replica::from_db(follower_db);

    leader.apply_log(tail);
    follower.apply_log(tail);

    assert_same_state(&leader.db.snapshot(), &follower.db.snapshot());
}

#[test]
fn test_reapplying_a_cas_is_harmless() {
    let a = Replica::new();
    a.apply(1, &Command::Set("k", "v"));
    a.apply(2, &Command::DeleteCas("k", 1));
    // Redelivery of the same command after it applied
    a.apply(2, &Command::DeleteCas("k", 1));

    assert_eq!(a.kv.get("k").unwrap(), (2, None));
    assert!(a.kv.delete_cas(3, 1, "k").unwrap());
}
