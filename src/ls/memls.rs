//! Ephemeral in-memory lock system.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use rand::RngCore;

use crate::davpath::DavPath;
use crate::fs::Depth;
use crate::ls::{is_ancestor_or_self, DavLock, DavLockSystem, LockError, LockScope};

/// In-memory lock table. Locks are lost on restart, which is fine per
/// spec.md §6 ("the core has ... no persistent state of its own").
pub struct MemLs {
    locks: Mutex<Vec<DavLock>>,
}

impl MemLs {
    pub fn new() -> Arc<MemLs> {
        Arc::new(MemLs {
            locks: Mutex::new(Vec::new()),
        })
    }
}

fn new_token() -> String {
    let mut bytes = [0u8; 16]; // 128 random bits, per spec.md lock invariant.
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Do two locked paths/depths overlap at all (ignoring scope)?
fn overlaps(a_path: &[String], a_depth: Depth, b_path: &[String], b_depth: Depth) -> bool {
    if a_path == b_path {
        return true;
    }
    if a_depth == Depth::Infinity && is_ancestor_or_self(a_path, b_path) {
        return true;
    }
    if b_depth == Depth::Infinity && is_ancestor_or_self(b_path, a_path) {
        return true;
    }
    false
}

impl DavLockSystem for MemLs {
    fn lock(
        &self,
        path: &DavPath,
        scope: LockScope,
        depth: Depth,
        timeout: Duration,
        owner: Option<String>,
    ) -> Result<DavLock, LockError> {
        let now = SystemTime::now();
        let mut locks = self.locks.lock().unwrap();
        locks.retain(|l| !l.is_expired(now));

        let segments = path.segments().to_vec();
        let conflicts = locks.iter().any(|l| {
            overlaps(&l.path, l.depth, &segments, depth)
                && (l.scope == LockScope::Exclusive || scope == LockScope::Exclusive)
        });
        if conflicts {
            return Err(LockError::Conflict);
        }

        let lock = DavLock {
            token: new_token(),
            path: segments,
            depth,
            scope,
            owner,
            timeout_seconds: timeout.as_secs() as u32,
            expires_at: now + timeout,
        };
        locks.push(lock.clone());
        Ok(lock)
    }

    fn unlock(&self, path: &DavPath, token: &str) -> Result<(), LockError> {
        let now = SystemTime::now();
        let mut locks = self.locks.lock().unwrap();
        locks.retain(|l| !l.is_expired(now));

        let segments = path.segments().to_vec();
        let pos = locks.iter().position(|l| {
            l.token == token && is_ancestor_or_self(&l.path, &segments)
        });
        match pos {
            Some(i) => {
                locks.remove(i);
                Ok(())
            }
            None => Err(LockError::NoSuchLock),
        }
    }

    fn check(&self, path: &DavPath, tokens: &[&str]) -> Result<(), LockError> {
        let now = SystemTime::now();
        let mut locks = self.locks.lock().unwrap();
        locks.retain(|l| !l.is_expired(now));

        let segments = path.segments().to_vec();
        let covering = locks
            .iter()
            .filter(|l| is_ancestor_or_self(&l.path, &segments) || l.path == segments);
        for lock in covering {
            if !tokens.contains(&lock.token.as_str()) {
                return Err(LockError::Conflict);
            }
        }
        Ok(())
    }

    fn refresh(&self, token: &str, timeout: Duration) -> Result<DavLock, LockError> {
        let now = SystemTime::now();
        let mut locks = self.locks.lock().unwrap();
        locks.retain(|l| !l.is_expired(now));
        match locks.iter_mut().find(|l| l.token == token) {
            Some(l) => {
                l.timeout_seconds = timeout.as_secs() as u32;
                l.expires_at = now + timeout;
                Ok(l.clone())
            }
            None => Err(LockError::NoSuchLock),
        }
    }

    fn discover(&self, path: &DavPath) -> Vec<DavLock> {
        let now = SystemTime::now();
        let mut locks = self.locks.lock().unwrap();
        locks.retain(|l| !l.is_expired(now));
        let segments = path.segments().to_vec();
        locks
            .iter()
            .filter(|l| is_ancestor_or_self(&l.path, &segments) || l.path == segments)
            .cloned()
            .collect()
    }

    fn delete_locks(&self, path: &DavPath) {
        let segments = path.segments().to_vec();
        let mut locks = self.locks.lock().unwrap();
        locks.retain(|l| !is_ancestor_or_self(&segments, &l.path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::davpath::DavPath;

    fn path(s: &str) -> DavPath {
        DavPath::from_str_and_prefix(s, "").unwrap()
    }

    #[test]
    fn exclusive_depth0_conflicts_on_same_path_only() {
        let ls = MemLs::new();
        let a = path("/a/");
        ls.lock(
            &a,
            LockScope::Exclusive,
            Depth::Zero,
            Duration::from_secs(60),
            None,
        )
        .unwrap();
        let sibling = path("/a/b");
        // same path conflicts
        assert!(ls
            .lock(&a, LockScope::Exclusive, Depth::Zero, Duration::from_secs(60), None)
            .is_err());
        // depth-0 exclusive does not cover children
        assert!(ls
            .lock(
                &sibling,
                LockScope::Exclusive,
                Depth::Zero,
                Duration::from_secs(60),
                None
            )
            .is_ok());
    }

    #[test]
    fn exclusive_infinity_covers_descendants() {
        let ls = MemLs::new();
        let a = path("/a/");
        ls.lock(
            &a,
            LockScope::Exclusive,
            Depth::Infinity,
            Duration::from_secs(60),
            None,
        )
        .unwrap();
        let child = path("/a/b");
        assert!(ls
            .lock(
                &child,
                LockScope::Shared,
                Depth::Zero,
                Duration::from_secs(60),
                None
            )
            .is_err());
    }

    #[test]
    fn shared_locks_do_not_conflict_with_each_other() {
        let ls = MemLs::new();
        let a = path("/a/");
        ls.lock(
            &a,
            LockScope::Shared,
            Depth::Zero,
            Duration::from_secs(60),
            None,
        )
        .unwrap();
        assert!(ls
            .lock(&a, LockScope::Shared, Depth::Zero, Duration::from_secs(60), None)
            .is_ok());
    }

    #[test]
    fn mutation_without_token_fails_check() {
        let ls = MemLs::new();
        let a = path("/a/");
        let lock = ls
            .lock(
                &a,
                LockScope::Exclusive,
                Depth::Infinity,
                Duration::from_secs(60),
                None,
            )
            .unwrap();
        let child = path("/a/g");
        assert!(ls.check(&child, &[]).is_err());
        assert!(ls.check(&child, &[lock.token.as_str()]).is_ok());
    }

    #[test]
    fn unlock_then_check_passes() {
        let ls = MemLs::new();
        let a = path("/a/");
        let lock = ls
            .lock(
                &a,
                LockScope::Exclusive,
                Depth::Infinity,
                Duration::from_secs(60),
                None,
            )
            .unwrap();
        ls.unlock(&a, &lock.token).unwrap();
        assert!(ls.check(&path("/a/g"), &[]).is_ok());
    }

    #[test]
    fn delete_cascades_locks() {
        let ls = MemLs::new();
        let a = path("/a/");
        ls.lock(
            &a,
            LockScope::Exclusive,
            Depth::Infinity,
            Duration::from_secs(60),
            None,
        )
        .unwrap();
        ls.delete_locks(&a);
        assert!(ls.check(&path("/a/g"), &[]).is_ok());
    }

    #[test]
    fn expired_locks_are_treated_as_absent() {
        let ls = MemLs::new();
        let a = path("/a/");
        ls.lock(
            &a,
            LockScope::Exclusive,
            Depth::Zero,
            Duration::from_secs(0),
            None,
        )
        .unwrap();
        // timeout of 0 means expires_at == now, already expired.
        std::thread::sleep(Duration::from_millis(5));
        assert!(ls
            .lock(&a, LockScope::Exclusive, Depth::Zero, Duration::from_secs(60), None)
            .is_ok());
    }
}
