//! Thread-safe handle: one writer mutates the reactor, readers take consistent
//! owned views.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::reactor::{Reactor, ReactorStatistics};
use crate::core::snapshot::{ChainRecord, WorldSnapshot};
use crate::core::token::ChainId;

#[derive(Debug, Clone, Default)]
pub struct SharedReactor {
    inner: Arc<RwLock<Reactor>>,
}

impl SharedReactor {
    pub fn new(reactor: Reactor) -> Self {
        Self { inner: Arc::new(RwLock::new(reactor)) }
    }

    // A panicked writer leaves the last fully applied state behind; keep serving it.
    fn read_guard(&self) -> RwLockReadGuard<'_, Reactor> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Reactor> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn read<R>(&self, f: impl FnOnce(&Reactor) -> R) -> R {
        let guard = self.read_guard();
        f(&*guard)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut Reactor) -> R) -> R {
        let mut guard = self.write_guard();
        f(&mut *guard)
    }

    pub fn statistics(&self) -> ReactorStatistics {
        self.read(|r| r.statistics())
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        self.read(|r| r.snapshot())
    }

    pub fn all_chains(&self) -> Vec<ChainRecord> {
        self.read(|r| {
            r.chains()
                .iter()
                .map(|c| ChainRecord::from_chain(c, r.tokens()))
                .collect()
        })
    }

    pub fn chains_by_stability(&self) -> Vec<ChainRecord> {
        self.read(|r| {
            r.chains()
                .chains_by_stability()
                .into_iter()
                .map(|c| ChainRecord::from_chain(c, r.tokens()))
                .collect()
        })
    }

    pub fn chain(&self, id: ChainId) -> Option<ChainRecord> {
        self.read(|r| r.chains().get_chain(id).map(|c| ChainRecord::from_chain(c, r.tokens())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn readers_see_whole_updates() {
        let shared = SharedReactor::default();
        let writer = shared.clone();
        let handle = thread::spawn(move || {
            for i in 0..20u64 {
                writer.write(|r| {
                    let a = r.spawn_token("x", 100);
                    let b = r.spawn_token("=", 100);
                    r.attempt_bond(a, b, i);
                });
            }
        });
        for _ in 0..20 {
            for c in shared.all_chains() {
                assert_eq!(c.length, c.members.len());
            }
        }
        handle.join().unwrap();
        let stats = shared.statistics();
        assert_eq!(stats.tokens, 40);
        assert_eq!(stats.chains.total_chains, 20);
    }
}
