//! Per declaration resolution locks.
//!
//! A lock is owned by a request, not a thread. Before a request blocks on a
//! lock owned by another request, the chain of requests waiting on each other
//! is followed. If it leads back to the blocking request the acquisition fails
//! with the cycle instead of deadlocking.
//!
//! A waiter only needs the node to reach some phase, not the lock itself. A
//! wait whose node already got there is no edge of the chain, and the waiter
//! leaves without taking the lock.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
};

use log::trace;

use crate::id::{DeclarationId, RequestId, SessionId};

/// A declaration within the session that owns its node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub session: SessionId,
    pub id: DeclarationId,
}

impl NodeKey {
    pub fn new(session: SessionId, id: DeclarationId) -> Self {
        Self { session, id }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.session)
    }
}

/// Whether the node a request waits on already reached the phase it needs.
pub type Satisfied = Arc<dyn Fn() -> bool + Send + Sync>;

struct Wait {
    key: NodeKey,
    satisfied: Satisfied,
}

impl fmt::Debug for Wait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wait")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct LockState {
    owners: HashMap<NodeKey, RequestId>,
    waiting: HashMap<RequestId, Wait>,
}

#[derive(Debug, Default)]
pub struct LockTable {
    state: Mutex<LockState>,
    released: Condvar,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until `request` owns `key`, or until `satisfied` holds while
    /// another request owns it. The latter yields `None`.
    ///
    /// Fails with the declarations along the wait cycle when waiting would
    /// never end. The first entry is `key` itself.
    pub fn acquire(
        &self,
        key: NodeKey,
        request: RequestId,
        satisfied: impl Fn() -> bool + Send + Sync + 'static,
    ) -> Result<Option<NodeLockGuard<'_>>, Vec<DeclarationId>> {
        let satisfied: Satisfied = Arc::new(satisfied);
        let mut state = self.lock();

        loop {
            let owner = match state.owners.get(&key) {
                None => {
                    state.waiting.remove(&request);
                    state.owners.insert(key.clone(), request);

                    return Ok(Some(NodeLockGuard {
                        table: self,
                        key,
                        request,
                    }));
                }
                Some(owner) => *owner,
            };

            if satisfied() {
                state.waiting.remove(&request);
                return Ok(None);
            }

            if let Some(cycle) = Self::wait_cycle(&state, &key, owner, request) {
                state.waiting.remove(&request);
                return Err(cycle);
            }

            trace!("Request {request} waits on {key} owned by {owner}");

            state.waiting.insert(
                request,
                Wait {
                    key: key.clone(),
                    satisfied: satisfied.clone(),
                },
            );
            state = self
                .released
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn wait_cycle(
        state: &LockState,
        key: &NodeKey,
        owner: RequestId,
        request: RequestId,
    ) -> Option<Vec<DeclarationId>> {
        let mut path = vec![key.id.clone()];
        let mut seen = HashSet::new();
        let mut current = owner;

        loop {
            if current == request {
                return Some(path);
            }

            if !seen.insert(current) {
                return None;
            }

            let wait = state.waiting.get(&current)?;
            if (wait.satisfied)() {
                return None;
            }

            path.push(wait.key.id.clone());
            current = *state.owners.get(&wait.key)?;
        }
    }

    pub fn is_locked(&self, key: &NodeKey) -> bool {
        self.lock().owners.contains_key(key)
    }

    fn release(&self, key: &NodeKey, request: RequestId) {
        let mut state = self.lock();

        if state.owners.get(key) == Some(&request) {
            state.owners.remove(key);
        }

        drop(state);
        self.released.notify_all();
    }

    fn lock(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Proof that a request owns the resolution lock of one node.
#[derive(Debug)]
pub struct NodeLockGuard<'a> {
    table: &'a LockTable,
    key: NodeKey,
    request: RequestId,
}

impl NodeLockGuard<'_> {
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    pub fn request(&self) -> RequestId {
        self.request
    }
}

impl Drop for NodeLockGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.key, self.request);
    }
}
