//! Modification trackers and the controller that turns tracker movement into
//! session invalidation.
//!
//! Invalidation is lazy. The controller only bumps a session generation and
//! clears its caches. Nodes notice the new generation the next time they are
//! read and reset themselves then.

use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use dashmap::DashMap;
use log::debug;

use crate::{
    id::{ModuleId, SessionId},
    language::Language,
    session::{InvalidationScope, ModuleResolutionSession},
};

/// A counter that only ever grows. Any change means "something was modified".
pub trait ModificationTracker: Debug + Send + Sync {
    fn modification_count(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct SimpleModificationTracker(AtomicU64);

impl SimpleModificationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl ModificationTracker for SimpleModificationTracker {
    fn modification_count(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Changes whenever any of its parts changes.
#[derive(Debug, Default, Clone)]
pub struct CompositeModificationTracker {
    parts: Vec<Arc<dyn ModificationTracker>>,
}

impl CompositeModificationTracker {
    pub fn new(parts: impl IntoIterator<Item = Arc<dyn ModificationTracker>>) -> Self {
        Self {
            parts: parts.into_iter().collect(),
        }
    }

    pub fn push(&mut self, part: Arc<dyn ModificationTracker>) {
        self.parts.push(part);
    }
}

impl ModificationTracker for CompositeModificationTracker {
    fn modification_count(&self) -> u64 {
        self.parts
            .iter()
            .map(|part| part.modification_count())
            .fold(0, u64::wrapping_add)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NeverChangedTracker;

impl ModificationTracker for NeverChangedTracker {
    fn modification_count(&self) -> u64 {
        0
    }
}

/// Hands out the trackers of the editing or build collaborator.
pub trait ModificationTrackerSource: Send + Sync {
    /// Moves whenever the content of `module`, or of anything it sees, changes.
    fn content_tracker(&self, module: ModuleId) -> Arc<dyn ModificationTracker>;

    /// Moves whenever the set of files or modules changes.
    fn structure_tracker(&self) -> Arc<dyn ModificationTracker>;
}

#[derive(Debug)]
struct TrackedSession {
    content: Arc<dyn ModificationTracker>,
    structure: Arc<dyn ModificationTracker>,
    seen_content: u64,
    seen_structure: u64,
}

/// Last observed tracker values per session.
#[derive(Debug, Default)]
pub struct InvalidationController {
    sessions: DashMap<SessionId, TrackedSession>,
}

impl InvalidationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts watching `session`. Immutable sessions are never watched.
    pub fn register<L: Language>(
        &self,
        session: &ModuleResolutionSession<L>,
        content: Arc<dyn ModificationTracker>,
        structure: Arc<dyn ModificationTracker>,
    ) {
        if !session.kind().is_mutable() {
            return;
        }

        let tracked = TrackedSession {
            seen_content: content.modification_count(),
            seen_structure: structure.modification_count(),
            content,
            structure,
        };

        self.sessions.insert(session.id(), tracked);
    }

    /// Watches `session` with the trackers of `source`.
    pub fn register_from<L: Language>(
        &self,
        session: &ModuleResolutionSession<L>,
        source: &dyn ModificationTrackerSource,
    ) {
        self.register(
            session,
            source.content_tracker(session.module()),
            source.structure_tracker(),
        );
    }

    pub fn unregister(&self, session: SessionId) {
        self.sessions.remove(&session);
    }

    pub fn is_registered(&self, session: SessionId) -> bool {
        self.sessions.contains_key(&session)
    }

    /// Invalidates `session` if its trackers moved since the last check.
    ///
    /// Returns the invalidation that was applied, if any.
    pub fn check_and_invalidate<L: Language>(
        &self,
        session: &ModuleResolutionSession<L>,
    ) -> Option<InvalidationScope> {
        let mut tracked = self.sessions.get_mut(&session.id())?;

        let content = tracked.content.modification_count();
        let structure = tracked.structure.modification_count();

        let scope = if structure != tracked.seen_structure {
            InvalidationScope::Structure
        } else if content != tracked.seen_content {
            InvalidationScope::Module
        } else {
            return None;
        };

        tracked.seen_content = content;
        tracked.seen_structure = structure;

        // Invalidate while the entry is held so concurrent checks bump once.
        session.invalidate(scope);
        debug!(
            "Invalidated session {} of module {} ({scope:?})",
            session.id(),
            session.module()
        );

        Some(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_moves_with_any_part() {
        let a = Arc::new(SimpleModificationTracker::new());
        let b = Arc::new(SimpleModificationTracker::new());
        let parts: [Arc<dyn ModificationTracker>; 2] = [a.clone(), b.clone()];
        let composite = CompositeModificationTracker::new(parts);

        let before = composite.modification_count();
        b.increment();

        assert_ne!(composite.modification_count(), before);
        assert_eq!(NeverChangedTracker.modification_count(), 0);
    }
}
