//! Modification trackers of a workspace.

use std::sync::Arc;

use dashmap::DashMap;
use strata_resolver::{
    id::ModuleId,
    invalidation::{
        CompositeModificationTracker, ModificationTracker, ModificationTrackerSource,
        SimpleModificationTracker,
    },
};

/// One content tracker per module, plus a single structure tracker.
///
/// The content tracker handed to a session also moves with every module the
/// session's module depends on, directly or not.
#[derive(Debug, Default)]
pub struct ProjectTrackers {
    content: DashMap<ModuleId, Arc<SimpleModificationTracker>>,
    upstream: DashMap<ModuleId, Vec<ModuleId>>,
    structure: Arc<SimpleModificationTracker>,
}

impl ProjectTrackers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the transitive dependencies of `module`.
    pub fn watch(&self, module: ModuleId, upstream: Vec<ModuleId>) {
        self.own(module);
        self.upstream.insert(module, upstream);
    }

    pub fn forget(&self, module: ModuleId) {
        self.content.remove(&module);
        self.upstream.remove(&module);
    }

    /// Reports a content change in `module`.
    pub fn touch(&self, module: ModuleId) {
        self.own(module).increment();
    }

    /// Reports a change of the set of files or modules.
    pub fn touch_structure(&self) {
        self.structure.increment();
    }

    fn own(&self, module: ModuleId) -> Arc<SimpleModificationTracker> {
        self.content.entry(module).or_default().clone()
    }
}

impl ModificationTrackerSource for ProjectTrackers {
    fn content_tracker(&self, module: ModuleId) -> Arc<dyn ModificationTracker> {
        let upstream = self
            .upstream
            .get(&module)
            .map(|upstream| upstream.clone())
            .unwrap_or_default();

        let mut composite = CompositeModificationTracker::default();
        composite.push(self.own(module));

        for dependency in upstream {
            composite.push(self.own(dependency));
        }

        Arc::new(composite)
    }

    fn structure_tracker(&self) -> Arc<dyn ModificationTracker> {
        self.structure.clone()
    }
}
