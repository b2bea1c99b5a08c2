use std::sync::Arc;

use dashmap::DashMap;
use log::debug;

use crate::{
    id::{DeclarationId, ModuleId},
    language::Language,
    session::ModuleResolutionSession,
};

/// Finds the session owning a module, so resolution can cross module boundaries.
pub trait SessionProvider<L: Language>: Send + Sync {
    fn session(&self, module: ModuleId) -> Option<Arc<ModuleResolutionSession<L>>>;

    fn session_for(&self, id: &DeclarationId) -> Option<Arc<ModuleResolutionSession<L>>> {
        self.session(id.module)
    }
}

/// Sessions of every module currently loaded for analysis.
pub struct SessionRegistry<L: Language> {
    sessions: DashMap<ModuleId, Arc<ModuleResolutionSession<L>>>,
}

impl<L: Language> Default for SessionRegistry<L> {
    fn default() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }
}

impl<L: Language> SessionRegistry<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `session` for its module and returns the session it replaced.
    pub fn insert(
        &self,
        session: Arc<ModuleResolutionSession<L>>,
    ) -> Option<Arc<ModuleResolutionSession<L>>> {
        self.sessions.insert(session.module(), session)
    }

    /// Unloads the session of `module`.
    pub fn remove(&self, module: ModuleId) -> Option<Arc<ModuleResolutionSession<L>>> {
        let removed = self.sessions.remove(&module).map(|(_, session)| session);

        if let Some(session) = &removed {
            debug!("Unloaded session {} of module {module}", session.id());
        }

        removed
    }

    pub fn get(&self, module: ModuleId) -> Option<Arc<ModuleResolutionSession<L>>> {
        self.sessions.get(&module).map(|session| session.clone())
    }

    pub fn contains(&self, module: ModuleId) -> bool {
        self.sessions.contains_key(&module)
    }

    /// Loaded modules in ascending order.
    pub fn modules(&self) -> Vec<ModuleId> {
        let mut modules = self
            .sessions
            .iter()
            .map(|entry| *entry.key())
            .collect::<Vec<_>>();
        modules.sort();
        modules
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl<L: Language> SessionProvider<L> for SessionRegistry<L> {
    fn session(&self, module: ModuleId) -> Option<Arc<ModuleResolutionSession<L>>> {
        self.get(module)
    }
}
