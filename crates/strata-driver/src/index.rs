//! Which modules exist and what each of them sees.

use std::sync::Arc;

use indexmap::IndexMap;
use strata_resolver::{
    id::{ModuleId, Name},
    session::ModuleKind,
};

use crate::syntax::ModuleSyntax;

#[derive(Debug, Clone)]
pub struct ModuleEntry {
    pub name: Name,
    pub kind: ModuleKind,
    /// Direct dependencies, in manifest order.
    pub dependencies: Vec<ModuleId>,
    pub syntax: Arc<ModuleSyntax>,
}

/// Modules in the order they were added, so dependencies come first.
#[derive(Debug, Default)]
pub struct ProjectIndex {
    modules: IndexMap<ModuleId, ModuleEntry>,
}

impl ProjectIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: ModuleId, entry: ModuleEntry) {
        self.modules.insert(module, entry);
    }

    pub fn remove(&mut self, module: ModuleId) -> Option<ModuleEntry> {
        self.modules.shift_remove(&module)
    }

    pub fn get(&self, module: ModuleId) -> Option<&ModuleEntry> {
        self.modules.get(&module)
    }

    pub fn module_named(&self, name: &str) -> Option<ModuleId> {
        self.modules
            .iter()
            .find(|(_, entry)| entry.name.as_str() == name)
            .map(|(id, _)| *id)
    }

    pub fn name_of(&self, module: ModuleId) -> Option<&Name> {
        self.modules.get(&module).map(|entry| &entry.name)
    }

    /// The module itself followed by its direct dependencies.
    pub fn visible_from(&self, module: ModuleId) -> Vec<ModuleId> {
        let Some(entry) = self.modules.get(&module) else {
            return Vec::new();
        };

        std::iter::once(module)
            .chain(entry.dependencies.iter().copied())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &ModuleEntry)> {
        self.modules.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}
