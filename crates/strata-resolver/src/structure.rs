//! Structure of files and class bodies: which declarations they contain.
//!
//! Entries are derived from syntax only. Each entry remembers the content
//! stamp of its file and is recomputed on access once the stamp moves.

use std::{
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use log::debug;
use serde::{Deserialize, Serialize};
use strata_utils::lru::LruCache;

use crate::{
    error::{ResolveError, ResolveResult},
    id::{DeclarationId, FileId, ModuleId},
    language::Language,
    syntax::{ChildDeclaration, DeclarationKind, SyntaxProvider},
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKey {
    File(ModuleId, FileId),
    Class(DeclarationId),
}

impl StructureKey {
    pub fn module(&self) -> ModuleId {
        match self {
            Self::File(module, _) => *module,
            Self::Class(id) => id.module,
        }
    }
}

impl fmt::Display for StructureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(module, file) => write!(f, "file {module}/{file}"),
            Self::Class(id) => write!(f, "class `{id}`"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureEntry {
    key: StructureKey,
    file: FileId,
    parent: Option<DeclarationId>,
    children: Vec<ChildDeclaration>,
    stamp: u64,
}

impl StructureEntry {
    pub fn key(&self) -> &StructureKey {
        &self.key
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    /// Containing class of a class body. `None` for files and top level classes.
    pub fn parent(&self) -> Option<&DeclarationId> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[ChildDeclaration] {
        &self.children
    }

    pub fn ids(&self) -> impl Iterator<Item = &DeclarationId> {
        self.children.iter().map(|child| &child.id)
    }

    pub fn of_kind(&self, kind: DeclarationKind) -> impl Iterator<Item = &DeclarationId> {
        self.children
            .iter()
            .filter(move |child| child.kind == kind)
            .map(|child| &child.id)
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }
}

#[derive(Debug)]
pub struct StructureCache {
    entries: Mutex<LruCache<StructureKey, Arc<StructureEntry>>>,
}

impl StructureCache {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn structure_of<L: Language>(
        &self,
        key: &StructureKey,
        syntax: &dyn SyntaxProvider<L>,
    ) -> ResolveResult<Arc<StructureEntry>> {
        let cached = self.lock().get(key).cloned();

        if let Some(entry) = cached {
            if entry.stamp == syntax.file_stamp(entry.file) {
                return Ok(entry);
            }
        }

        let entry = Arc::new(Self::compute(key, syntax)?);
        debug!("Computed structure of {key} ({} children)", entry.children.len());

        self.lock().insert(key.clone(), entry.clone());
        Ok(entry)
    }

    fn compute<L: Language>(
        key: &StructureKey,
        syntax: &dyn SyntaxProvider<L>,
    ) -> ResolveResult<StructureEntry> {
        match key {
            StructureKey::File(module, file) => {
                let children = syntax
                    .file_declarations(*file)
                    .ok_or(ResolveError::UnknownFile {
                        module: *module,
                        file: *file,
                    })?;

                Ok(StructureEntry {
                    key: key.clone(),
                    file: *file,
                    parent: None,
                    children,
                    stamp: syntax.file_stamp(*file),
                })
            }
            StructureKey::Class(id) => {
                let raw = syntax
                    .declaration(id)
                    .ok_or_else(|| ResolveError::UnknownDeclaration(id.clone()))?;

                Ok(StructureEntry {
                    key: key.clone(),
                    file: raw.file,
                    parent: id.parent(),
                    children: syntax.children(&raw.raw),
                    stamp: syntax.file_stamp(raw.file),
                })
            }
        }
    }

    /// Drops every entry derived from `file`.
    pub fn evict_file(&self, file: FileId) {
        self.lock().retain(|_, entry| entry.file != file);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<StructureKey, Arc<StructureEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
