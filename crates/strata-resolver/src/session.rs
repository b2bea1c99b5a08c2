use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use dashmap::DashMap;
use derive_more::Display;
use log::debug;
use serde::{Deserialize, Serialize};
use strata_utils::lru::LruCache;

use crate::{
    config::ResolverConfig,
    error::{ResolveError, ResolveResult},
    id::{DeclarationId, FileId, ModuleId, SessionId},
    language::Language,
    node::DeclarationNode,
    scope::MemberScope,
    structure::{StructureCache, StructureEntry, StructureKey},
    syntax::SyntaxProvider,
};

/// Flavour of a module, deciding whether its content can change at all.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleKind {
    #[default]
    #[display("source")]
    Source,
    #[display("library")]
    Library,
    #[display("binary library")]
    BinaryLibrary,
    #[display("script")]
    Script,
    #[display("not under content root")]
    NotUnderContentRoot,
    #[display("builtins")]
    Builtins,
}

impl ModuleKind {
    pub fn is_mutable(self) -> bool {
        !matches!(self, Self::BinaryLibrary | Self::Builtins)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidationScope {
    /// Content changed somewhere in the module.
    Module,
    /// The set of files or modules changed.
    Structure,
    /// Content of one file changed.
    File(FileId),
}

/// Owns the declaration graph of one module.
pub struct ModuleResolutionSession<L: Language> {
    id: SessionId,
    module: ModuleId,
    kind: ModuleKind,
    syntax: Arc<dyn SyntaxProvider<L>>,
    nodes: DashMap<DeclarationId, Arc<DeclarationNode<L>>>,
    scopes: Mutex<LruCache<StructureKey, Arc<MemberScope>>>,
    structure: StructureCache,
    generation: AtomicU64,
    file_generations: DashMap<FileId, u64>,
}

impl<L: Language> ModuleResolutionSession<L> {
    pub fn new(
        module: ModuleId,
        kind: ModuleKind,
        syntax: Arc<dyn SyntaxProvider<L>>,
        config: &ResolverConfig,
    ) -> Self {
        let id = SessionId::fresh();
        debug!("Created session {id} for {kind} module {module}");

        Self {
            id,
            module,
            kind,
            syntax,
            nodes: DashMap::new(),
            scopes: Mutex::new(LruCache::new(config.scope_cache_capacity)),
            structure: StructureCache::new(config.structure_cache_capacity),
            generation: AtomicU64::new(0),
            file_generations: DashMap::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn syntax(&self) -> &Arc<dyn SyntaxProvider<L>> {
        &self.syntax
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// How often `file` was invalidated on its own.
    pub fn file_generation(&self, file: FileId) -> u64 {
        self.file_generations.get(&file).map_or(0, |generation| *generation)
    }

    /// Generation a node of `file` has to carry to be current.
    pub fn node_generation(&self, file: FileId) -> u64 {
        self.generation() + self.file_generation(file)
    }

    /// Whether the syntax of this module knows `id`.
    pub fn declares(&self, id: &DeclarationId) -> bool {
        id.module == self.module && self.syntax.declaration(id).is_some()
    }

    /// Returns the node of `id`, creating it at the initial phase on first use.
    pub fn get_or_create_node(&self, id: &DeclarationId) -> ResolveResult<Arc<DeclarationNode<L>>> {
        if let Some(node) = self.nodes.get(id) {
            return Ok(node.clone());
        }

        let raw = self
            .syntax
            .declaration(id)
            .ok_or_else(|| ResolveError::UnknownDeclaration(id.clone()))?;
        let generation = self.node_generation(raw.file);

        // A racing creator may have won since the lookup above. Keep its node.
        let node = self
            .nodes
            .entry(id.clone())
            .or_insert_with(|| {
                debug!("Created node for `{id}` in session {}", self.id);
                Arc::new(DeclarationNode::new(id.clone(), raw, generation))
            })
            .clone();

        Ok(node)
    }

    pub fn node(&self, id: &DeclarationId) -> Option<Arc<DeclarationNode<L>>> {
        self.nodes.get(id).map(|node| node.clone())
    }

    pub(crate) fn evict(&self, id: &DeclarationId) {
        if self.nodes.remove(id).is_some() {
            debug!("Evicted node for `{id}` from session {}", self.id);
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Marks cached work stale.
    ///
    /// Nodes are not touched here. They compare their generation on the next
    /// read and reset themselves.
    pub fn invalidate(&self, scope: InvalidationScope) {
        match scope {
            InvalidationScope::Module => {
                self.generation.fetch_add(1, Ordering::AcqRel);
                self.lock_scopes().clear();
            }
            InvalidationScope::Structure => {
                self.generation.fetch_add(1, Ordering::AcqRel);
                self.lock_scopes().clear();
                self.structure.clear();
            }
            InvalidationScope::File(file) => {
                *self.file_generations.entry(file).or_insert(0) += 1;
                self.lock_scopes().retain(|_, scope| scope.file() != file);
                self.structure.evict_file(file);
            }
        }
    }

    pub fn structure_of(&self, key: &StructureKey) -> ResolveResult<Arc<StructureEntry>> {
        self.structure.structure_of(key, self.syntax.as_ref())
    }

    /// Member scope of a file or class body, memoized until invalidated.
    pub fn get_scope(&self, key: &StructureKey) -> ResolveResult<Arc<MemberScope>> {
        let cached = self.lock_scopes().get(key).cloned();

        if let Some(scope) = cached {
            if scope.stamp() == self.syntax.file_stamp(scope.file()) {
                return Ok(scope);
            }
        }

        let entry = self.structure_of(key)?;
        let scope = Arc::new(MemberScope::from_entry(&entry));

        let evicted = self.lock_scopes().insert(key.clone(), scope.clone());
        for (key, _) in evicted {
            debug!("Evicted scope of {key} from session {}", self.id);
        }

        Ok(scope)
    }

    pub fn cached_scope_count(&self) -> usize {
        self.lock_scopes().len()
    }

    pub fn cached_structure_count(&self) -> usize {
        self.structure.len()
    }

    fn lock_scopes(&self) -> MutexGuard<'_, LruCache<StructureKey, Arc<MemberScope>>> {
        self.scopes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<L: Language> fmt::Debug for ModuleResolutionSession<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleResolutionSession")
            .field("id", &self.id)
            .field("module", &self.module)
            .field("kind", &self.kind)
            .field("generation", &self.generation())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
