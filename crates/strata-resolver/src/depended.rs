//! Resolve sessions bound to a position in the code.
//!
//! A depended session resolves an on-air fragment, code that is not part of
//! any file yet, against an original session. Fragment declarations live in
//! a session of their own so that the original session is never polluted.

use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use log::debug;

use crate::{
    config::ResolverConfig,
    context::ResolutionContext,
    error::ResolveResult,
    id::{DeclarationId, FileId, ModuleId},
    language::Language,
    resolver::LazyDeclarationResolver,
    scope::MemberScope,
    session::{InvalidationScope, ModuleResolutionSession},
    structure::StructureKey,
    syntax::SyntaxProvider,
};

/// Scopes visible at a position, innermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TowerContext {
    scopes: Vec<StructureKey>,
}

impl TowerContext {
    pub fn new(scopes: impl IntoIterator<Item = StructureKey>) -> Self {
        Self {
            scopes: scopes.into_iter().collect(),
        }
    }

    pub fn scopes(&self) -> &[StructureKey] {
        &self.scopes
    }
}

pub struct DependedSession<L: Language> {
    original: Arc<ModuleResolutionSession<L>>,
    fragment: Arc<ModuleResolutionSession<L>>,
    fragment_file: FileId,
    tower: TowerContext,
    base_generation: AtomicU64,
}

impl<L: Language> DependedSession<L> {
    pub fn new(
        original: Arc<ModuleResolutionSession<L>>,
        fragment_syntax: Arc<dyn SyntaxProvider<L>>,
        fragment_file: FileId,
        tower: TowerContext,
        config: &ResolverConfig,
    ) -> Self {
        let fragment = Arc::new(ModuleResolutionSession::new(
            original.module(),
            original.kind(),
            fragment_syntax,
            config,
        ));

        let mut depended = Self {
            base_generation: AtomicU64::new(0),
            original,
            fragment,
            fragment_file,
            tower,
        };
        *depended.base_generation.get_mut() = depended.original_generation();
        depended
    }

    pub fn original(&self) -> &Arc<ModuleResolutionSession<L>> {
        &self.original
    }

    pub fn fragment(&self) -> &Arc<ModuleResolutionSession<L>> {
        &self.fragment
    }

    pub fn tower(&self) -> &TowerContext {
        &self.tower
    }

    /// Generation of the original as far as the fragment can see it: the
    /// session itself plus every tower file of the original module.
    ///
    /// Generations never decrease, so the sum moves whenever any part does.
    fn original_generation(&self) -> u64 {
        let module = self.original.module();
        let files = self
            .tower
            .scopes()
            .iter()
            .filter(|key| key.module() == module)
            .filter_map(|key| match key {
                StructureKey::File(_, file) => Some(*file),
                StructureKey::Class(id) => self.original.syntax().declaration(id).map(|raw| raw.file),
            })
            .collect::<BTreeSet<_>>();

        self.original.generation()
            + files
                .into_iter()
                .map(|file| self.original.file_generation(file))
                .sum::<u64>()
    }

    /// Drops fragment results computed against an older original session or
    /// an older version of one of its tower files.
    pub fn refresh(&self) {
        let current = self.original_generation();
        let base = self.base_generation.swap(current, Ordering::AcqRel);

        if base != current {
            debug!(
                "Original session {} moved from generation {base} to {current}, invalidating fragment",
                self.original.id()
            );
            self.fragment.invalidate(InvalidationScope::Module);
        }
    }

    /// Declarations called `name` visible to the fragment: its own first, then
    /// the tower from the innermost scope outwards.
    pub fn lookup(
        &self,
        resolver: &LazyDeclarationResolver<L>,
        name: &str,
    ) -> ResolveResult<Vec<DeclarationId>> {
        let own = self
            .fragment
            .get_scope(&StructureKey::File(self.fragment.module(), self.fragment_file))?;

        if own.contains(name) {
            return Ok(own.lookup(name).to_vec());
        }

        for key in self.tower.scopes() {
            let scope = self.scope(resolver, key)?;

            if scope.contains(name) {
                return Ok(scope.lookup(name).to_vec());
            }
        }

        Ok(Vec::new())
    }

    fn scope(
        &self,
        resolver: &LazyDeclarationResolver<L>,
        key: &StructureKey,
    ) -> ResolveResult<Arc<MemberScope>> {
        if key.module() == self.original.module() {
            self.original.get_scope(key)
        } else {
            resolver.get_scope(key)
        }
    }
}

/// The session a resolution runs against.
pub enum ResolveSession<L: Language> {
    Resolvable(Arc<ModuleResolutionSession<L>>),
    Depended(DependedSession<L>),
}

impl<L: Language> ResolveSession<L> {
    pub fn module(&self) -> ModuleId {
        match self {
            Self::Resolvable(session) => session.module(),
            Self::Depended(depended) => depended.original.module(),
        }
    }

    /// Session that owns `id` from this session's point of view.
    pub fn session_for(&self, id: &DeclarationId) -> Option<&Arc<ModuleResolutionSession<L>>> {
        match self {
            Self::Resolvable(session) => (session.module() == id.module).then_some(session),
            Self::Depended(depended) if depended.fragment.declares(id) => Some(&depended.fragment),
            Self::Depended(depended) => {
                (depended.original.module() == id.module).then_some(&depended.original)
            }
        }
    }

    pub fn get_scope(
        &self,
        resolver: &LazyDeclarationResolver<L>,
        key: &StructureKey,
    ) -> ResolveResult<Arc<MemberScope>> {
        match self {
            Self::Resolvable(session) if key.module() == session.module() => session.get_scope(key),
            Self::Resolvable(_) => resolver.get_scope(key),
            Self::Depended(depended) => {
                let fragment_key = match key {
                    StructureKey::File(_, file) => *file == depended.fragment_file,
                    StructureKey::Class(id) => depended.fragment.declares(id),
                };

                if fragment_key {
                    depended.fragment.get_scope(key)
                } else {
                    depended.scope(resolver, key)
                }
            }
        }
    }

    /// A fresh request context routing fragment declarations to the fragment.
    pub(crate) fn context(&self) -> ResolutionContext<L> {
        match self {
            Self::Resolvable(session) => ResolutionContext::with_overlay(session.clone()),
            Self::Depended(depended) => {
                depended.refresh();
                ResolutionContext::with_overlay(depended.fragment.clone())
            }
        }
    }
}

impl<L: Language> From<Arc<ModuleResolutionSession<L>>> for ResolveSession<L> {
    fn from(session: Arc<ModuleResolutionSession<L>>) -> Self {
        Self::Resolvable(session)
    }
}

impl<L: Language> From<DependedSession<L>> for ResolveSession<L> {
    fn from(depended: DependedSession<L>) -> Self {
        Self::Depended(depended)
    }
}
