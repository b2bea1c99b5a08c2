use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    error::{ProducerError, ResolveResult},
    id::{DeclarationId, ModuleId},
    language::Language,
    resolver::LazyDeclarationResolver,
    scope::MemberScope,
    session::ModuleResolutionSession,
    slice::TypedSlice,
    structure::{StructureEntry, StructureKey},
};

/// `id` has to reach `phase` before the current step may run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency<P> {
    pub id: DeclarationId,
    pub phase: P,
}

impl<P> Dependency<P> {
    pub fn new(id: DeclarationId, phase: P) -> Self {
        Self { id, phase }
    }
}

/// The phase specific computations, supplied by the semantic collaborator.
///
/// For every step the resolver first asks for the dependencies, brings each of
/// them to its phase and then calls `produce`. `cx.phase()` is the phase being
/// entered, `prior` holds everything resolved below it.
pub trait PhaseProducer<L: Language>: Send + Sync {
    fn dependencies(
        &self,
        cx: &StepContext<'_, L>,
        raw: &L::Raw,
        prior: &TypedSlice<L>,
    ) -> Result<Vec<Dependency<L::Phase>>, ProducerError>;

    fn produce(
        &self,
        cx: &StepContext<'_, L>,
        raw: &L::Raw,
        prior: &TypedSlice<L>,
    ) -> Result<L::Data, ProducerError>;
}

/// What a producer may look at while computing one step.
pub struct StepContext<'a, L: Language> {
    resolver: &'a LazyDeclarationResolver<L>,
    overlay: Option<Arc<ModuleResolutionSession<L>>>,
    session: Arc<ModuleResolutionSession<L>>,
    id: DeclarationId,
    phase: L::Phase,
    resolved: IndexMap<DeclarationId, TypedSlice<L>>,
}

impl<'a, L: Language> StepContext<'a, L> {
    pub(crate) fn new(
        resolver: &'a LazyDeclarationResolver<L>,
        overlay: Option<Arc<ModuleResolutionSession<L>>>,
        session: Arc<ModuleResolutionSession<L>>,
        id: DeclarationId,
        phase: L::Phase,
    ) -> Self {
        Self {
            resolver,
            overlay,
            session,
            id,
            phase,
            resolved: IndexMap::new(),
        }
    }

    pub(crate) fn record(&mut self, slice: TypedSlice<L>) {
        self.resolved.insert(slice.id().clone(), slice);
    }

    pub fn id(&self) -> &DeclarationId {
        &self.id
    }

    /// The phase this step enters.
    pub fn phase(&self) -> L::Phase {
        self.phase
    }

    pub fn module(&self) -> ModuleId {
        self.session.module()
    }

    pub fn session(&self) -> &Arc<ModuleResolutionSession<L>> {
        &self.session
    }

    /// Member scope of any file or class, in this module or another one.
    pub fn scope(&self, key: &StructureKey) -> ResolveResult<Arc<MemberScope>> {
        self.resolver.scope_in(self.overlay.as_ref(), key)
    }

    pub fn structure_of(&self, key: &StructureKey) -> ResolveResult<Arc<StructureEntry>> {
        self.resolver.structure_in(self.overlay.as_ref(), key)
    }

    /// Slice of a declared dependency, available once `produce` runs.
    pub fn dependency(&self, id: &DeclarationId) -> Option<&TypedSlice<L>> {
        self.resolved.get(id)
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &TypedSlice<L>> {
        self.resolved.values()
    }
}
