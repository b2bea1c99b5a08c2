//! The scheduler bringing declarations to the phase a consumer asks for.

use std::sync::Arc;

use log::{debug, trace};
use strata_utils::dependency::CycleError;

use crate::{
    config::ResolverConfig,
    context::{ResolutionContext, ResolveStats},
    depended::ResolveSession,
    error::{ResolveError, ResolveResult},
    id::{DeclarationId, ModuleId},
    invalidation::InvalidationController,
    language::Language,
    lock::{LockTable, NodeKey, NodeLockGuard},
    node::DeclarationNode,
    phase::Phase,
    producer::{PhaseProducer, StepContext},
    provider::SessionProvider,
    scope::MemberScope,
    session::ModuleResolutionSession,
    slice::TypedSlice,
    structure::{StructureEntry, StructureKey},
};

mod members;

pub use members::ClassSlice;

type Session<L> = Arc<ModuleResolutionSession<L>>;

/// Resolves declarations lazily, one phase step at a time.
///
/// There is no global lock. Every step holds the resolution lock of the
/// advanced node only, and dependencies are resolved while it is held.
pub struct LazyDeclarationResolver<L: Language> {
    sessions: Arc<dyn SessionProvider<L>>,
    producer: Arc<dyn PhaseProducer<L>>,
    invalidation: Arc<InvalidationController>,
    locks: LockTable,
    config: ResolverConfig,
}

impl<L: Language> LazyDeclarationResolver<L> {
    pub fn new(
        sessions: Arc<dyn SessionProvider<L>>,
        producer: Arc<dyn PhaseProducer<L>>,
        invalidation: Arc<InvalidationController>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            sessions,
            producer,
            invalidation,
            locks: LockTable::new(),
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn invalidation(&self) -> &Arc<InvalidationController> {
        &self.invalidation
    }

    pub fn session(&self, module: ModuleId) -> Option<Session<L>> {
        self.sessions.session(module)
    }

    /// Brings `id` to at least `phase` and returns its data up to `phase`.
    pub fn resolve_to_phase(
        &self,
        id: &DeclarationId,
        phase: L::Phase,
    ) -> ResolveResult<TypedSlice<L>> {
        let mut cx = ResolutionContext::new();
        self.resolve(&mut cx, id, phase)
    }

    /// Like [`Self::resolve_to_phase`], also reporting how much work was done.
    pub fn resolve_traced(
        &self,
        id: &DeclarationId,
        phase: L::Phase,
    ) -> ResolveResult<(TypedSlice<L>, ResolveStats)> {
        let mut cx = ResolutionContext::new();
        let slice = self.resolve(&mut cx, id, phase)?;
        Ok((slice, cx.stats()))
    }

    /// Resolves within an existing request context.
    pub fn resolve_with(
        &self,
        cx: &mut ResolutionContext<L>,
        id: &DeclarationId,
        phase: L::Phase,
    ) -> ResolveResult<TypedSlice<L>> {
        self.resolve(cx, id, phase)
    }

    /// Resolves `id` as seen from `session`.
    pub fn resolve_in(
        &self,
        session: &ResolveSession<L>,
        id: &DeclarationId,
        phase: L::Phase,
    ) -> ResolveResult<TypedSlice<L>> {
        let mut cx = session.context();
        self.resolve(&mut cx, id, phase)
    }

    /// Member scope of a file or class body.
    pub fn get_scope(&self, key: &StructureKey) -> ResolveResult<Arc<MemberScope>> {
        let session = self.session_of(None, key)?;
        self.check_once(&session);
        session.get_scope(key)
    }

    pub fn structure_of(&self, key: &StructureKey) -> ResolveResult<Arc<StructureEntry>> {
        let session = self.session_of(None, key)?;
        self.check_once(&session);
        session.structure_of(key)
    }

    pub(crate) fn scope_in(
        &self,
        overlay: Option<&Session<L>>,
        key: &StructureKey,
    ) -> ResolveResult<Arc<MemberScope>> {
        self.session_of(overlay, key)?.get_scope(key)
    }

    pub(crate) fn structure_in(
        &self,
        overlay: Option<&Session<L>>,
        key: &StructureKey,
    ) -> ResolveResult<Arc<StructureEntry>> {
        self.session_of(overlay, key)?.structure_of(key)
    }

    fn route(&self, overlay: Option<&Session<L>>, id: &DeclarationId) -> ResolveResult<Session<L>> {
        if let Some(overlay) = overlay {
            if overlay.declares(id) {
                return Ok(overlay.clone());
            }
        }

        self.sessions
            .session_for(id)
            .ok_or_else(|| ResolveError::UnresolvedModule {
                module: id.module,
                id: Some(id.clone()),
            })
    }

    fn session_of(&self, overlay: Option<&Session<L>>, key: &StructureKey) -> ResolveResult<Session<L>> {
        if let Some(overlay) = overlay {
            let owned = match key {
                StructureKey::File(module, file) => {
                    *module == overlay.module() && overlay.syntax().file_declarations(*file).is_some()
                }
                StructureKey::Class(id) => overlay.declares(id),
            };

            if owned {
                return Ok(overlay.clone());
            }
        }

        let module = key.module();
        self.sessions
            .session(module)
            .ok_or(ResolveError::UnresolvedModule { module, id: None })
    }

    fn check_once(&self, session: &ModuleResolutionSession<L>) {
        if self.config.check_modifications {
            self.invalidation.check_and_invalidate(session);
        }
    }

    fn check_session(&self, cx: &mut ResolutionContext<L>, session: &ModuleResolutionSession<L>) {
        if self.config.check_modifications && cx.mark_checked(session.id()) {
            self.invalidation.check_and_invalidate(session);
        }
    }

    pub(crate) fn resolve(
        &self,
        cx: &mut ResolutionContext<L>,
        id: &DeclarationId,
        target: L::Phase,
    ) -> ResolveResult<TypedSlice<L>> {
        let session = self.route(cx.overlay(), id)?;
        self.check_session(cx, &session);

        let node = session.get_or_create_node(id)?;
        let key = NodeKey::new(session.id(), id.clone());

        loop {
            if let Ok(slice) = node.read(target, session.node_generation(node.file())) {
                return Ok(slice);
            }

            if let Some(cycle) = cx.cycle_through(&key) {
                return Err(Self::cycle(id, cycle));
            }

            if cx.depth() >= self.config.max_depth {
                return Err(ResolveError::DepthLimit {
                    id: id.clone(),
                    limit: self.config.max_depth,
                });
            }

            let reached = {
                let (node, session) = (node.clone(), session.clone());
                move || node.read(target, session.node_generation(node.file())).is_ok()
            };

            let guard = self
                .locks
                .acquire(key.clone(), cx.request(), reached)
                .map_err(|mut cycle| {
                    cycle.push(id.clone());
                    Self::cycle(id, cycle)
                })?;

            // Another request brought the node to `target` while we were waiting.
            let Some(guard) = guard else {
                continue;
            };

            // Another request may have moved the node while we were waiting.
            if node.generation() != session.node_generation(node.file()) {
                let Some(raw) = session.syntax().declaration(id) else {
                    session.evict(id);
                    return Err(ResolveError::UnknownDeclaration(id.clone()));
                };

                let generation = session.node_generation(raw.file);
                node.reset(&guard, raw, generation);
            }

            let current = node.phase();
            if current >= target {
                continue;
            }

            let Some(next) = current.next() else {
                continue;
            };

            cx.enter(key.clone());
            let result = self.step(cx, &session, &node, &guard, next);
            cx.leave(result.is_ok());
            result?;
        }
    }

    fn step(
        &self,
        cx: &mut ResolutionContext<L>,
        session: &Session<L>,
        node: &DeclarationNode<L>,
        guard: &NodeLockGuard<'_>,
        phase: L::Phase,
    ) -> ResolveResult<TypedSlice<L>> {
        let id = node.id();
        let prior = node.snapshot();
        let mut step = StepContext::new(
            self,
            cx.overlay().cloned(),
            session.clone(),
            id.clone(),
            phase,
        );

        let dependencies = self
            .producer
            .dependencies(&step, prior.raw(), &prior)
            .map_err(|source| ResolveError::ProducerFailure {
                id: id.clone(),
                phase: phase.name(),
                source,
            })?;

        for dependency in dependencies {
            trace!(
                "`{id}` entering {phase} needs `{}` at {}",
                dependency.id,
                dependency.phase
            );

            let slice = self.resolve(cx, &dependency.id, dependency.phase)?;
            step.record(slice);
        }

        node.advance(guard, phase, |raw, prior| {
            self.producer.produce(&step, raw, prior)
        })
    }

    fn cycle(id: &DeclarationId, path: Vec<DeclarationId>) -> ResolveError {
        let cycle = CycleError::new(path);
        debug!("{cycle}");

        ResolveError::CyclicResolution {
            id: id.clone(),
            cycle,
        }
    }
}

#[cfg(test)]
mod tests;
