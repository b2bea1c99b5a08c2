use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, trace};

use crate::{
    error::{NotYetResolved, ProducerError, ResolveError, ResolveResult},
    id::{DeclarationId, FileId},
    language::Language,
    lock::NodeLockGuard,
    phase::Phase,
    slice::TypedSlice,
    syntax::{DeclarationKind, RawDeclaration},
};

struct NodeState<L: Language> {
    raw: L::Raw,
    file: FileId,
    kind: DeclarationKind,
    phase: L::Phase,
    generation: u64,
    slots: Vec<Arc<L::Data>>,
}

impl<L: Language> NodeState<L> {
    fn fresh(raw: RawDeclaration<L::Raw>, generation: u64) -> Self {
        let data = Arc::new(L::raw_data(&raw.raw));

        Self {
            raw: raw.raw,
            file: raw.file,
            kind: raw.kind,
            phase: L::Phase::INITIAL,
            generation,
            slots: vec![data],
        }
    }
}

/// Resolution state of one declaration.
///
/// The phase only moves up, one lattice step at a time, until the node is
/// reset for a newer generation. A phase is published in the same critical
/// section that stores its data, so readers never see a phase without data.
pub struct DeclarationNode<L: Language> {
    id: DeclarationId,
    state: RwLock<NodeState<L>>,
}

impl<L: Language> DeclarationNode<L> {
    pub fn new(id: DeclarationId, raw: RawDeclaration<L::Raw>, generation: u64) -> Self {
        Self {
            id,
            state: RwLock::new(NodeState::fresh(raw, generation)),
        }
    }

    pub fn id(&self) -> &DeclarationId {
        &self.id
    }

    pub fn phase(&self) -> L::Phase {
        self.read_state().phase
    }

    pub fn generation(&self) -> u64 {
        self.read_state().generation
    }

    pub fn file(&self) -> FileId {
        self.read_state().file
    }

    pub fn kind(&self) -> DeclarationKind {
        self.read_state().kind
    }

    pub fn raw(&self) -> L::Raw {
        self.read_state().raw.clone()
    }

    /// Typed data up to `phase`, if the node reached it in `generation`.
    pub fn read(&self, phase: L::Phase, generation: u64) -> Result<TypedSlice<L>, NotYetResolved> {
        let state = self.read_state();

        if state.generation != generation || state.phase < phase {
            return Err(NotYetResolved {
                id: self.id.clone(),
                current: state.phase.name(),
                requested: phase.name(),
                stale: state.generation != generation,
            });
        }

        let len = phase.position() + 1;
        Ok(TypedSlice::new(
            self.id.clone(),
            state.raw.clone(),
            state.slots[..len].to_vec(),
        ))
    }

    /// Everything resolved so far, regardless of generation.
    pub fn snapshot(&self) -> TypedSlice<L> {
        let state = self.read_state();
        TypedSlice::new(self.id.clone(), state.raw.clone(), state.slots.clone())
    }

    /// Moves the node from its current phase to `phase`.
    ///
    /// `phase` has to be the direct successor of the current phase. The
    /// producer runs without holding the state lock. If it fails the node is
    /// left untouched and the failure is returned.
    pub fn advance<F>(
        &self,
        guard: &NodeLockGuard<'_>,
        phase: L::Phase,
        producer: F,
    ) -> ResolveResult<TypedSlice<L>>
    where
        F: FnOnce(&L::Raw, &TypedSlice<L>) -> Result<L::Data, ProducerError>,
    {
        debug_assert_eq!(guard.key().id, self.id);

        let prior = self.snapshot();
        let current = prior.phase();

        if current.next() != Some(phase) {
            return Err(ResolveError::PhaseOrder {
                id: self.id.clone(),
                expected: current.next().map_or("nothing", Phase::name),
                actual: phase.name(),
            });
        }

        let data = producer(prior.raw(), &prior).map_err(|source| ResolveError::ProducerFailure {
            id: self.id.clone(),
            phase: phase.name(),
            source,
        })?;

        let mut state = self.write_state();
        state.slots.push(Arc::new(data));
        state.phase = phase;

        trace!("Advanced `{}` from {current} to {phase}", self.id);

        Ok(TypedSlice::new(
            self.id.clone(),
            state.raw.clone(),
            state.slots.clone(),
        ))
    }

    /// Drops every resolved phase and starts over from `raw` in `generation`.
    pub fn reset(&self, _guard: &NodeLockGuard<'_>, raw: RawDeclaration<L::Raw>, generation: u64) {
        let mut state = self.write_state();
        debug!(
            "Reset `{}` from {} (generation {} -> {generation})",
            self.id, state.phase, state.generation
        );

        *state = NodeState::fresh(raw, generation);
    }

    fn read_state(&self) -> RwLockReadGuard<'_, NodeState<L>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, NodeState<L>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<L: Language> std::fmt::Debug for DeclarationNode<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.read_state();

        f.debug_struct("DeclarationNode")
            .field("id", &self.id)
            .field("phase", &state.phase)
            .field("generation", &state.generation)
            .finish()
    }
}
