use std::{collections::HashSet, sync::Arc};

use strata_utils::tracker::Tracker;

use crate::{
    id::{DeclarationId, RequestId, SessionId},
    language::Language,
    lock::NodeKey,
    session::ModuleResolutionSession,
};

/// Bookkeeping that one request threads through every recursive call.
///
/// The pending entries of `in_flight` are the nodes this request is
/// advancing right now, outermost first. Reaching one of them again means
/// the request depends on itself.
pub struct ResolutionContext<L: Language> {
    request: RequestId,
    in_flight: Tracker<NodeKey>,
    steps: usize,
    checked: HashSet<SessionId>,
    overlay: Option<Arc<ModuleResolutionSession<L>>>,
}

impl<L: Language> Default for ResolutionContext<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Language> ResolutionContext<L> {
    pub fn new() -> Self {
        Self {
            request: RequestId::fresh(),
            in_flight: Tracker::new(),
            steps: 0,
            checked: HashSet::new(),
            overlay: None,
        }
    }

    /// A context that resolves the declarations of `session` in `session`,
    /// even if the session provider would pick another one.
    pub fn with_overlay(session: Arc<ModuleResolutionSession<L>>) -> Self {
        Self {
            overlay: Some(session),
            ..Self::new()
        }
    }

    pub fn request(&self) -> RequestId {
        self.request
    }

    pub fn overlay(&self) -> Option<&Arc<ModuleResolutionSession<L>>> {
        self.overlay.as_ref()
    }

    /// Number of steps currently in flight.
    pub fn depth(&self) -> usize {
        self.in_flight.pending_count()
    }

    pub fn stats(&self) -> ResolveStats {
        ResolveStats {
            steps: self.steps,
            sessions_checked: self.checked.len(),
        }
    }

    /// Records that `session` was checked for modifications.
    ///
    /// Returns `false` if it already was during this request.
    pub(crate) fn mark_checked(&mut self, session: SessionId) -> bool {
        self.checked.insert(session)
    }

    /// The cycle closed by reaching `key` again, first and last entry equal.
    pub(crate) fn cycle_through(&self, key: &NodeKey) -> Option<Vec<DeclarationId>> {
        let path = self.in_flight.pending_from(key)?;

        Some(
            path.iter()
                .map(|key| key.id.clone())
                .chain([key.id.clone()])
                .collect(),
        )
    }

    pub(crate) fn enter(&mut self, key: NodeKey) {
        self.in_flight.start(key);
    }

    pub(crate) fn leave(&mut self, completed: bool) {
        self.in_flight.discard();

        if completed {
            self.steps += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Phase steps performed by the request.
    pub steps: usize,
    /// Sessions checked for modifications.
    pub sessions_checked: usize,
}
