use std::{collections::HashMap, hash::Hash};

use derive_more::Display;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VisitState {
    Unvisited,
    Visiting,
    Visited,
}

/// Visit state per item for depth first traversals. Unknown items are unvisited.
#[derive(Debug, Clone)]
pub struct VisitMap<T>(HashMap<T, VisitState>);

impl<T: Eq + Hash> VisitMap<T> {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn get(&self, key: &T) -> VisitState {
        self.0.get(key).copied().unwrap_or(VisitState::Unvisited)
    }

    pub fn insert(&mut self, key: T, state: VisitState) -> Option<VisitState> {
        self.0.insert(key, state)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Eq + Hash> Default for VisitMap<T> {
    fn default() -> Self {
        Self::new()
    }
}
