//! Module for tracking dependencies between items.

use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Debug},
    hash::Hash,
};

use crate::visit::{VisitMap, VisitState};

/// Error representing a dependency cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError<T>(Vec<T>);

impl<T> CycleError<T> {
    /// Create a new cycle error
    pub fn new(path: Vec<T>) -> Self {
        Self(path)
    }

    /// Get the cycle path
    pub fn path(&self) -> &[T] {
        &self.0
    }

    pub fn into_path(self) -> Vec<T> {
        self.0
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> CycleError<U> {
        CycleError(self.0.into_iter().map(f).collect())
    }
}

impl<T: fmt::Display> fmt::Display for CycleError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dependency cycle detected: ")?;

        let mut iter = self.0.iter();

        if let Some(first) = iter.next() {
            write!(f, "{}", first)?;
        }

        for el in iter {
            write!(f, " -> {}", el)?;
        }

        Ok(())
    }
}

impl<T: fmt::Display + Debug> std::error::Error for CycleError<T> {}

/// Graph of dependencies between items
#[derive(Debug, Clone)]
pub struct DependencyGraph<T> {
    /// Forward dependencies (item -> dependencies)
    forward: HashMap<T, HashSet<T>>,

    /// Reverse dependencies (item -> dependents)
    reverse: HashMap<T, HashSet<T>>,
}

impl<T> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self {
            forward: HashMap::default(),
            reverse: HashMap::default(),
        }
    }
}

impl<T> DependencyGraph<T> {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self {
            forward: HashMap::new(),
            reverse: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

impl<T: Eq + Hash> DependencyGraph<T> {
    /// Get dependencies of an item
    pub fn dependencies_of(&self, item: &T) -> impl Iterator<Item = &T> {
        self.forward
            .get(item)
            .map(|deps| deps.iter())
            .into_iter()
            .flatten()
    }

    /// Get dependents of an item
    pub fn dependents_of(&self, item: &T) -> impl Iterator<Item = &T> {
        self.reverse
            .get(item)
            .map(|deps| deps.iter())
            .into_iter()
            .flatten()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.forward.contains_key(item)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.forward.keys()
    }
}

impl<T: Eq + Hash + Clone> DependencyGraph<T> {
    pub fn add_node(&mut self, item: T) {
        // Ensure the item exists in both forward and reverse maps
        self.forward.entry(item.clone()).or_default();
        self.reverse.entry(item).or_default();
    }

    /// Add a dependency edge
    pub fn add_dependency(&mut self, from: T, to: T) {
        self.add_node(from.clone());
        self.add_node(to.clone());

        self.forward.entry(from.clone()).or_default().insert(to.clone());
        self.reverse.entry(to).or_default().insert(from);
    }

    /// Remove an item together with every edge touching it
    pub fn remove_node(&mut self, item: &T) {
        if let Some(deps) = self.forward.remove(item) {
            for dep in deps {
                if let Some(dependents) = self.reverse.get_mut(&dep) {
                    dependents.remove(item);
                }
            }
        }

        if let Some(dependents) = self.reverse.remove(item) {
            for dependent in dependents {
                if let Some(deps) = self.forward.get_mut(&dependent) {
                    deps.remove(item);
                }
            }
        }
    }

    /// Every item reachable from `item`, not including `item` itself
    pub fn transitive_dependencies_of(&self, item: &T) -> Vec<T> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = self.dependencies_of(item).cloned().collect::<Vec<_>>();

        while let Some(next) = stack.pop() {
            if &next == item || !seen.insert(next.clone()) {
                continue;
            }

            stack.extend(self.dependencies_of(&next).cloned());
            order.push(next);
        }

        order
    }

    /// Perform a topological sort, dependencies first
    pub fn topological_sort(&self) -> Result<Vec<T>, CycleError<T>>
    where
        T: Debug,
    {
        let mut visited = VisitMap::new();
        let mut order = Vec::with_capacity(self.forward.len());

        for root in self.forward.keys() {
            if visited.get(root) != VisitState::Unvisited {
                continue;
            }

            // (item, remaining dependencies) frames of the current path
            let mut path: Vec<(T, Vec<T>)> = Vec::new();
            visited.insert(root.clone(), VisitState::Visiting);
            path.push((root.clone(), self.dependencies_of(root).cloned().collect()));

            while let Some((current, pending)) = path.last_mut() {
                let Some(dep) = pending.pop() else {
                    let current = current.clone();
                    visited.insert(current.clone(), VisitState::Visited);
                    order.push(current);
                    path.pop();
                    continue;
                };

                match visited.get(&dep) {
                    VisitState::Unvisited => {
                        visited.insert(dep.clone(), VisitState::Visiting);
                        let deps = self.dependencies_of(&dep).cloned().collect();
                        path.push((dep, deps));
                    }
                    VisitState::Visiting => {
                        let start = path
                            .iter()
                            .position(|(item, _)| item == &dep)
                            .unwrap_or_default();
                        let mut cycle = path[start..]
                            .iter()
                            .map(|(item, _)| item.clone())
                            .collect::<Vec<_>>();
                        cycle.push(dep);
                        return Err(CycleError::new(cycle));
                    }
                    VisitState::Visited => {}
                }
            }
        }

        Ok(order)
    }
}
