use indexmap::IndexMap;

use crate::{
    id::{DeclarationId, FileId, Name},
    structure::{StructureEntry, StructureKey},
};

/// Name based view of the declarations of a file or class body.
///
/// Names map to every declaration carrying them, in source order, so
/// overloads stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberScope {
    key: StructureKey,
    file: FileId,
    stamp: u64,
    members: IndexMap<Name, Vec<DeclarationId>>,
}

impl MemberScope {
    pub fn from_entry(entry: &StructureEntry) -> Self {
        let mut members: IndexMap<Name, Vec<DeclarationId>> = IndexMap::new();

        for id in entry.ids() {
            members.entry(id.name.clone()).or_default().push(id.clone());
        }

        Self {
            key: entry.key().clone(),
            file: entry.file(),
            stamp: entry.stamp(),
            members,
        }
    }

    pub fn key(&self) -> &StructureKey {
        &self.key
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    /// Content stamp of the structure this scope was built from.
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub fn lookup(&self, name: &str) -> &[DeclarationId] {
        self.members.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn first(&self, name: &str) -> Option<&DeclarationId> {
        self.lookup(name).first()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &Name> {
        self.members.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, &[DeclarationId])> {
        self.members.iter().map(|(name, ids)| (name, ids.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
