use std::{fmt, sync::Arc};

use crate::{id::DeclarationId, language::Language, phase::Phase};

/// Typed data of one declaration, one slot per phase from the initial phase
/// up to [`TypedSlice::phase`].
pub struct TypedSlice<L: Language> {
    id: DeclarationId,
    raw: L::Raw,
    slots: Vec<Arc<L::Data>>,
}

impl<L: Language> TypedSlice<L> {
    pub(crate) fn new(id: DeclarationId, raw: L::Raw, slots: Vec<Arc<L::Data>>) -> Self {
        debug_assert!(!slots.is_empty() && slots.len() <= L::Phase::COUNT);
        Self { id, raw, slots }
    }

    pub fn id(&self) -> &DeclarationId {
        &self.id
    }

    pub fn raw(&self) -> &L::Raw {
        &self.raw
    }

    pub fn phase(&self) -> L::Phase {
        L::Phase::from_position(self.slots.len() - 1).unwrap_or(L::Phase::INITIAL)
    }

    /// Data produced when the declaration entered `phase`.
    pub fn get(&self, phase: L::Phase) -> Option<&L::Data> {
        self.slots.get(phase.position()).map(|slot| &**slot)
    }

    pub fn get_shared(&self, phase: L::Phase) -> Option<Arc<L::Data>> {
        self.slots.get(phase.position()).cloned()
    }

    /// Data of the highest phase in this slice.
    pub fn latest(&self) -> &L::Data {
        &self.slots[self.slots.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = (L::Phase, &L::Data)> {
        L::Phase::all().zip(self.slots.iter().map(|slot| &**slot))
    }

    /// Same slice cut down to `phase`, or `None` if `phase` is above this slice.
    pub fn truncated(&self, phase: L::Phase) -> Option<Self> {
        let len = phase.position() + 1;

        (len <= self.slots.len()).then(|| Self {
            id: self.id.clone(),
            raw: self.raw.clone(),
            slots: self.slots[..len].to_vec(),
        })
    }

    /// Whether both slices share every slot allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.slots.len() == other.slots.len()
            && self
                .slots
                .iter()
                .zip(&other.slots)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

impl<L: Language> Clone for TypedSlice<L> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            raw: self.raw.clone(),
            slots: self.slots.clone(),
        }
    }
}

impl<L: Language> fmt::Debug for TypedSlice<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedSlice")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .field("latest", self.latest())
            .finish()
    }
}
