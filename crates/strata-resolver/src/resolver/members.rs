use indexmap::IndexMap;

use crate::{
    context::ResolutionContext,
    error::ResolveResult,
    id::DeclarationId,
    language::Language,
    slice::TypedSlice,
    structure::StructureKey,
};

use super::LazyDeclarationResolver;

/// A class header together with its direct members, all at the same phase.
pub struct ClassSlice<L: Language> {
    pub class: TypedSlice<L>,
    /// Members in declaration order.
    pub members: IndexMap<DeclarationId, TypedSlice<L>>,
}

impl<L: Language> ClassSlice<L> {
    pub fn member(&self, id: &DeclarationId) -> Option<&TypedSlice<L>> {
        self.members.get(id)
    }

    /// Members called `name`, overloads included.
    pub fn members_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TypedSlice<L>> {
        self.members
            .iter()
            .filter(move |(id, _)| id.name.as_str() == name)
            .map(|(_, slice)| slice)
    }
}

impl<L: Language> std::fmt::Debug for ClassSlice<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassSlice")
            .field("class", &self.class)
            .field("members", &self.members)
            .finish()
    }
}

impl<L: Language> LazyDeclarationResolver<L> {
    /// Resolves a class and each of its direct members to `phase`.
    ///
    /// The header is resolved first. Members are resolved independently of
    /// each other after that.
    pub fn resolve_with_members(
        &self,
        class: &DeclarationId,
        phase: L::Phase,
    ) -> ResolveResult<ClassSlice<L>> {
        let mut cx = ResolutionContext::new();
        self.resolve_members_with(&mut cx, class, phase)
    }

    pub fn resolve_members_with(
        &self,
        cx: &mut ResolutionContext<L>,
        class: &DeclarationId,
        phase: L::Phase,
    ) -> ResolveResult<ClassSlice<L>> {
        let header = self.resolve(cx, class, phase)?;

        let entry = self
            .session_of(cx.overlay(), &StructureKey::Class(class.clone()))?
            .structure_of(&StructureKey::Class(class.clone()))?;

        let mut members = IndexMap::with_capacity(entry.children().len());

        for member in entry.ids() {
            let slice = self.resolve(cx, member, phase)?;
            members.insert(member.clone(), slice);
        }

        Ok(ClassSlice {
            class: header,
            members,
        })
    }
}
