use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::{
    id::{DeclarationId, FileId},
    language::Language,
};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    #[display("class")]
    Class,
    #[display("function")]
    Function,
    #[display("property")]
    Property,
    #[display("type alias")]
    TypeAlias,
}

impl DeclarationKind {
    /// Whether declarations of this kind have members of their own.
    pub fn has_members(self) -> bool {
        matches!(self, Self::Class)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildDeclaration {
    pub id: DeclarationId,
    pub kind: DeclarationKind,
}

impl ChildDeclaration {
    pub fn new(id: DeclarationId, kind: DeclarationKind) -> Self {
        Self { id, kind }
    }
}

/// What the syntax collaborator knows about one declaration.
#[derive(Debug, Clone)]
pub struct RawDeclaration<R> {
    pub raw: R,
    pub file: FileId,
    pub kind: DeclarationKind,
}

/// The raw declaration collaborator of one module.
///
/// Every method must be free of side effects and cheap to call repeatedly.
pub trait SyntaxProvider<L: Language>: Send + Sync {
    fn declaration(&self, id: &DeclarationId) -> Option<RawDeclaration<L::Raw>>;

    /// Direct children of a raw declaration, in source order.
    fn children(&self, raw: &L::Raw) -> Vec<ChildDeclaration>;

    /// Top level declarations of a file, in source order.
    fn file_declarations(&self, file: FileId) -> Option<Vec<ChildDeclaration>>;

    /// Changes whenever the content of `file` changes.
    fn file_stamp(&self, file: FileId) -> u64;
}
