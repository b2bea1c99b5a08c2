use std::{fmt, sync::Arc};

use enum_as_inner::EnumAsInner;
use strata_resolver::{
    id::{DeclarationId, FileId, ModuleId, Name, ScopePath},
    language::Language,
    phase::ResolvePhase,
    syntax::DeclarationKind,
};

use crate::source::SourceDeclaration;

/// Type names every module sees without an import.
pub const BUILTIN_TYPES: [&str; 4] = ["Int", "String", "Bool", "Unit"];

pub struct DriverLanguage;

impl Language for DriverLanguage {
    type Phase = ResolvePhase;
    type Raw = Arc<SourceDeclaration>;
    type Data = Resolved;

    fn raw_data(raw: &Self::Raw) -> Self::Data {
        Resolved::Raw(raw.kind)
    }
}

/// What one phase step established about a declaration.
#[derive(Debug, Clone, PartialEq, Eq, EnumAsInner)]
pub enum Resolved {
    Raw(DeclarationKind),
    Imports(Vec<ImportTarget>),
    Supertypes(Vec<DeclarationId>),
    Signature(Signature),
    /// Call targets, overloads included.
    Body(Vec<DeclarationId>),
}

/// The files an import of `package` brings into view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTarget {
    pub package: ScopePath,
    pub module: ModuleId,
    pub files: Vec<FileId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    Class {
        /// Own member names first, then inherited ones.
        members: Vec<Name>,
    },
    Callable {
        params: Vec<TypeRef>,
        returns: Option<TypeRef>,
    },
    Property {
        ty: Option<TypeRef>,
    },
    Alias {
        target: TypeRef,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Builtin(Name),
    Declared(DeclarationId),
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(name) => write!(f, "{name}"),
            Self::Declared(id) => write!(f, "{id}"),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, "]")
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Class { members } => {
                write!(f, "members ")?;
                write_list(f, members)
            }
            Self::Callable { params, returns } => {
                write_list(f, params)?;
                match returns {
                    Some(returns) => write!(f, " -> {returns}"),
                    None => Ok(()),
                }
            }
            Self::Property { ty: Some(ty) } => write!(f, ": {ty}"),
            Self::Property { ty: None } => write!(f, ": _"),
            Self::Alias { target } => write!(f, "= {target}"),
        }
    }
}

impl fmt::Display for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(kind) => write!(f, "{kind}"),
            Self::Imports(imports) => {
                let packages = imports
                    .iter()
                    .map(|import| format!("{}@{}", import.package, import.module))
                    .collect::<Vec<_>>();
                write_list(f, &packages)
            }
            Self::Supertypes(ids) | Self::Body(ids) => write_list(f, ids),
            Self::Signature(signature) => write!(f, "{signature}"),
        }
    }
}
