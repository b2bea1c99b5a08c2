//! Lowering of manifest declarations into the raw declarations handed to the
//! resolver.

use std::{collections::HashMap, sync::Arc};

use indexmap::IndexMap;
use strata_resolver::{
    id::{DeclarationId, FileId, ModuleId, Name, ScopePath},
    syntax::{ChildDeclaration, DeclarationKind},
};

use crate::{
    error::{DriverError, DriverResult},
    manifest::DeclarationManifest,
};

/// One declaration as the syntax collaborator sees it.
///
/// Names are unresolved. `ty` is the return type of a function, the type of a
/// property or the target of a type alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDeclaration {
    pub id: DeclarationId,
    pub file: FileId,
    pub kind: DeclarationKind,
    pub supertypes: Vec<Name>,
    pub params: Vec<Name>,
    pub ty: Option<Name>,
    pub calls: Vec<Name>,
    pub children: Vec<ChildDeclaration>,
}

#[derive(Debug, Default)]
pub struct LoweredFile {
    pub top_level: Vec<ChildDeclaration>,
    /// Every declaration of the file, parents before their members.
    pub declarations: IndexMap<DeclarationId, Arc<SourceDeclaration>>,
}

pub fn lower_file(
    module: ModuleId,
    file: FileId,
    package: &ScopePath,
    declarations: &[DeclarationManifest],
) -> DriverResult<LoweredFile> {
    let mut lowered = IndexMap::new();
    let top_level = lower_scope(module, file, package, declarations, &mut lowered)?;

    Ok(LoweredFile {
        top_level,
        declarations: lowered,
    })
}

fn lower_scope(
    module: ModuleId,
    file: FileId,
    scope: &ScopePath,
    declarations: &[DeclarationManifest],
    out: &mut IndexMap<DeclarationId, Arc<SourceDeclaration>>,
) -> DriverResult<Vec<ChildDeclaration>> {
    // Only functions may share a name. Every overload gets the next index.
    let mut seen = HashMap::<Name, (DeclarationKind, u32)>::new();
    let mut children = Vec::with_capacity(declarations.len());

    for declaration in declarations {
        let kind = declaration.kind();
        let name = declaration.name().clone();

        let index = match seen.get_mut(&name) {
            Some((first, count))
                if *first == DeclarationKind::Function && kind == DeclarationKind::Function =>
            {
                *count += 1;
                *count - 1
            }
            Some(_) => {
                let id = DeclarationId::new(module, scope.clone(), name);
                return Err(DriverError::DuplicateDeclaration {
                    path: id.to_string(),
                });
            }
            None => {
                seen.insert(name.clone(), (kind, 1));
                0
            }
        };

        let id = DeclarationId::new(module, scope.clone(), name).with_index(index);
        let slot = out.len();

        let source = match declaration {
            DeclarationManifest::Class {
                supertypes,
                members,
                ..
            } => {
                let members = lower_scope(module, file, &id.scope.enter(id.name.clone()), members, out)?;

                SourceDeclaration {
                    id: id.clone(),
                    file,
                    kind,
                    supertypes: supertypes.clone(),
                    params: Vec::new(),
                    ty: None,
                    calls: Vec::new(),
                    children: members,
                }
            }
            DeclarationManifest::Function {
                params,
                returns,
                calls,
                ..
            } => SourceDeclaration {
                id: id.clone(),
                file,
                kind,
                supertypes: Vec::new(),
                params: params.clone(),
                ty: returns.clone(),
                calls: calls.clone(),
                children: Vec::new(),
            },
            DeclarationManifest::Property { ty, calls, .. } => SourceDeclaration {
                id: id.clone(),
                file,
                kind,
                supertypes: Vec::new(),
                params: Vec::new(),
                ty: ty.clone(),
                calls: calls.clone(),
                children: Vec::new(),
            },
            DeclarationManifest::TypeAlias { target, .. } => SourceDeclaration {
                id: id.clone(),
                file,
                kind,
                supertypes: Vec::new(),
                params: Vec::new(),
                ty: Some(target.clone()),
                calls: Vec::new(),
                children: Vec::new(),
            },
        };

        out.insert(id.clone(), Arc::new(source));
        // Members were inserted first, move the class in front of them.
        out.move_index(out.len() - 1, slot);

        children.push(ChildDeclaration::new(id, kind));
    }

    Ok(children)
}
