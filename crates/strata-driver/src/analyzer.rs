//! Phase producers of the driver language.
//!
//! Every name is looked up through member scopes, innermost first:
//!
//! 1. the enclosing classes, innermost first,
//! 2. the files of the declaring package, own file first,
//! 3. the files brought in by imports.
//!
//! Inherited members contribute to class signatures only. Calls are resolved
//! lexically.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use log::trace;
use strata_resolver::{
    error::ProducerError,
    id::{DeclarationId, Name, ScopePath},
    language::Language,
    phase::ResolvePhase,
    producer::{Dependency, PhaseProducer, StepContext},
    slice::TypedSlice,
    structure::StructureKey,
    syntax::DeclarationKind,
};

use crate::{
    index::ProjectIndex,
    language::{DriverLanguage, ImportTarget, Resolved, Signature, TypeRef, BUILTIN_TYPES},
    source::SourceDeclaration,
};

type Cx<'a> = StepContext<'a, DriverLanguage>;
type Slice = TypedSlice<DriverLanguage>;

pub struct Analyzer {
    index: Arc<RwLock<ProjectIndex>>,
}

impl Analyzer {
    pub fn new(index: Arc<RwLock<ProjectIndex>>) -> Self {
        Self { index }
    }

    fn index(&self) -> RwLockReadGuard<'_, ProjectIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn imports(&self, raw: &SourceDeclaration) -> Result<Vec<ImportTarget>, ProducerError> {
        let index = self.index();
        let module = raw.id.module;
        let entry = index
            .get(module)
            .ok_or_else(|| ProducerError::new(format!("module {module} is not loaded")))?;

        let mut targets = Vec::new();

        for package in entry.syntax.imports_of(raw.file) {
            let before = targets.len();

            for visible in index.visible_from(module) {
                let Some(entry) = index.get(visible) else {
                    continue;
                };

                let files = entry.syntax.files_in(&package);
                if !files.is_empty() {
                    targets.push(ImportTarget {
                        package: package.clone(),
                        module: visible,
                        files,
                    });
                }
            }

            if targets.len() == before {
                return Err(ProducerError::new(format!("unresolved import `{package}`")));
            }
        }

        Ok(targets)
    }

    /// Scopes searched for names used by `raw`, innermost first.
    fn search_path(&self, raw: &SourceDeclaration, prior: &Slice) -> Vec<StructureKey> {
        let module = raw.id.module;
        let mut keys = Vec::new();

        let mut enclosing = raw.id.parent();
        while let Some(class) = enclosing {
            enclosing = class.parent();
            keys.push(StructureKey::Class(class));
        }

        keys.push(StructureKey::File(module, raw.file));

        if let Some(entry) = self.index().get(module) {
            let package = ScopePath::package(raw.id.scope.package.iter().cloned());
            let siblings = entry.syntax.files_in(&package);

            keys.extend(
                siblings
                    .into_iter()
                    .filter(|file| *file != raw.file)
                    .map(|file| StructureKey::File(module, file)),
            );
        }

        let imports = prior
            .get(ResolvePhase::Imports)
            .and_then(Resolved::as_imports);

        for import in imports.into_iter().flatten() {
            keys.extend(
                import
                    .files
                    .iter()
                    .map(|file| StructureKey::File(import.module, *file)),
            );
        }

        keys
    }

    /// Declarations called `name` in the first scope that has any of the
    /// accepted kind.
    fn find(
        &self,
        cx: &Cx<'_>,
        keys: &[StructureKey],
        name: &str,
        accepts: impl Fn(DeclarationKind) -> bool,
    ) -> Result<Vec<DeclarationId>, ProducerError> {
        for key in keys {
            let scope = cx.scope(key)?;
            let candidates = scope.lookup(name);

            if candidates.is_empty() {
                continue;
            }

            let entry = cx.structure_of(key)?;
            let found = candidates
                .iter()
                .filter(|id| {
                    entry
                        .children()
                        .iter()
                        .any(|child| child.id == **id && accepts(child.kind))
                })
                .cloned()
                .collect::<Vec<_>>();

            if !found.is_empty() {
                trace!("`{name}` found in {key}");
                return Ok(found);
            }
        }

        Ok(Vec::new())
    }

    fn resolve_type(
        &self,
        cx: &Cx<'_>,
        keys: &[StructureKey],
        name: &Name,
    ) -> Result<TypeRef, ProducerError> {
        if BUILTIN_TYPES.contains(&name.as_str()) {
            return Ok(TypeRef::Builtin(name.clone()));
        }

        let found = self.find(cx, keys, name, |kind| {
            matches!(kind, DeclarationKind::Class | DeclarationKind::TypeAlias)
        })?;

        found
            .into_iter()
            .next()
            .map(TypeRef::Declared)
            .ok_or_else(|| ProducerError::new(format!("unresolved type `{name}`")))
    }

    fn supertypes(
        &self,
        cx: &Cx<'_>,
        raw: &SourceDeclaration,
        prior: &Slice,
    ) -> Result<Vec<DeclarationId>, ProducerError> {
        if raw.supertypes.is_empty() {
            return Ok(Vec::new());
        }

        let keys = self.search_path(raw, prior);
        let mut supertypes = Vec::with_capacity(raw.supertypes.len());

        for name in &raw.supertypes {
            let found = self.find(cx, &keys, name, |kind| kind == DeclarationKind::Class)?;
            let supertype = found
                .into_iter()
                .next()
                .ok_or_else(|| ProducerError::new(format!("`{name}` does not name a class")))?;

            supertypes.push(supertype);
        }

        Ok(supertypes)
    }

    fn signature(
        &self,
        cx: &Cx<'_>,
        raw: &SourceDeclaration,
        prior: &Slice,
    ) -> Result<Signature, ProducerError> {
        let keys = self.search_path(raw, prior);

        let signature = match raw.kind {
            DeclarationKind::Class => {
                let mut members = Vec::<Name>::new();

                for child in &raw.children {
                    if !members.contains(&child.id.name) {
                        members.push(child.id.name.clone());
                    }
                }

                for supertype in resolved_supertypes(prior) {
                    let inherited = cx
                        .dependency(supertype)
                        .and_then(|slice| slice.get(ResolvePhase::SignaturesResolved))
                        .and_then(Resolved::as_signature);

                    if let Some(Signature::Class { members: inherited }) = inherited {
                        for name in inherited {
                            if !members.contains(name) {
                                members.push(name.clone());
                            }
                        }
                    }
                }

                Signature::Class { members }
            }
            DeclarationKind::Function => {
                let params = raw
                    .params
                    .iter()
                    .map(|param| self.resolve_type(cx, &keys, param))
                    .collect::<Result<Vec<_>, _>>()?;
                let returns = raw
                    .ty
                    .as_ref()
                    .map(|ty| self.resolve_type(cx, &keys, ty))
                    .transpose()?;

                Signature::Callable { params, returns }
            }
            DeclarationKind::Property => Signature::Property {
                ty: raw
                    .ty
                    .as_ref()
                    .map(|ty| self.resolve_type(cx, &keys, ty))
                    .transpose()?,
            },
            DeclarationKind::TypeAlias => {
                let target = raw
                    .ty
                    .as_ref()
                    .ok_or_else(|| ProducerError::new("type alias without a target"))?;

                Signature::Alias {
                    target: self.resolve_type(cx, &keys, target)?,
                }
            }
        };

        Ok(signature)
    }

    fn callees(
        &self,
        cx: &Cx<'_>,
        raw: &SourceDeclaration,
        prior: &Slice,
    ) -> Result<Vec<DeclarationId>, ProducerError> {
        if raw.calls.is_empty() {
            return Ok(Vec::new());
        }

        let keys = self.search_path(raw, prior);
        let mut callees = Vec::new();

        for name in &raw.calls {
            let found = self.find(cx, &keys, name, |kind| {
                matches!(kind, DeclarationKind::Function | DeclarationKind::Property)
            })?;

            if found.is_empty() {
                return Err(ProducerError::new(format!("unresolved reference `{name}`")));
            }

            for callee in found {
                if !callees.contains(&callee) {
                    callees.push(callee);
                }
            }
        }

        Ok(callees)
    }
}

fn resolved_supertypes(prior: &Slice) -> &[DeclarationId] {
    prior
        .get(ResolvePhase::SupertypesResolved)
        .and_then(Resolved::as_supertypes)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

impl PhaseProducer<DriverLanguage> for Analyzer {
    fn dependencies(
        &self,
        cx: &Cx<'_>,
        raw: &Arc<SourceDeclaration>,
        prior: &Slice,
    ) -> Result<Vec<Dependency<ResolvePhase>>, ProducerError> {
        let dependencies = match cx.phase() {
            ResolvePhase::Raw | ResolvePhase::Imports => Vec::new(),
            ResolvePhase::SupertypesResolved => self
                .supertypes(cx, raw, prior)?
                .into_iter()
                .map(|id| Dependency::new(id, ResolvePhase::SupertypesResolved))
                .collect(),
            ResolvePhase::SignaturesResolved => match raw.kind {
                DeclarationKind::Class => resolved_supertypes(prior)
                    .iter()
                    .map(|id| Dependency::new(id.clone(), ResolvePhase::SignaturesResolved))
                    .collect(),
                DeclarationKind::Function | DeclarationKind::Property => raw
                    .id
                    .parent()
                    .map(|class| Dependency::new(class, ResolvePhase::SupertypesResolved))
                    .into_iter()
                    .collect(),
                DeclarationKind::TypeAlias => Vec::new(),
            },
            ResolvePhase::BodiesResolved => self
                .callees(cx, raw, prior)?
                .into_iter()
                .map(|id| Dependency::new(id, ResolvePhase::SignaturesResolved))
                .collect(),
        };

        Ok(dependencies)
    }

    fn produce(
        &self,
        cx: &Cx<'_>,
        raw: &Arc<SourceDeclaration>,
        prior: &Slice,
    ) -> Result<Resolved, ProducerError> {
        match cx.phase() {
            ResolvePhase::Raw => Ok(DriverLanguage::raw_data(raw)),
            ResolvePhase::Imports => self.imports(raw).map(Resolved::Imports),
            ResolvePhase::SupertypesResolved => {
                self.supertypes(cx, raw, prior).map(Resolved::Supertypes)
            }
            ResolvePhase::SignaturesResolved => {
                self.signature(cx, raw, prior).map(Resolved::Signature)
            }
            ResolvePhase::BodiesResolved => self.callees(cx, raw, prior).map(Resolved::Body),
        }
    }
}
