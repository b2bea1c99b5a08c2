use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use strata_resolver::{
    id::{DeclarationId, FileId, ModuleId, ScopePath},
    syntax::{ChildDeclaration, RawDeclaration, SyntaxProvider},
};

use crate::{
    error::{DriverError, DriverResult},
    language::DriverLanguage,
    manifest::{package_segments, FileManifest},
    source::{lower_file, SourceDeclaration},
};

#[derive(Debug)]
pub struct SourceFile {
    pub path: Utf8PathBuf,
    pub package: ScopePath,
    pub imports: Vec<ScopePath>,
    /// Changes on every replacement of the file.
    pub stamp: u64,
    pub top_level: Vec<ChildDeclaration>,
    pub declarations: IndexMap<DeclarationId, Arc<SourceDeclaration>>,
}

#[derive(Debug, Default)]
struct ModuleSource {
    files: IndexMap<FileId, SourceFile>,
    owners: HashMap<DeclarationId, FileId>,
    next_file: u32,
    next_stamp: u64,
}

impl ModuleSource {
    fn file_id(&self, path: &Utf8Path) -> Option<FileId> {
        self.files
            .iter()
            .find(|(_, file)| file.path.as_path() == path)
            .map(|(id, _)| *id)
    }
}

/// The raw declarations of one module, editable in place.
#[derive(Debug)]
pub struct ModuleSyntax {
    module: ModuleId,
    source: RwLock<ModuleSource>,
}

impl ModuleSyntax {
    pub fn new(module: ModuleId) -> Self {
        Self {
            module,
            source: RwLock::default(),
        }
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    /// Adds `file`, or replaces the file with the same path.
    ///
    /// Returns the id of the file and whether it is new to the module. On
    /// error the module is left as it was.
    pub fn set_file(&self, file: &FileManifest) -> DriverResult<(FileId, bool)> {
        let mut guard = self.write();
        let source = &mut *guard;

        let existing = source.file_id(&file.path);
        let id = existing.unwrap_or_else(|| FileId::new(source.next_file));

        let package = ScopePath::package(package_segments(&file.package));
        let lowered = lower_file(self.module, id, &package, &file.declarations)?;

        for declared in lowered.declarations.keys() {
            if source.owners.get(declared).is_some_and(|owner| *owner != id) {
                return Err(DriverError::DuplicateDeclaration {
                    path: declared.to_string(),
                });
            }
        }

        if existing.is_none() {
            source.next_file += 1;
        }

        if let Some(previous) = source.files.get(&id) {
            for declared in previous.declarations.keys() {
                source.owners.remove(declared);
            }
        }

        for declared in lowered.declarations.keys() {
            source.owners.insert(declared.clone(), id);
        }

        source.next_stamp += 1;

        let imports = file
            .imports
            .iter()
            .map(|import| ScopePath::package(package_segments(import)))
            .collect();

        source.files.insert(
            id,
            SourceFile {
                path: file.path.clone(),
                package,
                imports,
                stamp: source.next_stamp,
                top_level: lowered.top_level,
                declarations: lowered.declarations,
            },
        );

        Ok((id, existing.is_none()))
    }

    pub fn remove_file(&self, path: &Utf8Path) -> Option<FileId> {
        let mut guard = self.write();
        let source = &mut *guard;

        let id = source.file_id(path)?;
        let removed = source.files.shift_remove(&id)?;

        for declared in removed.declarations.keys() {
            source.owners.remove(declared);
        }

        Some(id)
    }

    pub fn file_id(&self, path: &Utf8Path) -> Option<FileId> {
        self.read().file_id(path)
    }

    pub fn file_path(&self, file: FileId) -> Option<Utf8PathBuf> {
        self.read().files.get(&file).map(|file| file.path.clone())
    }

    pub fn files(&self) -> Vec<FileId> {
        self.read().files.keys().copied().collect()
    }

    /// Every declaration of the module, file by file in source order.
    pub fn declarations(&self) -> Vec<DeclarationId> {
        self.read()
            .files
            .values()
            .flat_map(|file| file.declarations.keys().cloned())
            .collect()
    }

    pub fn source(&self, id: &DeclarationId) -> Option<Arc<SourceDeclaration>> {
        let source = self.read();
        let file = source.owners.get(id)?;
        source.files.get(file)?.declarations.get(id).cloned()
    }

    pub fn package_of(&self, file: FileId) -> Option<ScopePath> {
        self.read().files.get(&file).map(|file| file.package.clone())
    }

    pub fn imports_of(&self, file: FileId) -> Vec<ScopePath> {
        self.read()
            .files
            .get(&file)
            .map(|file| file.imports.clone())
            .unwrap_or_default()
    }

    /// Files declaring into `package`.
    pub fn files_in(&self, package: &ScopePath) -> Vec<FileId> {
        self.read()
            .files
            .iter()
            .filter(|(_, file)| file.package == *package)
            .map(|(id, _)| *id)
            .collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, ModuleSource> {
        self.source.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, ModuleSource> {
        self.source.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SyntaxProvider<DriverLanguage> for ModuleSyntax {
    fn declaration(&self, id: &DeclarationId) -> Option<RawDeclaration<Arc<SourceDeclaration>>> {
        if id.module != self.module {
            return None;
        }

        let raw = self.source(id)?;

        Some(RawDeclaration {
            file: raw.file,
            kind: raw.kind,
            raw,
        })
    }

    fn children(&self, raw: &Arc<SourceDeclaration>) -> Vec<ChildDeclaration> {
        raw.children.clone()
    }

    fn file_declarations(&self, file: FileId) -> Option<Vec<ChildDeclaration>> {
        self.read().files.get(&file).map(|file| file.top_level.clone())
    }

    fn file_stamp(&self, file: FileId) -> u64 {
        // Stamps start at one, so a missing file never matches a cached one.
        self.read().files.get(&file).map_or(0, |file| file.stamp)
    }
}
