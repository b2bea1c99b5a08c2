//! Module for managing the modules of a project and the resolver over them.

use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use log::{debug, info};
use strata_resolver::{
    error::ResolveError,
    id::{DeclarationId, FileId, ModuleId, Name, ScopePath},
    invalidation::InvalidationController,
    phase::{Phase, ResolvePhase},
    provider::SessionRegistry,
    resolver::{ClassSlice, LazyDeclarationResolver},
    scope::MemberScope,
    session::{InvalidationScope, ModuleResolutionSession},
    slice::TypedSlice,
    structure::StructureKey,
    syntax::SyntaxProvider,
};
use strata_utils::dependency::DependencyGraph;

use crate::{
    analyzer::Analyzer,
    config::DriverConfig,
    error::{DriverError, DriverResult},
    index::{ModuleEntry, ProjectIndex},
    language::DriverLanguage,
    manifest::{package_segments, FileManifest, Manifest, ModuleManifest},
    syntax::ModuleSyntax,
    trackers::ProjectTrackers,
};


/// Outcome of [`Workspace::check`].
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Declarations that reached the terminal phase.
    pub resolved: usize,
    pub failures: Vec<(DeclarationId, ResolveError)>,
    /// Checking stopped at the error limit.
    pub truncated: bool,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Every module of a project, one resolution session each.
///
/// Edits go through the workspace so that the matching invalidation trigger
/// fires. Resolution itself only needs `&self`.
pub struct Workspace {
    config: DriverConfig,
    index: Arc<RwLock<ProjectIndex>>,
    registry: Arc<SessionRegistry<DriverLanguage>>,
    trackers: Arc<ProjectTrackers>,
    invalidation: Arc<InvalidationController>,
    resolver: LazyDeclarationResolver<DriverLanguage>,
    /// Module -> modules it depends on
    graph: DependencyGraph<ModuleId>,
    next_module: u32,
}

impl Workspace {
    pub fn new(config: DriverConfig) -> Self {
        let index = Arc::new(RwLock::new(ProjectIndex::new()));
        let registry = Arc::new(SessionRegistry::<DriverLanguage>::new());
        let invalidation = Arc::new(InvalidationController::new());

        let resolver = LazyDeclarationResolver::<DriverLanguage>::new(
            registry.clone(),
            Arc::new(Analyzer::new(index.clone())),
            invalidation.clone(),
            config.resolver.clone(),
        );

        Self {
            config,
            index,
            registry,
            trackers: Arc::new(ProjectTrackers::new()),
            invalidation,
            resolver,
            graph: DependencyGraph::new(),
            next_module: 0,
        }
    }

    /// Builds a workspace from `manifest`, dependencies first.
    pub fn load(manifest: &Manifest) -> DriverResult<Self> {
        let mut workspace = Self::new(manifest.config.clone());
        let mut ids = IndexMap::<Name, ModuleId>::new();

        for module in &manifest.modules {
            if ids.contains_key(&module.name) {
                return Err(DriverError::DuplicateModule(module.name.to_string()));
            }

            let id = workspace.fresh_module();
            ids.insert(module.name.clone(), id);
        }

        let mut graph = DependencyGraph::new();
        let mut manifests = HashMap::new();

        for module in &manifest.modules {
            let id = ids[&module.name];
            graph.add_node(id);
            manifests.insert(id, module);

            for dependency in &module.dependencies {
                let target = ids
                    .get(dependency)
                    .ok_or_else(|| DriverError::UnknownModule(dependency.to_string()))?;
                graph.add_dependency(id, *target);
            }
        }

        let order = graph.topological_sort().map_err(|cycle| {
            DriverError::ModuleCycle(cycle.map(|id| {
                ids.iter()
                    .find(|(_, module)| **module == id)
                    .map(|(name, _)| name.to_string())
                    .unwrap_or_else(|| id.to_string())
            }))
        })?;

        for id in order {
            if let Some(module) = manifests.get(&id) {
                workspace.insert_module(id, module)?;
            }
        }

        info!("Loaded {} modules", workspace.registry.len());

        Ok(workspace)
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn resolver(&self) -> &LazyDeclarationResolver<DriverLanguage> {
        &self.resolver
    }

    /// Module names, dependencies first.
    pub fn modules(&self) -> Vec<Name> {
        self.index()
            .iter()
            .map(|(_, entry)| entry.name.clone())
            .collect()
    }

    pub fn module_id(&self, name: &str) -> DriverResult<ModuleId> {
        self.index()
            .module_named(name)
            .ok_or_else(|| DriverError::UnknownModule(name.to_owned()))
    }

    pub fn module_name(&self, module: ModuleId) -> Option<Name> {
        self.index().name_of(module).cloned()
    }

    pub fn session(&self, name: &str) -> DriverResult<Arc<ModuleResolutionSession<DriverLanguage>>> {
        let module = self.module_id(name)?;
        self.registry
            .get(module)
            .ok_or_else(|| DriverError::UnknownModule(name.to_owned()))
    }

    /// Parses `module:package/Outer.name#index`.
    ///
    /// The package part may be left out together with its slash, and so may
    /// the index.
    pub fn declaration(&self, path: &str) -> DriverResult<DeclarationId> {
        let invalid = || DriverError::InvalidPath(path.to_owned());

        let (module, rest) = path.split_once(':').ok_or_else(invalid)?;
        let module = self.module_id(module)?;

        let (package, rest) = rest.split_once('/').unwrap_or(("", rest));
        let (rest, index) = match rest.rsplit_once('#') {
            Some((rest, index)) => (rest, index.parse::<u32>().map_err(|_| invalid())?),
            None => (rest, 0),
        };

        let mut segments = rest.split('.').map(Name::from).collect::<Vec<_>>();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(invalid());
        }

        let name = segments.pop().ok_or_else(invalid)?;

        Ok(DeclarationId {
            module,
            scope: ScopePath::new(package_segments(package), segments),
            name,
            index,
        })
    }

    /// Renders `id` the way [`Self::declaration`] reads it.
    pub fn display_id(&self, id: &DeclarationId) -> String {
        let module = self
            .module_name(id.module)
            .map_or_else(|| id.module.to_string(), |name| name.to_string());

        let mut path = format!("{module}:");

        if !id.scope.package.is_empty() {
            path.push_str(&id.scope.package.join("."));
            path.push('/');
        }

        for class in id.scope.classes.iter() {
            path.push_str(class);
            path.push('.');
        }

        path.push_str(&id.name);

        if id.index != 0 {
            path.push_str(&format!("#{}", id.index));
        }

        path
    }

    pub fn resolve(
        &self,
        path: &str,
        phase: ResolvePhase,
    ) -> DriverResult<TypedSlice<DriverLanguage>> {
        let id = self.declaration(path)?;
        Ok(self.resolver.resolve_to_phase(&id, phase)?)
    }

    pub fn resolve_with_members(
        &self,
        path: &str,
        phase: ResolvePhase,
    ) -> DriverResult<ClassSlice<DriverLanguage>> {
        let id = self.declaration(path)?;
        Ok(self.resolver.resolve_with_members(&id, phase)?)
    }

    /// Member scope of a file.
    pub fn scope(&self, module: &str, path: &Utf8Path) -> DriverResult<Arc<MemberScope>> {
        let (id, file) = self.file(module, path)?;
        Ok(self.resolver.get_scope(&StructureKey::File(id, file))?)
    }

    /// Resolves every declaration to the terminal phase, modules in
    /// dependency order.
    pub fn check(&self) -> CheckReport {
        let syntaxes = self
            .index()
            .iter()
            .map(|(_, entry)| entry.syntax.clone())
            .collect::<Vec<_>>();

        let mut report = CheckReport::default();

        for syntax in syntaxes {
            for id in syntax.declarations() {
                match self.resolver.resolve_to_phase(&id, ResolvePhase::TERMINAL) {
                    Ok(_) => report.resolved += 1,
                    Err(error) => {
                        if self
                            .config
                            .error_limit
                            .is_some_and(|limit| report.failures.len() >= limit)
                        {
                            report.truncated = true;
                            return report;
                        }

                        debug!("Check of `{}` failed: {error}", self.display_id(&id));
                        report.failures.push((id, error));
                    }
                }
            }
        }

        report
    }

    /// Adds a module whose dependencies are all loaded already.
    pub fn add_module(&mut self, manifest: &ModuleManifest) -> DriverResult<ModuleId> {
        if self.index().module_named(&manifest.name).is_some() {
            return Err(DriverError::DuplicateModule(manifest.name.to_string()));
        }

        let id = self.fresh_module();
        self.insert_module(id, manifest)?;
        self.trackers.touch_structure();

        Ok(id)
    }

    /// Unloads a module nothing depends on.
    pub fn remove_module(&mut self, name: &str) -> DriverResult<()> {
        let id = self.module_id(name)?;

        let mut dependents = self
            .graph
            .dependents_of(&id)
            .filter_map(|dependent| self.module_name(*dependent))
            .map(|name| name.to_string())
            .collect::<Vec<_>>();

        if !dependents.is_empty() {
            dependents.sort();
            return Err(DriverError::ModuleInUse {
                module: name.to_owned(),
                dependents,
            });
        }

        self.graph.remove_node(&id);
        if let Some(session) = self.registry.remove(id) {
            self.invalidation.unregister(session.id());
        }
        self.index_mut().remove(id);
        self.trackers.forget(id);
        self.trackers.touch_structure();

        info!("Removed module `{name}`");
        Ok(())
    }

    /// Adds or replaces a file and fires the matching trigger.
    ///
    /// Replacing a file is a content change of its module. Adding one changes
    /// the project structure.
    pub fn edit_file(&self, module: &str, file: &FileManifest) -> DriverResult<FileId> {
        let id = self.module_id(module)?;
        let (file_id, new) = self.syntax(id)?.set_file(file)?;

        if new {
            self.trackers.touch_structure();
        } else {
            self.trackers.touch(id);
        }

        debug!("Edited `{}` in module `{module}`", file.path);
        Ok(file_id)
    }

    pub fn remove_file(&self, module: &str, path: &Utf8Path) -> DriverResult<FileId> {
        let (id, _) = self.file(module, path)?;
        let file = self.syntax(id)?.remove_file(path).ok_or_else(|| DriverError::UnknownFile {
            module: module.to_owned(),
            path: path.to_owned(),
        })?;

        self.trackers.touch_structure();
        Ok(file)
    }

    /// Replaces an existing file without firing any trigger.
    ///
    /// Nothing notices the new content until [`Self::invalidate_file`] or a
    /// tracker change invalidates it.
    pub fn replace_file(&self, module: &str, file: &FileManifest) -> DriverResult<FileId> {
        let (id, _) = self.file(module, &file.path)?;
        let (file_id, _) = self.syntax(id)?.set_file(file)?;
        Ok(file_id)
    }

    /// Invalidates the work of one file only.
    ///
    /// Other files keep their results, even those that used declarations of
    /// this file.
    pub fn invalidate_file(&self, module: &str, path: &Utf8Path) -> DriverResult<()> {
        let (id, file) = self.file(module, path)?;
        self.session(module)?.invalidate(InvalidationScope::File(file));

        debug!("Invalidated `{path}` (file {file}) of module {id}");
        Ok(())
    }

    fn file(&self, module: &str, path: &Utf8Path) -> DriverResult<(ModuleId, FileId)> {
        let id = self.module_id(module)?;
        let file = self
            .syntax(id)?
            .file_id(path)
            .ok_or_else(|| DriverError::UnknownFile {
                module: module.to_owned(),
                path: Utf8PathBuf::from(path),
            })?;

        Ok((id, file))
    }

    fn syntax(&self, module: ModuleId) -> DriverResult<Arc<ModuleSyntax>> {
        self.index()
            .get(module)
            .map(|entry| entry.syntax.clone())
            .ok_or_else(|| DriverError::UnknownModule(module.to_string()))
    }

    fn insert_module(&mut self, id: ModuleId, manifest: &ModuleManifest) -> DriverResult<()> {
        let dependencies = manifest
            .dependencies
            .iter()
            .map(|name| self.module_id(name))
            .collect::<DriverResult<Vec<_>>>()?;

        let syntax = Arc::new(ModuleSyntax::new(id));
        for file in &manifest.files {
            syntax.set_file(file)?;
        }

        self.graph.add_node(id);
        for dependency in &dependencies {
            self.graph.add_dependency(id, *dependency);
        }

        self.trackers
            .watch(id, self.graph.transitive_dependencies_of(&id));

        let provider: Arc<dyn SyntaxProvider<DriverLanguage>> = syntax.clone();
        let session = Arc::new(ModuleResolutionSession::new(
            id,
            manifest.kind,
            provider,
            &self.config.resolver,
        ));

        self.invalidation
            .register_from(&session, &*self.trackers);
        self.registry.insert(session);

        self.index_mut().insert(
            id,
            ModuleEntry {
                name: manifest.name.clone(),
                kind: manifest.kind,
                dependencies,
                syntax,
            },
        );

        debug!(
            "Loaded {} module `{}` as {id} with {} files",
            manifest.kind,
            manifest.name,
            manifest.files.len()
        );

        Ok(())
    }

    fn fresh_module(&mut self) -> ModuleId {
        let id = ModuleId::new(self.next_module);
        self.next_module += 1;
        id
    }

    fn index(&self) -> RwLockReadGuard<'_, ProjectIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn index_mut(&self) -> RwLockWriteGuard<'_, ProjectIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }
}
