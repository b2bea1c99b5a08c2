use std::{fmt, sync::Arc};

use ecow::EcoString;
use serde::{Deserialize, Serialize};
use strata_utils::{define_generated_id, define_id};

pub type Name = EcoString;

define_id!(
    /// A compilation module known to the session provider.
    ModuleId
);
define_id!(
    /// A source file inside a module.
    FileId
);
define_generated_id!(
    /// A module resolution session. Fresh for every constructed session.
    SessionId
);
define_generated_id!(
    /// One top level resolution request.
    RequestId
);

/// Path of the scopes containing a declaration: the package it lives in and
/// the chain of enclosing classes, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScopePath {
    pub package: Arc<[Name]>,
    pub classes: Arc<[Name]>,
}

impl Default for ScopePath {
    fn default() -> Self {
        Self::new([], [])
    }
}

impl ScopePath {
    pub fn new(
        package: impl IntoIterator<Item = Name>,
        classes: impl IntoIterator<Item = Name>,
    ) -> Self {
        Self {
            package: package.into_iter().collect(),
            classes: classes.into_iter().collect(),
        }
    }

    pub fn package(package: impl IntoIterator<Item = Name>) -> Self {
        Self::new(package, [])
    }

    pub fn is_top_level(&self) -> bool {
        self.classes.is_empty()
    }

    /// This path with `class` appended as innermost class.
    pub fn enter(&self, class: Name) -> Self {
        Self {
            package: self.package.clone(),
            classes: self.classes.iter().cloned().chain([class]).collect(),
        }
    }
}

impl fmt::Display for ScopePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.package.join("."))?;
        for class in self.classes.iter() {
            write!(f, "/{class}")?;
        }
        Ok(())
    }
}

/// Stable identity of a declaration.
///
/// Two ids are equal exactly when they name the same logical declaration,
/// across sessions and across edits of unrelated code. `index` tells apart
/// declarations sharing a name in the same scope, like overloads.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeclarationId {
    pub module: ModuleId,
    pub scope: ScopePath,
    pub name: Name,
    #[serde(default)]
    pub index: u32,
}

impl DeclarationId {
    pub fn new(module: ModuleId, scope: ScopePath, name: impl Into<Name>) -> Self {
        Self {
            module,
            scope,
            name: name.into(),
            index: 0,
        }
    }

    pub fn with_index(mut self, index: u32) -> Self {
        self.index = index;
        self
    }

    /// Id of a member declared directly inside this declaration.
    pub fn nested(&self, name: impl Into<Name>) -> Self {
        Self::new(self.module, self.scope.enter(self.name.clone()), name)
    }

    /// Id of the enclosing class, if any.
    ///
    /// Enclosing classes are addressed with index 0.
    pub fn parent(&self) -> Option<Self> {
        let (name, outer) = self.scope.classes.split_last()?;

        Some(Self::new(
            self.module,
            ScopePath {
                package: self.scope.package.clone(),
                classes: outer.iter().cloned().collect(),
            },
            name.clone(),
        ))
    }

    pub fn is_top_level(&self) -> bool {
        self.scope.is_top_level()
    }
}

impl fmt::Display for DeclarationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.module)?;

        if !self.scope.package.is_empty() {
            write!(f, "{}/", self.scope.package.join("."))?;
        }

        for class in self.scope.classes.iter() {
            write!(f, "{class}.")?;
        }

        write!(f, "{}", self.name)?;

        if self.index != 0 {
            write!(f, "#{}", self.index)?;
        }

        Ok(())
    }
}
