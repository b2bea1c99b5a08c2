//! # Strata Driver
//!
//! A concrete set of collaborators for the resolver, driven from a JSON
//! project manifest. Modules hold files, files hold a tree of classes,
//! functions, properties and type aliases. The [`Workspace`](workspace::Workspace)
//! owns one resolution session per module and turns edits into invalidation
//! triggers.
//!
//! ```text
//! Manifest ──load──▶ Workspace ──▶ ModuleSyntax (per module)
//!                        │
//!                        ├──▶ ProjectTrackers ──▶ InvalidationController
//!                        └──▶ LazyDeclarationResolver ──▶ Analyzer
//! ```

pub mod analyzer;
pub mod config;
pub mod error;
pub mod index;
pub mod language;
pub mod manifest;
pub mod source;
pub mod syntax;
pub mod trackers;
pub mod workspace;

pub mod prelude {
    pub use crate::analyzer::Analyzer;
    pub use crate::config::DriverConfig;
    pub use crate::error::{DriverError, DriverResult};
    pub use crate::index::{ModuleEntry, ProjectIndex};
    pub use crate::language::{DriverLanguage, ImportTarget, Resolved, Signature, TypeRef};
    pub use crate::manifest::{DeclarationManifest, FileManifest, Manifest, ModuleManifest};
    pub use crate::source::SourceDeclaration;
    pub use crate::syntax::ModuleSyntax;
    pub use crate::trackers::ProjectTrackers;
    pub use crate::workspace::{CheckReport, Workspace};
}
