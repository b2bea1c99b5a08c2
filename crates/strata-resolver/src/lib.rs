//! # Strata Resolver: Lazy, Phase Ordered Declaration Resolution
//!
//! This crate schedules and shares the work of resolving declarations to a
//! typed form. Nothing is resolved up front: a consumer asks for one
//! declaration at one phase, and only the steps needed for that answer run,
//! including the steps of whatever the declaration depends on, possibly in
//! other modules.
//!
//! ## Phases
//!
//! Every declaration walks a finite lattice of phases, for example:
//!
//! ```text
//! Raw ──▶ Imports ──▶ SupertypesResolved ──▶ SignaturesResolved ──▶ BodiesResolved
//! ```
//!
//! - A declaration is **never** moved more than one step at a time, even if the
//!   consumer only cares about the last phase. Intermediate results may be
//!   exactly what some other declaration needs.
//! - Within one generation the phase of a declaration only grows.
//! - Readers never observe a phase whose data is not written yet.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────┐   session_for   ┌──────────────────────┐
//! │ LazyDeclaration  │────────────────▶│   SessionProvider    │
//! │    Resolver      │                 │  (SessionRegistry)   │
//! │                  │                 └──────────┬───────────┘
//! │ • route          │                            ▼
//! │ • check trackers │                 ┌──────────────────────┐
//! │ • lock node      │────────────────▶│ ModuleResolution     │
//! │ • resolve deps   │                 │      Session         │
//! │ • advance        │                 │ • nodes              │
//! └───────┬──────────┘                 │ • scope cache (LRU)  │
//!         │                            │ • structure cache    │
//!         ▼                            └──────────┬───────────┘
//! ┌──────────────────┐                            ▼
//! │  PhaseProducer   │                 ┌──────────────────────┐
//! │ (collaborator)   │                 │   SyntaxProvider     │
//! └──────────────────┘                 │   (collaborator)     │
//!                                      └──────────────────────┘
//! ```
//!
//! ## Invalidation
//!
//! Edits are reported through modification trackers. The
//! [`InvalidationController`](invalidation::InvalidationController) compares
//! them the first time a request touches a session and bumps the session
//! generation if they moved. Nodes are not visited at that point. Each node
//! compares its generation on the next access and starts over if it is behind.
//!
//! ## Concurrency
//!
//! Many requests may run at once. Each phase step holds the lock of exactly
//! the advanced node, plus the locks of whatever is being resolved beneath it.
//! A request reaching a node it is already advancing fails with
//! [`ResolveError::CyclicResolution`](error::ResolveError::CyclicResolution),
//! and so does a request whose wait would close a cycle with other requests.

pub mod config;
pub mod context;
pub mod depended;
pub mod error;
pub mod id;
pub mod invalidation;
pub mod language;
pub mod lock;
pub mod node;
pub mod phase;
pub mod producer;
pub mod provider;
pub mod resolver;
pub mod scope;
pub mod session;
pub mod slice;
pub mod structure;
pub mod syntax;


pub mod prelude {
    pub use crate::config::ResolverConfig;
    pub use crate::context::{ResolutionContext, ResolveStats};
    pub use crate::depended::{DependedSession, ResolveSession, TowerContext};
    pub use crate::error::{NotYetResolved, ProducerError, ResolveError, ResolveResult};
    pub use crate::id::{DeclarationId, FileId, ModuleId, Name, RequestId, ScopePath, SessionId};
    pub use crate::invalidation::{
        CompositeModificationTracker, InvalidationController, ModificationTracker,
        ModificationTrackerSource, NeverChangedTracker, SimpleModificationTracker,
    };
    pub use crate::language::Language;
    pub use crate::node::DeclarationNode;
    pub use crate::phase::{Phase, ResolvePhase, UnknownPhase};
    pub use crate::producer::{Dependency, PhaseProducer, StepContext};
    pub use crate::provider::{SessionProvider, SessionRegistry};
    pub use crate::resolver::{ClassSlice, LazyDeclarationResolver};
    pub use crate::scope::MemberScope;
    pub use crate::session::{InvalidationScope, ModuleKind, ModuleResolutionSession};
    pub use crate::slice::TypedSlice;
    pub use crate::structure::{StructureEntry, StructureKey};
    pub use crate::syntax::{ChildDeclaration, DeclarationKind, RawDeclaration, SyntaxProvider};
}
