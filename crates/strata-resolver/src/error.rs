use std::error::Error as StdError;

use miette::Diagnostic;
use strata_utils::dependency::CycleError;
use thiserror::Error;

use crate::id::{DeclarationId, FileId, ModuleId};

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors surfaced by the resolver to its callers.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error("cyclic resolution of `{id}`")]
    #[diagnostic(
        code(strata::resolve::cycle),
        help("{cycle}. Break the cycle or request a lower phase.")
    )]
    CyclicResolution {
        id: DeclarationId,
        cycle: CycleError<DeclarationId>,
    },

    #[error("no session owns module {module}")]
    #[diagnostic(
        code(strata::resolve::unresolved_module),
        help("Register the module with the session provider before resolving it.")
    )]
    UnresolvedModule {
        module: ModuleId,
        /// Declaration whose resolution needed the module.
        id: Option<DeclarationId>,
    },

    #[error("declaration `{0}` does not exist")]
    #[diagnostic(code(strata::resolve::unknown_declaration))]
    UnknownDeclaration(DeclarationId),

    #[error("file {file} is not part of module {module}")]
    #[diagnostic(code(strata::resolve::unknown_file))]
    UnknownFile { module: ModuleId, file: FileId },

    #[error("failed to resolve `{id}` to {phase}")]
    #[diagnostic(code(strata::resolve::producer))]
    ProducerFailure {
        id: DeclarationId,
        phase: &'static str,
        #[source]
        source: ProducerError,
    },

    #[error("`{id}` must advance to {expected} next, not {actual}")]
    #[diagnostic(code(strata::resolve::phase_order))]
    PhaseOrder {
        id: DeclarationId,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("dependency chain of `{id}` is deeper than {limit}")]
    #[diagnostic(
        code(strata::resolve::depth_limit),
        help("Raise `max_depth` in the resolver configuration.")
    )]
    DepthLimit { id: DeclarationId, limit: usize },
}

impl ResolveError {
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::CyclicResolution { .. })
    }

    /// The declaration the error is reported for.
    pub fn id(&self) -> Option<&DeclarationId> {
        match self {
            Self::CyclicResolution { id, .. }
            | Self::ProducerFailure { id, .. }
            | Self::PhaseOrder { id, .. }
            | Self::DepthLimit { id, .. } => Some(id),
            Self::UnknownDeclaration(id) => Some(id),
            Self::UnresolvedModule { id, .. } => id.as_ref(),
            Self::UnknownFile { .. } => None,
        }
    }
}

/// Signal that a node has not reached the requested phase in the current
/// generation. Consumed by the resolver, which then schedules the missing steps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{id}` is at {current}, {requested} was requested")]
pub struct NotYetResolved {
    pub id: DeclarationId,
    pub current: &'static str,
    pub requested: &'static str,
    /// The node was resolved for an older generation.
    pub stale: bool,
}

type BoxedError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure of a phase producer.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProducerError {
    message: String,
    #[source]
    source: Option<BoxedError>,
}

impl ProducerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ResolveError> for ProducerError {
    fn from(error: ResolveError) -> Self {
        Self::with_source(error.to_string(), error)
    }
}
