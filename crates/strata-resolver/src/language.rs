use std::fmt::Debug;

use crate::phase::Phase;

/// Binds the collaborator types the engine is generic over.
///
/// The engine never looks inside `Raw` or `Data`. It only sequences the
/// phases and stores whatever the producers hand back.
pub trait Language: Send + Sync + 'static {
    type Phase: Phase;

    /// Non owning handle to a raw syntactic declaration.
    type Raw: Clone + Debug + Send + Sync + 'static;

    /// Typed data produced by one phase step.
    type Data: Debug + Send + Sync + 'static;

    /// The trivial slice of the initial phase.
    fn raw_data(raw: &Self::Raw) -> Self::Data;
}
