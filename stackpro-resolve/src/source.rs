//! The tier abstraction walked by a [`crate::chain::SourceChain`].

use async_trait::async_trait;
use stackpro_core::{ResolutionRequest, ResolutionSource, SourceError};

/// What one tier produced for a request.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome<V> {
    /// The tier supplied a value and the walk stops here.
    Found(V),
    /// The tier had nothing for this request. Not a failure.
    Absent,
    /// The tier could not answer. The walk continues and the result is
    /// marked degraded.
    Failed(SourceError),
}

impl<V> SourceOutcome<V> {
    /// Label used in log fields and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SourceOutcome::Found(_) => "found",
            SourceOutcome::Absent => "absent",
            SourceOutcome::Failed(err) => err.kind(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SourceOutcome::Failed(_))
    }
}

/// One tier of a resolution chain.
///
/// Implementations never return errors to the caller of the chain: they
/// report [`SourceOutcome::Failed`] and let the chain fall through.
#[async_trait]
pub trait ValueSource<V>: Send + Sync {
    /// Source attributed to values this tier supplies.
    fn tier(&self) -> ResolutionSource;

    /// Human readable name for logs.
    fn name(&self) -> &str;

    async fn lookup(&self, request: &ResolutionRequest) -> SourceOutcome<V>;
}
