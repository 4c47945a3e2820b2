//! The `Scanner` trait implemented by all scanning backends.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::error::ScanError;
use crate::core::result::ScanOutcome;
use crate::core::types::ScannerKind;

/// The seam between the orchestration engine and a scanning engine.
///
/// Implementations wrap one external scan tool. Expected failure modes
/// (nonzero exit, timeout, missing report artifact, unparsable output) must
/// be folded into [`ScanOutcome::Failed`](crate::core::ScanOutcome::Failed)
/// rather than returned as `Err`; only programming errors in the submitted
/// arguments may surface as `ScanError`.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use scanherd::core::{ScanError, ScanOutcome, Scanner, ScannerKind};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct MyScanner;
///
/// #[async_trait]
/// impl Scanner for MyScanner {
///     fn kind(&self) -> ScannerKind {
///         ScannerKind::Zap
///     }
///
///     async fn scan(&self, target: &str) -> Result<ScanOutcome, ScanError> {
///         // Run the external tool and classify what came back...
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait Scanner: Send + Sync + Debug {
    /// Returns the kind this backend handles.
    fn kind(&self) -> ScannerKind;

    /// Runs one scan against `target` and classifies the outcome.
    ///
    /// This is a potentially very slow call; the worker that invokes it
    /// stays busy until it returns. Timeouts are the implementation's own
    /// responsibility and must end in a `Failed` outcome, not an error.
    async fn scan(&self, target: &str) -> Result<ScanOutcome, ScanError>;
}

/// An arc-wrapped scanner for shared ownership across workers.
pub type ArcScanner = Arc<dyn Scanner>;
