//! The clip generation trait.

use crate::error::Result;
use crate::video::types::{ClipOperation, ClipRequest, ClipStatus};
use async_trait::async_trait;

/// A backend that generates video clips through long-running operations.
///
/// Submission and polling are split so the poll loop can live with the
/// caller, who owns the interval, timeout, and cancellation policy.
#[async_trait]
pub trait ClipGenerator: Send + Sync {
    /// Submits a generation request and returns the operation handle.
    async fn submit(&self, request: &ClipRequest) -> Result<ClipOperation>;

    /// Queries the current status of a submitted operation.
    ///
    /// A `Pending` return means the caller should poll again later. Errors
    /// from this method are transport or protocol failures, not generation
    /// failures; those are reported as [`ClipStatus::Failed`].
    async fn poll(&self, operation: &ClipOperation) -> Result<ClipStatus>;

    /// Short name for logging.
    fn name(&self) -> &str;
}
