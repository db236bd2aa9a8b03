//! Per-call cancellation handles.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Abortable token for one outgoing call.
///
/// Clones share the same token. `id` tells the controller whether the handle
/// in its slot still belongs to a given call.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    id: Uuid,
    token: CancellationToken,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            token: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once `abort` has been called on any clone.
    pub async fn aborted(&self) {
        self.token.cancelled().await;
    }
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new()
    }
}
