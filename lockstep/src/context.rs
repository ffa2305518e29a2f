use shared::{Error, Result};
use tokio_util::sync::CancellationToken;

/// Per-call context threaded through every store and cache call.
///
/// Cancelling the token aborts all in-flight sub-batch calls that observe it.
/// Work already completed by other sub-batches is not rolled back.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancel: CancellationToken,
    namespace: Option<String>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            namespace: None,
        }
    }

    /// Namespace used by context-aware cache key namers.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `Err(Error::Cancelled)` once the call has been cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
