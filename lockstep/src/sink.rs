use crate::context::Context;
use crate::ports::ErrorSink;
use shared::Error;

/// Default error sink: logs best-effort failures and moves on.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, ctx: &Context, err: Error) {
        tracing::error!(
            namespace = ctx.namespace().unwrap_or(""),
            error = %err,
            "best-effort cache operation failed"
        );
    }
}
