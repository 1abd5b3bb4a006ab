//! The shutdown coordinator.
//!
//! Shutdown is driven by whichever fires first: the pacer completing
//! naturally, an interruption signal, or the one-shot producer exhausting
//! the corpus. All three converge on the same [`CancellationToken`]; the
//! ordered termination sequence itself (close tokens → cancel producer →
//! join workers → close latencies → join collector) lives in
//! [`crate::run::run`], since it has to interleave with the handles it
//! creates.

use tokio_util::sync::CancellationToken;

/// Cancels `token` as soon as the host delivers an interruption signal
/// (Ctrl-C / `SIGINT`). Runs for the lifetime of the token; intended to be
/// spawned once per run.
pub async fn watch_for_interrupt(token: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("interrupt received, shutting down");
        token.cancel();
    }
}
