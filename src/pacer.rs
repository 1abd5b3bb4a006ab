//! The rate token stream: an internal pacer that drives the achieved
//! request rate along a linear ramp.
//!
//! `linear` emits tokens at instantaneous rate
//! `r(t) = low + (high - low) * t/duration` for `t` in `[0, duration]`, and
//! returns when the schedule elapses or cancellation fires.

use std::time::Duration;

use flume::Sender;
use tokio_util::sync::CancellationToken;

/// Tick granularity the pacer advances at. Coarser than per-token scheduling
/// (which would itself become the bottleneck at thousands of RPS); fine
/// enough that the cumulative emitted count still tracks the integral of
/// `r(t)` to within a fraction of a tick.
const TICK: Duration = Duration::from_millis(1);

/// Drives `tokens` at a linearly ramping rate from `low` to `high` RPS over
/// `duration`, then returns. One token is a `Duration` since the pacer
/// started; workers never inspect its value except to check for the
/// explicit zero stop signal.
pub async fn linear(
    cancel: CancellationToken,
    tokens: Sender<Duration>,
    low: f64,
    high: f64,
    duration: Duration,
) {
    let total = duration.as_secs_f64();
    if total <= 0.0 {
        return;
    }

    let mut elapsed = 0.0_f64;
    let tick_secs = TICK.as_secs_f64();
    let mut owed = 0.0_f64; // fractional tokens carried over between ticks

    while elapsed < total {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(TICK) => {}
        }

        let window_end = (elapsed + tick_secs).min(total);
        let rate_at = |t: f64| low + (high - low) * (t / total);
        // trapezoidal estimate of the integral of r(t) over this tick
        let avg_rate = (rate_at(elapsed) + rate_at(window_end)) / 2.0;
        owed += avg_rate * (window_end - elapsed);
        elapsed = window_end;

        let to_emit = owed.floor() as u64;
        owed -= to_emit as f64;

        for _ in 0..to_emit {
            let token = Duration::from_secs_f64(elapsed);
            tokio::select! {
                _ = cancel.cancelled() => return,
                res = tokens.send_async(token) => {
                    if res.is_err() {
                        return; // receivers gone
                    }
                }
            }
        }
    }
}
