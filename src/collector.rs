//! The latency collector: the single consumer that aggregates per-second
//! and cumulative latency samples and renders summaries.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// A tick/tail/summary report, computed with a nearest-rank quantile
/// definition: for a sorted sequence of length `L` and a fraction `q`, the
/// element at index `⌊L·q⌋`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub count: usize,
    pub min: Duration,
    pub p50: Duration,
    pub p90: Duration,
    pub max: Duration,
    pub mean: Duration,
}

/// Nearest-rank quantile over an already-sorted slice.
pub fn quantile(sorted: &[Duration], q: f64) -> Duration {
    let idx = ((sorted.len() as f64) * q).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

impl Stats {
    /// Sorts `samples` in place and computes a [`Stats`] report. Returns
    /// `None` for an empty slice (the caller emits `RPS=0` instead).
    pub fn from_samples(samples: &mut [Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_unstable();
        let count = samples.len();
        let sum: Duration = samples.iter().sum();
        Some(Stats {
            count,
            min: samples[0],
            p50: quantile(samples, 0.5),
            p90: quantile(samples, 0.9),
            max: samples[count - 1],
            mean: sum / count as u32,
        })
    }
}

/// The outcome of a full run, handed back to `main` for the process exit
/// code and, in tests, for assertion against sample-count invariants.
#[derive(Debug, Default)]
pub struct RunStats {
    pub per_tick_count: usize,
    pub tail_count: usize,
    pub total_count: usize,
    pub total_latency: Duration,
}

/// Runs the collector to completion: steady-state accumulation with
/// once-a-second reporting, then drain, then tail/summary reporting.
pub async fn run(latencies: flume::Receiver<Duration>, cancel: CancellationToken) -> RunStats {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await; // first tick fires immediately; consume it so ticks land on real second boundaries

    let mut window: Vec<Duration> = Vec::new();
    let mut archive: Vec<Duration> = Vec::new();
    let mut per_tick_count = 0usize;

    'steady: loop {
        tokio::select! {
            _ = cancel.cancelled() => break 'steady,
            _ = ticker.tick() => {
                match Stats::from_samples(&mut window) {
                    None => tracing::info!("RPS=0"),
                    Some(s) => {
                        tracing::info!(
                            "RPS={} min={:?} p50={:?} p90={:?} max={:?} avg={:?}",
                            s.count, s.min, s.p50, s.p90, s.max, s.mean
                        );
                        per_tick_count += s.count;
                        archive.append(&mut window);
                    }
                }
            }
            recv = latencies.recv_async() => {
                match recv {
                    Ok(sample) if sample == Duration::ZERO => break 'steady,
                    Ok(sample) => window.push(sample),
                    Err(_) => break 'steady,
                }
            }
        }
    }

    tracing::info!("Processing the inflight requests...");
    let drain_start = Instant::now();

    // The samples accumulated in the current (un-ticked) window at the
    // moment of cancellation belong to the drain, not to a completed tick —
    // there was no tick to report them in.
    let mut tail = std::mem::take(&mut window);
    while let Ok(sample) = latencies.recv_async().await {
        if sample == Duration::ZERO {
            continue;
        }
        tail.push(sample);
    }

    let tail_count = tail.len();
    match Stats::from_samples(&mut tail) {
        None => tracing::info!("No tail requests, hm..."),
        Some(s) => tracing::info!(
            "Tail processed in {:?}: requests={} min={:?} p50={:?} p90={:?} max={:?} avg={:?}",
            drain_start.elapsed(),
            s.count,
            s.min,
            s.p50,
            s.p90,
            s.max,
            s.mean
        ),
    }

    archive.append(&mut tail);

    if archive.is_empty() {
        tracing::info!("No requests - no statistics.");
        return RunStats {
            per_tick_count,
            tail_count,
            total_count: 0,
            total_latency: Duration::ZERO,
        };
    }

    let total_latency: Duration = archive.iter().sum();
    let summary = Stats::from_samples(&mut archive).expect("archive checked non-empty above");
    tracing::info!(
        "Summary: requests={} min={:?} p50={:?} p90={:?} max={:?} avg={:?}",
        summary.count,
        summary.min,
        summary.p50,
        summary.p90,
        summary.max,
        summary.mean
    );
    tracing::info!("Total score: {:.6}", total_latency.as_secs_f64());

    RunStats {
        per_tick_count,
        tail_count,
        total_count: summary.count,
        total_latency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn durs(vals: &[u64]) -> Vec<Duration> {
        vals.iter().map(|&v| Duration::from_secs(v)).collect()
    }

    #[test]
    fn quantile_harness_matches_nearest_rank_definition() {
        let mut samples = durs(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        let s = Stats::from_samples(&mut samples).unwrap();
        assert_eq!(s.min, Duration::from_secs(1));
        assert_eq!(s.p50, Duration::from_secs(6));
        assert_eq!(s.p90, Duration::from_secs(10));
        assert_eq!(s.max, Duration::from_secs(10));
        assert_eq!(s.mean, Duration::from_millis(5_500));
    }

    #[test]
    fn empty_samples_yield_no_stats() {
        let mut samples: Vec<Duration> = Vec::new();
        assert!(Stats::from_samples(&mut samples).is_none());
    }

    #[tokio::test]
    async fn drain_completeness_sample_count_matches_total() {
        let (tx, rx) = flume::unbounded();
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();

        for _ in 0..5 {
            tx.send_async(Duration::from_millis(10)).await.unwrap();
        }

        let handle = tokio::spawn(run(rx, cancel2));

        // give the steady-state loop a chance to drain the 5 queued samples,
        // then cancel and send two more that must land in the tail.
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        tx.send_async(Duration::from_millis(20)).await.unwrap();
        tx.send_async(Duration::from_millis(30)).await.unwrap();
        drop(tx);

        let stats = handle.await.unwrap();
        assert_eq!(stats.total_count, 7);
        assert_eq!(stats.per_tick_count + stats.tail_count, stats.total_count);
    }
}
