//! Wires the pacer, request source, worker pool and latency collector
//! together and drives the ordered shutdown sequence.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::ammo;
use crate::client;
use crate::collector::{self, RunStats};
use crate::config::Args;
use crate::error::GunError;
use crate::pacer;
use crate::pool::BufferPool;
use crate::shutdown;
use crate::source;
use crate::worker::Worker;

pub async fn run(args: Args) -> Result<RunStats, GunError> {
    let corpus = ammo::load(&args.ammo).await?;
    if !args.cycle {
        ammo::check_shortfall(&args.ammo, corpus.len(), args.low, args.high, args.duration)?;
    }
    tracing::info!(bullets = corpus.len(), "ammo loaded");
    let corpus = Arc::new(corpus);

    let base_url = args.base_url();
    url::Url::parse(&base_url).map_err(|source| GunError::InvalidTarget(args.target.clone(), source))?;

    let cancel = CancellationToken::new();
    let http_client = client::build_client(args.workers).map_err(GunError::Transport)?;
    let base_url = Arc::new(base_url);
    let pool = Arc::new(Mutex::new(BufferPool::new()));

    // Rendezvous channels: zero capacity, so nothing is ever buffered past
    // a cancellation.
    let (tx_req, rx_req) = flume::bounded::<crate::ammo::Bullet>(0);
    let (tx_tok, rx_tok) = flume::bounded::<Duration>(0);
    let (tx_lat, rx_lat) = flume::bounded::<Duration>(0);

    // The pacer owns tx_tok exclusively, so the token channel closes as soon
    // as this task returns, for any reason.
    let pacer_cancel = cancel.clone();
    let pacer_handle = tokio::spawn(async move {
        pacer::linear(pacer_cancel.clone(), tx_tok, args.low, args.high, args.duration).await;
        // Pacer completion is itself a shutdown trigger: cancel everything
        // else even if the schedule simply elapsed.
        pacer_cancel.cancel();
    });

    // Likewise, the producer owns tx_req exclusively.
    let producer_cancel = cancel.clone();
    let producer_corpus = Arc::clone(&corpus);
    let cycle = args.cycle;
    let producer_handle = tokio::spawn(async move {
        source::run(producer_corpus, tx_req, producer_cancel.clone(), cycle).await;
        // One-shot corpus exhaustion is also a shutdown trigger. Harmless to
        // call again if cancellation already fired.
        producer_cancel.cancel();
    });

    // An interruption signal is the third shutdown trigger.
    let interrupt_handle = tokio::spawn(shutdown::watch_for_interrupt(cancel.clone()));

    // N workers, each independently blocking on the request and token
    // channels.
    let mut workers: JoinSet<Result<(), GunError>> = JoinSet::new();
    for id in 0..args.workers {
        let worker = Worker {
            id,
            client: http_client.clone(),
            target_base: Arc::clone(&base_url),
            timeout: args.timeout,
            requests: rx_req.clone(),
            tokens: rx_tok.clone(),
            latencies: tx_lat.clone(),
            cancel: cancel.clone(),
            pool: Arc::clone(&pool),
        };
        workers.spawn(worker.run());
    }
    drop(rx_req);
    drop(rx_tok);
    // Each worker holds its own Sender clone; dropping the orchestrator's
    // means the latency channel closes exactly when the last worker does.
    drop(tx_lat);

    // The single latency consumer, running concurrently with the workers
    // so steady-state ticks are reported live.
    let collector_handle = tokio::spawn(collector::run(rx_lat, cancel.clone()));

    // Wait for every worker to terminate. The first fatal transport error
    // cancels the run, but we keep draining the rest so no worker's latency
    // sample or release is lost.
    let mut first_error = None;
    while let Some(joined) = workers.join_next().await {
        match joined.expect("worker task panicked") {
            Ok(()) => {},
            Err(err) => {
                tracing::error!(error = %err, "fatal transport error, aborting run");
                cancel.cancel();
                if first_error.is_none() {
                    // A fatal transport error invalidates the measurement
                    // outright: cut the collector off right away, before it
                    // can reach its drain/tail/summary reporting, rather
                    // than let it print a polished final report over a run
                    // that's already been declared bad.
                    collector_handle.abort();
                }
                first_error.get_or_insert(err);
            },
        }
    }

    if let Some(err) = first_error {
        pacer_handle.abort();
        producer_handle.abort();
        interrupt_handle.abort();
        return Err(err);
    }

    // The latency channel is now closed (every worker's Sender clone has
    // been dropped) — the collector drains and finalises.
    let stats = collector_handle.await.expect("collector task panicked");

    // These two are done once cancellation propagates; join them so any
    // panic inside surfaces instead of being silently dropped.
    let _ = pacer_handle.await;
    let _ = producer_handle.await;
    interrupt_handle.abort();

    Ok(stats)
}
