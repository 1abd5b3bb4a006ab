//! The worker pool: N small state machines, each repeatedly coupling one
//! request with one token before performing a single timed HTTP exchange.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::ammo::Bullet;
use crate::client;
use crate::error::GunError;
use crate::pool::BufferPool;

/// Default capacity a worker's response scratch buffer starts at; grown
/// lazily by the pool's bucket geometry the first time a response needs
/// more room, then held at that size for the worker's lifetime.
const DEFAULT_SCRATCH: usize = 4096;

pub struct Worker {
    pub id: usize,
    pub client: Client,
    pub target_base: Arc<String>,
    pub timeout: Duration,
    pub requests: flume::Receiver<Bullet>,
    pub tokens: flume::Receiver<Duration>,
    pub latencies: flume::Sender<Duration>,
    pub cancel: CancellationToken,
    pub pool: Arc<Mutex<BufferPool>>,
}

impl Worker {
    /// Runs the idle → armed → in-flight loop until cancellation, channel
    /// closure, or a fatal transport error. A transport error is returned to
    /// the caller, which is expected to cancel every other component.
    pub async fn run(self) -> Result<(), GunError> {
        let mut scratch = self.pool.lock().acquire(DEFAULT_SCRATCH);
        // acquire() hands back a buffer sized to `DEFAULT_SCRATCH` (for
        // callers that want exactly that many bytes); this worker instead
        // wants the capacity reserved with nothing written yet, since
        // `client::send_one` appends response bytes starting at `len`.
        scratch.clear();
        let outcome = self.drive(&mut scratch).await;
        self.pool.lock().release(scratch);
        outcome
    }

    async fn drive(&self, scratch: &mut Vec<u8>) -> Result<(), GunError> {
        loop {
            // idle: waiting for a request.
            let bullet = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                recv = self.requests.recv_async() => match recv {
                    Ok(b) => b,
                    Err(_) => return Ok(()), // request channel closed
                },
            };

            // armed: waiting for a token.
            let token = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                recv = self.tokens.recv_async() => match recv {
                    Ok(t) => t,
                    Err(_) => return Ok(()), // token channel closed
                },
            };
            if token == Duration::ZERO {
                return Ok(()); // explicit end-of-schedule sentinel
            }

            // in-flight: perform the exchange and report its latency.
            let t0 = Instant::now();
            client::send_one(&self.client, &self.target_base, &bullet, self.timeout, scratch)
                .await?;
            let elapsed = t0.elapsed();
            scratch.clear();

            tracing::trace!(worker = self.id, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "request completed");

            if self.latencies.send_async(elapsed).await.is_err() {
                return Ok(()); // collector gone
            }
        }
    }
}
