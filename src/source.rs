//! The request source: places prepared request copies onto the request
//! channel, either once through the corpus or cyclically.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::ammo::Bullet;

/// Replays `corpus` onto `tx`. In one-shot mode (`cycle = false`) iterates
/// the corpus exactly once and closes the channel (by returning — dropping
/// `tx` closes it) on completion. In cyclic mode, never terminates except on
/// cancellation.
pub async fn run(corpus: Arc<Vec<Bullet>>, tx: flume::Sender<Bullet>, cancel: CancellationToken, cycle: bool) {
    loop {
        for bullet in corpus.iter() {
            tokio::select! {
                _ = cancel.cancelled() => return,
                res = tx.send_async(bullet.clone()) => {
                    if res.is_err() {
                        return; // no workers left to receive
                    }
                }
            }
        }
        if !cycle {
            tracing::info!("all requests sent");
            return;
        }
    }
}
