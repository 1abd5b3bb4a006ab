//! The HTTP/1.1 client transport: send one request, time out after a
//! configured deadline, return the response or an error.
//!
//! One [`reqwest::Client`] is shared (cheap internal `Arc` clone) across all
//! workers; concurrency of outstanding connections is bounded structurally
//! by the worker count N, not by a separate semaphore.

use std::time::Duration;

use bytes::Bytes;
use http::HeaderMap;
use reqwest::Client;

use crate::ammo::Bullet;
use crate::error::GunError;

/// Headers that are either hop-by-hop or computed by the transport itself;
/// forwarding the bullet's copy verbatim would conflict with what `reqwest`
/// sets for the outgoing request.
const STRIPPED_HEADERS: &[&str] = &["content-length", "transfer-encoding", "connection"];

pub fn build_client(worker_count: usize) -> reqwest::Result<Client> {
    Client::builder()
        .pool_max_idle_per_host(worker_count)
        .build()
}

fn filtered_headers(headers: &HeaderMap) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers.iter() {
        if STRIPPED_HEADERS.contains(&name.as_str()) {
            continue;
        }
        out.append(name.clone(), value.clone());
    }
    out
}

/// Performs one timed HTTP exchange for `bullet` against `base_url`,
/// draining the response body into `scratch` (bounded by its existing
/// capacity) without growing it.
///
/// The caller times the exchange itself and treats any error here as
/// fatal for the whole run.
pub async fn send_one(
    client: &Client,
    base_url: &str,
    bullet: &Bullet,
    timeout: Duration,
    scratch: &mut Vec<u8>,
) -> Result<(), GunError> {
    let url = format!("{base_url}{}", bullet.path);

    let mut response = client
        .request(bullet.method.clone(), &url)
        .headers(filtered_headers(&bullet.headers))
        .body(Bytes::clone(&bullet.body))
        .timeout(timeout)
        .send()
        .await
        .map_err(GunError::Transport)?;

    while let Some(chunk) = response.chunk().await.map_err(GunError::Transport)? {
        let room = scratch.capacity().saturating_sub(scratch.len());
        let take = room.min(chunk.len());
        scratch.extend_from_slice(&chunk[..take]);
    }

    Ok(())
}
