//! Size-stratified buffer reuse pool.
//!
//! Buckets double starting at [`BASE_CAPACITY`]. `acquire` and `release` walk
//! the *same* bucket geometry starting at the *same* base capacity — an
//! earlier, similar pool had `acquire` start its walk at 4096 while `release`
//! started at 64, so most released buffers landed in buckets `acquire` never
//! consulted.

use parking_lot::Mutex;

const BASE_CAPACITY: usize = 64;

/// One size class of the pool.
struct Bucket {
    capacity: usize,
    free: Mutex<Vec<Vec<u8>>>,
}

/// A pool of reusable byte buffers, used to keep allocation off the hot path
/// so latency samples reflect network behaviour rather than allocator
/// jitter.
pub struct BufferPool {
    buckets: Vec<Bucket>,
}

fn bucket_capacity_for(size: usize) -> usize {
    let mut cap = BASE_CAPACITY;
    while cap < size {
        cap *= 2;
    }
    cap
}

fn bucket_index_for(cap: usize) -> usize {
    let mut i = 0;
    let mut c = BASE_CAPACITY;
    while c < cap {
        c *= 2;
        i += 1;
    }
    i
}

impl BufferPool {
    pub fn new() -> Self {
        Self { buckets: Vec::new() }
    }

    fn bucket(&mut self, index: usize) -> &Bucket {
        while self.buckets.len() <= index {
            let capacity = BASE_CAPACITY << self.buckets.len();
            self.buckets.push(Bucket {
                capacity,
                free: Mutex::new(Vec::new()),
            });
        }
        &self.buckets[index]
    }

    /// Returns a buffer of at least `size` bytes, sliced (truncated) to
    /// exactly `size`. Reuses a recycled buffer from the matching bucket
    /// when one is available.
    pub fn acquire(&mut self, size: usize) -> Vec<u8> {
        let cap = bucket_capacity_for(size);
        let index = bucket_index_for(cap);
        let bucket = self.bucket(index);
        let mut buf = bucket.free.lock().pop().unwrap_or_else(|| Vec::with_capacity(cap));
        buf.clear();
        buf.resize(size, 0);
        buf
    }

    /// Returns `buf` to the bucket matching its capacity. A buffer handed
    /// back with a capacity that isn't one `acquire` would have produced
    /// (e.g. a caller-shrunk `Vec`) is simply dropped instead of pooled.
    pub fn release(&mut self, mut buf: Vec<u8>) {
        let cap = buf.capacity();
        if cap < BASE_CAPACITY || !cap.is_power_of_two() {
            return;
        }
        let index = bucket_index_for(cap);
        if index >= self.buckets.len() || self.buckets[index].capacity != cap {
            return;
        }
        buf.clear();
        self.buckets[index].free.lock().push(buf);
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}
