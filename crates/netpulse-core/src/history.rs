// ── Bounded sample history ──
//
// Fixed-capacity FIFO of recent rates plus the latest full sample.
// The sampler appends while consumers snapshot, so all state sits
// behind one short-lived mutex that is never held across an await.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use netpulse_proto::Sample;

/// Bounded window over recent samples.
///
/// Keeps two parallel rate series (download/upload) for chart-style
/// consumers, always the same length, oldest evicted first. The latest
/// full sample is kept separately for the uplink's latest-wins policy.
pub struct HistoryWindow {
    inner: Mutex<Inner>,
    capacity: usize,
}

struct Inner {
    download: VecDeque<f64>,
    upload: VecDeque<f64>,
    latest: Option<Sample>,
}

impl HistoryWindow {
    /// Create a window retaining the last `capacity` samples.
    ///
    /// A zero capacity is bumped to 1 so the window can always hold the
    /// latest sample.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                download: VecDeque::with_capacity(capacity),
                upload: VecDeque::with_capacity(capacity),
                latest: None,
            }),
            capacity,
        }
    }

    /// Append one sample, evicting the oldest entries beyond capacity.
    pub fn append(&self, sample: &Sample) {
        let mut inner = self.lock();
        inner.download.push_back(sample.download_kb_s);
        inner.upload.push_back(sample.upload_kb_s);
        while inner.download.len() > self.capacity {
            inner.download.pop_front();
        }
        while inner.upload.len() > self.capacity {
            inner.upload.pop_front();
        }
        inner.latest = Some(*sample);
    }

    /// Owned copies of the download and upload series, oldest first.
    pub fn snapshot(&self) -> (Vec<f64>, Vec<f64>) {
        let inner = self.lock();
        (
            inner.download.iter().copied().collect(),
            inner.upload.iter().copied().collect(),
        )
    }

    /// The most recent sample, once any tick has completed.
    pub fn latest(&self) -> Option<Sample> {
        self.lock().latest
    }

    pub fn len(&self) -> usize {
        self.lock().download.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Poisoning would require an appender to panic mid-push; the
        // stored data is plain numbers, still safe to serve.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
