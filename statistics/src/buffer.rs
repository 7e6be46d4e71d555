use std::{cmp::Ordering, collections::BTreeMap};

/// Retention window used when none is given.
pub const DEFAULT_WINDOW_SECONDS: f64 = 3.0;

/// Timestamp in seconds, ordered with the IEEE total order so it can key a map.
#[derive(Debug, Clone, Copy)]
struct Timestamp(f64);

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Time ordered samples that only keeps what is within `window` seconds of the latest insertion.
///
/// Eviction is lazy and happens on [`TimedBuffer::update`], relative to the timestamp that was just
/// inserted rather than the newest one stored. Samples sharing a timestamp replace each other.
#[derive(Debug, Clone)]
pub struct TimedBuffer<T> {
    window: f64,
    entries: BTreeMap<Timestamp, T>,
}

impl<T> Default for TimedBuffer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SECONDS)
    }
}

impl<T> TimedBuffer<T> {
    pub fn new(window: f64) -> Self {
        Self {
            window,
            entries: BTreeMap::new(),
        }
    }

    pub fn window(&self) -> f64 {
        self.window
    }

    /// Changes the retention window. Nothing is evicted until the next update.
    pub fn set_window(&mut self, window: f64) {
        self.window = window;
    }

    /// Inserts `value` at `timestamp` and evicts everything that is now too old. Returns the value that
    /// was previously stored at exactly this timestamp. Passing `None` does nothing.
    pub fn update(&mut self, value: impl Into<Option<T>>, timestamp: f64) -> Option<T> {
        let value = value.into()?;
        let previous = self.entries.insert(Timestamp(timestamp), value);
        self.evict(timestamp);
        previous
    }

    fn evict(&mut self, newest: f64) {
        while let Some(entry) = self.entries.first_entry() {
            if newest - entry.key().0 > self.window {
                entry.remove();
            } else {
                return;
            }
        }
    }

    /// The retained values in ascending timestamp order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator + '_ {
        self.entries.values()
    }

    /// The retained `(timestamp, value)` pairs in ascending timestamp order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (f64, &T)> + '_ {
        self.entries.iter().map(|(k, v)| (k.0, v))
    }

    pub fn oldest_timestamp(&self) -> Option<f64> {
        self.entries.keys().next().map(|k| k.0)
    }

    pub fn newest_timestamp(&self) -> Option<f64> {
        self.entries.keys().next_back().map(|k| k.0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
