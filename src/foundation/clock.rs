use std::sync::atomic::{AtomicU64, Ordering};

static GLOBAL_CLOCK: AtomicU64 = AtomicU64::new(0);

/// Value of the process-wide modification clock.
///
/// Every call to [`TimeStamp::next`] returns a value strictly greater than any value handed out
/// before it, so "is A newer than B" is a plain integer comparison. `TimeStamp::ZERO` is older
/// than every stamp the clock produces and marks "never".
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct TimeStamp(pub u64);

impl TimeStamp {
    /// The "never modified / never computed" stamp.
    pub const ZERO: TimeStamp = TimeStamp(0);

    /// Advance the global clock and return the new value.
    pub fn next() -> Self {
        Self(GLOBAL_CLOCK.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Return `true` for [`TimeStamp::ZERO`].
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Atomic cell holding a [`TimeStamp`], for state shared across the producer graph.
#[derive(Debug, Default)]
pub(crate) struct AtomicTimeStamp(AtomicU64);

impl AtomicTimeStamp {
    pub(crate) fn new(t: TimeStamp) -> Self {
        Self(AtomicU64::new(t.0))
    }

    pub(crate) fn get(&self) -> TimeStamp {
        TimeStamp(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn set(&self, t: TimeStamp) {
        self.0.store(t.0, Ordering::SeqCst);
    }

    /// Stamp with the next global clock value.
    pub(crate) fn touch(&self) -> TimeStamp {
        let t = TimeStamp::next();
        self.set(t);
        t
    }
}
