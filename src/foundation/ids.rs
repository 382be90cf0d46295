use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OBJECT: AtomicU64 = AtomicU64::new(1);
static NEXT_PRODUCER: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a data object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u64);

impl ObjectId {
    pub(crate) fn fresh() -> Self {
        Self(NEXT_OBJECT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Process-unique identity of a producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProducerId(pub(crate) u64);

impl ProducerId {
    pub(crate) fn fresh() -> Self {
        Self(NEXT_PRODUCER.fetch_add(1, Ordering::Relaxed))
    }
}
