/// A stage parameter that reports whether a write actually changed it.
///
/// [`Producer::set`](crate::Producer::set) uses the report to stamp the producer only on a real
/// change, so re-applying the same value never invalidates cached outputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Property<T> {
    value: T,
}

impl<T: PartialEq> Property<T> {
    /// Wrap an initial value.
    pub fn new(value: T) -> Self {
        Self { value }
    }

    /// Current value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Store `value`; returns `true` when it differs from the previous value.
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        true
    }

    /// Unwrap the value.
    pub fn into_inner(self) -> T {
        self.value
    }
}
