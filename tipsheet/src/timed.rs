//! Timing of computations.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct Timed<V> {
    pub value: V,
    pub elapsed: Duration,
}
impl<V> Timed<V> {
    pub fn run(f: impl FnOnce() -> V) -> Timed<V> {
        let start_time = Instant::now();
        let value = f();
        Timed {
            value,
            elapsed: start_time.elapsed(),
        }
    }

    pub fn elapsed_millis(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

impl<T, E> Timed<Result<T, E>> {
    /// Times a fallible computation. The elapsed time is captured on failure as well.
    pub fn result(f: impl FnOnce() -> Result<T, E>) -> Self {
        Timed::run(f)
    }
}
