use embassy_time::Instant;

/// Source of the current time for deadlines.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The `embassy-time` driver of the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<K: Clock + ?Sized> Clock for &K {
    fn now(&self) -> Instant {
        (**self).now()
    }
}
