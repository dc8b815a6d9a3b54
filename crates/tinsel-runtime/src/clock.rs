/// Simulated time: a monotonic millisecond counter and the number of
/// completed ticks.
///
/// Time only moves through [`Clock::advance`], which the scheduler calls
/// once at the end of every tick, so `now()` is constant for the whole of a
/// tick.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    now_ms: u64,
    tick: u64,
}

impl Clock {
    /// A clock at time zero with no completed ticks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time in milliseconds.
    pub fn now(&self) -> u64 {
        self.now_ms
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Close the current tick and move time forward by `dt_ms`. Returns the new time.
    pub fn advance(&mut self, dt_ms: u64) -> u64 {
        self.tick += 1;
        self.now_ms = self.now_ms.saturating_add(dt_ms);
        self.now_ms
    }

    /// Milliseconds elapsed since `earlier`, or zero if `earlier` is in the future.
    pub fn since(&self, earlier: u64) -> u64 {
        self.now_ms.saturating_sub(earlier)
    }
}
