/// One unit of logical time.
pub type Tick = u64;

/// Monotonic tick counter owned by the scheduling loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogicalClock {
    now: Tick,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting from `tick` instead of zero.
    pub fn starting_at(tick: Tick) -> Self {
        Self { now: tick }
    }

    pub fn now(&self) -> Tick {
        self.now
    }

    /// Move one tick forward and return the new time.
    pub fn advance(&mut self) -> Tick {
        self.now = self.now.saturating_add(1);
        self.now
    }

    pub fn advance_by(&mut self, ticks: Tick) -> Tick {
        self.now = self.now.saturating_add(ticks);
        self.now
    }

    /// True once `deadline` has been reached.
    pub fn has_reached(&self, deadline: Tick) -> bool {
        self.now >= deadline
    }
}
