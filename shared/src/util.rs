/// Milliseconds between two readings of a wrapping `u32` uptime counter.
pub fn elapsed_ms(now_ms: u32, since_ms: u32) -> u32 {
    now_ms.wrapping_sub(since_ms)
}

pub fn round_hundredths(value: f64) -> f64 {
    libm::round(value * 100.0) / 100.0
}

/// Fires once per interval on a wrapping millisecond clock. A timer that was never
/// started is due immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalTimer {
    last_ms: Option<u32>,
    interval_ms: u32,
}

impl IntervalTimer {
    pub fn new(interval_ms: u32) -> Self {
        Self {
            last_ms: None,
            interval_ms,
        }
    }

    pub fn started_at(interval_ms: u32, now_ms: u32) -> Self {
        Self {
            last_ms: Some(now_ms),
            interval_ms,
        }
    }

    pub fn is_due(&self, now_ms: u32) -> bool {
        match self.last_ms {
            Some(last_ms) => elapsed_ms(now_ms, last_ms) >= self.interval_ms,
            None => true,
        }
    }

    pub fn reset(&mut self, now_ms: u32) {
        self.last_ms = Some(now_ms);
    }

    /// Returns true and restarts the interval when due.
    pub fn should_update(&mut self, now_ms: u32) -> bool {
        if self.is_due(now_ms) {
            self.reset(now_ms);
            true
        } else {
            false
        }
    }

    pub fn last(&self) -> Option<u32> {
        self.last_ms
    }

    pub fn interval(&self) -> u32 {
        self.interval_ms
    }
}
