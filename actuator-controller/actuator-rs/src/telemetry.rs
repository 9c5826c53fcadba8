use shared::{stand_hal::TelemetryFrame, util::round_hundredths, util::IntervalTimer};

/// Running sums of tare-corrected pressure samples between two reports.
pub struct TelemetryAccumulator {
    sum_fuel_psi: f64,
    sum_ox_psi: f64,
    sample_count: u32,
    report_timer: IntervalTimer,
}

impl TelemetryAccumulator {
    pub fn new(interval_ms: u32, now_ms: u32) -> Self {
        Self {
            sum_fuel_psi: 0.0,
            sum_ox_psi: 0.0,
            sample_count: 0,
            report_timer: IntervalTimer::started_at(interval_ms, now_ms),
        }
    }

    pub fn add_sample(&mut self, fuel_psi: f64, ox_psi: f64) {
        self.sum_fuel_psi += fuel_psi;
        self.sum_ox_psi += ox_psi;
        self.sample_count += 1;
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Emits the averaged frame and starts a new window once the interval has passed.
    /// `read_load` runs only when a frame is emitted.
    pub fn poll_report<L>(&mut self, now_ms: u32, read_load: L) -> Option<TelemetryFrame>
    where
        L: FnOnce() -> Option<i32>,
    {
        if self.sample_count == 0 || !self.report_timer.should_update(now_ms) {
            return None;
        }

        let count = self.sample_count as f64;
        let frame = TelemetryFrame {
            psi_fuel: round_hundredths(self.sum_fuel_psi / count),
            psi_ox: round_hundredths(self.sum_ox_psi / count),
            load: read_load(),
        };

        self.sum_fuel_psi = 0.0;
        self.sum_ox_psi = 0.0;
        self.sample_count = 0;

        Some(frame)
    }
}
