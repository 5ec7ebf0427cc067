/// Converts variable wall-clock frame deltas into a whole number of fixed
/// simulation steps. Pending time beyond the configured cap is dropped, so
/// a long stall cannot snowball into an unbounded step burst.
///
/// Within one step, advance moving platforms first, then the player, then
/// enemies in a fixed list order, and only then read positions out for
/// rendering. That ordering lets riders see the platform state of the same
/// step they are resolved in.
#[derive(Copy, Clone, Debug)]
pub struct FixedTimestep {
    h: f64,
    max_accumulated: f64,
    accumulator: f64,
}

impl FixedTimestep {
    pub fn new(h: f64) -> Self {
        let h = if h.is_finite() && h > 0.0 { h } else { 1.0 / 60.0 };
        Self {
            h,
            max_accumulated: 8.0 * h,
            accumulator: 0.0,
        }
    }

    /// Caps the pending-time backlog. The cap never drops below one step.
    pub fn with_max_accumulated(mut self, cap: f64) -> Self {
        if cap.is_finite() {
            self.max_accumulated = cap.max(self.h);
        }
        self
    }

    pub fn step_size(&self) -> f64 {
        self.h
    }

    /// Feeds one frame's delta and returns how many fixed steps to run
    /// now. Non-finite or non-positive deltas contribute nothing.
    pub fn advance(&mut self, frame_dt: f64) -> u32 {
        if frame_dt.is_finite() && frame_dt > 0.0 {
            self.accumulator += frame_dt;
        }
        if self.accumulator > self.max_accumulated {
            self.accumulator = self.max_accumulated;
        }
        let mut steps = 0;
        while self.accumulator >= self.h {
            self.accumulator -= self.h;
            steps += 1;
        }
        steps
    }

    /// Simulation time still owed, always in [0, h).
    pub fn leftover(&self) -> f64 {
        self.accumulator
    }

    /// Fraction of the pending partial step, for render interpolation.
    pub fn alpha(&self) -> f64 {
        (self.accumulator / self.h).clamp(0.0, 1.0)
    }
}
