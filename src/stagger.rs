//! Time-based staggering of per-particle checks.
//!
//! Containment and obstacle checks cost O(obstacles) per particle, so they run
//! over a rotating window of slots each frame instead of over the whole
//! population.  The window size is derived from elapsed time, not from a frame
//! counter: every slot is visited once per `period` seconds of simulated time
//! regardless of frame rate.

/// The contiguous (wrapping) range of slots checked during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepWindow {
    pub start: u32,
    pub len: u32,
    pub count: u32,
}

impl SweepWindow {
    /// A window covering every slot.
    pub fn all(count: u32) -> Self {
        Self {
            start: 0,
            len: count,
            count,
        }
    }

    /// Whether slot `index` falls inside this window.
    #[inline]
    pub fn contains(&self, index: u32) -> bool {
        if self.len >= self.count {
            return true;
        }
        if self.len == 0 {
            return false;
        }
        let offset = (index as u64 + self.count as u64 - self.start as u64) % self.count as u64;
        offset < self.len as u64
    }
}

/// Rotating cursor over particle slots, advanced by elapsed time.
#[derive(Debug, Clone)]
pub struct StaggeredSweep {
    period: f32,
    cursor: u32,
    carry: f32,
}

impl StaggeredSweep {
    /// A sweep that visits every slot once per `period` seconds.  A
    /// non-positive period checks every slot every frame.
    pub fn new(period: f32) -> Self {
        Self {
            period,
            cursor: 0,
            carry: 0.0,
        }
    }

    pub fn period(&self) -> f32 {
        self.period
    }

    /// Change the period without losing the cursor position.
    pub fn set_period(&mut self, period: f32) {
        if period != self.period {
            self.period = period;
            self.carry = 0.0;
        }
    }

    /// Advance by `dt` seconds over a population of `count` slots and return
    /// the window to check this frame.
    pub fn advance(&mut self, count: u32, dt: f32) -> SweepWindow {
        if count == 0 {
            return SweepWindow {
                start: 0,
                len: 0,
                count: 0,
            };
        }
        if self.period <= 0.0 {
            return SweepWindow::all(count);
        }

        let exact = count as f32 * dt.max(0.0) / self.period + self.carry;
        let whole = exact.floor();
        let len = if whole >= count as f32 {
            self.carry = 0.0;
            count
        } else {
            self.carry = exact - whole;
            whole as u32
        };

        let start = self.cursor % count;
        self.cursor = ((start as u64 + len as u64) % count as u64) as u32;
        SweepWindow { start, len, count }
    }
}
