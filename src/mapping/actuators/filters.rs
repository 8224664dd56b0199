//! Motion filters shared by pointer-style actuators

/// Rolling average over the last samples, blended with the raw sample by speed.
///
/// Slow movement is replaced by the average, fast movement passes through.
#[derive(Debug, Clone)]
pub struct Smoother {
    buffer: Vec<(f64, f64)>,
    capacity: usize,
    next: usize,
    threshold: f64,
}

impl Smoother {
    pub const DEFAULT_CAPACITY: usize = 16;
    pub const DEFAULT_THRESHOLD: f64 = 900.0;

    pub fn new(capacity: usize, threshold: f64) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
            next: 0,
            threshold,
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.next = 0;
    }

    /// Plain rolling average including `sample`
    pub fn smooth(&mut self, sample: (f64, f64)) -> (f64, f64) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(sample);
        } else {
            self.buffer[self.next] = sample;
        }
        self.next = (self.next + 1) % self.capacity;

        let n = self.buffer.len() as f64;
        let (sx, sy) = self
            .buffer
            .iter()
            .fold((0.0, 0.0), |(ax, ay), (x, y)| (ax + x, ay + y));
        (sx / n, sy / n)
    }

    /// Soft tiered smoothing: weight of the raw sample ramps from 0 at half
    /// the threshold to 1 at the threshold.
    pub fn soft_tiered(&mut self, sample: (f64, f64)) -> (f64, f64) {
        let averaged = self.smooth(sample);
        let lower = self.threshold / 2.0;
        let upper = self.threshold;
        let magnitude = sample.0.hypot(sample.1);
        let direct = if upper > lower {
            ((magnitude - lower) / (upper - lower)).clamp(0.0, 1.0)
        } else {
            1.0
        };
        (
            sample.0 * direct + averaged.0 * (1.0 - direct),
            sample.1 * direct + averaged.1 * (1.0 - direct),
        )
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Self::DEFAULT_THRESHOLD)
    }
}

/// Sensitivity curve that ramps from 1x to `factor`x between two speeds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelerationCurve {
    pub factor: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Default for AccelerationCurve {
    fn default() -> Self {
        Self {
            factor: 2.0,
            lower: 1700.0,
            upper: 2000.0,
        }
    }
}

impl AccelerationCurve {
    /// Effective sensitivity for a movement of `magnitude`
    pub fn sensitivity(&self, magnitude: f64, base: f64) -> f64 {
        let weight = if self.upper > self.lower {
            ((magnitude - self.lower) / (self.upper - self.lower)).clamp(0.0, 1.0)
        } else if magnitude >= self.upper {
            1.0
        } else {
            0.0
        };
        base * (1.0 - weight) + base * self.factor * weight
    }

    pub fn apply(&self, delta: (f64, f64), base: f64) -> (f64, f64) {
        let sensitivity = self.sensitivity(delta.0.hypot(delta.1), base);
        (delta.0 * sensitivity, delta.1 * sensitivity)
    }
}

/// Carries the fractional part of a movement over to the next one
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FractionalCarry {
    x: f64,
    y: f64,
}

impl FractionalCarry {
    /// Add `delta` and return the whole units ready to emit
    pub fn take(&mut self, delta: (f64, f64)) -> (i32, i32) {
        self.x += delta.0;
        self.y += delta.1;
        let whole = (self.x.trunc(), self.y.trunc());
        self.x -= whole.0;
        self.y -= whole.1;
        (whole.0 as i32, whole.1 as i32)
    }

    /// Single-axis variant used by scrolling
    pub fn take_one(&mut self, delta: f64) -> i32 {
        self.take((delta, 0.0)).0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_averages_buffer() {
        let mut smoother = Smoother::new(4, 900.0);
        assert_eq!(smoother.smooth((4.0, 0.0)), (4.0, 0.0));
        assert_eq!(smoother.smooth((0.0, 0.0)), (2.0, 0.0));
        for _ in 0..4 {
            smoother.smooth((8.0, 8.0));
        }
        // Old samples have rolled out
        assert_eq!(smoother.smooth((8.0, 8.0)), (8.0, 8.0));
    }

    #[test]
    fn test_soft_tiered_passes_fast_motion() {
        let mut smoother = Smoother::default();
        smoother.soft_tiered((0.0, 0.0));
        assert_eq!(smoother.soft_tiered((1000.0, 0.0)), (1000.0, 0.0));
    }

    #[test]
    fn test_soft_tiered_averages_slow_motion() {
        let mut smoother = Smoother::default();
        smoother.soft_tiered((0.0, 0.0));
        assert_eq!(smoother.soft_tiered((100.0, 0.0)), (50.0, 0.0));
    }

    #[test]
    fn test_acceleration_curve() {
        let curve = AccelerationCurve::default();
        assert_eq!(curve.sensitivity(100.0, 1.0), 1.0);
        assert_eq!(curve.sensitivity(1850.0, 1.0), 1.5);
        assert_eq!(curve.sensitivity(5000.0, 1.0), 2.0);
    }

    #[test]
    fn test_fractional_carry() {
        let mut carry = FractionalCarry::default();
        assert_eq!(carry.take((0.6, -0.6)), (0, 0));
        assert_eq!(carry.take((0.6, -0.6)), (1, -1));
        assert_eq!(carry.take_one(2.5), 2);
    }
}
