/// One-pole follower used for parameter ramps and voice envelopes.
#[derive(Clone, Copy, Debug)]
pub struct Smoother {
    coeff: f32,
    value: f32,
}

impl Default for Smoother {
    fn default() -> Self {
        Self { coeff: 1.0, value: 0.0 }
    }
}

impl Smoother {
    pub fn new(sample_rate: f32, time_ms: f32) -> Self {
        let mut smoother = Self::default();
        smoother.set_time(sample_rate, time_ms);
        smoother
    }

    /// Sets the time constant. Anything shorter than one sample jumps.
    pub fn set_time(&mut self, sample_rate: f32, time_ms: f32) {
        let samples = time_ms.max(0.0) * 0.001 * sample_rate.max(1.0);
        self.coeff = if samples <= 1.0 {
            1.0
        } else {
            (1.0 - (-1.0 / samples).exp()).clamp(0.0, 1.0)
        };
    }

    #[inline]
    pub fn jump(&mut self, value: f32) {
        self.value = value;
    }

    #[inline]
    pub fn next(&mut self, target: f32) -> f32 {
        self.value += self.coeff * (target - self.value);
        self.value
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converges_towards_target() {
        let mut smoother = Smoother::new(48_000.0, 5.0);
        let mut previous = 0.0;
        for _ in 0..48 {
            let value = smoother.next(1.0);
            assert!(value > previous && value < 1.0);
            previous = value;
        }
        for _ in 0..48_000 {
            smoother.next(1.0);
        }
        assert!((smoother.value() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn sub_sample_time_jumps() {
        let mut smoother = Smoother::new(48_000.0, 0.0);
        assert_eq!(smoother.next(0.5), 0.5);
    }
}
