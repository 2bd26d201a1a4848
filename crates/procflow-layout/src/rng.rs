//! Seeded randomness for initial placement.

/// Source of uniform samples. Injected into the engine so layouts are reproducible.
pub trait RandomSource {
    fn next_u64(&mut self) -> u64;

    /// Uniform in `[0, 1)` with 53 bits of precision.
    fn next_f64_unit(&mut self) -> f64 {
        let u = self.next_u64() >> 11;
        (u as f64) / ((1u64 << 53) as f64)
    }

    /// Uniform in `[-1, 1)`.
    fn next_f64_signed(&mut self) -> f64 {
        self.next_f64_unit() * 2.0 - 1.0
    }
}

/// xorshift64* generator. A zero seed is mapped to 1.
#[derive(Debug, Clone)]
pub struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }
}

impl RandomSource for XorShift64Star {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D_u64)
    }
}
