use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng};

/// Thin wrapper around a single process-wide RNG shared by the matcher and
/// the engine.
///
/// Single-threaded by construction — callers hold it behind an `Rc<RefCell<_>>`,
/// never an `Arc<Mutex<_>>`, because there is exactly one thread of control.
pub struct Rng(StdRng);

impl Rng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self(StdRng::from_entropy())
    }

    /// Uniform integer in `[min, max]` inclusive — the Rust equivalent of
    /// the original `genRandInt(min, max)`.
    pub fn range_inclusive(&mut self, min: i32, max: i32) -> i32 {
        self.0.gen_range(min..=max)
    }

    pub fn coin_flip(&mut self) -> bool {
        self.0.gen_bool(0.5)
    }

    /// Fisher–Yates shuffle in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_inclusive_stays_in_bounds() {
        let mut rng = Rng::seeded(42);
        for _ in 0..1000 {
            let v = rng.range_inclusive(11, 30);
            assert!((11..=30).contains(&v));
        }
    }

    #[test]
    fn seeded_rngs_are_deterministic() {
        let mut a = Rng::seeded(7);
        let mut b = Rng::seeded(7);
        let seq_a: Vec<i32> = (0..20).map(|_| a.range_inclusive(1, 100)).collect();
        let seq_b: Vec<i32> = (0..20).map(|_| b.range_inclusive(1, 100)).collect();
        assert_eq!(seq_a, seq_b);
    }
}
