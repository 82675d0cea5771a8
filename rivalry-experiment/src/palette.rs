use rand::Rng;
use rand::seq::SliceRandom;
use rivalry_core::ColorScheme;

/// Colour schemes drawn without replacement, reshuffled once exhausted.
///
/// Every consecutive pair of draws (1-2, 3-4, ...) covers both schemes, so
/// a scheme can repeat across a refill but never three times in a row.
#[derive(Debug, Clone, Default)]
pub struct ColorBag {
    pending: Vec<ColorScheme>,
}

impl ColorBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ColorScheme {
        if self.pending.is_empty() {
            self.pending = ColorScheme::ALL.to_vec();
            self.pending.shuffle(rng);
        }
        // refilled above
        self.pending.pop().unwrap_or(ColorScheme::BlueHouseRedFace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn each_refill_yields_both_schemes() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut bag = ColorBag::new();
        for _ in 0..100 {
            let first = bag.draw(&mut rng);
            let second = bag.draw(&mut rng);
            assert_ne!(first, second);
        }
    }
}
