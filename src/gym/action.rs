use std::fmt;

use enum_map::Enum;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Declaration order is the action index, and the greedy tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Hold,
    Buy,
    Sell,
}

impl Action {
    pub const COUNT: usize = 3;
    pub const ALL: [Action; Action::COUNT] = [Action::Hold, Action::Buy, Action::Sell];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::COUNT)]
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Hold => "hold",
            Action::Buy => "buy",
            Action::Sell => "sell",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn indices_follow_declaration_order() {
        assert_eq!(Action::Hold.index(), 0);
        assert_eq!(Action::Buy.index(), 1);
        assert_eq!(Action::Sell.index(), 2);
    }

    #[test]
    fn random_covers_every_action() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut seen = [false; Action::COUNT];
        for _ in 0..200 {
            seen[Action::random(&mut rng).index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }
}
