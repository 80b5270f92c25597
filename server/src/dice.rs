//! Dice rolling and scoring
//!
//! A roll is three six-sided dice. It scores when at least two dice match:
//! the score is the value of the odd die out, or the common value when all
//! three match. Three distinct values score 0 and must be rolled again.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Mutex;

pub const DICE_PER_ROLL: usize = 3;
pub const FACES: u8 = 6;

/// Three dice in the order they were drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roll([u8; DICE_PER_ROLL]);

impl Roll {
    pub fn new(a: u8, b: u8, c: u8) -> Self {
        Self([a, b, c])
    }

    pub fn dice(&self) -> [u8; DICE_PER_ROLL] {
        self.0
    }

    /// Scores the roll. Returns 0 when all three dice differ.
    pub fn score(&self) -> u8 {
        let mut sorted = self.0;
        sorted.sort_unstable();

        if sorted[0] == sorted[1] {
            sorted[2]
        } else if sorted[1] == sorted[2] {
            sorted[0]
        } else {
            0
        }
    }
}

impl fmt::Display for Roll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.0[0], self.0[1], self.0[2])
    }
}

/// Anything that can produce rolls for the table
pub trait DiceSource: Send + Sync {
    fn roll(&self) -> Roll;
}

/// Uniform dice backed by a seedable generator
pub struct RandomDice {
    rng: Mutex<StdRng>,
}

impl RandomDice {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Same seed, same sequence of rolls
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomDice {
    fn default() -> Self {
        Self::new()
    }
}

impl DiceSource for RandomDice {
    fn roll(&self) -> Roll {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Roll::new(
            rng.gen_range(1..=FACES),
            rng.gen_range(1..=FACES),
            rng.gen_range(1..=FACES),
        )
    }
}

/// Replays a fixed list of rolls, starting over once the list runs out
///
/// Used to reproduce a known game. An empty script rolls `[1, 1, 1]`.
pub struct ScriptedDice {
    rolls: Vec<Roll>,
    cursor: Mutex<usize>,
}

impl ScriptedDice {
    pub fn new(rolls: Vec<Roll>) -> Self {
        Self {
            rolls,
            cursor: Mutex::new(0),
        }
    }
}

impl DiceSource for ScriptedDice {
    fn roll(&self) -> Roll {
        if self.rolls.is_empty() {
            return Roll::new(1, 1, 1);
        }

        let mut cursor = self
            .cursor
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let roll = self.rolls[*cursor % self.rolls.len()];
        *cursor += 1;
        roll
    }
}
