use rand::Rng;

use crate::error::InputError;

/// What the user has to type to turn blocking off.
pub const PHRASES: [&str; 5] = [
    "I choose to waste my precious time on infinite scrolling",
    "I accept giving my attention away for free to billionaires",
    "I choose dopamine over my future success and happiness",
    "I willingly donate 38 days of my life each year to social media",
    "I accept being distracted while others achieve their dreams",
];

/// One disable attempt. The phrase stays the same across retries of the same attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Challenge {
    phrase: &'static str,
}

impl Challenge {
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            phrase: PHRASES[rng.gen_range(0..PHRASES.len())],
        }
    }

    pub fn phrase(&self) -> &'static str {
        self.phrase
    }

    /// Whole phrase, ignoring case and surrounding whitespace. Anything less is a mismatch.
    pub fn verify(&self, typed: &str) -> Result<(), InputError> {
        if typed.trim().to_lowercase() == self.phrase.to_lowercase() {
            Ok(())
        } else {
            Err(InputError::PhraseMismatch)
        }
    }
}
