use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::shared::error::MoodError;

/// Mood score in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MoodValue(u8);

impl MoodValue {
    pub const NEUTRAL: MoodValue = MoodValue(50);
    pub const MAX: u32 = 100;

    pub fn new(value: u32) -> Result<Self, MoodError> {
        if value > Self::MAX {
            return Err(MoodError::OutOfRange(value));
        }
        Ok(Self(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Takes the first standalone 1-3 digit integer in `text`. Values above 100
    /// are rejected, never clamped.
    pub fn extract(text: &str) -> Result<Self, MoodError> {
        let raw = first_standalone_number(text).ok_or(MoodError::NotFound)?;
        Self::new(raw)
    }
}

impl Default for MoodValue {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

impl fmt::Display for MoodValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn mood_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?:^|[^0-9])([0-9]{1,3})(?:[^0-9]|$)").ok())
        .as_ref()
}

fn first_standalone_number(text: &str) -> Option<u32> {
    let caps = mood_pattern()?.captures(text)?;
    caps.get(1)?.as_str().parse().ok()
}
