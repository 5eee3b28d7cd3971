use serde::{Deserialize, Serialize};
use std::fmt;

use crate::keys::{Key, Mode};

/// Name reported when there was nothing to classify.
pub const UNKNOWN_KEY: &str = "Unknown";

/// Result of key classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The input had no pitches
    Unknown,
    Known { key: Key, relative: Key },
}

impl Classification {
    pub fn key(&self) -> Option<Key> {
        match self {
            Classification::Unknown => None,
            Classification::Known { key, .. } => Some(*key),
        }
    }

    pub fn relative_key(&self) -> Option<Key> {
        match self {
            Classification::Unknown => None,
            Classification::Known { relative, .. } => Some(*relative),
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Unknown => f.write_str(UNKNOWN_KEY),
            Classification::Known { key, .. } => write!(f, "{key}"),
        }
    }
}

/// Number of pitches (with repetition) whose pitch class is in `key`'s scale.
pub fn score(pitches: &[u8], key: Key) -> usize {
    pitches.iter().filter(|&&p| key.contains(p % 12)).count()
}

/// Pick the key whose scale covers the most input pitches.
///
/// Keys are scored in canonical order and the first maximum wins, except
/// that a minor key tying a major best replaces it. Once a minor key leads,
/// later tied keys do not displace it.
pub fn classify(pitches: &[u8]) -> Classification {
    if pitches.is_empty() {
        return Classification::Unknown;
    }

    let mut best: Option<(Key, usize)> = None;

    for key in Key::all() {
        let key_score = score(pitches, key);
        match best {
            None => best = Some((key, key_score)),
            Some((best_key, best_score)) => {
                if key_score > best_score
                    || (key_score == best_score
                        && key.mode() == Mode::Minor
                        && best_key.mode() == Mode::Major)
                {
                    best = Some((key, key_score));
                }
            }
        }
    }

    match best {
        Some((key, _)) => Classification::Known {
            key,
            relative: key.relative(),
        },
        None => Classification::Unknown,
    }
}
