use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sharps-only spelling, indexed by pitch class.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const MAJOR_STEPS: [u8; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR_STEPS: [u8; 7] = [0, 2, 3, 5, 7, 8, 10];

pub const KEY_COUNT: usize = 24;

/// Scales of all 24 keys in canonical order, each listed from its tonic.
static SCALES: [[u8; 7]; KEY_COUNT] = build_scales();

const fn build_scales() -> [[u8; 7]; KEY_COUNT] {
    let mut table = [[0u8; 7]; KEY_COUNT];
    let mut index = 0;
    while index < KEY_COUNT {
        let steps = if index < 12 { MAJOR_STEPS } else { MINOR_STEPS };
        let tonic = (index % 12) as u8;
        let mut degree = 0;
        while degree < 7 {
            table[index][degree] = (tonic + steps[degree]) % 12;
            degree += 1;
        }
        index += 1;
    }
    table
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Major,
    Minor,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Major => write!(f, "major"),
            Mode::Minor => write!(f, "minor"),
        }
    }
}

/// One of the 24 major/minor keys.
///
/// Ordering follows the canonical enumeration: every major key by tonic,
/// then every minor key by tonic. Serializes as its name, e.g. `"F#-minor"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key {
    // Field order drives the derived `Ord`
    mode: Mode,
    tonic: u8,
}

impl Key {
    pub const fn new(tonic: u8, mode: Mode) -> Self {
        Key {
            mode,
            tonic: tonic % 12,
        }
    }

    pub const fn major(tonic: u8) -> Self {
        Key::new(tonic, Mode::Major)
    }

    pub const fn minor(tonic: u8) -> Self {
        Key::new(tonic, Mode::Minor)
    }

    /// All 24 keys in canonical order.
    pub fn all() -> impl Iterator<Item = Key> {
        (0..KEY_COUNT).map(Key::from_index)
    }

    fn from_index(index: usize) -> Key {
        let mode = if index < 12 { Mode::Major } else { Mode::Minor };
        Key::new((index % 12) as u8, mode)
    }

    fn index(self) -> usize {
        match self.mode {
            Mode::Major => self.tonic as usize,
            Mode::Minor => 12 + self.tonic as usize,
        }
    }

    pub fn tonic(self) -> u8 {
        self.tonic
    }

    pub fn mode(self) -> Mode {
        self.mode
    }

    /// Seven pitch classes, starting at the tonic.
    pub fn scale(self) -> &'static [u8; 7] {
        &SCALES[self.index()]
    }

    pub fn contains(self, pitch_class: u8) -> bool {
        self.scale().contains(&(pitch_class % 12))
    }

    /// The key of the opposite mode sharing this key's pitch classes.
    pub fn relative(self) -> Key {
        match self.mode {
            Mode::Major => Key::minor(self.tonic + 9),
            Mode::Minor => Key::major(self.tonic + 3),
        }
    }

    pub fn name(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", NOTE_NAMES[self.tonic as usize], self.mode)
    }
}

impl FromStr for Key {
    type Err = crate::Error;

    /// Parse `<tonic>-<mode>`, e.g. `C#-minor`. Letter case is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || crate::Error::InvalidKey(s.to_string());

        let (tonic_name, mode_name) = s.trim().split_once('-').ok_or_else(invalid)?;
        let tonic = NOTE_NAMES
            .iter()
            .position(|name| name.eq_ignore_ascii_case(tonic_name))
            .ok_or_else(invalid)?;
        let mode = if mode_name.eq_ignore_ascii_case("major") {
            Mode::Major
        } else if mode_name.eq_ignore_ascii_case("minor") {
            Mode::Minor
        } else {
            return Err(invalid());
        };

        Ok(Key::new(tonic as u8, mode))
    }
}

impl TryFrom<String> for Key {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.name()
    }
}
