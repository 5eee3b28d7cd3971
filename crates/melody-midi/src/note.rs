use serde::{Deserialize, Serialize};

/// Velocity given to notes that did not come from a source file.
pub const DEFAULT_VELOCITY: u8 = 90;

/// MIDI channel index reserved for General MIDI percussion (channel 10).
pub const PERCUSSION_CHANNEL: u8 = 9;

/// A single note with absolute timing in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub pitch: u8,
    pub start: f64,
    pub end: f64,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn new(pitch: u8, start: f64, end: f64) -> Self {
        Self {
            pitch,
            start,
            end,
            velocity: DEFAULT_VELOCITY,
        }
    }

    pub fn with_velocity(mut self, velocity: u8) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// The notes one channel plays within one source track.
///
/// A format-1 file with a piano track on channel 0 and a drum kit on channel 9
/// in the same `MTrk` chunk yields two `Track`s sharing a `track_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Index of the `MTrk` chunk the notes came from
    pub track_index: usize,
    pub channel: u8,
    pub name: Option<String>,
    pub program: Option<u8>,
    pub is_percussion: bool,
    /// Sorted by start, then pitch
    pub notes: Vec<NoteEvent>,
}

impl Track {
    pub fn new(track_index: usize, channel: u8, notes: Vec<NoteEvent>) -> Self {
        Self {
            track_index,
            channel,
            name: None,
            program: None,
            is_percussion: channel == PERCUSSION_CHANNEL,
            notes,
        }
    }

    pub fn pitches(&self) -> Vec<u8> {
        self.notes.iter().map(|n| n.pitch).collect()
    }

    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Sort notes by start time (then pitch); stable for equal keys.
    pub fn sort_notes(&mut self) {
        sort_by_start(&mut self.notes);
    }
}

/// Stable sort by start time, then pitch.
pub fn sort_by_start(notes: &mut [NoteEvent]) {
    notes.sort_by(|a, b| a.start.total_cmp(&b.start).then(a.pitch.cmp(&b.pitch)));
}
