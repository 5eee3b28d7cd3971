//! MIDI I/O for melodist.
//!
//! Parses Standard MIDI Files into per-channel [`Track`]s of [`NoteEvent`]s
//! timed in seconds, and writes edited notes back into a template file while
//! keeping its tempo map and instrument setup.

pub mod analyze;
pub mod midi_writer;
pub mod note;
pub mod tempo;

pub use analyze::{extract_tracks, MidiSong};
pub use midi_writer::rewrite;
pub use note::{sort_by_start, NoteEvent, Track, DEFAULT_VELOCITY, PERCUSSION_CHANNEL};
pub use tempo::{TempoChange, TempoMap};

use std::path::PathBuf;

/// Errors from MIDI reading and writing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("MIDI parse error: {0}")]
    MidiParse(String),

    #[error("MIDI write error: {0}")]
    MidiWrite(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("track {track_index} does not exist (file has {track_count} tracks)")]
    TrackOutOfRange {
        track_index: usize,
        track_count: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
