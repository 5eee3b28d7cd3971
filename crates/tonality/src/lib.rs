//! Key detection and melody embellishment.
//!
//! Classifies pitch sequences against the 24 major and natural minor keys,
//! snaps stray notes onto a key's scale, learns per-key interval statistics
//! from a corpus, and uses them to fill rhythmic gaps in a melody.

pub mod chooser;
pub mod classify;
pub mod correct;
pub mod enhance;
pub mod keys;
pub mod model;
pub mod select;
pub mod train;

pub use chooser::{Chooser, RngChooser};
pub use classify::{classify, score, Classification, UNKNOWN_KEY};
pub use correct::{correct, correct_to_key, is_in_key, snap_pitch};
pub use enhance::{enhance, sample_interval};
pub use keys::{Key, Mode, NOTE_NAMES};
pub use model::{IntervalDistribution, IntervalModel};
pub use select::{melody_score, select_melody, select_melody_track, MIN_MELODY_NOTES};
pub use train::{list_midi_files, train, train_from_folder, IntervalTrainer};

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown key: {0:?}")]
    InvalidKey(String),

    #[error(transparent)]
    Midi(#[from] melody_midi::Error),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid interval model: {0}")]
    ModelFormat(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
