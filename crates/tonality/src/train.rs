use melody_midi::{MidiSong, Track};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::classify::{classify, Classification};
use crate::keys::Key;
use crate::model::{IntervalDistribution, IntervalModel};
use crate::select::select_melody;
use crate::{Error, Result};

/// Leaps wider than an octave are treated as phrase breaks, not intervals.
pub const MAX_INTERVAL: i16 = 12;

/// Accumulates interval counts per key across a corpus.
#[derive(Debug, Default)]
pub struct IntervalTrainer {
    counts: BTreeMap<Key, BTreeMap<i8, u64>>,
    items_used: usize,
    items_skipped: usize,
}

impl IntervalTrainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the melody of one song's tracks and count its intervals.
    pub fn add_tracks(&mut self, tracks: &[Track]) -> Option<Key> {
        let pitches = select_melody(tracks);
        self.add_pitches(&pitches)
    }

    /// Classify a melody and count its intervals under the detected key.
    /// Returns the key used, or `None` when the melody was skipped.
    pub fn add_pitches(&mut self, pitches: &[u8]) -> Option<Key> {
        if pitches.len() < 2 {
            debug!(notes = pitches.len(), "melody too short to train on");
            self.items_skipped += 1;
            return None;
        }

        let key = match classify(pitches) {
            Classification::Known { key, .. } => key,
            Classification::Unknown => {
                warn!("could not classify melody, skipping");
                self.items_skipped += 1;
                return None;
            }
        };

        let counts = self.counts.entry(key).or_default();
        for pair in pitches.windows(2) {
            let interval = pair[1] as i16 - pair[0] as i16;
            if interval.abs() > MAX_INTERVAL {
                continue;
            }
            *counts.entry(interval as i8).or_insert(0) += 1;
        }
        // Every interval may have been a leap
        if counts.is_empty() {
            self.counts.remove(&key);
        }

        self.items_used += 1;
        Some(key)
    }

    pub fn items_used(&self) -> usize {
        self.items_used
    }

    pub fn items_skipped(&self) -> usize {
        self.items_skipped
    }

    pub fn finish(self) -> IntervalModel {
        let mut model = IntervalModel::new();
        for (key, counts) in &self.counts {
            model.insert(*key, IntervalDistribution::from_counts(counts));
        }
        if model.is_empty() {
            info!("no usable melodies, interval model is empty");
        } else {
            info!(
                keys = model.len(),
                melodies = self.items_used,
                skipped = self.items_skipped,
                "trained interval model"
            );
        }
        model
    }
}

/// Train on a corpus where each item is one song's tracks.
pub fn train(corpus: &[Vec<Track>]) -> IntervalModel {
    let mut trainer = IntervalTrainer::new();
    for tracks in corpus {
        trainer.add_tracks(tracks);
    }
    trainer.finish()
}

fn is_midi_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mid") || ext.eq_ignore_ascii_case("midi"))
}

/// MIDI files directly inside `dir`, sorted by name.
pub fn list_midi_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let io_error = |source| Error::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if is_midi_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Train on every `.mid`/`.midi` file in `dir`, up to `max_files`.
///
/// Files that fail to load are logged and skipped. Only an unreadable
/// folder is an error.
pub fn train_from_folder(dir: &Path, max_files: Option<usize>) -> Result<IntervalModel> {
    let files = list_midi_files(dir)?;
    let limit = max_files.unwrap_or(usize::MAX);

    let mut trainer = IntervalTrainer::new();
    let mut loaded = 0usize;
    for path in files.iter().take(limit) {
        match MidiSong::load(path) {
            Ok(song) => {
                loaded += 1;
                let key = trainer.add_tracks(&song.tracks);
                debug!(path = %path.display(), key = ?key.map(Key::name), "training file");
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable MIDI file");
            }
        }
    }

    info!(
        dir = %dir.display(),
        found = files.len(),
        loaded,
        "loaded training files"
    );
    Ok(trainer.finish())
}
