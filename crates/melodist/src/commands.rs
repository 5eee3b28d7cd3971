//! CLI command implementations

use anyhow::{bail, Context, Result};
use melody_midi::{rewrite, sort_by_start, MidiSong, NoteEvent, Track};
use melodyconf::MelodistConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tonality::{
    classify, correct_to_key, enhance, is_in_key, train_from_folder, Chooser, Classification,
    IntervalModel, Key, RngChooser,
};
use tracing::{error, info, warn};

use crate::naming::{stem_of, unique_path};

/// Effective settings after config files, environment and flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub training_dir: PathBuf,
    pub output_dir: PathBuf,
    pub insert_prob: f64,
    pub seed: Option<u64>,
    pub max_training_files: Option<usize>,
}

impl From<&MelodistConfig> for Settings {
    fn from(config: &MelodistConfig) -> Self {
        Self {
            training_dir: config.paths.training_dir.clone(),
            output_dir: config.paths.output_dir.clone(),
            insert_prob: config.enhance.insert_prob,
            seed: config.enhance.seed,
            max_training_files: config.enhance.max_training_files,
        }
    }
}

impl Settings {
    pub fn chooser(&self) -> Box<dyn Chooser> {
        match self.seed {
            Some(seed) => Box::new(RngChooser::seeded(seed)),
            None => Box::new(RngChooser::from_os()),
        }
    }
}

pub struct ClassifyReport {
    pub note_count: usize,
    pub classification: Classification,
}

/// Detect the key of every non-percussion note in a file.
pub fn classify_file(path: &Path) -> Result<ClassifyReport> {
    let song = MidiSong::load(path).with_context(|| format!("loading {}", path.display()))?;
    let pitches = song.melodic_pitches();
    Ok(ClassifyReport {
        note_count: pitches.len(),
        classification: classify(&pitches),
    })
}

#[derive(Debug)]
pub enum CorrectOutcome {
    AlreadyInKey { key: Key },
    Corrected { key: Key, output: PathBuf, changed: usize },
}

/// Melodic tracks with every pitch snapped to `key`. Percussion is left out.
fn corrected_tracks(song: &MidiSong, key: Key) -> Vec<Track> {
    song.melodic_tracks()
        .map(|track| {
            let pitches = correct_to_key(&track.pitches(), key);
            let mut corrected = track.clone();
            for (note, pitch) in corrected.notes.iter_mut().zip(pitches) {
                note.pitch = pitch;
            }
            corrected.sort_notes();
            corrected
        })
        .collect()
}

fn resolve_key(pitches: &[u8], key: Option<Key>) -> Option<Key> {
    key.or_else(|| classify(pitches).key())
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

/// Snap out-of-key notes to the detected (or given) key and write a
/// `<stem>_corrected<N>.mid` copy. Nothing is written when every note is
/// already in key.
pub fn correct_file(path: &Path, key: Option<Key>, output_dir: &Path) -> Result<CorrectOutcome> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let song = MidiSong::parse(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    let pitches = song.melodic_pitches();

    let Some(key) = resolve_key(&pitches, key) else {
        bail!("{} has no melodic notes", path.display());
    };
    if is_in_key(&pitches, key) {
        return Ok(CorrectOutcome::AlreadyInKey { key });
    }

    let changed = pitches.iter().filter(|&&p| !key.contains(p % 12)).count();
    let corrected = rewrite(&bytes, &corrected_tracks(&song, key))?;
    let output = unique_path(output_dir, &format!("{}_corrected", stem_of(path)), ".mid");
    write_output(&output, &corrected)?;
    info!(output = %output.display(), %key, changed, "saved corrected file");

    Ok(CorrectOutcome::Corrected {
        key,
        output,
        changed,
    })
}

/// Train on the configured folder, or load a saved model instead.
pub fn obtain_model(settings: &Settings, model_path: Option<&Path>) -> Result<IntervalModel> {
    if let Some(path) = model_path {
        return IntervalModel::load(path)
            .with_context(|| format!("loading interval model {}", path.display()));
    }
    train_from_folder(&settings.training_dir, settings.max_training_files)
        .with_context(|| format!("training from {}", settings.training_dir.display()))
}

#[derive(Debug)]
pub struct EnhanceReport {
    pub key: Key,
    pub relative: Key,
    /// Set when the input needed correction first
    pub corrected_output: Option<PathBuf>,
    pub enhanced_output: PathBuf,
    pub original_notes: usize,
    pub corrected_notes: usize,
    pub enhanced_notes: usize,
}

/// Classify, correct if needed, embellish and write one file.
///
/// The enhanced melody replaces the first melodic track of the (corrected)
/// input. Returns `None` for files without melodic notes.
pub fn enhance_file(
    path: &Path,
    model: &IntervalModel,
    key: Option<Key>,
    settings: &Settings,
    chooser: &mut dyn Chooser,
) -> Result<Option<EnhanceReport>> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let song = MidiSong::parse(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    let pitches = song.melodic_pitches();
    if pitches.is_empty() {
        warn!(path = %path.display(), "no melodic notes found");
        return Ok(None);
    }

    let Some(key) = resolve_key(&pitches, key) else {
        return Ok(None);
    };
    info!(path = %path.display(), %key, relative = %key.relative(), "detected key");

    let stem = stem_of(path);
    let (template, tracks, corrected_output) = if is_in_key(&pitches, key) {
        info!("all notes already in key");
        (bytes, song.tracks.clone(), None)
    } else {
        let corrected = corrected_tracks(&song, key);
        let corrected_bytes = rewrite(&bytes, &corrected)?;
        let output = unique_path(&settings.output_dir, &format!("{stem}_corrected"), ".mid");
        write_output(&output, &corrected_bytes)?;
        info!(output = %output.display(), "saved corrected file");
        (corrected_bytes, corrected, Some(output))
    };

    let mut melody: Vec<NoteEvent> = tracks
        .iter()
        .filter(|t| !t.is_percussion)
        .flat_map(|t| t.notes.iter().copied())
        .collect();
    melody.sort_by(|a, b| a.start.total_cmp(&b.start));
    let corrected_notes = melody.len();

    let distribution = match model.for_key_or_fallback(key) {
        Some((_, distribution)) => Some(distribution),
        None => {
            warn!(%key, "interval model is empty, using fallback intervals");
            None
        }
    };
    let enhanced = enhance(&melody, key, distribution, settings.insert_prob, chooser);

    let Some(target) = tracks.iter().find(|t| !t.is_percussion && !t.notes.is_empty()) else {
        bail!("{} has no melodic track to write into", path.display());
    };
    let mut lead = target.clone();
    lead.notes = enhanced;
    sort_by_start(&mut lead.notes);
    let enhanced_notes = lead.notes.len();

    let enhanced_bytes = rewrite(&template, &[lead])?;
    let enhanced_output = unique_path(&settings.output_dir, &format!("{stem}_enhanced"), ".mid");
    write_output(&enhanced_output, &enhanced_bytes)?;

    info!(
        original = pitches.len(),
        corrected = corrected_notes,
        enhanced = enhanced_notes,
        output = %enhanced_output.display(),
        "saved enhanced file"
    );

    Ok(Some(EnhanceReport {
        key,
        relative: key.relative(),
        corrected_output,
        enhanced_output,
        original_notes: pitches.len(),
        corrected_notes,
        enhanced_notes,
    }))
}

/// Run [`enhance_file`] over many inputs. Missing or unreadable files are
/// logged and skipped; the count of failures is returned.
pub fn enhance_files(
    inputs: &[PathBuf],
    model: &IntervalModel,
    key: Option<Key>,
    settings: &Settings,
    chooser: &mut dyn Chooser,
) -> (Vec<EnhanceReport>, usize) {
    let mut reports = Vec::new();
    let mut failures = 0;

    for input in inputs {
        if !input.is_file() {
            error!(path = %input.display(), "input MIDI not found");
            failures += 1;
            continue;
        }
        match enhance_file(input, model, key, settings, chooser) {
            Ok(Some(report)) => reports.push(report),
            Ok(None) => {}
            Err(err) => {
                error!(path = %input.display(), "{err:#}");
                failures += 1;
            }
        }
    }

    (reports, failures)
}
