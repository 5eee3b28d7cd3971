use melody_midi::MidiSong;
use melodist::commands::{self, CorrectOutcome, Settings};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tonality::{Key, RngChooser};

/// Format-1 file at 120 BPM with one melody track on channel 0 and a kick
/// on channel 9, one note per beat.
fn melody_file(pitches: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"MThd");
    buf.extend_from_slice(&6u32.to_be_bytes());
    buf.extend_from_slice(&1u16.to_be_bytes());
    buf.extend_from_slice(&2u16.to_be_bytes());
    buf.extend_from_slice(&480u16.to_be_bytes());

    let tempo = [
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, 0x00, 0xFF, 0x2F, 0x00,
    ];
    buf.extend_from_slice(b"MTrk");
    buf.extend_from_slice(&(tempo.len() as u32).to_be_bytes());
    buf.extend_from_slice(&tempo);

    // 240 ticks = 0x81 0x70 as a variable-length delta
    let mut track = Vec::new();
    for (i, &pitch) in pitches.iter().enumerate() {
        if i == 0 {
            track.push(0x00);
        } else {
            track.extend_from_slice(&[0x81, 0x70]);
        }
        track.extend_from_slice(&[0x90, pitch, 100]);
        track.extend_from_slice(&[0x00, 0x99, 36, 100]);
        track.extend_from_slice(&[0x81, 0x70, 0x80, pitch, 0]);
        track.extend_from_slice(&[0x00, 0x89, 36, 0]);
    }
    track.extend_from_slice(&[0x00, 0xFF, 0x2F, 0x00]);
    buf.extend_from_slice(b"MTrk");
    buf.extend_from_slice(&(track.len() as u32).to_be_bytes());
    buf.extend_from_slice(&track);

    buf
}

const C_MINOR: [u8; 12] = [60, 62, 63, 65, 67, 68, 70, 72, 70, 68, 67, 65];

fn settings(output_dir: &Path, training_dir: &Path) -> Settings {
    Settings {
        training_dir: training_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        insert_prob: 1.0,
        seed: Some(5),
        max_training_files: None,
    }
}

fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

#[test]
fn classify_reports_key_and_relative() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "tune.mid", &melody_file(&C_MINOR));

    let report = commands::classify_file(&path).unwrap();
    assert_eq!(report.note_count, 12);
    assert_eq!(report.classification.key(), Some(Key::minor(0)));
    assert_eq!(report.classification.relative_key(), Some(Key::major(3)));
}

#[test]
fn in_key_file_is_not_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "tune.mid", &melody_file(&C_MINOR));
    let out = dir.path().join("out");

    let outcome = commands::correct_file(&path, None, &out).unwrap();
    assert!(matches!(outcome, CorrectOutcome::AlreadyInKey { key } if key == Key::minor(0)));
    assert!(!out.exists());
}

#[test]
fn out_of_key_notes_are_corrected_into_numbered_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut tune = C_MINOR;
    // E natural and B natural do not belong to C minor
    tune[2] = 64;
    tune[6] = 71;
    let path = write(dir.path(), "cminor_outofkey.mid", &melody_file(&tune));

    let key = Some(Key::minor(0));
    let first = commands::correct_file(&path, key, dir.path()).unwrap();
    let CorrectOutcome::Corrected { output, changed, .. } = first else {
        panic!("expected a correction");
    };
    assert_eq!(changed, 2);
    assert_eq!(output, dir.path().join("cminor_outofkey_corrected1.mid"));

    let song = MidiSong::load(&output).unwrap();
    // E (4) snaps to D#, B (11) snaps to C
    assert_eq!(
        song.melodic_pitches(),
        vec![60, 62, 63, 65, 67, 68, 72, 72, 70, 68, 67, 65]
    );
    assert_eq!(song.tracks.iter().filter(|t| t.is_percussion).count(), 1);

    let second = commands::correct_file(&path, key, dir.path()).unwrap();
    let CorrectOutcome::Corrected { output, .. } = second else {
        panic!("expected a correction");
    };
    assert_eq!(output, dir.path().join("cminor_outofkey_corrected2.mid"));
}

#[test]
fn enhance_runs_the_whole_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let training = dir.path().join("training");
    fs::create_dir(&training).unwrap();
    write(&training, "one.mid", &melody_file(&C_MINOR));
    let mut reversed = C_MINOR;
    reversed.reverse();
    write(&training, "two.mid", &melody_file(&reversed));

    let mut tune = C_MINOR;
    tune[6] = 71;
    let input = write(dir.path(), "input.mid", &melody_file(&tune));
    let missing = dir.path().join("missing.mid");

    let out = dir.path().join("out");
    let settings = settings(&out, &training);
    let model = commands::obtain_model(&settings, None).unwrap();
    assert_eq!(model.keys().collect::<Vec<_>>(), vec![Key::minor(0)]);

    let mut chooser = RngChooser::seeded(5);
    let (reports, failures) =
        commands::enhance_files(&[missing, input], &model, None, &settings, &mut chooser);
    assert_eq!(failures, 1);
    assert_eq!(reports.len(), 1);

    let report = &reports[0];
    assert_eq!(report.key, Key::minor(0));
    assert_eq!(report.original_notes, 12);
    assert_eq!(report.corrected_notes, 12);
    assert!(report.enhanced_notes > report.corrected_notes);
    assert_eq!(
        report.corrected_output.as_deref(),
        Some(out.join("input_corrected1.mid").as_path())
    );
    assert_eq!(report.enhanced_output, out.join("input_enhanced1.mid"));

    let enhanced = MidiSong::load(&report.enhanced_output).unwrap();
    let lead = enhanced.first_melodic_track().unwrap();
    assert_eq!(lead.note_count(), report.enhanced_notes);
    assert!(lead.pitches().iter().all(|p| Key::minor(0).contains(p % 12)));
}

#[test]
fn saved_model_can_replace_training() {
    let dir = tempfile::tempdir().unwrap();
    let training = dir.path().join("training");
    fs::create_dir(&training).unwrap();
    write(&training, "one.mid", &melody_file(&C_MINOR));

    let settings = settings(dir.path(), &training);
    let model = commands::obtain_model(&settings, None).unwrap();
    let model_path = dir.path().join("model.json");
    model.save(&model_path).unwrap();

    let empty = settings_with_missing_training(dir.path());
    let loaded = commands::obtain_model(&empty, Some(&model_path)).unwrap();
    assert_eq!(loaded, model);
    assert!(commands::obtain_model(&empty, None).is_err());
}

fn settings_with_missing_training(dir: &Path) -> Settings {
    settings(dir, &dir.join("no-such-folder"))
}
