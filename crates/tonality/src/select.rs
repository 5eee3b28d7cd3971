use melody_midi::Track;
use std::collections::HashSet;

/// Tracks shorter than this carry too little melodic information.
pub const MIN_MELODY_NOTES: usize = 12;

/// How melodic a track looks: pitch variety minus overlap.
///
/// `unique_ratio` is distinct pitches over note count; `polyphony_ratio` is
/// the share of notes starting before their predecessor ends. Chordal
/// accompaniment repeats pitches and overlaps heavily, so it scores low.
pub fn melody_score(track: &Track) -> f64 {
    let notes = &track.notes;
    if notes.is_empty() {
        return 0.0;
    }

    let overlaps = notes
        .windows(2)
        .filter(|pair| pair[1].start < pair[0].end)
        .count();
    let unique_pitches = notes.iter().map(|n| n.pitch).collect::<HashSet<u8>>().len();
    let total = notes.len() as f64;

    unique_pitches as f64 / total - overlaps as f64 / total
}

/// The most melodic non-percussion track with at least
/// [`MIN_MELODY_NOTES`] notes. The first of several equal scores wins.
pub fn select_melody_track(tracks: &[Track]) -> Option<&Track> {
    let mut best: Option<(&Track, f64)> = None;

    for track in tracks {
        if track.is_percussion || track.notes.len() < MIN_MELODY_NOTES {
            continue;
        }
        let score = melody_score(track);
        if best.map_or(true, |(_, best_score)| score > best_score) {
            best = Some((track, score));
        }
    }

    best.map(|(track, _)| track)
}

/// Pitches of the selected melody track in their original order, or empty
/// when no track qualifies.
pub fn select_melody(tracks: &[Track]) -> Vec<u8> {
    select_melody_track(tracks)
        .map(Track::pitches)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use melody_midi::{NoteEvent, PERCUSSION_CHANNEL};
    use pretty_assertions::assert_eq;

    fn monophonic(channel: u8, pitches: &[u8]) -> Track {
        let notes = pitches
            .iter()
            .enumerate()
            .map(|(i, &p)| NoteEvent::new(p, i as f64 * 0.5, i as f64 * 0.5 + 0.5))
            .collect();
        Track::new(1, channel, notes)
    }

    /// Block chords: three simultaneous notes per onset.
    fn chords(channel: u8, count: usize) -> Track {
        let mut notes = Vec::new();
        for i in 0..count {
            let start = i as f64;
            for p in [48, 52, 55] {
                notes.push(NoteEvent::new(p, start, start + 1.0));
            }
        }
        Track::new(2, channel, notes)
    }

    const TUNE: [u8; 12] = [60, 62, 64, 65, 67, 69, 71, 72, 71, 69, 67, 65];

    #[test]
    fn melody_beats_chords() {
        let tracks = vec![chords(1, 6), monophonic(0, &TUNE)];
        assert_eq!(select_melody(&tracks), TUNE.to_vec());
    }

    #[test]
    fn score_counts_overlaps_and_variety() {
        // 4 distinct pitches in 12 notes, no overlaps
        let repetitive = monophonic(0, &[60, 62, 64, 65, 60, 62, 64, 65, 60, 62, 64, 65]);
        assert!((melody_score(&repetitive) - 4.0 / 12.0).abs() < 1e-12);

        // 18 notes, 3 distinct, 12 overlaps (two per chord)
        let block = chords(0, 6);
        assert!((melody_score(&block) - (3.0 - 12.0) / 18.0).abs() < 1e-12);
    }

    #[test]
    fn percussion_and_short_tracks_are_skipped() {
        let drums = monophonic(PERCUSSION_CHANNEL, &TUNE);
        let short = monophonic(0, &TUNE[..11]);
        assert_eq!(select_melody(&[drums, short]), Vec::<u8>::new());
    }

    #[test]
    fn first_of_equal_scores_wins() {
        let a = monophonic(0, &TUNE);
        let mut transposed = TUNE;
        for p in &mut transposed {
            *p += 2;
        }
        let b = monophonic(3, &transposed);
        let tracks = [a, b];
        let chosen = select_melody_track(&tracks).unwrap();
        assert_eq!(chosen.channel, 0);
    }

    #[test]
    fn no_tracks_is_empty() {
        assert_eq!(select_melody(&[]), Vec::<u8>::new());
    }
}
