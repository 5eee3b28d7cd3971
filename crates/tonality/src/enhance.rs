use melody_midi::NoteEvent;
use tracing::{debug, trace};

use crate::chooser::Chooser;
use crate::correct::snap_pitch;
use crate::keys::Key;
use crate::model::IntervalDistribution;

/// Gaps between onsets shorter than this are left alone.
pub const MIN_GAP_SECONDS: f64 = 0.35;

/// A filled gap is split into one of these many equal steps.
pub const DIVISION_CHOICES: [usize; 3] = [2, 3, 4];

/// Intervals drawn uniformly when no trained distribution is available.
pub const FALLBACK_INTERVALS: [i8; 4] = [-2, -1, 1, 2];

/// Inserted notes sound for this share of their step.
pub const NOTE_LENGTH_RATIO: f64 = 0.8;

/// Draw one interval from `distribution`, or from [`FALLBACK_INTERVALS`]
/// when there is no usable distribution.
pub fn sample_interval<C: Chooser + ?Sized>(
    distribution: Option<&IntervalDistribution>,
    chooser: &mut C,
) -> i8 {
    if let Some(interval) = distribution.and_then(|dist| dist.sample(&mut *chooser)) {
        return interval;
    }
    FALLBACK_INTERVALS[chooser.index(FALLBACK_INTERVALS.len())]
}

/// Embellish `melody` by filling gaps between consecutive notes.
///
/// `melody` should be sorted by start. Every original note is kept. For each
/// adjacent pair a roll at or under `insert_prob` with an onset gap of at
/// least [`MIN_GAP_SECONDS`] inserts a short run of notes that steps from the
/// first pitch toward the second, each snapped to `key`. The result is
/// stable-sorted by start, so originals keep their relative order.
pub fn enhance<C: Chooser + ?Sized>(
    melody: &[NoteEvent],
    key: Key,
    distribution: Option<&IntervalDistribution>,
    insert_prob: f64,
    chooser: &mut C,
) -> Vec<NoteEvent> {
    let mut enhanced = Vec::with_capacity(melody.len() * 2);
    let mut inserted = 0usize;

    for (i, &current) in melody.iter().enumerate() {
        enhanced.push(current);

        let Some(&next) = melody.get(i + 1) else {
            break;
        };

        // NaN never passes the roll
        if insert_prob.is_nan() || chooser.unit() > insert_prob {
            continue;
        }

        let gap = next.start - current.start;
        if gap < MIN_GAP_SECONDS {
            trace!(index = i, gap, "gap too short to fill");
            continue;
        }

        let divisions = DIVISION_CHOICES[chooser.index(DIVISION_CHOICES.len())];
        let step = gap / divisions as f64;
        let direction: i16 = if next.pitch > current.pitch { 1 } else { -1 };

        let mut running_pitch = current.pitch;
        for d in 1..divisions {
            let interval = sample_interval(distribution, chooser);
            let signed = (interval as i16).abs() * direction;
            let raw = (running_pitch as i16 + signed).clamp(0, 127) as u8;
            let pitch = snap_pitch(raw, key);

            let start = current.end + step * d as f64;
            let end = start + step * NOTE_LENGTH_RATIO;
            enhanced.push(NoteEvent::new(pitch, start, end));
            inserted += 1;

            running_pitch = pitch;
        }
        debug!(index = i, divisions, gap, "filled gap");
    }

    enhanced.sort_by(|a, b| a.start.total_cmp(&b.start));
    debug!(
        original = melody.len(),
        inserted,
        key = %key,
        "enhanced melody"
    );
    enhanced
}
