use crate::keys::Key;

/// Move a pitch onto the nearest tone of `key`'s scale.
///
/// In-scale pitches are returned unchanged. Otherwise the scale is scanned in
/// order and the first tone at the smallest circular distance wins, so a
/// pitch class equidistant from two tones moves toward the one listed first.
/// The octave is kept unless the shift would leave 0..=127, in which case
/// the result is folded back by an octave.
pub fn snap_pitch(pitch: u8, key: Key) -> u8 {
    let pitch = pitch.min(127);
    let pc = pitch % 12;
    if key.contains(pc) {
        return pitch;
    }

    let mut best: Option<i8> = None;
    for &target in key.scale() {
        let mut delta = ((target + 12 - pc) % 12) as i8;
        // Move in whichever direction is shorter around the circle
        if delta > 6 {
            delta -= 12;
        }
        if best.map_or(true, |b| delta.abs() < b.abs()) {
            best = Some(delta);
        }
    }

    let shifted = pitch as i16 + best.unwrap_or(0) as i16;
    let folded = if shifted > 127 {
        shifted - 12
    } else if shifted < 0 {
        shifted + 12
    } else {
        shifted
    };
    folded as u8
}

/// Snap every pitch to `key`. Length and order are preserved.
pub fn correct_to_key(pitches: &[u8], key: Key) -> Vec<u8> {
    pitches.iter().map(|&p| snap_pitch(p, key)).collect()
}

/// Snap every pitch to the key named `key_name` (e.g. `"D-minor"`).
pub fn correct(pitches: &[u8], key_name: &str) -> crate::Result<Vec<u8>> {
    let key: Key = key_name.parse()?;
    Ok(correct_to_key(pitches, key))
}

/// True when every pitch already belongs to `key`.
pub fn is_in_key(pitches: &[u8], key: Key) -> bool {
    pitches.iter().all(|&p| key.contains(p % 12))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn in_scale_pitches_pass_through() {
        for key in Key::all() {
            for p in 0..128u8 {
                if key.contains(p % 12) {
                    assert_eq!(snap_pitch(p, key), p);
                }
            }
        }
    }

    #[test]
    fn c_major_scale_is_untouched() {
        let pitches = [60, 62, 64, 65, 67, 69, 71];
        assert_eq!(correct(&pitches, "C-major").unwrap(), pitches.to_vec());
    }

    #[test]
    fn tie_goes_to_first_scale_tone() {
        // C# sits between C and D; C comes first in C major's scale
        assert_eq!(correct(&[61], "C-major").unwrap(), vec![60]);
        // F# sits between F and G; F is scanned first
        assert_eq!(correct(&[66], "C-major").unwrap(), vec![65]);
        // D# in D minor [2,4,5,7,9,10,0]: D (-1) is scanned before E (+1)
        assert_eq!(correct(&[63], "D-minor").unwrap(), vec![62]);
        // G in G# minor [8,10,11,1,3,4,6]: G# (+1) is scanned before F# (-1)
        assert_eq!(correct(&[67], "G#-minor").unwrap(), vec![68]);
    }

    #[test]
    fn octave_is_preserved() {
        assert_eq!(correct(&[37, 49, 73], "C-major").unwrap(), vec![36, 48, 72]);
    }

    #[test]
    fn results_stay_in_midi_range() {
        // 127 is a G; G# minor snaps it upward, past the top of the range
        assert_eq!(snap_pitch(127, Key::minor(8)), 116);
        // 0 is a C; D major snaps it downward to B
        assert_eq!(snap_pitch(0, Key::major(2)), 11);

        for key in Key::all() {
            for p in 0..128u8 {
                let snapped = snap_pitch(p, key);
                assert!(snapped <= 127);
                assert!(key.contains(snapped % 12), "{p} in {key} -> {snapped}");
            }
        }
    }

    #[test]
    fn correction_is_idempotent() {
        let pitches: Vec<u8> = (0..128).collect();
        for key in Key::all() {
            let once = correct_to_key(&pitches, key);
            assert_eq!(correct_to_key(&once, key), once);
            assert_eq!(once.len(), pitches.len());
        }
    }

    #[test]
    fn unknown_key_is_an_error() {
        let err = correct(&[60], "Unknown").unwrap_err();
        assert!(matches!(err, crate::Error::InvalidKey(_)));
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert_eq!(correct(&[], "A-minor").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn in_key_check() {
        assert!(is_in_key(&[57, 59, 60], Key::minor(9)));
        assert!(!is_in_key(&[57, 58], Key::minor(9)));
    }
}
