use midly::{MetaMessage, Smf, Timing, TrackEventKind};
use serde::{Deserialize, Serialize};

/// 120 BPM, the SMF default when a file carries no tempo event.
pub const DEFAULT_MICROSECONDS_PER_BEAT: u32 = 500_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    pub tick: u64,
    pub microseconds_per_beat: u32,
}

impl TempoChange {
    pub fn bpm(&self) -> f64 {
        60_000_000.0 / self.microseconds_per_beat as f64
    }
}

/// Converts between absolute ticks and seconds for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TempoMap {
    /// Pulses per quarter note with a tempo map. Changes are sorted and the
    /// first one is always at tick 0.
    Metrical { ppq: u16, changes: Vec<TempoChange> },
    /// SMPTE division: a fixed number of ticks per second.
    Timecode { ticks_per_second: f64 },
}

impl TempoMap {
    /// Collect tempo events from every track of a parsed file.
    pub fn from_smf(smf: &Smf) -> Self {
        match smf.header.timing {
            Timing::Metrical(ppq) => {
                let mut changes = Vec::new();
                for track in &smf.tracks {
                    let mut tick = 0u64;
                    for event in track {
                        tick += event.delta.as_int() as u64;
                        if let TrackEventKind::Meta(MetaMessage::Tempo(tempo)) = event.kind {
                            changes.push(TempoChange {
                                tick,
                                microseconds_per_beat: tempo.as_int(),
                            });
                        }
                    }
                }
                Self::metrical(ppq.as_int(), changes)
            }
            Timing::Timecode(fps, subframes) => TempoMap::Timecode {
                ticks_per_second: fps.as_f32() as f64 * subframes as f64,
            },
        }
    }

    /// Build a metrical map. Of several changes at one tick the last one
    /// wins, and 120 BPM is assumed until the first change.
    pub fn metrical(ppq: u16, mut changes: Vec<TempoChange>) -> Self {
        changes.sort_by_key(|c| c.tick);
        // Stable sort keeps file order within a tick; dedup keeps the first,
        // so run it back to front
        changes.reverse();
        changes.dedup_by(|a, b| a.tick == b.tick);
        changes.reverse();
        if changes.first().map_or(true, |c| c.tick > 0) {
            changes.insert(
                0,
                TempoChange {
                    tick: 0,
                    microseconds_per_beat: DEFAULT_MICROSECONDS_PER_BEAT,
                },
            );
        }
        TempoMap::Metrical {
            ppq: ppq.max(1),
            changes,
        }
    }

    pub fn ticks_to_seconds(&self, tick: u64) -> f64 {
        match self {
            TempoMap::Timecode { ticks_per_second } => tick as f64 / ticks_per_second,
            TempoMap::Metrical { ppq, changes } => {
                let ppq = *ppq as f64;
                let mut seconds = 0.0;
                for (i, change) in changes.iter().enumerate() {
                    if change.tick >= tick {
                        break;
                    }
                    let segment_end = changes
                        .get(i + 1)
                        .map_or(tick, |next| next.tick.min(tick));
                    let beats = (segment_end - change.tick) as f64 / ppq;
                    seconds += beats * change.microseconds_per_beat as f64 / 1_000_000.0;
                }
                seconds
            }
        }
    }

    /// Inverse of [`ticks_to_seconds`](Self::ticks_to_seconds), rounded to
    /// the nearest tick. Negative times map to tick 0.
    pub fn seconds_to_ticks(&self, seconds: f64) -> u64 {
        if seconds.is_nan() || seconds <= 0.0 {
            return 0;
        }
        match self {
            TempoMap::Timecode { ticks_per_second } => (seconds * ticks_per_second).round() as u64,
            TempoMap::Metrical { ppq, changes } => {
                let ppq = *ppq as f64;
                let mut elapsed = 0.0;
                for (i, change) in changes.iter().enumerate() {
                    let seconds_per_tick = change.microseconds_per_beat as f64 / 1_000_000.0 / ppq;
                    if let Some(next) = changes.get(i + 1) {
                        let segment = (next.tick - change.tick) as f64 * seconds_per_tick;
                        if elapsed + segment > seconds {
                            let ticks = (seconds - elapsed) / seconds_per_tick;
                            return change.tick + ticks.round() as u64;
                        }
                        elapsed += segment;
                    } else {
                        let ticks = (seconds - elapsed) / seconds_per_tick;
                        return change.tick + ticks.round() as u64;
                    }
                }
                0
            }
        }
    }
}
