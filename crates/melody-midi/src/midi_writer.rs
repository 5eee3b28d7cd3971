use crate::note::Track;
use crate::tempo::TempoMap;
use midly::num::{u28, u4, u7};
use midly::{MetaMessage, MidiMessage, Smf, TrackEvent, TrackEventKind};
use tracing::debug;

/// Largest delta a variable-length quantity can hold.
const MAX_DELTA: u64 = 0x0FFF_FFFF;

/// Rewrite a template file with new notes for some of its tracks.
///
/// Each supplied [`Track`] names a `(track_index, channel)` of the template.
/// The note events of that channel are replaced by the track's notes, with
/// seconds converted back to ticks through the template's tempo map. Every
/// other event (tempo, program changes, names, other channels) is kept.
pub fn rewrite(template: &[u8], replacements: &[Track]) -> crate::Result<Vec<u8>> {
    let smf = Smf::parse(template).map_err(|e| crate::Error::MidiParse(e.to_string()))?;
    let tempo = TempoMap::from_smf(&smf);

    if let Some(missing) = replacements
        .iter()
        .find(|t| t.track_index >= smf.tracks.len())
    {
        return Err(crate::Error::TrackOutOfRange {
            track_index: missing.track_index,
            track_count: smf.tracks.len(),
        });
    }

    let tracks: Vec<Vec<TrackEvent>> = smf
        .tracks
        .iter()
        .enumerate()
        .map(|(track_index, events)| {
            let replaced: Vec<&Track> = replacements
                .iter()
                .filter(|t| t.track_index == track_index)
                .collect();
            if replaced.is_empty() {
                events.clone()
            } else {
                debug!(track_index, channels = replaced.len(), "rewriting track");
                rebuild_track(events, &replaced, &tempo)
            }
        })
        .collect();

    let output = Smf {
        header: smf.header,
        tracks,
    };
    let mut buf = Vec::new();
    output
        .write_std(&mut buf)
        .map_err(|e| crate::Error::MidiWrite(e.to_string()))?;
    Ok(buf)
}

/// Ordering of events that share a tick: note-offs, then everything else,
/// then note-ons.
fn event_rank(kind: &TrackEventKind) -> u8 {
    match kind {
        TrackEventKind::Midi {
            message: MidiMessage::NoteOff { .. },
            ..
        } => 0,
        TrackEventKind::Midi {
            message: MidiMessage::NoteOn { vel, .. },
            ..
        } => {
            if vel.as_int() == 0 {
                0
            } else {
                2
            }
        }
        _ => 1,
    }
}

fn is_note_on_channel(kind: &TrackEventKind, channels: &[u8]) -> bool {
    match kind {
        TrackEventKind::Midi { channel, message } => {
            matches!(
                message,
                MidiMessage::NoteOn { .. } | MidiMessage::NoteOff { .. }
            ) && channels.contains(&channel.as_int())
        }
        _ => false,
    }
}

fn rebuild_track<'a>(
    events: &[TrackEvent<'a>],
    replaced: &[&Track],
    tempo: &TempoMap,
) -> Vec<TrackEvent<'a>> {
    let channels: Vec<u8> = replaced.iter().map(|t| t.channel).collect();
    let mut timed: Vec<(u64, TrackEventKind<'a>)> = Vec::new();
    let mut tick = 0u64;

    for event in events {
        tick += event.delta.as_int() as u64;
        if is_note_on_channel(&event.kind, &channels)
            || matches!(event.kind, TrackEventKind::Meta(MetaMessage::EndOfTrack))
        {
            continue;
        }
        timed.push((tick, event.kind));
    }
    let mut last_tick = tick;

    for track in replaced {
        let channel = u4::new(track.channel);
        for note in &track.notes {
            let key = u7::new(note.pitch.min(127));
            let onset = tempo.seconds_to_ticks(note.start);
            // Zero-length notes would pair their own note-off first
            let offset = tempo.seconds_to_ticks(note.end).max(onset + 1);
            timed.push((
                onset,
                TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOn {
                        key,
                        vel: u7::new(note.velocity.clamp(1, 127)),
                    },
                },
            ));
            timed.push((
                offset,
                TrackEventKind::Midi {
                    channel,
                    message: MidiMessage::NoteOff {
                        key,
                        vel: u7::new(0),
                    },
                },
            ));
            last_tick = last_tick.max(offset);
        }
    }

    // Stable, so kept events stay in their original order
    timed.sort_by_key(|(tick, kind)| (*tick, event_rank(kind)));
    timed.push((last_tick, TrackEventKind::Meta(MetaMessage::EndOfTrack)));

    let mut previous = 0u64;
    timed
        .into_iter()
        .map(|(tick, kind)| {
            let delta = (tick - previous).min(MAX_DELTA);
            previous = tick;
            TrackEvent {
                delta: u28::new(delta as u32),
                kind,
            }
        })
        .collect()
}
