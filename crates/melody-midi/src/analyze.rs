use crate::note::{sort_by_start, NoteEvent, Track, PERCUSSION_CHANNEL};
use crate::tempo::TempoMap;
use midly::{MetaMessage, MidiMessage, Smf, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::debug;

/// A parsed MIDI file: playable tracks plus the tempo map that produced
/// their timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidiSong {
    pub format: u8,
    pub tempo: TempoMap,
    /// Sorted by `(track_index, channel)`
    pub tracks: Vec<Track>,
}

impl MidiSong {
    /// Parse Standard MIDI File bytes.
    pub fn parse(midi_bytes: &[u8]) -> crate::Result<Self> {
        let smf = Smf::parse(midi_bytes).map_err(|e| crate::Error::MidiParse(e.to_string()))?;
        Ok(Self::from_smf(&smf))
    }

    /// Read and parse a file from disk.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let bytes = std::fs::read(path).map_err(|source| crate::Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let song = Self::parse(&bytes)?;
        debug!(
            path = %path.display(),
            tracks = song.tracks.len(),
            "loaded MIDI file"
        );
        Ok(song)
    }

    pub fn from_smf(smf: &Smf) -> Self {
        let format = match smf.header.format {
            midly::Format::SingleTrack => 0,
            midly::Format::Parallel => 1,
            midly::Format::Sequential => 2,
        };
        let tempo = TempoMap::from_smf(smf);
        let tracks = extract_tracks(smf, &tempo);

        Self {
            format,
            tempo,
            tracks,
        }
    }

    pub fn melodic_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter().filter(|t| !t.is_percussion)
    }

    /// Pitch of every non-percussion note, track by track.
    pub fn melodic_pitches(&self) -> Vec<u8> {
        self.melodic_tracks()
            .flat_map(|t| t.notes.iter().map(|n| n.pitch))
            .collect()
    }

    /// Every non-percussion note merged into one line, stable-sorted by start.
    pub fn melodic_notes(&self) -> Vec<NoteEvent> {
        let mut notes: Vec<NoteEvent> = self
            .melodic_tracks()
            .flat_map(|t| t.notes.iter().copied())
            .collect();
        notes.sort_by(|a, b| a.start.total_cmp(&b.start));
        notes
    }

    /// The first non-percussion track that carries notes.
    pub fn first_melodic_track(&self) -> Option<&Track> {
        self.melodic_tracks().find(|t| !t.notes.is_empty())
    }

    pub fn note_count(&self) -> usize {
        self.tracks.iter().map(Track::note_count).sum()
    }
}

#[derive(Default)]
struct ChannelState {
    program: Option<u8>,
    /// pitch → stack of (onset tick, velocity)
    pending: HashMap<u8, Vec<(u64, u8)>>,
    notes: Vec<(u64, u64, u8, u8)>,
}

/// Pair note-on/note-off events into timed notes, one `Track` per channel
/// used in each `MTrk` chunk.
pub fn extract_tracks(smf: &Smf, tempo: &TempoMap) -> Vec<Track> {
    let mut tracks = Vec::new();

    for (track_index, track) in smf.tracks.iter().enumerate() {
        let mut current_tick: u64 = 0;
        let mut track_name: Option<String> = None;
        let mut channels: BTreeMap<u8, ChannelState> = BTreeMap::new();

        for event in track {
            current_tick += event.delta.as_int() as u64;

            match event.kind {
                TrackEventKind::Meta(MetaMessage::TrackName(bytes)) => {
                    track_name = String::from_utf8(bytes.to_vec()).ok();
                }
                TrackEventKind::Midi { channel, message } => {
                    let state = channels.entry(channel.as_int()).or_default();
                    match message {
                        MidiMessage::ProgramChange { program } => {
                            state.program.get_or_insert(program.as_int());
                        }
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            state
                                .pending
                                .entry(key.as_int())
                                .or_default()
                                .push((current_tick, vel.as_int()));
                        }
                        MidiMessage::NoteOff { key, .. } | MidiMessage::NoteOn { key, .. } => {
                            // vel=0 NoteOn is NoteOff
                            let pitch = key.as_int();
                            if let Some((onset, velocity)) =
                                state.pending.get_mut(&pitch).and_then(|stack| stack.pop())
                            {
                                state.notes.push((onset, current_tick, pitch, velocity));
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        for (channel, mut state) in channels {
            // Close any unclosed notes at the track's final tick
            for (pitch, stack) in state.pending.drain() {
                for (onset, velocity) in stack {
                    state.notes.push((onset, current_tick, pitch, velocity));
                }
            }
            if state.notes.is_empty() {
                continue;
            }

            let mut notes: Vec<NoteEvent> = state
                .notes
                .iter()
                .map(|&(onset, offset, pitch, velocity)| NoteEvent {
                    pitch,
                    start: tempo.ticks_to_seconds(onset),
                    end: tempo.ticks_to_seconds(offset),
                    velocity,
                })
                .collect();
            sort_by_start(&mut notes);

            tracks.push(Track {
                track_index,
                channel,
                name: track_name.clone(),
                program: state.program,
                is_percussion: channel == PERCUSSION_CHANNEL,
                notes,
            });
        }
    }

    tracks
}
