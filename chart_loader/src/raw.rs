use std::collections::BTreeMap;

use chart_schema::{Difficulty, Instrument, PhraseType, SyncTrack, Tick};

use crate::flags::RawNoteFlags;

/// Note in the shared lane vocabulary.
///
/// Five fret lanes: 0 open, 1..=5 green..orange.
/// Six fret lanes: 0 open, 1..=3 black, 4..=6 white.
/// Drum lanes: 0 kick, 1..=5 red, yellow, blue, orange, green.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawNote {
    pub tick: Tick,
    pub lane: u8,
    pub length: Tick,
    pub flags: RawNoteFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPhrase {
    pub kind: PhraseType,
    pub tick: Tick,
    pub length: Tick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawText {
    pub tick: Tick,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawChart {
    pub notes: Vec<RawNote>,
    pub phrases: Vec<RawPhrase>,
    pub events: Vec<RawText>,
}

impl RawChart {
    /// Inserts in (tick, lane) order. A note on an occupied tick and lane replaces the old one.
    pub fn push_note(&mut self, note: RawNote) {
        let key = (note.tick, note.lane);
        match self.notes.binary_search_by_key(&key, |n| (n.tick, n.lane)) {
            Ok(idx) => {
                log::debug!("duplicate note at tick {} lane {}, replacing", note.tick, note.lane);
                self.notes[idx] = note;
            }
            Err(idx) => self.notes.insert(idx, note),
        }
    }

    pub fn push_phrase(&mut self, phrase: RawPhrase) {
        let idx = self
            .phrases
            .partition_point(|p| (p.tick, p.kind) <= (phrase.tick, phrase.kind));
        if idx > 0 && self.phrases[idx - 1].tick == phrase.tick && self.phrases[idx - 1].kind == phrase.kind {
            self.phrases[idx - 1] = phrase;
            return;
        }
        self.phrases.insert(idx, phrase);
    }

    /// Ors `flag` into every note on `tick`, optionally only the one on `lane`.
    pub fn flag_notes(&mut self, tick: Tick, lane: Option<u8>, flag: RawNoteFlags) -> bool {
        let start = self.notes.partition_point(|n| n.tick < tick);
        let mut found = false;
        for note in self.notes[start..].iter_mut().take_while(|n| n.tick == tick) {
            if lane.map_or(true, |l| l == note.lane) {
                note.flags |= flag;
                found = true;
            }
        }
        found
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn last_tick(&self) -> Tick {
        self.notes.iter().map(|n| n.tick.saturating_add(n.length)).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTempo {
    pub tick: Tick,
    pub bpm: f64,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTimeSignature {
    pub tick: Tick,
    pub numerator: u32,
    pub denominator: u32,
    pub line: usize,
}

/// Format independent output of a source reader.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSong {
    pub resolution: u32,
    pub hopo_threshold: Tick,
    pub sustain_cutoff: Tick,
    pub sync: SyncTrack,
    pub events: Vec<RawText>,
    pub venue: Vec<RawText>,
    pub charts: BTreeMap<(Instrument, Difficulty), RawChart>,
}

impl RawSong {
    pub fn chart_mut(&mut self, instrument: Instrument, difficulty: Difficulty) -> &mut RawChart {
        self.charts.entry((instrument, difficulty)).or_default()
    }

    pub fn last_tick(&self) -> Tick {
        let notes = self.charts.values().map(RawChart::last_tick).max().unwrap_or(0);
        let events = self.events.iter().map(|e| e.tick).max().unwrap_or(0);
        notes.max(events)
    }
}
