use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::{Difficulty, Instrument, Note, NoteFlags, TextEvent, Tick};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PhraseType {
    StarPower,
    Solo,
    DrumFill,
    VersusPlayer1,
    VersusPlayer2,
    TremoloLane,
    TrillLane,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub kind: PhraseType,
    pub tick: Tick,
    pub tick_length: Tick,
    pub time: f64,
    pub time_length: f64,
}

impl Phrase {
    pub fn tick_end(&self) -> Tick {
        self.tick.saturating_add(self.tick_length)
    }

    /// A phrase always contains its own tick, even when zero length or clamped at `Tick::MAX`.
    pub fn contains_tick(&self, tick: Tick) -> bool {
        tick == self.tick || (self.tick < tick && tick < self.tick_end())
    }
}

/// Contiguous run of notes in the note arena. The first note is the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordSpan {
    pub start: usize,
    pub len: usize,
}

impl ChordSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentDifficulty<L> {
    pub difficulty: Difficulty,
    pub notes: Vec<Note<L>>,
    pub chords: Vec<ChordSpan>,
    pub phrases: Vec<Phrase>,
    pub text_events: Vec<TextEvent>,
}

impl<L> InstrumentDifficulty<L> {
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            notes: Vec::new(),
            chords: Vec::new(),
            phrases: Vec::new(),
            text_events: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn chord_count(&self) -> usize {
        self.chords.len()
    }

    /// Appends `note` as the parent of a new chord.
    pub fn start_chord(&mut self, mut note: Note<L>) -> usize {
        let chord = self.chords.len();
        note.chord = chord;
        self.chords.push(ChordSpan {
            start: self.notes.len(),
            len: 1,
        });
        self.notes.push(note);
        chord
    }

    /// Appends `note` as a child of the last chord. Starts a chord when there is none.
    pub fn add_to_last_chord(&mut self, mut note: Note<L>) -> usize {
        let Some(chord) = self.chords.len().checked_sub(1) else {
            return self.start_chord(note);
        };
        note.chord = chord;
        self.notes.push(note);
        self.chords[chord].len += 1;
        chord
    }

    pub fn chord_notes(&self, chord: usize) -> &[Note<L>] {
        &self.notes[self.chords[chord].range()]
    }

    pub fn chord_notes_mut(&mut self, chord: usize) -> &mut [Note<L>] {
        let range = self.chords[chord].range();
        &mut self.notes[range]
    }

    pub fn parent(&self, chord: usize) -> &Note<L> {
        &self.notes[self.chords[chord].start]
    }

    pub fn previous_chord(&self, chord: usize) -> Option<usize> {
        chord.checked_sub(1)
    }

    pub fn next_chord(&self, chord: usize) -> Option<usize> {
        (chord + 1 < self.chords.len()).then_some(chord + 1)
    }

    pub fn phrases_of(&self, kind: PhraseType) -> impl Iterator<Item = &Phrase> + '_ {
        self.phrases.iter().filter(move |p| p.kind == kind)
    }

    /// Union of the flags of every note in the chord.
    pub fn chord_flags(&self, chord: usize) -> NoteFlags {
        self.chord_notes(chord)
            .iter()
            .fold(NoteFlags::NONE, |acc, n| acc | n.flags)
    }

    /// Longest sustain end inside the chord.
    pub fn chord_tick_end(&self, chord: usize) -> Tick {
        self.chord_notes(chord)
            .iter()
            .map(Note::tick_end)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentTrack<L> {
    pub instrument: Instrument,
    pub difficulties: BTreeMap<Difficulty, InstrumentDifficulty<L>>,
}

impl<L> InstrumentTrack<L> {
    pub fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            difficulties: BTreeMap::new(),
        }
    }

    pub fn get(&self, difficulty: Difficulty) -> Option<&InstrumentDifficulty<L>> {
        self.difficulties.get(&difficulty)
    }

    pub fn insert(&mut self, chart: InstrumentDifficulty<L>) {
        self.difficulties.insert(chart.difficulty, chart);
    }

    pub fn is_empty(&self) -> bool {
        self.difficulties.values().all(InstrumentDifficulty::is_empty)
    }
}
