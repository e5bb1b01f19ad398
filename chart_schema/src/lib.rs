use serde::{Deserialize, Serialize};

mod lyrics;
mod note;
mod song;
mod sync;
mod track;

pub use lyrics::{LyricEvent, LyricSymbolFlags, LyricsPhrase, LyricsTrack};
pub use note::{DrumPad, FiveFretGuitarFret, Note, NoteFlags, SixFretGuitarFret};
pub use song::{SongChart, SongEntry};
pub use sync::{SyncTrack, Tempo, TimeSignature, DEFAULT_BPM, DEFAULT_RESOLUTION};
pub use track::{ChordSpan, InstrumentDifficulty, InstrumentTrack, Phrase, PhraseType};

/// Pulse position inside a chart. Resolution dependent.
pub type Tick = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
    ExpertPlus,
}

impl Difficulty {
    pub const AUTHORED: [Difficulty; 4] = [
        Difficulty::Easy,
        Difficulty::Medium,
        Difficulty::Hard,
        Difficulty::Expert,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Instrument {
    FiveFretGuitar,
    FiveFretCoopGuitar,
    FiveFretRhythm,
    FiveFretBass,
    Keys,
    SixFretGuitar,
    SixFretCoopGuitar,
    SixFretRhythm,
    SixFretBass,
    Drums,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    FiveFretGuitar,
    SixFretGuitar,
    Drums,
}

impl Instrument {
    pub fn game_mode(self) -> GameMode {
        match self {
            Instrument::FiveFretGuitar
            | Instrument::FiveFretCoopGuitar
            | Instrument::FiveFretRhythm
            | Instrument::FiveFretBass
            | Instrument::Keys => GameMode::FiveFretGuitar,
            Instrument::SixFretGuitar
            | Instrument::SixFretCoopGuitar
            | Instrument::SixFretRhythm
            | Instrument::SixFretBass => GameMode::SixFretGuitar,
            Instrument::Drums => GameMode::Drums,
        }
    }

    pub fn is_bass(self) -> bool {
        matches!(self, Instrument::FiveFretBass | Instrument::SixFretBass)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEvent {
    pub text: String,
    pub tick: Tick,
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub tick: Tick,
    pub time: f64,
    pub tick_length: Tick,
    pub time_length: f64,
}
