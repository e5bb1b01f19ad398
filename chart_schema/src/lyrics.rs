use serde::{Deserialize, Serialize};

use crate::Tick;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LyricSymbolFlags(u16);

impl LyricSymbolFlags {
    pub const NONE: LyricSymbolFlags = LyricSymbolFlags(0);
    pub const JOIN_WITH_NEXT: LyricSymbolFlags = LyricSymbolFlags(1 << 0);
    pub const NON_PITCHED: LyricSymbolFlags = LyricSymbolFlags(1 << 1);
    pub const LENIENT_SCORING: LyricSymbolFlags = LyricSymbolFlags(1 << 2);
    pub const PITCH_SLIDE: LyricSymbolFlags = LyricSymbolFlags(1 << 4);
    pub const HARMONY_HIDDEN: LyricSymbolFlags = LyricSymbolFlags(1 << 5);
    pub const STATIC_SHIFT: LyricSymbolFlags = LyricSymbolFlags(1 << 6);
    pub const RANGE_SHIFT: LyricSymbolFlags = LyricSymbolFlags(1 << 7);

    pub const fn contains(self, other: LyricSymbolFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: LyricSymbolFlags) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for LyricSymbolFlags {
    type Output = LyricSymbolFlags;

    fn bitor(self, rhs: LyricSymbolFlags) -> LyricSymbolFlags {
        LyricSymbolFlags(self.0 | rhs.0)
    }
}

/// One displayed lyric fragment with its own timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricEvent {
    pub flags: LyricSymbolFlags,
    pub text: String,
    pub tick: Tick,
    pub time: f64,
}

impl LyricEvent {
    pub fn joins_with_next(&self) -> bool {
        self.flags.contains(LyricSymbolFlags::JOIN_WITH_NEXT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricsPhrase {
    pub tick: Tick,
    pub tick_length: Tick,
    pub time: f64,
    pub time_length: f64,
    pub lyrics: Vec<LyricEvent>,
}

impl LyricsPhrase {
    pub fn tick_end(&self) -> Tick {
        self.tick.saturating_add(self.tick_length)
    }

    /// Phrase text as displayed: fragments are separated by a space unless joined.
    pub fn display_text(&self) -> String {
        let mut out = String::new();
        for (i, lyric) in self.lyrics.iter().enumerate() {
            out.push_str(&lyric.text);
            if !lyric.joins_with_next() && i + 1 < self.lyrics.len() {
                out.push(' ');
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LyricsTrack {
    pub phrases: Vec<LyricsPhrase>,
}

impl LyricsTrack {
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}
