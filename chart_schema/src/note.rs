use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use serde::{Deserialize, Serialize};

use crate::Tick;

/// Note flag bitset shared by every instrument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteFlags(u32);

impl NoteFlags {
    pub const NONE: NoteFlags = NoteFlags(0);
    pub const HOPO: NoteFlags = NoteFlags(1 << 0);
    pub const TAP: NoteFlags = NoteFlags(1 << 1);
    pub const CHORD: NoteFlags = NoteFlags(1 << 2);
    pub const STAR_POWER: NoteFlags = NoteFlags(1 << 3);
    pub const STAR_POWER_START: NoteFlags = NoteFlags(1 << 4);
    pub const STAR_POWER_END: NoteFlags = NoteFlags(1 << 5);
    pub const STAR_POWER_ACTIVATOR: NoteFlags = NoteFlags(1 << 6);
    pub const SOLO: NoteFlags = NoteFlags(1 << 7);
    pub const SOLO_START: NoteFlags = NoteFlags(1 << 8);
    pub const SOLO_END: NoteFlags = NoteFlags(1 << 9);
    pub const EXTENDED_SUSTAIN: NoteFlags = NoteFlags(1 << 10);
    pub const DISJOINT: NoteFlags = NoteFlags(1 << 11);
    pub const CYMBAL: NoteFlags = NoteFlags(1 << 12);
    pub const GHOST: NoteFlags = NoteFlags(1 << 13);
    pub const ACCENT: NoteFlags = NoteFlags(1 << 14);
    pub const DOUBLE_KICK: NoteFlags = NoteFlags(1 << 15);
    /// HOPO that came from the threshold rule rather than a forcing marker.
    pub const AUTO_HOPO: NoteFlags = NoteFlags(1 << 16);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(bits: u32) -> Self {
        NoteFlags(bits)
    }

    pub const fn contains(self, other: NoteFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: NoteFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: NoteFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: NoteFlags) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: NoteFlags, on: bool) {
        if on {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl BitOr for NoteFlags {
    type Output = NoteFlags;

    fn bitor(self, rhs: NoteFlags) -> NoteFlags {
        NoteFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for NoteFlags {
    fn bitor_assign(&mut self, rhs: NoteFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for NoteFlags {
    type Output = NoteFlags;

    fn bitand(self, rhs: NoteFlags) -> NoteFlags {
        NoteFlags(self.0 & rhs.0)
    }
}

impl Not for NoteFlags {
    type Output = NoteFlags;

    fn not(self) -> NoteFlags {
        NoteFlags(!self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FiveFretGuitarFret {
    Open,
    Green,
    Red,
    Yellow,
    Blue,
    Orange,
}

impl FiveFretGuitarFret {
    pub const FRETS: [FiveFretGuitarFret; 5] = [
        FiveFretGuitarFret::Green,
        FiveFretGuitarFret::Red,
        FiveFretGuitarFret::Yellow,
        FiveFretGuitarFret::Blue,
        FiveFretGuitarFret::Orange,
    ];

    /// Bit of this fret in a five bit G..O mask. Open has no bit.
    pub fn mask(self) -> u8 {
        match self {
            FiveFretGuitarFret::Open => 0,
            FiveFretGuitarFret::Green => 1 << 0,
            FiveFretGuitarFret::Red => 1 << 1,
            FiveFretGuitarFret::Yellow => 1 << 2,
            FiveFretGuitarFret::Blue => 1 << 3,
            FiveFretGuitarFret::Orange => 1 << 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SixFretGuitarFret {
    Open,
    Black1,
    Black2,
    Black3,
    White1,
    White2,
    White3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DrumPad {
    Kick,
    Red,
    Yellow,
    Blue,
    Orange,
    Green,
}

impl DrumPad {
    pub fn can_be_cymbal(self) -> bool {
        matches!(self, DrumPad::Yellow | DrumPad::Blue | DrumPad::Orange)
    }
}

/// One playable target.
///
/// `chord` is the index of the owning chord in the difficulty's chord list.
/// `was_hit` and `was_missed` are runtime state written by the judgment
/// engine on its own copy of the notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note<L> {
    pub lane: L,
    pub tick: Tick,
    pub time: f64,
    pub tick_length: Tick,
    pub time_length: f64,
    pub flags: NoteFlags,
    pub chord: usize,
    #[serde(skip)]
    pub was_hit: bool,
    #[serde(skip)]
    pub was_missed: bool,
}

impl<L> Note<L> {
    pub fn new(lane: L, tick: Tick, time: f64) -> Self {
        Self {
            lane,
            tick,
            time,
            tick_length: 0,
            time_length: 0.0,
            flags: NoteFlags::NONE,
            chord: 0,
            was_hit: false,
            was_missed: false,
        }
    }

    pub fn tick_end(&self) -> Tick {
        self.tick.saturating_add(self.tick_length)
    }

    pub fn time_end(&self) -> f64 {
        self.time + self.time_length
    }

    pub fn is_sustain(&self) -> bool {
        self.tick_length > 0
    }

    pub fn is_chord(&self) -> bool {
        self.flags.contains(NoteFlags::CHORD)
    }

    pub fn is_hopo(&self) -> bool {
        self.flags.contains(NoteFlags::HOPO)
    }

    pub fn is_tap(&self) -> bool {
        self.flags.contains(NoteFlags::TAP)
    }

    pub fn is_star_power(&self) -> bool {
        self.flags.contains(NoteFlags::STAR_POWER)
    }

    pub fn is_solo_start(&self) -> bool {
        self.flags.contains(NoteFlags::SOLO_START)
    }

    pub fn is_solo_end(&self) -> bool {
        self.flags.contains(NoteFlags::SOLO_END)
    }
}
