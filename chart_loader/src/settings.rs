use chart_schema::Tick;
use serde::{Deserialize, Serialize};

pub const DEFAULT_STAR_POWER_NOTE: u8 = 116;

/// Per-song parse options, usually read from the song's ini by the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseSettings {
    /// Max tick distance for a natural HOPO. `None` uses the format default.
    pub hopo_threshold: Option<Tick>,
    /// Sustains shorter than this are dropped. `None` uses the format default.
    pub sustain_cutoff_threshold: Option<Tick>,
    /// Notes this close to a chord are snapped into it.
    pub note_snap_threshold: Tick,
    pub chord_hopo_cancellation: bool,
    pub star_power_note: u8,
    pub generate_missing_difficulties: bool,
}

impl Default for ParseSettings {
    fn default() -> Self {
        Self {
            hopo_threshold: None,
            sustain_cutoff_threshold: None,
            note_snap_threshold: 0,
            chord_hopo_cancellation: true,
            star_power_note: DEFAULT_STAR_POWER_NOTE,
            generate_missing_difficulties: true,
        }
    }
}

impl ParseSettings {
    pub(crate) fn chart_hopo_threshold(&self, resolution: u32) -> Tick {
        self.hopo_threshold
            .unwrap_or((u64::from(resolution) * 65 / 192) as Tick)
    }

    pub(crate) fn midi_hopo_threshold(&self, resolution: u32) -> Tick {
        self.hopo_threshold.unwrap_or(resolution / 3 + 1)
    }

    pub(crate) fn chart_sustain_cutoff(&self) -> Tick {
        self.sustain_cutoff_threshold.unwrap_or(0)
    }

    pub(crate) fn midi_sustain_cutoff(&self, resolution: u32) -> Tick {
        self.sustain_cutoff_threshold.unwrap_or(resolution / 3 + 1)
    }
}
