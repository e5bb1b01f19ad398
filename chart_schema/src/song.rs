use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    DrumPad, FiveFretGuitarFret, Instrument, InstrumentTrack, LyricsTrack, Section,
    SixFretGuitarFret, SyncTrack, TextEvent,
};

/// Fully normalized song, ready for play.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SongChart {
    pub sync: SyncTrack,
    pub sections: Vec<Section>,
    pub global_events: Vec<TextEvent>,
    #[serde(default)]
    pub venue_events: Vec<TextEvent>,
    pub lyrics: LyricsTrack,
    pub five_fret: BTreeMap<Instrument, InstrumentTrack<FiveFretGuitarFret>>,
    pub six_fret: BTreeMap<Instrument, InstrumentTrack<SixFretGuitarFret>>,
    pub drums: BTreeMap<Instrument, InstrumentTrack<DrumPad>>,
}

impl SongChart {
    pub fn instruments(&self) -> Vec<Instrument> {
        let mut out: Vec<Instrument> = self
            .five_fret
            .keys()
            .chain(self.six_fret.keys())
            .chain(self.drums.keys())
            .copied()
            .collect();
        out.sort();
        out
    }

    /// Seconds of the last note end across every track.
    pub fn last_note_time(&self) -> f64 {
        fn last<L>(tracks: &BTreeMap<Instrument, InstrumentTrack<L>>) -> f64 {
            tracks
                .values()
                .flat_map(|t| t.difficulties.values())
                .flat_map(|d| d.notes.iter())
                .map(|n| n.time_end())
                .fold(0.0, f64::max)
        }
        last(&self.five_fret)
            .max(last(&self.six_fret))
            .max(last(&self.drums))
    }
}

/// Scanned library entry pointing at a notes file on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongEntry {
    pub directory: PathBuf,
    pub notes_file: String,
}

impl SongEntry {
    pub fn notes_path(&self) -> PathBuf {
        self.directory.join(&self.notes_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_resolves_notes_path() {
        let entry = SongEntry {
            directory: PathBuf::from("songs/artist - title"),
            notes_file: "notes.chart".to_string(),
        };
        assert_eq!(
            entry.notes_path(),
            PathBuf::from("songs/artist - title").join("notes.chart")
        );
    }

    #[test]
    fn empty_song_round_trips_through_json() {
        let song = SongChart::default();
        let json = serde_json::to_string(&song).unwrap();
        let back: SongChart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, song);
        assert_eq!(back.last_note_time(), 0.0);
    }
}
