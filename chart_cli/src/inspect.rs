use chart_schema::{Difficulty, Instrument, InstrumentDifficulty, InstrumentTrack, NoteFlags, SongChart};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SongSummary {
    pub resolution: u32,
    pub tempo_changes: usize,
    pub time_signatures: usize,
    pub length_seconds: f64,
    pub sections: Vec<String>,
    pub lyric_phrases: usize,
    pub instruments: Vec<Instrument>,
    pub tracks: Vec<TrackSummary>,
}

#[derive(Debug, Serialize)]
pub struct TrackSummary {
    pub instrument: Instrument,
    pub difficulty: Difficulty,
    pub notes: usize,
    pub chords: usize,
    pub hopos: usize,
    pub taps: usize,
    pub star_power_phrases: usize,
    pub solos: usize,
}

pub fn summarize(song: &SongChart) -> SongSummary {
    let mut tracks = Vec::new();
    collect(&song.five_fret, &mut tracks);
    collect(&song.six_fret, &mut tracks);
    collect(&song.drums, &mut tracks);

    SongSummary {
        resolution: song.sync.resolution,
        tempo_changes: song.sync.tempos.len(),
        time_signatures: song.sync.time_signatures.len(),
        length_seconds: song.last_note_time(),
        sections: song.sections.iter().map(|s| s.name.clone()).collect(),
        lyric_phrases: song.lyrics.phrases.len(),
        instruments: song.instruments(),
        tracks,
    }
}

fn collect<'a, L: 'a>(
    tracks: impl IntoIterator<Item = (&'a Instrument, &'a InstrumentTrack<L>)>,
    out: &mut Vec<TrackSummary>,
) {
    for (&instrument, track) in tracks {
        for chart in track.difficulties.values() {
            out.push(summarize_difficulty(instrument, chart));
        }
    }
}

fn summarize_difficulty<L>(instrument: Instrument, chart: &InstrumentDifficulty<L>) -> TrackSummary {
    let count_chords = |flag: NoteFlags| (0..chart.chord_count()).filter(|&c| chart.chord_flags(c).contains(flag)).count();

    TrackSummary {
        instrument,
        difficulty: chart.difficulty,
        notes: chart.notes.len(),
        chords: chart.chord_count(),
        hopos: count_chords(NoteFlags::HOPO),
        taps: count_chords(NoteFlags::TAP),
        star_power_phrases: count_chords(NoteFlags::STAR_POWER_END),
        solos: count_chords(NoteFlags::SOLO_START),
    }
}
