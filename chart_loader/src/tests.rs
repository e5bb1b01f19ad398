use super::*;
use chart_schema::{Difficulty, FiveFretGuitarFret, Instrument, NoteFlags};
use pretty_assertions::assert_eq;
use std::{
    fs,
    ops::Deref,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

const HEADER: &str = "[Song]\n{\n  Resolution = 192\n}\n[SyncTrack]\n{\n  0 = TS 4\n  0 = B 120000\n}\n";

fn load_chart(body: &str) -> SongChart {
    load_song(ChartSource::Chart(&format!("{HEADER}{body}")), &ParseSettings::default()).unwrap()
}

/// Scratch directory removed again when the test ends.
struct TmpDir(PathBuf);

impl TmpDir {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "chart_loader_test_{name}_{}_{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }
}

impl Deref for TmpDir {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.0
    }
}

impl Drop for TmpDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

#[test]
fn same_tick_notes_form_one_chord() {
    let song = load_chart("[ExpertSingle]\n{\n  0 = N 0 0\n  0 = N 1 0\n}\n");
    let expert = song.five_fret[&Instrument::FiveFretGuitar]
        .get(Difficulty::Expert)
        .unwrap();

    assert_eq!(expert.chord_count(), 1);
    assert_eq!(expert.notes.len(), 2);
    assert!(expert.notes.iter().all(|n| n.flags.contains(NoteFlags::CHORD)));
    assert_eq!(expert.parent(0).lane, FiveFretGuitarFret::Green);
}

#[test]
fn star_power_tags_only_the_middle_note() {
    let song = load_chart("[ExpertSingle]\n{\n  0 = N 0 0\n  192 = N 1 0\n  192 = S 2 1\n  384 = N 2 0\n}\n");
    let expert = song.five_fret[&Instrument::FiveFretGuitar]
        .get(Difficulty::Expert)
        .unwrap();

    let flags: Vec<bool> = expert.notes.iter().map(|n| n.is_star_power()).collect();
    assert_eq!(flags, vec![false, true, false]);
    let middle = &expert.notes[1];
    assert!(middle.flags.contains(NoteFlags::STAR_POWER_START | NoteFlags::STAR_POWER_END));
}

#[test]
fn lyrics_are_joined_and_removed_from_global_events() {
    let song = load_chart(
        "[Events]\n{\n  0 = E \"section Intro\"\n  0 = E \"phrase_start\"\n  0 = E \"lyric state=\"\n  48 = E \"lyric of=\"\n  96 = E \"lyric the=\"\n  144 = E \"lyric art\"\n  192 = E \"phrase_end\"\n  192 = E \"crowd_clap\"\n}\n",
    );

    assert_eq!(song.lyrics.phrases.len(), 1);
    assert_eq!(song.lyrics.phrases[0].display_text(), "state-of-the-art");
    assert_eq!(song.lyrics.phrases[0].lyrics.len(), 4);

    let texts: Vec<&str> = song.global_events.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["section Intro", "crowd_clap"]);
    assert_eq!(song.sections.len(), 1);
    assert_eq!(song.sections[0].name, "Intro");
}

#[test]
fn missing_difficulties_are_generated_from_expert() {
    let song = load_chart("[ExpertSingle]\n{\n  0 = N 0 0\n  0 = N 1 0\n  0 = N 2 0\n  192 = N 3 0\n}\n");
    let track = &song.five_fret[&Instrument::FiveFretGuitar];
    assert!(track.get(Difficulty::Hard).is_some());
    assert!(track.get(Difficulty::Medium).is_some());
    assert!(track.get(Difficulty::Easy).is_some());

    let hard = track.get(Difficulty::Hard).unwrap();
    let frets: Vec<FiveFretGuitarFret> = hard.chord_notes(0).iter().map(|n| n.lane).collect();
    assert_eq!(frets, vec![FiveFretGuitarFret::Green, FiveFretGuitarFret::Yellow]);

    let settings = ParseSettings {
        generate_missing_difficulties: false,
        ..ParseSettings::default()
    };
    let src = format!("{HEADER}[ExpertSingle]\n{{\n  0 = N 0 0\n}}\n");
    let song = load_song(ChartSource::Chart(&src), &settings).unwrap();
    assert!(song.five_fret[&Instrument::FiveFretGuitar].get(Difficulty::Hard).is_none());
}

#[test]
fn drums_build_expert_plus_when_double_kicks_exist() {
    let song = load_chart("[ExpertDrums]\n{\n  0 = N 0 0\n  96 = N 32 0\n  192 = N 3 0\n  192 = N 67 0\n}\n");
    let drums = &song.drums[&Instrument::Drums];

    assert_eq!(drums.get(Difficulty::Expert).unwrap().notes.len(), 2);
    let plus = drums.get(Difficulty::ExpertPlus).unwrap();
    assert_eq!(plus.notes.len(), 3);
    assert!(plus.notes[1].flags.contains(NoteFlags::DOUBLE_KICK));
    assert!(plus.notes[2].flags.contains(NoteFlags::CYMBAL));
}

#[test]
fn note_times_follow_the_tempo_map() {
    let src = "[Song]\n{\n  Resolution = 192\n}\n[SyncTrack]\n{\n  0 = B 120000\n  192 = B 60000\n}\n[ExpertSingle]\n{\n  384 = N 0 192\n}\n";
    let song = load_song(ChartSource::Chart(src), &ParseSettings::default()).unwrap();
    let note = &song.five_fret[&Instrument::FiveFretGuitar]
        .get(Difficulty::Expert)
        .unwrap()
        .notes[0];
    assert!((note.time - 1.5).abs() < 1e-9);
    assert!((note.time_length - 1.0).abs() < 1e-9);
    assert_eq!(song.sync.time_to_tick(note.time), note.tick);
}

#[test]
fn settings_fill_defaults_from_partial_json() {
    let settings: ParseSettings = serde_json::from_str(r#"{ "hopo_threshold": 100 }"#).unwrap();
    assert_eq!(settings.hopo_threshold, Some(100));
    assert_eq!(settings.star_power_note, DEFAULT_STAR_POWER_NOTE);
    assert!(settings.chord_hopo_cancellation);
}

#[test]
fn format_is_chosen_by_extension() {
    assert_eq!(ChartFormat::from_path("notes.chart"), Some(ChartFormat::Chart));
    assert_eq!(ChartFormat::from_path("NOTES.MID"), Some(ChartFormat::Midi));
    assert_eq!(ChartFormat::from_path("song.ini"), None);
    assert_eq!(ChartFormat::from_path("notes"), None);
}

#[test]
fn repo_demo_loads() {
    let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let demo = crate_dir.join("..").join("demos").join("sample.chart");
    let song = load_file(&demo, &ParseSettings::default()).unwrap();
    assert!(song.instruments().contains(&Instrument::FiveFretGuitar));
    assert!(!song.sections.is_empty());
    assert!(!song.lyrics.is_empty());
}

#[test]
fn load_entry_resolves_the_notes_file() {
    let dir = TmpDir::new("entry");
    fs::write(dir.join("notes.chart"), format!("{HEADER}[ExpertSingle]\n{{\n  0 = N 4 0\n}}\n")).unwrap();

    let entry = SongEntry {
        directory: dir.to_path_buf(),
        notes_file: "notes.chart".to_string(),
    };
    let song = load_entry(&entry, &ParseSettings::default()).unwrap();
    assert_eq!(song.instruments(), vec![Instrument::FiveFretGuitar]);
}

#[test]
fn error_code_missing_file_is_e2001_and_needs_rescan() {
    let dir = TmpDir::new("missing");
    let err = load_file(dir.join("notes.chart"), &ParseSettings::default()).unwrap_err();
    assert_eq!(err.code, "E2001");
    assert_eq!(err.kind, LoadErrorKind::IO);
    assert_eq!(err.failure(), LoadFailure::NeedsRescan);
    assert!(err.file.as_deref().unwrap().ends_with("notes.chart"));
}

#[test]
fn error_code_unknown_extension_is_e2003() {
    let err = load_file("song.ini", &ParseSettings::default()).unwrap_err();
    assert_eq!(err.code, "E2003");
    assert_eq!(err.kind, LoadErrorKind::Unsupported);
    assert_eq!(err.failure(), LoadFailure::Hard);
}

#[test]
fn error_code_non_utf8_chart_is_e1003() {
    let dir = TmpDir::new("utf8");
    let path = dir.join("notes.chart");
    fs::write(&path, [0x5b, 0xff, 0xfe, 0x5d]).unwrap();
    let err = load_file(&path, &ParseSettings::default()).unwrap_err();
    assert_eq!(err.code, "E1003");
    assert_eq!(err.kind, LoadErrorKind::Parse);
}

#[test]
fn error_code_zero_tempo_carries_file_and_line() {
    let dir = TmpDir::new("tempo");
    let path = dir.join("notes.chart");
    fs::write(&path, "[Song]\n{\n}\n[SyncTrack]\n{\n  0 = B 0\n}\n").unwrap();
    let err = load_file(&path, &ParseSettings::default()).unwrap_err();
    assert_eq!(err.code, "E3001");
    assert_eq!(err.line, 6);
    assert!(err.file.is_some());
    assert_eq!(err.to_string(), "E3001: tempo must be > 0 (bpm=0) (line 6)");
}

#[test]
fn notes_at_the_last_tick_keep_their_sustain_without_overflow() {
    let song = load_chart(
        "[ExpertSingle]\n{\n  4294967295 = N 0 10\n  4294967295 = S 2 10\n  4294967295 = E solo\n  4294967295 = E soloend\n}\n",
    );
    let expert = song.five_fret[&Instrument::FiveFretGuitar]
        .get(Difficulty::Expert)
        .unwrap();

    let note = &expert.notes[0];
    assert_eq!(note.tick, u32::MAX);
    assert_eq!(note.tick_end(), u32::MAX);
    assert!(note.flags.contains(NoteFlags::STAR_POWER | NoteFlags::SOLO));
    assert!(song.five_fret[&Instrument::FiveFretGuitar].get(Difficulty::Easy).is_some());
}

#[test]
fn huge_resolution_gives_a_scaled_hopo_threshold() {
    let src = "[Song]\n{\n  Resolution = 4294967295\n}\n[SyncTrack]\n{\n  0 = B 120000\n}\n[ExpertSingle]\n{\n  0 = N 0 0\n  4294967295 = N 1 0\n}\n";
    let raw = ChartSource::Chart(src).read(&ParseSettings::default()).unwrap();
    assert_eq!(raw.resolution, u32::MAX);
    assert_eq!(raw.hopo_threshold, 1_454_025_386);

    let song = load_song(ChartSource::Chart(src), &ParseSettings::default()).unwrap();
    let expert = song.five_fret[&Instrument::FiveFretGuitar]
        .get(Difficulty::Expert)
        .unwrap();
    assert_eq!(expert.notes.len(), 2);
    assert!((expert.notes[1].time - 0.5).abs() < 1e-9);
}
