use std::collections::{BTreeMap, HashMap, HashSet};

use chart_schema::{Difficulty, GameMode, Instrument, PhraseType, Tick};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::flags::RawNoteFlags;
use crate::raw::{RawChart, RawNote, RawPhrase, RawSong, RawTempo, RawText, RawTimeSignature};
use crate::sync::build_sync_track;
use crate::text_events::{normalize_event_text, CHART_DYNAMICS, ENHANCED_OPENS, LYRIC_PREFIX, PHRASE_END, PHRASE_START};
use crate::{LoadError, ParseSettings};

const TRACK_NAMES: [(&str, Instrument); 13] = [
    ("PART GUITAR", Instrument::FiveFretGuitar),
    ("T1 GEMS", Instrument::FiveFretGuitar),
    ("PART GUITAR COOP", Instrument::FiveFretCoopGuitar),
    ("PART BASS", Instrument::FiveFretBass),
    ("PART RHYTHM", Instrument::FiveFretRhythm),
    ("PART KEYS", Instrument::Keys),
    ("PART DRUMS", Instrument::Drums),
    ("PART DRUM", Instrument::Drums),
    ("PART REAL_DRUMS_PS", Instrument::Drums),
    ("PART GUITAR GHL", Instrument::SixFretGuitar),
    ("PART BASS GHL", Instrument::SixFretBass),
    ("PART RHYTHM GHL", Instrument::SixFretRhythm),
    ("PART GUITAR COOP GHL", Instrument::SixFretCoopGuitar),
];

const EVENTS_TRACK: &str = "EVENTS";
const VENUE_TRACK: &str = "VENUE";
const BEAT_TRACK: &str = "BEAT";
const VOCALS_TRACK: &str = "PART VOCALS";

const FIVE_FRET_BASES: [u8; 4] = [60, 72, 84, 96];
const SIX_FRET_BASES: [u8; 4] = [58, 70, 82, 94];
const DRUM_BASES: [u8; 4] = [60, 72, 84, 96];

const FIVE_FRET_HOPO_OFFSET: u8 = 5;
const FIVE_FRET_STRUM_OFFSET: u8 = 6;
const SIX_FRET_HOPO_OFFSET: u8 = 7;
const SIX_FRET_STRUM_OFFSET: u8 = 8;

const SOLO_NOTE: u8 = 103;
const TAP_NOTE: u8 = 104;
const VERSUS_1_NOTE: u8 = 105;
const VERSUS_2_NOTE: u8 = 106;
const TOM_YELLOW_NOTE: u8 = 110;
const TOM_ORANGE_NOTE: u8 = 112;
const DRUM_FILL_NOTES: std::ops::RangeInclusive<u8> = 120..=124;
const TREMOLO_NOTE: u8 = 126;
const TRILL_NOTE: u8 = 127;

const VELOCITY_ACCENT: u8 = 127;
const VELOCITY_GHOST: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MidiNote {
    key: u8,
    start: Tick,
    end: Tick,
    velocity: u8,
}

#[derive(Debug, Default)]
struct TrackData {
    name: Option<String>,
    notes: Vec<MidiNote>,
    texts: Vec<RawText>,
}

impl TrackData {
    fn has_text(&self, needle: &str) -> bool {
        self.texts.iter().any(|t| normalize_event_text(&t.text) == needle)
    }

    fn ranges(&self, key: u8) -> Vec<(Tick, Tick)> {
        self.notes
            .iter()
            .filter(|n| n.key == key)
            .map(|n| (n.start, n.end))
            .collect()
    }
}

pub(crate) fn read_midi(bytes: &[u8], settings: &ParseSettings) -> Result<RawSong, LoadError> {
    let smf = Smf::parse(bytes).map_err(|e| LoadError::new("E1101", format!("invalid midi file: {e}"), 0))?;
    if smf.tracks.is_empty() {
        return Err(LoadError::new("E1102", "midi file has no tracks", 0));
    }
    let resolution = match smf.header.timing {
        Timing::Metrical(ticks) => ticks.as_int() as u32,
        Timing::Timecode(..) => {
            return Err(LoadError::new("E1103", "SMPTE timing is not supported", 0));
        }
    };

    let (tempos, time_signatures) = read_tempo_map(&smf.tracks[0]);
    let sync = build_sync_track(resolution, tempos, time_signatures)?;

    let mut song = RawSong {
        resolution,
        hopo_threshold: settings.midi_hopo_threshold(resolution),
        sustain_cutoff: settings.midi_sustain_cutoff(resolution),
        sync,
        events: Vec::new(),
        venue: Vec::new(),
        charts: BTreeMap::new(),
    };

    let mut seen = HashSet::new();
    for (index, track) in smf.tracks.iter().enumerate() {
        let data = collect_track(track);
        let Some(name) = data.name.clone() else {
            if index > 0 {
                log::warn!("skipping unnamed midi track {index}");
            }
            continue;
        };
        if index > 0 && !seen.insert(name.clone()) {
            log::warn!("skipping duplicate midi track '{name}'");
            continue;
        }

        match name.as_str() {
            EVENTS_TRACK => song.events.extend(data.texts),
            VENUE_TRACK => song.venue.extend(data.texts),
            BEAT_TRACK => {}
            VOCALS_TRACK => read_vocals(&data, &mut song.events),
            _ => match TRACK_NAMES.iter().find(|(n, _)| *n == name) {
                Some(&(_, instrument)) => read_instrument(&data, instrument, &mut song, settings),
                // The tempo track usually carries the song title.
                None if index == 0 => {}
                None => log::warn!("skipping unknown midi track '{name}'"),
            },
        }
    }

    song.events.sort_by_key(|e| e.tick);
    Ok(song)
}

fn read_tempo_map(track: &[TrackEvent]) -> (Vec<RawTempo>, Vec<RawTimeSignature>) {
    let mut tick: Tick = 0;
    let mut tempos = Vec::new();
    let mut time_signatures = Vec::new();

    for event in track {
        tick = tick.saturating_add(event.delta.as_int());
        match event.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(micros)) => tempos.push(RawTempo {
                tick,
                bpm: 60_000_000.0 / micros.as_int() as f64,
                line: 0,
            }),
            TrackEventKind::Meta(MetaMessage::TimeSignature(numerator, exponent, _, _)) => {
                if exponent >= 32 {
                    log::warn!("skipping time signature with bad denominator at tick {tick}");
                    continue;
                }
                time_signatures.push(RawTimeSignature {
                    tick,
                    numerator: numerator as u32,
                    denominator: 1 << exponent,
                    line: 0,
                });
            }
            _ => {}
        }
    }

    (tempos, time_signatures)
}

fn collect_track(track: &[TrackEvent]) -> TrackData {
    let mut data = TrackData::default();
    let mut tick: Tick = 0;
    let mut open: HashMap<(u8, u8), (Tick, u8)> = HashMap::new();

    for event in track {
        tick = tick.saturating_add(event.delta.as_int());
        match event.kind {
            TrackEventKind::Meta(MetaMessage::TrackName(name)) => {
                if data.name.is_none() {
                    data.name = Some(String::from_utf8_lossy(name).trim().to_string());
                }
            }
            TrackEventKind::Meta(MetaMessage::Text(text)) | TrackEventKind::Meta(MetaMessage::Lyric(text)) => {
                data.texts.push(RawText {
                    tick,
                    text: String::from_utf8_lossy(text).into_owned(),
                });
            }
            TrackEventKind::Midi { channel, message } => {
                let channel = channel.as_int();
                match message {
                    MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                        let key = key.as_int();
                        if open.insert((key, channel), (tick, vel.as_int())).is_some() {
                            log::warn!("note {key} turned on twice at tick {tick}, restarting it");
                        }
                    }
                    MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                        let key = key.as_int();
                        match open.remove(&(key, channel)) {
                            Some((start, velocity)) => data.notes.push(MidiNote {
                                key,
                                start,
                                end: tick,
                                velocity,
                            }),
                            None => log::warn!("note {key} off at tick {tick} without a note on"),
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    for ((key, _), (start, _)) in open {
        log::warn!("note {key} starting at tick {start} is never turned off");
    }
    data.notes.sort_by_key(|n| (n.start, n.key));
    data
}

fn read_vocals(data: &TrackData, events: &mut Vec<RawText>) {
    for note in data.notes.iter().filter(|n| n.key == VERSUS_1_NOTE || n.key == VERSUS_2_NOTE) {
        events.push(RawText {
            tick: note.start,
            text: PHRASE_START.to_string(),
        });
        events.push(RawText {
            tick: note.end,
            text: PHRASE_END.to_string(),
        });
    }
    for text in &data.texts {
        let lyric = text.text.trim();
        if lyric.is_empty() || lyric.starts_with('[') {
            continue;
        }
        events.push(RawText {
            tick: text.tick,
            text: format!("{LYRIC_PREFIX}{lyric}"),
        });
    }
}

fn read_instrument(data: &TrackData, instrument: Instrument, song: &mut RawSong, settings: &ParseSettings) {
    let mode = instrument.game_mode();
    let enhanced_opens = data.has_text(ENHANCED_OPENS);
    let dynamics = data.has_text(CHART_DYNAMICS);
    let bases = match mode {
        GameMode::FiveFretGuitar => FIVE_FRET_BASES,
        GameMode::SixFretGuitar => SIX_FRET_BASES,
        GameMode::Drums => DRUM_BASES,
    };

    for (difficulty, base) in Difficulty::AUTHORED.into_iter().zip(bases) {
        let mut chart = RawChart::default();

        for note in &data.notes {
            let Some((lane, flags)) = map_note(mode, base, difficulty, note, enhanced_opens, dynamics) else {
                continue;
            };
            let length = note.end - note.start;
            chart.push_note(RawNote {
                tick: note.start,
                lane,
                length: if length < song.sustain_cutoff { 0 } else { length },
                flags,
            });
        }
        if chart.is_empty() {
            continue;
        }

        match mode {
            GameMode::FiveFretGuitar | GameMode::SixFretGuitar => {
                let (hopo, strum) = match mode {
                    GameMode::SixFretGuitar => (SIX_FRET_HOPO_OFFSET, SIX_FRET_STRUM_OFFSET),
                    _ => (FIVE_FRET_HOPO_OFFSET, FIVE_FRET_STRUM_OFFSET),
                };
                apply_ranges(&mut chart, &data.ranges(base + hopo), |_| true, RawNoteFlags::FORCED_HOPO);
                apply_ranges(&mut chart, &data.ranges(base + strum), |_| true, RawNoteFlags::FORCED_STRUM);
                apply_ranges(&mut chart, &data.ranges(TAP_NOTE), |_| true, RawNoteFlags::TAP);
            }
            GameMode::Drums => {
                for key in TOM_YELLOW_NOTE..=TOM_ORANGE_NOTE {
                    let lane = key - TOM_YELLOW_NOTE + 2;
                    for note in chart.notes.iter_mut().filter(|n| n.lane == lane) {
                        if in_ranges(&data.ranges(key), note.tick) {
                            note.flags.remove(RawNoteFlags::CYMBAL);
                        }
                    }
                }
            }
        }

        for note in &data.notes {
            let Some(kind) = phrase_kind(mode, difficulty, note, settings.star_power_note) else {
                continue;
            };
            chart.push_phrase(RawPhrase {
                kind,
                tick: note.start,
                length: note.end - note.start,
            });
        }

        chart.events = data.texts.clone();
        song.charts.insert((instrument, difficulty), chart);
    }

    if mode == GameMode::FiveFretGuitar {
        fix_legacy_star_power(song, instrument);
    }
}

/// Maps a midi key to a lane in the shared vocabulary for one difficulty.
fn map_note(
    mode: GameMode,
    base: u8,
    difficulty: Difficulty,
    note: &MidiNote,
    enhanced_opens: bool,
    dynamics: bool,
) -> Option<(u8, RawNoteFlags)> {
    let key = note.key;
    match mode {
        GameMode::FiveFretGuitar => {
            if enhanced_opens && key + 1 == base {
                return Some((0, RawNoteFlags::NONE));
            }
            let offset = key.checked_sub(base)?;
            (offset <= 4).then_some((offset + 1, RawNoteFlags::NONE))
        }
        GameMode::SixFretGuitar => match key.checked_sub(base)? {
            0 => Some((0, RawNoteFlags::NONE)),
            // white 1..3
            offset @ 1..=3 => Some((offset + 3, RawNoteFlags::NONE)),
            // black 1..3
            offset @ 4..=6 => Some((offset - 3, RawNoteFlags::NONE)),
            _ => None,
        },
        GameMode::Drums => {
            if difficulty == Difficulty::Expert && key + 1 == base {
                return Some((0, RawNoteFlags::INSTRUMENT_PLUS));
            }
            let lane = key.checked_sub(base)?;
            if lane > 5 {
                return None;
            }
            let mut flags = RawNoteFlags::NONE;
            if (2..=4).contains(&lane) {
                flags.insert(RawNoteFlags::CYMBAL);
            }
            if dynamics && lane != 0 {
                match note.velocity {
                    VELOCITY_ACCENT => flags.insert(RawNoteFlags::ACCENT),
                    VELOCITY_GHOST => flags.insert(RawNoteFlags::GHOST),
                    _ => {}
                }
            }
            Some((lane, flags))
        }
    }
}

fn phrase_kind(mode: GameMode, difficulty: Difficulty, note: &MidiNote, star_power_note: u8) -> Option<PhraseType> {
    let lane_phrase = difficulty == Difficulty::Expert
        || (difficulty == Difficulty::Hard && (41..=50).contains(&note.velocity));
    match note.key {
        key if key == star_power_note => Some(PhraseType::StarPower),
        SOLO_NOTE => Some(PhraseType::Solo),
        VERSUS_1_NOTE => Some(PhraseType::VersusPlayer1),
        VERSUS_2_NOTE => Some(PhraseType::VersusPlayer2),
        key if mode == GameMode::Drums && DRUM_FILL_NOTES.contains(&key) => Some(PhraseType::DrumFill),
        TREMOLO_NOTE if lane_phrase => Some(PhraseType::TremoloLane),
        TRILL_NOTE if lane_phrase => Some(PhraseType::TrillLane),
        _ => None,
    }
}

fn in_ranges(ranges: &[(Tick, Tick)], tick: Tick) -> bool {
    ranges.iter().any(|&(start, end)| start <= tick && tick < end)
}

fn apply_ranges(chart: &mut RawChart, ranges: &[(Tick, Tick)], filter: impl Fn(&RawNote) -> bool, flag: RawNoteFlags) {
    if ranges.is_empty() {
        return;
    }
    for note in chart.notes.iter_mut().filter(|n| filter(n)) {
        if in_ranges(ranges, note.tick) {
            note.flags.insert(flag);
        }
    }
}

/// Old charts marked star power with the solo note. Without any real star
/// power phrase, solos are read as star power.
fn fix_legacy_star_power(song: &mut RawSong, instrument: Instrument) {
    let charts: Vec<&mut RawChart> = song
        .charts
        .iter_mut()
        .filter(|((i, _), _)| *i == instrument)
        .map(|(_, chart)| chart)
        .collect();

    let has_star_power = charts
        .iter()
        .any(|c| c.phrases.iter().any(|p| p.kind == PhraseType::StarPower));
    let has_solo = charts
        .iter()
        .any(|c| c.phrases.iter().any(|p| p.kind == PhraseType::Solo));
    if has_star_power || !has_solo {
        return;
    }

    log::info!("{instrument:?} has solos but no star power, treating solos as star power");
    for chart in charts {
        for phrase in chart.phrases.iter_mut().filter(|p| p.kind == PhraseType::Solo) {
            phrase.kind = PhraseType::StarPower;
        }
    }
}
