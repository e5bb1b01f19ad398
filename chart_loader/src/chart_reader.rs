use std::collections::BTreeMap;

use chart_schema::{Difficulty, GameMode, Instrument, PhraseType, Tick, DEFAULT_RESOLUTION};

use crate::flags::RawNoteFlags;
use crate::raw::{RawChart, RawNote, RawPhrase, RawSong, RawTempo, RawText, RawTimeSignature};
use crate::sync::build_sync_track;
use crate::text_events::{SOLO_END, SOLO_START};
use crate::{LoadError, ParseSettings};

const DIFFICULTY_PREFIXES: [(&str, Difficulty); 4] = [
    ("Expert", Difficulty::Expert),
    ("Hard", Difficulty::Hard),
    ("Medium", Difficulty::Medium),
    ("Easy", Difficulty::Easy),
];

const INSTRUMENT_SUFFIXES: [(&str, Instrument); 10] = [
    ("Single", Instrument::FiveFretGuitar),
    ("DoubleGuitar", Instrument::FiveFretCoopGuitar),
    ("DoubleBass", Instrument::FiveFretBass),
    ("DoubleRhythm", Instrument::FiveFretRhythm),
    ("Keyboard", Instrument::Keys),
    ("Drums", Instrument::Drums),
    ("GHLGuitar", Instrument::SixFretGuitar),
    ("GHLBass", Instrument::SixFretBass),
    ("GHLRhythm", Instrument::SixFretRhythm),
    ("GHLCoop", Instrument::SixFretCoopGuitar),
];

const PHRASE_CODES: [(u32, PhraseType); 6] = [
    (0, PhraseType::VersusPlayer1),
    (1, PhraseType::VersusPlayer2),
    (2, PhraseType::StarPower),
    (64, PhraseType::DrumFill),
    (65, PhraseType::TremoloLane),
    (66, PhraseType::TrillLane),
];

const DRUM_CYMBAL_OFFSET: u32 = 64;
const DRUM_ACCENT_OFFSET: u32 = 33;
const DRUM_GHOST_OFFSET: u32 = 39;

#[derive(Debug)]
struct ChartBlock<'a> {
    name: &'a str,
    line: usize,
    body: Vec<(usize, &'a str)>,
}

/// What a `N` line means for the current instrument.
#[derive(Debug, Clone, Copy, PartialEq)]
enum NoteCode {
    Note(u8, RawNoteFlags),
    ChordFlag(RawNoteFlags),
    NoteFlag(u8, RawNoteFlags),
    Unknown,
}

pub(crate) fn read_chart(src: &str, settings: &ParseSettings) -> Result<RawSong, LoadError> {
    let src = src.strip_prefix('\u{feff}').unwrap_or(src);
    let blocks = split_blocks(src)?;

    let song_block = blocks
        .first()
        .ok_or_else(|| LoadError::new("E1001", "required section [Song] is missing", 0))?;
    if song_block.name != "Song" {
        return Err(LoadError::new(
            "E1001",
            format!("[Song] must be the first section, found [{}]", song_block.name),
            song_block.line,
        ));
    }
    let sync_block = blocks.get(1).ok_or_else(|| {
        LoadError::new("E1001", "required section [SyncTrack] is missing", song_block.line)
    })?;
    if sync_block.name != "SyncTrack" {
        return Err(LoadError::new(
            "E1001",
            format!("[SyncTrack] must follow [Song], found [{}]", sync_block.name),
            sync_block.line,
        ));
    }

    let resolution = parse_song_block(song_block);
    let (tempos, time_signatures) = parse_sync_block(sync_block);
    let sync = build_sync_track(resolution, tempos, time_signatures)?;

    let mut song = RawSong {
        resolution,
        hopo_threshold: settings.chart_hopo_threshold(resolution),
        sustain_cutoff: settings.chart_sustain_cutoff(),
        sync,
        events: Vec::new(),
        venue: Vec::new(),
        charts: BTreeMap::new(),
    };

    for block in &blocks[2..] {
        if block.name == "Events" {
            parse_events_block(block, &mut song);
            continue;
        }
        match instrument_section(block.name) {
            Some((instrument, difficulty)) => {
                let chart = parse_instrument_block(block, instrument, song.sustain_cutoff);
                if song.charts.insert((instrument, difficulty), chart).is_some() {
                    log::warn!("duplicate section [{}] (line {}), keeping the later one", block.name, block.line);
                }
            }
            None => log::warn!("skipping unknown section [{}] (line {})", block.name, block.line),
        }
    }

    Ok(song)
}

fn split_blocks(src: &str) -> Result<Vec<ChartBlock<'_>>, LoadError> {
    let mut blocks = Vec::new();
    let mut current: Option<ChartBlock> = None;
    let mut expect_open = false;

    for (i, raw_line) in src.lines().enumerate() {
        let line_no = i + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if expect_open {
            if trimmed != "{" {
                return Err(LoadError::new("E1002", "expected '{' after section header", line_no)
                    .with_context(trimmed));
            }
            expect_open = false;
            continue;
        }

        if current.is_some() {
            if trimmed == "}" {
                blocks.extend(current.take());
            } else if let Some(block) = current.as_mut() {
                block.body.push((line_no, trimmed));
            }
            continue;
        }

        let name = trimmed
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .ok_or_else(|| {
                LoadError::new("E1002", "expected section header '[Name]'", line_no).with_context(trimmed)
            })?;
        current = Some(ChartBlock {
            name: name.trim(),
            line: line_no,
            body: Vec::new(),
        });
        expect_open = true;
    }

    if let Some(block) = current {
        return Err(LoadError::new(
            "E1002",
            format!("section [{}] is not closed", block.name),
            block.line,
        ));
    }
    Ok(blocks)
}

fn parse_song_block(block: &ChartBlock) -> u32 {
    for &(line_no, line) in &block.body {
        let Some((key, value)) = line.split_once('=') else {
            log::warn!("skipping malformed [Song] line {line_no}: {line}");
            continue;
        };
        if key.trim() != "Resolution" {
            continue;
        }
        match value.trim().trim_matches('"').parse::<u32>() {
            Ok(resolution) => return resolution,
            Err(_) => log::warn!("invalid Resolution on line {line_no}, using {DEFAULT_RESOLUTION}"),
        }
    }
    DEFAULT_RESOLUTION
}

fn parse_sync_block(block: &ChartBlock) -> (Vec<RawTempo>, Vec<RawTimeSignature>) {
    let mut tempos = Vec::new();
    let mut time_signatures = Vec::new();

    for &(line_no, line) in &block.body {
        let Some((tick, kind, value)) = split_track_line(line) else {
            log::warn!("skipping malformed [SyncTrack] line {line_no}: {line}");
            continue;
        };
        let mut values = value.split_whitespace().map(str::parse::<u32>);
        match kind {
            "B" => match values.next() {
                Some(Ok(milli_bpm)) => tempos.push(RawTempo {
                    tick,
                    bpm: milli_bpm as f64 / 1000.0,
                    line: line_no,
                }),
                _ => log::warn!("skipping tempo with bad value on line {line_no}"),
            },
            "TS" => {
                let numerator = match values.next() {
                    Some(Ok(n)) => n,
                    _ => {
                        log::warn!("skipping time signature with bad value on line {line_no}");
                        continue;
                    }
                };
                let exponent = match values.next() {
                    Some(Ok(e)) if e < 32 => e,
                    Some(_) => {
                        log::warn!("skipping time signature with bad denominator on line {line_no}");
                        continue;
                    }
                    None => 2,
                };
                time_signatures.push(RawTimeSignature {
                    tick,
                    numerator,
                    denominator: 1 << exponent,
                    line: line_no,
                });
            }
            "A" => {}
            other => log::warn!("skipping unknown [SyncTrack] event '{other}' on line {line_no}"),
        }
    }

    (tempos, time_signatures)
}

fn parse_events_block(block: &ChartBlock, song: &mut RawSong) {
    let mut last_tick = 0;
    for &(line_no, line) in &block.body {
        let Some((tick, kind, value)) = split_track_line(line) else {
            log::warn!("skipping malformed [Events] line {line_no}: {line}");
            continue;
        };
        if tick < last_tick {
            log::warn!("skipping out of order event on line {line_no}");
            continue;
        }
        last_tick = tick;
        if kind != "E" {
            log::warn!("skipping unknown [Events] entry '{kind}' on line {line_no}");
            continue;
        }
        song.events.push(RawText {
            tick,
            text: event_text(value).to_string(),
        });
    }
}

fn parse_instrument_block(block: &ChartBlock, instrument: Instrument, sustain_cutoff: Tick) -> RawChart {
    let mode = instrument.game_mode();
    let mut chart = RawChart::default();
    let mut chord_flags: Vec<(Tick, RawNoteFlags)> = Vec::new();
    let mut note_flags: Vec<(Tick, u8, RawNoteFlags)> = Vec::new();
    let mut solo_start: Option<Tick> = None;
    let mut last_tick = 0;

    for &(line_no, line) in &block.body {
        let Some((tick, kind, value)) = split_track_line(line) else {
            log::warn!("[{}] skipping malformed line {line_no}: {line}", block.name);
            continue;
        };
        if tick < last_tick {
            log::warn!("[{}] skipping out of order line {line_no}", block.name);
            continue;
        }
        last_tick = tick;

        match kind {
            "N" => {
                let Some((number, length)) = parse_pair(value) else {
                    log::warn!("[{}] skipping bad note on line {line_no}: {line}", block.name);
                    continue;
                };
                let length = if length < sustain_cutoff { 0 } else { length };
                match note_code(mode, number) {
                    NoteCode::Note(lane, flags) => chart.push_note(RawNote {
                        tick,
                        lane,
                        length,
                        flags,
                    }),
                    NoteCode::ChordFlag(flag) => chord_flags.push((tick, flag)),
                    NoteCode::NoteFlag(lane, flag) => note_flags.push((tick, lane, flag)),
                    NoteCode::Unknown => {
                        log::warn!("[{}] unknown note number {number} on line {line_no}", block.name)
                    }
                }
            }
            "S" => {
                let Some((code, length)) = parse_pair(value) else {
                    log::warn!("[{}] skipping bad phrase on line {line_no}: {line}", block.name);
                    continue;
                };
                match PHRASE_CODES.iter().find(|(c, _)| *c == code) {
                    Some(&(_, kind)) => chart.push_phrase(RawPhrase { kind, tick, length }),
                    None => log::warn!("[{}] unknown phrase type {code} on line {line_no}", block.name),
                }
            }
            "E" => {
                let text = event_text(value);
                match text {
                    SOLO_START => {
                        if solo_start.is_some() {
                            log::warn!("[{}] nested solo start on line {line_no}", block.name);
                        }
                        solo_start = Some(tick);
                    }
                    SOLO_END => match solo_start.take() {
                        // Solo end markers are inclusive
                        Some(start) => chart.push_phrase(RawPhrase {
                            kind: PhraseType::Solo,
                            tick: start,
                            length: tick.saturating_add(1).saturating_sub(start),
                        }),
                        None => log::warn!("[{}] solo end without start on line {line_no}", block.name),
                    },
                    _ => chart.events.push(RawText {
                        tick,
                        text: text.to_string(),
                    }),
                }
            }
            other => log::warn!("[{}] skipping unknown entry '{other}' on line {line_no}", block.name),
        }
    }

    if let Some(start) = solo_start {
        log::warn!("[{}] solo starting at tick {start} is never closed", block.name);
    }

    for (tick, flag) in chord_flags {
        if !chart.flag_notes(tick, None, flag) {
            log::debug!("[{}] chord flag at tick {tick} has no notes", block.name);
        }
    }
    for (tick, lane, flag) in note_flags {
        if !chart.flag_notes(tick, Some(lane), flag) {
            log::debug!("[{}] note flag at tick {tick} has no matching note", block.name);
        }
    }

    chart
}

fn note_code(mode: GameMode, number: u32) -> NoteCode {
    match mode {
        GameMode::FiveFretGuitar => match number {
            0..=4 => NoteCode::Note(number as u8 + 1, RawNoteFlags::NONE),
            7 => NoteCode::Note(0, RawNoteFlags::NONE),
            5 => NoteCode::ChordFlag(RawNoteFlags::FORCED),
            6 => NoteCode::ChordFlag(RawNoteFlags::TAP),
            _ => NoteCode::Unknown,
        },
        GameMode::SixFretGuitar => match number {
            0..=2 => NoteCode::Note(number as u8 + 4, RawNoteFlags::NONE),
            3 | 4 => NoteCode::Note(number as u8 - 2, RawNoteFlags::NONE),
            8 => NoteCode::Note(3, RawNoteFlags::NONE),
            7 => NoteCode::Note(0, RawNoteFlags::NONE),
            5 => NoteCode::ChordFlag(RawNoteFlags::FORCED),
            6 => NoteCode::ChordFlag(RawNoteFlags::TAP),
            _ => NoteCode::Unknown,
        },
        GameMode::Drums => match number {
            0..=5 => NoteCode::Note(number as u8, RawNoteFlags::NONE),
            32 => NoteCode::Note(0, RawNoteFlags::INSTRUMENT_PLUS),
            66..=68 => NoteCode::NoteFlag((number - DRUM_CYMBAL_OFFSET) as u8, RawNoteFlags::CYMBAL),
            34..=38 => NoteCode::NoteFlag((number - DRUM_ACCENT_OFFSET) as u8, RawNoteFlags::ACCENT),
            40..=44 => NoteCode::NoteFlag((number - DRUM_GHOST_OFFSET) as u8, RawNoteFlags::GHOST),
            _ => NoteCode::Unknown,
        },
    }
}

fn instrument_section(name: &str) -> Option<(Instrument, Difficulty)> {
    DIFFICULTY_PREFIXES.iter().find_map(|&(prefix, difficulty)| {
        let suffix = name.strip_prefix(prefix)?;
        INSTRUMENT_SUFFIXES
            .iter()
            .find(|(s, _)| *s == suffix)
            .map(|&(_, instrument)| (instrument, difficulty))
    })
}

/// Splits `tick = KIND value`.
fn split_track_line(line: &str) -> Option<(Tick, &str, &str)> {
    let (tick, rest) = line.split_once('=')?;
    let tick = tick.trim().parse::<Tick>().ok()?;
    let rest = rest.trim();
    let (kind, value) = match rest.split_once(char::is_whitespace) {
        Some((kind, value)) => (kind, value.trim()),
        None => (rest, ""),
    };
    (!kind.is_empty()).then_some((tick, kind, value))
}

fn parse_pair(value: &str) -> Option<(u32, u32)> {
    let mut parts = value.split_whitespace();
    let a = parts.next()?.parse().ok()?;
    let b = parts.next()?.parse().ok()?;
    Some((a, b))
}

fn event_text(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
        .trim()
}
