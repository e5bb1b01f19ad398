//! Turns format independent [`RawSong`]s into playable [`SongChart`]s.

mod drums;
mod guitar;

use chart_schema::{
    GameMode, Instrument, InstrumentDifficulty, InstrumentTrack, Note, NoteFlags,
    Phrase, PhraseType, Section, SixFretGuitarFret, SongChart, SyncTrack, TextEvent, Tick,
};

use crate::downsample::fill_missing_difficulties;
use crate::flags::{resolve_flags, RawNoteFlags};
use crate::lyrics::build_lyrics;
use crate::raw::{RawChart, RawSong, RawText};
use crate::text_events::{is_lyric_event, normalize_event_text, parse_section_name};
use crate::ParseSettings;

pub(crate) use guitar::five_fret_lane;

/// Per-song values every difficulty is normalized with.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NormalizeContext<'a> {
    pub(crate) sync: &'a SyncTrack,
    pub(crate) hopo_threshold: Tick,
    pub(crate) sustain_cutoff: Tick,
    pub(crate) snap: Tick,
    pub(crate) chord_hopo_cancellation: bool,
}

impl<'a> NormalizeContext<'a> {
    pub(crate) fn new(raw: &'a RawSong, settings: &ParseSettings) -> Self {
        Self {
            sync: &raw.sync,
            hopo_threshold: raw.hopo_threshold,
            sustain_cutoff: raw.sustain_cutoff,
            snap: settings.note_snap_threshold,
            chord_hopo_cancellation: settings.chord_hopo_cancellation,
        }
    }
}

/// Builds the playable song: chords, note types, phrases, sustains, sections and lyrics.
pub fn normalize(raw: &RawSong, settings: &ParseSettings) -> SongChart {
    let ctx = NormalizeContext::new(raw, settings);
    let sync = &raw.sync;

    let mut song = SongChart {
        sync: sync.clone(),
        sections: build_sections(&raw.events, sync),
        global_events: raw
            .events
            .iter()
            .filter(|e| !is_lyric_event(&e.text))
            .map(|e| text_event(e, sync))
            .collect(),
        venue_events: raw.venue.iter().map(|e| text_event(e, sync)).collect(),
        lyrics: build_lyrics(&raw.events, sync, raw.last_tick()),
        ..SongChart::default()
    };

    for (&(instrument, difficulty), chart) in &raw.charts {
        match instrument.game_mode() {
            GameMode::FiveFretGuitar => {
                let built = guitar::build_guitar(difficulty, chart, five_fret_lane, &ctx);
                insert_difficulty(&mut song.five_fret, instrument, built);
            }
            GameMode::SixFretGuitar => {
                let built = guitar::build_guitar(difficulty, chart, six_fret_lane, &ctx);
                insert_difficulty(&mut song.six_fret, instrument, built);
            }
            GameMode::Drums => {
                let built = drums::build_drums(difficulty, chart, &ctx);
                insert_difficulty(&mut song.drums, instrument, built);
                if let Some(plus) = drums::build_expert_plus(difficulty, chart, &ctx) {
                    insert_difficulty(&mut song.drums, instrument, plus);
                }
            }
        }
    }

    if settings.generate_missing_difficulties {
        for track in song.five_fret.values_mut() {
            fill_missing_difficulties(track, &song.sync);
        }
    }

    log::debug!(
        "normalized {} instruments, {} sections, {} lyric phrases",
        song.instruments().len(),
        song.sections.len(),
        song.lyrics.phrases.len()
    );
    song
}

fn insert_difficulty<L>(
    tracks: &mut std::collections::BTreeMap<Instrument, InstrumentTrack<L>>,
    instrument: Instrument,
    chart: InstrumentDifficulty<L>,
) {
    if chart.is_empty() {
        log::debug!("{instrument:?} {:?} has no notes, skipping", chart.difficulty);
        return;
    }
    tracks
        .entry(instrument)
        .or_insert_with(|| InstrumentTrack::new(instrument))
        .insert(chart);
}

fn six_fret_lane(lane: u8) -> Option<SixFretGuitarFret> {
    Some(match lane {
        0 => SixFretGuitarFret::Open,
        1 => SixFretGuitarFret::Black1,
        2 => SixFretGuitarFret::Black2,
        3 => SixFretGuitarFret::Black3,
        4 => SixFretGuitarFret::White1,
        5 => SixFretGuitarFret::White2,
        6 => SixFretGuitarFret::White3,
        _ => return None,
    })
}

fn text_event(event: &RawText, sync: &SyncTrack) -> TextEvent {
    TextEvent {
        text: normalize_event_text(&event.text).to_string(),
        tick: event.tick,
        time: sync.tick_to_time(event.tick),
    }
}

/// Practice sections. Each runs to the next one; the last has no length.
fn build_sections(events: &[RawText], sync: &SyncTrack) -> Vec<Section> {
    let markers: Vec<(Tick, &str)> = events
        .iter()
        .filter_map(|e| parse_section_name(&e.text).map(|name| (e.tick, name)))
        .collect();

    markers
        .iter()
        .enumerate()
        .map(|(i, &(tick, name))| {
            let end = markers.get(i + 1).map_or(tick, |&(next, _)| next).max(tick);
            Section {
                name: name.to_string(),
                tick,
                time: sync.tick_to_time(tick),
                tick_length: end - tick,
                time_length: sync.tick_length_to_time(tick, end - tick),
            }
        })
        .collect()
}

/// Converts raw notes the lane mapper and `keep` accept, resolving their flags.
///
/// The returned flags are parallel to the notes, and chord grouping keeps note order, so they
/// stay parallel to the chord arena.
pub(crate) fn convert_notes<L>(
    raw: &RawChart,
    lane_of: fn(u8) -> Option<L>,
    sync: &SyncTrack,
    keep: impl Fn(RawNoteFlags) -> bool,
) -> (Vec<Note<L>>, Vec<RawNoteFlags>) {
    let mut notes = Vec::with_capacity(raw.notes.len());
    let mut flags = Vec::with_capacity(raw.notes.len());
    for raw_note in &raw.notes {
        if !keep(raw_note.flags) {
            continue;
        }
        let Some(lane) = lane_of(raw_note.lane) else {
            log::warn!("dropping note with lane {} at tick {}", raw_note.lane, raw_note.tick);
            continue;
        };
        let mut note = Note::new(lane, raw_note.tick, sync.tick_to_time(raw_note.tick));
        note.tick_length = raw_note.length;
        note.time_length = sync.tick_length_to_time(raw_note.tick, raw_note.length);
        notes.push(note);
        flags.push(resolve_flags(raw_note.flags));
    }
    (notes, flags)
}

/// Groups tick sorted notes into chords.
///
/// A note on the current parent's tick, or within `snap` ticks of it, joins that chord and takes
/// the parent's position.
pub(crate) fn group_chords<L>(
    difficulty: chart_schema::Difficulty,
    notes: Vec<Note<L>>,
    snap: Tick,
    sync: &SyncTrack,
) -> InstrumentDifficulty<L> {
    let mut chart = InstrumentDifficulty::new(difficulty);
    for mut note in notes {
        let parent = chart
            .chords
            .last()
            .map(|span| (chart.notes[span.start].tick, chart.notes[span.start].time));
        match parent {
            Some((tick, time)) if note.tick.saturating_sub(tick) <= snap => {
                if note.tick != tick {
                    note.tick = tick;
                    note.time = time;
                    note.time_length = sync.tick_length_to_time(note.tick, note.tick_length);
                }
                chart.add_to_last_chord(note);
            }
            _ => {
                chart.start_chord(note);
            }
        }
    }

    for span in chart.chords.clone() {
        let is_chord = span.len > 1;
        for note in &mut chart.notes[span.range()] {
            note.flags.set(NoteFlags::CHORD, is_chord);
        }
    }
    chart
}

/// Phrases, phrase tags, sustain rules and local events shared by every instrument.
pub(crate) fn finish_difficulty<L: Copy + Ord>(
    chart: &mut InstrumentDifficulty<L>,
    raw: &RawChart,
    ctx: &NormalizeContext,
) {
    chart.phrases = raw
        .phrases
        .iter()
        .map(|p| Phrase {
            kind: p.kind,
            tick: p.tick,
            tick_length: p.length,
            time: ctx.sync.tick_to_time(p.tick),
            time_length: ctx.sync.tick_length_to_time(p.tick, p.length),
        })
        .collect();
    chart.text_events = raw.events.iter().map(|e| text_event(e, ctx.sync)).collect();

    tag_phrases(chart);
    resolve_sustains(chart, ctx.sync, ctx.sustain_cutoff, ctx.snap);
}

/// Chords whose parent tick falls inside `phrase`.
fn chords_in_phrase<L>(chart: &InstrumentDifficulty<L>, phrase: &Phrase) -> std::ops::Range<usize> {
    let first = chart
        .chords
        .partition_point(|span| chart.notes[span.start].tick < phrase.tick);
    let last = first
        + chart.chords[first..]
            .iter()
            .take_while(|span| phrase.contains_tick(chart.notes[span.start].tick))
            .count();
    first..last
}

/// Sets star power, solo and fill activator flags from the difficulty's phrases.
pub(crate) fn tag_phrases<L: Copy + Ord>(chart: &mut InstrumentDifficulty<L>) {
    let mut star_power: Vec<&Phrase> = chart.phrases_of(PhraseType::StarPower).collect();
    star_power.sort_by_key(|p| p.tick);
    for pair in star_power.windows(2) {
        if pair[0].tick_end() > pair[1].tick {
            log::warn!("star power phrases at ticks {} and {} overlap", pair[0].tick, pair[1].tick);
        }
    }

    for phrase in chart.phrases.clone() {
        let chords = chords_in_phrase(chart, &phrase);
        if chords.is_empty() {
            log::debug!("{:?} phrase at tick {} has no notes", phrase.kind, phrase.tick);
            continue;
        }
        let (flag, start, end) = match phrase.kind {
            PhraseType::StarPower => (NoteFlags::STAR_POWER, NoteFlags::STAR_POWER_START, NoteFlags::STAR_POWER_END),
            PhraseType::Solo => (NoteFlags::SOLO, NoteFlags::SOLO_START, NoteFlags::SOLO_END),
            PhraseType::DrumFill => {
                let last = chords.end - 1;
                let notes = chart.chord_notes_mut(last);
                if let Some(highest) = notes.iter_mut().max_by_key(|n| n.lane) {
                    highest.flags.insert(NoteFlags::STAR_POWER_ACTIVATOR);
                }
                continue;
            }
            _ => continue,
        };

        for chord in chords.clone() {
            for note in chart.chord_notes_mut(chord) {
                note.flags.insert(flag);
            }
        }
        for note in chart.chord_notes_mut(chords.start) {
            note.flags.insert(start);
        }
        for note in chart.chord_notes_mut(chords.end - 1) {
            note.flags.insert(end);
        }
    }
}

/// Truncates or tags sustains that run into later chords, and tags uneven chords.
pub(crate) fn resolve_sustains<L>(chart: &mut InstrumentDifficulty<L>, sync: &SyncTrack, cutoff: Tick, snap: Tick) {
    for chord in 0..chart.chord_count() {
        let tick = chart.parent(chord).tick;
        let next_tick = chart.next_chord(chord).map(|next| chart.parent(next).tick);
        let previous = chart
            .previous_chord(chord)
            .map(|prev| (chart.parent(prev).tick, chart.chord_tick_end(prev)));

        for note in chart.chord_notes_mut(chord) {
            if !note.is_sustain() {
                continue;
            }
            if let Some(next) = next_tick {
                let end = note.tick_end();
                if end > next && next - note.tick > snap {
                    if end - next <= cutoff {
                        note.tick_length = next - note.tick;
                        note.time_length = sync.tick_length_to_time(note.tick, note.tick_length);
                    } else {
                        note.flags.insert(NoteFlags::EXTENDED_SUSTAIN);
                    }
                }
            }
            if let Some((prev_tick, prev_end)) = previous {
                if prev_end > tick && tick - prev_tick > snap {
                    note.flags.insert(NoteFlags::EXTENDED_SUSTAIN);
                }
            }
        }

        let notes = chart.chord_notes_mut(chord);
        let disjoint = notes.windows(2).any(|w| w[0].tick_length != w[1].tick_length);
        if disjoint {
            for note in notes {
                note.flags.insert(NoteFlags::DISJOINT);
            }
        }
    }
}
