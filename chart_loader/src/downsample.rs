//! Generates lower five fret difficulties from higher ones.
//!
//! Everything here is deterministic: the same input difficulty always produces the same output.

use chart_schema::{
    Difficulty, FiveFretGuitarFret, InstrumentDifficulty, InstrumentTrack, Note, NoteFlags, SyncTrack, Tick,
};

use crate::normalize::{group_chords, resolve_sustains, tag_phrases};

const G: u8 = 1 << 0;
const R: u8 = 1 << 1;
const Y: u8 = 1 << 2;
const B: u8 = 1 << 3;
const O: u8 = 1 << 4;

pub const CHORD_EXPERT_TO_HARD: [(u8, u8); 16] = [
    // three wide
    (G | R | Y, G | Y),
    (R | Y | B, R | B),
    (Y | B | O, Y | O),
    // four wide, left
    (G | R | Y | B, G | B),
    (G | R | B, G | B),
    (G | Y | B, G | B),
    // four wide, right
    (R | Y | B | O, R | O),
    (R | Y | O, R | O),
    (R | B | O, R | O),
    // five wide; the only green-orange chord on hard
    (G | R | Y | B | O, G | O),
    (G | Y | O, R | B),
    (G | B | O, B | O),
    (G | R | O, G | R),
    (G | R | B | O, R | B),
    (G | R | Y | O, G | Y),
    (G | Y | B | O, Y | O),
];

pub const CHORD_HARD_TO_MEDIUM: [(u8, u8); 5] = [
    (G | O, R | B),
    (R | O, R | B),
    (Y | O, Y | B),
    (B | O, Y | B),
    (G | B, G | Y),
];

pub const CHORD_MEDIUM_TO_EASY: [(u8, u8); 5] = [
    (G | R, G),
    (G | Y, R),
    (R | Y, R),
    (R | B, Y),
    (Y | B, Y),
];

const EXPERT_TO_HARD_GAP: f64 = 0.2;
const HARD_TO_MEDIUM_GAP: f64 = 0.35;
const MEDIUM_TO_EASY_GAP: f64 = 0.45;

/// Max auto HOPOs dropped in a row before one is kept as a strum.
const MAX_CONSECUTIVE_HOPO_REMOVALS: u32 = 2;

type Chart = InstrumentDifficulty<FiveFretGuitarFret>;

#[derive(Debug, Clone, PartialEq)]
struct ChordInfo {
    tick: Tick,
    time: f64,
    lengths: [Tick; 5],
    frets: u8,
    hopo: bool,
    tap: bool,
    auto_hopo: bool,
}

fn fret_index(fret: FiveFretGuitarFret) -> Option<usize> {
    match fret.mask() {
        0 => None,
        mask => Some(mask.trailing_zeros() as usize),
    }
}

const FRET_ORDER: [FiveFretGuitarFret; 5] = FiveFretGuitarFret::FRETS;

/// Merges same tick notes into chords. Open notes are dropped.
fn consolidate(notes: &[Note<FiveFretGuitarFret>]) -> Vec<ChordInfo> {
    let mut chords: Vec<ChordInfo> = Vec::new();
    for note in notes {
        let Some(index) = fret_index(note.lane) else {
            continue;
        };
        match chords.last_mut() {
            Some(chord) if chord.tick == note.tick => {
                chord.frets |= 1 << index;
                chord.lengths[index] = note.tick_length;
            }
            _ => {
                let mut lengths = [0; 5];
                lengths[index] = note.tick_length;
                chords.push(ChordInfo {
                    tick: note.tick,
                    time: note.time,
                    lengths,
                    frets: 1 << index,
                    hopo: note.is_hopo(),
                    tap: note.is_tap(),
                    auto_hopo: note.flags.contains(NoteFlags::AUTO_HOPO),
                });
            }
        }
    }
    chords
}

/// Remaps chords found in `mapping`. Remapped frets take the shortest length of the original chord.
fn apply_chord_mapping(chords: &mut [ChordInfo], mapping: &[(u8, u8)]) {
    for chord in chords {
        let Some(&(_, mapped)) = mapping.iter().find(|(from, _)| *from == chord.frets) else {
            continue;
        };
        let length = (0..5)
            .filter(|i| chord.frets & (1 << i) != 0)
            .map(|i| chord.lengths[i])
            .min()
            .unwrap_or(0);
        chord.frets = mapped;
        for i in (0..5).filter(|i| mapped & (1 << i) != 0) {
            chord.lengths[i] = length;
        }
    }
}

/// Drops chords that land `min_gap` seconds or less after the last kept chord.
fn drop_close_chords(chords: &mut Vec<ChordInfo>, min_gap: f64) {
    let mut last_time: Option<f64> = None;
    chords.retain(|chord| match last_time {
        Some(last) if chord.time - last <= min_gap => false,
        _ => {
            last_time = Some(chord.time);
            true
        }
    });
}

/// A HOPO that repeats the previous chord cannot be played as one.
fn clean_chords(chords: &mut [ChordInfo]) {
    let mut last = 0;
    for chord in chords {
        if chord.hopo && chord.frets == last {
            chord.hopo = false;
            chord.auto_hopo = false;
        }
        last = chord.frets;
    }
}

/// Moves a lone `from` note to `after_match` when the previous chord was `when_previous`,
/// otherwise to `fallback`.
fn replace_lone_fret(chords: &mut [ChordInfo], from: u8, when_previous: u8, after_match: u8, fallback: u8) {
    let mut last = 0;
    for chord in chords {
        if chord.frets == from {
            let target = if last == when_previous { after_match } else { fallback };
            let source = from.trailing_zeros() as usize;
            chord.lengths[target.trailing_zeros() as usize] = chord.lengths[source];
            chord.frets = target;
        }
        last = chord.frets;
    }
}

/// Splits chords back into notes, frets ascending, and rebuilds the chord arena.
fn rebuild(source: &Chart, difficulty: Difficulty, chords: &[ChordInfo], sync: &SyncTrack) -> Chart {
    let mut notes = Vec::new();
    for chord in chords {
        let mut flags = NoteFlags::NONE;
        flags.set(NoteFlags::HOPO, chord.hopo);
        flags.set(NoteFlags::AUTO_HOPO, chord.hopo && chord.auto_hopo);
        flags.set(NoteFlags::TAP, chord.tap);
        for (i, &fret) in FRET_ORDER.iter().enumerate() {
            if chord.frets & (1 << i) == 0 {
                continue;
            }
            let mut note = Note::new(fret, chord.tick, chord.time);
            note.tick_length = chord.lengths[i];
            note.time_length = sync.tick_length_to_time(chord.tick, note.tick_length);
            note.flags = flags;
            notes.push(note);
        }
    }

    let mut chart = group_chords(difficulty, notes, 0, sync);
    chart.phrases = source.phrases.clone();
    chart.text_events = source.text_events.clone();
    tag_phrases(&mut chart);
    resolve_sustains(&mut chart, sync, 0, 0);
    chart
}

pub fn downsample_expert_to_hard(expert: &Chart, sync: &SyncTrack) -> Chart {
    let mut kept = Vec::with_capacity(expert.notes.len());
    let mut removals = 0;
    for note in &expert.notes {
        let mut note = note.clone();
        if note.flags.contains(NoteFlags::AUTO_HOPO) {
            if removals < MAX_CONSECUTIVE_HOPO_REMOVALS {
                removals += 1;
                continue;
            }
            removals = 0;
            note.flags.remove(NoteFlags::HOPO);
        } else {
            removals = 0;
        }
        kept.push(note);
    }

    let mut chords = consolidate(&kept);
    drop_close_chords(&mut chords, EXPERT_TO_HARD_GAP);
    apply_chord_mapping(&mut chords, &CHORD_EXPERT_TO_HARD);
    clean_chords(&mut chords);
    rebuild(expert, Difficulty::Hard, &chords, sync)
}

pub fn downsample_hard_to_medium(hard: &Chart, sync: &SyncTrack) -> Chart {
    let mut chords = consolidate(&hard.notes);
    for chord in &mut chords {
        chord.hopo = false;
        chord.auto_hopo = false;
    }
    apply_chord_mapping(&mut chords, &CHORD_HARD_TO_MEDIUM);
    replace_lone_fret(&mut chords, O, B, R, B);
    drop_close_chords(&mut chords, HARD_TO_MEDIUM_GAP);
    clean_chords(&mut chords);
    rebuild(hard, Difficulty::Medium, &chords, sync)
}

pub fn downsample_medium_to_easy(medium: &Chart, sync: &SyncTrack) -> Chart {
    let mut chords = consolidate(&medium.notes);
    apply_chord_mapping(&mut chords, &CHORD_MEDIUM_TO_EASY);
    replace_lone_fret(&mut chords, B, R, G, R);
    drop_close_chords(&mut chords, MEDIUM_TO_EASY_GAP);
    clean_chords(&mut chords);
    rebuild(medium, Difficulty::Easy, &chords, sync)
}

/// Fills absent Hard, Medium and Easy charts, each from the one above it.
pub fn fill_missing_difficulties(track: &mut InstrumentTrack<FiveFretGuitarFret>, sync: &SyncTrack) {
    let steps: [(Difficulty, Difficulty, fn(&Chart, &SyncTrack) -> Chart); 3] = [
        (Difficulty::Expert, Difficulty::Hard, downsample_expert_to_hard),
        (Difficulty::Hard, Difficulty::Medium, downsample_hard_to_medium),
        (Difficulty::Medium, Difficulty::Easy, downsample_medium_to_easy),
    ];
    for (source, target, downsample) in steps {
        if track.get(target).is_some() {
            continue;
        }
        let Some(chart) = track.get(source).filter(|c| !c.is_empty()) else {
            continue;
        };
        let generated = downsample(chart, sync);
        log::info!(
            "generated {:?} {target:?} from {source:?} ({} notes)",
            track.instrument,
            generated.notes.len()
        );
        track.insert(generated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chart_schema::{Instrument, Phrase, PhraseType};
    use FiveFretGuitarFret::*;

    /// One chord every half second at 120 BPM, resolution 192.
    fn chart(chords: &[(&[FiveFretGuitarFret], NoteFlags)]) -> Chart {
        let sync = SyncTrack::default();
        let notes = chords
            .iter()
            .enumerate()
            .flat_map(|(i, (frets, flags))| {
                let tick = i as Tick * 192;
                let sync = &sync;
                frets.iter().map(move |&fret| {
                    let mut note = Note::new(fret, tick, sync.tick_to_time(tick));
                    note.flags = *flags;
                    note
                })
            })
            .collect();
        group_chords(Difficulty::Expert, notes, 0, &sync)
    }

    fn frets(chart: &Chart) -> Vec<Vec<FiveFretGuitarFret>> {
        (0..chart.chord_count())
            .map(|c| chart.chord_notes(c).iter().map(|n| n.lane).collect())
            .collect()
    }

    const AUTO: NoteFlags = NoteFlags::from_bits(NoteFlags::HOPO.bits() | NoteFlags::AUTO_HOPO.bits());

    #[test]
    fn expert_chords_follow_the_table() {
        let sync = SyncTrack::default();
        let expert = chart(&[
            (&[Green, Red, Yellow, Blue, Orange], NoteFlags::NONE),
            (&[Green, Yellow, Orange], NoteFlags::NONE),
            (&[Red, Yellow, Blue], NoteFlags::NONE),
            (&[Green, Blue], NoteFlags::NONE),
        ]);
        let hard = downsample_expert_to_hard(&expert, &sync);
        assert_eq!(hard.difficulty, Difficulty::Hard);
        assert_eq!(
            frets(&hard),
            vec![vec![Green, Orange], vec![Red, Blue], vec![Red, Blue], vec![Green, Blue]]
        );
    }

    #[test]
    fn third_auto_hopo_in_a_row_is_kept_as_strum() {
        let sync = SyncTrack::default();
        let expert = chart(&[
            (&[Green], NoteFlags::NONE),
            (&[Red], AUTO),
            (&[Yellow], AUTO),
            (&[Blue], AUTO),
            (&[Orange], AUTO),
        ]);
        let hard = downsample_expert_to_hard(&expert, &sync);
        assert_eq!(frets(&hard), vec![vec![Green], vec![Blue]]);
        assert!(!hard.notes[1].is_hopo());
    }

    #[test]
    fn close_chords_are_dropped() {
        let sync = SyncTrack::default();
        let notes = vec![
            Note::new(Green, 0, 0.0),
            Note::new(Red, 38, sync.tick_to_time(38)),
            Note::new(Yellow, 96, sync.tick_to_time(96)),
        ];
        let expert = group_chords(Difficulty::Expert, notes, 0, &sync);
        let hard = downsample_expert_to_hard(&expert, &sync);
        assert_eq!(frets(&hard), vec![vec![Green], vec![Yellow]]);
    }

    #[test]
    fn mapped_chord_takes_shortest_length() {
        let sync = SyncTrack::default();
        let mut notes = vec![
            Note::new(Green, 0, 0.0),
            Note::new(Red, 0, 0.0),
            Note::new(Yellow, 0, 0.0),
        ];
        for (note, length) in notes.iter_mut().zip([96, 48, 192]) {
            note.tick_length = length;
        }
        let expert = group_chords(Difficulty::Expert, notes, 0, &sync);
        let hard = downsample_expert_to_hard(&expert, &sync);
        assert!(hard.notes.iter().all(|n| n.tick_length == 48));
        assert!((hard.notes[0].time_length - 0.125).abs() < 1e-9);
    }

    #[test]
    fn repeated_hopo_chord_becomes_strum() {
        let sync = SyncTrack::default();
        let expert = chart(&[
            (&[Green, Red, Yellow], NoteFlags::NONE),
            (&[Green, Yellow], NoteFlags::HOPO),
        ]);
        let hard = downsample_expert_to_hard(&expert, &sync);
        assert_eq!(frets(&hard), vec![vec![Green, Yellow], vec![Green, Yellow]]);
        assert!(hard.notes.iter().all(|n| !n.is_hopo()));
    }

    #[test]
    fn lone_orange_and_blue_move_down() {
        let sync = SyncTrack::default();
        let hard = chart(&[
            (&[Orange], NoteFlags::NONE),
            (&[Blue], NoteFlags::HOPO),
            (&[Orange], NoteFlags::NONE),
        ]);
        let medium = downsample_hard_to_medium(&hard, &sync);
        assert_eq!(frets(&medium), vec![vec![Blue], vec![Blue], vec![Red]]);
        assert!(medium.notes.iter().all(|n| !n.is_hopo()));

        let easy = downsample_medium_to_easy(&medium, &sync);
        // the second blue follows the first, which became red
        assert_eq!(frets(&easy), vec![vec![Red], vec![Green], vec![Red]]);
    }

    #[test]
    fn output_is_deterministic_and_keeps_phrases() {
        let sync = SyncTrack::default();
        let mut expert = chart(&[
            (&[Green], NoteFlags::NONE),
            (&[Red, Yellow], NoteFlags::NONE),
            (&[Blue], AUTO),
            (&[Green, Red, Orange], NoteFlags::NONE),
        ]);
        expert.phrases.push(Phrase {
            kind: PhraseType::StarPower,
            tick: 192,
            tick_length: 192,
            time: 0.5,
            time_length: 0.5,
        });

        let first = downsample_expert_to_hard(&expert, &sync);
        let second = downsample_expert_to_hard(&expert, &sync);
        assert_eq!(first, second);

        let star_power: Vec<bool> = first.notes.iter().map(|n| n.is_star_power()).collect();
        assert_eq!(star_power, vec![false, true, true, false, false]);
    }

    #[test]
    fn fills_only_missing_difficulties() {
        let sync = SyncTrack::default();
        let mut track = InstrumentTrack::new(Instrument::FiveFretGuitar);
        track.insert(chart(&[(&[Green], NoteFlags::NONE), (&[Red], NoteFlags::NONE)]));
        let mut medium = chart(&[(&[Yellow], NoteFlags::NONE)]);
        medium.difficulty = Difficulty::Medium;
        track.insert(medium.clone());

        fill_missing_difficulties(&mut track, &sync);

        assert!(track.get(Difficulty::Hard).is_some());
        assert_eq!(track.get(Difficulty::Medium), Some(&medium));
        let easy = track.get(Difficulty::Easy).unwrap();
        assert_eq!(frets(easy), vec![vec![Yellow]]);
    }
}
