use chart_schema::{Difficulty, FiveFretGuitarFret, InstrumentDifficulty, NoteFlags, Tick};

use super::{convert_notes, finish_difficulty, group_chords, NormalizeContext};
use crate::flags::RawNoteFlags;
use crate::raw::RawChart;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NoteType {
    Strum,
    Hopo,
    Tap,
}

pub(crate) fn five_fret_lane(lane: u8) -> Option<FiveFretGuitarFret> {
    Some(match lane {
        0 => FiveFretGuitarFret::Open,
        1 => FiveFretGuitarFret::Green,
        2 => FiveFretGuitarFret::Red,
        3 => FiveFretGuitarFret::Yellow,
        4 => FiveFretGuitarFret::Blue,
        5 => FiveFretGuitarFret::Orange,
        _ => return None,
    })
}

pub(crate) fn build_guitar<L: Copy + Ord>(
    difficulty: Difficulty,
    raw: &RawChart,
    lane_of: fn(u8) -> Option<L>,
    ctx: &NormalizeContext,
) -> InstrumentDifficulty<L> {
    let (notes, raw_flags) = convert_notes(raw, lane_of, ctx.sync, |_| true);
    let mut chart = group_chords(difficulty, notes, ctx.snap, ctx.sync);
    apply_note_types(&mut chart, &raw_flags, ctx);
    finish_difficulty(&mut chart, raw, ctx);
    chart
}

fn is_natural_hopo<L: PartialEq>(chart: &InstrumentDifficulty<L>, chord: usize, threshold: Tick) -> bool {
    let Some(prev) = chart.previous_chord(chord) else {
        return false;
    };
    if chart.chords[chord].len > 1 {
        return false;
    }
    let note = chart.parent(chord);
    let prev_parent = chart.parent(prev);
    let changes_fret = chart.chords[prev].len > 1 || prev_parent.lane != note.lane;
    changes_fret && note.tick - prev_parent.tick <= threshold
}

fn follows_chord_with_same_fret<L: PartialEq>(chart: &InstrumentDifficulty<L>, chord: usize) -> bool {
    let Some(prev) = chart.previous_chord(chord) else {
        return false;
    };
    let lane = &chart.parent(chord).lane;
    chart.chords[prev].len > 1 && chart.chord_notes(prev).iter().any(|n| n.lane == *lane)
}

/// Sets strum, HOPO and tap on every chord from forcing flags and the HOPO threshold.
pub(crate) fn apply_note_types<L: PartialEq>(
    chart: &mut InstrumentDifficulty<L>,
    raw_flags: &[RawNoteFlags],
    ctx: &NormalizeContext,
) {
    for chord in 0..chart.chord_count() {
        let flags = raw_flags[chart.chords[chord].range()]
            .iter()
            .fold(RawNoteFlags::NONE, |acc, &f| acc | f);
        let natural = is_natural_hopo(chart, chord, ctx.hopo_threshold);
        let forced = flags.intersects(RawNoteFlags::FORCED | RawNoteFlags::FORCED_HOPO | RawNoteFlags::FORCED_STRUM);

        let kind = if flags.contains(RawNoteFlags::TAP) {
            NoteType::Tap
        } else if flags.contains(RawNoteFlags::FORCED_HOPO) {
            NoteType::Hopo
        } else if flags.contains(RawNoteFlags::FORCED_STRUM) {
            NoteType::Strum
        } else if natural != flags.contains(RawNoteFlags::FORCED) {
            if natural && !forced && ctx.chord_hopo_cancellation && follows_chord_with_same_fret(chart, chord) {
                NoteType::Strum
            } else {
                NoteType::Hopo
            }
        } else {
            NoteType::Strum
        };

        let note_flags = match kind {
            NoteType::Strum => NoteFlags::NONE,
            NoteType::Tap => NoteFlags::TAP,
            NoteType::Hopo if natural && !forced => NoteFlags::HOPO | NoteFlags::AUTO_HOPO,
            NoteType::Hopo => NoteFlags::HOPO,
        };
        for note in chart.chord_notes_mut(chord) {
            note.flags.remove(NoteFlags::HOPO | NoteFlags::AUTO_HOPO | NoteFlags::TAP);
            note.flags.insert(note_flags);
        }
    }
}
