use chart_schema::{Difficulty, DrumPad, InstrumentDifficulty, NoteFlags};

use super::{convert_notes, finish_difficulty, group_chords, NormalizeContext};
use crate::flags::RawNoteFlags;
use crate::raw::RawChart;

fn drum_lane(lane: u8) -> Option<DrumPad> {
    Some(match lane {
        0 => DrumPad::Kick,
        1 => DrumPad::Red,
        2 => DrumPad::Yellow,
        3 => DrumPad::Blue,
        4 => DrumPad::Orange,
        5 => DrumPad::Green,
        _ => return None,
    })
}

pub(crate) fn build_drums(difficulty: Difficulty, raw: &RawChart, ctx: &NormalizeContext) -> InstrumentDifficulty<DrumPad> {
    build(difficulty, raw, ctx, false)
}

/// Expert with the extra kicks, when the Expert chart has any.
pub(crate) fn build_expert_plus(
    difficulty: Difficulty,
    raw: &RawChart,
    ctx: &NormalizeContext,
) -> Option<InstrumentDifficulty<DrumPad>> {
    let has_plus = raw.notes.iter().any(|n| n.flags.contains(RawNoteFlags::INSTRUMENT_PLUS));
    (difficulty == Difficulty::Expert && has_plus).then(|| build(Difficulty::ExpertPlus, raw, ctx, true))
}

fn build(difficulty: Difficulty, raw: &RawChart, ctx: &NormalizeContext, plus: bool) -> InstrumentDifficulty<DrumPad> {
    let (notes, raw_flags) = convert_notes(raw, drum_lane, ctx.sync, |flags| {
        plus || !flags.contains(RawNoteFlags::INSTRUMENT_PLUS)
    });
    let mut chart = group_chords(difficulty, notes, ctx.snap, ctx.sync);

    for (note, flags) in chart.notes.iter_mut().zip(raw_flags) {
        if flags.contains(RawNoteFlags::CYMBAL) && note.lane.can_be_cymbal() {
            note.flags.insert(NoteFlags::CYMBAL);
        }
        if flags.contains(RawNoteFlags::ACCENT) {
            note.flags.insert(NoteFlags::ACCENT);
        }
        if flags.contains(RawNoteFlags::GHOST) {
            note.flags.insert(NoteFlags::GHOST);
        }
        if flags.contains(RawNoteFlags::INSTRUMENT_PLUS) {
            note.flags.insert(NoteFlags::DOUBLE_KICK);
        }
    }

    finish_difficulty(&mut chart, raw, ctx);
    chart
}
