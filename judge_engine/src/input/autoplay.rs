//! Input streams that play a chart flawlessly through the regular input path.

use chart_schema::{DrumPad, FiveFretGuitarFret, InstrumentDifficulty, Note, NoteFlags};

use super::events::{DrumsAction, GameInput, GuitarAction};

/// Frets for a chord change this long before the chord.
pub const FRET_LEAD: f64 = 0.005;

const FRETS: [(FiveFretGuitarFret, GuitarAction); 5] = [
    (FiveFretGuitarFret::Green, GuitarAction::GreenFret),
    (FiveFretGuitarFret::Red, GuitarAction::RedFret),
    (FiveFretGuitarFret::Yellow, GuitarAction::YellowFret),
    (FiveFretGuitarFret::Blue, GuitarAction::BlueFret),
    (FiveFretGuitarFret::Orange, GuitarAction::OrangeFret),
];

const ACCENT_VELOCITY: f32 = 1.0;
const GHOST_VELOCITY: f32 = 0.2;
const NORMAL_VELOCITY: f32 = 0.8;

/// Fret changes just ahead of every chord and a strum on it.
///
/// Releases come before presses so the held frets never pass through a
/// wider mask than either chord. HOPO and tap chords are hit by the fret
/// change and their strum is eaten by the HOPO leniency.
pub fn five_fret_inputs(chart: &InstrumentDifficulty<FiveFretGuitarFret>) -> Vec<GameInput> {
    let mut inputs = Vec::new();
    let mut held = [false; FRETS.len()];

    for chord in 0..chart.chord_count() {
        let time = chart.parent(chord).time;
        let notes = chart.chord_notes(chord);
        let wanted = FRETS.map(|(lane, _)| notes.iter().any(|n| n.lane == lane));

        for pressed in [false, true] {
            for (i, &(_, action)) in FRETS.iter().enumerate() {
                if wanted[i] == pressed && held[i] != pressed {
                    inputs.push(GameInput::button(time - FRET_LEAD, action.into(), pressed));
                    held[i] = pressed;
                }
            }
        }
        inputs.push(GameInput::button(time, GuitarAction::StrumDown.into(), true));
    }

    inputs
}

/// One pad hit per note, with a velocity that earns the accent and ghost bonus.
pub fn drums_inputs(chart: &InstrumentDifficulty<DrumPad>) -> Vec<GameInput> {
    chart
        .notes
        .iter()
        .map(|note| GameInput::new(note.time, pad_action(note).into(), velocity_for(note)))
        .collect()
}

fn pad_action(note: &Note<DrumPad>) -> DrumsAction {
    let cymbal = note.flags.contains(NoteFlags::CYMBAL);
    match (note.lane, cymbal) {
        (DrumPad::Kick, _) => DrumsAction::Kick,
        (DrumPad::Red, _) => DrumsAction::RedDrum,
        (DrumPad::Yellow, false) => DrumsAction::YellowDrum,
        (DrumPad::Yellow, true) => DrumsAction::YellowCymbal,
        (DrumPad::Blue, false) => DrumsAction::BlueDrum,
        (DrumPad::Blue, true) => DrumsAction::BlueCymbal,
        (DrumPad::Orange, false) => DrumsAction::GreenDrum,
        (DrumPad::Orange, true) => DrumsAction::GreenCymbal,
        (DrumPad::Green, _) => DrumsAction::FiveLaneGreen,
    }
}

fn velocity_for(note: &Note<DrumPad>) -> f32 {
    if note.flags.contains(NoteFlags::ACCENT) {
        ACCENT_VELOCITY
    } else if note.flags.contains(NoteFlags::GHOST) {
        GHOST_VELOCITY
    } else {
        NORMAL_VELOCITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chart_schema::Difficulty;

    fn single(chart: &mut InstrumentDifficulty<FiveFretGuitarFret>, lane: FiveFretGuitarFret, time: f64) {
        chart.start_chord(Note::new(lane, (time * 384.0) as u32, time));
    }

    #[test]
    fn releases_come_before_presses() {
        let mut chart = InstrumentDifficulty::new(Difficulty::Expert);
        single(&mut chart, FiveFretGuitarFret::Green, 1.0);
        single(&mut chart, FiveFretGuitarFret::Red, 2.0);

        let inputs = five_fret_inputs(&chart);
        let green = u8::from(GuitarAction::GreenFret);
        let red = u8::from(GuitarAction::RedFret);
        let strum = u8::from(GuitarAction::StrumDown);

        assert_eq!(
            inputs,
            vec![
                GameInput::button(1.0 - FRET_LEAD, green, true),
                GameInput::button(1.0, strum, true),
                GameInput::button(2.0 - FRET_LEAD, green, false),
                GameInput::button(2.0 - FRET_LEAD, red, true),
                GameInput::button(2.0, strum, true),
            ]
        );
    }

    #[test]
    fn open_notes_release_every_fret() {
        let mut chart = InstrumentDifficulty::new(Difficulty::Expert);
        single(&mut chart, FiveFretGuitarFret::Yellow, 1.0);
        single(&mut chart, FiveFretGuitarFret::Open, 2.0);

        let inputs = five_fret_inputs(&chart);
        assert_eq!(inputs[2], GameInput::button(2.0 - FRET_LEAD, GuitarAction::YellowFret.into(), false));
        assert_eq!(inputs.len(), 4);
    }

    #[test]
    fn drum_hits_pick_pad_and_velocity() {
        let mut chart = InstrumentDifficulty::new(Difficulty::Expert);
        let mut cymbal = Note::new(DrumPad::Blue, 0, 0.5);
        cymbal.flags = NoteFlags::CYMBAL | NoteFlags::ACCENT;
        chart.start_chord(cymbal);
        let mut ghost = Note::new(DrumPad::Red, 192, 1.0);
        ghost.flags = NoteFlags::GHOST;
        chart.start_chord(ghost);

        let inputs = drums_inputs(&chart);
        assert_eq!(inputs[0], GameInput::new(0.5, DrumsAction::BlueCymbal.into(), ACCENT_VELOCITY));
        assert_eq!(inputs[1], GameInput::new(1.0, DrumsAction::RedDrum.into(), GHOST_VELOCITY));
    }
}
