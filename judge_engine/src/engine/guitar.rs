use chart_schema::{FiveFretGuitarFret, InstrumentDifficulty, NoteFlags, SyncTrack};

use super::{Engine, EngineCore};
use crate::input::events::{GameInput, GuitarAction};
use crate::params::FiveFretParameters;

/// Bit standing for "no fret held" so open notes compare like any other mask.
pub const OPEN_MASK: u8 = 1 << 6;

/// Five fret guitar, bass and keys.
pub struct FiveFretEngine {
    core: EngineCore<FiveFretGuitarFret>,
    params: FiveFretParameters,
    chord_masks: Vec<u8>,
    button_mask: u8,
    has_fretted: bool,
    has_strummed: bool,
    has_tapped: bool,
    star_power_requested: bool,
    hopo_leniency_end: Option<f64>,
    strum_leniency_end: Option<f64>,
    front_end_expire_time: f64,
}

impl FiveFretEngine {
    pub fn new(
        chart: &InstrumentDifficulty<FiveFretGuitarFret>,
        sync: &SyncTrack,
        params: FiveFretParameters,
        bot: bool,
    ) -> Self {
        let core = EngineCore::new(chart, sync, params.base.clone(), bot, false);
        let chord_masks = (0..chart.chord_count())
            .map(|c| chart.chord_notes(c).iter().fold(0, |mask, n| mask | lane_mask(n.lane)))
            .collect();

        Self {
            core,
            params,
            chord_masks,
            button_mask: OPEN_MASK,
            has_fretted: false,
            has_strummed: false,
            has_tapped: true,
            star_power_requested: false,
            hopo_leniency_end: None,
            strum_leniency_end: None,
            front_end_expire_time: 0.0,
        }
    }

    pub fn button_mask(&self) -> u8 {
        self.button_mask
    }

    fn toggle_fret(&mut self, bit: u8, pressed: bool) {
        if pressed {
            self.button_mask |= bit;
        } else {
            self.button_mask &= !bit;
        }

        if self.button_mask & !OPEN_MASK == 0 {
            self.button_mask |= OPEN_MASK;
        } else {
            self.button_mask &= !OPEN_MASK;
        }
    }

    fn update_timers(&mut self, time: f64) {
        if self.hopo_leniency_end.is_some_and(|end| time >= end) {
            self.hopo_leniency_end = None;
        }
        // Once the last chord resolves a pending strum can only be an overstrum.
        if self.strum_leniency_end.is_some_and(|end| time >= end || self.core.is_done()) {
            log::trace!("strum leniency expired at {time}");
            self.strum_leniency_end = None;
            self.core.overhit(time);
        }
    }

    fn handle_strum(&mut self, time: f64) {
        if self.hopo_leniency_end.is_some() {
            // A HOPO hit swallows exactly one strum.
            log::trace!("strum eaten by hopo leniency at {time}");
            self.hopo_leniency_end = None;
            self.strum_leniency_end = None;
            return;
        }

        if self.strum_leniency_end.is_some() {
            log::trace!("double strum at {time}");
            self.core.overhit(time);
        }
        if self.core.is_done() {
            log::trace!("strum after the last chord at {time}");
            self.core.overhit(time);
            return;
        }

        let in_window = self.core.is_chord_in_window(self.core.cursor(), time);
        let leniency = if in_window {
            self.params.strum_leniency
        } else {
            self.params.strum_leniency_small
        };
        self.strum_leniency_end = Some(time + leniency);
    }

    /// Plays every chord that is due at `time`.
    fn run_bot(&mut self, time: f64) {
        while !self.core.is_done() {
            let chord = self.core.cursor();
            if time < self.core.parent_time(chord) {
                break;
            }
            self.update_bot(chord, time);
            self.check_for_note_hit(time);
            if self.core.cursor() == chord {
                break;
            }
        }
    }

    fn update_bot(&mut self, chord: usize, time: f64) {
        let mask = self.chord_masks[chord];
        self.has_tapped = mask != self.button_mask;
        self.button_mask = mask;
        self.has_strummed = false;
        self.strum_leniency_end = Some(time + self.params.strum_leniency);
        log::trace!("[bot] set button mask to {mask:#09b}");
    }

    fn check_for_note_hit(&mut self, time: f64) {
        let cursor = self.core.cursor();
        let combo = self.core.stats().combo;

        for chord in cursor..self.core.chord_count() {
            let first = chord == cursor;
            let note_time = self.core.parent_time(chord);
            if !self.core.hit_window(chord).contains(note_time, time) {
                break;
            }

            let flags = self.core.chord_flags(chord);
            let is_hopo = flags.contains(NoteFlags::HOPO);
            let is_tap = flags.contains(NoteFlags::TAP);

            if !self.can_hit(chord) {
                log::trace!("can't hit chord {chord} with buttons {:#09b} at {time}", self.button_mask);
                // No skipping past a first note that is a HOPO or tap.
                if (is_hopo || is_tap) && cursor == 0 {
                    break;
                }
                continue;
            }

            let hopo_condition = is_hopo && first && (combo > 0 || cursor == 0);
            let tap_condition = is_tap && (first || combo == 0);
            let front_end_expired = note_time > self.front_end_expire_time;
            let can_use_front_end = self.params.infinite_front_end || !front_end_expired || cursor == 0;

            if self.has_tapped && (hopo_condition || tap_condition) && can_use_front_end {
                log::trace!("hit chord {chord} with hopo rules at {time}");
                self.hit(chord, is_hopo || is_tap, time);
                break;
            }

            if (self.has_strummed || self.strum_leniency_end.is_some()) && (first || (cursor > 0 && combo == 0)) {
                log::trace!("hit chord {chord} with strum at {time}");
                self.hit(chord, false, time);
                break;
            }
        }
    }

    fn can_hit(&self, chord: usize) -> bool {
        let flags = self.core.chord_flags(chord);
        let is_strum = !flags.intersects(NoteFlags::HOPO | NoteFlags::TAP);
        is_mask_hittable(self.chord_masks[chord], self.button_mask, flags.contains(NoteFlags::CHORD), is_strum)
    }

    fn hit(&mut self, chord: usize, hopo_or_tap: bool, time: f64) {
        if hopo_or_tap {
            self.has_tapped = false;
            self.hopo_leniency_end = Some(time + self.params.hopo_leniency);
        } else {
            self.has_tapped = true;
            self.front_end_expire_time = f64::INFINITY;
        }
        self.strum_leniency_end = None;
        self.core.hit_chord(chord, time);
    }
}

fn lane_mask(lane: FiveFretGuitarFret) -> u8 {
    match lane {
        FiveFretGuitarFret::Open => OPEN_MASK,
        fret => fret.mask(),
    }
}

/// Whether holding `buttons` hits a chord with `note_mask`.
///
/// Single notes allow anchoring lower frets; strum chords need the exact mask;
/// HOPO and tap chords allow anchoring below their lowest fret.
pub fn is_mask_hittable(note_mask: u8, buttons: u8, is_chord: bool, is_strum: bool) -> bool {
    // Open chords never anchor.
    if note_mask & OPEN_MASK != 0 && note_mask != OPEN_MASK && buttons | OPEN_MASK == note_mask {
        return true;
    }

    if buttons == note_mask {
        return true;
    }

    let anchor = buttons ^ note_mask;

    if is_chord {
        if is_strum {
            return false;
        }
        let lowest = 1u8 << note_mask.trailing_zeros().min(7);
        return lowest >= anchor && buttons.wrapping_sub(anchor) == note_mask;
    }

    anchor < (note_mask & !OPEN_MASK)
}

impl Engine for FiveFretEngine {
    type Lane = FiveFretGuitarFret;

    fn core(&self) -> &EngineCore<FiveFretGuitarFret> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EngineCore<FiveFretGuitarFret> {
        &mut self.core
    }

    fn mutate_state(&mut self, input: GameInput) {
        let action = match GuitarAction::try_from(input.action) {
            Ok(action) => action,
            Err(id) => {
                log::debug!("ignoring unknown guitar action {id} at {}", input.time);
                return;
            }
        };

        match action {
            GuitarAction::StarPower => self.star_power_requested = input.is_pressed(),
            GuitarAction::Whammy => {}
            GuitarAction::StrumUp | GuitarAction::StrumDown => {
                if input.is_pressed() {
                    self.has_strummed = true;
                }
            }
            fret => {
                if let Some(bit) = fret.fret_bit() {
                    self.has_fretted = true;
                    self.toggle_fret(bit, input.is_pressed());
                }
            }
        }
    }

    fn step(&mut self, time: f64) {
        self.core.begin_step(time);
        if self.star_power_requested && self.core.activate_star_power(time) {
            self.star_power_requested = false;
        }
        if self.core.miss_expired(time, false) {
            self.has_tapped = false;
        }
        self.update_timers(time);

        if self.has_strummed {
            self.handle_strum(time);
        }

        if self.core.is_bot() {
            self.run_bot(time);
        } else if !self.core.is_done() {
            if self.has_fretted {
                self.has_tapped = true;
                let window = self.core.hit_window(self.core.cursor());
                self.front_end_expire_time = time + window.front_end.abs();
            }
            self.check_for_note_hit(time);
        }

        self.has_strummed = false;
        self.has_fretted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const G: u8 = 1;
    const R: u8 = 2;
    const Y: u8 = 4;
    const B: u8 = 8;

    #[test]
    fn single_notes_allow_lower_anchors() {
        assert!(is_mask_hittable(Y, Y, false, true));
        assert!(is_mask_hittable(Y, G | Y, false, true));
        assert!(!is_mask_hittable(Y, Y | B, false, true));
        assert!(!is_mask_hittable(G, R, false, true));
    }

    #[test]
    fn strum_chords_need_exact_mask() {
        assert!(is_mask_hittable(R | Y, R | Y, true, true));
        assert!(!is_mask_hittable(R | Y, G | R | Y, true, true));
        assert!(is_mask_hittable(R | Y, G | R | Y, true, false));
        assert!(!is_mask_hittable(G | Y, G | R | Y, true, false));
    }

    #[test]
    fn open_notes_need_empty_hands() {
        assert!(is_mask_hittable(OPEN_MASK, OPEN_MASK, false, true));
        assert!(!is_mask_hittable(OPEN_MASK, G, false, true));
        assert!(is_mask_hittable(OPEN_MASK | R, R, true, true));
    }
}
