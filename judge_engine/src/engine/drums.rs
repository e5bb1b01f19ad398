use chart_schema::{DrumPad, InstrumentDifficulty, Note, NoteFlags, SyncTrack};

use super::{Engine, EngineCore, POINTS_PER_NOTE};
use crate::input::events::{DrumsAction, GameInput};
use crate::params::DrumsParameters;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PadHit {
    pub pad: DrumPad,
    pub cymbal: bool,
    pub velocity: f32,
}

impl PadHit {
    pub fn from_action(action: DrumsAction, velocity: f32) -> Self {
        let (pad, cymbal) = match action {
            DrumsAction::Kick => (DrumPad::Kick, false),
            DrumsAction::RedDrum => (DrumPad::Red, false),
            DrumsAction::YellowDrum => (DrumPad::Yellow, false),
            DrumsAction::BlueDrum => (DrumPad::Blue, false),
            DrumsAction::GreenDrum => (DrumPad::Orange, false),
            DrumsAction::YellowCymbal => (DrumPad::Yellow, true),
            DrumsAction::BlueCymbal => (DrumPad::Blue, true),
            DrumsAction::GreenCymbal => (DrumPad::Orange, true),
            DrumsAction::FiveLaneGreen => (DrumPad::Green, false),
        };
        Self { pad, cymbal, velocity }
    }

    fn perfect_for(note: &Note<DrumPad>) -> Self {
        Self {
            pad: note.lane,
            cymbal: note.flags.contains(NoteFlags::CYMBAL),
            velocity: 1.0,
        }
    }
}

pub struct DrumsEngine {
    core: EngineCore<DrumPad>,
    params: DrumsParameters,
    pending: Option<PadHit>,
}

impl DrumsEngine {
    pub fn new(chart: &InstrumentDifficulty<DrumPad>, sync: &SyncTrack, params: DrumsParameters, bot: bool) -> Self {
        Self {
            core: EngineCore::new(chart, sync, params.base.clone(), bot, true),
            params,
            pending: None,
        }
    }

    fn matches(&self, note: &Note<DrumPad>, hit: &PadHit) -> bool {
        if note.lane != hit.pad {
            return false;
        }
        !self.params.pro_drums || !note.lane.can_be_cymbal() || note.flags.contains(NoteFlags::CYMBAL) == hit.cymbal
    }

    fn velocity_bonus(&self, note: &Note<DrumPad>, hit: &PadHit) -> bool {
        if self.core.is_bot() {
            return note.flags.intersects(NoteFlags::ACCENT | NoteFlags::GHOST);
        }
        let threshold = self.params.velocity_threshold;
        if note.flags.contains(NoteFlags::GHOST) {
            hit.velocity < threshold
        } else if note.flags.contains(NoteFlags::ACCENT) {
            hit.velocity > 1.0 - threshold
        } else {
            false
        }
    }

    /// Resolves the pending pad hit against the reachable chords; an unmatched hit is an overhit.
    fn check_for_note_hit(&mut self, time: f64) {
        let Some(hit) = self.pending.take() else {
            return;
        };

        for chord in self.core.cursor()..self.core.chord_count() {
            if !self.core.is_chord_in_window(chord, time) {
                break;
            }
            let found = self.core.chart().chords[chord]
                .range()
                .find(|&n| !self.core.is_resolved(n) && self.matches(&self.core.notes()[n], &hit));

            if let Some(note) = found {
                let bonus = self.velocity_bonus(&self.core.notes()[note], &hit);
                self.core.hit_note(note, time, false);
                if bonus {
                    let points = POINTS_PER_NOTE / 2;
                    log::trace!("velocity bonus of {points} for note {note}");
                    self.core.add_score(points);
                }
                return;
            }
        }

        log::trace!("{:?} pad hit nothing at {time}", hit.pad);
        self.core.overhit(time);
    }

    /// Hits every note of every chord that is due at `time`, one pad per note.
    fn run_bot(&mut self, time: f64) {
        while !self.core.is_done() {
            let chord = self.core.cursor();
            if time < self.core.parent_time(chord) {
                break;
            }
            for note in self.core.chart().chords[chord].range() {
                if self.core.is_resolved(note) {
                    continue;
                }
                self.pending = Some(PadHit::perfect_for(&self.core.notes()[note]));
                self.check_for_note_hit(time);
            }
            if self.core.cursor() == chord {
                break;
            }
        }
    }
}

impl Engine for DrumsEngine {
    type Lane = DrumPad;

    fn core(&self) -> &EngineCore<DrumPad> {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EngineCore<DrumPad> {
        &mut self.core
    }

    fn mutate_state(&mut self, input: GameInput) {
        let action = match DrumsAction::try_from(input.action) {
            Ok(action) => action,
            Err(id) => {
                log::debug!("ignoring unknown drums action {id} at {}", input.time);
                return;
            }
        };
        // Releases carry no velocity.
        if input.value > 0.0 {
            self.pending = Some(PadHit::from_action(action, input.value.min(1.0)));
        }
    }

    fn step(&mut self, time: f64) {
        self.core.begin_step(time);
        self.core.miss_expired(time, true);

        if self.core.is_bot() {
            self.run_bot(time);
        }
        self.check_for_note_hit(time);
    }
}
