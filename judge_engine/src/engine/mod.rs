use std::collections::VecDeque;

use chart_schema::{InstrumentDifficulty, Note, NoteFlags, SyncTrack};
use serde::{Deserialize, Serialize};

use crate::input::events::GameInput;
use crate::params::EngineParameters;
use crate::stats::EngineStats;

pub mod drums;
pub mod guitar;

pub const POINTS_PER_NOTE: u32 = 50;
pub const STAR_POWER_PHRASE_AMOUNT: f64 = 0.25;
pub const STAR_POWER_ACTIVATION_AMOUNT: f64 = 0.5;
/// Bar drained per elapsed measure while star power is active.
pub const STAR_POWER_DRAIN_PER_MEASURE: f64 = 1.0 / 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    Active,
    Finished,
}

/// Per resolution notifications for the presentation layer.
///
/// `note` is an index into the engine's note arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    NoteHit { note: usize, time: f64 },
    NoteMissed { note: usize, time: f64 },
    Overhit { time: f64 },
    StarPowerPhraseHit { note: usize },
    StarPowerStatus(bool),
    SoloStart { note_count: u32 },
    SoloEnd { notes_hit: u32, note_count: u32, bonus: u32 },
}

/// Offsets around a note time inside which the note can be hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitWindow {
    pub front_end: f64,
    pub back_end: f64,
}

impl HitWindow {
    pub fn contains(&self, note_time: f64, time: f64) -> bool {
        note_time + self.front_end <= time && time <= note_time + self.back_end
    }

    pub fn is_missed(&self, note_time: f64, time: f64) -> bool {
        time > note_time + self.back_end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SoloSection {
    note_count: u32,
    notes_hit: u32,
}

/// 0 below 60% hit, then scales up to 100 points per hit note, rounded down to 50.
pub fn solo_bonus(notes_hit: u32, note_count: u32) -> u32 {
    if note_count == 0 {
        return 0;
    }
    let percent = notes_hit as f64 / note_count as f64;
    if percent < 0.6 {
        return 0;
    }
    let points = 100.0 * notes_hit as f64 * ((percent - 0.6) / 0.4).clamp(0.0, 1.0);
    let points = points as u32;
    points - points % 50
}

/// State shared by every front end: cursor, scoring, star power and solos.
pub struct EngineCore<L> {
    chart: InstrumentDifficulty<L>,
    sync: SyncTrack,
    params: EngineParameters,
    bot: bool,
    /// Drums count every note of a chord on its own.
    separate_chord_notes: bool,
    state: EngineState,
    cursor: usize,
    current_time: f64,
    last_queued_time: f64,
    inputs: VecDeque<GameInput>,
    stats: EngineStats,
    events: Vec<EngineEvent>,
    star_thresholds: Vec<f64>,
    star_index: usize,
    solos: Vec<SoloSection>,
    current_solo: usize,
    solo_active: bool,
}

impl<L: Clone> EngineCore<L> {
    pub(crate) fn new(
        chart: &InstrumentDifficulty<L>,
        sync: &SyncTrack,
        mut params: EngineParameters,
        bot: bool,
        separate_chord_notes: bool,
    ) -> Self {
        params.hit_window = params.hit_window.sanitized();

        let mut chart = chart.clone();
        for note in &mut chart.notes {
            note.was_hit = false;
            note.was_missed = false;
        }

        let base_score = (POINTS_PER_NOTE as usize * chart.notes.len()) as f64;
        let star_thresholds = params
            .star_multiplier_thresholds
            .iter()
            .map(|m| m * base_score)
            .collect();

        let stats = EngineStats {
            multiplier: 1,
            total_notes: chart.notes.len() as u32,
            total_star_power_phrases: (0..chart.chord_count())
                .filter(|&c| {
                    chart
                        .chord_flags(c)
                        .contains(NoteFlags::STAR_POWER | NoteFlags::STAR_POWER_END)
                })
                .count() as u32,
            ..EngineStats::default()
        };
        let solos = solo_sections(&chart, separate_chord_notes);

        Self {
            chart,
            sync: sync.clone(),
            params,
            bot,
            separate_chord_notes,
            state: EngineState::Idle,
            cursor: 0,
            current_time: f64::NEG_INFINITY,
            last_queued_time: f64::NEG_INFINITY,
            inputs: VecDeque::new(),
            stats,
            events: Vec::new(),
            star_thresholds,
            star_index: 0,
            solos,
            current_solo: 0,
            solo_active: false,
        }
    }
}

impl<L> EngineCore<L> {
    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Index of the first chord not yet hit or missed.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn is_bot(&self) -> bool {
        self.bot
    }

    pub fn chart(&self) -> &InstrumentDifficulty<L> {
        &self.chart
    }

    pub fn notes(&self) -> &[Note<L>] {
        &self.chart.notes
    }

    pub fn params(&self) -> &EngineParameters {
        &self.params
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn can_activate_star_power(&self) -> bool {
        self.stats.star_power_amount >= STAR_POWER_ACTIVATION_AMOUNT
    }

    pub(crate) fn chord_count(&self) -> usize {
        self.chart.chord_count()
    }

    pub(crate) fn is_done(&self) -> bool {
        self.cursor >= self.chart.chord_count()
    }

    /// Queues an input for the next update. Inputs going backwards are moved forward.
    pub fn queue_input(&mut self, mut input: GameInput) {
        if input.time < self.last_queued_time {
            log::warn!(
                "input time moved forward: previous queued input {}, input being queued {}",
                self.last_queued_time,
                input.time
            );
            input.time = self.last_queued_time;
        }
        if input.time < self.current_time {
            log::warn!(
                "input time moved forward: current time {}, input being queued {}",
                self.current_time,
                input.time
            );
            input.time = self.current_time;
        }
        self.inputs.push_back(input);
        self.last_queued_time = input.time;
    }

    fn pop_input_until(&mut self, time: f64) -> Option<GameInput> {
        match self.inputs.front() {
            Some(input) if input.time <= time => self.inputs.pop_front(),
            _ => None,
        }
    }

    fn discard_inputs(&mut self) {
        if !self.inputs.is_empty() {
            log::debug!("bot ignores {} queued inputs", self.inputs.len());
            self.inputs.clear();
        }
    }

    fn clamp_time(&self, time: f64) -> f64 {
        if time < self.current_time {
            log::debug!("update time {time} is behind current time {}", self.current_time);
            return self.current_time;
        }
        time
    }

    pub(crate) fn is_resolved(&self, note: usize) -> bool {
        let note = &self.chart.notes[note];
        note.was_hit || note.was_missed
    }

    fn is_chord_resolved(&self, chord: usize) -> bool {
        self.chart.chords[chord].range().all(|n| self.is_resolved(n))
    }

    fn is_chord_fully_hit(&self, chord: usize) -> bool {
        self.chart.chord_notes(chord).iter().all(|n| n.was_hit)
    }

    fn resolved_in_chord(&self, chord: usize) -> usize {
        self.chart.chords[chord]
            .range()
            .filter(|&n| self.is_resolved(n))
            .count()
    }

    pub(crate) fn chord_flags(&self, chord: usize) -> NoteFlags {
        self.chart.chord_flags(chord)
    }

    pub(crate) fn parent_time(&self, chord: usize) -> f64 {
        self.chart.parent(chord).time
    }

    /// Hit window around `chord`, sized from the distance to its neighbours when dynamic.
    pub fn hit_window(&self, chord: usize) -> HitWindow {
        let settings = &self.params.hit_window;
        let time = self.parent_time(chord);

        let current_to_next = match self.chart.next_chord(chord) {
            Some(next) => (self.parent_time(next) - time) / 2.0,
            None => settings.max_window / 2.0,
        };
        let previous_to_current = match self.chart.previous_chord(chord) {
            Some(prev) => (time - self.parent_time(prev)) / 2.0,
            None => current_to_next,
        };

        let window = settings.window_size(previous_to_current + current_to_next);
        HitWindow {
            front_end: settings.front_end(window),
            back_end: settings.back_end(window),
        }
    }

    pub(crate) fn is_chord_in_window(&self, chord: usize, time: f64) -> bool {
        self.hit_window(chord).contains(self.parent_time(chord), time)
    }

    /// Moves the song clock to `time`, draining star power over the elapsed span.
    pub(crate) fn begin_step(&mut self, time: f64) {
        if self.stats.star_power_active && time > self.current_time {
            let measure = self.sync.measure_seconds_at(self.current_time);
            let drained = (time - self.current_time) / measure * STAR_POWER_DRAIN_PER_MEASURE;
            self.stats.star_power_amount -= drained;
            if self.stats.star_power_amount <= 0.0 {
                self.stats.star_power_amount = 0.0;
                self.release_star_power(time);
            }
        }
        self.current_time = time;
    }

    /// Misses every chord whose window has closed before `time`.
    ///
    /// With `forgive_activators`, star power activator notes are auto-hit instead
    /// when star power could have been activated.
    pub(crate) fn miss_expired(&mut self, time: f64, forgive_activators: bool) -> bool {
        let mut missed = false;
        while !self.is_done() {
            let chord = self.cursor;
            if !self.hit_window(chord).is_missed(self.parent_time(chord), time) {
                break;
            }
            for note in self.chart.chords[chord].range() {
                if self.is_resolved(note) {
                    continue;
                }
                let activator = self.chart.notes[note].flags.contains(NoteFlags::STAR_POWER_ACTIVATOR);
                if forgive_activators && activator && self.can_activate_star_power() {
                    log::trace!("forgave skipped activator note {note} at {time}");
                    self.hit_note(note, time, true);
                } else {
                    log::trace!("missed note {note} out of the back end at {time}");
                    self.miss_note(note, time);
                }
            }
            missed = true;
            self.advance_cursor();
        }
        missed
    }

    fn advance_cursor(&mut self) {
        while !self.is_done() && self.is_chord_resolved(self.cursor) {
            self.cursor += 1;
        }
    }

    fn skip_previous(&mut self, chord: usize, time: f64) {
        for previous in self.cursor..chord {
            for note in self.chart.chords[previous].range() {
                if !self.is_resolved(note) {
                    log::trace!("missed note {note} due to note skip at {time}");
                    self.miss_note(note, time);
                }
            }
        }
    }

    /// Hits every note of `chord` as one unit.
    pub(crate) fn hit_chord(&mut self, chord: usize, time: f64) {
        self.skip_previous(chord, time);

        let range = self.chart.chords[chord].range();
        let count = range.len() as u32;
        for note in range {
            if self.is_resolved(note) {
                continue;
            }
            self.chart.notes[note].was_hit = true;
            self.events.push(EngineEvent::NoteHit { note, time });
        }
        self.stats.notes_hit += count;

        let flags = self.chord_flags(chord);
        if flags.contains(NoteFlags::STAR_POWER | NoteFlags::STAR_POWER_END) {
            self.award_star_power(self.chart.chords[chord].start);
        }
        self.track_solo(chord, flags, true, 1, time);

        self.add_combo();
        self.add_score(POINTS_PER_NOTE * count);
        log::trace!("hit chord {chord} at {time}");
        self.advance_cursor();
    }

    /// Hits one note of a chord. `auto_hit` notes score but are not shown as hit.
    pub(crate) fn hit_note(&mut self, note: usize, time: f64, auto_hit: bool) {
        if self.is_resolved(note) {
            log::trace!("tried to hit resolved note {note}");
            return;
        }
        let chord = self.chart.notes[note].chord;
        self.skip_previous(chord, time);

        self.chart.notes[note].was_hit = true;
        self.stats.notes_hit += 1;

        let flags = self.chart.notes[note].flags;
        let fully_hit = self.is_chord_fully_hit(chord);
        let first = self.resolved_in_chord(chord) == 1;

        if flags.contains(NoteFlags::STAR_POWER | NoteFlags::STAR_POWER_END) && fully_hit {
            self.award_star_power(note);
        }
        self.track_solo(chord, flags, first, 1, time);
        if !auto_hit && flags.contains(NoteFlags::STAR_POWER_ACTIVATOR) && fully_hit {
            self.activate_star_power(time);
        }

        self.add_combo();
        self.add_score(POINTS_PER_NOTE);
        if !auto_hit {
            self.events.push(EngineEvent::NoteHit { note, time });
        }
        self.advance_cursor();
    }

    pub(crate) fn miss_note(&mut self, note: usize, time: f64) {
        if self.is_resolved(note) {
            return;
        }
        let chord = self.chart.notes[note].chord;
        self.chart.notes[note].was_missed = true;
        self.stats.notes_missed += 1;
        self.events.push(EngineEvent::NoteMissed { note, time });

        let flags = self.chart.notes[note].flags;
        if flags.contains(NoteFlags::STAR_POWER) {
            self.strip_star_power(chord);
        }
        let first = self.resolved_in_chord(chord) == 1;
        self.track_solo(chord, flags, first, 0, time);

        self.stats.combo = 0;
        self.update_multiplier();
    }

    /// Misses every unresolved note of `chord`.
    pub(crate) fn miss_chord(&mut self, chord: usize, time: f64) {
        for note in self.chart.chords[chord].range() {
            self.miss_note(note, time);
        }
        self.advance_cursor();
    }

    /// An input that resolved nothing.
    pub(crate) fn overhit(&mut self, time: f64) {
        if !self.is_done() && !self.chord_flags(self.cursor).contains(NoteFlags::STAR_POWER_START) {
            self.strip_star_power(self.cursor);
        }
        self.stats.combo = 0;
        self.stats.overhits += 1;
        self.update_multiplier();
        log::trace!("overhit at {time}");
        self.events.push(EngineEvent::Overhit { time });
    }

    fn add_combo(&mut self) {
        self.stats.combo += 1;
        self.stats.max_combo = self.stats.max_combo.max(self.stats.combo);
        self.update_multiplier();
    }

    fn update_multiplier(&mut self) {
        let mut multiplier = (self.stats.combo / 10 + 1).min(self.params.max_multiplier);
        if self.stats.star_power_active {
            multiplier *= 2;
        }
        self.stats.multiplier = multiplier;
    }

    pub(crate) fn add_score(&mut self, points: u32) {
        self.stats.score += points * self.stats.multiplier;
        self.update_stars();
    }

    fn update_stars(&mut self) {
        let score = self.stats.score as f64;
        while self.star_index < self.star_thresholds.len() && score > self.star_thresholds[self.star_index] {
            self.star_index += 1;
        }

        let mut progress = 0.0;
        if let Some(&next) = self.star_thresholds.get(self.star_index) {
            let previous = match self.star_index {
                0 => 0.0,
                i => self.star_thresholds[i - 1],
            };
            if next > previous {
                progress = ((score - previous) / (next - previous)).clamp(0.0, 1.0);
            }
        }
        self.stats.stars = self.star_index as f64 + progress;
    }

    /// Removes the star power flag from the whole phrase around `chord`.
    fn strip_star_power(&mut self, chord: usize) {
        let flags = self.chord_flags(chord);
        if !flags.contains(NoteFlags::STAR_POWER) {
            return;
        }
        self.clear_star_power(chord);

        if !flags.contains(NoteFlags::STAR_POWER_START) {
            let mut previous = self.chart.previous_chord(chord);
            while let Some(c) = previous {
                let flags = self.chord_flags(c);
                if !flags.contains(NoteFlags::STAR_POWER) {
                    break;
                }
                self.clear_star_power(c);
                if flags.contains(NoteFlags::STAR_POWER_START) {
                    break;
                }
                previous = self.chart.previous_chord(c);
            }
        }

        if !flags.contains(NoteFlags::STAR_POWER_END) {
            let mut next = self.chart.next_chord(chord);
            while let Some(c) = next {
                let flags = self.chord_flags(c);
                if !flags.contains(NoteFlags::STAR_POWER) {
                    break;
                }
                self.clear_star_power(c);
                if flags.contains(NoteFlags::STAR_POWER_END) {
                    break;
                }
                next = self.chart.next_chord(c);
            }
        }
        log::trace!("star power phrase at chord {chord} lost");
    }

    fn clear_star_power(&mut self, chord: usize) {
        for note in self.chart.chord_notes_mut(chord) {
            note.flags.remove(NoteFlags::STAR_POWER);
        }
    }

    fn award_star_power(&mut self, note: usize) {
        self.stats.star_power_amount = (self.stats.star_power_amount + STAR_POWER_PHRASE_AMOUNT).min(1.0);
        self.stats.star_power_phrases_hit += 1;
        self.events.push(EngineEvent::StarPowerPhraseHit { note });
    }

    pub(crate) fn activate_star_power(&mut self, time: f64) -> bool {
        if self.stats.star_power_active || !self.can_activate_star_power() {
            return false;
        }
        log::trace!("star power activated at {time} with {}", self.stats.star_power_amount);
        self.stats.star_power_active = true;
        self.update_multiplier();
        self.events.push(EngineEvent::StarPowerStatus(true));
        true
    }

    fn release_star_power(&mut self, time: f64) {
        log::trace!("star power ended at {time}");
        self.stats.star_power_active = false;
        self.update_multiplier();
        self.events.push(EngineEvent::StarPowerStatus(false));
    }

    /// Solo bookkeeping for a resolution inside `chord`.
    ///
    /// A solo opens on the first resolution in its start chord and closes once
    /// its end chord is fully resolved.
    fn track_solo(&mut self, chord: usize, flags: NoteFlags, first_in_chord: bool, hits: u32, time: f64) {
        if flags.contains(NoteFlags::SOLO_START) && first_in_chord && !self.solo_active {
            if let Some(solo) = self.solos.get(self.current_solo) {
                self.solo_active = true;
                self.events.push(EngineEvent::SoloStart {
                    note_count: solo.note_count,
                });
            }
        }

        if !self.solo_active {
            return;
        }
        let counted = if self.separate_chord_notes { hits } else { hits.min(1) };
        self.solos[self.current_solo].notes_hit += counted;

        if flags.contains(NoteFlags::SOLO_END) && self.is_chord_resolved(chord) {
            let solo = self.solos[self.current_solo];
            let bonus = solo_bonus(solo.notes_hit.min(solo.note_count), solo.note_count);
            self.stats.solo_bonuses += bonus;
            self.solo_active = false;
            self.current_solo += 1;
            log::trace!("solo ended at {time}: {}/{} for {bonus}", solo.notes_hit, solo.note_count);
            self.events.push(EngineEvent::SoloEnd {
                notes_hit: solo.notes_hit,
                note_count: solo.note_count,
                bonus,
            });
        }
    }
}

fn solo_sections<L>(chart: &InstrumentDifficulty<L>, separate_chord_notes: bool) -> Vec<SoloSection> {
    let mut solos = Vec::new();
    let mut open: Option<SoloSection> = None;

    for chord in 0..chart.chord_count() {
        let flags = chart.chord_flags(chord);
        if flags.contains(NoteFlags::SOLO_START) && open.is_none() {
            open = Some(SoloSection {
                note_count: 0,
                notes_hit: 0,
            });
        }
        if let Some(solo) = open.as_mut() {
            solo.note_count += if separate_chord_notes {
                chart.chords[chord].len as u32
            } else {
                1
            };
        }
        if flags.contains(NoteFlags::SOLO_END) {
            if let Some(solo) = open.take() {
                solos.push(solo);
            }
        }
    }
    solos
}

/// A judgment engine front end driven by one song timeline.
pub trait Engine {
    type Lane;

    fn core(&self) -> &EngineCore<Self::Lane>;
    fn core_mut(&mut self) -> &mut EngineCore<Self::Lane>;

    /// Applies one input to the front end's input state.
    fn mutate_state(&mut self, input: GameInput);

    /// Runs the hit logic at `time`.
    fn step(&mut self, time: f64);

    fn queue_input(&mut self, input: GameInput) {
        self.core_mut().queue_input(input);
    }

    /// Advances the engine to `time`, replaying queued inputs that are due.
    ///
    /// Once finished, due inputs are still judged so late presses count as overhits.
    fn update(&mut self, time: f64) {
        let core = self.core_mut();
        let finished = core.state == EngineState::Finished;
        let time = core.clamp_time(time);
        if core.state == EngineState::Idle {
            core.state = EngineState::Active;
        }

        if core.bot {
            core.discard_inputs();
        } else {
            while let Some(input) = self.core_mut().pop_input_until(time) {
                log::trace!("processing input {} ({}) at {}", input.action, input.value, input.time);
                self.mutate_state(input);
                self.step(input.time);
            }
        }
        if finished {
            return;
        }

        self.step(time);

        let core = self.core_mut();
        if core.is_done() {
            log::debug!("engine finished at {time}");
            core.state = EngineState::Finished;
        }
    }

    fn state(&self) -> EngineState {
        self.core().state()
    }

    fn stats(&self) -> &EngineStats {
        self.core().stats()
    }

    fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.core_mut().drain_events()
    }
}
