use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use atomic_float::AtomicF64;
use chart_schema::{Difficulty, DrumPad, FiveFretGuitarFret, Instrument, InstrumentDifficulty, NoteFlags, SongChart};
use judge_engine::input::autoplay::{drums_inputs, five_fret_inputs};
use judge_engine::{DrumsEngine, Engine, EngineEvent, EnginePreset, FiveFretEngine, GameInput, PlaySession};

const FRAME_SECONDS: f64 = 1.0 / 60.0;
// The mixer publishes its position every few frames
const AUDIO_FRAMES: u64 = 4;

const FIVE_FRET_LANES: [(FiveFretGuitarFret, char); 6] = [
    (FiveFretGuitarFret::Open, '_'),
    (FiveFretGuitarFret::Green, 'G'),
    (FiveFretGuitarFret::Red, 'R'),
    (FiveFretGuitarFret::Yellow, 'Y'),
    (FiveFretGuitarFret::Blue, 'B'),
    (FiveFretGuitarFret::Orange, 'O'),
];

const DRUM_LANES: [(DrumPad, char); 6] = [
    (DrumPad::Kick, 'K'),
    (DrumPad::Red, 'R'),
    (DrumPad::Yellow, 'Y'),
    (DrumPad::Blue, 'B'),
    (DrumPad::Orange, 'O'),
    (DrumPad::Green, 'G'),
];

/// Plays one difficulty frame by frame, printing a line per chord and the final stats.
///
/// The built-in bot plays unless `autoplay` is set, in which case perfectly timed
/// inputs come from a separate input thread instead.
pub fn run_simulation(
    song: &SongChart,
    instrument: Instrument,
    difficulty: Difficulty,
    preset: &EnginePreset,
    autoplay: bool,
) -> anyhow::Result<()> {
    let end = song.last_note_time() + 1.0;
    let player = if autoplay { "autoplay" } else { "bot" };
    println!(
        "Simulation of {instrument:?} {difficulty:?} with the {} preset ({player})",
        preset.name
    );

    if instrument == Instrument::Drums {
        let chart = song
            .drums
            .get(&instrument)
            .and_then(|track| track.get(difficulty))
            .with_context(|| format!("no {difficulty:?} {instrument:?} track"))?;
        let engine = DrumsEngine::new(chart, &song.sync, preset.drums.clone(), !autoplay);
        let inputs = if autoplay { drums_inputs(chart) } else { Vec::new() };
        play(engine, chart, inputs, &DRUM_LANES, end)
    } else {
        let chart = song
            .five_fret
            .get(&instrument)
            .and_then(|track| track.get(difficulty))
            .with_context(|| format!("no {difficulty:?} {instrument:?} track"))?;
        let engine = FiveFretEngine::new(chart, &song.sync, preset.five_fret_for(instrument), !autoplay);
        let inputs = if autoplay { five_fret_inputs(chart) } else { Vec::new() };
        play(engine, chart, inputs, &FIVE_FRET_LANES, end)
    }
}

/// Fixed rate game loop with the audio clock running in lockstep.
struct FrameLoop {
    audio_clock: Arc<AtomicF64>,
    frame: u64,
}

impl FrameLoop {
    fn run_until<E: Engine>(&mut self, session: &mut PlaySession<E>, time: f64) {
        while session.song_time() < time {
            let system_time = self.frame as f64 * FRAME_SECONDS;
            if self.frame % AUDIO_FRAMES == 0 {
                self.audio_clock.store(system_time, Ordering::Release);
                session.sync_audio(system_time);
            }
            session.frame(system_time);
            self.frame += 1;
        }
    }
}

fn play<E, L>(
    engine: E,
    chart: &InstrumentDifficulty<L>,
    inputs: Vec<GameInput>,
    lanes: &[(L, char)],
    end: f64,
) -> anyhow::Result<()>
where
    E: Engine<Lane = L>,
    L: PartialEq,
{
    if chart.chord_count() == 0 {
        println!("Chart is empty.");
        return Ok(());
    }

    let audio_clock = Arc::new(AtomicF64::new(0.0));
    let mut session = PlaySession::new(engine, audio_clock.clone());
    let mut frames = FrameLoop { audio_clock, frame: 0 };

    if !inputs.is_empty() {
        let sender = session.input_sender();
        let count = inputs.len();
        thread::spawn(move || {
            for input in inputs {
                if sender.send(input).is_err() {
                    log::warn!("input channel closed at {}", input.time);
                    break;
                }
            }
        })
        .join()
        .map_err(|_| anyhow::anyhow!("input thread panicked"))?;
        log::info!("input thread sent {count} inputs");
    }

    println!("Time(s)  | Lanes       | Combo | Mult | Score  | Info");
    println!("---------|-------------|-------|------|--------|------------------");

    for chord in 0..chart.chord_count() {
        let time = chart.parent(chord).time;
        frames.run_until(&mut session, time);
        let engine = session.engine_mut();

        let notes = chart.chord_notes(chord);
        let lane_str = lanes
            .iter()
            .map(|(lane, ch)| if notes.iter().any(|n| n.lane == *lane) { *ch } else { '.' })
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(" ");

        let mut info_parts = Vec::new();
        let flags = chart.chord_flags(chord);
        for (flag, label) in [
            (NoteFlags::HOPO, "HOPO"),
            (NoteFlags::TAP, "TAP"),
            (NoteFlags::STAR_POWER_ACTIVATOR, "ACT"),
        ] {
            if flags.contains(flag) {
                info_parts.push(label.to_string());
            }
        }
        for event in engine.drain_events() {
            match event {
                EngineEvent::StarPowerPhraseHit { .. } => info_parts.push("SP phrase".to_string()),
                EngineEvent::StarPowerStatus(active) => {
                    info_parts.push(if active { "SP on" } else { "SP off" }.to_string())
                }
                EngineEvent::SoloStart { note_count } => info_parts.push(format!("solo x{note_count}")),
                EngineEvent::SoloEnd { notes_hit, note_count, bonus } => {
                    info_parts.push(format!("solo {notes_hit}/{note_count} +{bonus}"))
                }
                EngineEvent::NoteMissed { note, .. } => info_parts.push(format!("miss #{note}")),
                EngineEvent::Overhit { .. } => info_parts.push("overhit".to_string()),
                EngineEvent::NoteHit { .. } => {}
            }
        }

        let stats = engine.stats();
        println!(
            "{:8.3} | {:11} | {:5} | {:>3}x | {:6} | {}",
            time,
            lane_str,
            stats.combo,
            stats.multiplier,
            stats.score,
            info_parts.join(", ")
        );
    }

    frames.run_until(&mut session, end);
    let stats = session.engine().stats();
    println!();
    println!("Score: {} ({} solo bonus)", stats.total_score(), stats.solo_bonuses);
    println!("Stars: {:.2}", stats.stars);
    println!("Full combo: {}", if stats.is_full_combo() { "yes" } else { "no" });
    println!(
        "{}",
        serde_json::to_string_pretty(stats).context("failed to serialize stats")?
    );

    Ok(())
}
