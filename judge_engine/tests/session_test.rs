use atomic_float::AtomicF64;
use chart_schema::{Difficulty, FiveFretGuitarFret, InstrumentDifficulty, Note, SyncTrack};
use judge_engine::input::autoplay;
use judge_engine::{Engine, EngineState, FiveFretEngine, FiveFretParameters, GameInput, GuitarAction, PlaySession};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

fn two_notes() -> InstrumentDifficulty<FiveFretGuitarFret> {
    let mut chart = InstrumentDifficulty::new(Difficulty::Expert);
    chart.start_chord(Note::new(FiveFretGuitarFret::Green, 384, 1.0));
    chart.start_chord(Note::new(FiveFretGuitarFret::Red, 768, 2.0));
    chart
}

fn session(chart: &InstrumentDifficulty<FiveFretGuitarFret>) -> (PlaySession<FiveFretEngine>, Arc<AtomicF64>) {
    let engine = FiveFretEngine::new(chart, &SyncTrack::default(), FiveFretParameters::default(), false);
    let audio_clock = Arc::new(AtomicF64::new(0.0));
    (PlaySession::new(engine, audio_clock.clone()), audio_clock)
}

#[test]
fn test_frames_follow_the_audio_clock() {
    let chart = two_notes();
    let (mut session, audio_clock) = session(&chart);
    assert_eq!(session.song_time(), f64::NEG_INFINITY);

    audio_clock.store(1.5, Ordering::Release);
    session.sync_audio(100.0);
    assert!((session.frame(100.0) - 1.5).abs() < 1e-9);
    assert!((session.frame(100.25) - 1.75).abs() < 1e-9);

    // Nothing was played, so the first note is gone
    assert_eq!(session.engine().stats().notes_missed, 1);
    assert_eq!(session.engine().state(), EngineState::Active);
}

#[test]
fn test_inputs_from_a_thread_are_judged() {
    let chart = two_notes();
    let (mut session, audio_clock) = session(&chart);

    let sender = session.input_sender();
    thread::spawn(move || {
        sender.send(GameInput::button(0.99, GuitarAction::GreenFret.into(), true)).unwrap();
        sender.send(GameInput::button(1.0, GuitarAction::StrumDown.into(), true)).unwrap();
    })
    .join()
    .unwrap();

    session.sync_audio(0.0);
    for frame in 0..90 {
        let system_time = frame as f64 / 60.0;
        if frame % 4 == 0 {
            audio_clock.store(system_time, Ordering::Release);
            session.sync_audio(system_time);
        }
        session.frame(system_time);
    }

    let stats = session.engine().stats();
    assert_eq!(stats.notes_hit, 1);
    assert_eq!(stats.overhits, 0);
    assert_eq!(stats.combo, 1);
}

#[test]
fn test_autoplay_full_combos_through_the_queue() {
    let chart = two_notes();
    let (mut session, _audio_clock) = session(&chart);

    for input in autoplay::five_fret_inputs(&chart) {
        session.input_sender().send(input).unwrap();
    }
    session.sync_audio(0.0);
    let mut system_time = 0.0;
    while session.engine().state() != EngineState::Finished && system_time < 5.0 {
        session.frame(system_time);
        system_time += 1.0 / 60.0;
    }

    let engine = session.into_engine();
    assert!(engine.stats().is_full_combo());
}
