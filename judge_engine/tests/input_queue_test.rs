use chart_schema::{Difficulty, DrumPad, InstrumentDifficulty, Note, SyncTrack};
use judge_engine::input::events::{DrumsAction, GameInput};
use judge_engine::input::InputQueue;
use judge_engine::{DrumsEngine, DrumsParameters, Engine};
use std::thread;

fn pad(time: f64, action: DrumsAction) -> GameInput {
    GameInput::new(time, action.into(), 1.0)
}

#[test]
fn test_inputs_from_several_threads_are_time_ordered() {
    let queue = InputQueue::new();

    let handles: Vec<_> = [(DrumsAction::Kick, 0.5), (DrumsAction::RedDrum, 0.25)]
        .into_iter()
        .map(|(action, offset)| {
            let sender = queue.sender();
            thread::spawn(move || {
                for beat in 0..4 {
                    sender.send(pad(beat as f64 + offset, action)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(queue.pending(), 8);
    let times: Vec<f64> = queue.drain().iter().map(|input| input.time).collect();
    assert_eq!(times, vec![0.25, 0.5, 1.25, 1.5, 2.25, 2.5, 3.25, 3.5]);
    assert_eq!(queue.pending(), 0);
}

#[test]
fn test_equal_times_keep_arrival_order() {
    let queue = InputQueue::new();
    queue.push(pad(1.0, DrumsAction::Kick));
    queue.push(pad(1.0, DrumsAction::YellowCymbal));
    queue.push(pad(0.5, DrumsAction::RedDrum));

    let actions: Vec<u8> = queue.drain().iter().map(|input| input.action).collect();
    assert_eq!(
        actions,
        vec![
            u8::from(DrumsAction::RedDrum),
            DrumsAction::Kick.into(),
            DrumsAction::YellowCymbal.into()
        ]
    );
}

#[test]
fn test_feed_hands_inputs_to_the_engine() {
    let mut chart = InstrumentDifficulty::new(Difficulty::Expert);
    chart.start_chord(Note::new(DrumPad::Red, 384, 1.0));
    chart.start_chord(Note::new(DrumPad::Kick, 768, 2.0));
    let mut engine = DrumsEngine::new(&chart, &SyncTrack::default(), DrumsParameters::default(), false);

    let queue = InputQueue::new();
    let sender = queue.sender();
    thread::spawn(move || {
        sender.send(pad(2.0, DrumsAction::Kick)).unwrap();
        sender.send(pad(1.0, DrumsAction::RedDrum)).unwrap();
    })
    .join()
    .unwrap();

    assert_eq!(queue.feed(&mut engine), 2);
    engine.update(2.5);

    assert_eq!(engine.stats().notes_hit, 2);
    assert_eq!(engine.stats().overhits, 0);
    assert_eq!(queue.feed(&mut engine), 0);
}

#[test]
fn test_analog_values_keep_velocity() {
    let input = GameInput::new(2.0, 0, 0.25);
    assert!(input.is_pressed());
    assert_eq!(input.value, 0.25);
    assert!(!GameInput::new(2.0, 0, 0.0).is_pressed());
}
