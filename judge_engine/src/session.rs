use std::sync::Arc;

use atomic_float::AtomicF64;
use crossbeam_channel::Sender;

use crate::engine::Engine;
use crate::input::events::GameInput;
use crate::input::InputQueue;
use crate::time::conductor::Conductor;

/// One player's engine as driven from the game thread.
///
/// Each frame reads the song time from the [`Conductor`], moves inputs from
/// the [`InputQueue`] into the engine and updates it.
pub struct PlaySession<E> {
    engine: E,
    inputs: InputQueue,
    conductor: Conductor,
    song_time: f64,
}

impl<E: Engine> PlaySession<E> {
    pub fn new(engine: E, audio_clock: Arc<AtomicF64>) -> Self {
        Self::with_conductor(engine, Conductor::new(audio_clock))
    }

    pub fn with_conductor(engine: E, conductor: Conductor) -> Self {
        Self {
            engine,
            inputs: InputQueue::new(),
            conductor,
            song_time: f64::NEG_INFINITY,
        }
    }

    pub fn input_sender(&self) -> Sender<GameInput> {
        self.inputs.sender()
    }

    /// Call when the audio thread has published a new playback position.
    pub fn sync_audio(&mut self, system_time: f64) {
        self.conductor.update(system_time);
    }

    /// Runs one frame at `system_time` and returns the song time it judged at.
    pub fn frame(&mut self, system_time: f64) -> f64 {
        let time = self.conductor.get_time(system_time);
        let fed = self.inputs.feed(&mut self.engine);
        if fed > 0 {
            log::trace!("fed {fed} inputs at {time}");
        }
        self.engine.update(time);
        self.song_time = time;
        time
    }

    /// Song time of the last frame; negative infinity before the first one.
    pub fn song_time(&self) -> f64 {
        self.song_time
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }
}
