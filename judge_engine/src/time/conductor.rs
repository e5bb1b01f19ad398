use atomic_float::AtomicF64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Song clock for the engine.
///
/// The audio thread publishes its playback position through the shared atomic;
/// between publications the conductor extrapolates with the system clock.
/// Reported times never go backwards, so they can drive [`crate::Engine::update`] directly.
pub struct Conductor {
    audio_time_source: Arc<AtomicF64>,
    calibration: f64,
    last_audio_time: f64,
    last_update_time: f64,
    last_reported: f64,
}

impl Conductor {
    pub fn new(audio_time_source: Arc<AtomicF64>) -> Self {
        Self {
            audio_time_source,
            calibration: 0.0,
            last_audio_time: 0.0,
            last_update_time: 0.0,
            last_reported: f64::NEG_INFINITY,
        }
    }

    /// Output latency in seconds. Song time trails the audio position by this much.
    pub fn with_calibration(mut self, calibration: f64) -> Self {
        self.calibration = calibration;
        self
    }

    /// Re-synchronizes with the audio clock.
    pub fn update(&mut self, current_system_time: f64) {
        self.last_audio_time = self.audio_time_source.load(Ordering::Acquire);
        self.last_update_time = current_system_time;
    }

    pub fn get_time(&mut self, current_system_time: f64) -> f64 {
        let elapsed = current_system_time - self.last_update_time;
        let time = self.last_audio_time + elapsed - self.calibration;
        if time < self.last_reported {
            log::trace!(
                "conductor held at {} (audio clock behind by {})",
                self.last_reported,
                self.last_reported - time
            );
            return self.last_reported;
        }
        self.last_reported = time;
        time
    }
}
