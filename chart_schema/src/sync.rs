use serde::{Deserialize, Serialize};

use crate::Tick;

pub const DEFAULT_RESOLUTION: u32 = 192;
pub const DEFAULT_BPM: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    pub tick: Tick,
    pub time: f64,
    pub bpm: f64,
}

impl Tempo {
    pub const DEFAULT: Tempo = Tempo {
        tick: 0,
        time: 0.0,
        bpm: DEFAULT_BPM,
    };

    pub fn micros_per_quarter(&self) -> f64 {
        60_000_000.0 / self.bpm
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub tick: Tick,
    pub time: f64,
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    pub const DEFAULT: TimeSignature = TimeSignature {
        tick: 0,
        time: 0.0,
        numerator: 4,
        denominator: 4,
    };

    /// Quarter notes in one measure of this signature.
    pub fn quarters_per_measure(&self) -> f64 {
        self.numerator as f64 * 4.0 / self.denominator as f64
    }

    pub fn ticks_per_measure(&self, resolution: u32) -> Tick {
        (resolution as f64 * self.quarters_per_measure()).round() as Tick
    }
}

/// Tempo map of a chart.
///
/// Markers are kept sorted by tick with strictly increasing ticks and the first
/// tempo and time signature at tick 0. Marker `time` fields are derived from the
/// tempo markers that precede them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncTrack {
    pub resolution: u32,
    pub tempos: Vec<Tempo>,
    pub time_signatures: Vec<TimeSignature>,
}

impl Default for SyncTrack {
    fn default() -> Self {
        Self::new(DEFAULT_RESOLUTION)
    }
}

impl SyncTrack {
    pub fn new(resolution: u32) -> Self {
        Self {
            resolution,
            tempos: vec![Tempo::DEFAULT],
            time_signatures: vec![TimeSignature::DEFAULT],
        }
    }

    /// Tempo governing `tick`. Positions before the first marker use 120 BPM.
    pub fn tempo_at(&self, tick: Tick) -> Tempo {
        let idx = self.tempos.partition_point(|t| t.tick <= tick);
        match idx {
            0 => Tempo::DEFAULT,
            _ => self.tempos[idx - 1],
        }
    }

    pub fn tempo_at_time(&self, time: f64) -> Tempo {
        let idx = self.tempos.partition_point(|t| t.time <= time);
        match idx {
            0 => Tempo::DEFAULT,
            _ => self.tempos[idx - 1],
        }
    }

    pub fn time_signature_at(&self, tick: Tick) -> TimeSignature {
        let idx = self.time_signatures.partition_point(|ts| ts.tick <= tick);
        match idx {
            0 => TimeSignature::DEFAULT,
            _ => self.time_signatures[idx - 1],
        }
    }

    pub fn time_signature_at_time(&self, time: f64) -> TimeSignature {
        let idx = self.time_signatures.partition_point(|ts| ts.time <= time);
        match idx {
            0 => TimeSignature::DEFAULT,
            _ => self.time_signatures[idx - 1],
        }
    }

    pub fn tick_to_time(&self, tick: Tick) -> f64 {
        let tempo = self.tempo_at(tick);
        tempo.time + ticks_to_seconds(tick - tempo.tick, self.resolution, tempo.bpm)
    }

    pub fn time_to_tick(&self, time: f64) -> Tick {
        if !(time > 0.0) {
            return 0;
        }
        let tempo = self.tempo_at_time(time);
        let delta = (time - tempo.time) * tempo.bpm / 60.0 * self.resolution as f64;
        tempo.tick.saturating_add(delta.round().max(0.0) as Tick)
    }

    /// Duration in seconds of `length` ticks starting at `tick`.
    pub fn tick_length_to_time(&self, tick: Tick, length: Tick) -> f64 {
        if length == 0 {
            return 0.0;
        }
        self.tick_to_time(tick.saturating_add(length)) - self.tick_to_time(tick)
    }

    /// Length in seconds of the measure that contains `time`.
    pub fn measure_seconds_at(&self, time: f64) -> f64 {
        let tempo = self.tempo_at_time(time);
        let ts = self.time_signature_at_time(time);
        tempo.seconds_per_beat() * ts.quarters_per_measure()
    }

    /// Recomputes marker times from ticks and tempos.
    ///
    /// Callers must have sorted the markers by tick.
    pub fn recompute_times(&mut self) {
        let resolution = self.resolution;
        let mut time = 0.0;
        let mut last = Tempo::DEFAULT;
        for tempo in &mut self.tempos {
            time += ticks_to_seconds(tempo.tick - last.tick, resolution, last.bpm);
            tempo.time = time;
            last = *tempo;
        }
        for i in 0..self.time_signatures.len() {
            let tick = self.time_signatures[i].tick;
            self.time_signatures[i].time = self.tick_to_time(tick);
        }
    }
}

fn ticks_to_seconds(ticks: Tick, resolution: u32, bpm: f64) -> f64 {
    ticks as f64 / resolution as f64 * 60.0 / bpm
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sync_with(resolution: u32, tempos: &[(Tick, f64)]) -> SyncTrack {
        let mut sync = SyncTrack::new(resolution);
        sync.tempos = tempos
            .iter()
            .map(|&(tick, bpm)| Tempo { tick, time: 0.0, bpm })
            .collect();
        sync.recompute_times();
        sync
    }

    #[test]
    fn default_is_120_bpm_four_four() {
        let sync = SyncTrack::default();
        assert_eq!(sync.resolution, 192);
        assert!((sync.tick_to_time(192) - 0.5).abs() < 1e-9);
        assert_eq!(sync.time_signature_at(10_000).numerator, 4);
        assert!((sync.measure_seconds_at(3.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn tempo_change_moves_later_ticks() {
        let sync = sync_with(480, &[(0, 120.0), (960, 60.0)]);
        assert!((sync.tempos[1].time - 1.0).abs() < 1e-9);
        assert!((sync.tick_to_time(1440) - 2.0).abs() < 1e-9);
        assert_eq!(sync.time_to_tick(2.0), 1440);
        assert_eq!(sync.time_to_tick(-3.0), 0);
    }

    #[test]
    fn micros_per_quarter_matches_bpm() {
        let tempo = Tempo { tick: 0, time: 0.0, bpm: 150.0 };
        assert!((tempo.micros_per_quarter() - 400_000.0).abs() < 1e-6);
    }

    #[test]
    fn time_signature_measure_length() {
        let ts = TimeSignature { tick: 0, time: 0.0, numerator: 6, denominator: 8 };
        assert_eq!(ts.ticks_per_measure(192), 576);
    }

    proptest! {
        #[test]
        fn tick_time_round_trip(
            resolution in prop::sample::select(vec![96u32, 192, 480, 960]),
            changes in prop::collection::vec((1u32..20_000, 20.0f64..400.0), 0..8),
            first_bpm in 20.0f64..400.0,
            tick in 0u32..200_000,
        ) {
            let mut markers = vec![(0u32, first_bpm)];
            let mut at = 0u32;
            for (gap, bpm) in changes {
                at += gap;
                markers.push((at, bpm));
            }
            let sync = sync_with(resolution, &markers);

            let time = sync.tick_to_time(tick);
            prop_assert_eq!(sync.time_to_tick(time), tick);
        }

        #[test]
        fn tick_to_time_is_monotonic(
            bpm in 20.0f64..400.0,
            a in 0u32..100_000,
            b in 0u32..100_000,
        ) {
            let sync = sync_with(192, &[(0, 120.0), (3_000, bpm)]);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(sync.tick_to_time(lo) <= sync.tick_to_time(hi));
        }
    }
}
