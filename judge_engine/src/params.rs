use std::{fs, path::Path};

use chart_schema::Instrument;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_MULTIPLIER: u32 = 4;
pub const BASS_MAX_MULTIPLIER: u32 = 6;
pub const DEFAULT_STAR_MULTIPLIER_THRESHOLDS: [f64; 6] = [0.21, 0.46, 0.77, 1.85, 3.08, 4.52];

fn default_scale() -> f64 {
    1.0
}

/// Timing window configuration.
///
/// Build through [`HitWindowSettings::new`] or call [`HitWindowSettings::sanitized`]
/// on deserialized values; engines always sanitize what they are given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitWindowSettings {
    pub max_window: f64,
    pub min_window: f64,
    pub front_to_back_ratio: f64,
    pub is_dynamic: bool,
    pub dynamic_slope: f64,
    pub dynamic_scale: f64,
    pub dynamic_gamma: f64,
    /// Song speed factor, not part of presets.
    #[serde(skip, default = "default_scale")]
    pub scale: f64,
}

impl HitWindowSettings {
    pub fn new(
        max_window: f64,
        min_window: f64,
        front_to_back_ratio: f64,
        is_dynamic: bool,
        dynamic_slope: f64,
        dynamic_scale: f64,
        dynamic_gamma: f64,
    ) -> Self {
        Self {
            max_window,
            min_window,
            front_to_back_ratio,
            is_dynamic,
            dynamic_slope,
            dynamic_scale,
            dynamic_gamma,
            scale: 1.0,
        }
        .sanitized()
    }

    /// Fixed window of `window` seconds centered on the note.
    pub fn fixed(window: f64) -> Self {
        Self::new(window, window, 1.0, false, 0.93, 1.0, 1.5)
    }

    pub fn sanitized(mut self) -> Self {
        if self.max_window < self.min_window {
            std::mem::swap(&mut self.max_window, &mut self.min_window);
        }
        self.dynamic_slope = self.dynamic_slope.clamp(0.0, 1.0);
        self.dynamic_scale = self.dynamic_scale.clamp(0.3, 3.0);
        self.dynamic_gamma = self.dynamic_gamma.clamp(0.1, 10.0);
        self
    }

    /// Full window size around a note whose neighbours are on average
    /// `average_distance` seconds away.
    pub fn window_size(&self, average_distance: f64) -> f64 {
        if !self.is_dynamic {
            return self.max_window;
        }

        let max_ms = self.max_window * 1000.0;
        let min_ms = self.min_window * 1000.0;
        let x = average_distance * 1000.0;

        let gamma_pow = (x / (max_ms * self.dynamic_scale)).powf(self.dynamic_gamma);
        let min_slope = min_ms * self.dynamic_slope;
        let size = (gamma_pow * (max_ms - min_slope) + min_slope) / 1000.0;

        size.clamp(self.min_window, self.max_window)
    }

    pub fn front_end(&self, window: f64) -> f64 {
        -((window / 2.0).abs() * self.front_to_back_ratio) * self.scale
    }

    pub fn back_end(&self, window: f64) -> f64 {
        (window / 2.0).abs() * (2.0 - self.front_to_back_ratio) * self.scale
    }
}

impl Default for HitWindowSettings {
    fn default() -> Self {
        Self::fixed(0.14)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParameters {
    pub hit_window: HitWindowSettings,
    pub max_multiplier: u32,
    pub star_multiplier_thresholds: Vec<f64>,
}

impl Default for EngineParameters {
    fn default() -> Self {
        Self {
            hit_window: HitWindowSettings::default(),
            max_multiplier: DEFAULT_MAX_MULTIPLIER,
            star_multiplier_thresholds: DEFAULT_STAR_MULTIPLIER_THRESHOLDS.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FiveFretParameters {
    pub base: EngineParameters,
    /// How long after a HOPO or tap hit a strum is swallowed.
    pub hopo_leniency: f64,
    /// How long a strum waits for the frets to catch up.
    pub strum_leniency: f64,
    /// Strum wait used when no note is in the window yet.
    pub strum_leniency_small: f64,
    pub infinite_front_end: bool,
}

impl Default for FiveFretParameters {
    fn default() -> Self {
        Self {
            base: EngineParameters::default(),
            hopo_leniency: 0.08,
            strum_leniency: 0.05,
            strum_leniency_small: 0.025,
            infinite_front_end: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrumsParameters {
    pub base: EngineParameters,
    /// Cymbal notes only accept cymbal pads.
    pub pro_drums: bool,
    /// Accents pay out above `1 - threshold`, ghosts below `threshold`.
    pub velocity_threshold: f32,
}

impl Default for DrumsParameters {
    fn default() -> Self {
        Self {
            base: EngineParameters::default(),
            pro_drums: true,
            velocity_threshold: 0.5,
        }
    }
}

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("failed to read preset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid preset {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Named bundle of engine parameters for every game mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnginePreset {
    pub name: String,
    pub five_fret: FiveFretParameters,
    pub bass_max_multiplier: u32,
    pub drums: DrumsParameters,
}

impl Default for EnginePreset {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            five_fret: FiveFretParameters::default(),
            bass_max_multiplier: BASS_MAX_MULTIPLIER,
            drums: DrumsParameters::default(),
        }
    }
}

impl EnginePreset {
    pub fn casual() -> Self {
        let window = HitWindowSettings::fixed(0.16);
        let mut preset = Self {
            name: "Casual".to_string(),
            ..Self::default()
        };
        preset.five_fret.base.hit_window = window.clone();
        preset.drums.base.hit_window = window;
        preset
    }

    pub fn precision() -> Self {
        let window = HitWindowSettings::new(0.10, 0.06, 1.0, true, 0.93, 1.0, 1.5);
        let mut preset = Self {
            name: "Precision".to_string(),
            ..Self::default()
        };
        preset.five_fret.base.hit_window = window.clone();
        preset.drums.base.hit_window = window;
        preset
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "default" => Some(Self::default()),
            "casual" => Some(Self::casual()),
            "precision" => Some(Self::precision()),
            _ => None,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PresetError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| PresetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| PresetError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    /// Five fret parameters for `instrument`; bass gets the higher multiplier cap.
    pub fn five_fret_for(&self, instrument: Instrument) -> FiveFretParameters {
        let mut params = self.five_fret.clone();
        if instrument.is_bass() {
            params.base.max_multiplier = self.bass_max_multiplier;
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_window_is_swapped_and_dynamics_clamped() {
        let window = HitWindowSettings::new(0.05, 0.12, 1.0, true, 4.0, 0.0, 50.0);
        assert_eq!(window.max_window, 0.12);
        assert_eq!(window.min_window, 0.05);
        assert_eq!(window.dynamic_slope, 1.0);
        assert_eq!(window.dynamic_scale, 0.3);
        assert_eq!(window.dynamic_gamma, 10.0);
    }

    #[test]
    fn window_edges_follow_ratio() {
        let mut window = HitWindowSettings::fixed(0.1);
        assert!((window.front_end(0.1) + 0.05).abs() < 1e-12);
        assert!((window.back_end(0.1) - 0.05).abs() < 1e-12);

        window.front_to_back_ratio = 0.5;
        window.scale = 2.0;
        assert!((window.front_end(0.1) + 0.05).abs() < 1e-12);
        assert!((window.back_end(0.1) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn dynamic_window_stays_between_min_and_max() {
        let window = EnginePreset::precision().five_fret.base.hit_window;
        assert_eq!(window.window_size(10.0), 0.10);
        assert!(window.window_size(0.0) >= 0.06);
        let dense = window.window_size(0.05);
        assert!(dense > 0.06 && dense < 0.10);
        assert_eq!(HitWindowSettings::fixed(0.14).window_size(0.01), 0.14);
    }

    #[test]
    fn bass_gets_the_higher_multiplier() {
        let preset = EnginePreset::default();
        assert_eq!(preset.five_fret_for(Instrument::FiveFretBass).base.max_multiplier, 6);
        assert_eq!(preset.five_fret_for(Instrument::FiveFretGuitar).base.max_multiplier, 4);
    }

    #[test]
    fn preset_json_fills_defaults_and_keeps_scale() {
        let preset: EnginePreset =
            serde_json::from_str(r#"{ "name": "Custom", "five_fret": { "hopo_leniency": 0.1 } }"#).unwrap();
        assert_eq!(preset.name, "Custom");
        assert_eq!(preset.five_fret.hopo_leniency, 0.1);
        assert_eq!(preset.five_fret.strum_leniency, 0.05);
        assert_eq!(preset.five_fret.base.hit_window.scale, 1.0);
        assert_eq!(preset.drums, DrumsParameters::default());

        let json = serde_json::to_string(&EnginePreset::casual()).unwrap();
        let back: EnginePreset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EnginePreset::casual());
        assert!(EnginePreset::by_name("PRECISION").is_some());
        assert!(EnginePreset::by_name("hard").is_none());
    }
}
