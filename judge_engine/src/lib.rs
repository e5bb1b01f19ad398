//! Real time judgment of player input against a normalized chart.

pub mod engine;
pub mod input;
pub mod params;
pub mod session;
pub mod stats;
pub mod time;

pub use engine::drums::{DrumsEngine, PadHit};
pub use engine::guitar::FiveFretEngine;
pub use engine::{solo_bonus, Engine, EngineCore, EngineEvent, EngineState, HitWindow};
pub use input::events::{DrumsAction, GameInput, GuitarAction};
pub use input::InputQueue;
pub use params::{DrumsParameters, EngineParameters, EnginePreset, FiveFretParameters, HitWindowSettings, PresetError};
pub use session::PlaySession;
pub use stats::EngineStats;
pub use time::conductor::Conductor;
