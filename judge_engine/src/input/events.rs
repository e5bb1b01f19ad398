use serde::{Deserialize, Serialize};

/// One timestamped input transition.
///
/// `action` is the raw id of a [`GuitarAction`] or [`DrumsAction`]; `value` is
/// 1.0/0.0 for buttons and the hit velocity for drum pads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameInput {
    /// Song time in seconds when the event occurred
    pub time: f64,
    pub action: u8,
    pub value: f32,
}

impl GameInput {
    pub fn new(time: f64, action: u8, value: f32) -> Self {
        Self { time, action, value }
    }

    pub fn button(time: f64, action: u8, pressed: bool) -> Self {
        Self::new(time, action, if pressed { 1.0 } else { 0.0 })
    }

    pub fn is_pressed(&self) -> bool {
        self.value > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GuitarAction {
    GreenFret = 0,
    RedFret = 1,
    YellowFret = 2,
    BlueFret = 3,
    OrangeFret = 4,
    StrumUp = 6,
    StrumDown = 7,
    Whammy = 8,
    StarPower = 9,
}

impl GuitarAction {
    /// Bit of the fret in the G..O button mask.
    pub fn fret_bit(self) -> Option<u8> {
        match self {
            GuitarAction::GreenFret
            | GuitarAction::RedFret
            | GuitarAction::YellowFret
            | GuitarAction::BlueFret
            | GuitarAction::OrangeFret => Some(1 << self as u8),
            _ => None,
        }
    }
}

impl TryFrom<u8> for GuitarAction {
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Ok(match id {
            0 => GuitarAction::GreenFret,
            1 => GuitarAction::RedFret,
            2 => GuitarAction::YellowFret,
            3 => GuitarAction::BlueFret,
            4 => GuitarAction::OrangeFret,
            6 => GuitarAction::StrumUp,
            7 => GuitarAction::StrumDown,
            8 => GuitarAction::Whammy,
            9 => GuitarAction::StarPower,
            other => return Err(other),
        })
    }
}

impl From<GuitarAction> for u8 {
    fn from(action: GuitarAction) -> u8 {
        action as u8
    }
}

/// Four lane pro layout plus the fifth lane green pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DrumsAction {
    RedDrum = 0,
    YellowDrum = 1,
    BlueDrum = 2,
    GreenDrum = 3,
    YellowCymbal = 4,
    BlueCymbal = 5,
    GreenCymbal = 6,
    Kick = 7,
    FiveLaneGreen = 8,
}

impl TryFrom<u8> for DrumsAction {
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Ok(match id {
            0 => DrumsAction::RedDrum,
            1 => DrumsAction::YellowDrum,
            2 => DrumsAction::BlueDrum,
            3 => DrumsAction::GreenDrum,
            4 => DrumsAction::YellowCymbal,
            5 => DrumsAction::BlueCymbal,
            6 => DrumsAction::GreenCymbal,
            7 => DrumsAction::Kick,
            8 => DrumsAction::FiveLaneGreen,
            other => return Err(other),
        })
    }
}

impl From<DrumsAction> for u8 {
    fn from(action: DrumsAction) -> u8 {
        action as u8
    }
}
