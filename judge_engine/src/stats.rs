use serde::{Deserialize, Serialize};

/// Polled snapshot of a player's performance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub score: u32,
    pub combo: u32,
    pub max_combo: u32,
    pub multiplier: u32,
    pub notes_hit: u32,
    pub notes_missed: u32,
    pub total_notes: u32,
    /// Overhits on drums, overstrums on five fret.
    pub overhits: u32,
    /// Bar fill in 0..=1.
    pub star_power_amount: f64,
    pub star_power_active: bool,
    pub star_power_phrases_hit: u32,
    pub total_star_power_phrases: u32,
    pub solo_bonuses: u32,
    /// Star rating with the progress towards the next star as the fraction.
    pub stars: f64,
}

impl EngineStats {
    pub fn total_score(&self) -> u32 {
        self.score + self.solo_bonuses
    }

    pub fn percent_hit(&self) -> f64 {
        if self.total_notes == 0 {
            return 0.0;
        }
        self.notes_hit as f64 / self.total_notes as f64
    }

    pub fn is_full_combo(&self) -> bool {
        self.total_notes > 0 && self.notes_missed == 0 && self.overhits == 0 && self.notes_hit == self.total_notes
    }
}
