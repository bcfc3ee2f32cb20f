use serde::{Deserialize, Serialize};

pub type MissionId = u32;

/// Reserved id for the dynamically fetched daily mission. No catalog entry uses it.
pub const DAILY_MISSION_ID: MissionId = 999;

/// Informational difficulty label; nothing is gated on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTheme {
    Coral,
    Periwinkle,
    Mint,
    Amber,
}

/// A roleplay scenario, either from the static catalog or fetched as the daily drop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub title: String,
    pub level: Difficulty,
    pub location: String,
    pub emoji: String,
    pub story_brief: String,
    /// Survival phrases shown during the briefing.
    pub vocab: Vec<String>,
    /// The sentence the user has to produce on the final line.
    pub target_phrase: String,
    pub background_image: String,
    pub color: ColorTheme,
    #[serde(default)]
    pub is_daily: bool,
}
