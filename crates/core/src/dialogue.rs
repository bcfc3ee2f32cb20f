use crate::mission::Mission;
use serde::Serialize;

/// Every generated script has exactly this many lines.
pub const SCRIPT_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueLine {
    pub id: String,
    pub speaker: String,
    pub text: String,
    /// True when the user has to speak this line.
    pub is_user_turn: bool,
}

impl DialogueLine {
    fn new(position: usize, speaker: &str, text: impl Into<String>, is_user_turn: bool) -> Self {
        Self {
            id: position.to_string(),
            speaker: speaker.to_string(),
            text: text.into(),
            is_user_turn,
        }
    }
}

/// Builds the scripted conversation for a mission.
///
/// The script alternates system and user lines and always ends on the user
/// saying the mission's target phrase. Daily missions are framed as a live news
/// report, catalog missions as a coached scenario. The output depends only on
/// the mission, so regenerating it never reshuffles the script.
pub fn generate_dialogue(mission: &Mission) -> Vec<DialogueLine> {
    if mission.is_daily {
        return vec![
            DialogueLine::new(
                1,
                "News Anchor",
                format!(
                    "Breaking News: {} We're going live to our correspondent.",
                    mission.story_brief
                ),
                false,
            ),
            DialogueLine::new(2, "You", "Thanks, I'm here at the scene.", true),
            DialogueLine::new(
                3,
                "News Anchor",
                "What's the general consensus on the ground regarding this development?",
                false,
            ),
            DialogueLine::new(4, "You", mission.target_phrase.as_str(), true),
        ];
    }

    vec![
        // Rendered as the briefing screen rather than spoken.
        DialogueLine::new(1, "Coach", "Mission Briefing", false),
        DialogueLine::new(2, "You", "I'm ready to start.", true),
        DialogueLine::new(3, "Scenario", "Hello! How can I help you today?", false),
        DialogueLine::new(4, "You", mission.target_phrase.as_str(), true),
    ]
}
