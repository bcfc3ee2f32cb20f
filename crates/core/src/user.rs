use serde::{Deserialize, Serialize};

pub const XP_PER_LEVEL: u32 = 100;
/// XP granted when the user leaves the mission summary.
pub const COMPLETION_XP: u32 = 50;

pub fn level_for_xp(xp: u32) -> u32 {
    xp / XP_PER_LEVEL + 1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub avatar: String,
    pub xp: u32,
    pub level: u32,
}

impl UserProfile {
    pub fn new(name: impl Into<String>, avatar: impl Into<String>, xp: u32) -> Self {
        Self {
            name: name.into(),
            avatar: avatar.into(),
            xp,
            level: level_for_xp(xp),
        }
    }
}

/// Identity and gamification state. Independent of the session store.
#[derive(Debug, Default)]
pub struct UserStore {
    profile: Option<UserProfile>,
    logging_in: bool,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn is_logging_in(&self) -> bool {
        self.logging_in
    }

    /// Marks a login as in flight. Returns `false` if one already is, in which
    /// case the caller should not start another.
    pub fn begin_login(&mut self) -> bool {
        if self.logging_in {
            return false;
        }
        self.logging_in = true;
        true
    }

    /// Stores the profile from a finished login. Redundant completions simply
    /// overwrite each other; the level is recomputed so the stored profile
    /// always satisfies the level formula.
    pub fn finish_login(&mut self, mut profile: UserProfile) {
        profile.level = level_for_xp(profile.xp);
        tracing::info!(user = %profile.name, level = profile.level, "User logged in");
        self.logging_in = false;
        self.profile = Some(profile);
    }

    pub fn fail_login(&mut self) {
        self.logging_in = false;
    }

    pub fn logout(&mut self) {
        if let Some(profile) = self.profile.take() {
            tracing::info!(user = %profile.name, "User logged out");
        }
    }

    /// Adds XP to the logged-in user. Without a user this is a no-op and
    /// returns `None`.
    pub fn award_xp(&mut self, amount: u32) -> Option<&UserProfile> {
        let Some(profile) = self.profile.as_mut() else {
            tracing::debug!(amount, "Ignoring XP award without a logged-in user");
            return None;
        };

        let previous_level = profile.level;
        profile.xp = profile.xp.saturating_add(amount);
        profile.level = level_for_xp(profile.xp);
        if profile.level > previous_level {
            tracing::info!(level = profile.level, "Level up");
        }
        Some(profile)
    }
}
