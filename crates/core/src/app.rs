use crate::catalog::find_mission;
use crate::mission::{Mission, MissionId};
use crate::store::SessionState;
use crate::user::UserStore;

/// Owns the two top-level stores plus the bits of view state the catalog
/// screen needs (the cached daily mission and its loading flag).
#[derive(Debug, Default)]
pub struct AppContext {
    pub session: SessionState,
    pub user: UserStore,
    daily: Option<Mission>,
    fetching_daily: bool,
    last_error: Option<String>,
}

impl AppContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks a mission up in the cached daily drop first, then the catalog.
    pub fn resolve_mission(&self, id: MissionId) -> Option<Mission> {
        match &self.daily {
            Some(daily) if daily.id == id => Some(daily.clone()),
            _ => find_mission(id).cloned(),
        }
    }

    pub fn daily_mission(&self) -> Option<&Mission> {
        self.daily.as_ref()
    }

    pub fn cache_daily(&mut self, mission: Mission) {
        self.daily = Some(mission);
    }

    pub fn is_fetching_daily(&self) -> bool {
        self.fetching_daily
    }

    /// Returns `false` when a fetch is already in flight.
    pub fn begin_daily_fetch(&mut self) -> bool {
        if self.fetching_daily {
            return false;
        }
        self.fetching_daily = true;
        true
    }

    pub fn end_daily_fetch(&mut self) {
        self.fetching_daily = false;
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn report_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}
