use crate::mission::MissionId;
use serde::Serialize;

/// Points awarded for every dialogue line the session advances past.
pub const STEP_REWARD: u32 = 10;

/// Last reported pronunciation-feedback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    #[default]
    Idle,
    Listening,
    Analyzing,
    Success,
    Retry,
}

/// The single in-progress mission attempt.
///
/// `active_mission_id == None` is the catalog baseline. `step` is an index into
/// the active script with `0` reserved for the briefing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SessionState {
    pub active_mission_id: Option<MissionId>,
    pub step: usize,
    pub score: u32,
    pub is_listening: bool,
    pub feedback_status: FeedbackStatus,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) a mission. Counters are reset even when `id` is
    /// already the active mission.
    pub fn activate(&mut self, id: MissionId) {
        tracing::debug!(mission = id, "Activating mission");
        self.active_mission_id = Some(id);
        self.step = 0;
        self.score = 0;
        self.feedback_status = FeedbackStatus::Idle;
    }

    /// `None` is the same as [`SessionState::reset_session`].
    pub fn set_scenario(&mut self, id: Option<MissionId>) {
        match id {
            Some(id) => self.activate(id),
            None => self.reset_session(),
        }
    }

    /// Moves to the next line. There is no upper bound here; completion is
    /// derived with [`SessionState::is_complete`].
    pub fn advance_step(&mut self) {
        self.step = self.step.saturating_add(1);
        self.score = self.score.saturating_add(STEP_REWARD);
        self.feedback_status = FeedbackStatus::Idle;
    }

    pub fn reset_session(&mut self) {
        *self = Self::default();
    }

    pub fn start_listening(&mut self) {
        self.is_listening = true;
        self.feedback_status = FeedbackStatus::Listening;
    }

    pub fn stop_listening(&mut self) {
        self.is_listening = false;
        self.feedback_status = FeedbackStatus::Analyzing;
    }

    pub fn set_feedback_status(&mut self, status: FeedbackStatus) {
        self.feedback_status = status;
    }

    pub fn is_active(&self) -> bool {
        self.active_mission_id.is_some()
    }

    pub fn is_complete(&self, script_len: usize) -> bool {
        self.is_active() && script_len > 0 && self.step >= script_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::SCRIPT_LENGTH;
    use proptest::prelude::*;

    #[test]
    fn test_cafe_mission_completes_with_forty_points() {
        let mut session = SessionState::new();
        session.activate(1);
        for _ in 0..4 {
            assert!(!session.is_complete(SCRIPT_LENGTH));
            session.advance_step();
        }
        assert!(session.is_complete(SCRIPT_LENGTH));
        assert_eq!(session.score, 40);
    }

    #[test]
    fn test_reset_returns_to_baseline() {
        let mut session = SessionState::new();
        session.activate(3);
        session.advance_step();
        session.advance_step();
        session.start_listening();

        session.reset_session();

        assert_eq!(session, SessionState::default());
        assert_eq!(session.active_mission_id, None);
        assert_eq!(session.feedback_status, FeedbackStatus::Idle);
    }

    #[test]
    fn test_reactivating_the_same_mission_restarts_it() {
        let mut session = SessionState::new();
        session.activate(2);
        session.advance_step();
        session.set_feedback_status(FeedbackStatus::Success);

        session.activate(2);

        assert_eq!(session.active_mission_id, Some(2));
        assert_eq!(session.step, 0);
        assert_eq!(session.score, 0);
        assert_eq!(session.feedback_status, FeedbackStatus::Idle);
    }

    #[test]
    fn test_listening_flags() {
        let mut session = SessionState::new();
        session.activate(1);

        session.start_listening();
        assert!(session.is_listening);
        assert_eq!(session.feedback_status, FeedbackStatus::Listening);

        session.stop_listening();
        assert!(!session.is_listening);
        assert_eq!(session.feedback_status, FeedbackStatus::Analyzing);

        session.advance_step();
        assert_eq!(session.feedback_status, FeedbackStatus::Idle);
    }

    #[test]
    fn test_set_scenario_none_resets() {
        let mut session = SessionState::new();
        session.set_scenario(Some(4));
        session.advance_step();
        session.set_scenario(None);
        assert_eq!(session, SessionState::default());
    }

    #[test]
    fn test_overrunning_the_script_stays_complete() {
        let mut session = SessionState::new();
        session.activate(1);
        for _ in 0..6 {
            session.advance_step();
        }
        assert_eq!(session.step, 6);
        assert!(session.is_complete(SCRIPT_LENGTH));
    }

    #[test]
    fn test_inactive_session_is_never_complete() {
        let session = SessionState {
            step: 10,
            ..SessionState::default()
        };
        assert!(!session.is_complete(SCRIPT_LENGTH));
    }

    proptest! {
        #[test]
        fn prop_activate_always_resets(steps in 0usize..20, id in 1u32..10) {
            let mut session = SessionState::new();
            session.activate(7);
            for _ in 0..steps {
                session.advance_step();
            }
            session.activate(id);
            prop_assert_eq!(session.step, 0);
            prop_assert_eq!(session.score, 0);
        }

        #[test]
        fn prop_advances_accumulate(n in 0usize..50) {
            let mut session = SessionState::new();
            session.activate(1);
            for _ in 0..n {
                session.advance_step();
            }
            prop_assert_eq!(session.step, n);
            prop_assert_eq!(session.score, STEP_REWARD * n as u32);
            prop_assert_eq!(session.is_complete(SCRIPT_LENGTH), n >= SCRIPT_LENGTH);
        }
    }
}
