use crate::Command;
use crate::dialogue::{DialogueLine, generate_dialogue};
use crate::mission::{Mission, MissionId};
use crate::scoring::ConfidenceScore;
use crate::speech::PlaybackError;
use crate::store::{FeedbackStatus, SessionState};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Pause between a system line finishing and the session moving on.
pub const AUTO_ADVANCE_DELAY: Duration = Duration::from_millis(500);
/// Scores at or above this count as a successful attempt.
pub const PASS_THRESHOLD: u8 = 80;

/// Sub-state of the current dialogue line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionPhase {
    Intro,
    Listen,
    Speak,
    Analyzing,
    Result,
}

/// Tags every asynchronous request issued for a line. A reply carrying any
/// other ticket than the current one belongs to a line that is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

static NEXT_TICKET: AtomicU64 = AtomicU64::new(1);

impl Ticket {
    fn next() -> Self {
        Ticket(NEXT_TICKET.fetch_add(1, Ordering::Relaxed))
    }
}

/// User gestures and asynchronous completions fed into a [`MissionSession`].
#[derive(Debug)]
pub enum Event {
    /// Start the mission from the briefing.
    Begin,
    /// Play the current line.
    Play,
    PressRecord,
    ReleaseRecord,
    /// Leave the result screen for the next line.
    Continue,
    Exit,
    PlaybackFinished {
        ticket: Ticket,
        outcome: Result<(), PlaybackError>,
    },
    AutoAdvance {
        ticket: Ticket,
    },
    AnalysisFinished {
        ticket: Ticket,
        result: anyhow::Result<ConfidenceScore>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub auto_advance_delay: Duration,
    pub pass_threshold: u8,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            auto_advance_delay: AUTO_ADVANCE_DELAY,
            pass_threshold: PASS_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub mission_id: MissionId,
    pub title: String,
    pub score: u32,
    /// Mean confidence over the scored lines.
    pub accuracy: Option<u8>,
    pub scored_lines: usize,
}

/// Drives one attempt at a mission's dialogue script, one line at a time.
///
/// The machine never touches audio or timers itself. It mutates the
/// [`SessionState`] it is handed and returns [`Command`]s for the runtime to
/// execute; completions come back as [`Event`]s tagged with a [`Ticket`].
/// Phases are keyed on `(mission, step)`: syncing against an unchanged key
/// does nothing, a changed key tears down the previous line's in-flight work
/// before entering the new one.
pub struct MissionSession {
    mission: Mission,
    script: Vec<DialogueLine>,
    settings: SessionSettings,
    key: Option<(MissionId, usize)>,
    phase: InteractionPhase,
    ticket: Ticket,
    playing: bool,
    recording: bool,
    complete: bool,
    confidence: Option<ConfidenceScore>,
    history: Vec<ConfidenceScore>,
}

impl MissionSession {
    pub fn new(mission: Mission, settings: SessionSettings) -> Self {
        let script = generate_dialogue(&mission);
        Self {
            mission,
            script,
            settings,
            key: None,
            phase: InteractionPhase::Intro,
            ticket: Ticket::next(),
            playing: false,
            recording: false,
            complete: false,
            confidence: None,
            history: vec![],
        }
    }

    pub fn mission(&self) -> &Mission {
        &self.mission
    }

    pub fn script(&self) -> &[DialogueLine] {
        &self.script
    }

    pub fn phase(&self) -> InteractionPhase {
        self.phase
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Confidence of the last scored attempt on the current line.
    pub fn confidence(&self) -> Option<ConfidenceScore> {
        self.confidence
    }

    pub fn current_line(&self, step: usize) -> Option<&DialogueLine> {
        self.script.get(step)
    }

    fn is_user_turn(&self, step: usize) -> bool {
        self.current_line(step).is_some_and(|line| line.is_user_turn)
    }

    /// Brings the phase in line with the store. Must be called after anything
    /// outside the machine mutates the session state.
    pub fn sync(&mut self, state: &SessionState) -> Vec<Command> {
        if state.active_mission_id != Some(self.mission.id) {
            if self.key.take().is_some() {
                return self.teardown(false);
            }
            return vec![];
        }

        let key = (self.mission.id, state.step);
        if self.key == Some(key) {
            return vec![];
        }

        let mut commands = self.teardown(false);
        self.key = Some(key);

        if state.is_complete(self.script.len()) {
            self.complete = true;
            tracing::info!(
                mission = self.mission.id,
                score = state.score,
                "Mission complete"
            );
            commands.push(Command::SessionComplete {
                mission: self.mission.id,
                score: state.score,
            });
            return commands;
        }

        self.complete = false;
        self.phase = if state.step == 0 {
            InteractionPhase::Intro
        } else if self.is_user_turn(state.step) {
            InteractionPhase::Listen
        } else {
            InteractionPhase::Intro
        };
        tracing::debug!(step = state.step, phase = ?self.phase, "Entered dialogue line");
        commands
    }

    /// Cancels the current line's in-flight work and invalidates its ticket.
    fn teardown(&mut self, force_stop_speech: bool) -> Vec<Command> {
        let mut commands = vec![];
        if self.playing || force_stop_speech {
            commands.push(Command::StopSpeech);
        }
        if self.recording || self.phase == InteractionPhase::Analyzing {
            commands.push(Command::DiscardRecording);
        }
        self.playing = false;
        self.recording = false;
        self.confidence = None;
        self.ticket = Ticket::next();
        commands
    }

    pub fn handle(&mut self, state: &mut SessionState, event: Event) -> Vec<Command> {
        if matches!(event, Event::Exit) {
            return self.exit(state);
        }

        let mut commands = self.sync(state);
        if self.complete || self.key.is_none() {
            tracing::debug!(?event, "No line is active, ignoring event");
            return commands;
        }

        let step = state.step;
        let more = match event {
            Event::Begin if step == 0 => self.advance(state),
            Event::Play => self.play(step),
            Event::PlaybackFinished { ticket, outcome } if ticket == self.ticket => {
                self.playback_finished(step, outcome)
            }
            Event::AutoAdvance { ticket }
                if ticket == self.ticket
                    && !self.is_user_turn(step)
                    && matches!(self.phase, InteractionPhase::Intro | InteractionPhase::Listen) =>
            {
                self.advance(state)
            }
            Event::PressRecord if self.phase == InteractionPhase::Speak && !self.recording => {
                self.recording = true;
                state.start_listening();
                vec![Command::StartRecording]
            }
            Event::ReleaseRecord if self.phase == InteractionPhase::Speak && self.recording => {
                self.recording = false;
                self.phase = InteractionPhase::Analyzing;
                state.stop_listening();
                let target_phrase = self
                    .current_line(step)
                    .map(|line| line.text.clone())
                    .unwrap_or_default();
                vec![Command::FinishRecording {
                    ticket: self.ticket,
                    target_phrase,
                }]
            }
            Event::AnalysisFinished { ticket, result }
                if ticket == self.ticket && self.phase == InteractionPhase::Analyzing =>
            {
                self.analysis_finished(state, result);
                vec![]
            }
            Event::Continue if self.phase == InteractionPhase::Result => self.advance(state),
            Event::PlaybackFinished { .. }
            | Event::AutoAdvance { .. }
            | Event::AnalysisFinished { .. } => {
                tracing::debug!("Dropping stale completion");
                vec![]
            }
            other => {
                tracing::debug!(event = ?other, phase = ?self.phase, "Action not available in this phase");
                vec![]
            }
        };
        commands.extend(more);
        commands
    }

    fn play(&mut self, step: usize) -> Vec<Command> {
        if step == 0
            || self.playing
            || !matches!(self.phase, InteractionPhase::Intro | InteractionPhase::Listen)
        {
            return vec![];
        }
        let Some(line) = self.current_line(step) else {
            return vec![];
        };
        let text = line.text.clone();
        self.playing = true;
        vec![Command::Speak {
            ticket: self.ticket,
            text,
        }]
    }

    fn playback_finished(&mut self, step: usize, outcome: Result<(), PlaybackError>) -> Vec<Command> {
        self.playing = false;
        if let Err(error) = outcome {
            if error.is_benign() {
                return vec![];
            }
            // Never leave the user stuck on a line because audio failed.
            tracing::warn!(%error, "Playback failed, continuing as if it had finished");
        }

        if !matches!(self.phase, InteractionPhase::Intro | InteractionPhase::Listen) {
            return vec![];
        }
        if self.is_user_turn(step) {
            self.phase = InteractionPhase::Speak;
            vec![]
        } else {
            vec![Command::ScheduleAdvance {
                ticket: self.ticket,
                delay: self.settings.auto_advance_delay,
            }]
        }
    }

    fn analysis_finished(&mut self, state: &mut SessionState, result: anyhow::Result<ConfidenceScore>) {
        match result {
            Ok(score) => {
                let status = if score.value() >= self.settings.pass_threshold {
                    FeedbackStatus::Success
                } else {
                    FeedbackStatus::Retry
                };
                tracing::info!(score = score.value(), ?status, "Pronunciation scored");
                self.confidence = Some(score);
                self.history.push(score);
                self.phase = InteractionPhase::Result;
                state.set_feedback_status(status);
            }
            Err(e) => {
                tracing::warn!("Scoring failed: {:?}. Letting the user try again.", e);
                self.phase = InteractionPhase::Speak;
                state.set_feedback_status(FeedbackStatus::Retry);
            }
        }
    }

    fn advance(&mut self, state: &mut SessionState) -> Vec<Command> {
        state.advance_step();
        self.sync(state)
    }

    fn exit(&mut self, state: &mut SessionState) -> Vec<Command> {
        tracing::info!(mission = self.mission.id, "Leaving mission");
        let commands = self.teardown(true);
        self.key = None;
        self.complete = false;
        state.reset_session();
        commands
    }

    pub fn summary(&self, state: &SessionState) -> SessionSummary {
        let accuracy = if self.history.is_empty() {
            None
        } else {
            let total: u32 = self.history.iter().map(|s| u32::from(s.value())).sum();
            Some((total / self.history.len() as u32) as u8)
        };
        SessionSummary {
            mission_id: self.mission.id,
            title: self.mission.title.clone(),
            score: state.score,
            accuracy,
            scored_lines: self.history.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::find_mission;
    use crate::daily::{TrendingTopic, daily_mission_from};

    fn start(mission: Mission) -> (MissionSession, SessionState) {
        let mut state = SessionState::new();
        state.activate(mission.id);
        let mut session = MissionSession::new(mission, SessionSettings::default());
        assert!(session.sync(&state).is_empty());
        (session, state)
    }

    fn cafe() -> (MissionSession, SessionState) {
        start(find_mission(1).unwrap().clone())
    }

    fn score(value: u8) -> anyhow::Result<ConfidenceScore> {
        Ok(ConfidenceScore::new(value).unwrap())
    }

    /// Plays the current line and reports the playback as finished.
    fn play_through(session: &mut MissionSession, state: &mut SessionState) -> Vec<Command> {
        let commands = session.handle(state, Event::Play);
        assert!(matches!(commands.as_slice(), [Command::Speak { .. }]));
        let ticket = session.ticket();
        session.handle(
            state,
            Event::PlaybackFinished {
                ticket,
                outcome: Ok(()),
            },
        )
    }

    /// Records an attempt and returns the ticket of the analysis request.
    fn record(session: &mut MissionSession, state: &mut SessionState) -> Ticket {
        assert_eq!(session.handle(state, Event::PressRecord), vec![Command::StartRecording]);
        let commands = session.handle(state, Event::ReleaseRecord);
        match commands.as_slice() {
            [Command::FinishRecording { ticket, .. }] => *ticket,
            other => panic!("Expected FinishRecording, got {other:?}"),
        }
    }

    #[test]
    fn test_briefing_only_accepts_begin() {
        let (mut session, mut state) = cafe();
        assert_eq!(session.phase(), InteractionPhase::Intro);

        assert!(session.handle(&mut state, Event::Play).is_empty());
        assert!(session.handle(&mut state, Event::Continue).is_empty());
        assert_eq!(state.step, 0);

        session.handle(&mut state, Event::Begin);
        assert_eq!(state.step, 1);
        assert_eq!(state.score, 10);
        // Line 1 of a standard script is a user turn.
        assert_eq!(session.phase(), InteractionPhase::Listen);
    }

    #[test]
    fn test_user_line_unlocks_speak_after_playback() {
        let (mut session, mut state) = cafe();
        session.handle(&mut state, Event::Begin);

        let commands = session.handle(&mut state, Event::Play);
        assert_eq!(
            commands,
            vec![Command::Speak {
                ticket: session.ticket(),
                text: "I'm ready to start.".to_string()
            }]
        );
        assert!(session.is_playing());
        assert!(session.handle(&mut state, Event::Play).is_empty(), "play while playing is a no-op");

        let ticket = session.ticket();
        let commands = session.handle(
            &mut state,
            Event::PlaybackFinished {
                ticket,
                outcome: Ok(()),
            },
        );
        assert!(commands.is_empty());
        assert_eq!(session.phase(), InteractionPhase::Speak);
    }

    #[test]
    fn test_system_line_auto_advances() {
        let (mut session, mut state) = cafe();
        state.advance_step();
        state.advance_step();
        session.sync(&state);
        assert_eq!(session.phase(), InteractionPhase::Intro);

        let commands = play_through(&mut session, &mut state);
        let ticket = session.ticket();
        assert_eq!(
            commands,
            vec![Command::ScheduleAdvance {
                ticket,
                delay: AUTO_ADVANCE_DELAY
            }]
        );

        session.handle(&mut state, Event::AutoAdvance { ticket });
        assert_eq!(state.step, 3);
        assert_eq!(session.phase(), InteractionPhase::Listen);
    }

    #[test]
    fn test_engine_failure_degrades_to_success() {
        let (mut session, mut state) = cafe();
        session.handle(&mut state, Event::Begin);
        session.handle(&mut state, Event::Play);

        let ticket = session.ticket();
        session.handle(
            &mut state,
            Event::PlaybackFinished {
                ticket,
                outcome: Err(PlaybackError::Engine("no voices".to_string())),
            },
        );
        assert_eq!(session.phase(), InteractionPhase::Speak);
    }

    #[test]
    fn test_interrupted_playback_changes_nothing() {
        let (mut session, mut state) = cafe();
        session.handle(&mut state, Event::Begin);
        session.handle(&mut state, Event::Play);

        let ticket = session.ticket();
        let commands = session.handle(
            &mut state,
            Event::PlaybackFinished {
                ticket,
                outcome: Err(PlaybackError::Interrupted),
            },
        );
        assert!(commands.is_empty());
        assert_eq!(session.phase(), InteractionPhase::Listen);
        assert!(!session.is_playing());
        // The user can simply play again.
        assert_eq!(session.handle(&mut state, Event::Play).len(), 1);
    }

    #[test]
    fn test_record_analyze_continue() {
        let (mut session, mut state) = cafe();
        session.handle(&mut state, Event::Begin);
        play_through(&mut session, &mut state);

        assert_eq!(session.handle(&mut state, Event::PressRecord), vec![Command::StartRecording]);
        assert!(state.is_listening);
        assert_eq!(state.feedback_status, FeedbackStatus::Listening);
        assert!(session.handle(&mut state, Event::PressRecord).is_empty());

        let commands = session.handle(&mut state, Event::ReleaseRecord);
        let ticket = session.ticket();
        assert_eq!(
            commands,
            vec![Command::FinishRecording {
                ticket,
                target_phrase: "I'm ready to start.".to_string()
            }]
        );
        assert_eq!(session.phase(), InteractionPhase::Analyzing);
        assert_eq!(state.feedback_status, FeedbackStatus::Analyzing);

        session.handle(
            &mut state,
            Event::AnalysisFinished {
                ticket,
                result: score(92),
            },
        );
        assert_eq!(session.phase(), InteractionPhase::Result);
        assert_eq!(session.confidence().map(ConfidenceScore::value), Some(92));
        assert_eq!(state.feedback_status, FeedbackStatus::Success);

        session.handle(&mut state, Event::Continue);
        assert_eq!(state.step, 2);
        assert_eq!(state.feedback_status, FeedbackStatus::Idle);
        assert_eq!(session.phase(), InteractionPhase::Intro);
        assert!(session.confidence().is_none());
    }

    #[test]
    fn test_release_without_press_is_noop() {
        let (mut session, mut state) = cafe();
        session.handle(&mut state, Event::Begin);
        play_through(&mut session, &mut state);

        assert!(session.handle(&mut state, Event::ReleaseRecord).is_empty());
        assert_eq!(session.phase(), InteractionPhase::Speak);
    }

    #[test]
    fn test_low_score_and_scorer_failure_ask_for_retry() {
        let (mut session, mut state) = cafe();
        session.handle(&mut state, Event::Begin);
        play_through(&mut session, &mut state);

        let ticket = record(&mut session, &mut state);
        session.handle(
            &mut state,
            Event::AnalysisFinished {
                ticket,
                result: Err(anyhow::anyhow!("model unavailable")),
            },
        );
        assert_eq!(session.phase(), InteractionPhase::Speak);
        assert_eq!(state.feedback_status, FeedbackStatus::Retry);

        let ticket = record(&mut session, &mut state);
        session.handle(
            &mut state,
            Event::AnalysisFinished {
                ticket,
                result: score(40),
            },
        );
        assert_eq!(session.phase(), InteractionPhase::Result);
        assert_eq!(state.feedback_status, FeedbackStatus::Retry);
    }

    #[test]
    fn test_full_standard_mission() {
        let (mut session, mut state) = cafe();
        session.handle(&mut state, Event::Begin);

        // Line 1: user acknowledges.
        play_through(&mut session, &mut state);
        let ticket = record(&mut session, &mut state);
        session.handle(&mut state, Event::AnalysisFinished { ticket, result: score(90) });
        session.handle(&mut state, Event::Continue);

        // Line 2: scenario speaks and advances by itself.
        play_through(&mut session, &mut state);
        let ticket = session.ticket();
        session.handle(&mut state, Event::AutoAdvance { ticket });

        // Line 3: the target phrase.
        play_through(&mut session, &mut state);
        let ticket = record(&mut session, &mut state);
        session.handle(&mut state, Event::AnalysisFinished { ticket, result: score(96) });
        let commands = session.handle(&mut state, Event::Continue);

        assert_eq!(commands, vec![Command::SessionComplete { mission: 1, score: 40 }]);
        assert!(session.is_complete());
        assert!(state.is_complete(session.script().len()));
        assert_eq!(state.active_mission_id, Some(1), "completion does not clear the mission");

        assert!(session.handle(&mut state, Event::Play).is_empty());

        let summary = session.summary(&state);
        assert_eq!(summary.score, 40);
        assert_eq!(summary.accuracy, Some(93));
        assert_eq!(summary.scored_lines, 2);
    }

    #[test]
    fn test_daily_mission_plays_news_lines() {
        let daily = daily_mission_from(&TrendingTopic::defaults()[1]);
        let (mut session, mut state) = start(daily);
        session.handle(&mut state, Event::Begin);
        play_through(&mut session, &mut state);
        let ticket = record(&mut session, &mut state);
        session.handle(&mut state, Event::AnalysisFinished { ticket, result: score(88) });
        session.handle(&mut state, Event::Continue);

        let commands = session.handle(&mut state, Event::Play);
        assert!(matches!(
            commands.as_slice(),
            [Command::Speak { text, .. }] if text.contains("general consensus")
        ));
    }

    #[test]
    fn test_exit_mid_analysis_discards_late_result() {
        let (mut session, mut state) = cafe();
        session.handle(&mut state, Event::Begin);
        play_through(&mut session, &mut state);
        let ticket = record(&mut session, &mut state);

        let commands = session.handle(&mut state, Event::Exit);
        assert_eq!(commands, vec![Command::StopSpeech, Command::DiscardRecording]);
        assert_eq!(state, SessionState::default());

        let commands = session.handle(&mut state, Event::AnalysisFinished { ticket, result: score(95) });
        assert!(commands.is_empty());
        assert_eq!(state, SessionState::default());
        assert!(session.confidence().is_none());
    }

    #[test]
    fn test_stale_ticket_after_restart_is_ignored() {
        let (mut session, mut state) = cafe();
        session.handle(&mut state, Event::Begin);
        play_through(&mut session, &mut state);
        let old_ticket = record(&mut session, &mut state);

        // Restarting the same mission resets the step and the line key.
        state.activate(1);
        let commands = session.sync(&state);
        assert_eq!(commands, vec![Command::DiscardRecording]);
        assert_eq!(session.phase(), InteractionPhase::Intro);

        session.handle(&mut state, Event::Begin);
        session.handle(
            &mut state,
            Event::AnalysisFinished {
                ticket: old_ticket,
                result: score(99),
            },
        );
        assert_eq!(session.phase(), InteractionPhase::Listen);
        assert_eq!(state.step, 1);
    }

    #[test]
    fn test_resync_same_step_keeps_playback() {
        let (mut session, mut state) = cafe();
        session.handle(&mut state, Event::Begin);
        session.handle(&mut state, Event::Play);
        let ticket = session.ticket();

        assert!(session.sync(&state).is_empty());
        assert!(session.is_playing());
        assert_eq!(session.ticket(), ticket);
    }

    #[test]
    fn test_external_advance_stops_playback() {
        let (mut session, mut state) = cafe();
        session.handle(&mut state, Event::Begin);
        session.handle(&mut state, Event::Play);

        state.advance_step();
        let commands = session.sync(&state);

        assert_eq!(commands, vec![Command::StopSpeech]);
        assert!(!session.is_playing());
        assert_eq!(session.phase(), InteractionPhase::Intro);
    }
}
