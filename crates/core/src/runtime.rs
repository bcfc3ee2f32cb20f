//! The session driver: a single event loop that owns all mutable state.
//!
//! Front-ends and background tasks talk to it only through [`Input`]s. Each
//! input is handled to completion before the next one is taken off the queue,
//! and every handled input publishes a fresh [`Snapshot`].

use crate::Command;
use crate::app::AppContext;
use crate::auth::{AuthProvider, DemoAuthProvider};
use crate::daily::{DailyContentProvider, DailyFetchError, SimulatedDailyContent};
use crate::dialogue::DialogueLine;
use crate::mission::{Mission, MissionId};
use crate::scoring::{ConfidenceScore, PronunciationScorer, Recording, SimulatedScorer, SpeechInput};
use crate::session::{Event, InteractionPhase, MissionSession, SessionSettings, SessionSummary};
use crate::speech::{SimulatedSpeechEngine, SpeechEngine, SpeechEvent, SpeechOutput};
use crate::store::SessionState;
use crate::user::{COMPLETION_XP, UserProfile};
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};

const INPUT_CAPACITY: usize = 64;

#[derive(Debug)]
pub enum Input {
    SelectMission(MissionId),
    /// Fetch the daily mission and start it once it arrives.
    SelectDaily,
    Session(Event),
    /// Leave the summary screen: award completion XP and return to the catalog.
    FinishMission,
    Login,
    Logout,
    Shutdown,
    DailyFetched(Result<Mission, DailyFetchError>),
    LoginFinished(Result<UserProfile>),
}

/// The external capabilities the driver runs against.
pub struct Services {
    pub speech: Arc<dyn SpeechEngine>,
    pub scorer: Arc<dyn PronunciationScorer>,
    pub daily: Arc<dyn DailyContentProvider>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Services {
    /// Everything simulated, with the default latencies.
    pub fn simulated() -> Self {
        Self {
            speech: Arc::new(SimulatedSpeechEngine::new(Duration::from_millis(250))),
            scorer: Arc::new(SimulatedScorer::default()),
            daily: Arc::new(SimulatedDailyContent::default()),
            auth: Arc::new(DemoAuthProvider::default()),
        }
    }
}

/// Read-only view of the whole application state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub session: SessionState,
    pub user: Option<UserProfile>,
    pub logging_in: bool,
    pub fetching_daily: bool,
    pub mission: Option<Mission>,
    pub phase: Option<InteractionPhase>,
    pub current_line: Option<DialogueLine>,
    pub playing: bool,
    pub recording: bool,
    pub confidence: Option<ConfidenceScore>,
    pub complete: bool,
    pub summary: Option<SessionSummary>,
    pub last_error: Option<String>,
}

#[derive(Clone)]
pub struct DriverHandle {
    tx: mpsc::Sender<Input>,
    snapshots: watch::Receiver<Snapshot>,
}

impl DriverHandle {
    pub async fn send(&self, input: Input) -> Result<()> {
        self.tx
            .send(input)
            .await
            .map_err(|_| anyhow::anyhow!("session driver has stopped"))
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }
}

pub struct SessionDriver {
    ctx: AppContext,
    mission: Option<MissionSession>,
    speech: SpeechOutput,
    input: SpeechInput,
    scorer: Arc<dyn PronunciationScorer>,
    daily: Arc<dyn DailyContentProvider>,
    auth: Arc<dyn AuthProvider>,
    settings: SessionSettings,
    /// Bumped whenever a mission starts or ends.
    activations: u64,
    /// Value of `activations` when the in-flight daily fetch was issued.
    daily_requested_at: Option<u64>,
    tx: mpsc::Sender<Input>,
    rx: mpsc::Receiver<Input>,
    snapshots: watch::Sender<Snapshot>,
}

impl SessionDriver {
    pub fn new(services: Services, settings: SessionSettings) -> Self {
        let (tx, rx) = mpsc::channel(INPUT_CAPACITY);
        let (snapshots, _) = watch::channel(Snapshot::default());
        Self {
            ctx: AppContext::new(),
            mission: None,
            speech: SpeechOutput::new(services.speech),
            input: SpeechInput::new(),
            scorer: services.scorer,
            daily: services.daily,
            auth: services.auth,
            settings,
            activations: 0,
            daily_requested_at: None,
            tx,
            rx,
            snapshots,
        }
    }

    pub fn handle(&self) -> DriverHandle {
        DriverHandle {
            tx: self.tx.clone(),
            snapshots: self.snapshots.subscribe(),
        }
    }

    pub fn speech_events(&self) -> broadcast::Receiver<SpeechEvent> {
        self.speech.subscribe()
    }

    /// Processes inputs until [`Input::Shutdown`] arrives.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!("Session driver started");
        self.publish();
        while let Some(input) = self.rx.recv().await {
            if matches!(input, Input::Shutdown) {
                break;
            }
            self.dispatch(input);
            self.publish();
        }
        self.speech.cancel();
        tracing::info!("Session driver stopped");
        Ok(())
    }

    fn dispatch(&mut self, input: Input) {
        match input {
            Input::SelectMission(id) => self.select_mission(id),
            Input::SelectDaily => self.fetch_daily(),
            Input::DailyFetched(result) => self.daily_fetched(result),
            Input::Session(event) => self.session_event(event),
            Input::FinishMission => self.finish_mission(),
            Input::Login => self.login(),
            Input::LoginFinished(result) => match result {
                Ok(profile) => self.ctx.user.finish_login(profile),
                Err(e) => {
                    tracing::error!("Login failed: {:?}", e);
                    self.ctx.user.fail_login();
                    self.ctx.report_error(format!("Login failed: {e}"));
                }
            },
            Input::Logout => self.ctx.user.logout(),
            Input::Shutdown => {}
        }
    }

    fn select_mission(&mut self, id: MissionId) {
        match self.ctx.resolve_mission(id) {
            Some(mission) => self.start(mission),
            None => {
                tracing::warn!(mission = id, "Unknown mission");
                self.ctx.report_error(format!("Unknown mission {id}"));
            }
        }
    }

    fn start(&mut self, mission: Mission) {
        if let Some(mut previous) = self.mission.take() {
            let commands = previous.handle(&mut self.ctx.session, Event::Exit);
            self.execute(commands);
        }
        tracing::info!(mission = mission.id, title = %mission.title, "Starting mission");
        self.activations += 1;
        self.ctx.clear_error();
        self.ctx.session.activate(mission.id);

        let mut session = MissionSession::new(mission, self.settings);
        let commands = session.sync(&self.ctx.session);
        self.mission = Some(session);
        self.execute(commands);
    }

    fn fetch_daily(&mut self) {
        if !self.ctx.begin_daily_fetch() {
            tracing::debug!("Daily mission fetch already in flight");
            return;
        }
        self.daily_requested_at = Some(self.activations);
        let daily = self.daily.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = daily.fetch_daily_mission().await;
            let _ = tx.send(Input::DailyFetched(result)).await;
        });
    }

    fn daily_fetched(&mut self, result: Result<Mission, DailyFetchError>) {
        self.ctx.end_daily_fetch();
        let requested_at = self.daily_requested_at.take();
        match result {
            Ok(mission) => {
                self.ctx.cache_daily(mission.clone());
                if requested_at != Some(self.activations) {
                    tracing::info!("Daily mission arrived after the user moved on, keeping it cached");
                    return;
                }
                self.start(mission);
            }
            Err(e) => {
                tracing::error!("Failed to load daily mission: {}", e);
                self.ctx.report_error(e.to_string());
            }
        }
    }

    fn session_event(&mut self, event: Event) {
        let Some(session) = self.mission.as_mut() else {
            tracing::debug!(?event, "No mission in progress, ignoring event");
            return;
        };
        let exiting = matches!(event, Event::Exit);
        let commands = session.handle(&mut self.ctx.session, event);
        self.execute(commands);
        if exiting {
            self.activations += 1;
            self.mission = None;
        }
    }

    fn finish_mission(&mut self) {
        let Some(summary) = self
            .mission
            .as_ref()
            .filter(|m| m.is_complete())
            .map(|m| m.summary(&self.ctx.session))
        else {
            tracing::debug!("No completed mission to finish");
            return;
        };
        tracing::info!(?summary, "Mission summary acknowledged");
        if let Some(profile) = self.ctx.user.award_xp(COMPLETION_XP) {
            tracing::info!(xp = profile.xp, level = profile.level, "Awarded completion XP");
        }
        self.ctx.session.reset_session();
        self.activations += 1;
        self.mission = None;
    }

    fn login(&mut self) {
        if !self.ctx.user.begin_login() {
            tracing::debug!("Login already in progress");
            return;
        }
        let auth = self.auth.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = auth.login().await;
            let _ = tx.send(Input::LoginFinished(result)).await;
        });
    }

    /// Carries out the side effects requested by the state machine. Results
    /// come back through the input queue.
    fn execute(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Speak { ticket, text } => {
                    tracing::info!("Speaking: \"{}\"", text);
                    let handle = self.speech.speak(&text);
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        let outcome = handle.finished().await;
                        let _ = tx
                            .send(Input::Session(Event::PlaybackFinished { ticket, outcome }))
                            .await;
                    });
                }
                Command::StopSpeech => self.speech.cancel(),
                Command::StartRecording => {
                    if !self.input.start() {
                        tracing::debug!("Already recording");
                    }
                }
                Command::FinishRecording {
                    ticket,
                    target_phrase,
                } => {
                    let duration = self.input.stop().unwrap_or_default();
                    let recording = Recording {
                        target_phrase,
                        duration,
                    };
                    let scorer = self.scorer.clone();
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        let result = scorer.score(&recording).await;
                        let _ = tx
                            .send(Input::Session(Event::AnalysisFinished { ticket, result }))
                            .await;
                    });
                }
                // A scoring task that is already running reports with a dead ticket.
                Command::DiscardRecording => {
                    self.input.stop();
                }
                Command::ScheduleAdvance { ticket, delay } => {
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(Input::Session(Event::AutoAdvance { ticket })).await;
                    });
                }
                Command::SessionComplete { mission, score } => {
                    tracing::info!(mission, score, "Session complete, awaiting summary");
                }
            }
        }
    }

    fn snapshot(&self) -> Snapshot {
        let session = self.ctx.session.clone();
        let active = self.mission.as_ref();
        Snapshot {
            user: self.ctx.user.profile().cloned(),
            logging_in: self.ctx.user.is_logging_in(),
            fetching_daily: self.ctx.is_fetching_daily(),
            mission: active.map(|m| m.mission().clone()),
            phase: active.filter(|m| !m.is_complete()).map(MissionSession::phase),
            current_line: active
                .filter(|m| !m.is_complete())
                .and_then(|m| m.current_line(session.step).cloned()),
            playing: active.is_some_and(MissionSession::is_playing),
            recording: active.is_some_and(MissionSession::is_recording),
            confidence: active.and_then(MissionSession::confidence),
            complete: active.is_some_and(MissionSession::is_complete),
            summary: active
                .filter(|m| m.is_complete())
                .map(|m| m.summary(&session)),
            last_error: self.ctx.last_error().map(str::to_string),
            session,
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}
