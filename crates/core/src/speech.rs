//! Speech output: renders dialogue lines through a pluggable text-to-speech engine.
//!
//! [`SpeechOutput`] enforces the one ordering rule of the system: at most one
//! utterance is active. Speaking again interrupts the previous utterance, whose
//! handle then resolves with [`PlaybackError::Interrupted`].

use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_LANGUAGE: &str = "en-US";
/// Slightly slower than normal for comprehension.
pub const DEFAULT_RATE: f32 = 0.9;
pub const DEFAULT_PITCH: f32 = 1.0;
const PREFERRED_VOICE_NAME: &str = "Google US English";
/// Upper bound on how long a single utterance may take to render.
pub const MAX_SPEAKING_TIME: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub language: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: language.into(),
        }
    }
}

/// Prefers the Google US English voice, then any voice tagged with the default language.
pub fn select_voice(voices: &[Voice]) -> Option<&Voice> {
    voices
        .iter()
        .find(|v| v.name.contains(PREFERRED_VOICE_NAME))
        .or_else(|| voices.iter().find(|v| v.language == DEFAULT_LANGUAGE))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub language: String,
    pub rate: f32,
    pub pitch: f32,
    pub voice: Option<Voice>,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: DEFAULT_LANGUAGE.to_string(),
            rate: DEFAULT_RATE,
            pitch: DEFAULT_PITCH,
            voice: None,
        }
    }

    pub fn with_voice(mut self, voice: Option<Voice>) -> Self {
        self.voice = voice;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    /// Replaced by a newer utterance.
    #[error("playback was interrupted")]
    Interrupted,
    /// Stopped explicitly, e.g. on teardown.
    #[error("playback was canceled")]
    Canceled,
    #[error("speech engine failed: {0}")]
    Engine(String),
}

impl PlaybackError {
    /// Interruptions and cancellations are expected and never shown to the user.
    pub fn is_benign(&self) -> bool {
        matches!(self, PlaybackError::Interrupted | PlaybackError::Canceled)
    }
}

pub type UtteranceId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Started { utterance: UtteranceId },
    Ended { utterance: UtteranceId },
    Error { utterance: UtteranceId, error: PlaybackError },
}

/// A text-to-speech backend. `render` resolves when the utterance has been
/// fully spoken; dropping the future must stop the audio.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    async fn render(&self, utterance: &Utterance) -> Result<(), PlaybackError>;
}

/// Engine that "speaks" silently, taking a fixed time per word scaled by the rate.
pub struct SimulatedSpeechEngine {
    per_word: Duration,
}

impl SimulatedSpeechEngine {
    pub fn new(per_word: Duration) -> Self {
        Self { per_word }
    }
}

#[async_trait]
impl SpeechEngine for SimulatedSpeechEngine {
    fn voices(&self) -> Vec<Voice> {
        vec![Voice::new("Simulated US English", DEFAULT_LANGUAGE)]
    }

    async fn render(&self, utterance: &Utterance) -> Result<(), PlaybackError> {
        tokio::time::sleep(speaking_time(&utterance.text, self.per_word, utterance.rate)).await;
        Ok(())
    }
}

/// Time needed to say `text` at `rate` given a per-word duration at rate 1.0.
/// Never exceeds [`MAX_SPEAKING_TIME`].
pub fn speaking_time(text: &str, per_word: Duration, rate: f32) -> Duration {
    let words = u32::try_from(text.split_whitespace().count()).unwrap_or(u32::MAX);
    let rate = if rate > 0.0 { rate.clamp(0.1, 10.0) } else { DEFAULT_RATE };
    let at_normal_rate = per_word
        .checked_mul(words)
        .unwrap_or(MAX_SPEAKING_TIME)
        .min(MAX_SPEAKING_TIME);
    at_normal_rate.div_f32(rate).min(MAX_SPEAKING_TIME)
}

struct ActiveUtterance {
    token: CancellationToken,
    reason: Arc<OnceLock<PlaybackError>>,
}

/// Handle to one utterance. Resolves exactly once.
pub struct UtteranceHandle {
    id: UtteranceId,
    token: CancellationToken,
    reason: Arc<OnceLock<PlaybackError>>,
    done: oneshot::Receiver<Result<(), PlaybackError>>,
}

impl UtteranceHandle {
    pub fn id(&self) -> UtteranceId {
        self.id
    }

    pub fn cancel(&self) {
        let _ = self.reason.set(PlaybackError::Canceled);
        self.token.cancel();
    }

    /// A render task that died without reporting counts as an engine failure
    /// unless the utterance had already been stopped.
    pub async fn finished(self) -> Result<(), PlaybackError> {
        match self.done.await {
            Ok(outcome) => outcome,
            Err(_) => Err(self.reason.get().cloned().unwrap_or_else(|| {
                PlaybackError::Engine("speech task ended unexpectedly".to_string())
            })),
        }
    }
}

pub struct SpeechOutput {
    engine: Arc<dyn SpeechEngine>,
    events: broadcast::Sender<SpeechEvent>,
    next_id: UtteranceId,
    active: Option<ActiveUtterance>,
}

impl SpeechOutput {
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            engine,
            events,
            next_id: 0,
            active: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpeechEvent> {
        self.events.subscribe()
    }

    /// Starts speaking `text`, interrupting whatever was playing.
    pub fn speak(&mut self, text: &str) -> UtteranceHandle {
        self.stop(PlaybackError::Interrupted);

        let voices = self.engine.voices();
        let utterance = Utterance::new(text).with_voice(select_voice(&voices).cloned());

        self.next_id += 1;
        let id = self.next_id;
        let token = CancellationToken::new();
        let reason = Arc::new(OnceLock::new());
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(render_utterance(
            self.engine.clone(),
            utterance,
            id,
            token.clone(),
            reason.clone(),
            self.events.clone(),
            done_tx,
        ));

        self.active = Some(ActiveUtterance {
            token: token.clone(),
            reason: reason.clone(),
        });
        UtteranceHandle {
            id,
            token,
            reason,
            done: done_rx,
        }
    }

    /// Stops the active utterance, if any.
    pub fn cancel(&mut self) {
        self.stop(PlaybackError::Canceled);
    }

    fn stop(&mut self, reason: PlaybackError) {
        if let Some(active) = self.active.take() {
            let _ = active.reason.set(reason);
            active.token.cancel();
        }
    }
}

impl Drop for SpeechOutput {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn cancel_reason(reason: &OnceLock<PlaybackError>) -> PlaybackError {
    reason.get().cloned().unwrap_or(PlaybackError::Canceled)
}

async fn render_utterance(
    engine: Arc<dyn SpeechEngine>,
    utterance: Utterance,
    id: UtteranceId,
    token: CancellationToken,
    reason: Arc<OnceLock<PlaybackError>>,
    events: broadcast::Sender<SpeechEvent>,
    done: oneshot::Sender<Result<(), PlaybackError>>,
) {
    // An utterance replaced before it got to run never reports Started.
    let outcome = if token.is_cancelled() {
        Err(cancel_reason(&reason))
    } else {
        let _ = events.send(SpeechEvent::Started { utterance: id });
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(cancel_reason(&reason)),
            result = engine.render(&utterance) => result,
        }
    };

    let event = match &outcome {
        Ok(()) => {
            tracing::debug!(utterance = id, "Utterance finished");
            SpeechEvent::Ended { utterance: id }
        }
        Err(error) => {
            if error.is_benign() {
                tracing::debug!(utterance = id, %error, "Utterance stopped");
            } else {
                tracing::warn!(utterance = id, %error, "Utterance failed");
            }
            SpeechEvent::Error {
                utterance: id,
                error: error.clone(),
            }
        }
    };
    let _ = events.send(event);
    let _ = done.send(outcome);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenEngine;

    #[async_trait]
    impl SpeechEngine for BrokenEngine {
        async fn render(&self, _utterance: &Utterance) -> Result<(), PlaybackError> {
            Err(PlaybackError::Engine("synthesis-failed".to_string()))
        }
    }

    struct PanickingEngine;

    #[async_trait]
    impl SpeechEngine for PanickingEngine {
        async fn render(&self, _utterance: &Utterance) -> Result<(), PlaybackError> {
            panic!("audio device vanished");
        }
    }

    fn drain(rx: &mut broadcast::Receiver<SpeechEvent>) -> Vec<SpeechEvent> {
        let mut events = vec![];
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn simulated() -> Arc<dyn SpeechEngine> {
        Arc::new(SimulatedSpeechEngine::new(Duration::from_millis(300)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_play_cancels_first_without_user_visible_error() {
        let mut output = SpeechOutput::new(simulated());
        let mut rx = output.subscribe();

        let first = output.speak("Hello! How can I help you today?");
        let second = output.speak("Hello! How can I help you today?");
        let (first_id, second_id) = (first.id(), second.id());

        assert_eq!(second.finished().await, Ok(()));
        let first_outcome = first.finished().await;
        assert_eq!(first_outcome, Err(PlaybackError::Interrupted));
        assert!(first_outcome.unwrap_err().is_benign());

        let events = drain(&mut rx);
        let for_second: Vec<_> = events
            .iter()
            .filter(|e| match e {
                SpeechEvent::Started { utterance }
                | SpeechEvent::Ended { utterance }
                | SpeechEvent::Error { utterance, .. } => *utterance == second_id,
            })
            .cloned()
            .collect();
        assert_eq!(
            for_second,
            vec![
                SpeechEvent::Started { utterance: second_id },
                SpeechEvent::Ended { utterance: second_id },
            ]
        );
        assert!(!events.contains(&SpeechEvent::Started { utterance: first_id }));
        assert!(!events.contains(&SpeechEvent::Ended { utterance: first_id }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_utterance_is_benign() {
        let mut output = SpeechOutput::new(simulated());
        let handle = output.speak("This sentence takes a while to say out loud.");

        tokio::time::sleep(Duration::from_millis(100)).await;
        output.cancel();

        assert_eq!(handle.finished().await, Err(PlaybackError::Canceled));
    }

    #[tokio::test]
    async fn test_engine_failure_is_reported() {
        let mut output = SpeechOutput::new(Arc::new(BrokenEngine));
        let mut rx = output.subscribe();

        let handle = output.speak("Hi");
        let id = handle.id();
        let outcome = handle.finished().await;

        assert!(matches!(outcome, Err(PlaybackError::Engine(_))));
        assert!(!outcome.unwrap_err().is_benign());
        let events = drain(&mut rx);
        assert_eq!(events[0], SpeechEvent::Started { utterance: id });
        assert!(matches!(events[1], SpeechEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_crashed_render_task_is_an_engine_failure() {
        let mut output = SpeechOutput::new(Arc::new(PanickingEngine));

        let outcome = output.speak("Hello! How can I help you today?").finished().await;

        assert!(matches!(outcome, Err(PlaybackError::Engine(_))));
        assert!(!outcome.unwrap_err().is_benign());
    }

    #[test]
    fn test_voice_selection_prefers_google_then_language() {
        let voices = vec![
            Voice::new("Samantha", "en-US"),
            Voice::new("Google UK English Female", "en-GB"),
            Voice::new("Google US English", "en-US"),
        ];
        assert_eq!(select_voice(&voices).unwrap().name, "Google US English");

        let fallback = vec![Voice::new("Thomas", "fr-FR"), Voice::new("Samantha", "en-US")];
        assert_eq!(select_voice(&fallback).unwrap().name, "Samantha");

        assert!(select_voice(&[Voice::new("Thomas", "fr-FR")]).is_none());
    }

    #[test]
    fn test_utterance_defaults() {
        let utterance = Utterance::new("Hi there");
        assert_eq!(utterance.language, "en-US");
        assert_eq!(utterance.rate, 0.9);
        assert_eq!(utterance.pitch, 1.0);
        assert!(utterance.voice.is_none());
    }

    #[test]
    fn test_speaking_time_scales_with_rate() {
        let per_word = Duration::from_millis(300);
        assert_eq!(speaking_time("one two", per_word, 1.0), Duration::from_millis(600));
        assert!(speaking_time("one two", per_word, 0.5) > Duration::from_millis(600));
        assert_eq!(speaking_time("", per_word, 1.0), Duration::ZERO);
    }

    #[test]
    fn test_speaking_time_is_capped() {
        let huge = Duration::from_millis(u64::MAX);
        assert_eq!(speaking_time("one two three", huge, 0.9), MAX_SPEAKING_TIME);
        let slowest = speaking_time("one", Duration::from_secs(1), f32::MIN_POSITIVE);
        assert!(slowest > Duration::from_secs(9) && slowest <= Duration::from_secs(11));
    }
}
