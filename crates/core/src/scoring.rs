use anyhow::Result;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use rand::Rng;
use serde::Serialize;
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::time::Instant;

pub const ANALYSIS_DELAY: Duration = Duration::from_millis(1500);
/// Range of the simulated scorer. Always "native-level".
pub const SIMULATED_SCORE_RANGE: RangeInclusive<u8> = 85..=99;

/// Pronunciation-match confidence, an integer in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConfidenceScore(u8);

impl ConfidenceScore {
    pub const MAX: u8 = 100;

    pub fn new(value: u8) -> Option<Self> {
        (value <= Self::MAX).then_some(Self(value))
    }

    pub fn saturating(value: u8) -> Self {
        Self(value.min(Self::MAX))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// A finished recording of the user attempting a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub target_phrase: String,
    pub duration: Duration,
}

/// Brackets a recording. Audio capture itself is simulated, so this only
/// tracks timing.
#[derive(Debug, Default)]
pub struct SpeechInput {
    started_at: Option<Instant>,
}

impl SpeechInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.started_at.is_some()
    }

    /// Returns `false` if a recording was already running.
    pub fn start(&mut self) -> bool {
        if self.started_at.is_some() {
            return false;
        }
        self.started_at = Some(Instant::now());
        true
    }

    /// Ends the recording. `None` when nothing was being recorded.
    pub fn stop(&mut self) -> Option<Duration> {
        self.started_at.take().map(|started| started.elapsed())
    }
}

/// Scores a recording against its target phrase.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PronunciationScorer: Send + Sync {
    async fn score(&self, recording: &Recording) -> Result<ConfidenceScore>;
}

/// Stand-in for a real scoring model: waits, then draws a uniform score.
pub struct SimulatedScorer {
    delay: Duration,
    range: RangeInclusive<u8>,
}

impl SimulatedScorer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            range: SIMULATED_SCORE_RANGE,
        }
    }
}

impl Default for SimulatedScorer {
    fn default() -> Self {
        Self::new(ANALYSIS_DELAY)
    }
}

#[async_trait]
impl PronunciationScorer for SimulatedScorer {
    async fn score(&self, recording: &Recording) -> Result<ConfidenceScore> {
        tokio::time::sleep(self.delay).await;
        let value = rand::thread_rng().gen_range(self.range.clone());
        tracing::debug!(
            score = value,
            duration_ms = recording.duration.as_millis() as u64,
            "Scored recording"
        );
        Ok(ConfidenceScore::saturating(value))
    }
}
