//! Terminal stand-ins for the audio devices.

use async_trait::async_trait;
use duo_core::speech::{DEFAULT_LANGUAGE, PlaybackError, SpeechEngine, Utterance, Voice, speaking_time};
use std::io::Write;
use std::time::Duration;

/// Prints each utterance and holds it for as long as it would take to say.
pub struct ConsoleSpeechEngine {
    per_word: Duration,
}

impl ConsoleSpeechEngine {
    pub fn new(per_word: Duration) -> Self {
        Self { per_word }
    }
}

#[async_trait]
impl SpeechEngine for ConsoleSpeechEngine {
    fn voices(&self) -> Vec<Voice> {
        vec![Voice::new("Console", DEFAULT_LANGUAGE)]
    }

    async fn render(&self, utterance: &Utterance) -> Result<(), PlaybackError> {
        {
            let mut out = std::io::stdout().lock();
            writeln!(out, "  🔊 {}", utterance.text).map_err(|e| PlaybackError::Engine(e.to_string()))?;
        }
        tokio::time::sleep(speaking_time(&utterance.text, self.per_word, utterance.rate)).await;
        Ok(())
    }
}
