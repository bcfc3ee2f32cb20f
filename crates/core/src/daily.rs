//! Daily content: the "Daily Drop" mission built from a trending-topic template.
//!
//! Two sources implement [`DailyContentProvider`]: a simulated one that rotates
//! through built-in templates by day of month, and an HTTP one that fetches a
//! single template from a configured endpoint.

use crate::mission::{ColorTheme, DAILY_MISSION_ID, Difficulty, Mission};
use async_trait::async_trait;
use chrono::{Datelike, Local, NaiveDate};
#[cfg(test)]
use mockall::automock;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// Simulated network latency of the built-in daily source.
pub const DAILY_FETCH_LATENCY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DailyFetchError {
    #[error("daily content request failed: {0}")]
    Network(String),
    #[error("daily content payload was malformed: {0}")]
    InvalidPayload(String),
    #[error("no daily content is available")]
    NoContent,
}

/// Source of the daily mission. Calls are independent of each other and never
/// touch the static catalog.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DailyContentProvider: Send + Sync {
    async fn fetch_daily_mission(&self) -> Result<Mission, DailyFetchError>;
}

/// A news topic the daily mission is generated from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrendingTopic {
    pub topic: String,
    pub brief: String,
    pub vocab: Vec<String>,
    #[serde(rename = "bg", default)]
    pub background_image: String,
    pub phrase: String,
}

impl TrendingTopic {
    fn new(topic: &str, brief: &str, vocab: &[&str], background_image: &str, phrase: &str) -> Self {
        Self {
            topic: topic.to_string(),
            brief: brief.to_string(),
            vocab: vocab.iter().map(|v| v.to_string()).collect(),
            background_image: background_image.to_string(),
            phrase: phrase.to_string(),
        }
    }

    /// The built-in rotation used by [`SimulatedDailyContent`].
    pub fn defaults() -> Vec<TrendingTopic> {
        vec![
            TrendingTopic::new(
                "SpaceX Starship Launch",
                "SpaceX has successfully caught the Super Heavy booster on the launch tower arms. This marks a historic milestone in reusable rocketry.",
                &["Orbital velocity", "Booster separation", "Mechanical arms"],
                "https://images.unsplash.com/photo-1517976487492-5750f3195933?q=80&w=800&auto=format&fit=crop",
                "The booster catch was completely unprecedented.",
            ),
            TrendingTopic::new(
                "AI Safety Summit",
                "Global leaders are gathering in London to discuss the future of Artificial General Intelligence and establish new safety protocols.",
                &["Regulatory framework", "Existential risk", "Alignment"],
                "https://images.unsplash.com/photo-1620712943543-bcc4688e7485?q=80&w=800&auto=format&fit=crop",
                "We need a unified regulatory framework for AGI.",
            ),
            TrendingTopic::new(
                "Global Heatwave",
                "Meteorologists report record-breaking temperatures across three continents simultaneously, sparking urgent climate debates.",
                &["Carbon footprint", "Renewable transition", "Tipping point"],
                "https://images.unsplash.com/photo-1504370805625-d32c54b16100?q=80&w=800&auto=format&fit=crop",
                "The tipping point is closer than we anticipated.",
            ),
        ]
    }
}

/// Picks the template for a given day of month. `None` when there are no templates.
pub fn template_index(day_of_month: u32, template_count: usize) -> Option<usize> {
    if template_count == 0 {
        return None;
    }
    Some(day_of_month as usize % template_count)
}

/// Turns a trending topic into the daily mission.
pub fn daily_mission_from(topic: &TrendingTopic) -> Mission {
    Mission {
        id: DAILY_MISSION_ID,
        title: format!("Daily Drop: {}", topic.topic),
        level: Difficulty::Advanced,
        location: "Global Newsroom".to_string(),
        emoji: "🔥".to_string(),
        story_brief: topic.brief.clone(),
        vocab: topic.vocab.clone(),
        target_phrase: topic.phrase.clone(),
        background_image: topic.background_image.clone(),
        color: ColorTheme::Amber,
        is_daily: true,
    }
}

/// Rotates through a fixed template set so every call on the same calendar
/// day yields the same mission.
pub struct SimulatedDailyContent {
    topics: Vec<TrendingTopic>,
    latency: Duration,
    date: Option<NaiveDate>,
}

impl SimulatedDailyContent {
    pub fn new(latency: Duration) -> Self {
        Self {
            topics: TrendingTopic::defaults(),
            latency,
            date: None,
        }
    }

    pub fn with_topics(mut self, topics: Vec<TrendingTopic>) -> Self {
        self.topics = topics;
        self
    }

    /// Pins the calendar date instead of reading the local clock.
    pub fn on_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    fn today(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }
}

impl Default for SimulatedDailyContent {
    fn default() -> Self {
        Self::new(DAILY_FETCH_LATENCY)
    }
}

#[async_trait]
impl DailyContentProvider for SimulatedDailyContent {
    async fn fetch_daily_mission(&self) -> Result<Mission, DailyFetchError> {
        let day = self.today().day();
        let index = template_index(day, self.topics.len()).ok_or(DailyFetchError::NoContent)?;
        tracing::debug!(day, index, "Selected trending topic for the daily mission");

        tokio::time::sleep(self.latency).await;
        Ok(daily_mission_from(&self.topics[index]))
    }
}

/// Fetches the day's topic from an HTTP endpoint (`GET`, no parameters).
pub struct HttpDailyContent {
    client: reqwest::Client,
    url: String,
}

impl HttpDailyContent {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

/// Maps a response status onto the daily-fetch error taxonomy.
/// 204 and 404 mean there is simply nothing to show today.
pub fn classify_status(status: StatusCode) -> Result<(), DailyFetchError> {
    match status {
        StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Err(DailyFetchError::NoContent),
        s if s.is_success() => Ok(()),
        s => Err(DailyFetchError::Network(format!("unexpected status {s}"))),
    }
}

#[async_trait]
impl DailyContentProvider for HttpDailyContent {
    async fn fetch_daily_mission(&self) -> Result<Mission, DailyFetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| DailyFetchError::Network(e.to_string()))?;
        classify_status(response.status())?;

        let topic = response
            .json::<TrendingTopic>()
            .await
            .map_err(|e| DailyFetchError::InvalidPayload(e.to_string()))?;
        Ok(daily_mission_from(&topic))
    }
}
