pub mod app;
pub mod auth;
pub mod catalog;
pub mod daily;
pub mod dialogue;
pub mod mission;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod speech;
pub mod store;
pub mod user;

use mission::MissionId;
use session::Ticket;
use std::time::Duration;

/// Represents commands that the core logic (`MissionSession`) issues to the runtime.
///
/// This enum is the primary API for decoupling the session's decision-making
/// from the runtime's execution of side effects (speaking a line, capturing
/// audio, arming timers). Anything asynchronous is tagged with the [`Ticket`]
/// of the line that asked for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Speak the given line, interrupting whatever is playing.
    Speak { ticket: Ticket, text: String },
    /// Stop any playback immediately.
    StopSpeech,
    StartRecording,
    /// End the recording and score it against `target_phrase`.
    FinishRecording { ticket: Ticket, target_phrase: String },
    /// Stop recording and throw the audio away.
    DiscardRecording,
    /// Deliver `Event::AutoAdvance` after `delay`.
    ScheduleAdvance { ticket: Ticket, delay: Duration },
    /// The script is exhausted; the summary screen should be shown.
    SessionComplete { mission: MissionId, score: u32 },
}
