//! Line-oriented front-end: turns typed commands into driver inputs and
//! snapshots into status lines.

use duo_core::mission::{Mission, MissionId};
use duo_core::runtime::{Input, Snapshot};
use duo_core::session::{Event, InteractionPhase};
use duo_core::store::FeedbackStatus;

pub const HELP: &str = "\
commands:
  list              show the mission catalog
  start <id>        start a mission
  daily             fetch and start today's Daily Drop
  begin             leave the briefing
  play              play the current line
  hold / release    press and release the record button
  continue          move on from a result
  exit              abandon the mission
  finish            leave the summary and collect XP
  login / logout
  status            print the current state
  json              dump the full state as JSON
  quit";

#[derive(Debug)]
pub enum Action {
    Send(Input),
    List,
    Status,
    Json,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Action, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(Action::Status);
    };
    let action = match command.to_lowercase().as_str() {
        "list" | "ls" => Action::List,
        "start" => {
            let id = words
                .next()
                .ok_or_else(|| "usage: start <mission id>".to_string())?;
            let id: MissionId = id.parse().map_err(|_| format!("not a mission id: {id}"))?;
            Action::Send(Input::SelectMission(id))
        }
        "daily" => Action::Send(Input::SelectDaily),
        "begin" => Action::Send(Input::Session(Event::Begin)),
        "play" => Action::Send(Input::Session(Event::Play)),
        "hold" | "press" => Action::Send(Input::Session(Event::PressRecord)),
        "release" => Action::Send(Input::Session(Event::ReleaseRecord)),
        "continue" | "next" => Action::Send(Input::Session(Event::Continue)),
        "exit" => Action::Send(Input::Session(Event::Exit)),
        "finish" => Action::Send(Input::FinishMission),
        "login" => Action::Send(Input::Login),
        "logout" => Action::Send(Input::Logout),
        "status" => Action::Status,
        "json" => Action::Json,
        "help" | "?" => Action::Help,
        "quit" | "q" => Action::Quit,
        other => return Err(format!("unknown command '{other}', type 'help'")),
    };
    Ok(action)
}

pub fn describe_mission(mission: &Mission) -> String {
    format!(
        "{:>3}  {} {} ({:?}, {})",
        mission.id, mission.emoji, mission.title, mission.level, mission.location
    )
}

/// One-line summary of what the user can do right now.
pub fn describe(snapshot: &Snapshot) -> String {
    let mut parts = vec![];
    if let Some(user) = &snapshot.user {
        parts.push(format!("[{} L{} {}xp]", user.name, user.level, user.xp));
    } else if snapshot.logging_in {
        parts.push("[logging in...]".to_string());
    }

    if let Some(summary) = &snapshot.summary {
        let accuracy = summary
            .accuracy
            .map_or_else(|| "-".to_string(), |a| format!("{a}%"));
        parts.push(format!(
            "Mission complete: {} | score {} | accuracy {} | type 'finish'",
            summary.title, summary.score, accuracy
        ));
        return parts.join(" ");
    }

    match (&snapshot.mission, snapshot.phase) {
        (Some(mission), Some(phase)) => {
            parts.push(format!("{} step {}", mission.title, snapshot.session.step));
            parts.push(match phase {
                InteractionPhase::Intro if snapshot.session.step == 0 => {
                    format!("briefing: {} (type 'begin')", mission.story_brief)
                }
                InteractionPhase::Intro | InteractionPhase::Listen => {
                    let line = snapshot
                        .current_line
                        .as_ref()
                        .map(|l| format!("{}: \"{}\"", l.speaker, l.text))
                        .unwrap_or_default();
                    let hint = if snapshot.playing { "playing..." } else { "type 'play'" };
                    format!("{line} ({hint})")
                }
                InteractionPhase::Speak if snapshot.recording => {
                    "recording... (type 'release')".to_string()
                }
                InteractionPhase::Speak => {
                    let retry = if snapshot.session.feedback_status == FeedbackStatus::Retry {
                        "try again, "
                    } else {
                        ""
                    };
                    format!("your turn: {retry}type 'hold' then 'release'")
                }
                InteractionPhase::Analyzing => "analyzing...".to_string(),
                InteractionPhase::Result => {
                    let score = snapshot
                        .confidence
                        .map_or_else(|| "-".to_string(), |c| c.value().to_string());
                    format!(
                        "{:?}: {}% match (type 'continue')",
                        snapshot.session.feedback_status, score
                    )
                }
            });
        }
        _ if snapshot.fetching_daily => parts.push("fetching the Daily Drop...".to_string()),
        _ => parts.push("catalog (type 'list', 'start <id>' or 'daily')".to_string()),
    }

    if let Some(error) = &snapshot.last_error {
        parts.push(format!("! {error}"));
    }
    parts.join(" ")
}
