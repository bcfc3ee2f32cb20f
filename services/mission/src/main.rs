mod config;
mod console;
mod terminal;

use crate::config::Config;
use crate::console::ConsoleSpeechEngine;
use crate::terminal::{Action, HELP, describe, describe_mission, parse_command};
use anyhow::{Context, Result};
use clap::Parser;
use duo_core::auth::DemoAuthProvider;
use duo_core::catalog::list_missions;
use duo_core::daily::{DailyContentProvider, HttpDailyContent, SimulatedDailyContent};
use duo_core::mission::MissionId;
use duo_core::runtime::{DriverHandle, Input, Services, SessionDriver};
use duo_core::scoring::SimulatedScorer;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Practice spoken English one mission at a time")]
struct Cli {
    /// Start this catalog mission right away
    #[arg(long, conflicts_with = "daily")]
    mission: Option<MissionId>,
    /// Start today's Daily Drop right away
    #[arg(long)]
    daily: bool,
    /// Print the mission catalog and exit
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();
    if args.list {
        print_catalog();
        return Ok(());
    }

    tracing::info!("Configuration loaded successfully. Starting mission service...");

    // --- 4. Wire up the services ---
    let daily: Arc<dyn DailyContentProvider> = match &config.daily_content_url {
        Some(url) => {
            tracing::info!("Fetching daily content from {}", url);
            Arc::new(HttpDailyContent::new(url.clone()))
        }
        None => Arc::new(SimulatedDailyContent::new(config.daily_latency)),
    };
    let services = Services {
        speech: Arc::new(ConsoleSpeechEngine::new(config.speech_word)),
        scorer: Arc::new(SimulatedScorer::new(config.analysis_delay)),
        daily,
        auth: Arc::new(DemoAuthProvider::new(config.login_latency)),
    };

    let driver = SessionDriver::new(services, config.session_settings());
    let handle = driver.handle();
    let mut speech_events = driver.speech_events();
    let driver_task = tokio::spawn(driver.run());

    // Speech events are only interesting when debugging playback.
    let speech_log = tokio::spawn(async move {
        while let Ok(event) = speech_events.recv().await {
            tracing::debug!("Speech event: {:?}", event);
        }
    });

    let renderer = tokio::spawn(render(handle.clone()));

    if let Some(id) = args.mission {
        handle.send(Input::SelectMission(id)).await?;
    } else if args.daily {
        handle.send(Input::SelectDaily).await?;
    }

    println!("{HELP}");
    tokio::select! {
        result = repl(handle.clone()) => {
            if let Err(e) = result {
                tracing::error!("Terminal input failed: {:?}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C, shutting down...");
        }
    }

    tracing::info!("Shutting down...");
    handle.send(Input::Shutdown).await?;
    driver_task
        .await
        .context("Session driver task panicked")??;
    renderer.abort();
    speech_log.abort();
    Ok(())
}

fn print_catalog() {
    for mission in list_missions() {
        println!("{}", describe_mission(mission));
    }
}

/// Reads commands from stdin until `quit` or end of input.
async fn repl(handle: DriverHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        match parse_command(&line) {
            Ok(Action::Send(input)) => handle.send(input).await?,
            Ok(Action::List) => {
                print_catalog();
                if let Some(daily) = handle.snapshot().mission.filter(|m| m.is_daily) {
                    println!("{}", describe_mission(&daily));
                }
            }
            Ok(Action::Status) => println!("{}", describe(&handle.snapshot())),
            Ok(Action::Json) => println!("{}", serde_json::to_string_pretty(&handle.snapshot())?),
            Ok(Action::Help) => println!("{HELP}"),
            Ok(Action::Quit) => break,
            Err(message) => println!("{message}"),
        }
    }
    Ok(())
}

/// Prints a status line whenever it changes.
async fn render(handle: DriverHandle) {
    let mut snapshots = handle.subscribe();
    let mut last = String::new();
    loop {
        let line = describe(&snapshots.borrow_and_update());
        if line != last {
            println!("{line}");
            last = line;
        }
        if snapshots.changed().await.is_err() {
            break;
        }
    }
}
