//! Sky Siege headless driver
//!
//! Plays a seeded run with a simple autopilot at a fixed frame rate and prints
//! a JSON summary. A separate thread stands in for the presentation layer and
//! tallies the commands it receives.
//!
//! Usage: `sky-siege [settings.json]`

use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;
use std::thread;

use serde::Serialize;

use sky_siege::presentation::{PresentationCommand, command_queue};
use sky_siege::sim::{EntityKind, LevelSnapshot, LevelState, LevelStateMachine, RawKeys};
use sky_siege::{GameError, LevelController, Settings};

#[derive(Debug, Serialize)]
struct RunSummary {
    seed: u64,
    outcome: LevelState,
    frames: u64,
    levels: Vec<LevelSnapshot>,
    presentation: BTreeMap<String, u32>,
}

fn main() -> Result<(), GameError> {
    env_logger::init();

    let mut settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    let seed = settings.effective_seed();
    settings.seed = Some(seed);
    log::info!("Sky Siege (headless) starting, seed {}", seed);

    let (render, rx) = command_queue();
    let presenter = thread::spawn(move || tally(rx));

    let mut controller = LevelController::from_settings(&settings, render)?;
    let frame = controller.clock().period();

    let mut frames = 0;
    while frames < settings.max_ticks && !controller.is_finished() {
        let keys = autopilot(controller.level(), frames);
        controller.advance(frame, keys)?;
        frames += 1;
    }

    let outcome = controller.level().state();
    let mut levels = controller.history().to_vec();
    if !outcome.is_terminal() {
        log::warn!("Frame budget of {} exhausted", settings.max_ticks);
        levels.push(controller.level().snapshot());
    }

    // Closing the queue ends the presentation thread
    drop(controller);
    let presentation = presenter.join().unwrap_or_default();

    let summary = RunSummary {
        seed,
        outcome,
        frames,
        levels,
        presentation,
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

/// Chase the nearest threat vertically and tap fire every few frames
fn autopilot(level: &LevelStateMachine, frame: u64) -> RawKeys {
    let world = level.world();
    let Some(player) = world.player() else {
        return RawKeys::default();
    };
    let center_y = player.pos.y + player.size.y / 2.0;

    let target = world
        .enemies
        .iter()
        .filter(|e| !e.is_destroyed())
        .min_by(|a, b| a.pos.x.total_cmp(&b.pos.x));
    // Bosses are tall enough that any hit on the hull counts
    let target_y = target.map(|e| match e.kind {
        EntityKind::Boss => e.pos.y + e.size.y / 3.0,
        _ => e.pos.y + e.size.y / 2.0,
    });

    let (up, down) = match target_y {
        Some(y) if y < center_y - 4.0 => (true, false),
        Some(y) if y > center_y + 4.0 => (false, true),
        _ => (false, false),
    };

    RawKeys {
        up,
        down,
        fire: target.is_some() && frame % 6 < 3,
        ..Default::default()
    }
}

/// Presentation stand-in: count commands by kind until the queue closes
fn tally(rx: Receiver<PresentationCommand>) -> BTreeMap<String, u32> {
    let mut counts = BTreeMap::new();
    for cmd in rx {
        let name = match &cmd {
            PresentationCommand::AddVisual { .. } => "add_visual".to_string(),
            PresentationCommand::RemoveVisual(_) => "remove_visual".to_string(),
            PresentationCommand::SetVisibility { overlay, visible } => {
                format!("overlay_{:?}_{}", overlay, if *visible { "on" } else { "off" })
            }
            PresentationCommand::UpdateHealthBar(_) => "health_bar".to_string(),
            PresentationCommand::PlayerHealth(_) => "player_health".to_string(),
            PresentationCommand::PlayEffect(effect) => format!("effect_{:?}", effect),
            PresentationCommand::SetBackground(_) => "background".to_string(),
            PresentationCommand::ClearScene => "clear_scene".to_string(),
            PresentationCommand::ShowScreen(screen) => format!("screen_{:?}", screen),
        };
        *counts.entry(name).or_insert(0) += 1;
    }
    counts
}
