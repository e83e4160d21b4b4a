//! Outbound presentation commands
//!
//! The simulation never touches visuals directly. Every render, audio and menu
//! side effect is queued as a `PresentationCommand` on an unbounded channel and
//! drained by the presentation thread at its own pace, so a send never blocks
//! the tick.

use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};

use crate::sim::{EntityId, EntityKind};

/// Overlays toggled on top of the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Overlay {
    /// Glow drawn around the boss while its shield is up
    BossShield,
    /// "Paused" banner
    Pause,
}

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundEffect {
    /// Player projectile destroyed an enemy
    Explosion,
    /// Player fired
    PlayerShot,
    /// Boss shield came up
    ShieldUp,
    /// Level won
    Victory,
    /// Level lost
    Defeat,
}

/// Full-screen menus shown after a level ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Screen {
    Win,
    Lose,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PresentationCommand {
    AddVisual { id: EntityId, kind: EntityKind },
    RemoveVisual(EntityId),
    SetVisibility { overlay: Overlay, visible: bool },
    /// Boss health bar, 0.0 - 1.0
    UpdateHealthBar(f32),
    /// Remaining player hearts
    PlayerHealth(u32),
    PlayEffect(SoundEffect),
    SetBackground(String),
    ClearScene,
    ShowScreen(Screen),
}

/// Sending half of the presentation channel
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: Sender<PresentationCommand>,
}

/// Create a connected queue and the receiver the presentation thread drains
pub fn command_queue() -> (CommandQueue, Receiver<PresentationCommand>) {
    let (tx, rx) = mpsc::channel();
    (CommandQueue { tx }, rx)
}

impl CommandQueue {
    /// A queue with nobody listening (headless runs)
    pub fn detached() -> Self {
        let (queue, _rx) = command_queue();
        queue
    }

    fn send(&self, cmd: PresentationCommand) {
        // A dropped receiver just means nobody is drawing
        if let Err(e) = self.tx.send(cmd) {
            log::trace!("Presentation command dropped: {:?}", e.0);
        }
    }

    pub fn add_visual(&self, id: EntityId, kind: EntityKind) {
        self.send(PresentationCommand::AddVisual { id, kind });
    }

    pub fn remove_visual(&self, id: EntityId) {
        self.send(PresentationCommand::RemoveVisual(id));
    }

    pub fn set_visibility(&self, overlay: Overlay, visible: bool) {
        self.send(PresentationCommand::SetVisibility { overlay, visible });
    }

    pub fn update_health_bar(&self, fraction: f32) {
        self.send(PresentationCommand::UpdateHealthBar(fraction.clamp(0.0, 1.0)));
    }

    pub fn player_health(&self, hearts: u32) {
        self.send(PresentationCommand::PlayerHealth(hearts));
    }

    pub fn play_effect(&self, effect: SoundEffect) {
        self.send(PresentationCommand::PlayEffect(effect));
    }

    pub fn set_background(&self, background_ref: &str) {
        self.send(PresentationCommand::SetBackground(background_ref.to_string()));
    }

    pub fn clear_scene(&self) {
        self.send(PresentationCommand::ClearScene);
    }

    pub fn show_screen(&self, screen: Screen) {
        self.send(PresentationCommand::ShowScreen(screen));
    }
}
