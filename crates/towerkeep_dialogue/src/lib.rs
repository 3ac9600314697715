//! towerkeep_dialogue - NPC dialogue lines and a linear dialogue runner
//!
//! NPC dialogue is authored directly on map objects as numbered properties
//! (`dialogue1`, `dialogue2`, ...). When an NPC has none, its role supplies a
//! default set. The [`DialogueRunner`] steps through the lines one at a time.
//!
//! # Usage
//!
//! ```rust,ignore
//! use towerkeep_dialogue::{DialoguePlugin, StartDialogue, AdvanceDialogue};
//!
//! app.add_plugins(DialoguePlugin);
//!
//! fn talk(mut start: MessageWriter<StartDialogue>, npc: Single<(Entity, &NpcDialogue)>) {
//!     start.write(StartDialogue { speaker: npc.0, lines: npc.1.lines.clone() });
//! }
//! ```

mod lines;

pub use lines::{collect_numbered_lines, NpcRole};

use bevy::prelude::*;

/// Dialogue lines carried by a spawned NPC
#[derive(Component, Debug, Clone, Default)]
pub struct NpcDialogue {
    pub lines: Vec<String>,
}

/// Message to start a dialogue (sent via MessageWriter, read via MessageReader)
#[derive(Message, Debug, Clone)]
pub struct StartDialogue {
    /// The entity that speaks (e.g., NPC)
    pub speaker: Entity,
    pub lines: Vec<String>,
}

/// Message sent to move to the next line
#[derive(Message, Debug, Clone, Default)]
pub struct AdvanceDialogue;

/// Message sent when a dialogue runs out of lines
#[derive(Message, Debug, Clone)]
pub struct DialogueEnded {
    pub speaker: Entity,
}

/// Current state of an active dialogue
#[derive(Resource, Debug, Clone, Default)]
pub struct DialogueRunner {
    lines: Vec<String>,
    index: usize,
    speaker: Option<Entity>,
}

impl DialogueRunner {
    /// Start a new dialogue. An empty set of lines leaves the runner inactive.
    pub fn start(&mut self, speaker: Entity, lines: Vec<String>) {
        self.index = 0;
        if lines.is_empty() {
            self.lines.clear();
            self.speaker = None;
        } else {
            self.lines = lines;
            self.speaker = Some(speaker);
        }
    }

    /// Move to the next line. Returns false once the dialogue is over.
    pub fn advance(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        self.index += 1;
        if self.index >= self.lines.len() {
            self.end();
            return false;
        }
        true
    }

    /// End the current dialogue
    pub fn end(&mut self) {
        self.lines.clear();
        self.index = 0;
        self.speaker = None;
    }

    /// The line currently shown
    pub fn current(&self) -> Option<&str> {
        self.lines.get(self.index).map(String::as_str)
    }

    pub fn speaker(&self) -> Option<Entity> {
        self.speaker
    }

    /// Check if a dialogue is active
    pub fn is_active(&self) -> bool {
        self.speaker.is_some()
    }
}

/// Plugin for dialogue support
pub struct DialoguePlugin;

impl Plugin for DialoguePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DialogueRunner>()
            .add_message::<StartDialogue>()
            .add_message::<AdvanceDialogue>()
            .add_message::<DialogueEnded>()
            .add_systems(Update, (handle_start_dialogue, handle_advance_dialogue).chain());
    }
}

/// System to handle starting dialogues
fn handle_start_dialogue(
    mut events: MessageReader<StartDialogue>,
    mut runner: ResMut<DialogueRunner>,
) {
    for event in events.read() {
        runner.start(event.speaker, event.lines.clone());
        if let Some(line) = runner.current() {
            info!("{}", line);
        }
    }
}

/// System to step through the active dialogue
fn handle_advance_dialogue(
    mut advance: MessageReader<AdvanceDialogue>,
    mut ended: MessageWriter<DialogueEnded>,
    mut runner: ResMut<DialogueRunner>,
) {
    for _ in advance.read() {
        let Some(speaker) = runner.speaker() else {
            continue;
        };
        if runner.advance() {
            if let Some(line) = runner.current() {
                info!("{}", line);
            }
        } else {
            ended.write(DialogueEnded { speaker });
        }
    }
}
