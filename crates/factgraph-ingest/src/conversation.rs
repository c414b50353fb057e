//! Packaging conversation turns into assertion payloads.
//!
//! A fact usually spans two turns: the question that gives it context and
//! the answer that states it. Each payload therefore carries the previous
//! turn and the current one.

use factgraph_core::AssertionPayload;

/// Turns a stream of conversation turns into payloads.
#[derive(Debug, Clone)]
pub struct TurnPackager {
    min_turns: usize,
    turns_seen: usize,
    previous: Option<String>,
}

impl TurnPackager {
    pub fn new(min_turns: usize) -> Self {
        Self {
            min_turns,
            turns_seen: 0,
            previous: None,
        }
    }

    pub fn turns_seen(&self) -> usize {
        self.turns_seen
    }

    /// Record a turn. Returns a payload once at least `min_turns` turns have
    /// been seen, including this one.
    pub fn on_turn(&mut self, text: &str) -> Option<AssertionPayload> {
        self.turns_seen += 1;
        let current = text.trim().to_string();
        let previous = self.previous.replace(current.clone());

        if self.turns_seen < self.min_turns {
            return None;
        }

        let package = match previous {
            Some(prev) if !prev.is_empty() => format!("{prev}\n{current}"),
            _ => current,
        };
        Some(AssertionPayload::literal(package))
    }
}

impl Default for TurnPackager {
    fn default() -> Self {
        Self::new(2)
    }
}
