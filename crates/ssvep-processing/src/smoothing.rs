//! Decision smoothing over consecutive classification cycles
//!
//! Raw per-window decisions flicker near the threshold. The smoother keeps
//! a short label history and only reports a selection once the last few
//! cycles agree; a separate held selection survives undecided stretches
//! until a stable rest clears it.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Per-cycle classification label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    /// Attention on target `index`
    Target(usize),
    /// Below the calibration threshold
    Rest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Labels retained in the history window
    pub history_len: usize,
    /// Consecutive identical labels required for a stable selection
    pub min_agreements: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            history_len: 25,
            min_agreements: 2,
        }
    }
}

pub struct DecisionSmoother {
    config: SmoothingConfig,
    history: VecDeque<Label>,
    held: Option<usize>,
}

impl DecisionSmoother {
    pub fn new(config: SmoothingConfig) -> Self {
        let capacity = config.history_len.max(1);
        DecisionSmoother {
            config,
            history: VecDeque::with_capacity(capacity),
            held: None,
        }
    }

    /// Record one cycle's label and update the held selection.
    pub fn push(&mut self, label: Label) {
        if self.history.len() == self.config.history_len.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(label);
        match self.stable_selection() {
            Some(Label::Target(index)) => self.held = Some(index),
            Some(Label::Rest) => self.held = None,
            None => {}
        }
    }

    /// The label the last `min_agreements` cycles agree on, if any.
    pub fn stable_selection(&self) -> Option<Label> {
        let needed = self.config.min_agreements.max(1);
        if self.history.len() < needed {
            return None;
        }
        let mut recent = self.history.iter().rev().take(needed);
        let first = *recent.next()?;
        if recent.all(|&label| label == first) {
            Some(first)
        } else {
            None
        }
    }

    /// Last stable target, carried through undecided cycles. Cleared only
    /// by a stable rest.
    pub fn held_selection(&self) -> Option<usize> {
        self.held
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.held = None;
    }
}
