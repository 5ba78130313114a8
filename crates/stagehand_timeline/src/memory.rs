// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory style store.
//!
//! [`StyleRecorder`] is an [`Animator`] over named targets. It keeps the
//! current inline style of every target and a timestamped journal of every
//! write, which makes timeline behavior observable without a renderer.

use crate::animator::Animator;
use crate::error::AnimatorError;
use crate::property::PropertySet;
use crate::step::Step;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashSet;
use tokio::time::Instant;

/// Kind of recorded write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Build-time pre-animation state
    Seed,
    /// Scheduled step application
    Apply,
}

/// A recorded write
#[derive(Debug, Clone)]
pub struct Mutation {
    /// When the write happened
    pub at: Instant,
    /// Target name
    pub target: String,
    /// Properties written
    pub properties: PropertySet,
    /// Seed or apply
    pub kind: MutationKind,
}

#[derive(Debug, Default)]
struct Stage {
    styles: IndexMap<String, IndexMap<String, String>>,
    journal: Vec<Mutation>,
    detached: HashSet<String>,
}

impl Stage {
    fn write(
        &mut self,
        target: &str,
        properties: &PropertySet,
        kind: MutationKind,
    ) -> Result<(), AnimatorError> {
        if self.detached.contains(target) {
            return Err(AnimatorError::TargetGone(target.to_string()));
        }

        let style = self.styles.entry(target.to_string()).or_default();
        for (name, value) in properties.iter() {
            if value.is_empty() {
                style.shift_remove(name);
            } else {
                style.insert(name.to_string(), value.to_string());
            }
        }

        self.journal.push(Mutation {
            at: Instant::now(),
            target: target.to_string(),
            properties: properties.clone(),
            kind,
        });
        Ok(())
    }
}

/// Animator that records styles and writes in memory
#[derive(Debug, Default)]
pub struct StyleRecorder {
    stage: Mutex<Stage>,
}

impl StyleRecorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of one property; empty values are never stored
    pub fn property(&self, target: &str, name: &str) -> Option<String> {
        self.stage.lock().styles.get(target)?.get(name).cloned()
    }

    /// Current inline style of a target
    pub fn style(&self, target: &str) -> PropertySet {
        self.stage
            .lock()
            .styles
            .get(target)
            .map(|style| style.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// Names of every target that has been written to
    pub fn targets(&self) -> Vec<String> {
        self.stage.lock().styles.keys().cloned().collect()
    }

    /// Every recorded write, oldest first
    pub fn journal(&self) -> Vec<Mutation> {
        self.stage.lock().journal.clone()
    }

    /// Scheduled applications only, oldest first
    pub fn applications(&self) -> Vec<Mutation> {
        self.stage
            .lock()
            .journal
            .iter()
            .filter(|m| m.kind == MutationKind::Apply)
            .cloned()
            .collect()
    }

    /// Scheduled applications to one target
    pub fn applications_to(&self, target: &str) -> Vec<Mutation> {
        self.applications()
            .into_iter()
            .filter(|m| m.target == target)
            .collect()
    }

    /// Make every later write to `target` fail as if it had been removed
    pub fn detach(&self, target: &str) {
        self.stage.lock().detached.insert(target.to_string());
    }

    /// Forget the journal, keeping styles
    pub fn clear_journal(&self) {
        self.stage.lock().journal.clear();
    }
}

impl Animator for StyleRecorder {
    type Target = String;

    fn apply(&self, target: &String, properties: &PropertySet) -> Result<(), AnimatorError> {
        self.stage.lock().write(target, properties, MutationKind::Apply)
    }

    fn seed(&self, target: &String, properties: &PropertySet) -> Result<(), AnimatorError> {
        self.stage.lock().write(target, properties, MutationKind::Seed)
    }

    fn prepare(&self, target: &String, step: &Step<String>) -> Result<(), AnimatorError> {
        let mut stage = self.stage.lock();
        if stage.detached.contains(target) {
            return Err(AnimatorError::TargetGone(target.clone()));
        }
        stage
            .styles
            .entry(target.clone())
            .or_default()
            .insert("transition".to_string(), step.transition_css());
        Ok(())
    }
}
