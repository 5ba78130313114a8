// SPDX-License-Identifier: MIT OR Apache-2.0
//! Factory for timelines sharing one animator and runtime.

use crate::animator::Animator;
use crate::config::TimelineConfig;
use crate::error::TimelineError;
use crate::timeline::{Timeline, TimelineOptions};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Creates independent timelines.
///
/// Every call returns a fresh timeline exclusively owned by the caller; the
/// factory keeps no registry of what it created.
pub struct TimelineFactory<A: Animator> {
    animator: Arc<A>,
    runtime: Handle,
    config: TimelineConfig,
}

impl<A: Animator> TimelineFactory<A> {
    /// Create a factory on the current tokio runtime
    pub fn new(animator: Arc<A>) -> Result<Self, TimelineError> {
        Ok(Self::with_runtime(animator, Handle::try_current()?))
    }

    /// Create a factory whose timelines run on `runtime`
    pub fn with_runtime(animator: Arc<A>, runtime: Handle) -> Self {
        Self {
            animator,
            runtime,
            config: TimelineConfig::default(),
        }
    }

    /// Use `config` for [`create_configured`](Self::create_configured)
    pub fn with_config(mut self, config: TimelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Create a timeline with explicit options
    pub fn create_timeline(&self, options: TimelineOptions) -> Timeline<A> {
        Timeline::with_runtime(Arc::clone(&self.animator), self.runtime.clone(), options)
    }

    /// Create a timeline from the factory's config, with no callbacks
    pub fn create_configured(&self) -> Timeline<A> {
        self.create_timeline(TimelineOptions::from_config(&self.config))
    }

    /// The animator handed to every timeline
    pub fn animator(&self) -> &Arc<A> {
        &self.animator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::StyleRecorder;
    use crate::property::PropertySet;
    use crate::timeline::{PlayOutcome, Transport};
    use crate::Easing;

    #[tokio::test(start_paused = true)]
    async fn test_timelines_are_independent() {
        let factory = TimelineFactory::new(Arc::new(StyleRecorder::new())).unwrap();
        let first = factory.create_timeline(TimelineOptions::new());
        let second = factory.create_timeline(TimelineOptions::new());
        assert_ne!(first.id(), second.id());

        first.to("a", PropertySet::from([("opacity", "1")]), 100);
        second.to("b", PropertySet::from([("opacity", "1")]), 100);

        let handle = first.play();
        second.play();
        second.stop();

        assert_eq!(handle.await, PlayOutcome::Completed);
        assert_eq!(second.transport(), Transport::Idle);
        assert_eq!(factory.animator().applications_to("a").len(), 1);
        assert!(factory.animator().applications_to("b").is_empty());
    }

    #[tokio::test]
    async fn test_configured_timelines_use_config_easing() {
        let config = TimelineConfig {
            default_easing: Some(Easing::new("linear")),
            ..TimelineConfig::default()
        };
        let factory = TimelineFactory::new(Arc::new(StyleRecorder::new()))
            .unwrap()
            .with_config(config);

        let timeline = factory.create_configured();
        timeline.to("a", PropertySet::new(), 10);
        assert_eq!(timeline.step(0).unwrap().easing().as_str(), "linear");
    }
}
