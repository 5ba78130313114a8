// SPDX-License-Identifier: MIT OR Apache-2.0
//! Step definitions for the timeline.

use crate::property::PropertySet;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepId(pub Uuid);

impl StepId {
    /// Create a new random step ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// An easing token, passed through to the animator untouched
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Easing(Cow<'static, str>);

impl Easing {
    /// Material "standard" curve
    pub const STANDARD: Easing = Easing(Cow::Borrowed("cubic-bezier(0.4, 0, 0.2, 1)"));

    /// Create an easing token
    pub fn new(token: impl Into<Cow<'static, str>>) -> Self {
        Self(token.into())
    }

    /// The token text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Easing {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Easing {
    fn from(token: &'static str) -> Self {
        Self(Cow::Borrowed(token))
    }
}

impl From<String> for Easing {
    fn from(token: String) -> Self {
        Self(Cow::Owned(token))
    }
}

/// Convert signed milliseconds, clamping negative values to zero
pub(crate) fn clamp_ms(ms: i64, what: &'static str) -> Duration {
    if ms < 0 {
        tracing::warn!(value = ms, "negative {what} clamped to zero");
        Duration::ZERO
    } else {
        Duration::from_millis(ms.unsigned_abs())
    }
}

/// Timing of a single step.
///
/// Total wall time of a step is `delay + duration`: properties are written
/// once the delay has elapsed, and the step settles `duration` later.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timing {
    /// Time between property application and settling
    pub duration: Duration,
    /// Time before properties are applied
    pub delay: Duration,
    /// Easing token; `None` uses the timeline default
    pub easing: Option<Easing>,
}

impl Timing {
    /// Timing with the given duration in milliseconds
    pub fn ms(duration: i64) -> Self {
        Self {
            duration: clamp_ms(duration, "duration"),
            delay: Duration::ZERO,
            easing: None,
        }
    }

    /// Set the delay in milliseconds
    pub fn delay(mut self, delay: i64) -> Self {
        self.delay = clamp_ms(delay, "delay");
        self
    }

    /// Set the easing token
    pub fn easing(mut self, easing: impl Into<Easing>) -> Self {
        self.easing = Some(easing.into());
        self
    }

    /// Total wall time of the step
    pub fn total(&self) -> Duration {
        self.delay + self.duration
    }
}

impl From<i32> for Timing {
    fn from(duration: i32) -> Self {
        Self::ms(duration.into())
    }
}

impl From<i64> for Timing {
    fn from(duration: i64) -> Self {
        Self::ms(duration)
    }
}

impl From<u32> for Timing {
    fn from(duration: u32) -> Self {
        Self::ms(duration.into())
    }
}

impl From<u64> for Timing {
    fn from(duration: u64) -> Self {
        Self {
            duration: Duration::from_millis(duration),
            ..Self::default()
        }
    }
}

impl From<Duration> for Timing {
    fn from(duration: Duration) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }
}

/// One timed property mutation against one target.
///
/// Steps are immutable once appended to a timeline.
#[derive(Debug)]
pub struct Step<T> {
    id: StepId,
    target: Option<T>,
    properties: PropertySet,
    duration: Duration,
    delay: Duration,
    easing: Easing,
}

impl<T> Step<T> {
    pub(crate) fn new(
        target: T,
        properties: PropertySet,
        timing: Timing,
        fallback: &Easing,
    ) -> Self {
        Self {
            id: StepId::new(),
            target: Some(target),
            properties,
            duration: timing.duration,
            delay: timing.delay,
            easing: timing.easing.unwrap_or_else(|| fallback.clone()),
        }
    }

    /// A step that only consumes time
    pub(crate) fn pause(duration: Duration) -> Self {
        Self {
            id: StepId::new(),
            target: None,
            properties: PropertySet::new(),
            duration,
            delay: Duration::ZERO,
            easing: Easing::default(),
        }
    }

    /// Unique step ID
    pub fn id(&self) -> StepId {
        self.id
    }

    /// Target of the step; `None` for waits
    pub fn target(&self) -> Option<&T> {
        self.target.as_ref()
    }

    /// Properties written when the delay elapses
    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// Time between application and settling
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time before application
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Easing token
    pub fn easing(&self) -> &Easing {
        &self.easing
    }

    /// Total wall time, `delay + duration`
    pub fn total(&self) -> Duration {
        self.delay + self.duration
    }

    /// Whether this step only consumes time
    pub fn is_wait(&self) -> bool {
        self.target.is_none()
    }

    /// CSS `transition` declaration for this step,
    /// e.g. `opacity, transform 500ms ease-out`
    pub fn transition_css(&self) -> String {
        let names: Vec<_> = self.properties.names().collect();
        format!(
            "{} {}ms {}",
            names.join(", "),
            self.duration.as_millis(),
            self.easing
        )
    }
}
