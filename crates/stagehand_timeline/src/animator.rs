// SPDX-License-Identifier: MIT OR Apache-2.0
//! The style-mutation seam between the engine and whatever renders targets.

use crate::error::AnimatorError;
use crate::property::PropertySet;
use crate::step::Step;
use std::fmt::Debug;

/// Writes property sets onto targets.
///
/// The engine owns all timing: it calls [`prepare`](Animator::prepare) when a
/// step is scheduled, [`apply`](Animator::apply) once the step's delay has
/// elapsed, and [`seed`](Animator::seed) synchronously while `from` /
/// `from_to` steps are being built. Writes are best-effort; an error is
/// logged and the step still settles on time.
///
/// Methods are called while the timeline's state lock is held, so an
/// implementation must not call back into the timeline that invoked it.
pub trait Animator: Send + Sync + 'static {
    /// Opaque handle to a mutable visual object
    type Target: Clone + Debug + Send + Sync + 'static;

    /// Write `properties` onto `target`
    fn apply(&self, target: &Self::Target, properties: &PropertySet) -> Result<(), AnimatorError>;

    /// Write the pre-animation state of a `from` / `from_to` step
    fn seed(&self, target: &Self::Target, properties: &PropertySet) -> Result<(), AnimatorError> {
        self.apply(target, properties)
    }

    /// Declare the upcoming transition before the step's delay starts
    fn prepare(
        &self,
        _target: &Self::Target,
        _step: &Step<Self::Target>,
    ) -> Result<(), AnimatorError> {
        Ok(())
    }
}
