// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline: step builder, transport and the scheduling loop.
//!
//! A [`Timeline`] accumulates sequential steps and parallel groups without
//! executing anything. [`Timeline::play`] spawns a run loop on the tokio
//! runtime that walks the steps from the cursor, scheduling each step as its
//! own timer task: after the step's delay the properties are applied, after
//! its duration the step settles and the cursor advances. When the sequential
//! steps are exhausted, pending parallel groups are dequeued one at a time,
//! all members started together, and the loop waits for the slowest one.
//!
//! `pause` and `stop` abort every outstanding timer task and bump an epoch
//! counter under the state lock; every task re-checks the epoch under the
//! same lock before mutating anything, so stale work is inert.
//!
//! A paused step does not keep its progress: on resume it runs again from
//! the start of its delay. Properties that were already applied during the
//! interrupted run are not applied a second time.

use crate::animator::Animator;
use crate::config::TimelineConfig;
use crate::error::TimelineError;
use crate::property::PropertySet;
use crate::step::{clamp_ms, Easing, Step, StepId, Timing};
use crate::timers::TimerSet;
use futures::future::join_all;
use futures::FutureExt;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use uuid::Uuid;

/// Unique identifier for a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimelineId(pub Uuid);

impl TimelineId {
    /// Create a new random timeline ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimelineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TimelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// Not playing; the cursor is at the first step
    #[default]
    Idle,
    /// Steps are being executed
    Playing,
    /// Playback is suspended at the cursor
    Paused,
}

impl Transport {
    /// Check if steps are being executed
    pub fn is_playing(&self) -> bool {
        matches!(self, Transport::Playing)
    }

    /// Check if playback is suspended
    pub fn is_paused(&self) -> bool {
        matches!(self, Transport::Paused)
    }

    /// Check if idle
    pub fn is_idle(&self) -> bool {
        matches!(self, Transport::Idle)
    }
}

/// How a pass started by [`Timeline::play`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Every step and group settled
    Completed,
    /// The timeline was stopped or dropped first
    Stopped,
    /// The timeline was already playing; nothing was started
    AlreadyPlaying,
}

type Callback = Arc<dyn Fn() + Send + Sync>;

/// Repeat policy and notifications for a timeline.
///
/// Callbacks are fire-and-forget and never awaited. They are not isolated:
/// a panicking `on_complete` or `on_repeat` ends the repeat chain, and a
/// panicking `on_start` unwinds into the caller of `play`.
#[derive(Clone, Default)]
pub struct TimelineOptions {
    /// Restart from the first step after every completed pass
    pub repeat: bool,
    /// Pause between a completed pass and the next one
    pub repeat_delay: Duration,
    /// Easing for steps that do not name one
    pub default_easing: Easing,
    on_start: Option<Callback>,
    on_complete: Option<Callback>,
    on_repeat: Option<Callback>,
}

impl TimelineOptions {
    /// Options with no repeat and no callbacks
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from serialized settings
    pub fn from_config(config: &TimelineConfig) -> Self {
        Self {
            repeat: config.repeat,
            repeat_delay: Duration::from_millis(config.repeat_delay_ms),
            default_easing: config.default_easing.clone().unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Set the repeat flag
    pub fn repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    /// Set the repeat delay in milliseconds
    pub fn repeat_delay(mut self, ms: i64) -> Self {
        self.repeat_delay = clamp_ms(ms, "repeat delay");
        self
    }

    /// Set the default easing
    pub fn default_easing(mut self, easing: impl Into<Easing>) -> Self {
        self.default_easing = easing.into();
        self
    }

    /// Called when playback starts from idle (not on resume)
    pub fn on_start(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_start = Some(Arc::new(callback));
        self
    }

    /// Called when a pass completes
    pub fn on_complete(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    /// Called after the repeat delay, right before the next pass starts
    pub fn on_repeat(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_repeat = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for TimelineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimelineOptions")
            .field("repeat", &self.repeat)
            .field("repeat_delay", &self.repeat_delay)
            .field("default_easing", &self.default_easing)
            .field("on_start", &self.on_start.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_repeat", &self.on_repeat.is_some())
            .finish()
    }
}

/// Settles when a pass started by [`Timeline::play`] ends
#[derive(Debug)]
pub struct PlayHandle {
    rx: oneshot::Receiver<PlayOutcome>,
}

impl Future for PlayHandle {
    type Output = PlayOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<PlayOutcome> {
        // A dropped sender means the timeline went away mid-pass
        self.rx
            .poll_unpin(cx)
            .map(|outcome| outcome.unwrap_or(PlayOutcome::Stopped))
    }
}

type StepRef<T> = Arc<Step<T>>;

struct State<T> {
    steps: Vec<StepRef<T>>,
    groups: VecDeque<Vec<StepRef<T>>>,
    labels: IndexMap<String, usize>,
    cursor: usize,
    transport: Transport,
    /// Bumped whenever outstanding work must become inert
    epoch: u64,
    /// Steps of the in-flight step/group that already applied their properties
    applied: HashSet<StepId>,
    timers: TimerSet,
    waiters: Vec<oneshot::Sender<PlayOutcome>>,
}

impl<T> State<T> {
    fn new() -> Self {
        Self {
            steps: Vec::new(),
            groups: VecDeque::new(),
            labels: IndexMap::new(),
            cursor: 0,
            transport: Transport::Idle,
            epoch: 0,
            applied: HashSet::new(),
            timers: TimerSet::default(),
            waiters: Vec::new(),
        }
    }
}

struct Shared<A: Animator> {
    id: TimelineId,
    animator: Arc<A>,
    runtime: Handle,
    options: TimelineOptions,
    state: Mutex<State<A::Target>>,
}

enum Next {
    Stale,
    Step(oneshot::Receiver<()>),
    Group(Vec<oneshot::Receiver<()>>),
    Done,
}

enum Advance {
    Cursor,
    Group,
}

impl<A: Animator> Shared<A> {
    /// Start executing from the cursor. Caller holds the state lock.
    fn start_run(self: &Arc<Self>, state: &mut State<A::Target>) {
        state.transport = Transport::Playing;
        state.epoch += 1;
        let epoch = state.epoch;
        self.spawn_run(state, epoch);
    }

    fn spawn_run(self: &Arc<Self>, state: &mut State<A::Target>, epoch: u64) {
        let task = self.runtime.spawn(run(Arc::downgrade(self), epoch));
        state.timers.track(task);
    }

    /// Schedule whatever comes next at the cursor
    fn schedule_next(self: &Arc<Self>, epoch: u64) -> Next {
        let mut state = self.state.lock();
        if state.epoch != epoch || !state.transport.is_playing() {
            return Next::Stale;
        }

        if let Some(step) = state.steps.get(state.cursor).cloned() {
            tracing::debug!(
                timeline = %self.id,
                step = %step.id(),
                cursor = state.cursor,
                delay_ms = step.delay().as_millis() as u64,
                duration_ms = step.duration().as_millis() as u64,
                "scheduling step"
            );
            return Next::Step(self.schedule(&mut state, step, epoch));
        }

        if let Some(group) = state.groups.front().cloned() {
            tracing::debug!(timeline = %self.id, members = group.len(), "scheduling parallel group");
            let settled = group
                .into_iter()
                .map(|step| self.schedule(&mut state, step, epoch))
                .collect();
            return Next::Group(settled);
        }

        Next::Done
    }

    /// Spawn the timer task of one step. Caller holds the state lock.
    fn schedule(
        self: &Arc<Self>,
        state: &mut State<A::Target>,
        step: StepRef<A::Target>,
        epoch: u64,
    ) -> oneshot::Receiver<()> {
        if let Some(target) = step.target() {
            if let Err(err) = self.animator.prepare(target, &step) {
                tracing::debug!(timeline = %self.id, ?target, "transition not declared: {err}");
            }
        }

        let (settled_tx, settled_rx) = oneshot::channel();
        let task = self
            .runtime
            .spawn(step_timer(Arc::downgrade(self), step, epoch, settled_tx));
        state.timers.track(task);
        settled_rx
    }

    /// Apply a step's properties unless its run went stale.
    /// Returns false if the run is stale.
    fn apply(&self, step: &Step<A::Target>, epoch: u64) -> bool {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            return false;
        }

        let Some(target) = step.target() else {
            return true;
        };
        if !state.applied.insert(step.id()) {
            tracing::trace!(timeline = %self.id, step = %step.id(), "already applied this pass");
            return true;
        }
        if let Err(err) = self.animator.apply(target, step.properties()) {
            tracing::debug!(timeline = %self.id, step = %step.id(), ?target, "apply failed: {err}");
        }
        true
    }

    /// Move past a settled step or group. Returns false if the run is stale.
    fn advance(&self, epoch: u64, advance: Advance) -> bool {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            return false;
        }

        state.applied.clear();
        match advance {
            Advance::Cursor => state.cursor += 1,
            Advance::Group => {
                state.groups.pop_front();
            }
        }
        true
    }

    fn complete(self: &Arc<Self>, epoch: u64) {
        let waiters = {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                return;
            }
            state.transport = Transport::Idle;
            state.cursor = 0;
            state.applied.clear();
            std::mem::take(&mut state.waiters)
        };

        tracing::info!(timeline = %self.id, "timeline complete");
        if let Some(on_complete) = &self.options.on_complete {
            on_complete();
        }
        for waiter in waiters {
            let _ = waiter.send(PlayOutcome::Completed);
        }

        if self.options.repeat {
            let mut state = self.state.lock();
            // A callback may have restarted or stopped the timeline
            if state.epoch == epoch && state.transport.is_idle() {
                let delay = self.options.repeat_delay;
                let task = self
                    .runtime
                    .spawn(repeat_after(Arc::downgrade(self), epoch, delay));
                state.timers.track(task);
            }
        }
    }
}

/// The scheduling loop of one run (from play or resume until pause, stop or
/// completion).
async fn run<A: Animator>(shared: Weak<Shared<A>>, epoch: u64) {
    loop {
        let Some(timeline) = shared.upgrade() else {
            return;
        };
        let next = timeline.schedule_next(epoch);
        drop(timeline);

        let advance = match next {
            Next::Stale => return,
            Next::Done => {
                if let Some(timeline) = shared.upgrade() {
                    timeline.complete(epoch);
                }
                return;
            }
            Next::Step(settled) => {
                // Err: the timer was cancelled
                if settled.await.is_err() {
                    return;
                }
                Advance::Cursor
            }
            Next::Group(settled) => {
                let results = join_all(settled).await;
                if results.iter().any(Result::is_err) {
                    return;
                }
                Advance::Group
            }
        };

        let Some(timeline) = shared.upgrade() else {
            return;
        };
        if !timeline.advance(epoch, advance) {
            return;
        }
        drop(timeline);

        // Zero-length steps must not run back to back in one tick
        tokio::task::yield_now().await;
    }
}

/// Timer task of one step: apply after the delay, settle after the duration.
async fn step_timer<A: Animator>(
    shared: Weak<Shared<A>>,
    step: StepRef<A::Target>,
    epoch: u64,
    settled: oneshot::Sender<()>,
) {
    tokio::time::sleep(step.delay()).await;
    match shared.upgrade() {
        Some(timeline) if timeline.apply(&step, epoch) => {}
        _ => return,
    }

    tokio::time::sleep(step.duration()).await;
    let _ = settled.send(());
}

async fn repeat_after<A: Animator>(shared: Weak<Shared<A>>, epoch: u64, delay: Duration) {
    tokio::time::sleep(delay).await;
    let Some(timeline) = shared.upgrade() else {
        return;
    };
    {
        let state = timeline.state.lock();
        if state.epoch != epoch || !state.transport.is_idle() {
            return;
        }
    }

    tracing::debug!(timeline = %timeline.id, "repeating");
    if let Some(on_repeat) = &timeline.options.on_repeat {
        on_repeat();
    }
    let _ = Timeline { shared: timeline }.play();
}

fn seed<A: Animator>(animator: &A, target: &A::Target, properties: &PropertySet) {
    if let Err(err) = animator.seed(target, properties) {
        tracing::debug!(?target, "seed failed: {err}");
    }
}

/// An ordered set of steps and parallel groups with play/pause/stop transport.
///
/// `Timeline` is a handle: clones share the same steps and transport. Builder
/// methods take `&self` and return `&Self`, so they chain. Playback requires
/// a tokio runtime; timers run as tasks on it. Dropping the last handle
/// cancels every outstanding timer.
pub struct Timeline<A: Animator> {
    shared: Arc<Shared<A>>,
}

impl<A: Animator> Clone for Timeline<A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A: Animator> fmt::Debug for Timeline<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Timeline")
            .field("id", &self.shared.id)
            .field("transport", &state.transport)
            .field("cursor", &state.cursor)
            .field("steps", &state.steps.len())
            .field("groups", &state.groups.len())
            .finish()
    }
}

impl<A: Animator> Timeline<A> {
    /// Create a timeline on the current tokio runtime
    pub fn new(animator: Arc<A>, options: TimelineOptions) -> Result<Self, TimelineError> {
        Ok(Self::with_runtime(animator, Handle::try_current()?, options))
    }

    /// Create a timeline whose timers run on `runtime`
    pub fn with_runtime(animator: Arc<A>, runtime: Handle, options: TimelineOptions) -> Self {
        let id = TimelineId::new();
        tracing::trace!(timeline = %id, ?options, "timeline created");
        Self {
            shared: Arc::new(Shared {
                id,
                animator,
                runtime,
                options,
                state: Mutex::new(State::new()),
            }),
        }
    }

    fn push(&self, step: Step<A::Target>) -> &Self {
        self.shared.state.lock().steps.push(Arc::new(step));
        self
    }

    /// Append a step animating `target` to `properties`
    pub fn to(
        &self,
        target: impl Into<A::Target>,
        properties: impl Into<PropertySet>,
        timing: impl Into<Timing>,
    ) -> &Self {
        self.push(Step::new(
            target.into(),
            properties.into(),
            timing.into(),
            &self.shared.options.default_easing,
        ))
    }

    /// Write `properties` onto `target` now, then append a step animating
    /// each of them back to its natural value
    pub fn from(
        &self,
        target: impl Into<A::Target>,
        properties: impl Into<PropertySet>,
        timing: impl Into<Timing>,
    ) -> &Self {
        let target = target.into();
        let properties = properties.into();
        seed(&*self.shared.animator, &target, &properties);
        self.to(target, properties.cleared(), timing)
    }

    /// Write `from` onto `target` now, then append a step animating to `to`
    #[allow(clippy::wrong_self_convention)]
    pub fn from_to(
        &self,
        target: impl Into<A::Target>,
        from: impl Into<PropertySet>,
        to: impl Into<PropertySet>,
        timing: impl Into<Timing>,
    ) -> &Self {
        let target = target.into();
        seed(&*self.shared.animator, &target, &from.into());
        self.to(target, to, timing)
    }

    /// Append a step that only consumes `ms` milliseconds
    pub fn wait(&self, ms: i64) -> &Self {
        self.push(Step::pause(clamp_ms(ms, "wait")))
    }

    /// Append a parallel group built by `build`.
    ///
    /// Groups run after every sequential step, in the order declared, each
    /// once the previous group has fully settled. A group is consumed once it
    /// settles.
    pub fn parallel<F>(&self, build: F) -> &Self
    where
        F: FnOnce(&mut GroupBuilder<'_, A>),
    {
        let mut group = GroupBuilder {
            animator: &*self.shared.animator,
            default_easing: &self.shared.options.default_easing,
            steps: Vec::new(),
        };
        build(&mut group);
        let steps = group.steps;
        self.shared.state.lock().groups.push_back(steps);
        self
    }

    /// Name the position of the next sequential step
    pub fn add_label(&self, name: impl Into<String>) -> &Self {
        let mut state = self.shared.state.lock();
        let position = state.steps.len();
        state.labels.insert(name.into(), position);
        self
    }

    /// Reverse the order of the sequential steps in place
    pub fn reverse(&self) -> &Self {
        self.shared.state.lock().steps.reverse();
        self
    }

    /// Start playing from the cursor.
    ///
    /// From idle this fires `on_start`; from paused it resumes without it.
    /// The returned handle settles when the whole pass, trailing parallel
    /// groups included, has completed or is stopped.
    pub fn play(&self) -> PlayHandle {
        let (tx, rx) = oneshot::channel();
        let handle = PlayHandle { rx };

        let epoch = {
            let mut state = self.shared.state.lock();
            match state.transport {
                Transport::Playing => {
                    let _ = tx.send(PlayOutcome::AlreadyPlaying);
                    return handle;
                }
                Transport::Paused => {
                    state.waiters.push(tx);
                    self.shared.start_run(&mut state);
                    tracing::info!(timeline = %self.shared.id, cursor = state.cursor, "timeline resumed");
                    return handle;
                }
                Transport::Idle => {
                    state.waiters.push(tx);
                    state.transport = Transport::Playing;
                    state.epoch += 1;
                    state.epoch
                }
            }
        };

        tracing::info!(timeline = %self.shared.id, "timeline playing");
        if let Some(on_start) = &self.shared.options.on_start {
            on_start();
        }

        let mut state = self.shared.state.lock();
        // on_start may have paused or stopped us
        if state.epoch == epoch && state.transport.is_playing() {
            self.shared.spawn_run(&mut state, epoch);
        }
        handle
    }

    /// Suspend playback, cancelling the in-flight step's timers.
    ///
    /// The in-flight step runs again from the start of its delay on resume.
    pub fn pause(&self) -> &Self {
        let mut state = self.shared.state.lock();
        if !state.transport.is_playing() {
            return self;
        }

        state.transport = Transport::Paused;
        state.epoch += 1;
        let cancelled = state.timers.cancel_all();
        tracing::info!(timeline = %self.shared.id, cursor = state.cursor, cancelled, "timeline paused");
        self
    }

    /// Continue from the cursor; no-op unless paused
    pub fn resume(&self) -> &Self {
        let mut state = self.shared.state.lock();
        if !state.transport.is_paused() {
            return self;
        }

        self.shared.start_run(&mut state);
        tracing::info!(timeline = %self.shared.id, cursor = state.cursor, "timeline resumed");
        self
    }

    /// Cancel all timers and reset the cursor. Fires no callback.
    pub fn stop(&self) -> &Self {
        let waiters = {
            let mut state = self.shared.state.lock();
            state.transport = Transport::Idle;
            state.cursor = 0;
            state.epoch += 1;
            state.applied.clear();
            let cancelled = state.timers.cancel_all();
            if cancelled > 0 {
                tracing::info!(timeline = %self.shared.id, cancelled, "timeline stopped");
            }
            std::mem::take(&mut state.waiters)
        };

        for waiter in waiters {
            let _ = waiter.send(PlayOutcome::Stopped);
        }
        self
    }

    /// Stop, then play from the first step
    pub fn restart(&self) -> PlayHandle {
        self.stop();
        self.play()
    }

    /// Timeline ID
    pub fn id(&self) -> TimelineId {
        self.shared.id
    }

    /// Current transport state
    pub fn transport(&self) -> Transport {
        self.shared.state.lock().transport
    }

    /// Whether steps are being executed
    pub fn is_playing(&self) -> bool {
        self.transport().is_playing()
    }

    /// Whether playback is suspended
    pub fn is_paused(&self) -> bool {
        self.transport().is_paused()
    }

    /// Index of the next sequential step to run
    pub fn cursor(&self) -> usize {
        self.shared.state.lock().cursor
    }

    /// Number of sequential steps
    pub fn len(&self) -> usize {
        self.shared.state.lock().steps.len()
    }

    /// Whether there are no sequential steps
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sequential step at `index`
    pub fn step(&self, index: usize) -> Option<Arc<Step<A::Target>>> {
        self.shared.state.lock().steps.get(index).cloned()
    }

    /// Number of parallel groups not yet settled
    pub fn pending_groups(&self) -> usize {
        self.shared.state.lock().groups.len()
    }

    /// Position recorded for a label
    pub fn label(&self, name: &str) -> Option<usize> {
        self.shared.state.lock().labels.get(name).copied()
    }

    /// All labels with their positions, in declaration order
    pub fn labels(&self) -> Vec<(String, usize)> {
        self.shared
            .state
            .lock()
            .labels
            .iter()
            .map(|(name, position)| (name.clone(), *position))
            .collect()
    }
}

/// Collects the members of one parallel group.
///
/// Handed to the closure passed to [`Timeline::parallel`].
pub struct GroupBuilder<'a, A: Animator> {
    animator: &'a A,
    default_easing: &'a Easing,
    steps: Vec<StepRef<A::Target>>,
}

impl<'a, A: Animator> GroupBuilder<'a, A> {
    /// Add a member animating `target` to `properties`
    pub fn to(
        &mut self,
        target: impl Into<A::Target>,
        properties: impl Into<PropertySet>,
        timing: impl Into<Timing>,
    ) -> &mut Self {
        let step = Step::new(target.into(), properties.into(), timing.into(), self.default_easing);
        self.steps.push(Arc::new(step));
        self
    }

    /// Seed `properties` now and add a member animating them back
    pub fn from(
        &mut self,
        target: impl Into<A::Target>,
        properties: impl Into<PropertySet>,
        timing: impl Into<Timing>,
    ) -> &mut Self {
        let target = target.into();
        let properties = properties.into();
        seed(self.animator, &target, &properties);
        self.to(target, properties.cleared(), timing)
    }

    /// Seed `from` now and add a member animating to `to`
    #[allow(clippy::wrong_self_convention)]
    pub fn from_to(
        &mut self,
        target: impl Into<A::Target>,
        from: impl Into<PropertySet>,
        to: impl Into<PropertySet>,
        timing: impl Into<Timing>,
    ) -> &mut Self {
        let target = target.into();
        seed(self.animator, &target, &from.into());
        self.to(target, to, timing)
    }

    /// Add a member that only consumes `ms` milliseconds
    pub fn wait(&mut self, ms: i64) -> &mut Self {
        self.steps.push(Arc::new(Step::pause(clamp_ms(ms, "wait"))));
        self
    }

    /// Number of members so far
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the group has no members yet
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MutationKind, StyleRecorder};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Instant};

    fn setup(options: TimelineOptions) -> (Arc<StyleRecorder>, Timeline<StyleRecorder>) {
        let recorder = Arc::new(StyleRecorder::new());
        let timeline = Timeline::new(Arc::clone(&recorder), options).unwrap();
        (recorder, timeline)
    }

    fn elapsed_ms(start: Instant, at: Instant) -> u64 {
        at.duration_since(start).as_millis() as u64
    }

    #[track_caller]
    fn assert_near(actual: u64, expected: u64) {
        assert!(
            (expected..expected + 5).contains(&actual),
            "expected ~{expected}ms, got {actual}ms"
        );
    }

    fn opacity() -> PropertySet {
        PropertySet::from([("opacity", "1")])
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_steps_follow_delay_and_duration() {
        let completed = Arc::new(Mutex::new(None));
        let completed_at = Arc::clone(&completed);
        let (recorder, timeline) = setup(
            TimelineOptions::new().on_complete(move || *completed_at.lock() = Some(Instant::now())),
        );

        let start = Instant::now();
        let outcome = timeline
            .to("a", opacity(), 500)
            .to("b", opacity(), Timing::ms(300).delay(100))
            .play()
            .await;

        assert_eq!(outcome, PlayOutcome::Completed);
        let applied = recorder.applications();
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[0].target, "a");
        assert_near(elapsed_ms(start, applied[0].at), 0);
        assert_eq!(applied[1].target, "b");
        assert_near(elapsed_ms(start, applied[1].at), 600);

        let completed_at = completed.lock().expect("on_complete fired");
        assert_near(elapsed_ms(start, completed_at), 900);
        assert_near(elapsed_ms(start, Instant::now()), 900);

        assert_eq!(timeline.transport(), Transport::Idle);
        assert_eq!(timeline.cursor(), 0);
        assert_eq!(recorder.property("b", "opacity").as_deref(), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_apply_once_in_list_order() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        for (i, name) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
            timeline.to(name, opacity(), Timing::ms(40).delay(i as i64 * 10));
        }

        timeline.play().await;

        let targets: Vec<_> = recorder.applications().into_iter().map(|m| m.target).collect();
        assert_eq!(targets, ["a", "b", "c", "d", "e"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_steps_declare_transition_before_delay() {
        let (recorder, timeline) = setup(TimelineOptions::new().default_easing("ease-out"));
        let handle = timeline
            .to(
                "a",
                PropertySet::from([("opacity", "1"), ("transform", "none")]),
                Timing::ms(200).delay(100),
            )
            .play();

        sleep(Duration::from_millis(50)).await;
        assert_eq!(
            recorder.property("a", "transition").as_deref(),
            Some("opacity, transform 200ms ease-out")
        );
        assert!(recorder.applications().is_empty());

        handle.await;
        assert_eq!(recorder.property("a", "opacity").as_deref(), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_length_steps_never_run_in_the_play_tick() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        let handle = timeline
            .to("a", opacity(), 0)
            .to("b", opacity(), 0)
            .to("c", opacity(), 0)
            .play();

        assert!(recorder.journal().is_empty());
        assert_eq!(handle.await, PlayOutcome::Completed);
        assert_eq!(recorder.applications().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_delays_next_step_without_mutations() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        let start = Instant::now();
        timeline
            .to("a", opacity(), 100)
            .wait(250)
            .to("b", opacity(), 50)
            .play()
            .await;

        let journal = recorder.journal();
        assert_eq!(journal.len(), 2);
        assert_near(elapsed_ms(start, journal[0].at), 0);
        assert_near(elapsed_ms(start, journal[1].at), 350);
        assert!(timeline.step(1).unwrap().is_wait());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_group_settles_with_slowest_member() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        timeline
            .parallel(|group| {
                group.to("a", opacity(), 100).to("b", opacity(), 200).to("c", opacity(), 300);
            })
            .parallel(|group| {
                group.to("d", opacity(), 50);
            });
        assert_eq!(timeline.pending_groups(), 2);
        assert!(timeline.is_empty());

        let start = Instant::now();
        assert_eq!(timeline.play().await, PlayOutcome::Completed);

        for name in ["a", "b", "c"] {
            let applied = recorder.applications_to(name);
            assert_eq!(applied.len(), 1);
            assert_near(elapsed_ms(start, applied[0].at), 0);
        }
        let d = recorder.applications_to("d");
        assert_eq!(d.len(), 1);
        let d_at = elapsed_ms(start, d[0].at);
        assert!((300..400).contains(&d_at), "group settled at {d_at}ms");
        assert_near(elapsed_ms(start, Instant::now()), 350);
        assert_eq!(timeline.pending_groups(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_groups_run_after_sequential_steps() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        timeline
            .parallel(|group| {
                group.to("group", opacity(), 10);
            })
            .to("first", opacity(), 100);

        let start = Instant::now();
        timeline.play().await;

        let applied = recorder.applications();
        assert_eq!(applied[0].target, "first");
        assert_eq!(applied[1].target, "group");
        assert_near(elapsed_ms(start, applied[1].at), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_resume_applies_each_step_once() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        let start = Instant::now();
        let handle = timeline
            .to("a", opacity(), 100)
            .to("b", opacity(), Timing::ms(100).delay(50))
            .to("c", opacity(), 100)
            .play();

        // b is waiting out its delay
        sleep(Duration::from_millis(120)).await;
        timeline.pause();
        assert_eq!(timeline.transport(), Transport::Paused);
        assert_eq!(timeline.cursor(), 1);
        timeline.resume();

        // b has applied and is mid-duration
        sleep(Duration::from_millis(60)).await;
        assert_eq!(recorder.applications_to("b").len(), 1);
        timeline.pause().resume();

        assert_eq!(handle.await, PlayOutcome::Completed);
        for name in ["a", "b", "c"] {
            assert_eq!(recorder.applications_to(name).len(), 1, "{name} applied once");
        }
        // b restarted from its own start at 180ms: 50 delay + 100 duration
        let c = recorder.applications_to("c");
        assert_near(elapsed_ms(start, c[0].at), 330);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paused_timeline_does_not_progress() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        let _handle = timeline
            .to("a", opacity(), 100)
            .to("b", opacity(), Timing::ms(100).delay(50))
            .play();

        sleep(Duration::from_millis(120)).await;
        timeline.pause();
        sleep(Duration::from_secs(5)).await;

        assert_eq!(recorder.applications().len(), 1);
        assert_eq!(timeline.cursor(), 1);
        assert!(timeline.is_paused());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pausing_a_group_reruns_it_without_reapplying() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        let start = Instant::now();
        let handle = timeline
            .to("s", opacity(), 50)
            .parallel(|group| {
                group
                    .to("a", opacity(), Timing::ms(100).delay(10))
                    .to("b", opacity(), Timing::ms(100).delay(200));
            })
            .play();

        // a has applied, b is still waiting out its delay
        sleep(Duration::from_millis(120)).await;
        timeline.pause();
        assert_eq!(recorder.applications_to("a").len(), 1);
        assert!(recorder.applications_to("b").is_empty());
        assert_eq!(timeline.pending_groups(), 1);

        sleep(Duration::from_millis(500)).await;
        assert!(recorder.applications_to("b").is_empty());
        timeline.resume();

        assert_eq!(handle.await, PlayOutcome::Completed);
        let settled = elapsed_ms(start, Instant::now());
        for name in ["s", "a", "b"] {
            assert_eq!(recorder.applications_to(name).len(), 1, "{name} applied once");
        }
        let at = |name: &str| elapsed_ms(start, recorder.applications_to(name)[0].at);
        assert_near(at("s"), 0);
        assert_near(at("a"), 60);
        // The group restarted at 620ms: b waits its full 200ms delay again
        assert_near(at("b"), 820);
        assert_near(settled, 920);
        assert_eq!(timeline.pending_groups(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_resets_cursor_and_cancels_timers() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        let handle = timeline
            .to("a", opacity(), 100)
            .to("b", opacity(), Timing::ms(100).delay(100))
            .play();

        sleep(Duration::from_millis(150)).await;
        timeline.stop();
        assert_eq!(handle.await, PlayOutcome::Stopped);
        assert_eq!(timeline.cursor(), 0);
        assert_eq!(timeline.transport(), Transport::Idle);

        sleep(Duration::from_secs(1)).await;
        assert_eq!(recorder.applications().len(), 1);

        assert_eq!(timeline.play().await, PlayOutcome::Completed);
        let targets: Vec<_> = recorder.applications().into_iter().map(|m| m.target).collect();
        assert_eq!(targets, ["a", "a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_orders_complete_delay_and_repeat() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (on_complete, on_repeat) = (Arc::clone(&events), Arc::clone(&events));
        let (recorder, timeline) = setup(
            TimelineOptions::new()
                .repeat(true)
                .repeat_delay(1000)
                .on_complete(move || on_complete.lock().push(("complete", Instant::now())))
                .on_repeat(move || on_repeat.lock().push(("repeat", Instant::now()))),
        );

        let start = Instant::now();
        timeline.to("a", opacity(), 200);
        assert_eq!(timeline.play().await, PlayOutcome::Completed);

        sleep(Duration::from_millis(1300)).await;
        timeline.stop();
        sleep(Duration::from_secs(5)).await;

        let events = events.lock().clone();
        let names: Vec<_> = events.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["complete", "repeat", "complete"]);
        assert_near(elapsed_ms(start, events[0].1), 200);
        assert!(elapsed_ms(events[0].1, events[1].1) >= 1000);
        assert_near(elapsed_ms(start, events[1].1), 1200);
        assert_near(elapsed_ms(start, events[2].1), 1400);

        let applied = recorder.applications_to("a");
        assert_eq!(applied.len(), 2);
        assert!(applied[1].at >= events[1].1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_repeat_delay_cancels_repeat() {
        let repeats = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&repeats);
        let (recorder, timeline) = setup(
            TimelineOptions::new()
                .repeat(true)
                .repeat_delay(500)
                .on_repeat(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
        );

        timeline.to("a", opacity(), 100).play().await;
        sleep(Duration::from_millis(200)).await;
        timeline.stop();
        sleep(Duration::from_secs(2)).await;

        assert_eq!(repeats.load(Ordering::SeqCst), 0);
        assert_eq!(recorder.applications().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_start_fires_once_per_play_from_idle() {
        let starts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&starts);
        let (_recorder, timeline) = setup(TimelineOptions::new().on_start(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let first = timeline.to("a", opacity(), 100).to("b", opacity(), 100).play();
        assert_eq!(timeline.play().await, PlayOutcome::AlreadyPlaying);

        sleep(Duration::from_millis(50)).await;
        timeline.pause().resume().pause();
        // play while paused resumes and joins the running pass
        let second = timeline.play();

        assert_eq!(first.await, PlayOutcome::Completed);
        assert_eq!(second.await, PlayOutcome::Completed);
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        timeline.restart().await;
        assert_eq!(starts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_noops_are_idempotent() {
        let (_recorder, timeline) = setup(TimelineOptions::new());
        timeline.pause().resume().stop().stop();
        assert_eq!(timeline.transport(), Transport::Idle);

        timeline.to("a", opacity(), 100);
        let handle = timeline.play();
        timeline.resume().resume();
        timeline.pause().pause();
        assert!(timeline.is_paused());
        timeline.resume();
        assert!(timeline.is_playing());
        assert_eq!(handle.await, PlayOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_from_seeds_at_build_time() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        timeline.from("a", PropertySet::from([("opacity", "0"), ("transform", "scale(0.8)")]), 300);

        let journal = recorder.journal();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].kind, MutationKind::Seed);
        assert_eq!(recorder.property("a", "opacity").as_deref(), Some("0"));

        let step = timeline.step(0).unwrap();
        assert_eq!(step.properties().get("opacity"), Some(""));
        assert_eq!(step.properties().get("transform"), Some(""));

        timeline.play().await;
        assert_eq!(recorder.property("a", "opacity"), None);
        assert_eq!(recorder.property("a", "transform"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_from_to_seeds_then_animates() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        timeline.from_to(
            "a",
            PropertySet::from([("opacity", "0")]),
            PropertySet::from([("opacity", "0.5")]),
            200,
        );
        assert_eq!(recorder.property("a", "opacity").as_deref(), Some("0"));

        timeline.play().await;
        assert_eq!(recorder.property("a", "opacity").as_deref(), Some("0.5"));
        assert_eq!(recorder.journal()[0].kind, MutationKind::Seed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_group_builder_seeds_members() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        timeline.parallel(|group| {
            group
                .from("a", PropertySet::from([("opacity", "0")]), 100)
                .from_to(
                    "b",
                    PropertySet::from([("left", "0px")]),
                    PropertySet::from([("left", "10px")]),
                    100,
                )
                .wait(300);
            assert_eq!(group.len(), 3);
        });
        assert_eq!(recorder.journal().len(), 2);

        let start = Instant::now();
        timeline.play().await;
        assert_near(elapsed_ms(start, Instant::now()), 300);
        assert_eq!(recorder.property("a", "opacity"), None);
        assert_eq!(recorder.property("b", "left").as_deref(), Some("10px"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_target_does_not_stall() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        recorder.detach("gone");

        let start = Instant::now();
        let outcome = timeline.to("gone", opacity(), 100).to("a", opacity(), 100).play().await;

        assert_eq!(outcome, PlayOutcome::Completed);
        let applied = recorder.applications();
        assert_eq!(applied.len(), 1);
        assert_near(elapsed_ms(start, applied[0].at), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_timing_clamps_and_completes() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        let start = Instant::now();
        timeline.to("a", opacity(), -100).wait(-5).to("b", opacity(), Timing::ms(10).delay(-30));

        assert_eq!(timeline.play().await, PlayOutcome::Completed);
        assert_eq!(recorder.applications().len(), 2);
        assert_near(elapsed_ms(start, Instant::now()), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reverse_only_touches_sequential_steps() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        timeline
            .to("a", opacity(), 10)
            .to("b", opacity(), 10)
            .to("c", opacity(), 10)
            .parallel(|group| {
                group.to("x", opacity(), 10).to("y", opacity(), 10);
            })
            .reverse();

        timeline.play().await;
        let targets: Vec<_> = recorder.applications().into_iter().map(|m| m.target).collect();
        assert_eq!(targets, ["c", "b", "a", "x", "y"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_labels_record_positions() {
        let (_recorder, timeline) = setup(TimelineOptions::new());
        timeline
            .add_label("intro")
            .to("a", opacity(), 10)
            .to("b", opacity(), 10)
            .add_label("outro");

        assert_eq!(timeline.label("intro"), Some(0));
        assert_eq!(timeline.label("outro"), Some(2));
        assert_eq!(timeline.label("missing"), None);
        assert_eq!(
            timeline.labels(),
            vec![("intro".to_string(), 0), ("outro".to_string(), 2)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_timeline_cancels_playback() {
        let (recorder, timeline) = setup(TimelineOptions::new());
        let handle = timeline
            .to("a", opacity(), 100)
            .to("b", opacity(), Timing::ms(100).delay(50))
            .play();

        sleep(Duration::from_millis(120)).await;
        drop(timeline);

        assert_eq!(handle.await, PlayOutcome::Stopped);
        sleep(Duration::from_secs(1)).await;
        assert_eq!(recorder.applications().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_transport() {
        let (_recorder, timeline) = setup(TimelineOptions::new());
        let remote = timeline.clone();
        let handle = timeline.to("a", opacity(), 100).play();

        sleep(Duration::from_millis(10)).await;
        remote.stop();
        assert_eq!(handle.await, PlayOutcome::Stopped);
        assert_eq!(timeline.id(), remote.id());
    }

    #[test]
    fn test_new_requires_runtime() {
        let result = Timeline::new(Arc::new(StyleRecorder::new()), TimelineOptions::new());
        assert!(matches!(result, Err(TimelineError::NoRuntime(_))));
    }

    #[test]
    fn test_options_from_config() {
        let config = TimelineConfig {
            repeat: true,
            repeat_delay_ms: 2000,
            default_easing: Some(Easing::new("linear")),
        };
        let options = TimelineOptions::from_config(&config);
        assert!(options.repeat);
        assert_eq!(options.repeat_delay, Duration::from_millis(2000));
        assert_eq!(options.default_easing.as_str(), "linear");

        let options = TimelineOptions::from_config(&TimelineConfig::default());
        assert_eq!(options.default_easing, Easing::STANDARD);
    }
}
