// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bookkeeping for the timer tasks a timeline has scheduled.

use tokio::task::JoinHandle;

/// Outstanding timer tasks owned by one timeline.
///
/// Cancelling aborts every task at once; dropping the set cancels it.
#[derive(Debug, Default)]
pub(crate) struct TimerSet {
    handles: Vec<JoinHandle<()>>,
}

impl TimerSet {
    /// Track a newly spawned timer task
    pub(crate) fn track(&mut self, handle: JoinHandle<()>) {
        self.handles.retain(|h| !h.is_finished());
        self.handles.push(handle);
    }

    /// Abort every outstanding task, returning how many were still live
    pub(crate) fn cancel_all(&mut self) -> usize {
        let mut live = 0;
        for handle in self.handles.drain(..) {
            if !handle.is_finished() {
                live += 1;
            }
            handle.abort();
        }
        if live > 0 {
            tracing::trace!(live, "cancelled timers");
        }
        live
    }

    /// Number of tracked tasks that have not finished
    #[cfg(test)]
    pub(crate) fn live(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
