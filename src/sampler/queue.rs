// src/sampler/queue.rs
// =============================================================================
// The work queue shared by all workers of one cycle.
//
// It holds the lines that still need a station. Besides the pending lines
// it counts the ones a worker is currently holding ("in flight"), because
// "pending is empty" is NOT the same as "done":
//
//   worker A pops the last line  -> pending = {}, in flight = 1
//   worker B sees pending = {}    -> must not stop yet!
//   A's lookup fails, line goes back -> pending = {line}, in flight = 0
//
// The queue is only drained when nothing is pending AND nothing is in
// flight. requeue() puts the line back and releases the in-flight slot
// under the same lock, so nobody can observe the gap in between.
//
// Everything sits behind one std Mutex: every operation is a handful of
// set/deque ops and the lock is never held across an .await.
// =============================================================================

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

use super::types::LineId;

#[derive(Debug, Default)]
struct QueueState {
    // pending lines, in pop order
    order: VecDeque<LineId>,
    // same lines as `order`, for O(1) membership
    members: HashSet<LineId>,
    // popped and not yet completed, requeued or abandoned
    held: HashSet<LineId>,
    // held lines that were pushed again while held
    readd: HashSet<LineId>,
    failures: HashMap<LineId, u32>,
}

impl QueueState {
    fn enqueue(&mut self, line: LineId) {
        if self.members.insert(line.clone()) {
            self.order.push_back(line);
        }
    }

    fn release(&mut self, line: &LineId) -> bool {
        self.held.remove(line);
        self.readd.remove(line)
    }
}

/// Deduplicating queue of pending lines with in-flight tracking.
#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    changed: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a queue holding every line once.
    pub fn seeded(lines: impl IntoIterator<Item = LineId>) -> Self {
        let queue = Self::new();
        for line in lines {
            queue.push(line);
        }
        queue
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // The state stays consistent even if a holder panicked mid-way:
        // every mutation below is a single set/deque call
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a line to pending. Returns false if it was already pending
    /// (or already marked for re-adding).
    ///
    /// A line some worker is holding stays invisible to other workers:
    /// pushing it only marks it, and the mark takes effect when the holder
    /// calls requeue(). complete() and abandon() drop the mark.
    pub fn push(&self, line: LineId) -> bool {
        let added = {
            let mut state = self.lock();
            if state.held.contains(&line) {
                return state.readd.insert(line);
            }
            if state.members.insert(line.clone()) {
                state.order.push_back(line);
                true
            } else {
                false
            }
        };

        if added {
            self.changed.notify_waiters();
        }
        added
    }

    /// Takes the next pending line and marks it in flight.
    ///
    /// Every Some(line) must be followed by exactly one of complete(),
    /// requeue() or abandon() for that line.
    pub fn pop(&self) -> Option<LineId> {
        let mut state = self.lock();
        let line = state.order.pop_front()?;
        state.members.remove(&line);
        state.held.insert(line.clone());
        Some(line)
    }

    /// The line was resolved; release its in-flight slot.
    pub fn complete(&self, line: &LineId) {
        {
            let mut state = self.lock();
            state.release(line);
            state.failures.remove(line);
        }
        self.changed.notify_waiters();
    }

    /// The attempt failed; make the line pending again.
    ///
    /// Returns how many attempts for this line have failed so far.
    pub fn requeue(&self, line: LineId) -> u32 {
        let failures = {
            let mut state = self.lock();
            state.release(&line);

            let failures = state.failures.entry(line.clone()).or_insert(0);
            *failures += 1;
            let failures = *failures;

            state.enqueue(line);
            failures
        };

        self.changed.notify_waiters();
        failures
    }

    /// Gives up on a line: release its slot without putting it back.
    pub fn abandon(&self, line: &LineId) {
        {
            let mut state = self.lock();
            state.release(line);
            state.failures.remove(line);
        }
        self.changed.notify_waiters();
    }

    /// Number of pending lines (not counting in-flight ones).
    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().order.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.lock().held.len()
    }

    /// Failed attempts recorded so far for a line that is not yet resolved.
    pub fn failures(&self, line: &LineId) -> u32 {
        self.lock().failures.get(line).copied().unwrap_or(0)
    }

    /// True when nothing is pending and nothing is in flight.
    pub fn is_drained(&self) -> bool {
        let state = self.lock();
        state.order.is_empty() && state.held.is_empty()
    }

    /// Waits until a line is pending or the queue is drained.
    pub async fn wait_for_work(&self) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register before checking so a change in between is not missed
            notified.as_mut().enable();

            {
                let state = self.lock();
                if !state.order.is_empty() || state.held.is_empty() {
                    return;
                }
            }

            notified.await;
        }
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why VecDeque + HashSet instead of just one of them?
//    - The HashSet answers "is this line already pending?" in O(1)
//    - The VecDeque gives the pop order, so a line that just failed goes to
//      the back and the others get their turn first
//
// 2. Why notify_waiters() and not notify_one()?
//    - A drained queue must wake EVERY idle worker so they can all exit
//    - notify_waiters() only reaches futures that are already registered,
//      which is why wait_for_work() calls enable() before looking at state
// -----------------------------------------------------------------------------
