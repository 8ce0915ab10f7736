//! Virtual clock and pending-event queue.
//!
//! The clock owns simulated time. Wake-ups are ordered by
//! `(time, urgent first, sequence)` where `sequence` is assigned at schedule
//! time, so events of one class that share a wake time run in the order they
//! were scheduled. Urgent events are interrupt wake-ups: they run before any
//! normal event of the same tick. Processes that share a tick depend on that
//! order for deterministic output.
//!
//! Cancellation is lazy: a cancelled event stays in the heap and is discarded
//! when it reaches the head of the queue.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashSet},
};

use crate::process::ProcessId;

/// Simulated time in ticks.
pub type SimTime = u64;

/// Handle to a scheduled event, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventToken(u64);

impl EventToken {
    /// Sequence number assigned when the event was scheduled.
    pub fn sequence(self) -> u64 {
        self.0
    }
}

/// A wake-up for one process at one point in simulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// When the target should resume.
    pub wake_time: SimTime,
    /// Runs ahead of normal events sharing `wake_time`.
    pub urgent: bool,
    /// Tie-breaker among events sharing `wake_time` and class.
    pub sequence: u64,
    /// Process to resume.
    pub target: ProcessId,
}

impl Event {
    /// Token identifying this event.
    pub fn token(&self) -> EventToken {
        EventToken(self.sequence)
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max heap: time and sequence are reversed so the
        // earliest pair is popped first, `urgent` is not since `true` wins.
        other
            .wake_time
            .cmp(&self.wake_time)
            .then_with(|| self.urgent.cmp(&other.urgent))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Simulated clock with its queue of pending wake-ups.
#[derive(Debug, Default)]
pub struct Clock {
    now: SimTime,
    next_sequence: u64,
    queue: BinaryHeap<Event>,
    cancelled: HashSet<u64>,
}

impl Clock {
    /// Create a clock at time zero with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Schedule `target` to wake at `now + delay`.
    pub fn schedule(&mut self, target: ProcessId, delay: SimTime) -> EventToken {
        self.push(target, self.now + delay, false)
    }

    /// Schedule `target` to wake now, ahead of every normal event due now.
    pub fn schedule_urgent(&mut self, target: ProcessId) -> EventToken {
        self.push(target, self.now, true)
    }

    fn push(&mut self, target: ProcessId, wake_time: SimTime, urgent: bool) -> EventToken {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.queue.push(Event { wake_time, urgent, sequence, target });

        EventToken(sequence)
    }

    /// Cancel a pending event.
    ///
    /// Returns `false` if the token was already cancelled.
    pub fn cancel(&mut self, token: EventToken) -> bool {
        debug_assert!(token.0 < self.next_sequence, "token was never issued");
        self.cancelled.insert(token.0)
    }

    /// Wake time of the next live event.
    pub fn peek_time(&mut self) -> Option<SimTime> {
        self.discard_cancelled();
        self.queue.peek().map(|event| event.wake_time)
    }

    /// Pop the next live event if it is due no later than `end_time`, and
    /// advance the clock to its wake time.
    pub fn pop_due(&mut self, end_time: SimTime) -> Option<Event> {
        self.discard_cancelled();

        let event = *self.queue.peek()?;
        if event.wake_time > end_time {
            return None;
        }
        self.queue.pop();

        debug_assert!(event.wake_time >= self.now, "event scheduled in the past");
        self.now = event.wake_time;

        Some(event)
    }

    /// Move time forward to `time` without running anything.
    ///
    /// Used once the horizon is reached. Never moves time backwards.
    pub fn advance_to(&mut self, time: SimTime) {
        self.now = self.now.max(time);
    }

    /// Number of live events still queued.
    pub fn pending(&self) -> usize {
        self.queue.iter().filter(|event| !self.cancelled.contains(&event.sequence)).count()
    }

    /// Whether no live events remain.
    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    fn discard_cancelled(&mut self) {
        while let Some(head) = self.queue.peek() {
            if !self.cancelled.remove(&head.sequence) {
                break;
            }
            self.queue.pop();
        }
    }
}
