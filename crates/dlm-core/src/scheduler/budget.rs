//! Concurrency budget with explicit running/paused accounting.
//!
//! A suspended-in-place task still holds a conceptual pool slot but consumes
//! no bandwidth, so the pool capacity exposed downstream is
//! `limit + paused` whenever a finite limit is active. Keeping `running` and
//! `paused` as separate counters (instead of one overloaded capacity integer)
//! makes that invariant checkable after every scheduling decision.

/// Bound on concurrently executing transfers. `limit == None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionBudget {
    limit: Option<usize>,
    running: usize,
    paused: usize,
}

impl AdmissionBudget {
    /// Create with a limit; `0` means unbounded.
    pub fn new(limit: usize) -> Self {
        Self {
            limit: if limit == 0 { None } else { Some(limit) },
            running: 0,
            paused: 0,
        }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Count of truly executing transfers.
    pub fn running(&self) -> usize {
        self.running
    }

    /// Count of transfers suspended in place.
    pub fn paused(&self) -> usize {
        self.paused
    }

    /// Pool capacity downstream of the budget: `limit + paused` when finite.
    pub fn pool_capacity(&self) -> Option<usize> {
        self.limit.map(|n| n + self.paused)
    }

    /// Whether one more transfer may start right now.
    pub fn has_slot(&self) -> bool {
        self.limit.map_or(true, |n| self.running < n)
    }

    /// How many running transfers exceed the limit (after a decrease).
    pub fn excess(&self) -> usize {
        self.limit.map_or(0, |n| self.running.saturating_sub(n))
    }

    /// `0` clears the limit (unbounded).
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = if limit == 0 { None } else { Some(limit) };
    }

    pub fn note_started(&mut self) {
        self.running += 1;
    }

    /// A running transfer finished, failed, or was stopped.
    pub fn note_running_gone(&mut self) {
        self.running = self.running.saturating_sub(1);
    }

    /// Running → paused-in-place (pool capacity grows by one).
    pub fn note_suspended(&mut self) {
        self.running = self.running.saturating_sub(1);
        self.paused += 1;
    }

    /// Paused-in-place → running (pool capacity shrinks back).
    pub fn note_resumed(&mut self) {
        self.paused = self.paused.saturating_sub(1);
        self.running += 1;
    }

    /// A paused transfer was stopped or deleted without resuming.
    pub fn note_paused_gone(&mut self) {
        self.paused = self.paused.saturating_sub(1);
    }
}
