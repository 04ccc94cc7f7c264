//! Admission control: concurrency budget plus waiting queue.
//!
//! The scheduler itself is pure bookkeeping; the manager drives it under its
//! critical section and performs the actual transport calls outside of it.

mod budget;
mod waiting;

pub use budget::AdmissionBudget;
pub use waiting::WaitingQueue;

/// Budget and waiting queue of one manager instance.
#[derive(Debug)]
pub struct Scheduler {
    pub budget: AdmissionBudget,
    pub waiting: WaitingQueue,
}

impl Scheduler {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            budget: AdmissionBudget::new(max_concurrent),
            waiting: WaitingQueue::new(),
        }
    }

    /// Pop the next waiting key if the budget has a free slot.
    pub fn next_admissible(&mut self) -> Option<crate::task::TaskKey> {
        if self.budget.has_slot() {
            self.waiting.pop()
        } else {
            None
        }
    }
}
