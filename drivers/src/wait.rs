/*++

Licensed under the Apache-2.0 license.

File Name:

    wait.rs

Abstract:

    File contains bounded wait routines and the timeout policies they use.

--*/

/// Default number of polls before a wait gives up: one second worth of
/// loop iterations at the reference part's core clock.
pub const KS_TIMEOUT: u32 = 200_000_000;

/// Budget for a single bounded wait.
pub trait TimeoutPolicy {
    /// Starts a new wait, resetting the budget.
    fn begin(&mut self);

    /// Charges one poll against the budget. Returns true once the budget is
    /// exhausted.
    fn expired(&mut self) -> bool;
}

/// Counts polls; the wait gives up after a fixed number of iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinTimeout {
    budget: u32,
    remaining: u32,
}

impl SpinTimeout {
    pub const fn new(iterations: u32) -> Self {
        Self {
            budget: iterations,
            remaining: iterations,
        }
    }

    /// One poll per core clock cycle for one second.
    pub const fn for_core_clock(hz: u32) -> Self {
        Self::new(hz)
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }
}

impl Default for SpinTimeout {
    fn default() -> Self {
        Self::new(KS_TIMEOUT)
    }
}

impl TimeoutPolicy for SpinTimeout {
    fn begin(&mut self) {
        self.remaining = self.budget;
    }

    fn expired(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

/// Gives up once a tick source has advanced by a fixed amount.
pub struct TickTimeout<F: FnMut() -> u64> {
    now: F,
    ticks: u64,
    deadline: u64,
}

impl<F: FnMut() -> u64> TickTimeout<F> {
    /// # Arguments
    ///
    /// * `ticks` - Ticks a wait may take
    /// * `now` - Reads the current tick count
    pub fn new(ticks: u64, now: F) -> Self {
        Self {
            now,
            ticks,
            deadline: 0,
        }
    }
}

impl<F: FnMut() -> u64> TimeoutPolicy for TickTimeout<F> {
    fn begin(&mut self) {
        self.deadline = (self.now)().saturating_add(self.ticks);
    }

    fn expired(&mut self) -> bool {
        (self.now)() >= self.deadline
    }
}

/// Polls `predicate` until it holds or `policy` runs out.
///
/// Returns false on timeout.
pub fn until<P, F>(policy: &mut P, mut predicate: F) -> bool
where
    P: TimeoutPolicy + ?Sized,
    F: FnMut() -> bool,
{
    policy.begin();
    loop {
        if predicate() {
            return true;
        }
        if policy.expired() {
            return false;
        }
    }
}
