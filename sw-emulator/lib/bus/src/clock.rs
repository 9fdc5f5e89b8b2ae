/*++

Licensed under the Apache-2.0 license.

File Name:

    clock.rs

Abstract:

    File contains Clock and Timer types, used by simulated peripherals to
    model operations that take a number of clock cycles to complete.

--*/
use std::{
    cell::{Cell, RefCell},
    collections::{BTreeSet, HashSet},
    rc::Rc,
};

use crate::Bus;

/// Peripherals that model latency store a clone of `Timer` and use it to
/// schedule a future [`Bus::poll`] call, at which point the pending
/// operation completes.
///
/// # Example
///
/// ```
/// use ks_emu_bus::{Bus, BusError, Clock, Timer, ActionHandle};
/// use ks_emu_types::{AccessSize, BusAddr, BusData};
/// struct MyPeriph {
///     timer: Timer,
///     busy: Option<ActionHandle>,
/// }
/// impl Bus for MyPeriph {
///     fn read(&mut self, _size: AccessSize, _addr: BusAddr) -> Result<BusData, BusError> {
///         Ok(self.busy.is_some() as BusData)
///     }
///     fn write(&mut self, _size: AccessSize, _addr: BusAddr, _val: BusData) -> Result<(), BusError> {
///         if let Some(busy) = self.busy.take() {
///             self.timer.cancel(busy);
///         }
///         self.busy = Some(self.timer.schedule_poll_in(10));
///         Ok(())
///     }
///     fn poll(&mut self) {
///         if self.timer.fired(&mut self.busy) {
///             println!("operation complete");
///         }
///     }
/// }
/// let clock = Clock::new();
/// let mut periph = MyPeriph { timer: clock.timer(), busy: None };
/// periph.write(AccessSize::Word, 0, 1).unwrap();
/// clock.increment_and_process_timer_actions(10, &mut periph);
/// assert_eq!(periph.read(AccessSize::Word, 0), Ok(0));
/// ```
#[derive(Clone)]
pub struct Timer {
    clock: Rc<ClockImpl>,
}
impl Timer {
    /// Constructs a new timer bound to the specified clock.
    pub fn new(clock: &Clock) -> Self {
        Self {
            clock: Rc::clone(&clock.clock),
        }
    }

    /// Returns the number of clock cycles elapsed since simulation start.
    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// If the scheduled time for `action` has come, `action` is set to None
    /// and the function returns true. Otherwise (or if action is None) it
    /// returns false.
    pub fn fired(&self, action: &mut Option<ActionHandle>) -> bool {
        let has_fired = match action {
            Some(handle) => {
                debug_assert!(
                    handle.clock_ptr == Rc::as_ptr(&self.clock),
                    "Supplied action was not created by this timer."
                );
                handle.time <= self.now()
            }
            None => false,
        };
        if has_fired {
            *action = None;
        }
        has_fired
    }

    /// Schedules a call to [`Bus::poll()`] `ticks_from_now` cycles from
    /// now.
    pub fn schedule_poll_in(&self, ticks_from_now: u64) -> ActionHandle {
        self.schedule_action_in(ticks_from_now, TimerAction::Poll)
    }

    /// Schedules `action` `ticks_from_now` cycles from now.
    pub fn schedule_action_in(&self, ticks_from_now: u64, action: TimerAction) -> ActionHandle {
        self.clock
            .schedule(self.now().saturating_add(ticks_from_now), action)
    }

    /// Cancels a previously scheduled action.
    ///
    /// # Panics
    ///
    /// Panics if the supplied `ActionHandle` was not created by this Timer.
    pub fn cancel(&self, handle: ActionHandle) {
        assert!(
            handle.clock_ptr == Rc::as_ptr(&self.clock),
            "Supplied action was not created by this timer."
        );
        self.clock.pending.borrow_mut().remove(&handle.key());
    }
}

pub struct Clock {
    clock: Rc<ClockImpl>,
}
impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
impl Clock {
    /// Constructs a new Clock with the cycle counter set to 0.
    pub fn new() -> Clock {
        Self {
            clock: Rc::new(ClockImpl {
                now: Cell::new(0),
                next_id: Cell::new(0),
                pending: RefCell::new(BTreeSet::new()),
            }),
        }
    }

    /// Constructs a `Timer` associated with this clock.
    pub fn timer(&self) -> Timer {
        Timer::new(self)
    }

    /// Returns the number of simulated clock cycles since simulation start.
    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Increments the clock by `delta` and returns the set of timer
    /// actions that fired.
    pub fn increment(&self, delta: u64) -> HashSet<TimerAction> {
        self.clock.now.set(self.clock.now().saturating_add(delta));
        self.clock.take_fired()
    }

    /// Increments the clock by `delta`, and delivers the fired actions to
    /// `bus`.
    pub fn increment_and_process_timer_actions(
        &self,
        delta: u64,
        bus: &mut impl Bus,
    ) -> HashSet<TimerAction> {
        let fired_actions = self.increment(delta);
        if fired_actions.contains(&TimerAction::WarmReset) {
            bus.warm_reset();
        }
        if fired_actions.contains(&TimerAction::Poll) {
            bus.poll();
        }
        fired_actions
    }
}

/// Represents an action scheduled with a `Timer`. Passed back to
/// [`Timer::fired`] or [`Timer::cancel`].
pub struct ActionHandle {
    time: u64,
    id: u64,
    action: TimerAction,
    clock_ptr: *const ClockImpl,
}
impl ActionHandle {
    fn key(&self) -> (u64, u64, TimerAction) {
        (self.time, self.id, self.action)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum TimerAction {
    Poll,
    WarmReset,
}

struct ClockImpl {
    now: Cell<u64>,
    next_id: Cell<u64>,
    pending: RefCell<BTreeSet<(u64, u64, TimerAction)>>,
}
impl ClockImpl {
    #[inline]
    fn now(&self) -> u64 {
        self.now.get()
    }

    fn schedule(self: &Rc<Self>, time: u64, action: TimerAction) -> ActionHandle {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        self.pending.borrow_mut().insert((time, id, action));
        ActionHandle {
            time,
            id,
            action,
            clock_ptr: Rc::as_ptr(self),
        }
    }

    fn take_fired(&self) -> HashSet<TimerAction> {
        let mut fired = HashSet::new();
        let mut pending = self.pending.borrow_mut();
        while let Some(&first) = pending.iter().next() {
            if first.0 > self.now() {
                break;
            }
            pending.remove(&first);
            fired.insert(first.2);
        }
        fired
    }
}
