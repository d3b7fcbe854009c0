
use {
    crate::{
        time::{Clock, Time},
        utils::{copyhashmap::CopyHashMap, numcell::NumCell},
    },
    std::{
        cell::{Cell, RefCell},
        cmp::Reverse,
        collections::BinaryHeap,
        rc::{Rc, Weak},
        time::Duration,
    },
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum WheelError {
    #[error("The timer wheel is already destroyed")]
    Destroyed,
}

linear_ids!(TimerIds, TimerId, u64);

#[derive(Debug, Eq, PartialEq, Ord, PartialOrd)]
struct WheelEntry {
    expiration: Time,
    id: TimerId,
    generation: u64,
}

struct TimerData {
    id: TimerId,
    period: Duration,
    paused: Cell<bool>,
    generation: NumCell<u64>,
    cb: Rc<dyn Fn()>,
}

/// Periodic timers driven by the owner of the event loop.
///
/// The loop calls [`Wheel::dispatch`] whenever [`Wheel::next_expiration`] has
/// passed. All callbacks run on the thread that calls `dispatch`.
pub struct Wheel {
    clock: Rc<dyn Clock>,
    destroyed: Cell<bool>,
    ids: TimerIds,
    timers: CopyHashMap<TimerId, Rc<TimerData>>,
    expirations: RefCell<BinaryHeap<Reverse<WheelEntry>>>,
}

/// A handle to a periodic timer. Dropping the handle cancels the timer.
pub struct PeriodicTimer {
    data: Rc<TimerData>,
    wheel: Weak<Wheel>,
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl Wheel {
    pub fn new(clock: &Rc<dyn Clock>) -> Rc<Self> {
        Rc::new(Self {
            clock: clock.clone(),
            destroyed: Cell::new(false),
            ids: Default::default(),
            timers: Default::default(),
            expirations: Default::default(),
        })
    }

    pub fn now(&self) -> Time {
        self.clock.now()
    }

    /// Creates a timer that invokes `cb` every `period`.
    pub fn periodic(
        self: &Rc<Self>,
        period: Duration,
        paused: bool,
        cb: Rc<dyn Fn()>,
    ) -> Result<PeriodicTimer, WheelError> {
        if self.destroyed.get() {
            return Err(WheelError::Destroyed);
        }
        let data = Rc::new(TimerData {
            id: self.ids.next(),
            period: period.max(Duration::from_nanos(1)),
            paused: Cell::new(paused),
            generation: NumCell::new(0),
            cb,
        });
        self.timers.set(data.id, data.clone());
        if !paused {
            self.schedule(&data);
        }
        Ok(PeriodicTimer {
            data,
            wheel: Rc::downgrade(self),
        })
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    /// The earliest pending expiration.
    pub fn next_expiration(&self) -> Option<Time> {
        let mut expirations = self.expirations.borrow_mut();
        while let Some(Reverse(entry)) = expirations.peek() {
            if self.is_current(entry) {
                return Some(entry.expiration);
            }
            expirations.pop();
        }
        None
    }

    /// Runs the callbacks of all expired timers and returns how many ran.
    pub fn dispatch(&self) -> usize {
        if self.destroyed.get() {
            return 0;
        }
        let now = self.clock.now();
        let mut to_dispatch = vec![];
        {
            let mut expirations = self.expirations.borrow_mut();
            loop {
                match expirations.peek() {
                    Some(Reverse(entry)) if entry.expiration <= now => {}
                    _ => break,
                }
                let Some(Reverse(entry)) = expirations.pop() else {
                    break;
                };
                if !self.is_current(&entry) {
                    continue;
                }
                let Some(data) = self.timers.get(&entry.id) else {
                    continue;
                };
                let mut next = entry.expiration.saturating_add(data.period);
                if next <= now {
                    next = now.saturating_add(data.period);
                }
                expirations.push(Reverse(WheelEntry {
                    expiration: next,
                    id: entry.id,
                    generation: entry.generation,
                }));
                to_dispatch.push(data);
            }
        }
        let mut fired = 0;
        for data in to_dispatch {
            // An earlier callback may have paused or cancelled this timer.
            if self.destroyed.get() || data.paused.get() || !self.timers.contains(&data.id) {
                continue;
            }
            (data.cb)();
            fired += 1;
        }
        fired
    }

    /// Cancels all timers. No callback runs after this returns.
    pub fn kill(&self) {
        self.destroyed.set(true);
        self.timers.clear();
        self.expirations.borrow_mut().clear();
    }

    fn is_current(&self, entry: &WheelEntry) -> bool {
        match self.timers.get(&entry.id) {
            Some(data) => !data.paused.get() && data.generation.get() == entry.generation,
            None => false,
        }
    }

    fn schedule(&self, data: &TimerData) {
        let generation = data.generation.fetch_add(1) + 1;
        self.expirations.borrow_mut().push(Reverse(WheelEntry {
            expiration: self.clock.now().saturating_add(data.period),
            id: data.id,
            generation,
        }));
    }
}

impl PeriodicTimer {
    pub fn id(&self) -> TimerId {
        self.data.id
    }

    pub fn period(&self) -> Duration {
        self.data.period
    }

    pub fn is_paused(&self) -> bool {
        self.data.paused.get()
    }

    pub fn pause(&self) {
        if !self.data.paused.replace(true) {
            self.data.generation.fetch_add(1);
        }
    }

    pub fn resume(&self) {
        if self.data.paused.replace(false) {
            self.reset();
        }
    }

    /// Restarts the period from now.
    pub fn reset(&self) {
        if self.data.paused.get() {
            return;
        }
        if let Some(wheel) = self.wheel.upgrade() {
            if wheel.timers.contains(&self.data.id) {
                wheel.schedule(&self.data);
            }
        }
    }

    /// Runs the callback immediately.
    pub fn fire(&self) {
        (self.data.cb)();
    }

    pub fn cancel(&self) {
        self.data.paused.set(true);
        if let Some(wheel) = self.wheel.upgrade() {
            wheel.timers.remove(&self.data.id);
        }
    }
}
