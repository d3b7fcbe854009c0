use {
    crate::utils::numcell::NumCell,
    std::{
        fmt::{Debug, Formatter},
        ops::Sub,
        time::Duration,
    },
    uapi::c,
};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Default, Hash)]
pub struct Time(u64);

impl Debug for Time {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Time").field("nsec", &self.0).finish()
    }
}

impl Time {
    pub const fn from_nsec(nsec: u64) -> Self {
        Self(nsec)
    }

    pub fn now_unchecked() -> Time {
        let mut time: c::timespec = uapi::pod_zeroed();
        let _ = uapi::clock_gettime(c::CLOCK_MONOTONIC, &mut time);
        let sec = time.tv_sec as u64 * 1_000_000_000;
        let nsec = time.tv_nsec as u64;
        Self(sec + nsec)
    }

    pub fn nsec(self) -> u64 {
        self.0
    }

    pub fn usec(self) -> u64 {
        self.0 / 1_000
    }

    pub fn msec(self) -> u64 {
        self.0 / 1_000_000
    }

    pub fn saturating_add(self, d: Duration) -> Time {
        Time(self.0.saturating_add(d.as_nanos() as u64))
    }
}

impl Sub<Time> for Time {
    type Output = Duration;

    fn sub(self, rhs: Time) -> Self::Output {
        Duration::from_nanos(self.0.saturating_sub(rhs.0))
    }
}

/// The source of timestamps for frame markers and timers.
pub trait Clock {
    fn now(&self) -> Time;
}

#[derive(Debug, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Time {
        Time::now_unchecked()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    nsec: NumCell<u64>,
}

impl ManualClock {
    pub fn new(start: Time) -> Self {
        Self {
            nsec: NumCell::new(start.nsec()),
        }
    }

    pub fn advance(&self, d: Duration) {
        self.nsec.fetch_add(d.as_nanos() as u64);
    }

    pub fn set(&self, t: Time) {
        self.nsec.set(t.nsec());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Time {
        Time(self.nsec.get())
    }
}
