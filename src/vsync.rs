
use {
    crate::time::Time,
    std::{
        fmt::{Display, Formatter},
        time::Duration,
    },
};

/// How often a window wants to be woken for a new frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum VsyncRequest {
    #[default]
    None,
    /// Wake once, then stop.
    Single,
    /// A single wake was requested while one was already in flight. The wake is
    /// granted one tick later.
    SingleSuppress,
    /// Wake on every tick until the request is cleared.
    Periodic,
}

impl VsyncRequest {
    /// The state after one vsync tick has been delivered.
    pub fn advance(self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Single => Self::None,
            Self::SingleSuppress => Self::Single,
            Self::Periodic => Self::Periodic,
        }
    }

    /// Whether a tick in this state wakes the window.
    pub fn wakes(self) -> bool {
        matches!(self, Self::Single | Self::Periodic)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Single => "single",
            Self::SingleSuppress => "singlesuppress",
            Self::Periodic => "periodic",
        }
    }
}

impl Display for VsyncRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a window learns about the tick that woke it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct VsyncInfo {
    pub seq: u64,
    pub timestamp: Time,
    pub period: Duration,
}
