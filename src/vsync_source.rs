#[cfg(test)]
mod tests;

use {
    crate::{
        backend::{DisplayDriver, VsyncHandler},
        wheel::{PeriodicTimer, Wheel, WheelError},
    },
    serde::Deserialize,
    std::{cell::Cell, rc::Rc, time::Duration},
};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VsyncSourceKind {
    /// Use the display's vsync event if it has one, a timer otherwise.
    #[default]
    Auto,
    /// The display's vsync event.
    Event,
    /// A periodic timer at the nominal refresh period.
    Timer,
}

/// Where vsync ticks come from.
pub trait VsyncSource {
    fn kind(&self) -> VsyncSourceKind;
    fn set_enabled(&self, enabled: bool);
    fn enabled(&self) -> bool;
    /// Called when the display starts producing a frame.
    fn frame_started(&self) {}
    /// Stops the source for good.
    fn cancel(&self);
}

pub struct EventVsyncSource {
    display: Rc<dyn DisplayDriver>,
    handler: VsyncHandler,
    registered: Cell<bool>,
}

impl EventVsyncSource {
    pub fn new(display: &Rc<dyn DisplayDriver>, handler: VsyncHandler) -> Self {
        Self {
            display: display.clone(),
            handler,
            registered: Cell::new(false),
        }
    }
}

impl VsyncSource for EventVsyncSource {
    fn kind(&self) -> VsyncSourceKind {
        VsyncSourceKind::Event
    }

    fn set_enabled(&self, enabled: bool) {
        if self.registered.replace(enabled) == enabled {
            return;
        }
        if enabled {
            log::debug!("Registering vsync event handler");
            self.display.set_vsync_handler(Some(self.handler.clone()));
        } else {
            log::debug!("Unregistering vsync event handler");
            self.display.set_vsync_handler(None);
        }
    }

    fn enabled(&self) -> bool {
        self.registered.get()
    }

    fn cancel(&self) {
        self.set_enabled(false);
    }
}

/// Substitutes a periodic timer for displays that have no vsync interrupt.
pub struct TimerVsyncSource {
    timer: PeriodicTimer,
}

impl TimerVsyncSource {
    pub fn new(
        wheel: &Rc<Wheel>,
        period: Duration,
        handler: VsyncHandler,
    ) -> Result<Self, WheelError> {
        Ok(Self {
            timer: wheel.periodic(period, true, handler)?,
        })
    }
}

impl VsyncSource for TimerVsyncSource {
    fn kind(&self) -> VsyncSourceKind {
        VsyncSourceKind::Timer
    }

    fn set_enabled(&self, enabled: bool) {
        if enabled && self.timer.is_paused() {
            log::debug!("Resuming vsync timer");
            self.timer.resume();
        } else if !enabled && !self.timer.is_paused() {
            log::debug!("Pausing vsync timer");
            self.timer.pause();
        }
    }

    fn enabled(&self) -> bool {
        !self.timer.is_paused()
    }

    /// Re-aligns the timer with the display's refresh and ticks right away.
    fn frame_started(&self) {
        if !self.timer.is_paused() {
            self.timer.reset();
            self.timer.fire();
        }
    }

    fn cancel(&self) {
        self.timer.cancel();
    }
}

/// Picks the source for `kind`. An event source is only used if the display
/// supports vsync events.
pub fn create_vsync_source(
    kind: VsyncSourceKind,
    display: &Rc<dyn DisplayDriver>,
    wheel: &Rc<Wheel>,
    period: Duration,
    handler: VsyncHandler,
) -> Result<Rc<dyn VsyncSource>, WheelError> {
    let use_event = match kind {
        VsyncSourceKind::Auto => display.supports_vsync_event(),
        VsyncSourceKind::Event => {
            if !display.supports_vsync_event() {
                log::warn!("The display has no vsync event. Falling back to a timer.");
            }
            display.supports_vsync_event()
        }
        VsyncSourceKind::Timer => false,
    };
    let source: Rc<dyn VsyncSource> = if use_event {
        Rc::new(EventVsyncSource::new(display, handler))
    } else {
        Rc::new(TimerVsyncSource::new(wheel, period, handler)?)
    };
    log::info!(
        "Using {:?} vsync source with a period of {:?}",
        source.kind(),
        period
    );
    Ok(source)
}
