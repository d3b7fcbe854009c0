
use {
    crate::{
        backend::{
            DisplayDriver, DisplayError, DisplayInfo, FrameEvent, RenderBackend, Window, WindowId,
        },
        error::ErrorKind,
        format::PixelFormat,
        frame::{FrameMetaInfo, FrameTimeInfo, FrameTimeSummary},
        input::{DeviceClass, InputMessage, RawInputSample},
        proxy::{ProxyError, UiDriverProxy},
        time::Clock,
        utils::{
            clonecell::CloneCell, copyhashmap::CopyHashMap, errorfmt::ErrorFmt, numcell::NumCell,
        },
        vsync::{VsyncInfo, VsyncRequest},
        vsync_source::{VsyncSource, VsyncSourceKind, create_vsync_source},
        wheel::{Wheel, WheelError},
    },
    indexmap::IndexMap,
    std::{
        cell::{Cell, RefCell},
        mem,
        rc::{Rc, Weak},
        time::Duration,
    },
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum RootError {
    #[error("Could not initialize the display")]
    DisplayInit(#[source] DisplayError),
    #[error("The root container has been shut down")]
    NotReady,
    #[error("Window {0} is not registered")]
    UnknownWindow(WindowId),
    #[error(transparent)]
    Wheel(#[from] WheelError),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

impl RootError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::DisplayInit(_) | Self::NotReady | Self::Wheel(_) => Some(ErrorKind::NotReady),
            Self::UnknownWindow(_) => Some(ErrorKind::InvalidState),
            Self::Proxy(e) => e.kind(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RootConfig {
    pub vsync_source: VsyncSourceKind,
    /// Used when the display does not report its refresh period.
    pub refresh_period: Duration,
    pub trace_frames: bool,
    pub buffers_per_window: usize,
}

impl Default for RootConfig {
    fn default() -> Self {
        Self {
            vsync_source: VsyncSourceKind::Auto,
            refresh_period: Duration::from_millis(16),
            trace_frames: false,
            buffers_per_window: 2,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FramePhase {
    Idle,
    FrameStart,
    RenderStart,
}

/// The compositor root of one display.
///
/// Owns the display and its vsync source, dispatches vsync ticks to the
/// per-window proxies, routes input and times the display's frames.
pub struct RootContainer {
    display: CloneCell<Option<Rc<dyn DisplayDriver>>>,
    render: Rc<dyn RenderBackend>,
    clock: Rc<dyn Clock>,
    info: Cell<Option<DisplayInfo>>,
    refresh_period: Duration,
    buffers_per_window: usize,
    vsync_source: CloneCell<Option<Rc<dyn VsyncSource>>>,
    vsync_enabled: Cell<bool>,
    pending_vsync: Cell<Option<bool>>,
    vsync_ticks: NumCell<u64>,
    phase: Cell<FramePhase>,
    frame_seq: NumCell<u64>,
    trace: Cell<bool>,
    frame_info: RefCell<FrameMetaInfo>,
    frame_time_info: FrameTimeInfo,
    proxies: RefCell<IndexMap<WindowId, Rc<UiDriverProxy>, ahash::RandomState>>,
    focus: CopyHashMap<DeviceClass, Weak<UiDriverProxy>>,
    /// Windows subscribed by `invalidate` rather than by `request_vsync`.
    /// They are unsubscribed once they stop asking for frames.
    auto_vsync: CopyHashMap<WindowId, ()>,
    destroyed: Cell<bool>,
}

impl RootContainer {
    pub fn new(
        display: &Rc<dyn DisplayDriver>,
        render: &Rc<dyn RenderBackend>,
        wheel: &Rc<Wheel>,
        clock: &Rc<dyn Clock>,
        config: &RootConfig,
    ) -> Result<Rc<Self>, RootError> {
        let info = display.init().map_err(RootError::DisplayInit)?;
        log::info!("Display initialized: {}x{}", info.width, info.height);
        let refresh_period = display.refresh_period().unwrap_or(config.refresh_period);
        let slf = Rc::new(Self {
            display: CloneCell::new(Some(display.clone())),
            render: render.clone(),
            clock: clock.clone(),
            info: Cell::new(Some(info)),
            refresh_period,
            buffers_per_window: config.buffers_per_window.max(1),
            vsync_source: Default::default(),
            vsync_enabled: Cell::new(false),
            pending_vsync: Cell::new(None),
            vsync_ticks: Default::default(),
            phase: Cell::new(FramePhase::Idle),
            frame_seq: Default::default(),
            trace: Cell::new(config.trace_frames),
            frame_info: Default::default(),
            frame_time_info: Default::default(),
            proxies: Default::default(),
            focus: Default::default(),
            auto_vsync: Default::default(),
            destroyed: Cell::new(false),
        });
        let weak = Rc::downgrade(&slf);
        let source = create_vsync_source(
            config.vsync_source,
            display,
            wheel,
            refresh_period,
            Rc::new(move || {
                if let Some(root) = weak.upgrade() {
                    root.on_vsync();
                }
            }),
        )?;
        slf.vsync_source.set(Some(source));
        let weak = Rc::downgrade(&slf);
        display.set_frame_handler(Some(Rc::new(move |event: FrameEvent| {
            if let Some(root) = weak.upgrade() {
                root.handle_frame_event(event);
            }
        })));
        let weak = Rc::downgrade(&slf);
        display.set_input_handler(Some(Rc::new(move |sample: &RawInputSample| {
            match weak.upgrade() {
                Some(root) => root.read_input(sample),
                _ => false,
            }
        })));
        Ok(slf)
    }

    fn handle_frame_event(&self, event: FrameEvent) {
        match event {
            FrameEvent::RefreshStart => self.on_frame_start(),
            FrameEvent::RenderStart => self.on_render_start(),
            FrameEvent::RefreshReady => {
                self.on_frame_finished();
            }
        }
    }

    pub fn refresh_period(&self) -> Duration {
        self.refresh_period
    }

    pub fn phase(&self) -> FramePhase {
        self.phase.get()
    }

    pub fn vsync_enabled(&self) -> bool {
        self.vsync_enabled.get()
    }

    pub fn vsync_source_kind(&self) -> Option<VsyncSourceKind> {
        self.vsync_source.get().map(|s| s.kind())
    }

    /// Turns the vsync source on or off. While a frame is in flight the
    /// change is applied once that frame has finished.
    pub fn enable_vsync(&self, enable: bool) {
        if self.destroyed.get() {
            return;
        }
        if self.phase.get() != FramePhase::Idle {
            if enable == self.vsync_enabled.get() {
                self.pending_vsync.take();
            } else {
                self.pending_vsync.set(Some(enable));
            }
            return;
        }
        self.apply_vsync(enable);
    }

    fn apply_vsync(&self, enable: bool) {
        if self.vsync_enabled.replace(enable) == enable {
            return;
        }
        log::info!("{} fb vsync", if enable { "Enabling" } else { "Disabling" });
        if let Some(source) = self.vsync_source.get() {
            source.set_enabled(enable);
        }
    }

    /// Entry point of the vsync source.
    pub fn on_vsync(&self) {
        if self.destroyed.get() || !self.vsync_enabled.get() {
            return;
        }
        self.process_vsync();
    }

    fn process_vsync(&self) {
        let vsync = VsyncInfo {
            seq: self.vsync_ticks.fetch_add(1) + 1,
            timestamp: self.clock.now(),
            period: self.refresh_period,
        };
        let proxies: Vec<_> = self.proxies.borrow().values().cloned().collect();
        let mut expired = vec![];
        let mut idle = false;
        for proxy in proxies {
            if proxy.is_expired() {
                expired.push(proxy.id());
            } else if proxy.vsync_event_enabled() {
                proxy.on_vsync(&vsync);
                if proxy.vsync_request() == VsyncRequest::None
                    && self.auto_vsync.remove(&proxy.id()).is_some()
                {
                    log::trace!("Window {} no longer wants frames", proxy.id());
                    proxy.on_fb_vsync_request(false);
                    idle = true;
                }
            }
        }
        if expired.is_empty() {
            if idle {
                self.update_vsync();
            }
            return;
        }
        for id in expired {
            log::debug!("Dropping proxy of destroyed window {id}");
            self.remove_proxy(id);
        }
        self.update_vsync();
    }

    fn update_vsync(&self) {
        let wanted = self
            .proxies
            .borrow()
            .values()
            .any(|p| p.vsync_event_enabled() && !p.is_expired());
        self.enable_vsync(wanted);
    }

    pub fn on_frame_start(&self) {
        if self.destroyed.get() || !self.vsync_enabled.get() {
            return;
        }
        if self.phase.get() != FramePhase::Idle {
            log::debug!("Frame started while the previous frame is still in flight");
        }
        self.phase.set(FramePhase::FrameStart);
        let id = self.frame_seq.fetch_add(1) + 1;
        if self.trace.get() {
            let now = self.clock.now();
            let mut fi = self.frame_info.borrow_mut();
            fi.set_vsync(now, id, self.refresh_period);
            fi.mark_layout_start(now);
        }
        if let Some(source) = self.vsync_source.get() {
            source.frame_started();
        }
    }

    pub fn on_render_start(&self) {
        if self.destroyed.get() || self.phase.get() != FramePhase::FrameStart {
            return;
        }
        self.phase.set(FramePhase::RenderStart);
        if self.trace.get() {
            self.frame_info
                .borrow_mut()
                .mark_render_start(self.clock.now());
        }
    }

    /// Ends the frame. Buffers that were drawn are handed back to their
    /// windows. Returns the timestamps of the frame if tracing is enabled.
    pub fn on_frame_finished(&self) -> Option<FrameMetaInfo> {
        if self.destroyed.get() {
            return None;
        }
        let drawn: Vec<_> = self
            .proxies
            .borrow()
            .values()
            .filter(|p| p.has_drawn())
            .cloned()
            .collect();
        for proxy in drawn {
            if let Err(e) = proxy.finish_drawing() {
                log::warn!(
                    "Could not finish drawing of window {}: {}",
                    proxy.id(),
                    ErrorFmt(e)
                );
            }
        }
        if self.phase.replace(FramePhase::Idle) == FramePhase::Idle {
            return None;
        }
        let mut res = None;
        let started = self.frame_info.borrow().vsync_time.is_some();
        if self.trace.get() && started {
            let now = self.clock.now();
            let fi = {
                let mut fi = self.frame_info.borrow_mut();
                fi.mark_render_end(now);
                fi.mark_frame_finished(now);
                *fi
            };
            self.frame_time_info.time(Some(&fi));
            log::info!(
                "SingleFrameLog{{seq={}, totalMs={}, renderMs={}, layoutMs={}}}",
                fi.vsync_id(),
                fi.total_drawn_duration().as_millis(),
                fi.total_render_duration().as_millis(),
                fi.total_layout_duration().as_millis(),
            );
            res = Some(fi);
        }
        if let Some(enable) = self.pending_vsync.take() {
            self.apply_vsync(enable);
        }
        res
    }

    /// Converts a raw sample and hands it to the window that has the focus
    /// of its device class. Returns whether the sample was consumed.
    pub fn read_input(&self, sample: &RawInputSample) -> bool {
        if self.destroyed.get() {
            return false;
        }
        let Some(msg) = InputMessage::from_raw(sample) else {
            log::trace!("Ignoring input of device type {}", sample.device_type);
            return false;
        };
        let Some(proxy) = self
            .focus
            .get(&msg.device_class())
            .and_then(|p| p.upgrade())
        else {
            return false;
        };
        proxy.read_event(&msg)
    }

    pub fn set_input_focus(&self, class: DeviceClass, proxy: Option<&Rc<UiDriverProxy>>) {
        match proxy {
            Some(proxy) => {
                self.focus.set(class, Rc::downgrade(proxy));
            }
            None => {
                self.focus.remove(&class);
            }
        }
    }

    /// Creates a proxy for the window with a buffer pool the size of the
    /// display and registers it.
    pub fn create_proxy(
        &self,
        window: &Rc<dyn Window>,
        format: PixelFormat,
    ) -> Result<Rc<UiDriverProxy>, RootError> {
        let info = self.display_info()?;
        let proxy = UiDriverProxy::new(window, &self.render, &self.clock, self.buffers_per_window);
        proxy.update_resolution(info.width, info.height, format)?;
        self.register_proxy(&proxy)?;
        Ok(proxy)
    }

    pub fn register_proxy(&self, proxy: &Rc<UiDriverProxy>) -> Result<(), RootError> {
        if self.destroyed.get() {
            return Err(RootError::NotReady);
        }
        self.proxies.borrow_mut().insert(proxy.id(), proxy.clone());
        Ok(())
    }

    pub fn unregister_proxy(&self, window: WindowId) -> Option<Rc<UiDriverProxy>> {
        let proxy = self.remove_proxy(window);
        if proxy.is_some() {
            self.update_vsync();
        }
        proxy
    }

    fn remove_proxy(&self, window: WindowId) -> Option<Rc<UiDriverProxy>> {
        let proxy = self.proxies.borrow_mut().shift_remove(&window)?;
        self.render.release_buffers(window);
        self.auto_vsync.remove(&window);
        self.focus
            .lock()
            .retain(|_, p| p.upgrade().is_some_and(|p| p.id() != window));
        Some(proxy)
    }

    pub fn proxy(&self, window: WindowId) -> Option<Rc<UiDriverProxy>> {
        self.proxies.borrow().get(&window).cloned()
    }

    /// The registered windows in registration order.
    pub fn windows(&self) -> Vec<WindowId> {
        self.proxies.borrow().keys().copied().collect()
    }

    /// Subscribes the window to the shared vsync source or unsubscribes it.
    /// The source runs while any window is subscribed.
    pub fn request_vsync(&self, window: WindowId, enable: bool) -> Result<(), RootError> {
        if self.destroyed.get() {
            return Err(RootError::NotReady);
        }
        let proxy = self.proxy(window).ok_or(RootError::UnknownWindow(window))?;
        self.auto_vsync.remove(&window);
        proxy.on_fb_vsync_request(enable);
        self.update_vsync();
        Ok(())
    }

    /// Requests a frame for the window and subscribes it to vsync if that
    /// armed a wake. Such a subscription ends with the last requested frame.
    /// Returns whether a wake was armed.
    pub fn invalidate(&self, window: WindowId, periodic: bool) -> Result<bool, RootError> {
        let proxy = self.proxy(window).ok_or(RootError::UnknownWindow(window))?;
        let armed = proxy.on_invalidate(periodic);
        if armed && !proxy.vsync_event_enabled() {
            self.request_vsync(window, true)?;
            self.auto_vsync.set(window, ());
        }
        Ok(armed)
    }

    pub fn trace_frame(&self, enable: bool) {
        if self.trace.replace(enable) == enable {
            return;
        }
        if !enable {
            self.frame_time_info.time(None);
            *self.frame_info.borrow_mut() = Default::default();
        }
    }

    /// The timestamps of the current frame if tracing is enabled.
    pub fn frame_info(&self) -> Option<FrameMetaInfo> {
        match self.trace.get() {
            true => Some(*self.frame_info.borrow()),
            false => None,
        }
    }

    pub fn frame_time_summary(&self) -> Option<FrameTimeSummary> {
        self.frame_time_info.summary()
    }

    pub fn display_info(&self) -> Result<DisplayInfo, RootError> {
        self.info.get().ok_or(RootError::NotReady)
    }

    /// Shows a transient message on top of all windows.
    pub fn show_toast(&self, text: &str, duration: Duration) {
        if self.destroyed.get() {
            return;
        }
        self.render.show_toast(text, duration);
    }

    /// Stops the vsync source, detaches from the display and releases it.
    pub fn shutdown(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        if let Some(source) = self.vsync_source.take() {
            source.cancel();
        }
        self.vsync_enabled.set(false);
        self.pending_vsync.take();
        if let Some(display) = self.display.take() {
            display.set_vsync_handler(None);
            display.set_frame_handler(None);
            display.set_input_handler(None);
            display.release();
        }
        self.info.take();
        self.focus.clear();
        self.auto_vsync.clear();
        let proxies = mem::take(&mut *self.proxies.borrow_mut());
        for id in proxies.keys() {
            self.render.release_buffers(*id);
        }
        if self.trace.get() {
            self.frame_time_info.time(None);
        }
        log::info!("Root container shut down");
    }
}

impl Drop for RootContainer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
