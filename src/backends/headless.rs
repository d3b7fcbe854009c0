//! A display and renderer that exist only in memory.
//!
//! Used by the `run` subcommand to exercise the synchronization core without
//! hardware and by the tests to drive frames and input by hand.

use {
    crate::{
        backend::{
            DisplayDriver, DisplayError, DisplayInfo, FrameEvent, FrameHandler, InputHandler,
            RenderBackend, RenderError, VsyncHandler, WindowId,
        },
        buffer_queue::{BufferHandle, BufferHandles, BufferItem},
        format::PixelFormat,
        input::RawInputSample,
        rect::Rect,
        utils::{clonecell::CloneCell, copyhashmap::CopyHashMap, numcell::NumCell},
    },
    std::{
        cell::{Cell, RefCell},
        time::Duration,
    },
};

pub struct HeadlessDisplay {
    info: DisplayInfo,
    refresh_period: Option<Duration>,
    vsync_event: bool,
    pub fail_init: Cell<bool>,
    pub released: Cell<bool>,
    vsync_handler: CloneCell<Option<VsyncHandler>>,
    frame_handler: CloneCell<Option<FrameHandler>>,
    input_handler: CloneCell<Option<InputHandler>>,
}

impl HeadlessDisplay {
    pub fn new(width: i32, height: i32, refresh_period: Option<Duration>, vsync_event: bool) -> Self {
        Self {
            info: DisplayInfo { width, height },
            refresh_period,
            vsync_event,
            fail_init: Cell::new(false),
            released: Cell::new(false),
            vsync_handler: Default::default(),
            frame_handler: Default::default(),
            input_handler: Default::default(),
        }
    }

    pub fn has_vsync_handler(&self) -> bool {
        self.vsync_handler.get().is_some()
    }

    pub fn has_frame_handler(&self) -> bool {
        self.frame_handler.get().is_some()
    }

    /// Emulates the vsync interrupt. Returns whether a handler was registered.
    pub fn fire_vsync(&self) -> bool {
        match self.vsync_handler.get() {
            Some(h) => {
                h();
                true
            }
            _ => false,
        }
    }

    pub fn emit(&self, event: FrameEvent) {
        if let Some(h) = self.frame_handler.get() {
            h(event);
        }
    }

    /// Emits the refresh markers of one complete frame.
    pub fn run_frame(&self) {
        self.emit(FrameEvent::RefreshStart);
        self.emit(FrameEvent::RenderStart);
        self.emit(FrameEvent::RefreshReady);
    }

    /// Returns whether the sample was consumed.
    pub fn feed_input(&self, sample: &RawInputSample) -> bool {
        match self.input_handler.get() {
            Some(h) => h(sample),
            _ => false,
        }
    }
}

impl DisplayDriver for HeadlessDisplay {
    fn init(&self) -> Result<DisplayInfo, DisplayError> {
        if self.fail_init.get() {
            return Err(DisplayError::Open("headless".to_string()));
        }
        Ok(self.info)
    }

    fn info(&self) -> DisplayInfo {
        self.info
    }

    fn refresh_period(&self) -> Option<Duration> {
        self.refresh_period
    }

    fn supports_vsync_event(&self) -> bool {
        self.vsync_event
    }

    fn set_vsync_handler(&self, handler: Option<VsyncHandler>) {
        self.vsync_handler.set(handler);
    }

    fn set_frame_handler(&self, handler: Option<FrameHandler>) {
        self.frame_handler.set(handler);
    }

    fn set_input_handler(&self, handler: Option<InputHandler>) {
        self.input_handler.set(handler);
    }

    fn release(&self) {
        self.vsync_handler.take();
        self.frame_handler.take();
        self.input_handler.take();
        self.released.set(true);
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RenderedFrame {
    pub window: WindowId,
    pub buffer: BufferHandle,
    pub seq: u64,
    pub dirty: Rect,
    pub crop: Option<Rect>,
}

#[derive(Default)]
pub struct HeadlessRenderer {
    handles: BufferHandles,
    buffers: CopyHashMap<BufferHandle, WindowId>,
    pub fail_allocation: Cell<bool>,
    pub frames: RefCell<Vec<RenderedFrame>>,
    pub toasts: RefCell<Vec<(String, Duration)>>,
    pub allocations: NumCell<usize>,
}

impl HeadlessRenderer {
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn rendered(&self) -> usize {
        self.frames.borrow().len()
    }
}

impl RenderBackend for HeadlessRenderer {
    fn allocate_buffers(
        &self,
        window: WindowId,
        width: i32,
        height: i32,
        format: PixelFormat,
        count: usize,
    ) -> Result<Vec<BufferHandle>, RenderError> {
        if self.fail_allocation.get() || width <= 0 || height <= 0 {
            return Err(RenderError::Allocate {
                count,
                width,
                height,
                format,
            });
        }
        self.release_buffers(window);
        self.allocations.fetch_add(1);
        let handles: Vec<_> = (0..count).map(|_| self.handles.next()).collect();
        for &handle in &handles {
            self.buffers.set(handle, window);
        }
        log::debug!(
            "Allocated {count} {width}x{height} {format} buffers for window {window}"
        );
        Ok(handles)
    }

    fn release_buffers(&self, window: WindowId) {
        self.buffers.lock().retain(|_, w| *w != window);
    }

    fn render(
        &self,
        window: WindowId,
        item: &BufferItem,
        crop: Option<Rect>,
    ) -> Result<(), RenderError> {
        if self.buffers.get(&item.handle) != Some(window) {
            return Err(RenderError::UnknownBuffer(item.handle));
        }
        self.frames.borrow_mut().push(RenderedFrame {
            window,
            buffer: item.handle,
            seq: item.seq,
            dirty: item.dirty,
            crop,
        });
        Ok(())
    }

    fn show_toast(&self, text: &str, duration: Duration) {
        log::info!("Toast: {text}");
        self.toasts.borrow_mut().push((text.to_string(), duration));
    }
}
