#[cfg(test)]
mod tests;

use {
    crate::{
        backend::{RenderBackend, RenderError, Window, WindowId},
        buffer_queue::{BufferHandle, BufferItem, BufferQueue, BufferQueueError, BufferState},
        error::ErrorKind,
        format::PixelFormat,
        frame::FrameMetaInfo,
        input::{InputMessage, InputMonitor},
        rect::Rect,
        time::Clock,
        utils::{clonecell::CloneCell, errorfmt::ErrorFmt},
        vsync::{VsyncInfo, VsyncRequest},
    },
    std::{
        cell::{Cell, RefCell},
        rc::{Rc, Weak},
    },
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("The window has been destroyed")]
    Stale,
    #[error("The window is not visible")]
    Invisible,
    #[error("The window holds no dequeued buffer")]
    NotDequeued,
    #[error(transparent)]
    BufferQueue(#[from] BufferQueueError),
    #[error("The renderer failed")]
    Render(#[from] RenderError),
}

impl ProxyError {
    /// `None` for failures of the renderer.
    pub fn kind(&self) -> Option<ErrorKind> {
        let kind = match self {
            Self::Stale => ErrorKind::StaleReference,
            Self::Invisible | Self::NotDequeued => ErrorKind::InvalidState,
            Self::BufferQueue(e) => e.kind(),
            Self::Render(_) => return None,
        };
        Some(kind)
    }
}

/// What the window learns about a buffer it dequeued. The buffer itself stays
/// with the proxy until it is queued or cancelled.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DequeuedBuffer {
    pub handle: BufferHandle,
    pub width: i32,
    pub height: i32,
    pub format: PixelFormat,
    pub seq: u64,
}

impl From<&BufferItem> for DequeuedBuffer {
    fn from(item: &BufferItem) -> Self {
        Self {
            handle: item.handle,
            width: item.width,
            height: item.height,
            format: item.format,
            seq: item.seq,
        }
    }
}

/// Mediates between one window and the compositor root.
///
/// Calls that arrive from the window are expected to be serialized onto the
/// compositor's thread already.
pub struct UiDriverProxy {
    id: WindowId,
    window: Weak<dyn Window>,
    render: Rc<dyn RenderBackend>,
    clock: Rc<dyn Clock>,
    queue: BufferQueue,
    buffer_item: RefCell<Option<BufferItem>>,
    buffers_per_window: usize,
    vsync_request: Cell<VsyncRequest>,
    vsync_in_flight: Cell<bool>,
    delivering: Cell<bool>,
    deferred_invalidate: Cell<Option<bool>>,
    visible: Cell<bool>,
    vsync_enabled: Cell<bool>,
    drawn: Cell<bool>,
    input_monitor: CloneCell<Option<Rc<dyn InputMonitor>>>,
    trace: Cell<bool>,
    frame_info: RefCell<FrameMetaInfo>,
}

impl UiDriverProxy {
    pub fn new(
        window: &Rc<dyn Window>,
        render: &Rc<dyn RenderBackend>,
        clock: &Rc<dyn Clock>,
        buffers_per_window: usize,
    ) -> Rc<Self> {
        Rc::new(Self {
            id: window.id(),
            window: Rc::downgrade(window),
            render: render.clone(),
            clock: clock.clone(),
            queue: BufferQueue::new(),
            buffer_item: Default::default(),
            buffers_per_window: buffers_per_window.max(1),
            vsync_request: Default::default(),
            vsync_in_flight: Cell::new(false),
            delivering: Cell::new(false),
            deferred_invalidate: Cell::new(None),
            visible: Cell::new(true),
            vsync_enabled: Cell::new(false),
            drawn: Cell::new(false),
            input_monitor: Default::default(),
            trace: Cell::new(false),
            frame_info: Default::default(),
        })
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn window(&self) -> Option<Rc<dyn Window>> {
        self.window.upgrade()
    }

    pub fn is_expired(&self) -> bool {
        self.window.strong_count() == 0
    }

    pub fn vsync_request(&self) -> VsyncRequest {
        self.vsync_request.get()
    }

    pub fn vsync_in_flight(&self) -> bool {
        self.vsync_in_flight.get()
    }

    pub fn buffer_state(&self) -> BufferState {
        self.queue.state()
    }

    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    /// Whether a queued buffer is waiting for the end of the current frame.
    pub fn has_drawn(&self) -> bool {
        self.drawn.get()
    }

    fn upgrade(&self) -> Result<Rc<dyn Window>, ProxyError> {
        self.window.upgrade().ok_or(ProxyError::Stale)
    }

    /// Asks the renderer to redraw the window's surface from `item`.
    pub fn draw_frame(&self, item: &BufferItem) -> Result<(), ProxyError> {
        let crop = self.queue.rect_crop();
        if self.trace.get() {
            self.frame_info
                .borrow_mut()
                .mark_render_start(self.clock.now());
        }
        self.render.render(self.id, item, crop)?;
        self.drawn.set(true);
        Ok(())
    }

    /// The renderer is done with the queued buffer.
    pub fn finish_drawing(&self) -> Result<(), ProxyError> {
        self.queue.finish_drawing()?;
        self.drawn.set(false);
        if self.trace.get() {
            let now = self.clock.now();
            let mut fi = self.frame_info.borrow_mut();
            fi.mark_render_end(now);
            fi.mark_frame_finished(now);
        }
        Ok(())
    }

    /// Requests a future frame. Returns whether a wake was newly armed.
    ///
    /// Requests made while the window is handling a vsync are applied once
    /// that vsync has been accounted for.
    pub fn on_invalidate(&self, periodic: bool) -> bool {
        if self.delivering.get() {
            let periodic = periodic || self.deferred_invalidate.get() == Some(true);
            self.deferred_invalidate.set(Some(periodic));
            return false;
        }
        let prev = self.vsync_request.get();
        let next = match (periodic, prev) {
            (true, _) => VsyncRequest::Periodic,
            (false, VsyncRequest::Single | VsyncRequest::Periodic) => prev,
            (false, _) if self.vsync_in_flight.get() => VsyncRequest::SingleSuppress,
            (false, _) => VsyncRequest::Single,
        };
        if next != prev {
            log::trace!("Window {}: vsync request {prev} -> {next}", self.id);
        }
        self.vsync_request.set(next);
        prev == VsyncRequest::None && next != VsyncRequest::None
    }

    /// Stops waking the window.
    pub fn cancel_vsync_request(&self) {
        self.deferred_invalidate.take();
        self.vsync_request.set(VsyncRequest::None);
    }

    pub fn on_dequeue_buffer(&self) -> Result<DequeuedBuffer, ProxyError> {
        self.upgrade()?;
        if !self.visible.get() {
            return Err(ProxyError::Invisible);
        }
        let item = self.queue.dequeue()?;
        if self.trace.get() {
            let mut fi = self.frame_info.borrow_mut();
            if fi.finish.is_some() {
                *fi = Default::default();
            }
            fi.mark_layout_start(self.clock.now());
        }
        let buffer = DequeuedBuffer::from(&item);
        *self.buffer_item.borrow_mut() = Some(item);
        Ok(buffer)
    }

    /// Queues the dequeued buffer and draws it.
    pub fn on_queue_buffer(&self, handle: BufferHandle) -> Result<(), ProxyError> {
        self.upgrade()?;
        let item = self.take_item(handle)?;
        self.queue.queue(item)?;
        self.vsync_in_flight.set(false);
        let res = match self.queue.acquire() {
            Some(item) => self.draw_frame(&item),
            None => Err(BufferQueueError::NotQueued.into()),
        };
        if res.is_err() {
            if let Err(e) = self.queue.finish_drawing() {
                log::warn!(
                    "Window {}: Could not return the undrawn buffer: {}",
                    self.id,
                    ErrorFmt(e)
                );
            }
        }
        res
    }

    pub fn on_cancel_buffer(&self, handle: BufferHandle) -> Result<(), ProxyError> {
        self.upgrade()?;
        let item = self.take_item(handle)?;
        self.queue.cancel(item)?;
        self.vsync_in_flight.set(false);
        Ok(())
    }

    fn take_item(&self, handle: BufferHandle) -> Result<BufferItem, ProxyError> {
        let mut slot = self.buffer_item.borrow_mut();
        match slot.take() {
            Some(item) if item.handle == handle => Ok(item),
            Some(item) => {
                *slot = Some(item);
                Err(BufferQueueError::WrongBuffer(handle).into())
            }
            None => Err(ProxyError::NotDequeued),
        }
    }

    pub fn on_rect_crop(&self, rect: Rect) {
        self.queue.on_rect_crop(rect);
    }

    pub fn rect_crop(&self) -> Option<Rect> {
        self.queue.rect_crop()
    }

    /// Delivers one input event. Returns whether the window consumed it.
    pub fn read_event(&self, msg: &InputMessage) -> bool {
        let Some(window) = self.window.upgrade() else {
            return false;
        };
        if let Some(monitor) = self.input_monitor.get() {
            monitor.on_input(self.id, msg);
        }
        window.handle_input(msg)
    }

    pub fn set_input_monitor(&self, monitor: Option<Rc<dyn InputMonitor>>) {
        self.input_monitor.set(monitor);
    }

    /// Replaces the buffer pool with one of the new size and tells the window.
    pub fn update_resolution(
        &self,
        width: i32,
        height: i32,
        format: PixelFormat,
    ) -> Result<(), ProxyError> {
        let window = self.upgrade()?;
        let handles = self.render.allocate_buffers(
            self.id,
            width,
            height,
            format,
            self.buffers_per_window,
        )?;
        self.queue.reset(&handles, width, height, format);
        self.buffer_item.take();
        self.drawn.set(false);
        self.vsync_in_flight.set(false);
        log::debug!(
            "Window {}: resolution {width}x{height} {format}, {} buffers",
            self.id,
            handles.len()
        );
        window.resized(width, height, format);
        Ok(())
    }

    /// Invisible windows are neither woken nor handed buffers. A buffer that
    /// is checked out when the window becomes invisible is cancelled.
    pub fn update_visibility(&self, visible: bool) {
        if self.visible.replace(visible) == visible {
            return;
        }
        if !visible {
            if let Some(item) = self.buffer_item.take() {
                if let Err(e) = self.queue.cancel(item) {
                    log::warn!(
                        "Window {}: Could not cancel buffer: {}",
                        self.id,
                        ErrorFmt(e)
                    );
                }
            }
            self.vsync_in_flight.set(false);
        }
        if let Some(window) = self.window.upgrade() {
            window.visibility_changed(visible);
        }
    }

    pub fn on_fb_vsync_request(&self, enable: bool) {
        self.vsync_enabled.set(enable);
    }

    pub fn vsync_event_enabled(&self) -> bool {
        self.vsync_enabled.get()
    }

    /// Handles one tick of the shared vsync source. Returns whether the
    /// window was woken.
    pub fn on_vsync(&self, vsync: &VsyncInfo) -> bool {
        let Some(window) = self.window.upgrade() else {
            return false;
        };
        if !self.visible.get() {
            return false;
        }
        let woken = self.vsync_request.get().wakes();
        if woken {
            if self.trace.get() {
                self.frame_info
                    .borrow_mut()
                    .set_vsync(vsync.timestamp, vsync.seq, vsync.period);
            }
            self.vsync_in_flight.set(true);
            self.delivering.set(true);
            window.on_vsync(vsync);
            self.delivering.set(false);
        } else {
            // A frame that was woken but never resolved is no longer in flight.
            self.vsync_in_flight.set(false);
        }
        self.vsync_request.set(self.vsync_request.get().advance());
        if let Some(periodic) = self.deferred_invalidate.take() {
            self.on_invalidate(periodic);
        }
        woken
    }

    pub fn trace_frame(&self, enable: bool) {
        if self.trace.replace(enable) != enable && !enable {
            *self.frame_info.borrow_mut() = Default::default();
        }
    }

    /// The timestamps of the window's last frame if tracing is enabled.
    pub fn frame_meta_info(&self) -> Option<FrameMetaInfo> {
        match self.trace.get() {
            true => Some(*self.frame_info.borrow()),
            false => None,
        }
    }
}
