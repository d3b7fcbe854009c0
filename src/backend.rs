use {
    crate::{
        buffer_queue::{BufferHandle, BufferItem},
        format::PixelFormat,
        input::{InputMessage, RawInputSample},
        rect::Rect,
        vsync::VsyncInfo,
    },
    std::{rc::Rc, time::Duration},
    thiserror::Error,
};

linear_ids!(WindowIds, WindowId);

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DisplayInfo {
    pub width: i32,
    pub height: i32,
}

/// Refresh markers emitted by the display while it produces a frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FrameEvent {
    RefreshStart,
    RenderStart,
    RefreshReady,
}

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("Could not open the display device {0}")]
    Open(String),
    #[error("The display device has no usable mode")]
    NoMode,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Could not allocate {count} {width}x{height} {format} buffers")]
    Allocate {
        count: usize,
        width: i32,
        height: i32,
        format: PixelFormat,
    },
    #[error("Buffer {0} is not known to the renderer")]
    UnknownBuffer(BufferHandle),
}

pub type VsyncHandler = Rc<dyn Fn()>;
pub type FrameHandler = Rc<dyn Fn(FrameEvent)>;
pub type InputHandler = Rc<dyn Fn(&RawInputSample) -> bool>;

/// The display and input device driver.
pub trait DisplayDriver {
    fn init(&self) -> Result<DisplayInfo, DisplayError>;
    fn info(&self) -> DisplayInfo;
    fn refresh_period(&self) -> Option<Duration> {
        None
    }
    fn supports_vsync_event(&self) -> bool {
        false
    }
    fn set_vsync_handler(&self, handler: Option<VsyncHandler>) {
        let _ = handler;
    }
    fn set_frame_handler(&self, handler: Option<FrameHandler>);
    fn set_input_handler(&self, handler: Option<InputHandler>);
    fn release(&self);
}

/// The GUI toolkit that turns window buffers into pixels on the display.
pub trait RenderBackend {
    fn allocate_buffers(
        &self,
        window: WindowId,
        width: i32,
        height: i32,
        format: PixelFormat,
        count: usize,
    ) -> Result<Vec<BufferHandle>, RenderError>;
    fn release_buffers(&self, window: WindowId);
    /// Schedules a redraw of the window's surface from `item`. Must not block.
    fn render(&self, window: WindowId, item: &BufferItem, crop: Option<Rect>)
    -> Result<(), RenderError>;
    fn show_toast(&self, text: &str, duration: Duration) {
        let _ = (text, duration);
    }
}

/// A client window as seen by the compositor.
pub trait Window {
    fn id(&self) -> WindowId;
    fn on_vsync(&self, vsync: &VsyncInfo);
    fn handle_input(&self, msg: &InputMessage) -> bool;
    fn resized(&self, width: i32, height: i32, format: PixelFormat) {
        let _ = (width, height, format);
    }
    fn visibility_changed(&self, visible: bool) {
        let _ = visible;
    }
    fn client_visible(&self) -> bool;
}
