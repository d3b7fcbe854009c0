
use {
    crate::{error::ErrorKind, format::PixelFormat, rect::Rect, utils::numcell::NumCell},
    std::{
        cell::{Cell, Ref, RefCell},
        collections::VecDeque,
    },
    thiserror::Error,
};

linear_ids!(BufferHandles, BufferHandle, u64);

#[derive(Debug, Error)]
pub enum BufferQueueError {
    #[error("Buffer {0} is still dequeued")]
    AlreadyDequeued(BufferHandle),
    #[error("The queued buffer has not been consumed yet")]
    AwaitingFinish,
    #[error("No buffer is dequeued")]
    NotDequeued,
    #[error("Buffer {0} is not the dequeued buffer")]
    WrongBuffer(BufferHandle),
    #[error("No buffer is queued")]
    NotQueued,
    #[error("The buffer pool is empty")]
    NoBuffer,
}

impl BufferQueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoBuffer => ErrorKind::NoBuffer,
            _ => ErrorKind::InvalidState,
        }
    }
}

/// One drawable buffer plus the region of it that changed.
///
/// Items are moved, never copied: whoever holds the value owns the buffer.
#[derive(Debug, Eq, PartialEq)]
pub struct BufferItem {
    pub handle: BufferHandle,
    pub width: i32,
    pub height: i32,
    pub format: PixelFormat,
    pub dirty: Rect,
    pub seq: u64,
}

impl BufferItem {
    pub fn new(handle: BufferHandle, width: i32, height: i32, format: PixelFormat) -> Self {
        Self {
            handle,
            width,
            height,
            format,
            dirty: Rect::of_size(width, height),
            seq: 0,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::of_size(self.width, self.height)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BufferState {
    Idle,
    Dequeued(BufferHandle),
    Queued(BufferHandle),
}

/// Hands buffers of one window back and forth between the window and the
/// compositor. At most one buffer is outside of the free pool at any time.
pub struct BufferQueue {
    free: RefCell<VecDeque<BufferItem>>,
    queued: RefCell<Option<BufferItem>>,
    state: Cell<BufferState>,
    size: Cell<(i32, i32)>,
    crop: Cell<Option<Rect>>,
    next_seq: NumCell<u64>,
}

impl Default for BufferQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferQueue {
    pub fn new() -> Self {
        Self {
            free: Default::default(),
            queued: Default::default(),
            state: Cell::new(BufferState::Idle),
            size: Default::default(),
            crop: Default::default(),
            next_seq: NumCell::new(1),
        }
    }

    /// Replaces the pool. Buffers of the previous pool that are still checked
    /// out are forgotten and rejected if they come back.
    pub fn reset(&self, handles: &[BufferHandle], width: i32, height: i32, format: PixelFormat) {
        let mut free = self.free.borrow_mut();
        free.clear();
        free.extend(
            handles
                .iter()
                .map(|&h| BufferItem::new(h, width, height, format)),
        );
        self.queued.take();
        self.crop.take();
        self.size.set((width, height));
        self.state.set(BufferState::Idle);
    }

    pub fn state(&self) -> BufferState {
        self.state.get()
    }

    pub fn has_outstanding(&self) -> bool {
        self.state.get() != BufferState::Idle
    }

    pub fn pool_size(&self) -> usize {
        let out = match self.state.get() {
            BufferState::Idle => 0,
            _ => 1,
        };
        self.free.borrow().len() + out
    }

    pub fn dequeue(&self) -> Result<BufferItem, BufferQueueError> {
        match self.state.get() {
            BufferState::Idle => {}
            BufferState::Dequeued(h) => return Err(BufferQueueError::AlreadyDequeued(h)),
            BufferState::Queued(_) => return Err(BufferQueueError::AwaitingFinish),
        }
        let mut item = match self.free.borrow_mut().pop_front() {
            Some(item) => item,
            None => return Err(BufferQueueError::NoBuffer),
        };
        item.seq = self.next_seq.fetch_add(1);
        item.dirty = item.bounds();
        self.crop.take();
        self.state.set(BufferState::Dequeued(item.handle));
        Ok(item)
    }

    /// Hands the dequeued buffer to the compositor. A rejected item is dropped.
    pub fn queue(&self, mut item: BufferItem) -> Result<(), BufferQueueError> {
        self.check_dequeued(&item)?;
        if let Some(crop) = self.crop.get() {
            item.dirty = crop;
        }
        self.state.set(BufferState::Queued(item.handle));
        *self.queued.borrow_mut() = Some(item);
        Ok(())
    }

    /// Returns the dequeued buffer to the pool without presenting it.
    pub fn cancel(&self, item: BufferItem) -> Result<(), BufferQueueError> {
        self.check_dequeued(&item)?;
        self.crop.take();
        self.free.borrow_mut().push_front(item);
        self.state.set(BufferState::Idle);
        Ok(())
    }

    /// The compositor is done with the queued buffer.
    pub fn finish_drawing(&self) -> Result<(), BufferQueueError> {
        if !matches!(self.state.get(), BufferState::Queued(_)) {
            return Err(BufferQueueError::NotQueued);
        }
        if let Some(item) = self.queued.borrow_mut().take() {
            self.free.borrow_mut().push_back(item);
        }
        self.crop.take();
        self.state.set(BufferState::Idle);
        Ok(())
    }

    /// The queued buffer, for the consumer to read.
    pub fn acquire(&self) -> Option<Ref<'_, BufferItem>> {
        Ref::filter_map(self.queued.borrow(), |q| q.as_ref()).ok()
    }

    /// Marks the sub-region of the current buffer that changed. The rect is
    /// clipped to the buffer.
    pub fn on_rect_crop(&self, rect: Rect) {
        let (width, height) = self.size.get();
        self.crop.set(Some(Rect::of_size(width, height).intersect(rect)));
    }

    /// Takes the most recently set crop rect.
    pub fn rect_crop(&self) -> Option<Rect> {
        self.crop.take()
    }

    fn check_dequeued(&self, item: &BufferItem) -> Result<(), BufferQueueError> {
        match self.state.get() {
            BufferState::Dequeued(h) if h == item.handle => Ok(()),
            BufferState::Dequeued(_) => Err(BufferQueueError::WrongBuffer(item.handle)),
            _ => Err(BufferQueueError::NotDequeued),
        }
    }
}
