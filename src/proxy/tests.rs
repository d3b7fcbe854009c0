use {
    crate::{
        backend::{RenderBackend, Window, WindowId, WindowIds},
        backends::headless::HeadlessRenderer,
        buffer_queue::{BufferHandle, BufferState},
        error::ErrorKind,
        format::PixelFormat,
        input::{InputMessage, InputMonitor, INDEV_TYPE_KEYPAD, RawInputSample},
        proxy::{ProxyError, UiDriverProxy},
        rect::Rect,
        test_utils::{TestWindow, init_logger},
        time::{Clock, ManualClock, Time},
        vsync::{VsyncInfo, VsyncRequest},
    },
    std::{cell::RefCell, rc::Rc, time::Duration},
};

const PERIOD: Duration = Duration::from_millis(16);

struct Setup {
    clock: Rc<ManualClock>,
    render: Rc<HeadlessRenderer>,
    window: Rc<TestWindow>,
    proxy: Rc<UiDriverProxy>,
    seq: std::cell::Cell<u64>,
}

impl Setup {
    fn tick(&self) -> bool {
        self.seq.set(self.seq.get() + 1);
        self.clock.advance(PERIOD);
        self.proxy.on_vsync(&VsyncInfo {
            seq: self.seq.get(),
            timestamp: self.clock.now(),
            period: PERIOD,
        })
    }
}

fn setup() -> Setup {
    init_logger();
    let ids = WindowIds::default();
    let clock = Rc::new(ManualClock::new(Time::from_nsec(1_000_000_000)));
    let render = Rc::new(HeadlessRenderer::default());
    let window = TestWindow::with_visible(&ids, true);
    let dyn_window: Rc<dyn Window> = window.clone();
    let dyn_render: Rc<dyn RenderBackend> = render.clone();
    let dyn_clock: Rc<dyn Clock> = clock.clone();
    let proxy = UiDriverProxy::new(&dyn_window, &dyn_render, &dyn_clock, 2);
    proxy
        .update_resolution(64, 32, PixelFormat::Argb8888)
        .unwrap();
    Setup {
        clock,
        render,
        window,
        proxy,
        seq: Default::default(),
    }
}

#[test]
fn double_invalidate_arms_once() {
    let s = setup();
    assert!(s.proxy.on_invalidate(false));
    assert!(!s.proxy.on_invalidate(false));
    assert_eq!(s.proxy.vsync_request(), VsyncRequest::Single);
    assert!(s.tick());
    assert!(!s.tick());
    assert_eq!(s.window.vsync_count(), 1);
}

#[test]
fn periodic_overrides_everything() {
    let s = setup();
    s.proxy.on_invalidate(false);
    assert!(!s.proxy.on_invalidate(true));
    assert_eq!(s.proxy.vsync_request(), VsyncRequest::Periodic);
    for _ in 0..5 {
        assert!(s.tick());
    }
    assert!(!s.proxy.on_invalidate(false));
    assert_eq!(s.proxy.vsync_request(), VsyncRequest::Periodic);
    s.proxy.cancel_vsync_request();
    assert!(!s.tick());
    assert_eq!(s.window.vsync_count(), 5);
}

#[test]
fn invalidate_in_flight_is_suppressed_once() {
    let s = setup();
    s.proxy.on_invalidate(false);
    assert!(s.tick());
    assert!(s.proxy.vsync_in_flight());
    assert!(s.proxy.on_invalidate(false));
    assert_eq!(s.proxy.vsync_request(), VsyncRequest::SingleSuppress);
    assert!(!s.tick());
    assert_eq!(s.proxy.vsync_request(), VsyncRequest::Single);
    assert!(s.tick());
    assert_eq!(s.proxy.vsync_request(), VsyncRequest::None);
    assert_eq!(s.window.vsync_count(), 2);
}

#[test]
fn invalidate_after_queue_is_not_suppressed() {
    let s = setup();
    s.proxy.on_invalidate(false);
    s.tick();
    let buf = s.proxy.on_dequeue_buffer().unwrap();
    s.proxy.on_queue_buffer(buf.handle).unwrap();
    assert!(!s.proxy.vsync_in_flight());
    assert!(s.proxy.on_invalidate(false));
    assert_eq!(s.proxy.vsync_request(), VsyncRequest::Single);
}

#[test]
fn invalidate_from_vsync_callback_is_kept() {
    let s = setup();
    let proxy = Rc::downgrade(&s.proxy);
    *s.window.on_vsync.borrow_mut() = Some(Box::new(move |_: &VsyncInfo| {
        if let Some(proxy) = proxy.upgrade() {
            let buf = proxy.on_dequeue_buffer().unwrap();
            proxy.on_queue_buffer(buf.handle).unwrap();
            proxy.on_invalidate(false);
        }
    }));
    s.proxy.on_invalidate(false);
    assert!(s.tick());
    assert_eq!(s.proxy.vsync_request(), VsyncRequest::Single);
    s.proxy.finish_drawing().unwrap();
    assert!(s.tick());
    assert_eq!(s.window.vsync_count(), 2);
    assert_eq!(s.render.rendered(), 2);
}

#[test]
fn invisible_window_is_not_woken() {
    let s = setup();
    s.proxy.on_invalidate(true);
    s.proxy.update_visibility(false);
    assert!(!s.tick());
    assert_eq!(s.proxy.vsync_request(), VsyncRequest::Periodic);
    s.proxy.update_visibility(true);
    assert!(s.tick());
    assert_eq!(*s.window.visibility.borrow(), [false, true]);
}

#[test]
fn buffer_exchange() {
    let s = setup();
    let buf = s.proxy.on_dequeue_buffer().unwrap();
    assert_eq!((buf.width, buf.height), (64, 32));
    let err = s.proxy.on_dequeue_buffer().unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidState));
    s.proxy.on_rect_crop(Rect::new_sized(8, 8, 100, 4).unwrap());
    s.proxy.on_queue_buffer(buf.handle).unwrap();
    assert!(s.proxy.has_drawn());
    assert_eq!(s.proxy.buffer_state(), BufferState::Queued(buf.handle));
    {
        let frames = s.render.frames.borrow();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].buffer, buf.handle);
        assert_eq!(frames[0].crop, Rect::new_sized(8, 8, 56, 4));
        assert_eq!(frames[0].dirty, Rect::new_sized(8, 8, 56, 4).unwrap());
    }
    assert_eq!(
        s.proxy.on_dequeue_buffer().unwrap_err().kind(),
        Some(ErrorKind::InvalidState)
    );
    s.proxy.finish_drawing().unwrap();
    assert!(!s.proxy.has_drawn());
    let next = s.proxy.on_dequeue_buffer().unwrap();
    assert_ne!(next.handle, buf.handle);
    assert!(next.seq > buf.seq);
    s.proxy.on_cancel_buffer(next.handle).unwrap();
    assert_eq!(s.proxy.buffer_state(), BufferState::Idle);
}

#[test]
fn queue_checks_handle() {
    let s = setup();
    assert!(matches!(
        s.proxy.on_queue_buffer(BufferHandle::from_raw(99)),
        Err(ProxyError::NotDequeued)
    ));
    let buf = s.proxy.on_dequeue_buffer().unwrap();
    let err = s
        .proxy
        .on_queue_buffer(BufferHandle::from_raw(99))
        .unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::InvalidState));
    s.proxy.on_queue_buffer(buf.handle).unwrap();
}

#[test]
fn becoming_invisible_cancels_buffer() {
    let s = setup();
    let buf = s.proxy.on_dequeue_buffer().unwrap();
    s.proxy.update_visibility(false);
    assert_eq!(s.proxy.buffer_state(), BufferState::Idle);
    assert!(matches!(
        s.proxy.on_queue_buffer(buf.handle),
        Err(ProxyError::NotDequeued)
    ));
    assert!(matches!(
        s.proxy.on_dequeue_buffer(),
        Err(ProxyError::Invisible)
    ));
}

#[test]
fn resolution_change_drops_held_buffer() {
    let s = setup();
    let buf = s.proxy.on_dequeue_buffer().unwrap();
    s.proxy
        .update_resolution(128, 128, PixelFormat::Rgb565)
        .unwrap();
    assert_eq!(s.render.live_buffers(), 2);
    assert!(s.proxy.on_queue_buffer(buf.handle).is_err());
    let next = s.proxy.on_dequeue_buffer().unwrap();
    assert_eq!(next.format, PixelFormat::Rgb565);
    assert_eq!(
        s.window.resizes.borrow().last(),
        Some(&(128, 128, PixelFormat::Rgb565))
    );
}

#[test]
fn render_failure_returns_buffer() {
    let s = setup();
    let buf = s.proxy.on_dequeue_buffer().unwrap();
    s.render.release_buffers(s.proxy.id());
    assert!(matches!(
        s.proxy.on_queue_buffer(buf.handle),
        Err(ProxyError::Render(_))
    ));
    assert!(!s.proxy.has_drawn());
    assert_eq!(s.proxy.buffer_state(), BufferState::Idle);
}

#[test]
fn stale_window() {
    let s = setup();
    s.proxy.on_invalidate(true);
    let id = s.window.id;
    drop(s.window);
    assert!(s.proxy.is_expired());
    assert!(!s.proxy.on_vsync(&VsyncInfo {
        seq: 1,
        timestamp: s.clock.now(),
        period: PERIOD,
    }));
    let err = s.proxy.on_dequeue_buffer().unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::StaleReference));
    assert!(
        s.proxy
            .update_resolution(1, 1, PixelFormat::Argb8888)
            .is_err()
    );
    assert_eq!(s.proxy.id(), id);
}

#[derive(Default)]
struct Monitor {
    seen: RefCell<Vec<(WindowId, InputMessage)>>,
}

impl InputMonitor for Monitor {
    fn on_input(&self, window: WindowId, msg: &InputMessage) {
        self.seen.borrow_mut().push((window, *msg));
    }
}

#[test]
fn input_monitor_sees_events() {
    let s = setup();
    let monitor = Rc::new(Monitor::default());
    s.proxy.set_input_monitor(Some(monitor.clone()));
    let msg = InputMessage::from_raw(&RawInputSample {
        device_type: INDEV_TYPE_KEYPAD,
        key: 13,
        ..Default::default()
    })
    .unwrap();
    assert!(s.proxy.read_event(&msg));
    s.window.consume_input.set(false);
    assert!(!s.proxy.read_event(&msg));
    assert_eq!(monitor.seen.borrow().len(), 2);
    assert_eq!(monitor.seen.borrow()[0], (s.window.id, msg));
    assert_eq!(s.window.inputs.borrow().len(), 2);
}

#[test]
fn frame_trace_markers() {
    let s = setup();
    assert_eq!(s.proxy.frame_meta_info(), None);
    s.proxy.trace_frame(true);
    s.proxy.on_invalidate(false);
    s.tick();
    s.clock.advance(Duration::from_millis(1));
    let buf = s.proxy.on_dequeue_buffer().unwrap();
    s.clock.advance(Duration::from_millis(2));
    s.proxy.on_queue_buffer(buf.handle).unwrap();
    s.clock.advance(Duration::from_millis(3));
    s.proxy.finish_drawing().unwrap();
    let info = s.proxy.frame_meta_info().unwrap();
    assert!(info.is_ordered());
    assert_eq!(info.vsync_id(), 1);
    assert_eq!(info.total_drawn_duration(), Duration::from_millis(6));
    assert_eq!(info.total_layout_duration(), Duration::from_millis(2));
    assert_eq!(info.total_render_duration(), Duration::from_millis(3));
    s.proxy.trace_frame(false);
    assert_eq!(s.proxy.frame_meta_info(), None);
}

#[test]
fn undrawn_wake_expires_on_idle_tick() {
    let s = setup();
    s.proxy.on_invalidate(false);
    assert!(s.tick());
    assert!(s.proxy.vsync_in_flight());
    assert!(!s.tick());
    assert!(!s.proxy.vsync_in_flight());
    assert!(!s.tick());
    assert!(s.proxy.on_invalidate(false));
    assert_eq!(s.proxy.vsync_request(), VsyncRequest::Single);
    assert!(s.tick());
    assert_eq!(s.window.vsync_count(), 2);
}

#[test]
fn frame_without_wake_is_traced_from_dequeue() {
    let s = setup();
    s.proxy.trace_frame(true);
    s.proxy.on_invalidate(false);
    s.tick();
    let buf = s.proxy.on_dequeue_buffer().unwrap();
    s.clock.advance(Duration::from_millis(1));
    s.proxy.on_queue_buffer(buf.handle).unwrap();
    s.proxy.finish_drawing().unwrap();
    assert_eq!(s.proxy.frame_meta_info().unwrap().vsync_id(), 1);
    s.clock.advance(Duration::from_millis(4));
    let buf = s.proxy.on_dequeue_buffer().unwrap();
    s.clock.advance(Duration::from_millis(2));
    s.proxy.on_queue_buffer(buf.handle).unwrap();
    s.clock.advance(Duration::from_millis(3));
    s.proxy.finish_drawing().unwrap();
    let info = s.proxy.frame_meta_info().unwrap();
    assert_eq!(info.vsync_time, None);
    assert!(info.is_ordered());
    assert_eq!(info.total_layout_duration(), Duration::from_millis(2));
    assert_eq!(info.total_render_duration(), Duration::from_millis(3));
}
