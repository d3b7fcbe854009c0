use {
    crate::{
        backend::DisplayDriver,
        backends::headless::HeadlessDisplay,
        test_utils::init_logger,
        time::{Clock, ManualClock, Time},
        utils::numcell::NumCell,
        vsync_source::{VsyncSource, VsyncSourceKind, create_vsync_source},
        wheel::Wheel,
    },
    std::{rc::Rc, time::Duration},
};

const PERIOD: Duration = Duration::from_millis(16);

struct Setup {
    clock: Rc<ManualClock>,
    wheel: Rc<Wheel>,
    display: Rc<HeadlessDisplay>,
    ticks: Rc<NumCell<u32>>,
    handler: Rc<dyn Fn()>,
}

fn setup(vsync_event: bool) -> Setup {
    init_logger();
    let clock = Rc::new(ManualClock::new(Time::from_nsec(1_000_000_000)));
    let dyn_clock: Rc<dyn Clock> = clock.clone();
    let ticks = Rc::new(NumCell::new(0));
    let t2 = ticks.clone();
    Setup {
        wheel: Wheel::new(&dyn_clock),
        clock,
        display: Rc::new(HeadlessDisplay::new(320, 240, Some(PERIOD), vsync_event)),
        ticks,
        handler: Rc::new(move || {
            t2.fetch_add(1);
        }),
    }
}

fn create(s: &Setup, kind: VsyncSourceKind) -> Rc<dyn VsyncSource> {
    let display: Rc<dyn DisplayDriver> = s.display.clone();
    create_vsync_source(kind, &display, &s.wheel, PERIOD, s.handler.clone()).unwrap()
}

#[test]
fn auto_prefers_event() {
    let s = setup(true);
    assert_eq!(create(&s, VsyncSourceKind::Auto).kind(), VsyncSourceKind::Event);
    let s = setup(false);
    assert_eq!(create(&s, VsyncSourceKind::Auto).kind(), VsyncSourceKind::Timer);
}

#[test]
fn event_falls_back_to_timer() {
    let s = setup(false);
    assert_eq!(create(&s, VsyncSourceKind::Event).kind(), VsyncSourceKind::Timer);
}

#[test]
fn event_registers_handler() {
    let s = setup(true);
    let source = create(&s, VsyncSourceKind::Event);
    assert!(!s.display.has_vsync_handler());
    source.set_enabled(true);
    assert!(source.enabled());
    assert!(s.display.fire_vsync());
    assert_eq!(s.ticks.get(), 1);
    source.set_enabled(false);
    assert!(!s.display.fire_vsync());
    source.set_enabled(true);
    source.cancel();
    assert!(!s.display.has_vsync_handler());
    assert_eq!(s.ticks.get(), 1);
}

#[test]
fn timer_ticks_while_enabled() {
    let s = setup(true);
    let source = create(&s, VsyncSourceKind::Timer);
    s.clock.advance(PERIOD);
    assert_eq!(s.wheel.dispatch(), 0);
    source.set_enabled(true);
    s.clock.advance(PERIOD);
    assert_eq!(s.wheel.dispatch(), 1);
    source.set_enabled(false);
    s.clock.advance(PERIOD);
    assert_eq!(s.wheel.dispatch(), 0);
    assert_eq!(s.ticks.get(), 1);
}

#[test]
fn timer_frame_started_ticks_immediately() {
    let s = setup(false);
    let source = create(&s, VsyncSourceKind::Timer);
    source.frame_started();
    assert_eq!(s.ticks.get(), 0);
    source.set_enabled(true);
    s.clock.advance(Duration::from_millis(10));
    source.frame_started();
    assert_eq!(s.ticks.get(), 1);
    s.clock.advance(Duration::from_millis(10));
    assert_eq!(s.wheel.dispatch(), 0);
    s.clock.advance(Duration::from_millis(6));
    assert_eq!(s.wheel.dispatch(), 1);
    assert_eq!(s.ticks.get(), 2);
}

#[test]
fn timer_cancel() {
    let s = setup(false);
    let source = create(&s, VsyncSourceKind::Timer);
    source.set_enabled(true);
    source.cancel();
    s.clock.advance(PERIOD);
    assert_eq!(s.wheel.dispatch(), 0);
    assert_eq!(s.wheel.active_timers(), 0);
}
