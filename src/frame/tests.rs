use {
    crate::{
        frame::{FrameMetaInfo, FrameTimeInfo},
        time::Time,
    },
    std::time::Duration,
};

fn ms(n: u64) -> Time {
    Time::from_nsec(n * 1_000_000)
}

fn frame(id: u64, base: u64) -> FrameMetaInfo {
    let mut info = FrameMetaInfo::default();
    info.set_vsync(ms(base), id, Duration::from_millis(16));
    info.mark_layout_start(ms(base + 1));
    info.mark_render_start(ms(base + 3));
    info.mark_render_end(ms(base + 7));
    info.mark_frame_finished(ms(base + 8));
    info
}

#[test]
fn durations() {
    let info = frame(1, 100);
    assert!(info.is_ordered());
    assert_eq!(info.total_drawn_duration(), Duration::from_millis(8));
    assert_eq!(info.total_render_duration(), Duration::from_millis(4));
    assert_eq!(info.total_layout_duration(), Duration::from_millis(2));
}

#[test]
fn set_vsync_clears_markers() {
    let mut info = frame(1, 100);
    info.set_vsync(ms(200), 2, Duration::from_millis(16));
    assert_eq!(info.vsync_id(), 2);
    assert!(info.layout_start.is_none());
    assert!(info.finish.is_none());
    assert_eq!(info.total_drawn_duration(), Duration::ZERO);
}

#[test]
fn render_end_without_start() {
    let mut info = FrameMetaInfo::default();
    info.set_vsync(ms(10), 1, Duration::from_millis(16));
    info.mark_layout_start(ms(10));
    info.mark_render_end(ms(12));
    assert_eq!(info.render_start, Some(ms(12)));
    assert_eq!(info.layout_end, Some(ms(12)));
    assert!(info.is_ordered());
}

#[test]
fn unordered() {
    let mut info = frame(1, 100);
    info.finish = Some(ms(50));
    assert!(!info.is_ordered());
}

#[test]
fn aggregate() {
    let agg = FrameTimeInfo::default();
    assert!(agg.summary().is_none());
    agg.time(Some(&frame(1, 0)));
    agg.time(Some(&frame(2, 16)));
    let mut slow = frame(3, 32);
    slow.mark_frame_finished(ms(52));
    agg.time(Some(&slow));
    let summary = agg.summary().unwrap();
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.total.min, Duration::from_millis(8));
    assert_eq!(summary.total.max, Duration::from_millis(20));
    assert!(summary.total.smoothed > Duration::from_millis(8));
    assert!(summary.total.smoothed < Duration::from_millis(20));
    agg.time(None);
    assert_eq!(agg.frames(), 0);
    assert!(agg.summary().is_none());
}
