#[cfg(test)]
mod tests;

use {
    crate::{time::Time, utils::geometric_decay::GeometricDecay},
    std::{cell::Cell, time::Duration},
};

/// Timestamps of one frame.
///
/// Markers that were never set are `None`. Durations are computed from the
/// markers that exist and are zero otherwise.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FrameMetaInfo {
    pub vsync_time: Option<Time>,
    pub vsync_id: u64,
    pub refresh_period: Duration,
    pub layout_start: Option<Time>,
    pub layout_end: Option<Time>,
    pub render_start: Option<Time>,
    pub render_end: Option<Time>,
    pub finish: Option<Time>,
}

impl FrameMetaInfo {
    pub fn set_vsync(&mut self, time: Time, id: u64, period: Duration) {
        *self = Self {
            vsync_time: Some(time),
            vsync_id: id,
            refresh_period: period,
            ..Default::default()
        };
    }

    pub fn mark_layout_start(&mut self, now: Time) {
        self.layout_start = Some(now);
    }

    pub fn mark_layout_end(&mut self, now: Time) {
        self.layout_end = Some(now);
    }

    /// Also closes the layout phase if nothing else did.
    pub fn mark_render_start(&mut self, now: Time) {
        if self.layout_end.is_none() {
            self.layout_end = Some(now);
        }
        self.render_start = Some(now);
    }

    pub fn mark_render_end(&mut self, now: Time) {
        if self.render_start.is_none() {
            self.mark_render_start(now);
        }
        self.render_end = Some(now);
    }

    pub fn mark_frame_finished(&mut self, now: Time) {
        self.finish = Some(now);
    }

    pub fn vsync_id(&self) -> u64 {
        self.vsync_id
    }

    pub fn total_drawn_duration(&self) -> Duration {
        span(self.vsync_time, self.finish)
    }

    pub fn total_render_duration(&self) -> Duration {
        span(self.render_start, self.render_end)
    }

    pub fn total_layout_duration(&self) -> Duration {
        span(self.layout_start, self.layout_end)
    }

    /// Whether the markers that are set appear in pipeline order.
    pub fn is_ordered(&self) -> bool {
        let markers = [
            self.vsync_time,
            self.layout_start,
            self.render_start,
            self.render_end,
            self.finish,
        ];
        let mut last = Time::default();
        for t in markers.into_iter().flatten() {
            if t < last {
                return false;
            }
            last = t;
        }
        true
    }

    pub fn has_markers(&self) -> bool {
        self.vsync_time.is_some()
            || self.layout_start.is_some()
            || self.render_start.is_some()
            || self.render_end.is_some()
            || self.finish.is_some()
    }
}

fn span(start: Option<Time>, end: Option<Time>) -> Duration {
    match (start, end) {
        (Some(start), Some(end)) => end - start,
        _ => Duration::ZERO,
    }
}

const DECAY: f64 = 0.1;

struct Stat {
    min: Cell<u64>,
    max: Cell<u64>,
    smoothed: GeometricDecay,
}

impl Stat {
    fn new() -> Self {
        Self {
            min: Cell::new(u64::MAX),
            max: Cell::new(0),
            smoothed: GeometricDecay::new(DECAY, 0),
        }
    }

    fn add(&self, first: bool, d: Duration) {
        let ns = d.as_nanos() as u64;
        self.min.set(self.min.get().min(ns));
        self.max.set(self.max.get().max(ns));
        if first {
            self.smoothed.reset(ns);
        } else {
            self.smoothed.add(ns);
        }
    }

    fn reset(&self) {
        self.min.set(u64::MAX);
        self.max.set(0);
        self.smoothed.reset(0);
    }

    fn summary(&self) -> StatSummary {
        StatSummary {
            min: Duration::from_nanos(self.min.get()),
            max: Duration::from_nanos(self.max.get()),
            smoothed: Duration::from_nanos(self.smoothed.get()),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatSummary {
    pub min: Duration,
    pub max: Duration,
    pub smoothed: Duration,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FrameTimeSummary {
    pub frames: u64,
    pub total: StatSummary,
    pub render: StatSummary,
    pub layout: StatSummary,
}

/// Rolling statistics over finished frames.
pub struct FrameTimeInfo {
    frames: Cell<u64>,
    total: Stat,
    render: Stat,
    layout: Stat,
}

impl Default for FrameTimeInfo {
    fn default() -> Self {
        Self {
            frames: Default::default(),
            total: Stat::new(),
            render: Stat::new(),
            layout: Stat::new(),
        }
    }
}

impl FrameTimeInfo {
    /// Folds `frame` into the statistics. `None` logs the statistics
    /// gathered so far and starts over.
    pub fn time(&self, frame: Option<&FrameMetaInfo>) {
        match frame {
            Some(frame) => self.add(frame),
            None => {
                if let Some(summary) = self.summary() {
                    log_summary(&summary);
                }
                self.reset();
            }
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames.get()
    }

    pub fn summary(&self) -> Option<FrameTimeSummary> {
        if self.frames.get() == 0 {
            return None;
        }
        Some(FrameTimeSummary {
            frames: self.frames.get(),
            total: self.total.summary(),
            render: self.render.summary(),
            layout: self.layout.summary(),
        })
    }

    fn add(&self, frame: &FrameMetaInfo) {
        let first = self.frames.get() == 0;
        self.total.add(first, frame.total_drawn_duration());
        self.render.add(first, frame.total_render_duration());
        self.layout.add(first, frame.total_layout_duration());
        self.frames.set(self.frames.get() + 1);
    }

    fn reset(&self) {
        self.frames.set(0);
        self.total.reset();
        self.render.reset();
        self.layout.reset();
    }
}

fn log_summary(s: &FrameTimeSummary) {
    log::info!(
        "FrameTimeSummary{{frames={}, total={:?}/{:?}/{:?}, render={:?}/{:?}/{:?}, layout={:?}/{:?}/{:?}}}",
        s.frames,
        s.total.min,
        s.total.smoothed,
        s.total.max,
        s.render.min,
        s.render.smoothed,
        s.render.max,
        s.layout.min,
        s.layout.smoothed,
        s.layout.max,
    );
}
