use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Shared flag that stops frame scheduling once the GPU context is going away.
///
/// Clones observe the same flag. Only used on the window thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Rc<Cell<bool>>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }
}

/// Decides when the next frame may be issued.
///
/// A frame is requested explicitly, consumed by [`FrameScheduler::begin_frame`]
/// and re-armed by [`FrameScheduler::complete_frame`], so at most one frame is
/// ever in flight. With a target FPS the next frame also waits for its
/// deadline; without one it follows the surface's vsync.
#[derive(Debug)]
pub struct FrameScheduler {
    token: CancellationToken,
    frame_interval: Option<Duration>,
    requested: bool,
    in_flight: bool,
    last_frame: Option<Instant>,
}

impl FrameScheduler {
    /// Creates a scheduler with an optional FPS cap. Non-positive or
    /// non-finite values disable the cap.
    pub fn new(target_fps: Option<f32>, token: CancellationToken) -> Self {
        let frame_interval = target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)));
        Self {
            token,
            frame_interval,
            requested: false,
            in_flight: false,
            last_frame: None,
        }
    }

    pub fn frame_interval(&self) -> Option<Duration> {
        self.frame_interval
    }

    /// Arms the next frame. Has no effect once cancelled.
    pub fn request_frame(&mut self) -> bool {
        if self.token.is_cancelled() {
            self.requested = false;
            return false;
        }
        self.requested = true;
        true
    }

    /// True when a requested frame may be issued at `now`.
    pub fn ready_for_frame(&self, now: Instant) -> bool {
        if self.token.is_cancelled() || !self.requested || self.in_flight {
            return false;
        }
        match self.next_deadline() {
            Some(deadline) => now >= deadline,
            None => true,
        }
    }

    /// Earliest instant the armed frame may run, when an FPS cap applies.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.token.is_cancelled() || !self.requested {
            return None;
        }
        let interval = self.frame_interval?;
        self.last_frame.map(|last| last + interval)
    }

    /// Consumes the armed request. Returns false when no frame should run.
    pub fn begin_frame(&mut self, now: Instant) -> bool {
        if !self.ready_for_frame(now) {
            return false;
        }
        self.requested = false;
        self.in_flight = true;
        true
    }

    /// Marks the in-flight frame as finished and schedules the next one.
    pub fn complete_frame(&mut self, now: Instant) {
        self.in_flight = false;
        self.last_frame = Some(now);
        self.request_frame();
    }

    /// Drops any pending request and refuses all future ones.
    pub fn cancel(&mut self) {
        self.token.cancel();
        self.requested = false;
        self.in_flight = false;
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Rolling frames-per-second counter, sampled once per second.
#[derive(Debug, Clone)]
pub struct FrameStats {
    window_start: Instant,
    frames_in_window: u32,
    frame_count: u64,
    frames_per_second: f32,
}

impl FrameStats {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames_in_window: 0,
            frame_count: 0,
            frames_per_second: 0.0,
        }
    }

    /// Counts one presented frame; returns the new FPS once a second has
    /// elapsed since the last sample.
    pub fn record(&mut self, now: Instant) -> Option<f32> {
        self.frame_count += 1;
        self.frames_in_window += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        self.frames_per_second = self.frames_in_window as f32 / elapsed.as_secs_f32();
        self.frames_in_window = 0;
        self.window_start = now;
        Some(self.frames_per_second)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn frames_per_second(&self) -> f32 {
        self.frames_per_second
    }
}
