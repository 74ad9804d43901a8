use std::time::{Duration, Instant};

use winit::dpi::LogicalSize;

/// Identifier of one scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(u64);

impl FrameHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Services the embedding environment provides to a canvas session.
///
/// Frame requests behave like animation-frame callbacks: each request fires
/// at most once, on the next display refresh, unless cancelled first.
pub trait CanvasHost {
    /// Monotonic clock used for frame timestamps.
    fn now(&self) -> Instant;

    fn request_frame(&mut self) -> FrameHandle;

    fn cancel_frame(&mut self, handle: FrameHandle);

    /// Client size of the element hosting the canvas, used when a resize
    /// omits explicit dimensions.
    fn container_size(&self) -> Option<LogicalSize<u32>> {
        None
    }

    fn device_pixel_ratio(&self) -> Option<f64> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Running {
        /// `None` while the fired callback is executing.
        pending: Option<FrameHandle>,
        resumed_at: Instant,
        resumed_from: Duration,
    },
}

/// Idle/Running state machine behind play, pause and the per-frame callback.
///
/// Elapsed time only advances while running and is frozen at the value of the
/// last frame when paused.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    phase: Phase,
    elapsed: Duration,
    frames: u64,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            elapsed: Duration::ZERO,
            frames: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        match self.phase {
            Phase::Idle => SchedulerState::Idle,
            Phase::Running { .. } => SchedulerState::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    /// Elapsed time computed by the most recent frame.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Frames rendered since construction.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// The scheduled callback, if one is waiting to fire.
    pub fn pending(&self) -> Option<FrameHandle> {
        match self.phase {
            Phase::Running { pending, .. } => pending,
            Phase::Idle => None,
        }
    }

    /// Idle -> Running. Returns `false` when already running.
    pub fn play<H: CanvasHost + ?Sized>(&mut self, host: &mut H) -> bool {
        if self.is_running() {
            return false;
        }
        let handle = host.request_frame();
        self.phase = Phase::Running {
            pending: Some(handle),
            resumed_at: host.now(),
            resumed_from: self.elapsed,
        };
        tracing::trace!(handle = handle.raw(), elapsed = ?self.elapsed, "frame loop started");
        true
    }

    /// Running -> Idle. Returns `false` when already idle.
    pub fn pause<H: CanvasHost + ?Sized>(&mut self, host: &mut H) -> bool {
        let Phase::Running { pending, .. } = self.phase else {
            return false;
        };
        if let Some(handle) = pending {
            host.cancel_frame(handle);
        }
        self.phase = Phase::Idle;
        tracing::trace!(elapsed = ?self.elapsed, "frame loop paused");
        true
    }

    pub fn toggle<H: CanvasHost + ?Sized>(&mut self, host: &mut H) -> SchedulerState {
        if self.is_running() {
            self.pause(host);
        } else {
            self.play(host);
        }
        self.state()
    }

    /// Accepts a fired callback and returns the elapsed seconds to render with.
    ///
    /// Callbacks that are not the currently scheduled one are ignored.
    pub fn begin_frame(&mut self, handle: FrameHandle, timestamp: Instant) -> Option<f32> {
        match &mut self.phase {
            Phase::Running {
                pending,
                resumed_at,
                resumed_from,
            } if *pending == Some(handle) => {
                *pending = None;
                self.elapsed = *resumed_from + timestamp.saturating_duration_since(*resumed_at);
                self.frames = self.frames.saturating_add(1);
                Some(self.elapsed.as_secs_f32())
            }
            _ => {
                tracing::trace!(handle = handle.raw(), "ignoring stale frame callback");
                None
            }
        }
    }

    /// Re-arms the loop after a frame, but only if nothing paused it meanwhile.
    pub fn end_frame<H: CanvasHost + ?Sized>(&mut self, host: &mut H) -> bool {
        match &mut self.phase {
            Phase::Running { pending, .. } if pending.is_none() => {
                *pending = Some(host.request_frame());
                true
            }
            _ => false,
        }
    }
}
