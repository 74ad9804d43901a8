use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use tracing::{error, info, warn};
use winit::dpi::{LogicalPosition, LogicalSize};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::error::CanvasError;
use crate::gpu::context::WgpuBackend;
use crate::gpu::FrameError;
use crate::runtime::{CanvasHost, FrameHandle};
use crate::session::CanvasSession;
use crate::types::ViewerConfig;

/// Upper bound on how often a watched shader file is polled.
const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("failed to create event loop: {0}")]
    EventLoop(String),
    #[error("failed to create viewer window: {0}")]
    Window(String),
    #[error("failed to read {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error("rendering stopped: {0}")]
    Frame(#[from] FrameError),
}

/// [`CanvasHost`] backed by a winit window.
///
/// A frame request becomes `request_redraw()`; the matching `RedrawRequested`
/// event hands the handle back through [`WinitHost::take_pending`].
pub struct WinitHost {
    window: Arc<Window>,
    next: u64,
    pending: Option<FrameHandle>,
}

impl WinitHost {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next: 0,
            pending: None,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// The callback due on this redraw, if one was requested and not cancelled.
    pub fn take_pending(&mut self) -> Option<FrameHandle> {
        self.pending.take()
    }
}

impl CanvasHost for WinitHost {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle::new(self.next);
        self.pending = Some(handle);
        self.window.request_redraw();
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
        }
    }

    fn container_size(&self) -> Option<LogicalSize<u32>> {
        let size = self.window.inner_size();
        Some(size.to_logical(self.window.scale_factor()))
    }

    fn device_pixel_ratio(&self) -> Option<f64> {
        Some(self.window.scale_factor())
    }
}

/// Debounced modification-time watcher for one file.
#[derive(Debug)]
struct FileWatch {
    path: PathBuf,
    debounce: Duration,
    last_seen: Option<SystemTime>,
    changed_at: Option<Instant>,
}

impl FileWatch {
    fn new(path: &Path, debounce: Duration) -> Self {
        Self {
            path: path.to_path_buf(),
            debounce,
            last_seen: modified(path),
            changed_at: None,
        }
    }

    fn poll(&mut self, now: Instant) -> bool {
        let current = modified(&self.path);
        self.observe(current, now)
    }

    /// True once a change has stayed put for the debounce window.
    fn observe(&mut self, modified: Option<SystemTime>, now: Instant) -> bool {
        if modified != self.last_seen {
            self.last_seen = modified;
            self.changed_at = Some(now);
            return false;
        }
        match self.changed_at {
            Some(changed) if now.saturating_duration_since(changed) >= self.debounce => {
                self.changed_at = None;
                true
            }
            _ => false,
        }
    }

    fn poll_interval(&self) -> Duration {
        self.debounce.min(WATCH_POLL_INTERVAL).max(Duration::from_millis(10))
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

struct Viewer {
    window: Arc<Window>,
    session: CanvasSession<WgpuBackend, WinitHost>,
    config: ViewerConfig,
    watch: Option<FileWatch>,
    failure: Option<ViewerError>,
}

impl Viewer {
    fn read_sources(&self) -> Result<(String, Option<String>), ViewerError> {
        let fragment = self
            .config
            .fragment
            .read()
            .map_err(|source| ViewerError::Source {
                path: PathBuf::from(self.config.fragment.describe()),
                source,
            })?;
        let vertex = match &self.config.vertex {
            Some(path) => Some(std::fs::read_to_string(path).map_err(|source| {
                ViewerError::Source {
                    path: path.clone(),
                    source,
                }
            })?),
            None => None,
        };
        Ok((fragment, vertex))
    }

    /// Recompiles from disk; a failure leaves the current program running.
    fn reload(&mut self, reason: &'static str) {
        let (fragment, vertex) = match self.read_sources() {
            Ok(sources) => sources,
            Err(err) => {
                warn!(error = %err, reason, "shader reload skipped");
                return;
            }
        };
        if pollster::block_on(self.session.load(&fragment, vertex.as_deref())).is_ok() {
            info!(shader = %self.config.fragment.describe(), reason, "shader reloaded");
        }
    }

    fn shutdown(&mut self, elwt: &EventLoopWindowTarget<()>) {
        self.session.destroy();
        elwt.exit();
    }

    fn handle_key(&mut self, event: &KeyEvent, elwt: &EventLoopWindowTarget<()>) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        match &event.logical_key {
            Key::Named(NamedKey::Escape) => self.shutdown(elwt),
            Key::Named(NamedKey::Space) => {
                let state = self.session.toggle();
                info!(?state, "playback toggled");
            }
            Key::Character(value) if value.eq_ignore_ascii_case("r") => self.reload("manual"),
            _ => {}
        }
    }

    fn handle_event(&mut self, event: Event<()>, elwt: &EventLoopWindowTarget<()>) {
        match event {
            Event::WindowEvent { window_id, event } if window_id == self.window.id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => self.shutdown(elwt),
                    WindowEvent::KeyboardInput { event, .. } => self.handle_key(&event, elwt),
                    WindowEvent::CursorMoved { position, .. } => {
                        let client = position.to_logical::<f64>(self.window.scale_factor());
                        self.session
                            .pointer_moved(client, LogicalPosition::new(0.0, 0.0));
                    }
                    WindowEvent::Resized(_) => {
                        if self.config.canvas.auto_resize {
                            self.session.resize(None, None);
                        }
                    }
                    WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                        if self.config.canvas.pixel_ratio.is_none() {
                            self.session.set_pixel_ratio(scale_factor);
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        let Some(handle) = self.session.host_mut().take_pending() else {
                            return;
                        };
                        if let Err(err) = self.session.on_frame(handle) {
                            error!(error = %err, "fatal surface error; closing viewer");
                            self.failure = Some(err.into());
                            self.shutdown(elwt);
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                let Some(watch) = self.watch.as_mut() else {
                    elwt.set_control_flow(ControlFlow::Wait);
                    return;
                };
                let now = Instant::now();
                let interval = watch.poll_interval();
                if watch.poll(now) {
                    self.reload("file changed");
                }
                elwt.set_control_flow(ControlFlow::WaitUntil(now + interval));
            }
            _ => {}
        }
    }
}

/// Window sized to the canvas. Without auto-resize the window is locked to
/// that size so the surface extent never drifts from the window.
fn window_builder(config: &ViewerConfig) -> WindowBuilder {
    let (width, height) = config.canvas.resolve_size();
    let logical = LogicalSize::new(width, height);
    let builder = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(logical);
    if config.canvas.auto_resize {
        builder
    } else {
        builder
            .with_resizable(false)
            .with_min_inner_size(logical)
            .with_max_inner_size(logical)
    }
}

/// Opens a window, renders the configured shader and blocks until it closes.
pub fn run_viewer(config: ViewerConfig) -> Result<(), ViewerError> {
    let event_loop = EventLoop::new().map_err(|err| ViewerError::EventLoop(err.to_string()))?;

    let window = window_builder(&config)
        .build(&event_loop)
        .map_err(|err| ViewerError::Window(err.to_string()))?;
    let window = Arc::new(window);

    let backend = pollster::block_on(WgpuBackend::new(
        window.clone(),
        window.inner_size(),
        &config.canvas,
    ))?;
    let host = WinitHost::new(window.clone());
    let session = CanvasSession::new(backend, host, config.canvas.clone())?;

    let watch = match (config.watch, config.fragment.path()) {
        (true, Some(path)) => Some(FileWatch::new(path, config.reload_debounce)),
        (true, None) => {
            warn!("watch requested for a built-in preset; nothing to watch");
            None
        }
        _ => None,
    };

    let mut viewer = Viewer {
        window,
        session,
        config,
        watch,
        failure: None,
    };

    let (fragment, vertex) = viewer.read_sources()?;
    if let Err(err) = pollster::block_on(viewer.session.load(&fragment, vertex.as_deref())) {
        if !err.is_recoverable() {
            return Err(err.into());
        }
        warn!("starting without a shader program; fix the source and reload");
    }
    if viewer.config.autoplay {
        viewer.session.play();
    }
    info!(
        shader = %viewer.config.fragment.describe(),
        watch = viewer.watch.is_some(),
        "viewer running (space: play/pause, r: reload, esc: quit)"
    );

    let handler = &mut viewer;
    event_loop
        .run(move |event, elwt| handler.handle_event(event, elwt))
        .map_err(|err| ViewerError::EventLoop(err.to_string()))?;

    viewer.session.destroy();
    match viewer.failure.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
