use std::time::Duration;

use tracing::{debug, info, trace, warn};
use winit::dpi::{LogicalPosition, PhysicalPosition};

use crate::error::CanvasError;
use crate::gpu::pipeline::{PipelineBuilder, Program, QUAD_VERTEX_COUNT, QUAD_VERTICES};
use crate::gpu::{uniforms, Backend, BufferKind, FrameError};
use crate::input::InputTracker;
use crate::runtime::{CanvasHost, FrameHandle, FrameScheduler, SchedulerState};
use crate::surface::SurfaceManager;
use crate::types::CanvasOptions;

/// What a fired frame callback ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// One draw was issued and presented.
    Drawn,
    /// No program is installed yet; the loop stays armed.
    NoProgram,
    /// The surface refused the frame; the loop stays armed.
    Skipped,
    /// The callback was not the scheduled one.
    Ignored,
}

/// One on-screen canvas: a surface, at most one current program, and the
/// frame loop that feeds it uniforms.
pub struct CanvasSession<B: Backend, H: CanvasHost> {
    backend: B,
    host: H,
    options: CanvasOptions,
    surface: SurfaceManager,
    input: InputTracker,
    scheduler: FrameScheduler,
    vertex_buffer: Option<B::Buffer>,
    current: Option<Program<B>>,
    destroyed: bool,
}

impl<B: Backend, H: CanvasHost> CanvasSession<B, H> {
    /// Configures the surface and uploads the quad. Does not start the loop.
    pub fn new(mut backend: B, host: H, options: CanvasOptions) -> Result<Self, CanvasError> {
        let mut surface = SurfaceManager::new(&options, host.device_pixel_ratio());
        let logical = surface.logical_size();
        let ratio = surface.pixel_ratio();
        surface.configure(&mut backend, logical.width, logical.height, ratio);

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&QUAD_VERTICES);
        let vertex_buffer = backend.create_buffer(BufferKind::Vertex, vertex_bytes.len() as u64)?;
        backend.write_buffer(&vertex_buffer, vertex_bytes);

        if options.preserve_drawing_buffer {
            debug!("preserve-drawing-buffer requested; frames are still cleared before drawing");
        }

        Ok(Self {
            backend,
            host,
            options,
            surface,
            input: InputTracker::default(),
            scheduler: FrameScheduler::new(),
            vertex_buffer: Some(vertex_buffer),
            current: None,
            destroyed: false,
        })
    }

    /// Compiles `fragment` (and optionally `vertex`) and makes it current.
    ///
    /// On failure the previously installed program stays current.
    pub async fn load(&mut self, fragment: &str, vertex: Option<&str>) -> Result<(), CanvasError> {
        if self.destroyed {
            return Err(CanvasError::Destroyed);
        }
        let built = PipelineBuilder::new(&self.backend)
            .build(fragment, vertex)
            .await;
        match built {
            Ok(program) => {
                let warnings = program.diagnostics().len();
                self.install(program);
                info!(warnings, "shader program loaded");
                Ok(())
            }
            Err(err) => {
                warn!(
                    error = %err,
                    keeping_previous = self.current.is_some(),
                    "shader program rejected"
                );
                Err(err)
            }
        }
    }

    /// Swaps in a fully built program and releases the one it replaces.
    ///
    /// The next frame callback renders with `program`.
    pub fn install(&mut self, program: Program<B>) {
        if self.destroyed {
            program.release(&self.backend);
            return;
        }
        if let Some(previous) = self.current.replace(program) {
            previous.release(&self.backend);
            debug!("released previous shader program");
        }
    }

    pub fn play(&mut self) -> bool {
        if self.destroyed {
            warn!("play() ignored on a destroyed canvas session");
            return false;
        }
        self.scheduler.play(&mut self.host)
    }

    pub fn pause(&mut self) -> bool {
        self.scheduler.pause(&mut self.host)
    }

    pub fn toggle(&mut self) -> SchedulerState {
        if self.destroyed {
            return self.scheduler.state();
        }
        self.scheduler.toggle(&mut self.host)
    }

    /// Resizes to the given logical size, falling back to the host container.
    pub fn resize(&mut self, width: Option<u32>, height: Option<u32>) {
        if self.destroyed {
            return;
        }
        let container = self.host.container_size();
        self.surface
            .resize(&mut self.backend, width, height, container);
    }

    /// Reconfigures for a new device pixel ratio, keeping the logical size.
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f64) {
        if self.destroyed {
            return;
        }
        let logical = self.surface.logical_size();
        self.surface
            .configure(&mut self.backend, logical.width, logical.height, pixel_ratio);
    }

    /// Feeds a pointer move; visible to the next frame that starts.
    pub fn pointer_moved(
        &mut self,
        client: LogicalPosition<f64>,
        canvas_origin: LogicalPosition<f64>,
    ) {
        let ratio = self.surface.pixel_ratio();
        self.input.pointer_moved(client, canvas_origin, ratio);
    }

    /// The frame callback: refresh uniforms, draw once, re-arm while running.
    ///
    /// A missing program or a transient surface error skips the draw without
    /// stopping the loop.
    pub fn on_frame(&mut self, handle: FrameHandle) -> Result<FrameStatus, FrameError> {
        let timestamp = self.host.now();
        let Some(elapsed) = self.scheduler.begin_frame(handle, timestamp) else {
            return Ok(FrameStatus::Ignored);
        };

        let status = match (self.current.as_ref(), self.vertex_buffer.as_ref()) {
            (Some(program), Some(vertices)) => {
                let bytes = uniforms::write(
                    elapsed,
                    self.surface.backing_size(),
                    self.input.pointer(),
                );
                self.backend.write_buffer(&program.uniform_buffer, &bytes);
                match self.backend.draw(
                    &program.pipeline,
                    &program.bind_group,
                    vertices,
                    QUAD_VERTEX_COUNT,
                ) {
                    Ok(()) => Ok(FrameStatus::Drawn),
                    Err(FrameError::Skipped(reason)) => {
                        warn!(%reason, "frame skipped");
                        Ok(FrameStatus::Skipped)
                    }
                    Err(err) => Err(err),
                }
            }
            _ => {
                trace!("no shader program installed; skipping draw");
                Ok(FrameStatus::NoProgram)
            }
        };

        self.scheduler.end_frame(&mut self.host);
        status
    }

    /// Stops the loop, then releases buffers, then the device. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.scheduler.pause(&mut self.host);
        if let Some(program) = self.current.take() {
            program.release(&self.backend);
        }
        if let Some(buffer) = self.vertex_buffer.take() {
            self.backend.release_buffer(buffer);
        }
        self.backend.release_device();
        self.destroyed = true;
        info!("canvas session destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_running(&self) -> bool {
        self.scheduler.is_running()
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn elapsed(&self) -> Duration {
        self.scheduler.elapsed()
    }

    pub fn pointer(&self) -> PhysicalPosition<f32> {
        self.input.pointer()
    }

    pub fn surface(&self) -> &SurfaceManager {
        &self.surface
    }

    pub fn options(&self) -> &CanvasOptions {
        &self.options
    }

    pub fn current_program(&self) -> Option<&Program<B>> {
        self.current.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<B: Backend, H: CanvasHost> Drop for CanvasSession<B, H> {
    fn drop(&mut self) {
        self.destroy();
    }
}
