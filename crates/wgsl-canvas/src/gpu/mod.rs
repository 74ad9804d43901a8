//! GPU capability seam for the canvas runtime.
//!
//! The session never talks to `wgpu` directly. It drives a [`Backend`], which
//! owns the device, queue and presentation surface and hands back opaque
//! resource handles:
//! - `uniforms` defines the 32-byte block written once per frame.
//! - `pipeline` turns fragment text into a [`Program`](pipeline::Program):
//!   both stages compiled, one uniform binding, one triangle-strip pipeline.
//! - `context` is the `wgpu` implementation used by the viewer window.
//!
//! Resource release is explicit. A program's buffers go back through
//! [`Backend::release_buffer`] when it is replaced, and the device is only
//! released after every buffer it created.

use std::future::Future;

use winit::dpi::{LogicalSize, PhysicalSize};

use crate::error::{CompilationMessage, ResourceError, ShaderStage};

pub mod context;
pub mod pipeline;
pub mod uniforms;

/// Result of compiling one shader stage.
///
/// `module` is `None` when the stage is unusable; `messages` holds every
/// diagnostic the compiler produced, fatal or not.
pub struct CompileOutcome<M> {
    pub module: Option<M>,
    pub messages: Vec<CompilationMessage>,
}

impl<M> CompileOutcome<M> {
    pub fn ok(module: M, messages: Vec<CompilationMessage>) -> Self {
        Self {
            module: Some(module),
            messages,
        }
    }

    pub fn failed(messages: Vec<CompilationMessage>) -> Self {
        Self {
            module: None,
            messages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaMode {
    PreMultiplied,
    Opaque,
}

/// Presentation parameters re-applied on every configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSettings {
    /// Backing-store size in device pixels.
    pub backing: PhysicalSize<u32>,
    /// Presentation-facing size.
    pub logical: LogicalSize<u32>,
    pub alpha: AlphaMode,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// Transient surface trouble; the next frame may succeed.
    #[error("frame skipped: {0}")]
    Skipped(String),
    #[error("surface out of memory")]
    OutOfMemory,
}

/// Host graphics services orchestrated by the canvas session.
pub trait Backend {
    type ShaderModule;
    type BindGroupLayout;
    type RenderPipeline;
    type Buffer;
    type BindGroup;

    /// Compiles WGSL for one stage, collecting diagnostics instead of failing fast.
    fn compile_module(
        &self,
        stage: ShaderStage,
        source: &str,
    ) -> impl Future<Output = CompileOutcome<Self::ShaderModule>>;

    /// Layout with a single uniform buffer at binding 0, visible to the fragment stage.
    fn create_uniform_layout(&self) -> Result<Self::BindGroupLayout, ResourceError>;

    /// Links both stages into the full-screen-quad pipeline.
    fn create_render_pipeline(
        &self,
        layout: &Self::BindGroupLayout,
        vertex: &Self::ShaderModule,
        fragment: &Self::ShaderModule,
    ) -> Result<Self::RenderPipeline, ResourceError>;

    fn create_buffer(&self, kind: BufferKind, size: u64) -> Result<Self::Buffer, ResourceError>;

    fn create_uniform_bind_group(
        &self,
        layout: &Self::BindGroupLayout,
        buffer: &Self::Buffer,
    ) -> Result<Self::BindGroup, ResourceError>;

    fn write_buffer(&self, buffer: &Self::Buffer, data: &[u8]);

    fn configure_surface(&mut self, settings: &SurfaceSettings);

    /// Clears the next surface texture, draws `vertex_count` strip vertices and presents.
    fn draw(
        &mut self,
        pipeline: &Self::RenderPipeline,
        bind_group: &Self::BindGroup,
        vertices: &Self::Buffer,
        vertex_count: u32,
    ) -> Result<(), FrameError>;

    fn release_buffer(&self, buffer: Self::Buffer);

    /// Releases the device. Called once, after every buffer has been released.
    fn release_device(&mut self);
}
