use tracing::{debug, warn};

use crate::compile::{prepare_fragment, resolve_vertex};
use crate::error::{CanvasError, CompilationMessage, ShaderCompileError, ShaderStage};

use super::uniforms::UNIFORM_BLOCK_SIZE;
use super::{Backend, BufferKind};

/// Byte stride of one quad vertex (`vec2<f32>` position).
pub const QUAD_VERTEX_STRIDE: u64 = 8;
/// Vertices per full-screen triangle strip.
pub const QUAD_VERTEX_COUNT: u32 = 4;
/// Unit quad in clip space, strip order.
pub const QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

/// The exact text compiled for each stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPair {
    pub vertex: String,
    pub fragment: String,
}

/// A linked pipeline plus the uniform buffer and bind group it renders with.
///
/// Nothing is shared between programs, so two builds of the same source can be
/// released independently.
pub struct Program<B: Backend> {
    pub(crate) pipeline: B::RenderPipeline,
    pub(crate) bind_group: B::BindGroup,
    pub(crate) uniform_buffer: B::Buffer,
    _layout: B::BindGroupLayout,
    sources: ShaderPair,
    diagnostics: Vec<CompilationMessage>,
}

impl<B: Backend> Program<B> {
    pub fn sources(&self) -> &ShaderPair {
        &self.sources
    }

    /// Non-fatal compiler output collected while building.
    pub fn diagnostics(&self) -> &[CompilationMessage] {
        &self.diagnostics
    }

    pub(crate) fn release(self, backend: &B) {
        backend.release_buffer(self.uniform_buffer);
    }
}

/// Compiles fragment sources into [`Program`]s against one backend.
pub struct PipelineBuilder<'a, B: Backend> {
    backend: &'a B,
}

impl<'a, B: Backend> PipelineBuilder<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Builds a fresh program. Nothing outside the returned value is touched,
    /// so a failure leaves whatever program the caller already holds intact.
    pub async fn build(
        &self,
        fragment: &str,
        vertex: Option<&str>,
    ) -> Result<Program<B>, CanvasError> {
        let vertex_source = resolve_vertex(vertex).to_owned();
        let fragment_source = prepare_fragment(fragment).into_owned();

        let vertex_outcome = self
            .backend
            .compile_module(ShaderStage::Vertex, &vertex_source)
            .await;
        let fragment_outcome = self
            .backend
            .compile_module(ShaderStage::Fragment, &fragment_source)
            .await;

        let (vertex_module, mut diagnostics) = accept_stage(ShaderStage::Vertex, vertex_outcome)?;
        let (fragment_module, fragment_messages) =
            accept_stage(ShaderStage::Fragment, fragment_outcome)?;
        diagnostics.extend(fragment_messages);

        let layout = self.backend.create_uniform_layout()?;
        let pipeline =
            self.backend
                .create_render_pipeline(&layout, &vertex_module, &fragment_module)?;

        let uniform_buffer = self
            .backend
            .create_buffer(BufferKind::Uniform, UNIFORM_BLOCK_SIZE as u64)?;
        let bind_group = match self
            .backend
            .create_uniform_bind_group(&layout, &uniform_buffer)
        {
            Ok(group) => group,
            Err(err) => {
                self.backend.release_buffer(uniform_buffer);
                return Err(err.into());
            }
        };

        debug!(
            warnings = diagnostics.len(),
            fragment_bytes = fragment_source.len(),
            "built shader program"
        );

        Ok(Program {
            pipeline,
            bind_group,
            uniform_buffer,
            _layout: layout,
            sources: ShaderPair {
                vertex: vertex_source,
                fragment: fragment_source,
            },
            diagnostics,
        })
    }
}

fn accept_stage<M>(
    stage: ShaderStage,
    outcome: super::CompileOutcome<M>,
) -> Result<(M, Vec<CompilationMessage>), ShaderCompileError> {
    match outcome.module {
        Some(module) => {
            for message in &outcome.messages {
                warn!(stage = %stage, "{message}");
            }
            Ok((module, outcome.messages))
        }
        None => Err(ShaderCompileError {
            stage,
            messages: outcome.messages,
        }),
    }
}
