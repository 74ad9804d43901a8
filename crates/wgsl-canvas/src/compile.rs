use std::borrow::Cow;

/// Token whose presence means the fragment declares its own uniform block.
pub const UNIFORM_BLOCK_MARKER: &str = "struct Uniforms";

/// Binding slot of the uniform buffer inside bind group 0.
pub const UNIFORM_BINDING: u32 = 0;

/// Entry point both default stages (and caller shaders) must export.
pub const ENTRY_POINT: &str = "main";

/// Uniform declaration prepended to fragments that do not bring their own.
///
/// Field order and padding must match [`FrameUniforms`](crate::gpu::uniforms::FrameUniforms):
/// the `_padding` float keeps `resolution` on an 8-byte boundary.
pub const DEFAULT_UNIFORMS: &str = r"struct Uniforms {
  time: f32,
  _padding: f32,
  resolution: vec2<f32>,
  pointer: vec2<f32>,
};

@group(0) @binding(0) var<uniform> uniforms: Uniforms;
";

/// Full-screen quad vertex stage.
///
/// Maps clip-space positions to uv in [0,1]x[0,1] with the origin at the top-left.
pub const DEFAULT_VERTEX_SHADER: &str = r"struct VertexOutput {
  @builtin(position) position: vec4<f32>,
  @location(0) uv: vec2<f32>,
};

@vertex
fn main(@location(0) position: vec2<f32>) -> VertexOutput {
  var output: VertexOutput;
  output.position = vec4<f32>(position, 0.0, 1.0);
  output.uv = (position + 1.0) * 0.5;
  output.uv.y = 1.0 - output.uv.y;
  return output;
}
";

/// Whether `source` already carries a uniform block declaration.
///
/// Only the marker is checked; a custom block with a different layout is accepted as-is.
pub fn declares_uniforms(source: &str) -> bool {
    source.contains(UNIFORM_BLOCK_MARKER)
}

/// Produces the fragment text handed to the compiler.
///
/// Sources without [`UNIFORM_BLOCK_MARKER`] get [`DEFAULT_UNIFORMS`] prepended;
/// everything else passes through untouched.
pub fn prepare_fragment(source: &str) -> Cow<'_, str> {
    if declares_uniforms(source) {
        Cow::Borrowed(source)
    } else {
        Cow::Owned(format!("{DEFAULT_UNIFORMS}\n{source}"))
    }
}

/// Picks the caller's vertex stage or the built-in quad stage.
pub fn resolve_vertex(source: Option<&str>) -> &str {
    match source {
        Some(code) if !code.trim().is_empty() => code,
        _ => DEFAULT_VERTEX_SHADER,
    }
}
