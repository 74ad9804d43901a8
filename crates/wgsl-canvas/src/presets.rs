//! Built-in fragment shaders, handy for smoke-testing a device or as starting
//! points. Each relies on the injected uniform block.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub summary: &'static str,
    pub source: &'static str,
}

pub const SOLID: Preset = Preset {
    name: "solid",
    summary: "constant red",
    source: r"
@fragment
fn main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
  return vec4<f32>(1.0, 0.0, 0.0, 1.0);
}
",
};

pub const GRADIENT: Preset = Preset {
    name: "gradient",
    summary: "uv gradient with a time-cycled blue channel",
    source: r"
@fragment
fn main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
  let color = vec3<f32>(uv.x, uv.y, (uniforms.time * 0.5) % 1.0);
  return vec4<f32>(color, 1.0);
}
",
};

pub const WAVES: Preset = Preset {
    name: "waves",
    summary: "two crossing sine waves",
    source: r"
@fragment
fn main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
  let wave = sin(uv.x * 10.0 + uniforms.time * 2.0) * 0.5 + 0.5;
  let wave2 = sin(uv.y * 10.0 + uniforms.time * 1.5) * 0.5 + 0.5;
  let color = vec3<f32>(wave, wave2, (wave + wave2) * 0.5);
  return vec4<f32>(color, 1.0);
}
",
};

pub const PLASMA: Preset = Preset {
    name: "plasma",
    summary: "aspect-corrected plasma",
    source: r"
@fragment
fn main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
  let x = uv.x * uniforms.resolution.x / uniforms.resolution.y;
  let y = uv.y;

  var color: f32 = 0.0;
  color += sin(x * 6.0 + uniforms.time) * 0.5;
  color += sin(y * 8.0 + uniforms.time * 1.5) * 0.5;
  color += sin((x + y) * 6.0 + uniforms.time * 2.0) * 0.5;
  color += cos(sqrt(x * x + y * y) * 12.0 - uniforms.time * 4.0) * 0.5;

  let r = sin(color * 3.14159) * 0.5 + 0.5;
  let g = sin(color * 3.14159 + 2.094) * 0.5 + 0.5;
  let b = sin(color * 3.14159 + 4.188) * 0.5 + 0.5;
  return vec4<f32>(r, g, b, 1.0);
}
",
};

pub const POINTER: Preset = Preset {
    name: "pointer",
    summary: "soft disc and glow following the pointer",
    source: r"
@fragment
fn main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
  let pointer = uniforms.pointer / uniforms.resolution;
  let dist = distance(uv, pointer);

  let circle = 1.0 - smoothstep(0.18, 0.2, dist);
  let glow = 1.0 / (dist * 10.0 + 1.0);

  let r = circle + glow * 0.5;
  let g = circle * 0.5 + glow * 0.3;
  let b = circle * 0.8 + glow * 0.8;
  return vec4<f32>(r, g, b, 1.0);
}
",
};

pub const PRESETS: &[Preset] = &[SOLID, GRADIENT, WAVES, PLASMA, POINTER];

/// Looks a preset up by name, ignoring ASCII case.
pub fn find(name: &str) -> Option<&'static Preset> {
    PRESETS
        .iter()
        .find(|preset| preset.name.eq_ignore_ascii_case(name.trim()))
}

/// Comma-separated preset names, for error messages and `--help`.
pub fn names() -> String {
    PRESETS
        .iter()
        .map(|preset| preset.name)
        .collect::<Vec<_>>()
        .join(", ")
}
