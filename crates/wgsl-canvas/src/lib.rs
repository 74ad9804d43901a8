//! WGSL fragment-shader canvas runtime.
//!
//! A [`CanvasSession`] owns one presentation surface, at most one compiled
//! shader program and an animation loop that feeds the program a small
//! uniform block every frame. The overall flow is:
//!
//! ```text
//!   load(fragment) ──▶ PipelineBuilder ──▶ Program ──▶ install (swap on success)
//!                                                        │
//!   play() ──▶ FrameScheduler ──▶ CanvasHost::request_frame
//!                   ▲                                    │
//!                   └── end_frame ◀── on_frame() ◀───────┘
//!                                        │
//!                                        └─▶ uniforms (time, resolution, pointer) ─▶ draw quad
//! ```
//!
//! GPU work goes through the [`gpu::Backend`] trait and host services (frame
//! callbacks, clock, container size, pixel ratio) through
//! [`runtime::CanvasHost`], so everything above the `wgpu` calls runs
//! headless. [`gpu::context::WgpuBackend`] and [`window::WinitHost`] are the
//! real implementations; [`window::run_viewer`] wires them into an
//! interactive window with hot reload.
//!
//! Fragment shaders export `fn main` and read `uniforms.time`,
//! `uniforms.resolution` and `uniforms.pointer`. Sources that do not declare
//! `struct Uniforms` get the default block prepended before compilation.

pub mod compile;
pub mod error;
pub mod gpu;
pub mod input;
pub mod presets;
pub mod runtime;
pub mod session;
pub mod surface;
pub mod types;
pub mod window;

#[cfg(test)]
mod testing;

pub use error::{
    CanvasError, CompilationMessage, ConfigError, MessageKind, ResourceError,
    ShaderCompileError, ShaderStage,
};
pub use gpu::pipeline::{PipelineBuilder, Program};
pub use runtime::{CanvasHost, FrameHandle, FrameScheduler, SchedulerState};
pub use session::{CanvasSession, FrameStatus};
pub use types::{CanvasOptions, FragmentSource, PowerPreference, ViewerConfig};
pub use window::{run_viewer, ViewerError};
