use winit::dpi::{LogicalSize, PhysicalSize};

use crate::gpu::{AlphaMode, Backend, SurfaceSettings};
use crate::types::CanvasOptions;

/// Owns canvas sizing and keeps the presentation surface in sync with it.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceManager {
    logical: LogicalSize<u32>,
    pixel_ratio: f64,
    alpha: AlphaMode,
}

impl SurfaceManager {
    pub fn new(options: &CanvasOptions, host_ratio: Option<f64>) -> Self {
        let (width, height) = options.resolve_size();
        Self {
            logical: LogicalSize::new(width, height),
            pixel_ratio: options.resolve_pixel_ratio(host_ratio),
            alpha: if options.premultiplied_alpha {
                AlphaMode::PreMultiplied
            } else {
                AlphaMode::Opaque
            },
        }
    }

    pub fn logical_size(&self) -> LogicalSize<u32> {
        self.logical
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Backing-store dimensions: logical size scaled by the pixel ratio.
    pub fn backing_size(&self) -> PhysicalSize<u32> {
        backing_for(self.logical, self.pixel_ratio)
    }

    pub fn settings(&self) -> SurfaceSettings {
        SurfaceSettings {
            backing: self.backing_size(),
            logical: self.logical,
            alpha: self.alpha,
        }
    }

    /// Applies new dimensions and re-applies format and alpha mode to the surface.
    pub fn configure<B: Backend>(
        &mut self,
        backend: &mut B,
        width: u32,
        height: u32,
        pixel_ratio: f64,
    ) -> SurfaceSettings {
        self.logical = LogicalSize::new(width.max(1), height.max(1));
        if pixel_ratio.is_finite() && pixel_ratio > 0.0 {
            self.pixel_ratio = pixel_ratio;
        }
        let settings = self.settings();
        tracing::debug!(
            width = settings.logical.width,
            height = settings.logical.height,
            backing_width = settings.backing.width,
            backing_height = settings.backing.height,
            pixel_ratio = self.pixel_ratio,
            alpha = ?settings.alpha,
            "configuring canvas surface"
        );
        backend.configure_surface(&settings);
        settings
    }

    /// Resizes to explicit dimensions, else the container's client size, else
    /// the current size. Zero counts as omitted.
    pub fn resize<B: Backend>(
        &mut self,
        backend: &mut B,
        width: Option<u32>,
        height: Option<u32>,
        container: Option<LogicalSize<u32>>,
    ) -> SurfaceSettings {
        let pick = |explicit: Option<u32>, client: Option<u32>, current: u32| {
            explicit
                .filter(|value| *value > 0)
                .or(client.filter(|value| *value > 0))
                .unwrap_or(current)
        };
        let width = pick(width, container.map(|size| size.width), self.logical.width);
        let height = pick(height, container.map(|size| size.height), self.logical.height);
        self.configure(backend, width, height, self.pixel_ratio)
    }
}

fn backing_for(logical: LogicalSize<u32>, pixel_ratio: f64) -> PhysicalSize<u32> {
    let scale = |value: u32| ((f64::from(value) * pixel_ratio).round() as u32).max(1);
    PhysicalSize::new(scale(logical.width), scale(logical.height))
}
