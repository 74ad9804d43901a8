use std::borrow::Cow;
use std::future::Future;
use std::num::NonZeroU64;
use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use crate::compile::{ENTRY_POINT, UNIFORM_BINDING};
use crate::error::{CanvasError, CompilationMessage, MessageKind, ResourceError, ShaderStage};
use crate::types::{CanvasOptions, PowerPreference};

use super::pipeline::QUAD_VERTEX_STRIDE;
use super::uniforms::UNIFORM_BLOCK_SIZE;
use super::{AlphaMode, Backend, BufferKind, CompileOutcome, FrameError, SurfaceSettings};

/// [`Backend`] over a `wgpu` device presenting to a window surface.
pub struct WgpuBackend {
    _instance: wgpu::Instance,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    surface_caps: wgpu::SurfaceCapabilities,
    device_released: bool,
}

impl WgpuBackend {
    /// Acquires an adapter and device able to present to `target`.
    ///
    /// The surface is configured at `size` with an opaque alpha mode; the
    /// session re-applies its own settings right after construction.
    pub async fn new<T>(
        target: Arc<T>,
        size: PhysicalSize<u32>,
        options: &CanvasOptions,
    ) -> Result<Self, CanvasError>
    where
        T: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        if instance.enumerate_adapters(wgpu::Backends::all()).is_empty() {
            return Err(CanvasError::UnsupportedPlatform(
                "no graphics adapters are available on this system".into(),
            ));
        }

        let surface = instance.create_surface(target).map_err(|err| {
            CanvasError::UnsupportedPlatform(format!("failed to create rendering surface: {err}"))
        })?;

        let power_preference = match options.power_preference {
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| {
                CanvasError::DeviceAcquisition(format!("failed to find a suitable GPU adapter: {err}"))
            })?;

        let info = adapter.get_info();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            ?power_preference,
            "selected GPU adapter"
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("wgsl-canvas device"),
                required_features: wgpu::Features::empty(),
                required_limits: adapter.limits(),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
                trace: wgpu::Trace::default(),
            })
            .await
            .map_err(|err| {
                CanvasError::DeviceAcquisition(format!("failed to create GPU device: {err}"))
            })?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| {
                CanvasError::UnsupportedPlatform(
                    "the selected adapter cannot present to this surface".into(),
                )
            })?;
        let present_mode = if surface_caps
            .present_modes
            .contains(&wgpu::PresentMode::Fifo)
        {
            wgpu::PresentMode::Fifo
        } else {
            surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::AutoVsync)
        };
        tracing::debug!(?format, ?present_mode, "using surface format");

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode: choose_alpha_mode(&surface_caps, AlphaMode::Opaque),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            _instance: instance,
            surface,
            device,
            queue,
            config,
            surface_caps,
            device_released: false,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Runs `create` inside a validation error scope.
    fn scoped<R>(
        &self,
        resource: &'static str,
        create: impl FnOnce(&wgpu::Device) -> R,
    ) -> Result<R, ResourceError> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let created = create(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            None => Ok(created),
            Some(err) => Err(ResourceError::new(resource, err.to_string())),
        }
    }

    fn handle_surface_error(&mut self, err: wgpu::SurfaceError) -> FrameError {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                self.surface.configure(&self.device, &self.config);
                FrameError::Skipped(format!("surface {err}; reconfigured"))
            }
            wgpu::SurfaceError::OutOfMemory => FrameError::OutOfMemory,
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => {
                FrameError::Skipped(err.to_string())
            }
        }
    }
}

impl Backend for WgpuBackend {
    type ShaderModule = wgpu::ShaderModule;
    type BindGroupLayout = wgpu::BindGroupLayout;
    type RenderPipeline = wgpu::RenderPipeline;
    type Buffer = wgpu::Buffer;
    type BindGroup = wgpu::BindGroup;

    fn compile_module(
        &self,
        stage: ShaderStage,
        source: &str,
    ) -> impl Future<Output = CompileOutcome<wgpu::ShaderModule>> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(match stage {
                    ShaderStage::Vertex => "canvas vertex stage",
                    ShaderStage::Fragment => "canvas fragment stage",
                }),
                source: wgpu::ShaderSource::Wgsl(Cow::Owned(source.to_owned())),
            });
        let scope = self.device.pop_error_scope();

        async move {
            let info = module.get_compilation_info().await;
            let mut messages: Vec<CompilationMessage> =
                info.messages.iter().map(convert_message).collect();
            if let Some(err) = scope.await {
                if !messages.iter().any(CompilationMessage::is_error) {
                    messages.push(CompilationMessage::new(MessageKind::Error, err.to_string()));
                }
            }
            if messages.iter().any(CompilationMessage::is_error) {
                CompileOutcome::failed(messages)
            } else {
                CompileOutcome::ok(module, messages)
            }
        }
    }

    fn create_uniform_layout(&self) -> Result<wgpu::BindGroupLayout, ResourceError> {
        self.scoped("bind group layout", |device| {
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("canvas uniforms layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: UNIFORM_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: NonZeroU64::new(UNIFORM_BLOCK_SIZE as u64),
                    },
                    count: None,
                }],
            })
        })
    }

    fn create_render_pipeline(
        &self,
        layout: &wgpu::BindGroupLayout,
        vertex: &wgpu::ShaderModule,
        fragment: &wgpu::ShaderModule,
    ) -> Result<wgpu::RenderPipeline, ResourceError> {
        let format = self.config.format;
        self.scoped("render pipeline", |device| {
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("canvas pipeline layout"),
                bind_group_layouts: &[layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("canvas pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: vertex,
                    entry_point: Some(ENTRY_POINT),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: QUAD_VERTEX_STRIDE,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            format: wgpu::VertexFormat::Float32x2,
                            offset: 0,
                            shader_location: 0,
                        }],
                    }],
                },
                fragment: Some(wgpu::FragmentState {
                    module: fragment,
                    entry_point: Some(ENTRY_POINT),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    ..wgpu::PrimitiveState::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
    }

    fn create_buffer(&self, kind: BufferKind, size: u64) -> Result<wgpu::Buffer, ResourceError> {
        let (label, usage) = match kind {
            BufferKind::Vertex => (
                "canvas quad vertices",
                wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            ),
            BufferKind::Uniform => (
                "canvas uniforms",
                wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            ),
        };
        self.scoped("buffer", |device| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            })
        })
    }

    fn create_uniform_bind_group(
        &self,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
    ) -> Result<wgpu::BindGroup, ResourceError> {
        self.scoped("bind group", |device| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("canvas uniforms"),
                layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: UNIFORM_BINDING,
                    resource: buffer.as_entire_binding(),
                }],
            })
        })
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, data: &[u8]) {
        self.queue.write_buffer(buffer, 0, data);
    }

    fn configure_surface(&mut self, settings: &SurfaceSettings) {
        let max = self.device.limits().max_texture_dimension_2d;
        let width = settings.backing.width.clamp(1, max);
        let height = settings.backing.height.clamp(1, max);
        if width != settings.backing.width || height != settings.backing.height {
            tracing::warn!(
                requested_width = settings.backing.width,
                requested_height = settings.backing.height,
                max,
                "backing store exceeds the GPU texture limit; clamping"
            );
        }
        self.config.width = width;
        self.config.height = height;
        self.config.alpha_mode = choose_alpha_mode(&self.surface_caps, settings.alpha);
        self.surface.configure(&self.device, &self.config);
    }

    fn draw(
        &mut self,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
        vertices: &wgpu::Buffer,
        vertex_count: u32,
    ) -> Result<(), FrameError> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(err) => return Err(self.handle_surface_error(err)),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("canvas frame"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("canvas pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.set_vertex_buffer(0, vertices.slice(..));
            pass.draw(0..vertex_count, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        tracing::trace!(
            width = self.config.width,
            height = self.config.height,
            "presented frame"
        );
        Ok(())
    }

    fn release_buffer(&self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }

    fn release_device(&mut self) {
        if self.device_released {
            return;
        }
        self.device.destroy();
        self.device_released = true;
        tracing::debug!("released GPU device");
    }
}

/// Pre-multiplied when asked for and supported, else opaque, else whatever
/// the surface offers first.
fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: AlphaMode,
) -> wgpu::CompositeAlphaMode {
    let wanted = match requested {
        AlphaMode::PreMultiplied => wgpu::CompositeAlphaMode::PreMultiplied,
        AlphaMode::Opaque => wgpu::CompositeAlphaMode::Opaque,
    };
    [wanted, wgpu::CompositeAlphaMode::Opaque]
        .into_iter()
        .find(|mode| caps.alpha_modes.contains(mode))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

fn convert_message(message: &wgpu::CompilationMessage) -> CompilationMessage {
    let kind = match message.message_type {
        wgpu::CompilationMessageType::Error => MessageKind::Error,
        wgpu::CompilationMessageType::Warning => MessageKind::Warning,
        wgpu::CompilationMessageType::Info => MessageKind::Info,
    };
    let converted = CompilationMessage::new(kind, message.message.clone());
    match &message.location {
        Some(location) => converted.at(location.line_number, location.line_position),
        None => converted,
    }
}
