//! Headless doubles for the GPU and host seams.

use std::cell::{Cell, RefCell};
use std::future::{ready, Future};
use std::time::{Duration, Instant};

use winit::dpi::LogicalSize;

use crate::error::{CompilationMessage, MessageKind, ResourceError, ShaderStage};
use crate::gpu::{Backend, BufferKind, CompileOutcome, FrameError, SurfaceSettings};
use crate::runtime::{CanvasHost, FrameHandle};

/// Any stage containing this text fails to compile.
pub(crate) const BROKEN_SHADER: &str = "@@ syntax error @@";
const WARNING_MARKER: &str = "// warn:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct MockHandle(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DrawRecord {
    pub pipeline: MockHandle,
    pub bind_group: MockHandle,
    pub vertices: MockHandle,
    pub vertex_count: u32,
    /// Last bytes written to the buffer behind `bind_group`.
    pub uniforms: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Teardown {
    Buffer(MockHandle),
    Device,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct BackendLog {
    pub compiled: Vec<ShaderStage>,
    pub pipelines_created: usize,
    pub uniform_buffers_created: usize,
    pub vertex_buffers_created: usize,
    pub configured: Vec<SurfaceSettings>,
    pub draws: Vec<DrawRecord>,
    pub released_buffers: Vec<MockHandle>,
    pub teardown: Vec<Teardown>,
    /// Set when a released buffer or device is used again.
    pub used_after_release: bool,
}

#[derive(Default)]
pub(crate) struct RecordingBackend {
    next_id: Cell<u64>,
    log: RefCell<BackendLog>,
    contents: RefCell<Vec<(MockHandle, Vec<u8>)>>,
    bind_groups: RefCell<Vec<(MockHandle, MockHandle)>>,
    fail_bind_group: Cell<bool>,
    fail_draw: RefCell<Option<FrameError>>,
    device_released: Cell<bool>,
}

impl RecordingBackend {
    pub fn log(&self) -> BackendLog {
        self.log.borrow().clone()
    }

    pub fn fail_next_bind_group(&self) {
        self.fail_bind_group.set(true);
    }

    pub fn fail_next_draw(&self, error: FrameError) {
        *self.fail_draw.borrow_mut() = Some(error);
    }

    fn allocate(&self) -> MockHandle {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        MockHandle(id)
    }

    fn is_released(&self, buffer: MockHandle) -> bool {
        self.log.borrow().released_buffers.contains(&buffer)
    }

    fn buffer_bytes(&self, buffer: MockHandle) -> Vec<u8> {
        self.contents
            .borrow()
            .iter()
            .rev()
            .find(|(handle, _)| *handle == buffer)
            .map(|(_, bytes)| bytes.clone())
            .unwrap_or_default()
    }
}

impl Backend for RecordingBackend {
    type ShaderModule = MockHandle;
    type BindGroupLayout = MockHandle;
    type RenderPipeline = MockHandle;
    type Buffer = MockHandle;
    type BindGroup = MockHandle;

    fn compile_module(
        &self,
        stage: ShaderStage,
        source: &str,
    ) -> impl Future<Output = CompileOutcome<MockHandle>> {
        self.log.borrow_mut().compiled.push(stage);
        let mut messages = Vec::new();
        for (index, line) in source.lines().enumerate() {
            let line_number = index as u32 + 1;
            if let Some(column) = line.find(BROKEN_SHADER) {
                messages.push(
                    CompilationMessage::new(MessageKind::Error, "expected global item")
                        .at(line_number, column as u32 + 1),
                );
            } else if let Some(column) = line.find(WARNING_MARKER) {
                messages.push(
                    CompilationMessage::new(MessageKind::Warning, line[column..].trim())
                        .at(line_number, column as u32 + 1),
                );
            }
        }
        let outcome = if messages.iter().any(CompilationMessage::is_error) {
            CompileOutcome::failed(messages)
        } else {
            CompileOutcome::ok(self.allocate(), messages)
        };
        ready(outcome)
    }

    fn create_uniform_layout(&self) -> Result<MockHandle, ResourceError> {
        Ok(self.allocate())
    }

    fn create_render_pipeline(
        &self,
        _layout: &MockHandle,
        _vertex: &MockHandle,
        _fragment: &MockHandle,
    ) -> Result<MockHandle, ResourceError> {
        self.log.borrow_mut().pipelines_created += 1;
        Ok(self.allocate())
    }

    fn create_buffer(&self, kind: BufferKind, _size: u64) -> Result<MockHandle, ResourceError> {
        {
            let mut log = self.log.borrow_mut();
            match kind {
                BufferKind::Uniform => log.uniform_buffers_created += 1,
                BufferKind::Vertex => log.vertex_buffers_created += 1,
            }
        }
        Ok(self.allocate())
    }

    fn create_uniform_bind_group(
        &self,
        _layout: &MockHandle,
        buffer: &MockHandle,
    ) -> Result<MockHandle, ResourceError> {
        if self.fail_bind_group.replace(false) {
            return Err(ResourceError::new("bind group", "injected failure"));
        }
        let group = self.allocate();
        self.bind_groups.borrow_mut().push((group, *buffer));
        Ok(group)
    }

    fn write_buffer(&self, buffer: &MockHandle, data: &[u8]) {
        if self.is_released(*buffer) || self.device_released.get() {
            self.log.borrow_mut().used_after_release = true;
        }
        self.contents.borrow_mut().push((*buffer, data.to_vec()));
    }

    fn configure_surface(&mut self, settings: &SurfaceSettings) {
        self.log.borrow_mut().configured.push(*settings);
    }

    fn draw(
        &mut self,
        pipeline: &MockHandle,
        bind_group: &MockHandle,
        vertices: &MockHandle,
        vertex_count: u32,
    ) -> Result<(), FrameError> {
        if let Some(err) = self.fail_draw.borrow_mut().take() {
            return Err(err);
        }
        let buffer = self
            .bind_groups
            .borrow()
            .iter()
            .find(|(group, _)| group == bind_group)
            .map(|(_, buffer)| *buffer);
        let uniforms = buffer.map(|b| self.buffer_bytes(b)).unwrap_or_default();
        let stale = buffer.is_some_and(|b| self.is_released(b))
            || self.is_released(*vertices)
            || self.device_released.get();
        let mut log = self.log.borrow_mut();
        log.used_after_release |= stale;
        log.draws.push(DrawRecord {
            pipeline: *pipeline,
            bind_group: *bind_group,
            vertices: *vertices,
            vertex_count,
            uniforms,
        });
        Ok(())
    }

    fn release_buffer(&self, buffer: MockHandle) {
        let mut log = self.log.borrow_mut();
        if self.device_released.get() {
            log.used_after_release = true;
        }
        log.released_buffers.push(buffer);
        log.teardown.push(Teardown::Buffer(buffer));
    }

    fn release_device(&mut self) {
        self.device_released.set(true);
        self.log.borrow_mut().teardown.push(Teardown::Device);
    }
}

/// Host with a hand-cranked clock and explicit refresh ticks.
pub(crate) struct ManualHost {
    now: Instant,
    next: u64,
    scheduled: Vec<FrameHandle>,
    requested: usize,
    cancelled: usize,
    container: Option<LogicalSize<u32>>,
    pixel_ratio: Option<f64>,
}

impl ManualHost {
    pub fn new() -> Self {
        Self {
            now: Instant::now(),
            next: 0,
            scheduled: Vec::new(),
            requested: 0,
            cancelled: 0,
            container: None,
            pixel_ratio: None,
        }
    }

    pub fn with_container(mut self, width: u32, height: u32) -> Self {
        self.container = Some(LogicalSize::new(width, height));
        self
    }

    pub fn with_pixel_ratio(mut self, ratio: f64) -> Self {
        self.pixel_ratio = Some(ratio);
        self
    }

    pub fn set_container(&mut self, width: u32, height: u32) {
        self.container = Some(LogicalSize::new(width, height));
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Fires the refresh tick: hands back every callback due now.
    pub fn take_due(&mut self) -> Vec<FrameHandle> {
        std::mem::take(&mut self.scheduled)
    }

    pub fn outstanding(&self) -> usize {
        self.scheduled.len()
    }

    pub fn requested(&self) -> usize {
        self.requested
    }

    pub fn cancelled(&self) -> usize {
        self.cancelled
    }
}

impl CanvasHost for ManualHost {
    fn now(&self) -> Instant {
        self.now
    }

    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        self.requested += 1;
        let handle = FrameHandle::new(self.next);
        self.scheduled.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let before = self.scheduled.len();
        self.scheduled.retain(|scheduled| *scheduled != handle);
        if self.scheduled.len() != before {
            self.cancelled += 1;
        }
    }

    fn container_size(&self) -> Option<LogicalSize<u32>> {
        self.container
    }

    fn device_pixel_ratio(&self) -> Option<f64> {
        self.pixel_ratio
    }
}
