use winit::dpi::{LogicalPosition, PhysicalPosition};

/// Tracks the pointer in backing-store pixels for the next uniform write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputTracker {
    pointer: PhysicalPosition<f32>,
}

impl Default for InputTracker {
    fn default() -> Self {
        Self {
            pointer: PhysicalPosition::new(0.0, 0.0),
        }
    }
}

impl InputTracker {
    /// Records a pointer move given in the same logical space as `canvas_origin`,
    /// the top-left corner of the canvas's on-screen bounds.
    pub fn pointer_moved(
        &mut self,
        client: LogicalPosition<f64>,
        canvas_origin: LogicalPosition<f64>,
        pixel_ratio: f64,
    ) {
        let x = (client.x - canvas_origin.x) * pixel_ratio;
        let y = (client.y - canvas_origin.y) * pixel_ratio;
        self.pointer = PhysicalPosition::new(x as f32, y as f32);
    }

    /// Current pointer position; the origin until the first move.
    pub fn pointer(&self) -> PhysicalPosition<f32> {
        self.pointer
    }
}
