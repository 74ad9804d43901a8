use bytemuck::{Pod, Zeroable};
use winit::dpi::{PhysicalPosition, PhysicalSize};

/// Size in bytes of the uniform buffer allocated for every program.
pub const UNIFORM_BLOCK_SIZE: usize = std::mem::size_of::<FrameUniforms>();

/// CPU mirror of the injected `Uniforms` WGSL struct.
///
/// Little-endian `f32`s at fixed offsets: `time` @0, `_padding` @4,
/// `resolution` @8, `pointer` @16. The trailing pair rounds the block up to
/// 32 bytes and is always zero.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub time: f32,
    pub _padding: f32,
    pub resolution: [f32; 2],
    pub pointer: [f32; 2],
    pub _tail: [f32; 2],
}

impl FrameUniforms {
    pub fn new(
        time: f32,
        resolution: PhysicalSize<u32>,
        pointer: PhysicalPosition<f32>,
    ) -> Self {
        Self {
            time,
            _padding: 0.0,
            resolution: [resolution.width as f32, resolution.height as f32],
            pointer: [pointer.x, pointer.y],
            _tail: [0.0; 2],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Serialises one frame's uniform state into the wire layout.
pub fn write(
    time: f32,
    resolution: PhysicalSize<u32>,
    pointer: PhysicalPosition<f32>,
) -> [u8; UNIFORM_BLOCK_SIZE] {
    let mut bytes = [0u8; UNIFORM_BLOCK_SIZE];
    bytes.copy_from_slice(FrameUniforms::new(time, resolution, pointer).as_bytes());
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_at(bytes: &[u8], offset: usize) -> f32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&bytes[offset..offset + 4]);
        f32::from_le_bytes(raw)
    }

    #[test]
    fn block_is_thirty_two_bytes() {
        assert_eq!(UNIFORM_BLOCK_SIZE, 32);
        assert_eq!(std::mem::align_of::<FrameUniforms>(), 4);
    }

    #[test]
    fn write_pins_field_offsets() {
        let bytes = write(
            1.5,
            PhysicalSize::new(400, 300),
            PhysicalPosition::new(10.0, 20.0),
        );
        assert_eq!(&bytes[0..4], &1.5f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &0.0f32.to_le_bytes());
        assert_eq!(&bytes[8..12], &400.0f32.to_le_bytes());
        assert_eq!(&bytes[12..16], &300.0f32.to_le_bytes());
        assert_eq!(&bytes[16..20], &10.0f32.to_le_bytes());
        assert_eq!(&bytes[20..24], &20.0f32.to_le_bytes());
        assert_eq!(&bytes[24..32], &[0u8; 8]);
    }

    #[test]
    fn default_pointer_is_origin() {
        let bytes = write(0.25, PhysicalSize::new(8, 6), PhysicalPosition::new(0.0, 0.0));
        assert_eq!(f32_at(&bytes, 0), 0.25);
        assert_eq!(f32_at(&bytes, 16), 0.0);
        assert_eq!(f32_at(&bytes, 20), 0.0);
    }
}
