use wgpu::util::DeviceExt;

/// Clip-space corners of the full-screen quad in triangle-strip order.
pub(crate) const QUAD_VERTICES: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

pub(crate) const QUAD_VERTEX_COUNT: u32 = QUAD_VERTICES.len() as u32;

/// Tightly packed `vec2<f32>` stride.
const VERTEX_STRIDE: wgpu::BufferAddress = std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress;

/// Static vertex buffer shared by every render session.
pub(crate) struct QuadGeometry {
    buffer: wgpu::Buffer,
}

impl QuadGeometry {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("full-screen quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self { buffer }
    }

    pub fn slice(&self) -> wgpu::BufferSlice<'_> {
        self.buffer.slice(..)
    }

    /// Vertex buffer layout feeding `attributes` from this buffer.
    pub fn vertex_layout(attributes: &[wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: VERTEX_STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    }

    /// Single two-component float attribute at offset zero.
    pub fn position_attribute(location: u32) -> wgpu::VertexAttribute {
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 0,
            shader_location: location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_clip_space() {
        for axis in 0..2 {
            let min = QUAD_VERTICES.iter().map(|v| v[axis]).fold(f32::MAX, f32::min);
            let max = QUAD_VERTICES.iter().map(|v| v[axis]).fold(f32::MIN, f32::max);
            assert_eq!((min, max), (-1.0, 1.0));
        }
        assert_eq!(QUAD_VERTEX_COUNT, 4);
    }

    #[test]
    fn layout_is_tightly_packed() {
        let attributes = [QuadGeometry::position_attribute(0)];
        let layout = QuadGeometry::vertex_layout(&attributes);
        assert_eq!(layout.array_stride, 8);
        assert_eq!(layout.attributes[0].offset, 0);
        assert_eq!(layout.attributes[0].format, wgpu::VertexFormat::Float32x2);
    }
}
