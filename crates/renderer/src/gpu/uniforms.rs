use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::interface::ProgramBindings;

/// CPU mirror of the `QuadParams` std140 block injected into every fragment
/// shader. Field offsets are the uniform locations the linker hands out.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub(crate) struct QuadUniforms {
    pub(crate) resolution: [f32; 2],
    pub(crate) time: f32,
    pub(crate) padding0: f32,
}

/// Uniform values for a single frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FrameUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
}

impl FrameUniforms {
    pub fn new(surface: PhysicalSize<u32>, elapsed_seconds: f32) -> Self {
        Self {
            resolution: [surface.width as f32, surface.height as f32],
            time: elapsed_seconds,
        }
    }
}

/// Owns the uniform buffer and its bind group; shared across sessions.
pub(crate) struct UniformBinder {
    layout: wgpu::BindGroupLayout,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl UniformBinder {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quad uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad uniform buffer"),
            contents: bytemuck::bytes_of(&QuadUniforms::default()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quad uniform bind group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self {
            layout,
            buffer,
            bind_group,
        }
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    /// Writes `u_resolution` and `u_time` at the program's resolved locations.
    pub fn write(&self, queue: &wgpu::Queue, bindings: &ProgramBindings, values: FrameUniforms) {
        queue.write_buffer(
            &self.buffer,
            bindings.resolution.0,
            bytemuck::cast_slice(&values.resolution),
        );
        queue.write_buffer(
            &self.buffer,
            bindings.time.0,
            bytemuck::bytes_of(&values.time),
        );
    }
}

#[cfg(test)]
mod tests {
    use std::mem::{align_of, offset_of, size_of};

    use super::*;

    #[test]
    fn quad_uniforms_follow_std140_layout() {
        assert_eq!(offset_of!(QuadUniforms, resolution), 0);
        assert_eq!(offset_of!(QuadUniforms, time), 8);
        assert_eq!(offset_of!(QuadUniforms, padding0), 12);
        assert_eq!(size_of::<QuadUniforms>(), 16);
        assert_eq!(align_of::<QuadUniforms>(), 4);
    }

    #[test]
    fn frame_uniforms_use_surface_pixels() {
        let values = FrameUniforms::new(PhysicalSize::new(800, 600), 1.5);
        assert_eq!(values.resolution, [800.0, 600.0]);
        assert_eq!(values.time, 1.5);
    }
}
