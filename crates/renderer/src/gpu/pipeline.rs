use std::borrow::Cow;

use crate::compile::{describe_error, prepare, validate};
use crate::error::ShaderBuildError;
use crate::interface::{resolve_bindings, DeclaredInterface, ProgramBindings};
use crate::session::{LinkedProgram, ProgramBuilder};
use crate::types::ShaderStage;

use super::geometry::QuadGeometry;

/// A shader module created on the device, tagged with its stage.
pub(crate) struct GpuShader {
    stage: ShaderStage,
    module: wgpu::ShaderModule,
    interface: DeclaredInterface,
}

/// A linked render pipeline and the shader modules it was built from.
pub(crate) struct GpuProgram {
    pipeline: wgpu::RenderPipeline,
    bindings: ProgramBindings,
    _vertex: wgpu::ShaderModule,
    _fragment: wgpu::ShaderModule,
}

impl GpuProgram {
    pub fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }
}

impl LinkedProgram for GpuProgram {
    fn bindings(&self) -> ProgramBindings {
        self.bindings
    }
}

/// Builds [`GpuProgram`]s against one device and surface format.
pub(crate) struct WgpuProgramBuilder {
    device: wgpu::Device,
    pipeline_layout: wgpu::PipelineLayout,
    surface_format: wgpu::TextureFormat,
}

impl WgpuProgramBuilder {
    pub fn new(
        device: wgpu::Device,
        uniform_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quad pipeline layout"),
            bind_group_layouts: &[uniform_layout],
            push_constant_ranges: &[],
        });
        Self {
            device,
            pipeline_layout,
            surface_format,
        }
    }

    /// Runs `create` inside a validation error scope and returns the first
    /// validation error it raised, if any.
    fn scoped<T>(&self, create: impl FnOnce(&wgpu::Device) -> T) -> (T, Option<String>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error.map(|error| describe_error(&error)))
    }
}

impl ProgramBuilder for WgpuProgramBuilder {
    type Shader = GpuShader;
    type Program = GpuProgram;

    fn compile(&self, stage: ShaderStage, source: &str) -> Result<GpuShader, ShaderBuildError> {
        let prepared = prepare(stage, source);
        validate(&prepared)?;

        let (module, error) = self.scoped(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(stage.label()),
                source: wgpu::ShaderSource::Glsl {
                    shader: Cow::Borrowed(&prepared.text),
                    stage: stage.naga(),
                    defines: &[],
                },
            })
        });
        if let Some(log) = error {
            return Err(ShaderBuildError::Compile { stage, log });
        }
        tracing::trace!(%stage, "created shader module");

        Ok(GpuShader {
            stage,
            module,
            interface: prepared.interface,
        })
    }

    fn link(&self, vertex: GpuShader, fragment: GpuShader) -> Result<GpuProgram, ShaderBuildError> {
        debug_assert_eq!(vertex.stage, ShaderStage::Vertex);
        debug_assert_eq!(fragment.stage, ShaderStage::Fragment);

        let bindings = resolve_bindings(&vertex.interface, &fragment.interface)?;
        let attributes = [QuadGeometry::position_attribute(bindings.position.0)];

        let (pipeline, error) = self.scoped(|device| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("quad pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &vertex.module,
                    entry_point: Some("main"),
                    buffers: &[QuadGeometry::vertex_layout(&attributes)],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &fragment.module,
                    entry_point: Some("main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.surface_format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            })
        });
        if let Some(log) = error {
            return Err(ShaderBuildError::Link { log });
        }
        tracing::debug!(?bindings, "linked quad pipeline");

        Ok(GpuProgram {
            pipeline,
            bindings,
            _vertex: vertex.module,
            _fragment: fragment.module,
        })
    }
}
