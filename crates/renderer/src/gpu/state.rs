use std::time::Instant;

use anyhow::{Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::debug;
use winit::dpi::PhysicalSize;

use crate::runtime::FrameStats;
use crate::session::{LinkedProgram, RenderSession, ShaderSessionManager, SubmitOutcome};

use super::context::GpuContext;
use super::geometry::{QuadGeometry, QUAD_VERTEX_COUNT};
use super::pipeline::{GpuProgram, WgpuProgramBuilder};
use super::uniforms::{FrameUniforms, UniformBinder};

/// Everything the window thread needs to draw the active shader session.
///
/// Geometry and the uniform buffer are created once here; shader swaps only
/// replace the program held by the session manager.
pub(crate) struct GpuState {
    context: GpuContext,
    geometry: QuadGeometry,
    uniforms: UniformBinder,
    sessions: ShaderSessionManager<WgpuProgramBuilder>,
    stats: FrameStats,
}

impl GpuState {
    /// Creates the GPU context and builds the first session from `fragment`.
    /// Fails when that first build is rejected.
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        fragment: &str,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size)?;
        let geometry = QuadGeometry::new(&context.device);
        let uniforms = UniformBinder::new(&context.device);
        let builder = WgpuProgramBuilder::new(
            context.device.clone(),
            uniforms.layout(),
            context.surface_format,
        );
        let sessions = ShaderSessionManager::start(builder, fragment, Instant::now)
            .context("failed to build the initial shader session")?;

        Ok(Self {
            context,
            geometry,
            uniforms,
            sessions,
            stats: FrameStats::new(Instant::now()),
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    /// Re-applies the surface configuration after `Lost`/`Outdated`.
    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    pub(crate) fn submit(&mut self, fragment: String) -> SubmitOutcome {
        self.sessions.submit(fragment, Instant::now)
    }

    pub(crate) fn active_session(&self) -> &RenderSession<GpuProgram> {
        self.sessions.active()
    }

    /// Draws one frame of the active session and presents it.
    pub(crate) fn render(&mut self, now: Instant) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let session = self.sessions.active();
        let program = session.program();
        let size = self.context.size;
        let time = session.elapsed_seconds(now);
        self.uniforms.write(
            &self.context.queue,
            &program.bindings(),
            FrameUniforms::new(size, time),
        );

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("render encoder"),
                });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("quad pass"),
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
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_viewport(
                0.0,
                0.0,
                size.width as f32,
                size.height as f32,
                0.0,
                1.0,
            );
            pass.set_pipeline(program.pipeline());
            pass.set_bind_group(0, self.uniforms.bind_group(), &[]);
            pass.set_vertex_buffer(0, self.geometry.slice());
            pass.draw(0..QUAD_VERTEX_COUNT, 0..1);
        }

        self.context.queue.submit(Some(encoder.finish()));
        frame.present();

        if let Some(fps) = self.stats.record(now) {
            debug!(
                fps = fps.round(),
                frame_count = self.stats.frame_count(),
                time,
                generation = session.generation(),
                "render stats"
            );
        }
        Ok(())
    }
}
