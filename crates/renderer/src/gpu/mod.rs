//! GPU orchestration for the full-screen quad runtime.
//!
//! - `context` owns wgpu instance/device/surface wiring and reconfigures the
//!   swapchain when the window resizes.
//! - `geometry` uploads the shared triangle-strip quad once.
//! - `uniforms` mirrors the injected std140 block and writes `u_resolution`
//!   and `u_time` at the offsets the linker resolved.
//! - `pipeline` compiles prepared GLSL into shader modules and links them into
//!   render pipelines, turning wgpu validation errors into build errors.
//! - `state` glues everything to the session manager and records each frame.

mod context;
mod geometry;
mod pipeline;
mod state;
mod uniforms;

pub(crate) use state::GpuState;
pub(crate) use uniforms::QuadUniforms;
