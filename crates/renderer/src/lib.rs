//! Renderer crate for promptshade.
//!
//! Turns WebGL-style fragment shader text into a live full-screen quad. The
//! overall flow is:
//!
//! ```text
//!   console / CLI
//!          │ fragment text
//!          ▼
//!   WindowRuntime ──▶ ShaderSessionManager ──▶ compile ─▶ link ─▶ RenderSession
//!          ▲                    │                                      │
//!          │ WindowSignal       └── rejected: keep prior session       ▼
//!          └──────────────────────────────────────────── FrameScheduler ─▶ draw
//! ```
//!
//! The window thread owns every GPU object. Fragment text is wrapped into
//! GLSL 450 and validated with naga before any device work, which is also
//! what [`check_fragment`] runs without a GPU.

mod compile;
mod error;
mod gpu;
mod interface;
mod offline;
mod runtime;
mod session;
mod types;
mod window;

pub use compile::{DEFAULT_FRAGMENT_SHADER, VERTEX_SHADER_GLSL};
pub use error::{FailedStage, SessionError, ShaderBuildError, ShaderBuildFailed};
pub use interface::{
    AttributeLocation, ProgramBindings, UniformLocation, POSITION_ATTRIBUTE, RESOLUTION_UNIFORM,
    TIME_UNIFORM,
};
pub use offline::{check_fragment, OfflineProgram, OfflineProgramBuilder, OfflineShader};
pub use runtime::{CancellationToken, FrameScheduler, FrameStats};
pub use session::{
    build_program, LinkedProgram, ProgramBuilder, RenderSession, SessionState,
    ShaderSessionManager, SubmitOutcome,
};
pub use types::{RendererConfig, ShaderSource, ShaderStage};
pub use window::{WindowRuntime, WindowSignal};
