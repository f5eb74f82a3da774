use std::fmt;

use crate::compile::{DEFAULT_FRAGMENT_SHADER, VERTEX_SHADER_GLSL};

/// Pipeline stage a piece of shader source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub(crate) fn naga(self) -> wgpu::naga::ShaderStage {
        match self {
            ShaderStage::Vertex => wgpu::naga::ShaderStage::Vertex,
            ShaderStage::Fragment => wgpu::naga::ShaderStage::Fragment,
        }
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "full-screen quad vertex",
            ShaderStage::Fragment => "promptshade fragment",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Vertex/fragment source pair for one program build.
///
/// The vertex half is always the internal full-screen quad pass-through; only
/// the fragment text varies between sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    vertex: &'static str,
    fragment: String,
}

impl ShaderSource {
    /// Pairs user supplied fragment text with the internal vertex shader.
    pub fn from_fragment(fragment: impl Into<String>) -> Self {
        Self {
            vertex: VERTEX_SHADER_GLSL,
            fragment: fragment.into(),
        }
    }

    pub fn vertex(&self) -> &str {
        self.vertex
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }
}

impl Default for ShaderSource {
    fn default() -> Self {
        Self::from_fragment(DEFAULT_FRAGMENT_SHADER)
    }
}

/// Immutable configuration passed to the window thread at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Drawing surface size in physical pixels.
    pub surface_size: (u32, u32),
    /// Fragment shader the first session is built from.
    pub fragment_source: String,
    /// Optional FPS cap; `None` renders once per vsync.
    pub target_fps: Option<f32>,
    /// Window title.
    pub title: String,
}

impl Default for RendererConfig {
    /// An 800x600 window running the built-in default shader.
    fn default() -> Self {
        Self {
            surface_size: (800, 600),
            fragment_source: DEFAULT_FRAGMENT_SHADER.to_string(),
            target_fps: None,
            title: "promptshade".to_string(),
        }
    }
}
