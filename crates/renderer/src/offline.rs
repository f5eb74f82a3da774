//! GPU-free program builder.
//!
//! Runs the same GLSL wrapping, naga validation and binding resolution as the
//! wgpu builder, stopping short of creating device objects. Used by
//! `promptshade check` and by tests.

use wgpu::naga::Module;

use crate::compile::{prepare, validate};
use crate::error::{ShaderBuildError, ShaderBuildFailed};
use crate::interface::{resolve_bindings, DeclaredInterface, ProgramBindings};
use crate::session::{build_program, LinkedProgram, ProgramBuilder};
use crate::types::{ShaderSource, ShaderStage};

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineProgramBuilder;

/// A validated naga module tagged with its stage.
#[derive(Debug)]
pub struct OfflineShader {
    stage: ShaderStage,
    interface: DeclaredInterface,
    module: Module,
}

impl OfflineShader {
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Number of entry points naga found in the validated module.
    pub fn entry_point_count(&self) -> usize {
        self.module.entry_points.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfflineProgram {
    bindings: ProgramBindings,
}

impl LinkedProgram for OfflineProgram {
    fn bindings(&self) -> ProgramBindings {
        self.bindings
    }
}

impl ProgramBuilder for OfflineProgramBuilder {
    type Shader = OfflineShader;
    type Program = OfflineProgram;

    fn compile(&self, stage: ShaderStage, source: &str) -> Result<OfflineShader, ShaderBuildError> {
        let prepared = prepare(stage, source);
        let module = validate(&prepared)?;
        Ok(OfflineShader {
            stage,
            interface: prepared.interface,
            module,
        })
    }

    fn link(
        &self,
        vertex: OfflineShader,
        fragment: OfflineShader,
    ) -> Result<OfflineProgram, ShaderBuildError> {
        let bindings = resolve_bindings(&vertex.interface, &fragment.interface)?;
        Ok(OfflineProgram { bindings })
    }
}

/// Compiles and links `fragment` against the internal vertex shader without
/// touching the GPU.
pub fn check_fragment(fragment: &str) -> Result<ProgramBindings, ShaderBuildFailed> {
    let source = ShaderSource::from_fragment(fragment);
    build_program(&OfflineProgramBuilder, &source)
        .map(|program| program.bindings())
        .map_err(ShaderBuildFailed::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{DEFAULT_FRAGMENT_SHADER, VERTEX_SHADER_GLSL};
    use crate::error::FailedStage;
    use crate::interface::{AttributeLocation, UniformLocation};

    #[test]
    fn default_fragment_resolves_standard_bindings() {
        let bindings = check_fragment(DEFAULT_FRAGMENT_SHADER).unwrap();
        assert_eq!(bindings.position, AttributeLocation(0));
        assert_eq!(bindings.resolution, UniformLocation(0));
        assert_eq!(bindings.time, UniformLocation(8));
    }

    #[test]
    fn compiled_shaders_keep_their_stage() {
        let shader = OfflineProgramBuilder
            .compile(ShaderStage::Vertex, VERTEX_SHADER_GLSL)
            .unwrap();
        assert_eq!(shader.stage(), ShaderStage::Vertex);
        assert_eq!(shader.entry_point_count(), 1);
    }

    #[test]
    fn empty_fragment_is_rejected() {
        let err = check_fragment("").unwrap_err();
        assert_eq!(err.stage, FailedStage::Fragment);
    }
}
