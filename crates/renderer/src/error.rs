use std::fmt;

use thiserror::Error;

use crate::types::ShaderStage;

/// Failure raised by the shader compiler or program linker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShaderBuildError {
    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: ShaderStage, log: String },

    #[error("program failed to link:\n{log}")]
    Link { log: String },
}

impl ShaderBuildError {
    pub fn log(&self) -> &str {
        match self {
            ShaderBuildError::Compile { log, .. } | ShaderBuildError::Link { log } => log,
        }
    }
}

/// Step of a program build that rejected the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStage {
    Vertex,
    Fragment,
    Link,
}

impl fmt::Display for FailedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailedStage::Vertex => f.write_str("vertex"),
            FailedStage::Fragment => f.write_str("fragment"),
            FailedStage::Link => f.write_str("link"),
        }
    }
}

/// User-facing diagnostic emitted when a shader hot-swap is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("shader build failed at {stage} stage:\n{log}")]
pub struct ShaderBuildFailed {
    pub stage: FailedStage,
    pub log: String,
}

impl From<ShaderBuildError> for ShaderBuildFailed {
    fn from(value: ShaderBuildError) -> Self {
        match value {
            ShaderBuildError::Compile { stage, log } => Self {
                stage: match stage {
                    ShaderStage::Vertex => FailedStage::Vertex,
                    ShaderStage::Fragment => FailedStage::Fragment,
                },
                log,
            },
            ShaderBuildError::Link { log } => Self {
                stage: FailedStage::Link,
                log,
            },
        }
    }
}

/// Errors that prevent a session manager from existing at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The very first build failed, so there is no session to fall back to.
    #[error("initial shader was rejected; no session to fall back to: {0}")]
    StartupRejected(ShaderBuildFailed),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_errors_keep_their_stage() {
        let failed = ShaderBuildFailed::from(ShaderBuildError::Compile {
            stage: ShaderStage::Fragment,
            log: "fragment:3:1: unexpected token".into(),
        });
        assert_eq!(failed.stage, FailedStage::Fragment);
        assert!(failed.to_string().contains("fragment stage"));
    }

    #[test]
    fn link_errors_map_to_link_stage() {
        let failed = ShaderBuildFailed::from(ShaderBuildError::Link {
            log: "uniform `u_time` is not declared".into(),
        });
        assert_eq!(failed.stage, FailedStage::Link);
        assert_eq!(failed.log, "uniform `u_time` is not declared");
    }
}
