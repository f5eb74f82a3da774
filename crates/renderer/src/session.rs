//! Shader session management.
//!
//! A [`RenderSession`] is a fully linked program plus the instant its clock
//! started. [`ShaderSessionManager`] is the only place new fragment text is
//! turned into a session, and it only replaces the active session once the
//! replacement has compiled and linked. Failed builds fall back to the session
//! that was already running.

use std::time::{Duration, Instant};

use crate::error::{SessionError, ShaderBuildError, ShaderBuildFailed};
use crate::interface::ProgramBindings;
use crate::types::{ShaderSource, ShaderStage};

/// Compiles shader stages and links them into programs.
///
/// Implemented by the wgpu device wrapper and by the offline naga checker so
/// the same session logic runs with or without a GPU.
pub trait ProgramBuilder {
    type Shader;
    type Program: LinkedProgram;

    fn compile(&self, stage: ShaderStage, source: &str) -> Result<Self::Shader, ShaderBuildError>;

    /// Consumes both shaders. On failure they are dropped with the error.
    fn link(
        &self,
        vertex: Self::Shader,
        fragment: Self::Shader,
    ) -> Result<Self::Program, ShaderBuildError>;
}

/// A program whose required bindings have been resolved.
pub trait LinkedProgram {
    fn bindings(&self) -> ProgramBindings;
}

/// Compiles both stages of `source` and links them.
pub fn build_program<B: ProgramBuilder>(
    builder: &B,
    source: &ShaderSource,
) -> Result<B::Program, ShaderBuildError> {
    let vertex = builder.compile(ShaderStage::Vertex, source.vertex())?;
    let fragment = builder.compile(ShaderStage::Fragment, source.fragment())?;
    builder.link(vertex, fragment)
}

/// The active program and its time origin.
#[derive(Debug)]
pub struct RenderSession<P> {
    program: P,
    source: ShaderSource,
    started: Instant,
    generation: u64,
}

impl<P> RenderSession<P> {
    pub fn program(&self) -> &P {
        &self.program
    }

    pub fn fragment(&self) -> &str {
        self.source.fragment()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Time since this session was created, never negative.
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
    }

    /// Value written to `u_time`.
    pub fn elapsed_seconds(&self, now: Instant) -> f32 {
        self.elapsed(now).as_secs_f32()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Building,
    Active,
    RejectedFallback,
}

/// Result of handing new fragment text to the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Activated {
        generation: u64,
    },
    Rejected {
        diagnostic: ShaderBuildFailed,
        fallback_generation: u64,
    },
}

pub struct ShaderSessionManager<B: ProgramBuilder> {
    builder: B,
    active: RenderSession<B::Program>,
    state: SessionState,
    last_rejection: Option<ShaderBuildFailed>,
}

impl<B: ProgramBuilder> ShaderSessionManager<B> {
    /// Builds the first session. There is nothing to fall back to yet, so a
    /// failure here is returned instead of being absorbed.
    ///
    /// `clock` is read once the program has linked and becomes the session's
    /// time origin.
    pub fn start(
        builder: B,
        fragment: impl Into<String>,
        clock: impl FnOnce() -> Instant,
    ) -> Result<Self, SessionError> {
        let source = ShaderSource::from_fragment(fragment);
        log_transition(SessionState::Idle, SessionState::Building, 0);
        let program = build_program(&builder, &source).map_err(|err| {
            let failed = ShaderBuildFailed::from(err);
            tracing::error!(stage = %failed.stage, "initial shader build failed");
            SessionError::StartupRejected(failed)
        })?;
        log_transition(SessionState::Building, SessionState::Active, 0);

        Ok(Self {
            builder,
            active: RenderSession {
                program,
                source,
                started: clock(),
                generation: 0,
            },
            state: SessionState::Active,
            last_rejection: None,
        })
    }

    /// Attempts to replace the active session with one built from `fragment`.
    ///
    /// The prior session stays in place until the new program is fully
    /// linked; on failure it remains active and the diagnostic is returned.
    /// `clock` is only read after a successful link, so the first frame of
    /// the new session sees `u_time` near zero however long the build took.
    pub fn submit(
        &mut self,
        fragment: impl Into<String>,
        clock: impl FnOnce() -> Instant,
    ) -> SubmitOutcome {
        let source = ShaderSource::from_fragment(fragment);
        let generation = self.active.generation + 1;
        self.transition(SessionState::Building, generation);

        match build_program(&self.builder, &source) {
            Ok(program) => {
                self.active = RenderSession {
                    program,
                    source,
                    started: clock(),
                    generation,
                };
                self.last_rejection = None;
                self.transition(SessionState::Active, generation);
                SubmitOutcome::Activated { generation }
            }
            Err(err) => {
                let diagnostic = ShaderBuildFailed::from(err);
                tracing::warn!(
                    stage = %diagnostic.stage,
                    generation,
                    "shader rejected; keeping previous session"
                );
                self.transition(SessionState::RejectedFallback, generation);
                self.last_rejection = Some(diagnostic.clone());
                let fallback_generation = self.active.generation;
                self.transition(SessionState::Active, fallback_generation);
                SubmitOutcome::Rejected {
                    diagnostic,
                    fallback_generation,
                }
            }
        }
    }

    pub fn active(&self) -> &RenderSession<B::Program> {
        &self.active
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Diagnostic from the most recent submission, if it was rejected.
    pub fn last_rejection(&self) -> Option<&ShaderBuildFailed> {
        self.last_rejection.as_ref()
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    fn transition(&mut self, next: SessionState, generation: u64) {
        log_transition(self.state, next, generation);
        self.state = next;
    }
}

fn log_transition(from: SessionState, to: SessionState, generation: u64) {
    tracing::debug!(?from, ?to, generation, "shader session transition");
}
