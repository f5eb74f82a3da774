use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy, EventLoopWindowTarget};
use winit::window::{Window, WindowBuilder};

use crate::error::ShaderBuildFailed;
use crate::gpu::GpuState;
use crate::runtime::{CancellationToken, FrameScheduler};
use crate::session::SubmitOutcome;
use crate::types::RendererConfig;

/// Requests delivered to the window thread as winit user events.
#[derive(Debug, Clone)]
enum WindowCommand {
    Submit { fragment: String },
    QueryActiveSource,
    Shutdown,
}

/// Notifications sent back from the window thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowSignal {
    /// A submitted fragment shader replaced the active session.
    Activated { generation: u64 },
    /// A submitted fragment shader was rejected; the prior session keeps running.
    Rejected(ShaderBuildFailed),
    /// Reply to [`WindowRuntime::query_active_source`].
    ActiveSource(String),
    /// The window closed and the GPU state was released.
    Closed,
}

/// Handle to the shader window running on its own thread.
pub struct WindowRuntime {
    proxy: EventLoopProxy<WindowCommand>,
    signals: Receiver<WindowSignal>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl WindowRuntime {
    /// Opens the window and builds the first session from
    /// `config.fragment_source`. Returns once that session is live, or with the
    /// start-up error.
    pub fn spawn(config: RendererConfig) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded(1);
        let (signal_tx, signal_rx) = unbounded();
        let handle = thread::Builder::new()
            .name("promptshade-window".into())
            .spawn(move || run_window_thread(config, ready_tx, signal_tx))
            .map_err(|err| anyhow!("failed to spawn window thread: {err}"))?;

        let proxy = ready_rx
            .recv()
            .map_err(|err| anyhow!("window thread failed to initialise: {err}"))??;

        Ok(Self {
            proxy,
            signals: signal_rx,
            join_handle: Some(handle),
        })
    }

    /// Hands new fragment text to the session manager. The outcome arrives as
    /// a [`WindowSignal`].
    pub fn submit(&self, fragment: String) -> Result<()> {
        self.send(WindowCommand::Submit { fragment })
    }

    /// Asks for the active fragment source; answered with
    /// [`WindowSignal::ActiveSource`].
    pub fn query_active_source(&self) -> Result<()> {
        self.send(WindowCommand::QueryActiveSource)
    }

    pub fn signals(&self) -> &Receiver<WindowSignal> {
        &self.signals
    }

    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            handle
                .join()
                .map_err(|err| anyhow!("window thread panicked: {err:?}"))??;
        }
        Ok(())
    }

    fn send(&self, command: WindowCommand) -> Result<()> {
        self.proxy
            .send_event(command)
            .map_err(|_| anyhow!("shader window is closed"))
    }
}

impl Drop for WindowRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

/// GPU state and frame scheduling owned by the window thread.
///
/// `gpu` is declared before `window` so the surface is released first.
struct WindowState {
    gpu: Option<GpuState>,
    scheduler: FrameScheduler,
    window: Arc<Window>,
}

impl WindowState {
    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    /// Cancels pending frames, then drops the GPU context.
    fn teardown(&mut self) {
        self.scheduler.cancel();
        if self.gpu.take().is_some() {
            debug!("released GPU state");
        }
    }

    fn handle_command(&mut self, command: WindowCommand, signal_tx: &Sender<WindowSignal>) -> bool {
        let Some(gpu) = self.gpu.as_mut() else {
            return false;
        };
        match command {
            WindowCommand::Submit { fragment } => {
                let signal = match gpu.submit(fragment) {
                    SubmitOutcome::Activated { generation } => {
                        info!(generation, "activated new shader session");
                        WindowSignal::Activated { generation }
                    }
                    SubmitOutcome::Rejected {
                        diagnostic,
                        fallback_generation,
                    } => {
                        warn!(
                            stage = %diagnostic.stage,
                            fallback_generation,
                            "shader rejected; still rendering previous session"
                        );
                        WindowSignal::Rejected(diagnostic)
                    }
                };
                let _ = signal_tx.send(signal);
                self.scheduler.request_frame();
                true
            }
            WindowCommand::QueryActiveSource => {
                let source = gpu.active_session().fragment().to_string();
                let _ = signal_tx.send(WindowSignal::ActiveSource(source));
                true
            }
            WindowCommand::Shutdown => false,
        }
    }

    fn render_frame(&mut self, elwt: &EventLoopWindowTarget<WindowCommand>) {
        let now = Instant::now();
        if !self.scheduler.begin_frame(now) {
            return;
        }
        let Some(gpu) = self.gpu.as_mut() else {
            return;
        };

        match gpu.render(now) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost or outdated; reconfiguring");
                gpu.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory; closing window");
                self.teardown();
                elwt.exit();
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; retrying next frame");
            }
            Err(other) => {
                warn!(error = ?other, "surface error; retrying next frame");
            }
        }
        self.scheduler.complete_frame(Instant::now());
    }
}

fn run_window_thread(
    config: RendererConfig,
    ready_tx: Sender<Result<EventLoopProxy<WindowCommand>, anyhow::Error>>,
    signal_tx: Sender<WindowSignal>,
) -> Result<()> {
    let mut builder = EventLoopBuilder::<WindowCommand>::with_user_event();
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    #[cfg(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    }
    let event_loop = match builder.build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            let message = format!("failed to create event loop: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };
    let proxy = event_loop.create_proxy();

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = match WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size)
        .build(&event_loop)
    {
        Ok(window) => Arc::new(window),
        Err(err) => {
            let message = format!("failed to create shader window: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };

    let gpu = match GpuState::new(
        window.as_ref(),
        window.inner_size(),
        &config.fragment_source,
    ) {
        Ok(gpu) => gpu,
        Err(err) => {
            let message = format!("failed to initialise shader window: {err:#}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };

    let mut scheduler = FrameScheduler::new(config.target_fps, CancellationToken::new());
    scheduler.request_frame();
    let mut state = WindowState {
        gpu: Some(gpu),
        scheduler,
        window,
    };
    state.window().request_redraw();

    let _ = ready_tx.send(Ok(proxy));

    let closed_tx = signal_tx.clone();
    let run_result = event_loop.run(move |event, elwt| match event {
        Event::UserEvent(command) => {
            if !state.handle_command(command, &signal_tx) {
                state.teardown();
                elwt.exit();
            }
        }
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    state.teardown();
                    elwt.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Some(gpu) = state.gpu.as_mut() {
                        gpu.resize(new_size);
                    }
                    state.scheduler.request_frame();
                }
                WindowEvent::ScaleFactorChanged {
                    mut inner_size_writer,
                    ..
                } => {
                    if let Some(gpu) = state.gpu.as_ref() {
                        let _ = inner_size_writer.request_inner_size(gpu.size());
                    }
                }
                WindowEvent::RedrawRequested => state.render_frame(elwt),
                _ => {}
            }
        }
        Event::AboutToWait => {
            let now = Instant::now();
            if state.scheduler.ready_for_frame(now) {
                tracing::trace!("scheduler: issuing redraw now");
                state.window().request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = state.scheduler.next_deadline() {
                let ms = deadline.saturating_duration_since(now).as_millis();
                tracing::trace!(deadline_ms = ms, "scheduler: waiting until next frame");
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                tracing::trace!("scheduler: idle (no redraw requested)");
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        Event::LoopExiting => state.teardown(),
        _ => {}
    });

    let _ = closed_tx.send(WindowSignal::Closed);
    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
