use std::fs;
use std::io::{self, BufRead};
use std::path::Path;
use std::process::ExitCode;
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{never, select, unbounded, Receiver};
use renderer::{
    check_fragment, RendererConfig, WindowRuntime, WindowSignal, DEFAULT_FRAGMENT_SHADER,
};
use shadergen::{GeneratorConfig, ShaderGenClient};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::console::{ConsoleCommand, HELP};
use crate::evaluator::calculate;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Opens the shader window and drives it from console input until either
/// side closes.
pub fn run(settings: Settings) -> Result<()> {
    let client = build_client(&settings)?;
    let fragment_source = match &settings.shader {
        Some(path) => read_fragment(path)?,
        None => DEFAULT_FRAGMENT_SHADER.to_string(),
    };

    let window = WindowRuntime::spawn(RendererConfig {
        surface_size: settings.surface_size,
        fragment_source,
        target_fps: settings.target_fps,
        ..RendererConfig::default()
    })
    .context("failed to open shader window")?;
    tracing::info!(endpoint = %client.prompt_url(), "shader window ready");
    println!("{HELP}");

    let lines = spawn_stdin_reader()?;
    let closed_input = never();
    let mut stdin_open = true;
    loop {
        let input = if stdin_open { &lines } else { &closed_input };
        select! {
            recv(input) -> line => match line {
                Ok(line) => {
                    if !handle_line(&line, &window, &client)? {
                        break;
                    }
                }
                Err(_) => {
                    tracing::debug!("stdin closed; waiting for the window to close");
                    stdin_open = false;
                }
            },
            recv(window.signals()) -> signal => match signal {
                Ok(WindowSignal::Closed) | Err(_) => break,
                Ok(signal) => report_signal(signal),
            },
        }
    }

    window.shutdown()
}

/// Receiver of console-driven shader changes.
trait ShaderTarget {
    fn submit(&self, fragment: String) -> Result<()>;
    fn query_active_source(&self) -> Result<()>;
}

impl ShaderTarget for WindowRuntime {
    fn submit(&self, fragment: String) -> Result<()> {
        WindowRuntime::submit(self, fragment)
    }

    fn query_active_source(&self) -> Result<()> {
        WindowRuntime::query_active_source(self)
    }
}

/// Executes one console line. Returns false when the user asked to quit.
///
/// Generation failures are reported and never reach `window`, so the active
/// session keeps running.
fn handle_line(
    line: &str,
    window: &impl ShaderTarget,
    client: &ShaderGenClient,
) -> Result<bool> {
    let command = match ConsoleCommand::parse(line) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err}");
            return Ok(true);
        }
    };

    match command {
        ConsoleCommand::Prompt(prompt) => {
            println!("generating shader...");
            match client.generate(&prompt) {
                Ok(shader) => window.submit(shader.source)?,
                Err(err) => {
                    tracing::warn!(error = %err, "shader generation failed");
                    eprintln!("failed to generate shader: {err}");
                }
            }
        }
        ConsoleCommand::Load(path) => match read_fragment(&path) {
            Ok(fragment) => window.submit(fragment)?,
            Err(err) => eprintln!("{err:#}"),
        },
        ConsoleCommand::Default => window.submit(DEFAULT_FRAGMENT_SHADER.to_string())?,
        ConsoleCommand::Eval(expression) => println!("{}", calculate(&expression)),
        ConsoleCommand::Show => window.query_active_source()?,
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Quit => return Ok(false),
        ConsoleCommand::Empty => {}
    }
    Ok(true)
}

fn report_signal(signal: WindowSignal) {
    match signal {
        WindowSignal::Activated { generation } => println!("activated generation {generation}"),
        WindowSignal::Rejected(diagnostic) => eprintln!("shader rejected: {diagnostic}"),
        WindowSignal::ActiveSource(source) => println!("{source}"),
        WindowSignal::Closed => {}
    }
}

/// Forwards stdin lines over a channel; the sender drops at end of input.
fn spawn_stdin_reader() -> Result<Receiver<String>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("promptshade-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })
        .context("failed to spawn stdin reader")?;
    Ok(rx)
}

/// Compiles and links a fragment shader file offline.
pub fn check(path: &Path) -> Result<ExitCode> {
    let fragment = read_fragment(path)?;
    match check_fragment(&fragment) {
        Ok(bindings) => {
            println!(
                "{}: ok (a_position@{}, u_resolution@{}, u_time@{})",
                path.display(),
                bindings.position.0,
                bindings.resolution.0,
                bindings.time.0
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(failed) => {
            eprintln!("{}: {failed}", path.display());
            Ok(ExitCode::FAILURE)
        }
    }
}

pub fn eval(expression: &str) -> ExitCode {
    println!("{}", calculate(expression));
    ExitCode::SUCCESS
}

/// Requests a shader and prints it or writes it to `output`. The exit code
/// reports whether the result builds.
pub fn generate(settings: &Settings, prompt: &str, output: Option<&Path>) -> Result<ExitCode> {
    let client = build_client(settings)?;
    let shader = client
        .generate(prompt)
        .context("failed to generate shader")?;

    match output {
        Some(path) => {
            fs::write(path, &shader.source)
                .with_context(|| format!("failed to write shader to {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote generated shader");
        }
        None => println!("{}", shader.source),
    }

    match check_fragment(&shader.source) {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(failed) => {
            eprintln!("generated shader does not build: {failed}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn build_client(settings: &Settings) -> Result<ShaderGenClient> {
    let config = GeneratorConfig::new(&settings.endpoint, settings.timeout)
        .context("invalid generator configuration")?;
    ShaderGenClient::new(config).context("failed to construct generator client")
}

fn read_fragment(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read fragment shader at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::io::{BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    #[derive(Default)]
    struct RecordingTarget {
        submitted: RefCell<Vec<String>>,
        queries: Cell<usize>,
    }

    impl ShaderTarget for RecordingTarget {
        fn submit(&self, fragment: String) -> Result<()> {
            self.submitted.borrow_mut().push(fragment);
            Ok(())
        }

        fn query_active_source(&self) -> Result<()> {
            self.queries.set(self.queries.get() + 1);
            Ok(())
        }
    }

    /// Answers one HTTP request with `status_line` and `body`.
    fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
                if line == "\r\n" {
                    break;
                }
            }
            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();
        });
        (endpoint, handle)
    }

    fn client_for(endpoint: &str) -> ShaderGenClient {
        let config = GeneratorConfig::new(endpoint, Duration::from_secs(5)).unwrap();
        ShaderGenClient::new(config).unwrap()
    }

    #[test]
    fn server_error_leaves_the_window_untouched() {
        let (endpoint, server) = serve_once("500 Internal Server Error", "{}");
        let target = RecordingTarget::default();

        let keep_going = handle_line("a lava lamp", &target, &client_for(&endpoint)).unwrap();
        server.join().unwrap();

        assert!(keep_going);
        assert!(target.submitted.borrow().is_empty());
    }

    #[test]
    fn generated_shader_is_submitted_without_fences() {
        let (endpoint, server) = serve_once(
            "200 OK",
            r#"{"response":"```glsl\nvoid main() {}\n```"}"#,
        );
        let target = RecordingTarget::default();

        handle_line("stripes", &target, &client_for(&endpoint)).unwrap();
        server.join().unwrap();

        assert_eq!(*target.submitted.borrow(), ["void main() {}".to_string()]);
    }

    #[test]
    fn local_commands_never_contact_the_generator() {
        let dir = TempDir::new().unwrap();
        let shader = dir.path().join("local.frag");
        fs::write(&shader, "void main() {}\n").unwrap();
        // Nothing listens here; any request would fail the submissions below.
        let client = client_for("http://127.0.0.1:9");
        let target = RecordingTarget::default();

        let load = format!(":load {}", shader.display());
        assert!(handle_line(&load, &target, &client).unwrap());
        assert!(handle_line(":default", &target, &client).unwrap());
        assert!(handle_line(":show", &target, &client).unwrap());
        assert!(!handle_line(":quit", &target, &client).unwrap());

        assert_eq!(
            *target.submitted.borrow(),
            ["void main() {}\n".to_string(), DEFAULT_FRAGMENT_SHADER.to_string()]
        );
        assert_eq!(target.queries.get(), 1);
    }
}
