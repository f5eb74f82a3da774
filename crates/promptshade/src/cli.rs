use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "promptshade",
    author,
    version,
    about = "Generate GLSL fragment shaders from prompts and run them live",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub settings: SettingsArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Base URL of the shader generation service.
    #[arg(long, env = "PROMPTSHADE_ENDPOINT", value_name = "URL", global = true)]
    pub endpoint: Option<String>,

    /// Request timeout for the generation service.
    #[arg(long, value_name = "SECONDS", global = true)]
    pub timeout: Option<u64>,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT")]
    pub size: Option<String>,

    /// Optional FPS cap (0=uncapped, follows vsync).
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Fragment shader to start with instead of the built-in default.
    #[arg(long, value_name = "FILE")]
    pub shader: Option<PathBuf>,

    /// Directory holding `config.toml`.
    #[arg(long, env = "PROMPTSHADE_CONFIG_DIR", value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile and link a fragment shader without opening a window.
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Evaluate an arithmetic expression.
    Eval {
        #[arg(value_name = "EXPR", required = true, num_args = 1.., allow_hyphen_values = true)]
        expression: Vec<String>,
    },
    /// Request a shader from the generation service and print it.
    Generate {
        #[arg(value_name = "PROMPT", required = true, num_args = 1..)]
        prompt: Vec<String>,

        /// Write the shader to a file instead of stdout.
        #[arg(long, short, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
