mod cli;
mod config;
mod console;
mod evaluator;
mod paths;
mod run;

use std::process::ExitCode;

use anyhow::Result;
use cli::Command;

fn main() -> Result<ExitCode> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Check { file }) => run::check(&file),
        Some(Command::Eval { expression }) => Ok(run::eval(&expression.join(" "))),
        Some(Command::Generate { prompt, output }) => {
            let settings = config::load(&cli.settings)?;
            run::generate(&settings, &prompt.join(" "), output.as_deref())
        }
        None => {
            let settings = config::load(&cli.settings)?;
            run::run(settings)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
