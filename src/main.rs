use std::fs;

use anyhow::{Context, Result};
use clap::Parser;

use cruxc::{
    ast::typed::Program,
    commandline::{Operation, Options},
    lower,
};

fn main() -> Result<()> {
    let options = Options::parse();

    stderrlog::new()
        .module("cruxc")
        .quiet(options.quiet)
        .verbosity(options.log_level())
        .init()?;

    match &options.operation {
        Operation::Compile { file, output } => {
            let program = read_program(file)?;
            let assembly = cruxc::compile(&program)
                .with_context(|| format!("Failed to compile {}", file))?;
            fs::write(output, assembly).with_context(|| format!("Failed to write {}", output))?;
            log::info!("Wrote {}", output);
        }
        Operation::Ir { file } => {
            let program = read_program(file)?;
            let lowered = lower::lower(&program)
                .with_context(|| format!("Failed to lower {}", file))?;
            print!("{}", lowered);
        }
    }
    Ok(())
}

fn read_program(file: &str) -> Result<Program> {
    let content = fs::read_to_string(file).with_context(|| format!("Failed to read {}", file))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not a typed program", file))
}
