//! DCPU-16 C Compiler Driver
//!
//! Command-line entry point. The C parser lives in an external frontend;
//! this binary accepts the typed AST it produces as JSON, runs the code
//! generator, and writes the assembly text.

use clap::Parser;
use dcc_ast::TranslationUnit;
use dcc_codegen::Compiler;
use log::debug;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "dcc")]
#[command(about = "DCPU-16 C compiler (typed AST in, assembly out)")]
#[command(version)]
struct Cli {
    /// Input AST file (JSON produced by the frontend)
    input: PathBuf,

    /// Output assembly file (defaults to the input path with extension `asm`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also print the generated assembly to stdout
    #[arg(long)]
    print_asm: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(&cli.input)?;
    let unit: TranslationUnit = serde_json::from_str(&source)?;
    debug!(
        "loaded translation unit from {} ({} items)",
        cli.input.display(),
        unit.items.len()
    );

    let mut compiler = Compiler::new();
    let result = compiler.compile(&unit);
    for diagnostic in compiler.diagnostics() {
        eprintln!("{}", diagnostic);
    }
    let asm = result?;

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| cli.input.with_extension("asm"));
    fs::write(&output, &asm)?;
    debug!("assembly written to {}", output.display());

    if cli.print_asm {
        print!("{}", asm);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
