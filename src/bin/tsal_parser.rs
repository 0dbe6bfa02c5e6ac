use clap::Parser;
use std::path::PathBuf;

use tsal::errors::*;
use tsal::{Interpreter, SourceFile};

/// Parses a TSAL domain and/or problem and prints them back in canonical form.
///
/// Files ending with `pddl` are treated as legacy PDDL sources and converted to TSAL
/// (next to the original file) before being parsed.
#[derive(Debug, Parser)]
#[command(name = "tsal-parser", rename_all = "kebab-case")]
struct Args {
    /// Path to the domain file.
    #[arg(long, short)]
    domain: Option<PathBuf>,
    /// Path to the problem file.
    #[arg(long, short)]
    problem: Option<PathBuf>,
    /// Treat all inputs as legacy PDDL, whatever their extension.
    #[arg(long)]
    legacy: bool,
    /// Logging level to use: one of "error", "warn", "info", "debug", "trace"
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

fn main() -> Res<()> {
    let opt = Args::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(opt.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(Message::error)?;

    if opt.domain.is_none() && opt.problem.is_none() {
        return Err(Message::error("Nothing to parse: provide a domain (-d) and/or a problem (-p)"));
    }
    for file in opt.domain.iter().chain(opt.problem.iter()) {
        if !file.exists() {
            return Err(Message::error(format!("File {} does not exist", file.display())));
        }
    }

    let source = |path: PathBuf| {
        if opt.legacy {
            SourceFile::legacy(path)
        } else {
            SourceFile::detect(path)
        }
    };
    let interpreter = Interpreter::new(opt.domain.clone().map(source), opt.problem.clone().map(source))?;

    for warning in interpreter.diagnostics() {
        eprintln!("{warning}");
    }
    if let Some(domain) = interpreter.render_domain()? {
        println!("{domain}");
    }
    if let Some(problem) = interpreter.render_problem()? {
        println!("{problem}");
    }
    Ok(())
}
