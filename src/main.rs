use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use bumpalo::Bump;
use chasm::ChasmError;
use clap::Parser;
use thiserror::Error;
use tracing::{debug, info};

/// chasm - assemble stack-machine bytecode into csmx modules
#[derive(Parser, Debug)]
#[command(name = "chasm")]
#[command(about = "Assemble chasm source files into csmx modules", long_about = None)]
struct Args {
    /// Output path (only valid with a single input). Defaults to the input with a .csmx extension
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Write the module bytes to stdout instead of a file
    #[arg(long, conflicts_with = "output")]
    stdout: bool,

    /// Print the resolved instruction listing
    #[arg(long)]
    listing: bool,

    /// Run the whole pipeline without writing any output
    #[arg(long, conflicts_with_all = ["output", "stdout"])]
    check: bool,

    /// Source files to assemble
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("--output requires exactly one input file, got {0}")]
    OutputWithManyInputs(usize),

    #[error("cannot read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("cannot write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("{}: {rendered}", .path.display())]
    Assemble { path: PathBuf, rendered: String },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging subscriber
    use tracing_subscriber::{EnvFilter, fmt};

    // RUST_LOG controls the level, warn when unset
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).init();

    if args.output.is_some() && args.files.len() != 1 {
        report(&CliError::OutputWithManyInputs(args.files.len()));
        return ExitCode::FAILURE;
    }

    let mut failed = false;
    for file in &args.files {
        if let Err(e) = assemble_file(&args, file) {
            report(&e);
            failed = true;
        }
    }

    if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn report(error: &CliError) {
    eprintln!("{}", error.to_string().trim_end());
}

fn assemble_file(args: &Args, input: &Path) -> Result<(), CliError> {
    debug!(file = %input.display(), "assembling");
    let source = fs::read_to_string(input).map_err(|source| CliError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    let rendered = |e: ChasmError| CliError::Assemble {
        path: input.to_path_buf(),
        rendered: e.display_with_source(&source),
    };

    let arena = Bump::new();
    let module = chasm::compile(&source, &arena).map_err(rendered)?;
    if args.listing {
        print!("{}", module.listing());
    }
    let bytes = chasm::compiler::emit_module(&module).map_err(|e| rendered(e.into()))?;
    info!(file = %input.display(), bytes = bytes.len(), "assembled");

    if args.check {
        return Ok(());
    }

    if args.stdout {
        let mut stdout = io::stdout().lock();
        return stdout
            .write_all(&bytes)
            .and_then(|()| stdout.flush())
            .map_err(|source| CliError::Write {
                path: PathBuf::from("<stdout>"),
                source,
            });
    }

    let output = args.output.clone().unwrap_or_else(|| input.with_extension("csmx"));
    fs::write(&output, &bytes).map_err(|source| CliError::Write { path: output, source })
}
