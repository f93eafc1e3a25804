use std::{fs, io::Write, path::PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser};
use clap_stdin::FileOrStdin;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(version, about = "Compiles a Lua-like source file to 32-bit x86 NASM assembly")]
struct Args {
    /// Source file, or `-` to read from stdin
    input: FileOrStdin,

    /// Output path [default: the input path with an `.asm` extension, or stdout for stdin]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(level)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let output = match args.output {
        Some(path) => Some(path),
        None if args.input.is_stdin() => None,
        None => Some(PathBuf::from(args.input.filename()).with_extension("asm")),
    };
    let input_name = args.input.filename().to_string();

    info!(input = %input_name, "compiling");
    let source = args
        .input
        .contents()
        .with_context(|| format!("reading {input_name}"))?;

    let asm = lunac::compile(&source).with_context(|| format!("compiling {input_name}"))?;

    match output {
        Some(path) => {
            fs::write(&path, asm).with_context(|| format!("writing {}", path.display()))?;
            info!(output = %path.display(), "wrote assembly");
        }
        None => std::io::stdout()
            .write_all(asm.as_bytes())
            .context("writing to stdout")?,
    }

    Ok(())
}
