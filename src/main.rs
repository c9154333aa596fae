use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use tempfile::NamedTempFile;

use vmil_translator::driver::{collect_sources, default_output, translate_program};
use vmil_translator::{Options, Translator};

#[derive(Parser)]
#[command(name = "vmil")]
#[command(about = "Translate VM code into Hack assembly")]
struct Args {
    /// A .vm file, or a directory of them
    input: PathBuf,

    /// Output file (defaults to <input>.asm, or <dir>/<dir>.asm)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Emit bootstrap code that sets SP and calls Sys.init
    #[arg(long)]
    bootstrap: bool,

    /// Precede each command's code with a comment
    #[arg(long)]
    annotate: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let sources = collect_sources(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input));

    // Write next to the target and only replace it once translation succeeds.
    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let tmp = NamedTempFile::new_in(&dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;

    let options = Options {
        bootstrap: args.bootstrap,
        annotate: args.annotate,
    };
    let mut translator = Translator::with_options(BufWriter::new(tmp), options);
    let count = translate_program(&sources, &mut translator)
        .with_context(|| format!("translating {}", args.input.display()))?;

    let mut writer = translator.into_inner();
    writer.flush()?;
    let tmp = writer.into_inner().context("flushing output")?;
    tmp.persist(&output)
        .with_context(|| format!("writing {}", output.display()))?;

    info!(
        "translated {} commands from {} file(s) into {}",
        count,
        sources.len(),
        output.display()
    );

    Ok(())
}
