use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::filter::LevelFilter;
use upl_core::{compile, parse_tokens, tokenize};

/// Compile a UPL program to Python and run it.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        default_value = "test.upl",
        help = "Source file to compile; `-` reads standard input"
    )]
    input: String,

    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Write the emitted text to this file instead of stdout"
    )]
    output: Option<String>,

    #[arg(
        long,
        value_name = "FORMAT",
        default_value = "python",
        help = "Output format: python, tokens, ast"
    )]
    emit: String,

    #[arg(long, help = "Compile only; do not execute the generated program")]
    no_run: bool,

    #[arg(
        long,
        value_name = "PROGRAM",
        default_value = "python3",
        help = "Interpreter used to execute the generated program"
    )]
    python: String,

    #[arg(short, long, help = "Do not echo the generated program before running it")]
    quiet: bool,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity (-v, -vv, -vvv)")]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute(cli)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn execute(cli: Cli) -> Result<()> {
    let source = read_source(&cli.input)?;
    debug!(input = %cli.input, bytes = source.len(), "read source");

    match cli.emit.as_str() {
        "python" => {
            let artifact = compile(&source)?;
            match &cli.output {
                Some(path) => write_output(path, artifact.code.as_bytes())?,
                None if !cli.quiet => print!("{}", artifact.code),
                None => {}
            }
            if !cli.no_run {
                run_python(&cli.python, &artifact.code)?;
            }
        }
        "tokens" => {
            let tokens = tokenize(&source)?;
            let listing: String = tokens
                .iter()
                .enumerate()
                .map(|(index, token)| {
                    format!(
                        "{index:4} {:>5}..{:<5} {:?}\n",
                        token.span.start, token.span.end, token.kind
                    )
                })
                .collect();
            emit_text(cli.output.as_deref(), &listing)?;
        }
        "ast" => {
            let tokens = tokenize(&source)?;
            let program = parse_tokens(&tokens)?;
            emit_text(cli.output.as_deref(), &format!("{program:#?}\n"))?;
        }
        other => return Err(anyhow::anyhow!("unsupported emit format: {other}")),
    }

    Ok(())
}

fn read_source(input: &str) -> Result<String> {
    if input == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read source from stdin")?;
        return Ok(buffer);
    }
    fs::read_to_string(input).with_context(|| format!("failed to read input file {input}"))
}

fn emit_text(output: Option<&str>, text: &str) -> Result<()> {
    match output {
        Some(path) => write_output(path, text.as_bytes()),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn write_output(path: &str, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = PathBuf::from(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {parent:?}"))?;
        }
    }
    fs::write(path, bytes).with_context(|| format!("failed to write output file {path}"))?;
    info!(path, bytes = bytes.len(), "wrote output");
    Ok(())
}

/// Feeds the generated program to `<interpreter> -` with stdout and
/// stderr inherited, so the program's output appears as our own.
fn run_python(interpreter: &str, code: &str) -> Result<()> {
    io::stdout().flush().context("failed to flush stdout")?;

    let mut child = Command::new(interpreter)
        .arg("-")
        .stdin(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to start interpreter {interpreter}"))?;

    {
        let mut stdin = child
            .stdin
            .take()
            .context("interpreter stdin was not captured")?;
        stdin
            .write_all(code.as_bytes())
            .context("failed to send generated program to interpreter")?;
    }

    let status = child.wait().context("failed to wait for interpreter")?;
    info!(%status, "generated program finished");
    if !status.success() {
        bail!("generated program exited with {status}");
    }
    Ok(())
}
