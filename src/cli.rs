use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};

use pseudoc::lexer::tokenize;
use pseudoc::{compile, parse_program, CompileError, Emitter, Program, TextEmitter, ThreeAddressEmitter};

/// pseudoc CLI
#[derive(Parser, Debug)]
#[command(name = "pseudoc", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a source file and print the emitted code
    Emit {
        /// Input source file
        input: PathBuf,
        /// Write the output here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Backend::Text)]
        backend: Backend,
        /// Spaces per nesting level (text backend only)
        #[arg(long, default_value_t = 4)]
        indent: usize,
    },
    /// Print the token stream, one token per line
    Tokens {
        input: PathBuf,
    },
    /// Print every declared variable with its type, width and offset
    Symbols {
        input: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// C-like pseudocode
    Text,
    /// Three-address code with temporaries and labels
    ThreeAddress,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Emit { input, output, backend, indent } => run_emit(&input, output.as_deref(), backend, indent),
        Commands::Tokens { input } => run_tokens(&input),
        Commands::Symbols { input } => run_symbols(&input),
    }
}

fn read_source(input: &Path) -> Result<String> {
    fs::read_to_string(input).with_context(|| format!("failed to read input file {:?}", input))
}

fn display_name(input: &Path) -> &str {
    input.to_str().unwrap_or("<input>")
}

fn fail(src: &str, input: &Path, err: CompileError) -> anyhow::Error {
    crate::diagnostics::report_compile_error(src, display_name(input), &err);
    anyhow::anyhow!("compilation of {:?} failed", input)
}

fn run_emit(input: &Path, output: Option<&Path>, backend: Backend, indent: usize) -> Result<()> {
    let src = read_source(input)?;
    let code = match backend {
        Backend::Text => {
            let mut out = TextEmitter::with_indent(indent);
            emit_with(&src, input, &mut out)?;
            out.into_code()
        }
        Backend::ThreeAddress => {
            let mut out = ThreeAddressEmitter::new();
            emit_with(&src, input, &mut out)?;
            out.into_code()
        }
    };
    match output {
        Some(path) => {
            fs::write(path, &code).with_context(|| format!("failed to write output to {:?}", path))?;
            log::info!("wrote {} byte(s) to {:?}", code.len(), path);
        }
        None => print!("{}", code),
    }
    Ok(())
}

fn emit_with(src: &str, input: &Path, out: &mut dyn Emitter) -> Result<Program> {
    compile(src, out).map_err(|err| fail(src, input, err))
}

fn run_tokens(input: &Path) -> Result<()> {
    let src = read_source(input)?;
    let mut listing = String::new();
    for tok in tokenize(&src) {
        writeln!(listing, "{} {} {}", tok.loc, tok.tag(), tok.lexeme)?;
    }
    print!("{}", listing);
    Ok(())
}

fn run_symbols(input: &Path) -> Result<()> {
    let src = read_source(input)?;
    let program = parse_program(&src).map_err(|err| fail(&src, input, err))?;
    for id in &program.symbols {
        println!("{:<12} {:<16} width {:<6} offset {}", id.name, id.ty.to_string(), id.ty.width(), id.offset);
    }
    println!("frame size {}", program.frame_size);
    Ok(())
}
