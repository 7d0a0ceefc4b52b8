use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

use calc::builtins::Builtins;
use calc::diagnostic::{Diagnostic, ansi::AnsiRenderer, json, registry};
use calc::{lexer, parser};

#[derive(Parser, Debug)]
#[command(name = "calc", version)]
#[command(about = "Evaluate arithmetic expressions, or compile them to portable archives")]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Expression to evaluate. Words are joined with single spaces, so
    /// `calc 3 - 5` reads as `3 - 5`.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        allow_negative_numbers = true
    )]
    expr: Vec<String>,

    /// Print an intermediate stage instead of the result
    #[arg(long, value_enum)]
    emit: Option<Emit>,

    /// Report errors as JSON on stderr
    #[arg(long, global = true)]
    json: bool,

    /// Disable coloured error output (also honours NO_COLOR)
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a source file into an archive
    Build {
        file: PathBuf,
        /// Output path (defaults to the input with a `.cb` extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a compiled archive
    Run { archive: PathBuf },
    /// Parse, compile and run a source file
    File { file: PathBuf },
    /// Explain a diagnostic code, e.g. `calc explain CALC-P001`
    Explain { code: String },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Emit {
    Tokens,
    Ast,
    Bytecode,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let builtins = Builtins::standard();
    if let Err(d) = dispatch(&cli, &builtins) {
        if cli.json {
            eprintln!("{}", json::render(&d));
        } else {
            let mut renderer = AnsiRenderer::from_env();
            renderer.use_color &= !cli.no_color;
            eprint!("{}", renderer.render(&d));
        }
        process::exit(1);
    }
}

fn dispatch(cli: &Cli, builtins: &Builtins) -> Result<(), Diagnostic> {
    match &cli.command {
        None => {
            let source = cli.expr.join(" ");
            match cli.emit {
                None => print_value(evaluate(&source, builtins)?),
                Some(emit) => print_stage(emit, &source, builtins)?,
            }
        }
        Some(Command::File { file }) => {
            let source = read_source(file)?;
            print_value(evaluate(&source, builtins)?);
        }
        Some(Command::Build { file, output }) => {
            let source = read_source(file)?;
            let bytes = calc::build(&source, builtins).map_err(|e| diagnose(&e, &source))?;
            let out = output.clone().unwrap_or_else(|| file.with_extension("cb"));
            fs::write(&out, &bytes).map_err(|e| io_error("cannot write", &out, e))?;
            debug!(path = %out.display(), bytes = bytes.len(), "wrote archive");
        }
        Some(Command::Run { archive }) => {
            let bytes = fs::read(archive).map_err(|e| io_error("cannot read", archive, e))?;
            let value = calc::execute(&bytes, builtins).map_err(|e| Diagnostic::from(&e))?;
            print_value(value);
        }
        Some(Command::Explain { code }) => {
            let entry = registry::lookup(code)
                .ok_or_else(|| Diagnostic::error(format!("unknown diagnostic code '{code}'")))?;
            print!("{}", entry.long);
        }
    }
    Ok(())
}

fn evaluate(source: &str, builtins: &Builtins) -> Result<f64, Diagnostic> {
    calc::evaluate(source, builtins).map_err(|e| diagnose(&e, source))
}

fn print_stage(emit: Emit, source: &str, builtins: &Builtins) -> Result<(), Diagnostic> {
    match emit {
        Emit::Tokens => {
            for token in lexer::tokenize(source) {
                println!("{} {}", token.location, token);
            }
        }
        Emit::Ast => {
            let expr = parser::parse(source).map_err(|e| diagnose(&calc::Error::from(e), source))?;
            let text = serde_json::to_string_pretty(&expr)
                .map_err(|e| Diagnostic::error(format!("cannot serialize AST: {e}")))?;
            println!("{text}");
        }
        Emit::Bytecode => {
            let program = calc::compile_source(source, builtins).map_err(|e| diagnose(&e, source))?;
            print!("{}", program.disassemble());
        }
    }
    Ok(())
}

/// Source text is only attached where a span points into it.
fn diagnose(e: &calc::Error, source: &str) -> Diagnostic {
    let d = Diagnostic::from(e);
    match e {
        calc::Error::Parse(_) => d.with_source(source),
        _ => d,
    }
}

fn read_source(path: &Path) -> Result<String, Diagnostic> {
    fs::read_to_string(path).map_err(|e| io_error("cannot read", path, e))
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> Diagnostic {
    Diagnostic::error(format!("{action} {}: {e}", path.display()))
}

fn print_value(value: f64) {
    println!("{value}");
}
