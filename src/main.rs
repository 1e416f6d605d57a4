use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use memmap2::Mmap;

use dymond::ast_printer::AstPrinter;
use dymond::error::{DymondError, Reporter};
use dymond::interpreter::Interpreter;
use dymond::parser::Parser;
use dymond::runner::{RunStatus, Runner};
use dymond::scanner::{scan_tokens, Scanner};
use dymond::token::Token;

const EXIT_USAGE: i32 = 64;
const EXIT_COMPILE: i32 = 65;
const EXIT_RUNTIME: i32 = 70;

#[derive(ClapParser, Debug)]
#[command(version, about = "Dymond language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a file, printing each token
    Tokenize {
        filename: PathBuf,

        /// Emit the token list as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parses a file and prints the AST of every statement
    Parse { filename: PathBuf },

    /// Runs a file as a Dymond program
    Run { filename: PathBuf },

    /// Starts an interactive session
    Repl,
}

/// Prints diagnostics to stderr with the offending line and a caret, and
/// remembers which kinds it has seen.
#[derive(Default)]
struct StderrReporter {
    compile_errors: usize,
    runtime_errors: usize,
}

impl Reporter for StderrReporter {
    fn report(&mut self, error: DymondError) {
        debug!("Reporting: {}", error);

        if error.is_compile_time() {
            self.compile_errors += 1;
        } else {
            self.runtime_errors += 1;
        }

        eprintln!("{}", error);

        if let Some(d) = error.diagnostic() {
            if !d.source_line.is_empty() {
                eprintln!("{:>5} | {}", d.line, d.source_line);
                eprintln!("{:>5} | {}^", "", " ".repeat(d.column.saturating_sub(1)));
            }
        }
    }
}

/// Maps the whole file and validates it as UTF-8.
fn read_source(filename: &Path) -> Result<String> {
    info!("Reading file: {:?}", filename);

    let file = File::open(filename).with_context(|| format!("Failed to open file {:?}", filename))?;
    let len: u64 = file
        .metadata()
        .with_context(|| format!("Failed to stat file {:?}", filename))?
        .len();

    // Zero-length files cannot be mapped.
    if len == 0 {
        return Ok(String::new());
    }

    // SAFETY: the map is read-only and copied out before returning.
    let map = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map file {:?}", filename))?;
    let text: &str =
        std::str::from_utf8(&map).with_context(|| format!("File {:?} is not valid UTF-8", filename))?;

    info!("Read {} bytes from {:?}", len, filename);

    Ok(text.to_owned())
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record.module_path().unwrap_or("<unnamed>");
            let module = module.strip_prefix("dymond::").unwrap_or(module);
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

fn tokenize(source: &str, json: bool) -> Result<i32> {
    let mut reporter = StderrReporter::default();
    let mut tokens: Vec<Token> = Vec::new();

    for token in Scanner::new(source) {
        match token {
            Ok(token) if json => tokens.push(token),
            Ok(token) => println!("{}", token),
            Err(e) => reporter.report(e),
        }
    }

    if json {
        let rendered: String =
            serde_json::to_string_pretty(&tokens).context("Failed to serialise tokens")?;
        println!("{}", rendered);
    }

    Ok(if reporter.compile_errors > 0 { EXIT_COMPILE } else { 0 })
}

fn parse(source: &str) -> i32 {
    let mut reporter = StderrReporter::default();

    let (tokens, lex_errors) = scan_tokens(source);
    for e in lex_errors {
        reporter.report(e);
    }

    match Parser::new(tokens).parse() {
        Ok(statements) => {
            for stmt in &statements {
                println!("{}", AstPrinter::print_stmt(stmt));
            }
        }
        Err(errors) => {
            for e in errors {
                reporter.report(e);
            }
        }
    }

    if reporter.compile_errors > 0 {
        EXIT_COMPILE
    } else {
        0
    }
}

fn run(source: &str) -> i32 {
    let mut reporter = StderrReporter::default();
    let mut runner = Runner::new(Interpreter::new());

    match runner.run(source, &mut reporter) {
        RunStatus::Ok => 0,
        RunStatus::CompileError => EXIT_COMPILE,
        RunStatus::RuntimeError => EXIT_RUNTIME,
    }
}

fn repl() -> Result<i32> {
    info!("Starting REPL");

    let mut reporter = StderrReporter::default();
    let mut runner = Runner::new(Interpreter::new()).repl(true);

    loop {
        write!(runner.interpreter().output(), "> ").context("Failed to write prompt")?;

        // Shares the interpreter's stdin buffer with `input()`.
        let line: Option<String> = runner
            .interpreter()
            .read_line()
            .map_err(|e| anyhow::anyhow!("Failed to read input: {}", e))?;

        let Some(line) = line else {
            println!();
            break;
        };

        if line.trim().is_empty() {
            continue;
        }

        let status: RunStatus = runner.run(&line, &mut reporter);
        debug!("REPL line finished: {:?}", status);
    }

    info!(
        "REPL ended ({} compile errors, {} runtime errors)",
        reporter.compile_errors, reporter.runtime_errors
    );
    Ok(0)
}

fn main() -> Result<()> {
    let args: Cli = match Cli::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code: i32 = if err.use_stderr() { EXIT_USAGE } else { 0 };
            let _ = err.print();
            process::exit(code);
        }
    };

    if args.log {
        init_logger()?;
    } else {
        Builder::new().filter_level(log::LevelFilter::Off).init();
    }

    info!("CLI arguments: {:?}", args);

    let code: i32 = match args.commands {
        Commands::Tokenize { filename, json } => tokenize(&read_source(&filename)?, json)?,
        Commands::Parse { filename } => parse(&read_source(&filename)?),
        Commands::Run { filename } => run(&read_source(&filename)?),
        Commands::Repl => repl()?,
    };

    if code != 0 {
        debug!("Exiting with code {}", code);
        process::exit(code);
    }

    Ok(())
}
