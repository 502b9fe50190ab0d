use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use rox::ast_printer::AstPrinter;
use rox::parser::Parser;
use rox::scanner::{scan_all, Scanner};
use rox::{LoxError, Session};

#[derive(ClapParser, Debug)]
#[command(version, about = "Lox language interpreter", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,

    /// Enable logging to app.log
    #[arg(long, global = true)]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes input from a file, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print one JSON object per token instead of the text form
        #[arg(long)]
        json: bool,
    },

    /// Parses input from a file as a single expression and prints its AST
    Parse {
        filename: Option<PathBuf>,

        /// Print the tree in reverse Polish notation
        #[arg(long)]
        rpn: bool,
    },

    /// Evaluates input from a file as a single expression and prints the result
    Evaluate { filename: Option<PathBuf> },

    /// Runs input from a file as a Lox program
    Run { filename: Option<PathBuf> },

    /// Starts an interactive prompt (the default with no subcommand)
    Repl,
}

/// Reads the contents of a file into a String
fn read_file(filename: PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(&filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = String::new();

    let bytes = reader
        .read_to_string(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    Ok(buf)
}

fn init_logger() -> Result<()> {
    let log_file = File::create("app.log").context("Failed to create app.log")?;

    // Debug by default; RUST_LOG narrows it.
    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("rox::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
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
        .parse_default_env()
        .init();

    info!("Logger initialized, writing to app.log");
    Ok(())
}

/// Print every error to stderr and return the most severe exit code.
fn report(errors: &[LoxError]) -> i32 {
    for e in errors {
        debug!("Reporting: {:?}", e);
        eprintln!("{}", e);
    }

    errors.iter().map(LoxError::exit_code).max().unwrap_or(0)
}

fn no_input() -> ! {
    info!("No filepath provided");
    println!("No input filepath was provided. Exiting...");
    std::process::exit(0);
}

fn tokenize(source: &str, json: bool) -> Result<i32> {
    let mut failed = false;

    for result in Scanner::new(source) {
        match result {
            Ok(token) if json => println!("{}", serde_json::to_string(&token)?),
            Ok(token) => println!("{}", token),
            Err(e) => {
                failed = true;
                eprintln!("{}", e);
            }
        }
    }

    Ok(if failed { 65 } else { 0 })
}

fn parse(source: &str, rpn: bool) -> i32 {
    let (tokens, errors) = scan_all(source);
    if !errors.is_empty() {
        return report(&errors);
    }

    match Parser::new(&tokens).parse_expression() {
        Ok(expr) => {
            if rpn {
                println!("{}", AstPrinter::print_rpn(&expr));
            } else {
                println!("{}", AstPrinter::print(&expr));
            }
            0
        }
        Err(e) => report(&[e]),
    }
}

fn evaluate(source: &str) -> i32 {
    match Session::new().evaluate_expression(source) {
        Ok(value) => {
            println!("{}", value);
            0
        }
        Err(errors) => report(&errors),
    }
}

fn run(source: &str) -> i32 {
    match Session::new().run(source) {
        Ok(()) => 0,
        Err(errors) => report(&errors),
    }
}

fn repl() -> Result<i32> {
    let mut editor = DefaultEditor::new().context("Failed to start line editor")?;
    let mut session = Session::repl();

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());

                // A failing line is reported and the session carries on.
                if let Err(errors) = session.run(&line) {
                    report(&errors);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                return Err(err).context("Failed to read line");
            }
        }
    }

    Ok(0)
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    let code: i32 = match args.commands.unwrap_or(Commands::Repl) {
        Commands::Tokenize { filename, json } => {
            let filename = filename.unwrap_or_else(|| no_input());
            tokenize(&read_file(filename)?, json)?
        }

        Commands::Parse { filename, rpn } => {
            let filename = filename.unwrap_or_else(|| no_input());
            parse(&read_file(filename)?, rpn)
        }

        Commands::Evaluate { filename } => {
            let filename = filename.unwrap_or_else(|| no_input());
            evaluate(&read_file(filename)?)
        }

        Commands::Run { filename } => {
            let filename = filename.unwrap_or_else(|| no_input());
            run(&read_file(filename)?)
        }

        Commands::Repl => repl()?,
    };

    if code != 0 {
        debug!("Exiting with code {}", code);
        std::process::exit(code);
    }

    Ok(())
}
