use jpw_core::{JsonPath, Validation, validate};
use serde_json::Value;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;
use tracing::debug;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const USAGE: &str = "Usage: jpw [OPTIONS] <QUERY> [FILE]\n\nFor more information, try '--help'";

/// Environment variable holding the log filter
const LOG_ENV: &str = "JPW_LOG";

fn print_help() {
    println!(
        "jpw {VERSION} - JSONPath-style queries with filter expressions

Usage: jpw [OPTIONS] <QUERY> [FILE]

Arguments:
  <QUERY>    Query, e.g. \"$.store.book[?(@.price < 10)].title\"
  [FILE]     Input JSON file (reads from stdin if omitted)

Options:
  -c, --check    Only validate the query, do not read any input
  -v, --verbose  Log debug output to stderr (overrides {LOG_ENV})
  -h, --help     Show this help message
  -V, --version  Show version"
    );
}

fn print_version() {
    println!("jpw {VERSION}");
}

enum ParsedArgs {
    Help,
    Version,
    Check {
        query: String,
        verbose: bool,
    },
    Query {
        query: String,
        file: Option<String>,
        verbose: bool,
    },
}

fn parse_args() -> Result<ParsedArgs, String> {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut positional = Vec::new();
    let mut check = false;
    let mut verbose = false;

    for arg in &args {
        match arg.as_str() {
            "-h" | "--help" => return Ok(ParsedArgs::Help),
            "-V" | "--version" => return Ok(ParsedArgs::Version),
            "-c" | "--check" => check = true,
            "-v" | "--verbose" => verbose = true,
            s if s.starts_with('-') => {
                return Err(format!("unknown option: {s}\n\n{USAGE}"));
            }
            _ => positional.push(arg.clone()),
        }
    }

    let count = positional.len();
    let mut iter = positional.into_iter();
    let (Some(query), file) = (iter.next(), iter.next()) else {
        return Err(format!("missing required argument: <QUERY>\n\n{USAGE}"));
    };
    if count > 2 {
        return Err(format!("too many arguments\n\n{USAGE}"));
    }

    if check {
        if file.is_some() {
            return Err(format!("--check takes no input file\n\n{USAGE}"));
        }
        return Ok(ParsedArgs::Check { query, verbose });
    }
    Ok(ParsedArgs::Query {
        query,
        file,
        verbose,
    })
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn read_input(file: Option<&str>) -> Result<String, String> {
    match file {
        Some(path) => {
            fs::read_to_string(path).map_err(|e| format!("error reading file '{path}': {e}"))
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("error reading stdin: {e}"))?;
            Ok(buffer)
        }
    }
}

fn run() -> Result<(), String> {
    let args = parse_args()?;

    match args {
        ParsedArgs::Help => {
            print_help();
            Ok(())
        }
        ParsedArgs::Version => {
            print_version();
            Ok(())
        }
        ParsedArgs::Check { query, verbose } => {
            init_logging(verbose);
            match validate(&query).map_err(|e| format!("internal error: {e}"))? {
                Validation::Valid => {
                    println!("valid");
                    Ok(())
                }
                Validation::Invalid(message) => Err(format!("invalid query: {message}")),
            }
        }
        ParsedArgs::Query {
            query,
            file,
            verbose,
        } => {
            init_logging(verbose);

            let path = JsonPath::parse(&query).map_err(|e| format!("error in query: {e}"))?;

            let input = read_input(file.as_deref())?;
            let json: Value =
                serde_json::from_str(&input).map_err(|e| format!("error parsing JSON: {e}"))?;

            let results = path.query(&json);
            debug!(results = results.len(), "query finished");

            let output = serde_json::to_string_pretty(&results)
                .map_err(|e| format!("error serializing output: {e}"))?;

            println!("{output}");
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("jpw: {e}");
            ExitCode::FAILURE
        }
    }
}
