//! `jast` CLI: format, validate and query JSON documents through the jast tree.
//!
//! ## Usage
//!
//! ```sh
//! # Compact JSON (stdin to stdout)
//! echo '{"a": [1, 2]}' | jast fmt
//!
//! # Indent with two spaces, file to file
//! jast fmt --indent '  ' -i data.json -o pretty.json
//!
//! # Check a document and report the first syntax error
//! jast validate -i data.json
//!
//! # Print the subtree at a dotted path
//! jast get web-app.servlet.0.servlet-name -i config.json
//!
//! # List the keys of an object or the indices of an array
//! jast keys web-app -i config.json
//!
//! # Node counts
//! jast stats -i config.json
//! ```
//!
//! Diagnostics go to stderr. `--verbose` raises the log level to debug;
//! `RUST_LOG` overrides both.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use jast_core::{Node, Style, Tree};
use std::io::{self, Read};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jast", version, about = "JSON AST tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log parser and tree activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Lex on a background thread while parsing
    #[arg(long, global = true)]
    threaded: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Reformat a document
    Fmt {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Indent unit; multi-line output when given
        #[arg(long, conflicts_with_all = ["spaced", "debug"])]
        indent: Option<String>,
        /// Single line with a space after each comma and colon
        #[arg(long, conflicts_with = "debug")]
        spaced: bool,
        /// Mark every formatting hook position
        #[arg(long)]
        debug: bool,
    },
    /// Check that the input is a single well-formed JSON value
    Validate {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Print the node at a dotted path
    Get {
        /// Dotted path, e.g. `servers.0.host`
        path: String,
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Indent unit for the printed node
        #[arg(long)]
        indent: Option<String>,
    },
    /// List object keys or array indices, one per line
    Keys {
        /// Dotted path of the container (the root if omitted)
        path: Option<String>,
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
    /// Show node counts for a document
    Stats {
        /// Input file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Fmt {
            input,
            output,
            indent,
            spaced,
            debug,
        } => {
            let tree = load(input.as_deref(), cli.threaded)?;
            let style = match (indent, spaced, debug) {
                (Some(unit), _, _) => Style::indented(unit),
                (None, true, _) => Style::spaced(),
                (None, false, true) => Style::debug(),
                (None, false, false) => Style::compact(),
            };
            let mut text = tree.to_string_styled(&style);
            text.push('\n');
            write_output(output.as_deref(), &text)?;
        }
        Commands::Validate { input } => {
            let text = read_input(input.as_deref())?;
            let outcome = if cli.threaded {
                let task = jast_core::LexerTask::spawn(text)
                    .context("Failed to start the lexer thread")?;
                jast_core::parse_from(task)
            } else {
                jast_core::parse_partial(&text)
            };
            if let Some(err) = outcome.error {
                bail!("invalid JSON: {err}");
            }
            println!("valid");
        }
        Commands::Get {
            path,
            input,
            indent,
        } => {
            let tree = load(input.as_deref(), cli.threaded)?;
            let node = lookup(&tree, &path)?;
            match indent {
                Some(unit) => println!("{}", node.to_indented_string(&unit)),
                None => println!("{node}"),
            }
        }
        Commands::Keys { path, input } => {
            let tree = load(input.as_deref(), cli.threaded)?;
            let node = lookup(&tree, path.as_deref().unwrap_or(""))?;
            let Some(keys) = node.children_keys() else {
                bail!("{:?} is {}, not an array or object", node.key(), node.kind());
            };
            for key in keys {
                println!("{key}");
            }
        }
        Commands::Stats { input } => {
            let tree = load(input.as_deref(), cli.threaded)?;
            let root = tree.root();
            println!("Kind:     {}", root.kind());
            println!("Members:  {}", root.len());
            println!("Nodes:    {}", root.total());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load(path: Option<&str>, threaded: bool) -> Result<Tree> {
    let text = read_input(path)?;
    debug!(bytes = text.len(), threaded, "parsing input");
    let tree = if threaded {
        jast_core::parse_concurrent(text)
    } else {
        jast_core::parse_str(&text)
    };
    tree.context("Failed to parse JSON")
}

fn lookup<'a>(tree: &'a Tree, path: &str) -> Result<Node<'a>> {
    tree.get(path)
        .with_context(|| format!("No node at path {path:?}"))
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
