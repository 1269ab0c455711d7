//! foldermap - mirror directory trees as nested maps.
//!
//! Usage:
//!   foldermap show PATH        Load a directory tree and print it
//!   foldermap decode FILE      Decode one leaf file to JSON
//!   foldermap encode FILE      Convert a JSON object to INI text
//!   foldermap resave PATH      Load a tree and save it back
//!   foldermap --help           Show help

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use foldermap_codec::{IniCodec, JsonCodec, TextCodec};
use foldermap_core::{ConfigTable, ContainerKind, FileBinding, SyncSignal, Value};
use foldermap_sync::{Container, ContainerFactory, Entry, Leaf, SaveReport};

#[derive(Parser)]
#[command(
    name = "foldermap",
    version,
    about = "Mirror directory trees as nested maps",
    long_about = "foldermap loads a directory into a tree of containers and leaves.\n\n\
                  Directories become containers, files become leaves whose contents \
                  are decoded by the codec their extension selects."
)]
struct Cli {
    /// TOML file declaring container kinds
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Container kind of the root directory
    #[arg(short, long, global = true, default_value = ContainerKind::GENERIC_NAME)]
    kind: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a directory tree and print it
    Show {
        /// Directory to load
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Decode one leaf file and print its values as JSON
    Decode {
        /// File to decode
        file: PathBuf,
    },

    /// Convert a JSON object file to INI text
    Encode {
        /// JSON file to convert
        file: PathBuf,
    },

    /// Load a directory tree and save it back
    Resave {
        /// Directory to resave
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let factory = load_factory(cli.config.as_deref())?;
    let kind = ContainerKind::from(cli.kind.as_str());

    match cli.command {
        Command::Show { path, format } => run_show(&path, kind, factory, format),
        Command::Decode { file } => run_decode(&file),
        Command::Encode { file } => run_encode(&file),
        Command::Resave { path } => run_resave(&path, kind, factory),
    }
}

/// Build the container factory from an optional config file.
fn load_factory(config: Option<&Path>) -> Result<ContainerFactory> {
    let table = match config {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            ConfigTable::from_toml_str(&source)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => ConfigTable::new(),
    };
    Ok(ContainerFactory::new(table))
}

/// Load a whole tree, reporting recorded failures on stderr.
fn load_tree(
    path: &Path,
    kind: ContainerKind,
    factory: ContainerFactory,
) -> Result<(Container, SyncSignal)> {
    let path = path.canonicalize().context("Invalid path")?;
    let signal = SyncSignal::new();
    let mut container = Container::with_kind(kind, factory).bound(path.as_path());

    container
        .load_all(&signal)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    if signal.has_failed() {
        eprintln!("{} error(s) while loading", signal.errors_count());
        if let Some(issue) = signal.last_error() {
            eprintln!("  last: {issue}");
        }
    }

    Ok((container, signal))
}

fn run_show(
    path: &Path,
    kind: ContainerKind,
    factory: ContainerFactory,
    format: OutputFormat,
) -> Result<()> {
    let (container, signal) = load_tree(path, kind, factory)?;

    match format {
        OutputFormat::Text => {
            let root = container
                .binding()
                .map(|b| b.path().display().to_string())
                .unwrap_or_default();
            println!("{root}/");
            print_container(&container, 1);
            println!();
            println!(
                "{} entries, {:.2}s",
                container.len(),
                signal.snapshot().elapsed.as_secs_f64()
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&container)?);
        }
    }

    Ok(())
}

fn run_decode(file: &Path) -> Result<()> {
    let signal = SyncSignal::new();
    let mut leaf = Leaf::for_file(FileBinding::new(file));
    leaf.load(&signal)
        .with_context(|| format!("Failed to decode {}", file.display()))?;

    println!("{}", serde_json::to_string_pretty(&leaf)?);
    Ok(())
}

fn run_encode(file: &Path) -> Result<()> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let values = JsonCodec.decode_document(&source)?;
    let text = IniCodec::global().encode_document(&values)?;

    println!("{text}");
    Ok(())
}

fn run_resave(path: &Path, kind: ContainerKind, factory: ContainerFactory) -> Result<()> {
    let (mut container, signal) = load_tree(path, kind, factory)?;
    let report = container.save(&signal);

    println!("{}", report.summary());
    print_failures(&report);

    if !report.is_success() {
        bail!("{} node(s) failed to save", report.failed_count());
    }
    Ok(())
}

fn print_failures(report: &SaveReport) {
    for issue in report.issues() {
        eprintln!("  failed: {issue}");
    }
}

/// Print the entries of a container, one per line.
fn print_container(container: &Container, depth: usize) {
    let indent = "  ".repeat(depth);

    for (key, entry) in container.iter() {
        match entry {
            Entry::Container(child) => {
                println!("{indent}▼ {key}/");
                print_container(child, depth + 1);
            }
            Entry::Leaf(leaf) => {
                println!(
                    "{indent}  {} [{}]",
                    leaf.file_name(key),
                    leaf.codec()
                );
                for (name, value) in leaf.iter() {
                    println!("{indent}    {name} = {}", describe(value));
                }
            }
            Entry::Value(value) => {
                println!("{indent}  {key} = {}", describe(value));
            }
        }
    }
}

/// Render a value with its type.
fn describe(value: &Value) -> String {
    format!("{value} ({})", value.value_type())
}
