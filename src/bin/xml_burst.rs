//! xml_burst - Split a large XML document into smaller well-formed files.
//!
//! Reads the input as a buffered stream. Whenever a buffer has been parsed
//! and at least one direct child of the root element was closed in it, a
//! new chunk file holding those children is written to the output
//! directory.
//!
//! # Usage
//!
//! ```bash
//! xml_burst --input <FILE> --output <DIR> [OPTIONS]
//! ```
//!
//! # Examples
//!
//! ```bash
//! # Split with the default 8 KiB buffer
//! xml_burst --input dump.rdf --output chunks
//!
//! # Larger buffers give fewer, larger chunks
//! xml_burst -i dump.rdf -o chunks --buffer-size 4194304
//!
//! # Fail instead of stopping quietly on a truncated document
//! xml_burst -i dump.rdf -o chunks --on-truncated fail -v
//! ```
//!
//! # Output
//!
//! Files named `{input stem}-{index}{input suffix}` in the output
//! directory, which must not exist yet. Index 0 holds the first children.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{info, Level};

use xml_burst::{burst_file, BurstConfig, TruncationPolicy, WriterConfig, DEFAULT_BUFFER_SIZE};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Split a large XML document into smaller well-formed files.
#[derive(Parser, Debug)]
#[command(name = "xml_burst")]
#[command(version = VERSION)]
#[command(about = "Split a large XML document into smaller well-formed files")]
#[command(
    long_about = "Reads an XML file (typically an RDF/XML dump) as a buffered stream. \
    Whenever a buffer has been consumed and a direct child of the root element was closed, \
    a new chunk file is written to the output directory."
)]
struct Args {
    /// The input XML file
    #[arg(short, long)]
    input: PathBuf,

    /// The output directory to write the chunk files to (must not exist)
    #[arg(short, long)]
    output: PathBuf,

    /// The file reading buffer size in bytes
    ///
    /// Chunks are cut at buffer boundaries, so this also controls the size
    /// of the chunk files.
    #[arg(
        short,
        long = "buffer-size",
        visible_alias = "buffer",
        default_value_t = DEFAULT_BUFFER_SIZE,
        value_parser = parse_buffer_size
    )]
    buffer_size: usize,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,

    /// What to do when the input ends before the root element is closed
    #[arg(long, value_enum, default_value_t = OnTruncated::EmitPartial)]
    on_truncated: OnTruncated,

    /// Output compact XML (no line breaks between children)
    #[arg(long)]
    compact: bool,

    /// Omit the XML declaration from chunk files
    #[arg(long)]
    no_declaration: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OnTruncated {
    /// Keep the chunks written so far and exit successfully
    EmitPartial,
    /// Keep the chunks written so far and exit with an error
    Fail,
}

impl From<OnTruncated> for TruncationPolicy {
    fn from(value: OnTruncated) -> Self {
        match value {
            OnTruncated::EmitPartial => TruncationPolicy::EmitPartial,
            OnTruncated::Fail => TruncationPolicy::Fail,
        }
    }
}

fn parse_buffer_size(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("buffer size must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Args {
    fn config(&self) -> BurstConfig {
        let writer = if self.compact {
            WriterConfig::compact()
        } else {
            WriterConfig::default()
        };
        BurstConfig::default()
            .with_buffer_size(self.buffer_size)
            .with_truncation(self.on_truncated.into())
            .with_writer(writer.with_xml_declaration(!self.no_declaration))
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || run(&args))
}

fn run(args: &Args) -> ExitCode {
    match burst_file(&args.input, &args.output, &args.config()) {
        Ok(report) => {
            info!(
                chunks = report.chunks.len(),
                children = report.children,
                bytes = report.bytes_read,
                "finished"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
