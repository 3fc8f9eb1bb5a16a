//! demo_chunk_sizes - Show how the buffer size shapes the chunks.
//!
//! This demo bursts an XML file into memory once per buffer size and
//! reports how many chunks each run would produce, together with the
//! average and standard deviation of root children per chunk. Nothing is
//! written to disk.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example demo_chunk_sizes <filename.xml> [buffer sizes...]
//! ```
//!
//! # Output
//!
//! The output is a formatted table with columns:
//! - Buffer: Buffer size in bytes
//! - Chunks: Number of chunks emitted
//! - Children: Total number of root children
//! - Average: Average children per chunk
//! - StdDev: Standard deviation of children per chunk

use std::env;
use std::fs::File;

use xml_burst::{burst, BurstConfig, ChunkSink, Document, NodeId};

const DEFAULT_SIZES: [usize; 5] = [1024, 8192, 65536, 1 << 20, 1 << 24];

/// Statistics accumulator for chunk sizes.
#[derive(Default)]
struct ChunkStats {
    count: u64,
    sum: u64,
    sum_of_squares: f64,
}

impl ChunkStats {
    fn add(&mut self, children: u64) {
        self.count += 1;
        self.sum += children;
        self.sum_of_squares += (children as f64).powi(2);
    }

    fn average(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum as f64 / self.count as f64
        }
    }

    fn stddev(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let mean = self.average();
        let variance = self.sum_of_squares / self.count as f64 - mean.powi(2);
        // Rounding can push the variance slightly below zero
        if variance < 0.0 {
            0.0
        } else {
            variance.sqrt()
        }
    }
}

impl ChunkSink for ChunkStats {
    fn emit(
        &mut self,
        _doc: &Document,
        _root: NodeId,
        children: &[NodeId],
        _index: usize,
    ) -> xml_burst::Result<()> {
        self.add(children.len() as u64);
        Ok(())
    }
}

/// Parses the buffer sizes given on the command line, falling back to the defaults.
fn parse_sizes(args: &[String]) -> Result<Vec<usize>, String> {
    if args.is_empty() {
        return Ok(DEFAULT_SIZES.to_vec());
    }
    args.iter()
        .map(|s| match s.parse::<usize>() {
            Ok(0) => Err("buffer size must be at least 1".to_string()),
            Ok(n) => Ok(n),
            Err(e) => Err(format!("invalid buffer size {s:?}: {e}")),
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <filename.xml> [buffer sizes...]", args[0]);
        std::process::exit(1);
    }

    let input_path = &args[1];
    let sizes = parse_sizes(&args[2..])?;

    println!(
        "{:>10}    {:>8} {:>10} {:>12} {:>12}",
        "Buffer", "Chunks", "Children", "Average", "StdDev"
    );

    for buffer_size in sizes {
        let file = File::open(input_path)?;
        let mut stats = ChunkStats::default();
        let config = BurstConfig::default().with_buffer_size(buffer_size);
        if let Err(e) = burst(file, &mut stats, &config) {
            eprintln!("Error bursting {}: {}", input_path, e);
            return Err(e.into());
        }
        println!(
            "{:>10}    {:>8} {:>10} {:>12.1} {:>12.1}",
            buffer_size,
            stats.count,
            stats.sum,
            stats.average(),
            stats.stddev()
        );
    }

    Ok(())
}
