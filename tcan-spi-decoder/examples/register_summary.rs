//! Register access summary
//!
//! Decodes a Saleae SPI CSV export and prints how often each TCAN4x5x
//! register was read and written.
//!
//! Usage:
//!   register_summary <capture.csv> [--limit <count>]

use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use tcan_spi_decoder::{DecodedRecord, Decoder, DecoderConfig};

#[derive(Default)]
struct AccessCount {
    name: &'static str,
    reads: usize,
    writes: usize,
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <capture.csv> [--limit <count>]", args[0]);
        std::process::exit(1);
    }

    let capture = PathBuf::from(&args[1]);
    let mut limit = usize::MAX;
    let mut i = 2;
    while i < args.len() {
        if args[i] == "--limit" && i + 1 < args.len() {
            limit = args[i + 1].parse().unwrap_or(usize::MAX);
            i += 1;
        }
        i += 1;
    }

    let mut decoder = Decoder::new(DecoderConfig::new());
    let records = match decoder.decode_file(&capture) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Failed to open capture: {}", e);
            std::process::exit(1);
        }
    };

    let mut counts: BTreeMap<u16, AccessCount> = BTreeMap::new();
    let mut errors = 0usize;

    for record in records.take(limit) {
        match record {
            Ok(DecodedRecord::Read(access)) => {
                let entry = counts.entry(access.address).or_default();
                entry.name = access.name;
                entry.reads += 1;
            }
            Ok(DecodedRecord::Write(access)) => {
                let entry = counts.entry(access.address).or_default();
                entry.name = access.name;
                entry.writes += 1;
            }
            Ok(DecodedRecord::CommandError { .. }) => errors += 1,
            Ok(DecodedRecord::TimingViolation(_)) => {}
            Err(e) => eprintln!("Skipping row: {}", e),
        }
    }

    println!("{:<6} {:<28} {:>8} {:>8}", "ADDR", "REGISTER", "READS", "WRITES");
    for (address, count) in &counts {
        println!(
            "{:04X}   {:<28} {:>8} {:>8}",
            address, count.name, count.reads, count.writes
        );
    }
    println!("\nCommand errors: {}", errors);

    let stats = decoder.stats();
    println!(
        "Events: {}  Transactions: {}",
        stats.events, stats.transactions
    );
}
