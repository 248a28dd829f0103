//! linedex command-line interface.
//!
//! Four operations over an index file and its external record store:
//!
//! ```bash
//! # Create an index keyed on each line's first 4 bytes
//! linedex build records.txt records.idx 4
//!
//! # Exact lookup
//! linedex find records.idx 0005
//!
//! # List up to 10 records in key order starting at (or after) a key
//! linedex list records.idx 0005 10
//!
//! # Append a record and index it; the first 4 bytes are the key
//! linedex insert records.idx "0011 new record data"
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use linedex::{BPlusTree, InsertOutcome, Key, RecordFile, ScanOrigin};

/// A disk-based B+Tree index over newline-delimited record files.
#[derive(Parser, Debug)]
#[command(name = "linedex", version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a new index from an existing record file
    Build {
        /// The record file to index
        records: PathBuf,
        /// The index file to create
        index: PathBuf,
        /// Bytes per key (each line's first KEY_LENGTH bytes)
        key_length: usize,
    },
    /// Find the record stored under an exact key
    Find {
        /// The index file
        index: PathBuf,
        /// The key to look up
        key: String,
    },
    /// List records in key order, starting at a key
    List {
        /// The index file
        index: PathBuf,
        /// Key to start at (or after, if absent)
        start_key: String,
        /// Maximum number of records to list
        count: usize,
    },
    /// Append a record to the store and index it
    Insert {
        /// The index file
        index: PathBuf,
        /// The record text; its first key-length bytes are the key
        record: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let args = Args::parse();
    match run(args.command) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Build {
            records,
            index,
            key_length,
        } => {
            let (_, stats) = BPlusTree::build(&records, &index, key_length)
                .with_context(|| format!("failed to build index {}", index.display()))?;
            println!(
                "Index created: {} records, {} duplicates skipped.",
                stats.inserted, stats.duplicates
            );
            Ok(ExitCode::SUCCESS)
        }

        Command::Find { index, key } => {
            let mut tree = open_index(&index)?;
            let key = Key::new(key.into_bytes(), tree.key_len())?;

            match tree.find(&key)? {
                Some(offset) => {
                    let mut records = open_records(&tree)?;
                    let line = records.line_at(offset)?;
                    println!("At {offset}, record: {line}");
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    println!("Could not find record.");
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Command::List {
            index,
            start_key,
            count,
        } => {
            let mut tree = open_index(&index)?;
            let start = Key::new(start_key.into_bytes(), tree.key_len())?;
            let record_path = tree.meta().record_path.clone();
            let mut records = RecordFile::open(&record_path)
                .with_context(|| format!("failed to open record file {}", record_path.display()))?;

            let (origin, scan) = tree.scan_from(&start, count)?;
            match origin {
                ScanOrigin::Exact => println!(
                    "Entry found. Listing up to {count} records starting at it:"
                ),
                ScanOrigin::After => println!(
                    "Entry not found. Listing up to {count} records greater than it:"
                ),
            }

            let entries: Vec<_> = scan.collect::<linedex::Result<_>>()?;
            for entry in entries {
                println!("{}", records.line_at(entry.record_offset)?);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Insert { index, record } => {
            let mut tree = open_index(&index)?;
            let key = Key::from_record_line(&record, tree.key_len(), 0)?;

            let record_path = tree.meta().record_path.clone();
            let mut records = RecordFile::open_rw(&record_path)
                .with_context(|| format!("failed to open record file {}", record_path.display()))?;

            // The record will land at the current end of the store; the
            // index entry is written first, so a duplicate key leaves both
            // files untouched.
            let offset = records.len()?;
            match tree.insert(&key, offset)? {
                InsertOutcome::Inserted => {
                    records.append_line(&record)?;
                    println!("Record inserted.");
                    Ok(ExitCode::SUCCESS)
                }
                InsertOutcome::Duplicate => {
                    println!("A record with that key already exists.");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn open_index(path: &PathBuf) -> Result<BPlusTree> {
    BPlusTree::open(path).with_context(|| format!("failed to open index {}", path.display()))
}

fn open_records(tree: &BPlusTree) -> Result<RecordFile> {
    let path = &tree.meta().record_path;
    RecordFile::open(path).with_context(|| format!("failed to open record file {}", path.display()))
}
