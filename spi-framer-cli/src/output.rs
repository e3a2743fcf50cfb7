//! Record output as JSON Lines

use anyhow::Result;
use spi_framer::Record;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write a single record as one JSON object followed by a newline
pub fn write_record<W: Write>(writer: &mut W, record: &Record) -> Result<()> {
    serde_json::to_writer(&mut *writer, record)?;
    writer.write_all(b"\n")?;
    Ok(())
}

fn file_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "events".to_string())
}

/// Output paths for a batch of inputs, one per input, in input order
///
/// Inputs sharing a file stem get their position in the batch appended
/// (`<dir>/<stem>.<index>.records.jsonl`) so no two inputs write the same file.
pub fn records_paths(output_dir: &Path, inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut stem_counts: HashMap<String, usize> = HashMap::new();
    for input in inputs {
        *stem_counts.entry(file_stem(input)).or_default() += 1;
    }

    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let stem = file_stem(input);
            if stem_counts[&stem] > 1 {
                output_dir.join(format!("{}.{}.records.jsonl", stem, index))
            } else {
                output_dir.join(format!("{}.records.jsonl", stem))
            }
        })
        .collect()
}
