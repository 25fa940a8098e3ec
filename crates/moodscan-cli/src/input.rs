//! Text extraction from input files

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use csv::ReaderBuilder;
use std::path::Path;

/// Layout of a batch input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// One text per non-empty line
    Lines,
    /// Comma-separated with a header row; the first column is used
    Csv,
}

impl InputFormat {
    /// Guess from the file extension
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::Csv,
            _ => Self::Lines,
        }
    }
}

pub fn read_texts(path: &Path, format: InputFormat) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {}", path.display()))?;

    match format {
        InputFormat::Lines => Ok(parse_lines(&content)),
        InputFormat::Csv => parse_csv_first_column(&content),
    }
}

/// Non-empty lines, trailing `\r` removed
pub fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

/// First field of every record after the header.
///
/// Quoted fields may contain commas, doubled quotes and line breaks. Records
/// may have differing field counts.
pub fn parse_csv_first_column(content: &str) -> Result<Vec<String>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    if reader.headers().context("Invalid CSV header")?.is_empty() {
        bail!("CSV input is empty");
    }

    let mut texts = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        // Header is line 1
        let record = record.with_context(|| format!("Invalid CSV record {}", idx + 2))?;
        if let Some(field) = record.get(0) {
            if !field.trim().is_empty() {
                texts.push(field.to_string());
            }
        }
    }

    Ok(texts)
}
