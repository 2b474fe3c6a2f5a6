//! Catalog normalizer: strips the `<code>-` prefix from every field but the first.

use crate::error::{LoaderError, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

/// Keep what follows the first hyphen, or the whole field when there is none.
pub fn strip_code(field: &str) -> &str {
    match field.split_once('-') {
        Some((_, rest)) => rest,
        None => field,
    }
}

/// Clean one row. Field 0 is an identifier and passes through untouched.
pub fn normalize_record(record: &StringRecord) -> StringRecord {
    record
        .iter()
        .enumerate()
        .map(|(i, field)| if i < 1 { field } else { strip_code(field) })
        .collect()
}

fn parse_row(row: &str) -> Result<StringRecord> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b',')
        .quote(b'"')
        .has_headers(false)
        .flexible(true)
        .from_reader(row.as_bytes());
    let mut record = StringRecord::new();
    reader.read_record(&mut record)?;
    Ok(record)
}

/// Normalize every row of `input` into `output`, returning the number of rows written.
///
/// The first row is not treated as a header: it goes through the same transform.
/// Blank lines are rows without fields and come out as blank lines. A quoted
/// field may span several lines; the row ends once its quotes are balanced.
pub fn normalize_reader<R: Read, W: Write>(input: R, output: W) -> Result<usize> {
    let mut writer = WriterBuilder::new()
        .delimiter(b',')
        .quote(b'"')
        .flexible(true)
        .from_writer(output);

    let mut rows = 0;
    let mut pending = String::new();
    for line in BufReader::new(input).lines() {
        let line = line.map_err(|e| LoaderError::io("<input>", e))?;
        if !pending.is_empty() {
            pending.push('\n');
        }
        pending.push_str(&line);
        if pending.matches('"').count() % 2 == 1 {
            continue;
        }

        let row = std::mem::take(&mut pending);
        write_row(&mut writer, &row)?;
        rows += 1;
    }
    if !pending.is_empty() {
        write_row(&mut writer, &pending)?;
        rows += 1;
    }
    writer
        .flush()
        .map_err(|e| LoaderError::io("<output>", e))?;

    tracing::debug!("Normalized {} rows", rows);
    Ok(rows)
}

fn write_row<W: Write>(writer: &mut csv::Writer<W>, row: &str) -> Result<()> {
    if row.trim_end_matches('\r').is_empty() {
        writer
            .flush()
            .and_then(|_| writer.get_mut().write_all(b"\n"))
            .map_err(|e| LoaderError::io("<output>", e))?;
        return Ok(());
    }
    writer.write_record(&normalize_record(&parse_row(row)?))?;
    Ok(())
}

/// Normalize the catalog at `path`. A missing or unreadable file is fatal.
pub fn normalize_file<P: AsRef<Path>, W: Write>(path: P, output: W) -> Result<usize> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| LoaderError::io(path, e))?;
    tracing::info!("Normalizing catalog: {}", path.display());
    normalize_reader(file, output)
}
