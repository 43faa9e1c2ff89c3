//! Delimited-text reading and writing for metadata and matrices

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ndarray::ArrayView2;

use crate::data::SampleMetadata;
use crate::error::{ReportError, Result};

/// Pick tab or comma from the first non-empty line of a file
pub(crate) fn detect_delimiter<P: AsRef<Path>>(path: P) -> Result<u8> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        return Ok(if line.contains('\t') { b'\t' } else { b',' });
    }
    Err(ReportError::EmptyData {
        reason: format!("{} is empty", path.as_ref().display()),
    })
}

fn reader_builder(delimiter: u8, has_headers: bool) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(delimiter)
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All);
    builder
}

/// Reader over a tab- or comma-separated file with surrounding whitespace
/// trimmed. A leading `#` is data, so headers such as `#sample_id` survive.
pub(crate) fn delimited_reader<P: AsRef<Path>>(
    path: P,
    has_headers: bool,
) -> Result<csv::Reader<File>> {
    let delimiter = detect_delimiter(path.as_ref())?;
    Ok(reader_builder(delimiter, has_headers).from_path(path.as_ref())?)
}

/// Headerless reader that skips `#` lines, for NCBI dumps such as gene2go
pub(crate) fn commented_reader<P: AsRef<Path>>(path: P) -> Result<csv::Reader<File>> {
    let delimiter = detect_delimiter(path.as_ref())?;
    Ok(reader_builder(delimiter, false)
        .comment(Some(b'#'))
        .from_path(path.as_ref())?)
}

/// Read sample metadata from a CSV/TSV file
/// Expected format: first column is sample IDs, remaining columns are categorical
/// annotations (cell line, condition, ...)
pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<SampleMetadata> {
    let mut reader = delimited_reader(path.as_ref(), true)?;

    let header: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
    if header.len() < 2 {
        return Err(ReportError::InvalidMetadata {
            reason: "metadata needs a sample column and at least one annotation column"
                .to_string(),
        });
    }
    let column_names = &header[1..];

    let mut sample_ids: Vec<String> = Vec::new();
    let mut columns: Vec<Vec<String>> = vec![Vec::new(); column_names.len()];

    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        if record.len() != header.len() {
            return Err(ReportError::InvalidMetadata {
                reason: format!(
                    "row {} has {} columns, expected {}",
                    row_idx + 2,
                    record.len(),
                    header.len()
                ),
            });
        }
        sample_ids.push(record[0].to_string());
        for (col, value) in columns.iter_mut().zip(record.iter().skip(1)) {
            col.push(value.to_string());
        }
    }

    if sample_ids.is_empty() {
        return Err(ReportError::EmptyData {
            reason: "No samples found in metadata".to_string(),
        });
    }

    let mut metadata = SampleMetadata::new(sample_ids)?;
    for (name, values) in column_names.iter().zip(columns) {
        metadata.add_condition(name, values)?;
    }

    log::info!(
        "Read metadata for {} samples ({} columns)",
        metadata.n_samples(),
        column_names.len()
    );
    Ok(metadata)
}

/// Write a labelled matrix (rows x columns) as CSV
pub fn write_matrix<P: AsRef<Path>>(
    path: P,
    corner: &str,
    row_ids: &[String],
    col_ids: &[String],
    values: ArrayView2<'_, f64>,
) -> Result<()> {
    let (n_rows, n_cols) = values.dim();
    if row_ids.len() != n_rows || col_ids.len() != n_cols {
        return Err(ReportError::DimensionMismatch {
            expected: format!("{} x {} labels", n_rows, n_cols),
            got: format!("{} x {} labels", row_ids.len(), col_ids.len()),
        });
    }

    let mut writer = csv::Writer::from_path(path)?;
    let mut header = Vec::with_capacity(n_cols + 1);
    header.push(corner.to_string());
    header.extend(col_ids.iter().cloned());
    writer.write_record(&header)?;

    for (id, row) in row_ids.iter().zip(values.rows()) {
        let mut record = Vec::with_capacity(n_cols + 1);
        record.push(id.clone());
        record.extend(row.iter().map(|v| format!("{:.6}", v)));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
