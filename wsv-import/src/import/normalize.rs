//! Record normalization
//!
//! Converts one raw CSV row into a `WorkRecord`: fields trimmed, empty
//! title/identifier normalized to absent, contributors split on the
//! configured separator. Deduplication is deliberately left to the
//! reconciler, which must consider staging and canonical contributors
//! jointly.

use csv::StringRecord;
use wsv_common::config::ImportConfig;
use wsv_common::model::is_valid_iswc;
use wsv_common::{Error, Result, WorkRecord};

/// Expected header, in order
pub const EXPECTED_HEADER: [&str; 3] = ["title", "contributors", "iswc"];

/// Verify the file header before any row is processed
pub fn verify_header(header: &StringRecord) -> Result<()> {
    let fields: Vec<&str> = header.iter().map(str::trim).collect();
    if fields != EXPECTED_HEADER {
        return Err(Error::Parse(format!(
            "Unexpected header {:?}, expected {:?}",
            fields, EXPECTED_HEADER
        )));
    }
    Ok(())
}

/// Normalize one raw row into a `WorkRecord`.
///
/// Fails with a parse error on the wrong column count, which aborts the
/// whole run. When identifier validation is enabled, an out-of-pattern
/// ISWC fails with a validation error instead.
pub fn normalize_record(record: &StringRecord, config: &ImportConfig) -> Result<WorkRecord> {
    if record.len() != EXPECTED_HEADER.len() {
        return Err(Error::Parse(format!(
            "Row at line {}: expected {} columns, found {}",
            line_of(record),
            EXPECTED_HEADER.len(),
            record.len()
        )));
    }

    let title = absent_if_empty(&record[0]);
    let contributors = split_contributors(&record[1], config.contributors_separator);
    let iswc = absent_if_empty(&record[2]);

    if config.validate_identifiers {
        if let Some(iswc) = &iswc {
            if !is_valid_iswc(iswc) {
                return Err(Error::Validation(format!(
                    "Row at line {}: identifier {:?} does not match the ISWC pattern",
                    line_of(record),
                    iswc
                )));
            }
        }
    }

    Ok(WorkRecord::new(title, contributors, iswc))
}

/// Split the multi-valued contributors field, trimming each entry and
/// dropping entries that trim to nothing. Input order is preserved.
fn split_contributors(field: &str, separator: char) -> Vec<String> {
    field
        .split(separator)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

fn absent_if_empty(field: &str) -> Option<String> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}
