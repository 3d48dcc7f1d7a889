//! Small shared utilities for the importer

use std::fs::File;
use std::io::Read;
use std::path::Path;

use wsv_common::Error;

/// Count physical lines in a file with buffered 1 MiB reads.
///
/// Used only to size chunks before the real CSV pass: quoted fields may
/// embed newlines, so this is an upper bound on the record count, never
/// the authority on where the input ends.
pub fn count_lines(path: &Path) -> std::io::Result<u64> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; 1024 * 1024];
    let mut count: u64 = 0;

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        count += buffer[..bytes_read]
            .iter()
            .filter(|&&byte| byte == b'\n')
            .count() as u64;
    }

    Ok(count)
}

/// Map a csv crate error onto the importer's error kinds: IO failures
/// stay IO errors, everything else is a malformed-input parse error.
pub fn csv_error(error: csv::Error) -> Error {
    if error.is_io_error() {
        match error.into_kind() {
            csv::ErrorKind::Io(io) => Error::Io(io),
            other => Error::Parse(format!("CSV error: {:?}", other)),
        }
    } else {
        Error::Parse(error.to_string())
    }
}
