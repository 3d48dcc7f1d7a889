//! Random sample-data generation for the `generate-sample` command
//!
//! Produces an importable CSV: every row has a title and 1-4
//! contributors, and roughly half the rows carry an ISWC. Titles repeat
//! nothing, so exact linkage is the only merge path sample data
//! exercises by default.

use std::path::Path;

use rand::Rng;
use tracing::info;

use wsv_common::Result;

use crate::utils::csv_error;

/// Write `entries` random work rows (plus header) to `path`
pub fn generate_sample_csv(path: &Path, entries: u64) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer
        .write_record(["title", "contributors", "iswc"])
        .map_err(csv_error)?;

    let mut rng = rand::thread_rng();
    for i in 0..entries {
        let title = format!("Music title #{}", i);

        let iswc = if rng.gen_bool(0.5) {
            format!("T{:010}", i)
        } else {
            String::new()
        };

        let contributor_count = rng.gen_range(1..5);
        let contributors = (0..contributor_count)
            .map(|c| format!("Contributor #{}/{}", i, c))
            .collect::<Vec<_>>()
            .join("|");

        writer
            .write_record([title.as_str(), contributors.as_str(), iswc.as_str()])
            .map_err(csv_error)?;
    }

    writer.flush()?;
    info!(entries, file = %path.display(), "Sample file generated");

    Ok(())
}
