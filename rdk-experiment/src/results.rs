//! Trial results file: one header line, then one `direction,coherence,response`
//! row per trial.

use std::io::Write;
use std::path::Path;

use rdk_core::TrialResult;

use crate::errors::{ExperimentError, Result};

pub const RESULTS_HEADER: [&str; 3] = ["TrialDirection", "Coherence", "UserInput"];

/// Writes the header and every result to `writer`.
pub fn write_results<W: Write>(writer: W, results: &[TrialResult]) -> Result<()> {
    // Header is written by hand so an empty session still produces it.
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    writer.write_record(RESULTS_HEADER)?;
    for result in results {
        writer.serialize(result)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the results file at `path`, replacing any previous file.
pub fn write_results_csv<P: AsRef<Path>>(path: P, results: &[TrialResult]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_results(std::io::BufWriter::new(file), results)?;
    log::info!("Trial data saved to {}", path.display());
    Ok(())
}

pub fn read_results_csv<P: AsRef<Path>>(path: P) -> Result<Vec<TrialResult>> {
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?;
    if headers.iter().ne(RESULTS_HEADER) {
        return Err(ExperimentError::UnexpectedHeader(
            headers.iter().collect::<Vec<_>>().join(","),
        ));
    }

    reader
        .deserialize()
        .map(|row| row.map_err(ExperimentError::from))
        .collect()
}
