//! Driver glue between the command line surface and the recovery
//! library.

use std::path::Path;

use anyhow::Result;
use libvicar::{Assembler, ExtractorOptions, OcradRecognizer, RunSummary};
use tracing::{info, instrument};

/// Runs a full recovery over `input`, writing into `output`
///
/// # Errors
///
/// Propagates the first fatal decode or reconstruction error; with
/// `ignore_bad_files` configured, only indexing failures remain fatal.
#[instrument(skip(options))]
pub fn extract(options: &ExtractorOptions, input: &Path, output: &Path) -> Result<RunSummary> {
    let mut recognizer = OcradRecognizer::new();
    let mut assembler = Assembler::new(options, input, output);
    let summary = assembler.run(&mut recognizer)?;
    info!(
        events = summary.events,
        reconstructed = summary.reconstructed,
        dumped = summary.dumped_bands,
        "recovery completed"
    );
    Ok(summary)
}

/// The closing one-liner printed after a run
#[must_use]
pub fn summary_report(options: &ExtractorOptions, summary: &RunSummary) -> String {
    if summary.prospective_files == 0 {
        return "no prospective files found".to_owned();
    }
    if options.reconstruct {
        format!(
            "successfully reconstructed {}/{} camera events, {} unreconstructable components dumped",
            summary.reconstructed, summary.events, summary.dumped_bands
        )
    } else {
        format!(
            "dumped {} image components without reconstruction",
            summary.dumped_bands
        )
    }
}
