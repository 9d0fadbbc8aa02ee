//! Cataloguing a tree of band files and driving reconstruction.
//!
//! The run has two halves: indexing walks the input (a single file, a
//! directory, or zip archives met along the way) collecting prospective
//! band files by name shape, then the drive loop decodes each band,
//! applies the filters, groups survivors by camera event and finally
//! asks each event to reconstruct itself. Processing is strictly
//! sequential; a fatal error resets the catalogue.

mod event;

pub use event::{EventOutcome, ReconstructableImage};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::band::Band;
use crate::error::Error;
use crate::options::ExtractorOptions;
use crate::reader::archive_members;
use crate::visual::TextRecognizer;

static PROSPECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"vl_.*\.[0-9]{3}$").expect("Regex for prospective band files must be valid")
});

static ZIP_FILE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.zip$").expect("Regex for zip archives must be valid"));

/// Closing accounting for one recovery run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// band files admitted by the indexer
    pub prospective_files: usize,
    /// camera events catalogued
    pub events: usize,
    /// events rebuilt into a colour or grayscale image
    pub reconstructed: usize,
    /// events that fell through to dump mode
    pub dumped_events: usize,
    /// component bands written standalone by dump mode
    pub dumped_bands: usize,
    /// events skipped after a reconstruction error
    pub failed_events: usize,
}

/// Groups decoded bands by camera event and reconstructs each event
pub struct Assembler<'a> {
    options: &'a ExtractorOptions,
    input: PathBuf,
    output_root: PathBuf,
    prospective: Vec<String>,
    catalogue: BTreeMap<String, ReconstructableImage>,
}

impl<'a> Assembler<'a> {
    /// An assembler over one input file or directory tree
    pub fn new(
        options: &'a ExtractorOptions,
        input: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            options,
            input: input.into(),
            output_root: output_root.into(),
            prospective: Vec::new(),
            catalogue: BTreeMap::new(),
        }
    }

    /// Indexes, decodes, catalogues and reconstructs everything under
    /// the input.
    ///
    /// # Errors
    ///
    /// Without `ignore_bad_files` the first decode or reconstruction
    /// failure aborts the run (filtered bands never do); indexing I/O
    /// failures always abort. On any fatal error the catalogue is
    /// reset before the error is returned.
    pub fn run(&mut self, recognizer: &mut dyn TextRecognizer) -> Result<RunSummary, Error> {
        let result = self.run_inner(recognizer);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn run_inner(&mut self, recognizer: &mut dyn TextRecognizer) -> Result<RunSummary, Error> {
        self.reset();

        info!("preparing catalogue, please wait...");
        self.index()?;

        let mut summary = RunSummary {
            prospective_files: self.prospective.len(),
            ..RunSummary::default()
        };
        if self.prospective.is_empty() {
            info!("no prospective files found");
            return Ok(summary);
        }
        info!(files = self.prospective.len(), "studying catalogue");

        let prospective = std::mem::take(&mut self.prospective);
        for input in &prospective {
            let band = match Band::load(input, self.options, recognizer) {
                Ok(band) => band,
                Err(Error::Filtered) => {
                    debug!(file = %input, "filtered");
                    continue;
                }
                Err(error) if self.options.ignore_bad_files => {
                    warn!(file = %input, "{error}, skipping");
                    continue;
                }
                Err(error) => {
                    warn!(file = %input, "{error}");
                    return Err(error);
                }
            };

            if !self.options.filter_diode_class.admits(band.diode()) {
                debug!(
                    file = %input,
                    diode = band.diode().friendly(),
                    "filtering diode band type"
                );
                continue;
            }

            let Some(label) = band.camera_event().map(|event| event.label.clone()) else {
                warn!(file = %input, "camera event doesn't identify itself, cannot index");
                continue;
            };

            let image = self.catalogue.entry(label.clone()).or_insert_with(|| {
                debug!(event = %label, "new camera event, indexing");
                ReconstructableImage::new(&label)
            });
            if let Err(error) = image.add_band(band) {
                if self.options.ignore_bad_files {
                    warn!(file = %input, "{error}, skipping");
                    continue;
                }
                return Err(error);
            }
        }

        summary.events = self.catalogue.len();
        info!(events = summary.events, "attempting forensic data recovery");

        let options = self.options;
        let output_root = self.output_root.clone();
        for (label, image) in &mut self.catalogue {
            match image.reconstruct(options, &output_root) {
                Ok(EventOutcome::Colour | EventOutcome::Grayscale) => {
                    summary.reconstructed += 1;
                }
                Ok(EventOutcome::Dumped(bands)) => {
                    summary.dumped_events += 1;
                    summary.dumped_bands += bands;
                }
                Err(Error::Unreconstructable { dumped }) => {
                    summary.dumped_events += 1;
                    summary.dumped_bands += dumped;
                    let error = Error::Unreconstructable { dumped };
                    if !options.ignore_bad_files {
                        warn!(event = %label, "{error}");
                        return Err(error);
                    }
                    warn!(event = %label, "{error}, skipping");
                }
                Err(error) => {
                    if !options.ignore_bad_files {
                        warn!(event = %label, "{error}");
                        return Err(error);
                    }
                    summary.failed_events += 1;
                    warn!(event = %label, "{error}, skipping");
                }
            }
        }

        Ok(summary)
    }

    /// Empties the prospective list and the catalogue
    pub fn reset(&mut self) {
        self.prospective.clear();
        self.catalogue.clear();
    }

    fn index(&mut self) -> Result<(), Error> {
        let input = self.input.clone();
        let metadata = std::fs::metadata(&input)?;

        if metadata.is_file() {
            self.index_file(&input)?;
        } else if metadata.is_dir() {
            let max_depth = if self.options.recursive { usize::MAX } else { 1 };
            for entry in WalkDir::new(&input).max_depth(max_depth) {
                let entry = entry.map_err(std::io::Error::from)?;
                if entry.file_type().is_file() {
                    self.index_file(entry.path())?;
                }
            }
        }

        // enumeration order is filesystem dependent; a sorted catalogue
        // keeps runs comparable
        self.prospective.sort_unstable();
        Ok(())
    }

    /// Admits a file by name shape, or enumerates it as an archive
    fn index_file(&mut self, path: &Path) -> Result<(), Error> {
        let Some(name) = path.file_name().map(|name| name.to_string_lossy()) else {
            return Ok(());
        };

        if ZIP_FILE_RE.is_match(&name) {
            self.index_archive(path)?;
        } else if PROSPECT_RE.is_match(&name) {
            self.prospective.push(path.to_string_lossy().into_owned());
        }
        Ok(())
    }

    fn index_archive(&mut self, path: &Path) -> Result<(), Error> {
        debug!(archive = %path.display(), "indexing archive");
        for member in archive_members(path)? {
            let base = member.rsplit(['/', '\\']).next().unwrap_or(&member);
            if PROSPECT_RE.is_match(base) {
                self.prospective
                    .push(format!("{}:/{member}", path.display()));
            }
        }
        Ok(())
    }
}
