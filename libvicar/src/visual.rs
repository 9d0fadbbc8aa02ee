//! Rotation and overlay detection by reading the annotations the
//! ground-processing pipeline burned into the pixels.
//!
//! Two kinds of overlay exist: azimuth/elevation axis ticks along the
//! edges, and a full histogram legend block. The histogram block was
//! always printed rotated 90° counterclockwise from the correct image
//! orientation, so finding its vocabulary under some rotation pins the
//! image's true orientation one further quarter turn along. The axis
//! text reads correctly in the correct orientation.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, trace};

use crate::error::Error;
use crate::raster::{Raster, Rotation};

/// Words expected somewhere in the full histogram legend
pub const HISTOGRAM_VOCABULARY: [&str; 11] = [
    "VIKING",
    "LANDER",
    "LABEL",
    "DIODE",
    "CHANNEL",
    "AZIMUTH",
    "ELEVATION",
    "OFFSET",
    "RESCAN",
    "SEGMENT",
    "MEAN",
];

/// Words expected along a properly oriented azimuth/elevation axis
pub const AXIS_VOCABULARY: [&str; 6] = ["AZ", "CAMERA", "SCAN", "LINE", "IPL", "SAMPLE"];

/// Upscale factor fed to the recogniser; the overlay glyphs are tiny
pub const OCR_SCALE: usize = 3;

/// Brightness cut between background and overlay text
pub const OCR_THRESHOLD: u8 = 70;

/// An engine that can pull text out of a grayscale raster
pub trait TextRecognizer {
    /// Runs recognition over the raster and returns whatever text came out
    ///
    /// # Errors
    ///
    /// Implementations fail with [`Error::OcrInitFailed`] when the engine
    /// cannot be started or aborts.
    fn recognize(&mut self, raster: &Raster) -> Result<String, Error>;
}

/// The stock engine: GNU Ocrad, driven as a subprocess over a PGM pipe.
///
/// There is no Rust binding for the OCRAD library, but the `ocrad(1)`
/// executable reads a portable graymap on stdin and prints recognised
/// text on stdout, which is all we need.
#[derive(Debug, Clone)]
pub struct OcradRecognizer {
    program: PathBuf,
}

impl OcradRecognizer {
    /// An engine invoking `ocrad` from `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ocrad"),
        }
    }

    /// An engine invoking a specific executable
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for OcradRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextRecognizer for OcradRecognizer {
    fn recognize(&mut self, raster: &Raster) -> Result<String, Error> {
        let pixmap = bilevel_pgm(raster);

        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| Error::OcrInitFailed {
                reason: format!("could not spawn {}: {source}", self.program.display()),
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| Error::OcrInitFailed {
            reason: "engine stdin unavailable".to_owned(),
        })?;
        stdin.write_all(&pixmap)?;
        drop(stdin);

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(Error::OcrInitFailed {
                reason: format!("{} exited with {}", self.program.display(), output.status),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Scales the raster up, thresholds it, and serialises a binary PGM.
///
/// The overlay text is light on dark while the engine expects dark on
/// light, so the threshold also inverts.
fn bilevel_pgm(raster: &Raster) -> Vec<u8> {
    let width = raster.width() * OCR_SCALE;
    let height = raster.height() * OCR_SCALE;

    let mut pixmap = format!("P5\n{width} {height}\n255\n").into_bytes();
    pixmap.reserve(width * height);
    for row in raster.rows() {
        let scaled_row: Vec<u8> = row
            .iter()
            .flat_map(|&pixel| {
                let bilevel = if pixel > OCR_THRESHOLD { 0 } else { 255 };
                [bilevel; OCR_SCALE]
            })
            .collect();
        for _ in 0..OCR_SCALE {
            pixmap.extend_from_slice(&scaled_row);
        }
    }
    pixmap
}

/// What the visual examination concluded about one band
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisualReport {
    /// counterclockwise rotation needed to orient the image
    pub rotation: Rotation,
    /// an axis overlay is burned into the pixels
    pub axis_present: bool,
    /// the full histogram legend is burned into the pixels
    pub full_histogram_present: bool,
    /// whatever text the engine extracted
    pub text: String,
}

/// Runs the rotation/overlay detection for one band, caching engine
/// output per candidate rotation. Scoped to a single band load.
pub struct VisualClassifier<'r> {
    recognizer: &'r mut dyn TextRecognizer,
    cache: HashMap<Rotation, String>,
}

impl<'r> VisualClassifier<'r> {
    /// Wraps an engine for one band's examination
    pub fn new(recognizer: &'r mut dyn TextRecognizer) -> Self {
        Self {
            recognizer,
            cache: HashMap::new(),
        }
    }

    /// Decides the band's rotation and overlay flags
    ///
    /// # Errors
    ///
    /// Propagates engine failures.
    pub fn classify(&mut self, raster: &Raster, auto_rotate: bool) -> Result<VisualReport, Error> {
        let mut report = if let Some(report) = self.detect_histogram(raster)? {
            report
        } else if let Some(report) = self.detect_axis(raster)? {
            report
        } else {
            debug!("could not guess image rotation");
            VisualReport::default()
        };

        if !auto_rotate {
            report.rotation = Rotation::None;
        }
        Ok(report)
    }

    /// The histogram legend reads correctly one quarter turn shy of the
    /// image's true orientation
    fn detect_histogram(&mut self, raster: &Raster) -> Result<Option<VisualReport>, Error> {
        for candidate in Rotation::ALL {
            let text = self.recognized(raster, candidate)?;
            if contains_any(&text, &HISTOGRAM_VOCABULARY) {
                let rotation = candidate.plus_quarter_turn();
                debug!(degrees = rotation.degrees(), "histogram legend found");
                return Ok(Some(VisualReport {
                    rotation,
                    axis_present: true,
                    full_histogram_present: true,
                    text,
                }));
            }
        }
        Ok(None)
    }

    fn detect_axis(&mut self, raster: &Raster) -> Result<Option<VisualReport>, Error> {
        for candidate in Rotation::ALL {
            let text = self.recognized(raster, candidate)?;
            if contains_any(&text, &AXIS_VOCABULARY) {
                debug!(degrees = candidate.degrees(), "axis overlay found");
                return Ok(Some(VisualReport {
                    rotation: candidate,
                    axis_present: true,
                    full_histogram_present: false,
                    text,
                }));
            }
        }
        Ok(None)
    }

    fn recognized(&mut self, raster: &Raster, candidate: Rotation) -> Result<String, Error> {
        if let Some(text) = self.cache.get(&candidate) {
            trace!(degrees = candidate.degrees(), "annotation cache hit");
            return Ok(text.clone());
        }
        let rotated = raster.clone().rotate(candidate);
        let text = self.recognizer.recognize(&rotated)?;
        self.cache.insert(candidate, text.clone());
        Ok(text)
    }
}

fn contains_any(text: &str, vocabulary: &[&str]) -> bool {
    vocabulary.iter().any(|word| text.contains(word))
}
