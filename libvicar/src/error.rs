use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
/// Possible `libvicar` errors
pub enum Error {
    /// Underlying I/O failure while reading or writing
    #[error("i/o error")]
    Io(#[from] std::io::Error),

    /// Failure while opening or inflating a zip archive member
    #[error("archive error")]
    Archive(#[from] zip::result::ZipError),

    /// Failure in the PNG encoder
    #[error("image encoding error")]
    Encode(#[from] image::ImageError),

    /// Zero-byte input file
    #[error("empty file, probably blank magnetic tape or never received back on Earth")]
    Empty,

    /// Input smaller than the minimum interesting size
    #[error("too small to be interesting (< 4 KB)")]
    TooSmall {
        /// observed file size in bytes
        size: u64,
    },

    /// No phase offset in 0..=3 yielded a valid first label record
    #[error("header is not intact, or not a VICAR file")]
    HeaderCorrupt,

    /// The EBCDIC origin signature was not found in the first 256 bytes
    #[error("did not originate from a Viking Lander")]
    NotVikingLander,

    /// The diode token marks an internal calibration exposure
    #[error("internal radio/geometric calibration ({token})")]
    CalibrationShot {
        /// the offending token from the label
        token: String,
    },

    /// The diode token is recognised as one we cannot recover
    #[error("unsupported photosensor diode band type ({token})")]
    UnsupportedDiode {
        /// the offending token from the label
        token: String,
    },

    /// None of the header dialect heuristics matched
    #[error("exhausted basic metadata parser heuristics")]
    UnknownHeaderFormat,

    /// A basic metadata field failed its sanity check
    #[error("corrupt or unsupported {field} in basic metadata")]
    BadMetadata {
        /// which field failed
        field: &'static str,
    },

    /// A label record inside the header block failed validation
    #[error("invalid logical record label")]
    InvalidLabel,

    /// The first label of a physical record failed validation
    #[error("invalid logical record label possibly from out of phase physical boundary")]
    OutOfPhaseBoundary,

    /// The file cannot hold the pixel payload its header claims
    #[error("file too small to contain claimed payload {size} < {required}")]
    FileTooSmall {
        /// observed file size in bytes
        size: u64,
        /// raw pixel offset plus claimed payload
        required: u64,
    },

    /// The band was excluded by an active lander/sol/camera-event filter.
    /// Never fatal: callers silently drop the band.
    #[error("band excluded by an active filter")]
    Filtered,

    /// The band carries no camera event label and cannot be catalogued
    #[error("camera event doesn't identify itself, cannot index")]
    NoCameraEvent,

    /// The chosen band triple does not agree on transformed dimensions
    #[error("image bands not all the same size, may be missing scanlines")]
    SizeMismatch,

    /// A consistent full-histogram triple could not be formed
    #[error("images for each band present, but no matching set of full histogram variants available")]
    NoMatchingHistogramSet,

    /// A consistent overlay-free triple could not be formed
    #[error("images for each band present, but no matching set of non-overlayed variants available")]
    NoMatchingVanillaSet,

    /// Refusing to clobber an existing output file
    #[error("output {path} already exists, not overwriting (use --overwrite to override)", path = .path.display())]
    OverwriteRefused {
        /// the output path that already exists
        path: PathBuf,
    },

    /// The external OCR engine could not be started or failed outright
    #[error("optical character recognition unavailable: {reason}")]
    OcrInitFailed {
        /// what went wrong spawning or running the engine
        reason: String,
    },

    /// Reconstruction fell through to dump mode while reconstruction was requested
    #[error("cannot reconstruct, dumped all {dumped} component bands")]
    Unreconstructable {
        /// how many component bands were written out standalone
        dumped: usize,
    },
}
