//! # libvicar
//!
//! This library recovers scientific imagery captured by the two Viking
//! Lander spacecraft (1976–1982) from the original archival VICAR
//! files distributed on magnetic tape.
//!
//! Each archival file stores a single image *band*: the output of one
//! photosensor array diode during one camera event. A colour
//! photograph is physically spread across three files (the red, green
//! and blue bands of the same event), often duplicated at varying
//! quality and sometimes annotated with axis ticks or a histogram
//! legend burned straight into the pixels. The library decodes single
//! bands, classifies their orientation and overlays, groups them by
//! camera event, picks the best consistent set per event, and emits
//! reconstructed PNG images.
//!
//! ### The container
//!
//! A band file is 1970s VICAR: an optional VAX/VMS prefix of up to
//! three bytes displacing everything after it, then 72-byte EBCDIC
//! label records in groups of five (a *physical record*, padded out to
//! the image width when scanlines are wider), then raw pixels, one
//! byte each, row-major. The header layout itself comes in six
//! dialects told apart heuristically; see [`Band::load`].
//!
//! ### Decoding one band
//!
//! ```no_run
//! use libvicar::{Band, ExtractorOptions, OcradRecognizer};
//!
//! fn main() -> Result<(), libvicar::Error> {
//!     let options = ExtractorOptions::default();
//!     let mut ocr = OcradRecognizer::new();
//!     let band = Band::load("mission/vl_1553.007", &options, &mut ocr)?;
//!     println!(
//!         "{} diode, {}x{} pixels, camera event {:?}",
//!         band.diode().friendly(),
//!         band.original_width(),
//!         band.original_height(),
//!         band.camera_event().map(|event| event.label.as_str()),
//!     );
//!     let pixels = band.read_raw()?;
//!     assert_eq!(pixels.height() as u32, band.transformed_height());
//!     Ok(())
//! }
//! ```
//!
//! ### Recovering a whole directory tree
//!
//! ```no_run
//! use libvicar::{Assembler, ExtractorOptions, OcradRecognizer};
//!
//! fn main() -> Result<(), libvicar::Error> {
//!     let options = ExtractorOptions::builder()
//!         .directorize_location(true)
//!         .ignore_bad_files(true)
//!         .build();
//!     let mut assembler = Assembler::new(&options, "tapes/", "recovered/");
//!     let summary = assembler.run(&mut OcradRecognizer::new())?;
//!     println!(
//!         "reconstructed {}/{} camera events",
//!         summary.reconstructed, summary.events
//!     );
//!     Ok(())
//! }
//! ```
//!
//! Inputs may also address zip archive members directly with the
//! `archive.zip:/member` convention; the assembler enumerates archives
//! it meets on its own.

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

pub mod assemble;
pub mod band;
mod error;
pub mod mars;
pub mod options;
pub mod output;
pub mod raster;
pub mod reader;
pub mod record;
pub mod visual;

pub use assemble::{Assembler, EventOutcome, ReconstructableImage, RunSummary};
pub use band::{Band, CameraEvent, Diode};
pub use error::Error;
pub use options::{DiodeFilter, ExtractorOptions};
pub use raster::{Raster, Rotation};
pub use reader::BandSource;
pub use record::{LogicalRecord, LOGICAL_RECORD_SIZE};
pub use visual::{OcradRecognizer, TextRecognizer};

#[cfg(test)]
pub(crate) mod testutil {
    use crate::record::{LogicalRecord, LOGICAL_RECORD_SIZE};

    /// A space-padded ASCII label record with the given sentinel
    pub(crate) fn ascii_record(text: &str, sentinel: u8) -> LogicalRecord {
        let mut buffer = [b' '; LOGICAL_RECORD_SIZE];
        assert!(text.len() <= LOGICAL_RECORD_SIZE - 2);
        buffer[..text.len()].copy_from_slice(text.as_bytes());
        buffer[LOGICAL_RECORD_SIZE - 1] = sentinel;
        LogicalRecord::from_ascii(buffer)
    }
}
