//! Decoding one VICAR band file.
//!
//! A band is the output of a single photosensor diode during a single
//! camera event, wrapped in the 1970s VICAR container: an optional
//! VAX/VMS prefix of up to three bytes, EBCDIC label records in groups
//! of five, then raw pixel bytes, one byte per pixel, row-major.
//! [`Band::load`] peels all of that and leaves a decoded, immutable
//! description behind; [`Band::read_raw`] pulls the pixels on demand.

mod diode;
mod header;
mod quality;

pub use diode::Diode;
pub use quality::quality_cmp;

use std::io::{Read, Seek, SeekFrom};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace, warn};

use crate::error::Error;
use crate::mars::{month_of_event, Month};
use crate::options::ExtractorOptions;
use crate::raster::{Raster, Rotation};
use crate::reader::{BandSource, BandStream};
use crate::record::{decode_record, LogicalRecord, LOGICAL_RECORD_SIZE, RECORDS_PER_PHYSICAL_BLOCK};
use crate::visual::{TextRecognizer, VisualClassifier};

use self::diode::probe_diode;
use self::header::{parse_header, physical_record_geometry};

/// Anything smaller holds no recoverable image
const MINIMUM_INTERESTING_SIZE: u64 = 4 * 1024;

/// EBCDIC for the ASCII string `"VIKING LANDER "`
const ORIGIN_SIGNATURE: [u8; 14] = [
    0xe5, 0xc9, 0xd2, 0xc9, 0xd5, 0xc7, 0x40, 0xd3, 0xc1, 0xd5, 0xc4, 0xc5, 0xd9, 0x40,
];

static TAPE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^vl_(\d+)\.(\d+)$").expect("Regex for magnetic tape file names must be valid")
});

/// The camera event a band belongs to, parsed from its `CE LABEL`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraEvent {
    /// the full label, e.g. `22A158/0097`
    pub label: String,
    /// the identifier without the solar day, e.g. `22A158`
    pub id: String,
    /// the four-digit solar day count, e.g. `97`
    pub solar_day: u32,
}

impl CameraEvent {
    /// Splits a camera event label at the last path-style separator
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label.rfind(['/', '\\']) {
            Some(position) if position + 1 < label.len() => {
                let digits: String = label[position + 1..].chars().take(4).collect();
                Self {
                    label: label.to_owned(),
                    id: label[..position].to_owned(),
                    solar_day: digits.parse().unwrap_or(0),
                }
            }
            _ => Self {
                label: label.to_owned(),
                id: label.to_owned(),
                solar_day: 0,
            },
        }
    }
}

/// The fully decoded state of one band file
#[derive(Debug, Clone)]
pub struct Band {
    source: BandSource,

    // identity parsed from a vl_NNNN.NNN shaped file name
    magnetic_tape: u32,
    file_ordinal: u32,

    // provenance
    lander: u8,
    camera_event: Option<CameraEvent>,
    azimuth_elevation: String,

    // geometry
    bands: u32,
    height: u32,
    width: u32,
    bytes_per_pixel: u32,
    pixel_format: char,
    physical_record_size: u32,
    physical_record_padding: u32,
    phase_offset: u64,
    raw_offset: u64,
    file_size: u64,

    diode: Diode,

    // visual examination
    rotation: Rotation,
    axis_present: bool,
    full_histogram_present: bool,
    ocr_text: String,

    mean_pixel_value: f32,

    heuristic: u8,
    saved_labels: String,
}

impl Band {
    fn new(source: BandSource) -> Self {
        let (magnetic_tape, file_ordinal) = tape_numbers(&source.base_name());
        Self {
            source,
            magnetic_tape,
            file_ordinal,
            lander: 0,
            camera_event: None,
            azimuth_elevation: String::new(),
            bands: 0,
            height: 0,
            width: 0,
            bytes_per_pixel: 0,
            pixel_format: '\0',
            physical_record_size: 0,
            physical_record_padding: 0,
            phase_offset: 0,
            raw_offset: 0,
            file_size: 0,
            diode: Diode::Unknown,
            rotation: Rotation::None,
            axis_present: false,
            full_histogram_present: false,
            ocr_text: String::new(),
            mean_pixel_value: 0.0,
            heuristic: 0,
            saved_labels: String::new(),
        }
    }

    /// Decodes a band file as far as possible.
    ///
    /// The input may be a plain path or an `archive.zip:/member` pair.
    /// Colour and infrared bands additionally get the OCR-driven visual
    /// examination; the broadband, sun and survey diodes never carried
    /// overlays and skip it.
    ///
    /// # Errors
    ///
    /// Every failure mode of the container surfaces as its own
    /// [`Error`] kind; [`Error::Filtered`] means the band fell to a
    /// configured lander/sol/camera-event filter and should be dropped
    /// silently.
    pub fn load(
        input: &str,
        options: &ExtractorOptions,
        recognizer: &mut dyn TextRecognizer,
    ) -> Result<Self, Error> {
        let mut band = Self::new(BandSource::parse(input));
        debug!(file = %band.source.display_name(), "loading");

        let mut stream = band.source.open()?;
        band.file_size = stream.size()?;
        if band.file_size == 0 {
            return Err(Error::Empty);
        }
        if band.file_size < MINIMUM_INTERESTING_SIZE {
            return Err(Error::TooSmall {
                size: band.file_size,
            });
        }

        band.phase_offset = probe_phase_offset(&mut stream)?;
        if band.phase_offset > 0 {
            debug!(
                offset = band.phase_offset,
                "header intact, but records are out of phase"
            );
        }
        confirm_origin(&mut stream)?;

        // the diode name hides in the first physical record
        stream.seek(SeekFrom::Start(band.phase_offset))?;
        let probe = probe_diode(&mut stream)?;
        if probe.diode == Diode::Unknown {
            // internal radiometric/geometric calibration exposures name
            // themselves with a CAL qualifier and are not imagery
            if probe.hint.contains("CAL") {
                return Err(Error::CalibrationShot { token: probe.hint });
            }
            return Err(Error::UnsupportedDiode { token: probe.hint });
        }
        band.diode = probe.diode;

        stream.seek(SeekFrom::Start(band.phase_offset))?;
        let header_record = decode_record(&mut stream)?;
        let layout = parse_header(&header_record)?;
        band.bands = layout.bands;
        band.height = layout.height;
        band.width = layout.width;
        band.pixel_format = layout.pixel_format;
        band.bytes_per_pixel = layout.bytes_per_pixel;
        band.heuristic = layout.heuristic;
        trace!(heuristic = band.heuristic, height = band.height, width = band.width, "basic metadata");

        // Sun diode scans are two pixels wider than their headers claim
        if band.diode == Diode::Sun && band.width == 512 {
            band.width = 514;
        }

        if band.bands != 1 {
            return Err(Error::BadMetadata { field: "bands" });
        }
        if band.height == 0 || band.height >= 99_999 {
            return Err(Error::BadMetadata { field: "height" });
        }
        if band.width == 0 || band.width >= 99_999 {
            return Err(Error::BadMetadata { field: "width" });
        }
        // 'I' is definitely integral; 'L' is assumed to be
        if band.pixel_format != 'I' && band.pixel_format != 'L' {
            return Err(Error::BadMetadata {
                field: "pixel format",
            });
        }
        if band.bytes_per_pixel != 1 {
            return Err(Error::BadMetadata {
                field: "bytes per pixel",
            });
        }

        let (record_size, record_padding) = physical_record_geometry(band.width);
        band.physical_record_size = record_size;
        band.physical_record_padding = record_padding;

        band.raw_offset = band.walk_records(&mut stream, options)?;
        trace!(offset = band.raw_offset, "raw pixel data located");

        let required = band.raw_offset + u64::from(band.height) * u64::from(band.width);
        if band.file_size < required {
            return Err(Error::FileTooSmall {
                size: band.file_size,
                required,
            });
        }

        if band.diode.is_colour_or_infrared() {
            let (raster, mean) = band.read_raw_unrotated()?;
            band.mean_pixel_value = mean;
            let report = VisualClassifier::new(recognizer).classify(&raster, options.auto_rotate)?;
            band.rotation = report.rotation;
            band.axis_present = report.axis_present;
            band.full_histogram_present = report.full_histogram_present;
            band.ocr_text = report.text;
        }

        Ok(band)
    }

    /// Walks the physical records from the phase offset, harvesting
    /// extended metadata, until the last label record; returns the
    /// absolute offset of the raw pixel data.
    fn walk_records(
        &mut self,
        stream: &mut BandStream,
        options: &ExtractorOptions,
    ) -> Result<u64, Error> {
        stream.seek(SeekFrom::Start(self.phase_offset))?;
        self.saved_labels.clear();

        let block = (RECORDS_PER_PHYSICAL_BLOCK * LOGICAL_RECORD_SIZE) as u64;
        loop {
            for local_index in 0..RECORDS_PER_PHYSICAL_BLOCK {
                let record = decode_record(stream)?;
                if !record.is_valid_label() {
                    return Err(if local_index == 0 {
                        Error::OutOfPhaseBoundary
                    } else {
                        Error::InvalidLabel
                    });
                }

                self.parse_extended(&record, local_index, options)?;

                self.saved_labels.push_str(&record.text(true, 0, 0));
                self.saved_labels.push('\n');

                if record.is_last_label()? {
                    // skip the unused remainder of this physical record
                    // plus its padding
                    let local_offset = ((local_index + 1) * LOGICAL_RECORD_SIZE) as u64;
                    let skip = (block - local_offset) + u64::from(self.physical_record_padding);
                    let offset = stream.seek(SeekFrom::Current(
                        i64::try_from(skip).map_err(|_| Error::HeaderCorrupt)?,
                    ))?;
                    return Ok(offset);
                }
            }

            // five records down; peek whether the next physical record
            // boundary was tangential, in which case there is no padding
            let position = stream.stream_position()?;
            let tangential = decode_record(stream).is_ok_and(|record| record.is_valid_label());
            stream.seek(SeekFrom::Start(position))?;
            if tangential {
                trace!("tangential physical record boundary, ignoring padding");
            } else {
                trace!(
                    padding = self.physical_record_padding,
                    "seeking past physical record padding"
                );
                stream.seek(SeekFrom::Start(
                    position + u64::from(self.physical_record_padding),
                ))?;
            }
        }
    }

    /// Picks the azimuth/elevation record, the camera event label, and
    /// the lander number out of a label record
    fn parse_extended(
        &mut self,
        record: &LogicalRecord,
        local_index: usize,
        options: &ExtractorOptions,
    ) -> Result<(), Error> {
        let text = record.text(false, 0, 0);
        let tokens: Vec<&str> = text.split_whitespace().collect();

        for (index, &token) in tokens.iter().enumerate() {
            // the directional vector occupies its own record
            if index == 0 && token == "AZIMUTH" {
                self.azimuth_elevation = record.text(true, 0, 0);
                trace!(psa_direction = %self.azimuth_elevation);
            }

            if token == "CE" && tokens.get(index + 1) == Some(&"LABEL") {
                if let Some(&label) = tokens.get(index + 2) {
                    self.set_camera_event(label, options)?;
                }
            }

            // the lander identifies itself in the second record only
            if local_index == 1 && token == "VIKING" && tokens.get(index + 1) == Some(&"LANDER") {
                if let Some(number) = tokens.get(index + 2).and_then(|t| t.parse::<u8>().ok()) {
                    self.lander = number;
                    if number > 2 {
                        warn!(lander = number, "bad lander number");
                    }
                    if let Some(filter) = options.filter_lander {
                        if filter != 0 && filter != number {
                            debug!("filtering non-matching lander");
                            return Err(Error::Filtered);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn set_camera_event(&mut self, label: &str, options: &ExtractorOptions) -> Result<(), Error> {
        let event = CameraEvent::parse(label);
        trace!(camera_event = %event.label);

        if let Some(filter) = options.filter_solar_day {
            if filter != event.solar_day {
                debug!("filtering non-matching solar day");
                return Err(Error::Filtered);
            }
        }
        if let Some(filter) = &options.filter_camera_event {
            if *filter != event.id {
                debug!("filtering non-matching camera event");
                return Err(Error::Filtered);
            }
        }

        self.camera_event = Some(event);
        Ok(())
    }

    /// Reads the raw pixels and samples the mean over the inner third
    /// rectangle, which stays clear of any overlay or histogram region
    fn read_raw_unrotated(&self) -> Result<(Raster, f32), Error> {
        let mut stream = self.source.open()?;
        stream.seek(SeekFrom::Start(self.raw_offset))?;

        let width = self.width as usize;
        let height = self.height as usize;
        let left = width / 3;
        let right = (width / 3) * 2;
        let top = height / 3;
        let bottom = (height / 3) * 2;

        let mut sum: u64 = 0;
        let mut samples: u64 = 0;
        let mut rows = Vec::with_capacity(height);
        for y in 0..height {
            let mut row = vec![0u8; width];
            stream.read_exact(&mut row)?;
            if y >= top && y <= bottom {
                for &pixel in &row[left..=right] {
                    sum += u64::from(pixel);
                    samples += 1;
                }
            }
            rows.push(row);
        }

        #[allow(clippy::cast_precision_loss)]
        let mean = if samples == 0 {
            0.0
        } else {
            sum as f32 / samples as f32
        };
        Ok((Raster::from_rows(rows), mean))
    }

    /// Reads the raw band pixels with the stored rotation applied
    ///
    /// # Errors
    ///
    /// Surfaces open/seek/read failures on the underlying source.
    pub fn read_raw(&self) -> Result<Raster, Error> {
        let (raster, _) = self.read_raw_unrotated()?;
        Ok(raster.rotate(self.rotation))
    }

    /// Where the band's bytes live
    #[must_use]
    pub const fn source(&self) -> &BandSource {
        &self.source
    }

    /// The photosensor diode this band was exposed through
    #[must_use]
    pub const fn diode(&self) -> Diode {
        self.diode
    }

    /// The camera event the band belongs to, when the label named one
    #[must_use]
    pub const fn camera_event(&self) -> Option<&CameraEvent> {
        self.camera_event.as_ref()
    }

    /// The azimuth/elevation record text, possibly empty
    #[must_use]
    pub fn azimuth_elevation(&self) -> &str {
        &self.azimuth_elevation
    }

    /// The lander number, zero when the label never said
    #[must_use]
    pub const fn lander(&self) -> u8 {
        self.lander
    }

    /// The Martian month of the band's camera event
    #[must_use]
    pub fn month(&self) -> Month {
        let solar_day = self.camera_event.as_ref().map_or(0, |event| event.solar_day);
        month_of_event(self.lander, solar_day)
    }

    /// Counterclockwise rotation required to orient the image
    #[must_use]
    pub const fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Whether an axis overlay was detected
    #[must_use]
    pub const fn axis_present(&self) -> bool {
        self.axis_present
    }

    /// Whether the full histogram legend was detected
    #[must_use]
    pub const fn full_histogram_present(&self) -> bool {
        self.full_histogram_present
    }

    /// An axis overlay but no histogram legend
    #[must_use]
    pub const fn is_axis_only(&self) -> bool {
        self.axis_present && !self.full_histogram_present
    }

    /// Whatever text the OCR engine extracted during examination
    #[must_use]
    pub fn ocr_text(&self) -> &str {
        &self.ocr_text
    }

    /// Mean pixel value sampled from the inner third of the image
    #[must_use]
    pub const fn mean_pixel_value(&self) -> f32 {
        self.mean_pixel_value
    }

    /// Decoded width before any rotation
    #[must_use]
    pub const fn original_width(&self) -> u32 {
        self.width
    }

    /// Decoded height before any rotation
    #[must_use]
    pub const fn original_height(&self) -> u32 {
        self.height
    }

    /// Total pixels, before any rotation
    #[must_use]
    pub const fn original_pixel_area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Width after the stored rotation
    #[must_use]
    pub const fn transformed_width(&self) -> u32 {
        if self.rotation.swaps_axes() {
            self.height
        } else {
            self.width
        }
    }

    /// Height after the stored rotation
    #[must_use]
    pub const fn transformed_height(&self) -> u32 {
        if self.rotation.swaps_axes() {
            self.width
        } else {
            self.height
        }
    }

    /// Which header dialect heuristic decoded the basic metadata, 1..=6
    #[must_use]
    pub const fn heuristic(&self) -> u8 {
        self.heuristic
    }

    /// Size of one physical record in bytes
    #[must_use]
    pub const fn physical_record_size(&self) -> u32 {
        self.physical_record_size
    }

    /// Padding between physical records, zero for narrow images
    #[must_use]
    pub const fn physical_record_padding(&self) -> u32 {
        self.physical_record_padding
    }

    /// VAX/VMS prefix length displacing the record grid, 0..=3
    #[must_use]
    pub const fn phase_offset(&self) -> u64 {
        self.phase_offset
    }

    /// Absolute offset of the raw pixel bytes
    #[must_use]
    pub const fn raw_offset(&self) -> u64 {
        self.raw_offset
    }

    /// Input file size in bytes
    #[must_use]
    pub const fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Magnetic tape number from the file name, zero when unparseable
    #[must_use]
    pub const fn magnetic_tape(&self) -> u32 {
        self.magnetic_tape
    }

    /// File ordinal on the magnetic tape, zero when unparseable
    #[must_use]
    pub const fn file_ordinal(&self) -> u32 {
        self.file_ordinal
    }

    /// Every trimmed label record seen before the raw data, one per line
    #[must_use]
    pub fn saved_labels(&self) -> &str {
        &self.saved_labels
    }

    #[cfg(test)]
    pub(crate) fn synthetic(
        diode: Diode,
        axis_present: bool,
        full_histogram_present: bool,
        mean_pixel_value: f32,
        width: u32,
        height: u32,
    ) -> Self {
        let mut band = Self::new(BandSource::parse("vl_0000.000"));
        band.diode = diode;
        band.axis_present = axis_present;
        band.full_histogram_present = full_histogram_present;
        band.mean_pixel_value = mean_pixel_value;
        band.width = width;
        band.height = height;
        band
    }
}

/// Magnetic tape number and file ordinal from a `vl_NNNN.NNN` name,
/// zeroes for anything else
fn tape_numbers(base_name: &str) -> (u32, u32) {
    TAPE_NAME_RE.captures(base_name).map_or((0, 0), |captures| {
        (
            captures[1].parse().unwrap_or(0),
            captures[2].parse().unwrap_or(0),
        )
    })
}

/// Tries each phase offset in 0..=3 until a valid first label record
/// turns up
fn probe_phase_offset(stream: &mut BandStream) -> Result<u64, Error> {
    for offset in 0..4u64 {
        stream.seek(SeekFrom::Start(offset))?;
        let record = decode_record(stream)?;
        if record.is_valid_label() {
            return Ok(offset);
        }
    }
    Err(Error::HeaderCorrupt)
}

/// Scans the first 256 bytes for the EBCDIC `"VIKING LANDER "` signature
fn confirm_origin(stream: &mut BandStream) -> Result<(), Error> {
    stream.seek(SeekFrom::Start(0))?;
    let mut head = [0u8; 256];
    stream.read_exact(&mut head)?;
    if head
        .windows(ORIGIN_SIGNATURE.len())
        .any(|window| window == ORIGIN_SIGNATURE)
    {
        Ok(())
    } else {
        Err(Error::NotVikingLander)
    }
}
