//! One camera event and everything recovered for it.
//!
//! A colour photograph is physically spread over three band files, so
//! the catalogue gathers every decoded band under its camera event
//! label and only at the end decides what can be rebuilt. Duplicate
//! transmissions pile up in the per-diode lists; reconstruction sorts
//! each list by quality and then hunts for a *consistent* triple, since
//! the best red might carry a histogram overlay while the best blue is
//! clean.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use tracing::{debug, warn};

use crate::band::{quality_cmp, Band, CameraEvent, Diode};
use crate::error::Error;
use crate::mars::{month_of_event, Month};
use crate::options::ExtractorOptions;
use crate::output::{lander_location, ImageWriter};

/// How one camera event came out of reconstruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Three colour bands were composed into an RGB image
    Colour,
    /// The best gray band was written as a grayscale image
    Grayscale,
    /// Every band was written standalone (dump mode); carries the count
    Dumped(usize),
}

/// All bands recovered for one camera event, grouped by diode
#[derive(Debug)]
pub struct ReconstructableImage {
    event: CameraEvent,
    lander: u8,
    band_class: Option<&'static str>,

    red: Vec<Band>,
    green: Vec<Band>,
    blue: Vec<Band>,
    infrared1: Vec<Band>,
    infrared2: Vec<Band>,
    infrared3: Vec<Band>,
    /// sun and survey bands end up in one gray list
    gray: Vec<Band>,

    dumped_count: usize,
}

impl ReconstructableImage {
    /// An empty event for the given camera event label
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self {
            event: CameraEvent::parse(label),
            lander: 0,
            band_class: None,
            red: Vec::new(),
            green: Vec::new(),
            blue: Vec::new(),
            infrared1: Vec::new(),
            infrared2: Vec::new(),
            infrared3: Vec::new(),
            gray: Vec::new(),
            dumped_count: 0,
        }
    }

    /// The full camera event label
    #[must_use]
    pub fn label(&self) -> &str {
        &self.event.label
    }

    /// The camera event identifier without the solar day
    #[must_use]
    pub fn id(&self) -> &str {
        &self.event.id
    }

    /// The solar day the event was captured on
    #[must_use]
    pub const fn solar_day(&self) -> u32 {
        self.event.solar_day
    }

    /// The last non-zero lander number any band reported
    #[must_use]
    pub const fn lander(&self) -> u8 {
        self.lander
    }

    /// The band-type class of the event, once a band arrived
    #[must_use]
    pub const fn band_class(&self) -> Option<&'static str> {
        self.band_class
    }

    /// The Martian month the event fell in
    #[must_use]
    pub fn month(&self) -> Month {
        month_of_event(self.lander, self.event.solar_day)
    }

    /// Bands written standalone by the last reconstruction attempt
    #[must_use]
    pub const fn dumped_count(&self) -> usize {
        self.dumped_count
    }

    /// Total bands collected so far across all diode lists
    #[must_use]
    pub fn band_count(&self) -> usize {
        self.lists().iter().map(|list| list.len()).sum()
    }

    /// Files this event's bands; the band must carry this event's label
    ///
    /// # Errors
    ///
    /// A band with an unknown diode cannot be placed in any list.
    pub fn add_band(&mut self, band: Band) -> Result<(), Error> {
        debug_assert_eq!(
            band.camera_event().map(|event| event.label.as_str()),
            Some(self.event.label.as_str())
        );

        if band.lander() != 0 {
            self.lander = band.lander();
        }

        let (list, class) = match band.diode() {
            Diode::Red => (&mut self.red, "Colour"),
            Diode::Green => (&mut self.green, "Colour"),
            Diode::Blue => (&mut self.blue, "Colour"),
            Diode::Infrared1 => (&mut self.infrared1, "Infrared"),
            Diode::Infrared2 => (&mut self.infrared2, "Infrared"),
            Diode::Infrared3 => (&mut self.infrared3, "Infrared"),
            Diode::Sun => (&mut self.gray, "Sun"),
            Diode::Survey => (&mut self.gray, "Survey"),
            // no reconstruction list exists for the broadband diodes
            Diode::Unknown
            | Diode::Broadband1
            | Diode::Broadband2
            | Diode::Broadband3
            | Diode::Broadband4 => {
                return Err(Error::UnsupportedDiode {
                    token: band.diode().friendly().to_owned(),
                })
            }
        };
        list.push(band);
        self.band_class = Some(class);
        Ok(())
    }

    /// Attempts to rebuild the event into the output tree.
    ///
    /// Colour reconstruction needs all of red, green and blue and
    /// nothing else; a pure gray event writes its best band; everything
    /// else dumps each band standalone.
    ///
    /// # Errors
    ///
    /// Selection failures ([`Error::NoMatchingHistogramSet`],
    /// [`Error::NoMatchingVanillaSet`]), [`Error::SizeMismatch`],
    /// overwrite refusal, write failures, and
    /// [`Error::Unreconstructable`] when dump mode was forced while
    /// reconstruction was requested.
    pub fn reconstruct(
        &mut self,
        options: &ExtractorOptions,
        output_root: &Path,
    ) -> Result<EventOutcome, Error> {
        for list in self.lists_mut() {
            list.sort_by(quality_cmp);
        }

        let reds = self.red.len();
        let greens = self.green.len();
        let blues = self.blue.len();
        let infrareds = self.infrared1.len() + self.infrared2.len() + self.infrared3.len();
        let grays = self.gray.len();

        self.dumped_count = 0;
        let writer = ImageWriter::new(options);

        if options.reconstruct
            && reds.min(greens).min(blues) >= 1
            && infrareds + grays == 0
        {
            return self.reconstruct_colour(options, &writer, output_root);
        }

        if options.reconstruct && reds + greens + blues + infrareds == 0 && grays >= 1 {
            return self.reconstruct_grayscale(options, &writer, output_root);
        }

        let dumped = self.dump_all(options, &writer, output_root);
        self.dumped_count = dumped;
        if options.reconstruct {
            Err(Error::Unreconstructable { dumped })
        } else {
            Ok(EventOutcome::Dumped(dumped))
        }
    }

    fn reconstruct_colour(
        &self,
        options: &ExtractorOptions,
        writer: &ImageWriter<'_>,
        output_root: &Path,
    ) -> Result<EventOutcome, Error> {
        let path = self.output_path(options, output_root, false, None, "png")?;
        writer.check_overwrite(&path)?;

        // start from the best of each list
        let mut red_pick = self.red.len() - 1;
        let mut green_pick = self.green.len() - 1;
        let mut blue_pick = self.blue.len() - 1;

        // a split between axis-only and clean captures cannot compose;
        // histogram variants are the next best consistent set
        let axis_only = usize::from(self.red[red_pick].is_axis_only())
            + usize::from(self.green[green_pick].is_axis_only())
            + usize::from(self.blue[blue_pick].is_axis_only());
        if (1..=2).contains(&axis_only) {
            red_pick = find_backwards(&self.red, red_pick, Band::full_histogram_present)
                .ok_or(Error::NoMatchingHistogramSet)?;
            green_pick = find_backwards(&self.green, green_pick, Band::full_histogram_present)
                .ok_or(Error::NoMatchingHistogramSet)?;
            blue_pick = find_backwards(&self.blue, blue_pick, Band::full_histogram_present)
                .ok_or(Error::NoMatchingHistogramSet)?;
        }

        // likewise a split between histogram and plain captures falls
        // back to entirely overlay-free ones
        let with_histogram = usize::from(self.red[red_pick].full_histogram_present())
            + usize::from(self.green[green_pick].full_histogram_present())
            + usize::from(self.blue[blue_pick].full_histogram_present());
        if (1..=2).contains(&with_histogram) {
            red_pick = find_backwards(&self.red, red_pick, |band| !band.axis_present())
                .ok_or(Error::NoMatchingVanillaSet)?;
            green_pick = find_backwards(&self.green, green_pick, |band| !band.axis_present())
                .ok_or(Error::NoMatchingVanillaSet)?;
            blue_pick = find_backwards(&self.blue, blue_pick, |band| !band.axis_present())
                .ok_or(Error::NoMatchingVanillaSet)?;
        }

        let red = &self.red[red_pick];
        let green = &self.green[green_pick];
        let blue = &self.blue[blue_pick];

        let width_spread = [
            red.transformed_width(),
            green.transformed_width(),
            blue.transformed_width(),
        ]
        .into_iter()
        .minmax()
        .into_option();
        let height_spread = [
            red.transformed_height(),
            green.transformed_height(),
            blue.transformed_height(),
        ]
        .into_iter()
        .minmax()
        .into_option();
        if width_spread.is_some_and(|(narrow, wide)| narrow != wide)
            || height_spread.is_some_and(|(short, tall)| short != tall)
        {
            return Err(Error::SizeMismatch);
        }

        let red_raster = red.read_raw()?;
        let green_raster = green.read_raw()?;
        let blue_raster = blue.read_raw()?;
        writer.write_rgb(&path, &red_raster, &green_raster, &blue_raster)?;
        debug!(event = %self.event.label, path = %path.display(), "reconstructed colour image");

        if options.generate_metadata {
            let sidecar = self.output_path(options, output_root, false, None, "txt")?;
            writer.write_text(&sidecar, &metadata_listing(&[red, green, blue]))?;
        }

        Ok(EventOutcome::Colour)
    }

    fn reconstruct_grayscale(
        &self,
        options: &ExtractorOptions,
        writer: &ImageWriter<'_>,
        output_root: &Path,
    ) -> Result<EventOutcome, Error> {
        let Some(best) = self.gray.last() else {
            return Err(Error::Unreconstructable { dumped: 0 });
        };

        let path = self.output_path(options, output_root, false, None, "png")?;
        writer.write_grayscale(&path, &best.read_raw()?)?;
        debug!(event = %self.event.label, path = %path.display(), "reconstructed grayscale image");
        Ok(EventOutcome::Grayscale)
    }

    /// Writes every band of every list standalone under
    /// `Unreconstructable/<event>/`; returns how many made it out
    fn dump_all(
        &self,
        options: &ExtractorOptions,
        writer: &ImageWriter<'_>,
        output_root: &Path,
    ) -> usize {
        let mut dumped = 0;
        for list in self.lists() {
            for (ordinal, band) in list.iter().enumerate() {
                let stem = format!("{}_{ordinal}", band.diode().friendly());
                let written = self
                    .output_path(options, output_root, true, Some(&stem), "png")
                    .and_then(|path| writer.write_grayscale(&path, &band.read_raw()?));
                match written {
                    Ok(()) => dumped += 1,
                    Err(error) => {
                        warn!(event = %self.event.label, %error, "could not dump band");
                    }
                }
            }
        }
        dumped
    }

    /// Builds (and creates, unless dry-running) the directorised output
    /// path for this event
    fn output_path(
        &self,
        options: &ExtractorOptions,
        output_root: &Path,
        unreconstructable: bool,
        stem: Option<&str>,
        extension: &str,
    ) -> Result<PathBuf, Error> {
        let mut directory = output_root.to_path_buf();
        if unreconstructable {
            directory.push("Unreconstructable");
        }
        if options.directorize_location {
            directory.push(lander_location(self.lander));
        }
        if options.directorize_month {
            directory.push(self.month().to_string());
        }
        if options.directorize_band_class {
            if let Some(class) = self.band_class {
                directory.push(class);
            }
        }
        if options.directorize_sol {
            directory.push(self.event.solar_day.to_string());
        }
        // dumped bands huddle under their event; a reconstructed image
        // is unique enough on its own
        if unreconstructable {
            directory.push(&self.event.id);
        }

        if !options.dry_run {
            std::fs::create_dir_all(&directory)?;
        }

        let stem = stem.unwrap_or(&self.event.id);
        directory.push(format!("{stem}.{extension}"));
        Ok(directory)
    }

    fn lists(&self) -> [&Vec<Band>; 7] {
        [
            &self.red,
            &self.green,
            &self.blue,
            &self.infrared1,
            &self.infrared2,
            &self.infrared3,
            &self.gray,
        ]
    }

    fn lists_mut(&mut self) -> [&mut Vec<Band>; 7] {
        [
            &mut self.red,
            &mut self.green,
            &mut self.blue,
            &mut self.infrared1,
            &mut self.infrared2,
            &mut self.infrared3,
            &mut self.gray,
        ]
    }
}

/// Scans a quality-sorted list backwards from `from` (inclusive) for
/// the best band satisfying the predicate
fn find_backwards<P>(list: &[Band], from: usize, predicate: P) -> Option<usize>
where
    P: Fn(&Band) -> bool,
{
    (0..=from).rev().find(|&index| predicate(&list[index]))
}

/// The plain-text sidecar listing for a reconstructed image
fn metadata_listing(bands: &[&Band]) -> String {
    let mut listing = String::from(
        "The following is a machine generated collection of metadata of each of\n\
         the image bands used to reconstruct a colour image.\n\n",
    );
    for band in bands {
        let (event_id, solar_day) = band
            .camera_event()
            .map_or(("", 0), |event| (event.id.as_str(), event.solar_day));
        let _ = write!(
            listing,
            "basic heuristic method: {}\n\
             camera azimuth / elevation: {}\n\
             camera event: {}\n\
             camera event solar day: {}\n\
             diode band type: {}\n\
             file size: {}\n\
             input file: {}\n\
             magnetic tape: {}\n\
             magnetic tape file ordinal: {}\n\
             mean pixel value: {}\n\
             month: {}\n\
             overlay axis present: {}\n\
             overlay full histogram present: {}\n\
             physical record size: {}\n\
             physical record padding: {}\n\
             phase offset required: {}\n\
             raw image offset: {}\n\n\n",
            band.heuristic(),
            band.azimuth_elevation(),
            event_id,
            solar_day,
            band.diode().friendly(),
            band.file_size(),
            band.source().base_name(),
            band.magnetic_tape(),
            band.file_ordinal(),
            band.mean_pixel_value(),
            band.month(),
            band.axis_present(),
            band.full_histogram_present(),
            band.physical_record_size(),
            band.physical_record_padding(),
            band.phase_offset(),
            band.raw_offset(),
        );
    }
    listing
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_with(bands: Vec<Band>) -> ReconstructableImage {
        let mut image = ReconstructableImage::new("22A158/0097");
        for band in bands {
            image.add_band(band).expect("band should be placeable");
        }
        image
    }

    fn coloured(diode: Diode, axis: bool, histogram: bool, mean: f32) -> Band {
        Band::synthetic(diode, axis, histogram, mean, 64, 64)
    }

    #[test]
    fn bands_land_in_their_diode_lists() {
        let image = event_with(vec![
            coloured(Diode::Red, false, false, 1.0),
            coloured(Diode::Green, false, false, 1.0),
            coloured(Diode::Sun, false, false, 1.0),
        ]);
        assert_eq!(image.band_count(), 3);
        // the class follows the most recent contributor
        assert_eq!(image.band_class(), Some("Sun"));
    }

    #[test]
    fn unknown_and_broadband_diodes_are_rejected() {
        let mut image = ReconstructableImage::new("22A158/0097");
        assert!(matches!(
            image.add_band(coloured(Diode::Unknown, false, false, 0.0)),
            Err(Error::UnsupportedDiode { .. })
        ));
        assert!(matches!(
            image.add_band(coloured(Diode::Broadband2, false, false, 0.0)),
            Err(Error::UnsupportedDiode { .. })
        ));
    }

    #[test]
    fn event_identity_derives_from_the_label() {
        let image = ReconstructableImage::new("22A158/0097");
        assert_eq!(image.id(), "22A158");
        assert_eq!(image.solar_day(), 97);
        assert_eq!(image.label(), "22A158/0097");
    }

    #[test]
    fn output_paths_follow_the_directorisation_flags() -> anyhow::Result<()> {
        let mut image = event_with(vec![coloured(Diode::Red, false, false, 1.0)]);
        image.lander = 1;

        let options = ExtractorOptions::builder()
            .directorize_location(true)
            .directorize_month(true)
            .directorize_band_class(true)
            .directorize_sol(true)
            .dry_run(true)
            .build();
        let path = image.output_path(&options, Path::new("out"), false, None, "png")?;
        let month = image.month().to_string();
        let expected = Path::new("out")
            .join("Chryse Planitia")
            .join(&month)
            .join("Colour")
            .join("97")
            .join("22A158.png");
        assert_eq!(path, expected);
        Ok(())
    }

    #[test]
    fn unreconstructable_paths_nest_under_the_event() -> anyhow::Result<()> {
        let image = event_with(vec![coloured(Diode::Survey, false, false, 1.0)]);
        let options = ExtractorOptions::builder().dry_run(true).build();
        let path = image.output_path(&options, Path::new("out"), true, Some("survey_0"), "png")?;
        let expected = Path::new("out")
            .join("Unreconstructable")
            .join("22A158")
            .join("survey_0.png");
        assert_eq!(path, expected);
        Ok(())
    }

    #[test]
    fn unknown_landers_directorise_as_unknown_location() -> anyhow::Result<()> {
        let image = event_with(vec![coloured(Diode::Red, false, false, 1.0)]);
        let options = ExtractorOptions::builder()
            .directorize_location(true)
            .dry_run(true)
            .build();
        let path = image.output_path(&options, Path::new("out"), false, None, "png")?;
        assert!(path.starts_with("out/Location Unknown"));
        Ok(())
    }

    #[test]
    fn find_backwards_scans_from_the_pick_inclusive() {
        let list = vec![
            coloured(Diode::Red, false, false, 1.0),
            coloured(Diode::Red, true, true, 2.0),
            coloured(Diode::Red, true, false, 3.0),
        ];
        assert_eq!(
            find_backwards(&list, 2, Band::full_histogram_present),
            Some(1)
        );
        assert_eq!(find_backwards(&list, 2, |band| !band.axis_present()), Some(0));
        assert_eq!(find_backwards(&list, 0, Band::full_histogram_present), None);
        assert_eq!(
            find_backwards(&list, 1, Band::full_histogram_present),
            Some(1)
        );
    }

    #[test]
    fn metadata_listing_names_every_field() {
        let band = coloured(Diode::Red, true, false, 42.5);
        let listing = metadata_listing(&[&band]);
        for key in [
            "basic heuristic method:",
            "camera azimuth / elevation:",
            "camera event:",
            "camera event solar day:",
            "diode band type: red",
            "file size:",
            "input file:",
            "magnetic tape:",
            "magnetic tape file ordinal:",
            "mean pixel value: 42.5",
            "month:",
            "overlay axis present: true",
            "overlay full histogram present: false",
            "physical record size:",
            "physical record padding:",
            "phase offset required:",
            "raw image offset:",
        ] {
            assert!(listing.contains(key), "missing {key}");
        }
    }
}
