//! PNG and metadata sidecar emission.
//!
//! The writer owns the overwrite and dry-run policy: callers decide
//! *what* to write, the writer decides *whether* anything touches disk.

use std::fs::File;
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use tracing::{debug, warn};

use crate::error::Error;
use crate::options::ExtractorOptions;
use crate::raster::Raster;

/// Friendly location of a lander on the surface
#[must_use]
pub const fn lander_location(lander: u8) -> &'static str {
    match lander {
        1 => "Chryse Planitia",
        2 => "Utopia Planitia",
        _ => "Location Unknown",
    }
}

/// Writes reconstruction output, honouring dry-run and overwrite policy
#[derive(Debug, Clone, Copy)]
pub struct ImageWriter<'a> {
    options: &'a ExtractorOptions,
}

impl<'a> ImageWriter<'a> {
    /// A writer following the given run configuration
    #[must_use]
    pub const fn new(options: &'a ExtractorOptions) -> Self {
        Self { options }
    }

    /// Refuses to clobber an existing output unless overwrite is on
    ///
    /// # Errors
    ///
    /// [`Error::OverwriteRefused`] when the path exists and overwriting
    /// was not requested.
    pub fn check_overwrite(&self, path: &Path) -> Result<(), Error> {
        if !self.options.overwrite && path.exists() {
            return Err(Error::OverwriteRefused {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Writes a single-channel 8-bit PNG
    ///
    /// # Errors
    ///
    /// Overwrite refusal, file creation failures, and encoder errors.
    pub fn write_grayscale(&self, path: &Path, raster: &Raster) -> Result<(), Error> {
        self.check_overwrite(path)?;
        if self.options.dry_run {
            debug!(path = %path.display(), "dry run, skipping grayscale write");
            return Ok(());
        }

        let data: Vec<u8> = raster.rows().iter().flatten().copied().collect();
        let (width, height) = png_dimensions(raster)?;
        let encoder = self.encoder(path)?;
        encoder.write_image(&data, width, height, ExtendedColorType::L8)?;
        debug!(path = %path.display(), "wrote grayscale image");
        Ok(())
    }

    /// Writes an 8-bit RGB PNG from three equally sized channel rasters
    ///
    /// # Errors
    ///
    /// [`Error::SizeMismatch`] when the channels disagree on dimensions,
    /// plus everything [`Self::write_grayscale`] can fail with.
    pub fn write_rgb(
        &self,
        path: &Path,
        red: &Raster,
        green: &Raster,
        blue: &Raster,
    ) -> Result<(), Error> {
        if red.width() != green.width()
            || red.width() != blue.width()
            || red.height() != green.height()
            || red.height() != blue.height()
        {
            return Err(Error::SizeMismatch);
        }

        self.check_overwrite(path)?;
        if self.options.dry_run {
            debug!(path = %path.display(), "dry run, skipping colour write");
            return Ok(());
        }

        let mut data = Vec::with_capacity(red.width() * red.height() * 3);
        for ((red_row, green_row), blue_row) in red
            .rows()
            .iter()
            .zip(green.rows().iter())
            .zip(blue.rows().iter())
        {
            for ((&r, &g), &b) in red_row.iter().zip(green_row.iter()).zip(blue_row.iter()) {
                data.extend_from_slice(&[r, g, b]);
            }
        }

        let (width, height) = png_dimensions(red)?;
        let encoder = self.encoder(path)?;
        encoder.write_image(&data, width, height, ExtendedColorType::Rgb8)?;
        debug!(path = %path.display(), "wrote colour image");
        Ok(())
    }

    /// Writes a plain-text metadata sidecar. An existing sidecar is left
    /// alone with a warning rather than an error.
    ///
    /// # Errors
    ///
    /// File creation and write failures.
    pub fn write_text(&self, path: &Path, contents: &str) -> Result<(), Error> {
        if self.options.dry_run {
            return Ok(());
        }
        if !self.options.overwrite && path.exists() {
            warn!(path = %path.display(), "output metadata already exists, not overwriting");
            return Ok(());
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn encoder(&self, path: &Path) -> Result<PngEncoder<File>, Error> {
        if self.options.interlace {
            // the encoder cannot emit Adam7 streams; decode-side support
            // only across the ecosystem
            warn!("adam7 interlacing requested but unsupported, writing non-interlaced");
        }
        let file = File::options()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(PngEncoder::new(file))
    }
}

fn png_dimensions(raster: &Raster) -> Result<(u32, u32), Error> {
    let width = u32::try_from(raster.width()).map_err(|_| Error::SizeMismatch)?;
    let height = u32::try_from(raster.height()).map_err(|_| Error::SizeMismatch)?;
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> Raster {
        #[allow(clippy::cast_possible_truncation)]
        let rows: Vec<Vec<u8>> = (0..height)
            .map(|y| (0..width).map(|x| ((x + y) % 256) as u8).collect())
            .collect();
        Raster::from_rows(rows)
    }

    #[test]
    fn grayscale_write_round_trips_through_the_decoder() -> anyhow::Result<()> {
        let options = ExtractorOptions::default();
        let writer = ImageWriter::new(&options);
        let dir = mktemp::Temp::new_dir()?;
        let path = dir.to_path_buf().join("gray.png");

        writer.write_grayscale(&path, &gradient(8, 4))?;

        let decoded = image::open(&path)?.into_luma8();
        assert_eq!((decoded.width(), decoded.height()), (8, 4));
        assert_eq!(decoded.get_pixel(3, 2).0, [5]);
        Ok(())
    }

    #[test]
    fn rgb_write_interleaves_the_three_channels() -> anyhow::Result<()> {
        let options = ExtractorOptions::default();
        let writer = ImageWriter::new(&options);
        let dir = mktemp::Temp::new_dir()?;
        let path = dir.to_path_buf().join("colour.png");

        let red = Raster::from_rows(vec![vec![200, 201], vec![202, 203]]);
        let green = Raster::from_rows(vec![vec![100, 101], vec![102, 103]]);
        let blue = Raster::from_rows(vec![vec![50, 51], vec![52, 53]]);
        writer.write_rgb(&path, &red, &green, &blue)?;

        let decoded = image::open(&path)?.into_rgb8();
        assert_eq!(decoded.get_pixel(1, 0).0, [201, 101, 51]);
        assert_eq!(decoded.get_pixel(0, 1).0, [202, 102, 52]);
        Ok(())
    }

    #[test]
    fn mismatched_channel_sizes_are_rejected() {
        let options = ExtractorOptions::default();
        let writer = ImageWriter::new(&options);
        let red = gradient(4, 4);
        let green = gradient(4, 4);
        let blue = gradient(5, 4);
        assert!(matches!(
            writer.write_rgb(Path::new("unused.png"), &red, &green, &blue),
            Err(Error::SizeMismatch)
        ));
    }

    #[test]
    fn existing_output_is_not_clobbered_by_default() -> anyhow::Result<()> {
        let options = ExtractorOptions::default();
        let writer = ImageWriter::new(&options);
        let dir = mktemp::Temp::new_dir()?;
        let path = dir.to_path_buf().join("taken.png");
        std::fs::write(&path, b"already here")?;

        assert!(matches!(
            writer.write_grayscale(&path, &gradient(2, 2)),
            Err(Error::OverwriteRefused { .. })
        ));
        assert_eq!(std::fs::read(&path)?, b"already here");

        let permissive = ExtractorOptions::builder().overwrite(true).build();
        let writer = ImageWriter::new(&permissive);
        writer.write_grayscale(&path, &gradient(2, 2))?;
        assert_ne!(std::fs::read(&path)?, b"already here");
        Ok(())
    }

    #[test]
    fn dry_run_decides_everything_but_writes_nothing() -> anyhow::Result<()> {
        let options = ExtractorOptions::builder().dry_run(true).build();
        let writer = ImageWriter::new(&options);
        let dir = mktemp::Temp::new_dir()?;
        let path = dir.to_path_buf().join("phantom.png");

        writer.write_grayscale(&path, &gradient(2, 2))?;
        writer.write_text(&dir.to_path_buf().join("phantom.txt"), "metadata")?;
        assert!(!path.exists());
        assert!(!dir.to_path_buf().join("phantom.txt").exists());
        Ok(())
    }
}
