//! Run configuration, built once by the caller and passed by reference
//! through the whole recovery.

use bon::Builder;
use strum::{Display, EnumString};

use crate::band::Diode;

/// Which diode class to admit into the catalogue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DiodeFilter {
    /// Admit every supported diode
    #[default]
    Any,
    /// Broadband 1 through 4
    Broadband,
    /// Red, green and blue
    Colour,
    /// Infrared 1 through 3
    Infrared,
    /// The Sun diode
    Sun,
    /// The survey diode
    Survey,
}

impl DiodeFilter {
    /// Whether a band of the given diode passes this filter
    #[must_use]
    pub const fn admits(self, diode: Diode) -> bool {
        match self {
            Self::Any => true,
            Self::Broadband => matches!(
                diode,
                Diode::Broadband1 | Diode::Broadband2 | Diode::Broadband3 | Diode::Broadband4
            ),
            Self::Colour => matches!(diode, Diode::Red | Diode::Green | Diode::Blue),
            Self::Infrared => {
                matches!(diode, Diode::Infrared1 | Diode::Infrared2 | Diode::Infrared3)
            }
            Self::Sun => matches!(diode, Diode::Sun),
            Self::Survey => matches!(diode, Diode::Survey),
        }
    }
}

/// Everything the recovery run can be configured with.
///
/// Defaults reconstruct colour images with auto-rotation, into the bare
/// output root, refusing to overwrite.
#[derive(Debug, Clone, Builder)]
pub struct ExtractorOptions {
    /// Use OCR to figure out the correct image orientation
    #[builder(default = true)]
    pub auto_rotate: bool,

    /// Place output in a subdirectory named for the band class
    #[builder(default)]
    pub directorize_band_class: bool,

    /// Place output in a subdirectory named for the lander's location
    #[builder(default)]
    pub directorize_location: bool,

    /// Place output in a subdirectory named for the Martian month
    #[builder(default)]
    pub directorize_month: bool,

    /// Place output in a subdirectory numbered by solar day
    #[builder(default)]
    pub directorize_sol: bool,

    /// Decode and decide everything but write nothing
    #[builder(default)]
    pub dry_run: bool,

    /// Only index bands of this camera event identifier (without sol)
    pub filter_camera_event: Option<String>,

    /// Only index bands of this diode class
    #[builder(default)]
    pub filter_diode_class: DiodeFilter,

    /// Only index bands from this lander (1 or 2)
    pub filter_lander: Option<u8>,

    /// Only index bands taken on this solar day
    pub filter_solar_day: Option<u32>,

    /// Emit a plain-text metadata sidecar next to colour reconstructions
    #[builder(default)]
    pub generate_metadata: bool,

    /// Skip corrupt or problematic inputs instead of aborting the run
    #[builder(default)]
    pub ignore_bad_files: bool,

    /// Request Adam7 interlaced PNG output
    #[builder(default)]
    pub interlace: bool,

    /// Accepted for compatibility; processing is always single threaded
    pub jobs: Option<usize>,

    /// Attempt reconstruction; when false every band is dumped standalone
    #[builder(default = true)]
    pub reconstruct: bool,

    /// Overwrite existing output files
    #[builder(default)]
    pub overwrite: bool,

    /// Recurse into subdirectories when the input is a directory
    #[builder(default)]
    pub recursive: bool,

    /// Mute per-file chatter, report only the closing summary
    #[builder(default)]
    pub summarize_only: bool,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
