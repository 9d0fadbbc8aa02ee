//! Photosensor array diode identification.
//!
//! Each band file was exposed through one diode of the lander camera's
//! photosensor array. The diode name hides somewhere in the first five
//! label records next to a `DIODE` marker token, under one of several
//! inconsistent spellings: the narrow band colour diodes appear as
//! `RED`, `RED/S` or `RED/T` depending on which ground station wrote
//! the tape. We treat the `/S` and `/T` qualified forms as the plain
//! diode; the data suggests they were inconsistently applied rather
//! than meaningful.

use std::str::FromStr;

use strum::{EnumString, IntoStaticStr};

use crate::error::Error;
use crate::reader::BandStream;
use crate::record::{decode_record, RECORDS_PER_PHYSICAL_BLOCK};

/// A diode of the lander's photosensor array
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, IntoStaticStr,
)]
pub enum Diode {
    /// Could not be detected, or an unsupported type
    #[default]
    #[strum(to_string = "unknown")]
    Unknown,

    /// High resolution broadband, in-focus distance 1.9 m
    #[strum(to_string = "broadband 1", serialize = "BB1", serialize = "BB1/S")]
    Broadband1,
    /// High resolution broadband, in-focus distance 3.7 m
    #[strum(to_string = "broadband 2", serialize = "BB2", serialize = "BB2/S")]
    Broadband2,
    /// High resolution broadband, in-focus distance 4.5 m
    #[strum(to_string = "broadband 3", serialize = "BB3", serialize = "BB3/S")]
    Broadband3,
    /// High resolution broadband, in-focus distance 13.3 m
    #[strum(to_string = "broadband 4", serialize = "BB4", serialize = "BB4/S")]
    Broadband4,

    /// Narrow band low resolution colour diode
    #[strum(
        to_string = "red",
        serialize = "RED",
        serialize = "RED/S",
        serialize = "RED/T"
    )]
    Red,
    /// Narrow band low resolution colour diode
    #[strum(
        to_string = "green",
        serialize = "GRN",
        serialize = "GREEN",
        serialize = "GRN/S",
        serialize = "GRN/T"
    )]
    Green,
    /// Narrow band low resolution colour diode
    #[strum(
        to_string = "blue",
        serialize = "BLU",
        serialize = "BLUE",
        serialize = "BLU/S",
        serialize = "BLU/T"
    )]
    Blue,

    /// Narrow band infrared diode, degraded slowly under RTG neutron flux
    #[strum(to_string = "infrared 1", serialize = "IR1", serialize = "IR1/T")]
    Infrared1,
    /// Narrow band infrared diode
    #[strum(to_string = "infrared 2", serialize = "IR2", serialize = "IR2/T")]
    Infrared2,
    /// Narrow band infrared diode
    #[strum(to_string = "infrared 3", serialize = "IR3", serialize = "IR3/T")]
    Infrared3,

    /// Narrow band Sun diode, unamplified
    #[strum(to_string = "sun", serialize = "SUN")]
    Sun,

    /// Low resolution survey diode
    #[strum(
        to_string = "survey",
        serialize = "SUR",
        serialize = "SURV",
        serialize = "SURV/S",
        serialize = "SURVEY"
    )]
    Survey,
}

impl Diode {
    /// Looks a label token up in the diode dictionary (case-sensitive)
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        Self::from_str(token).ok().filter(|d| *d != Self::Unknown)
    }

    /// Human friendly name, e.g. `"broadband 1"`
    #[must_use]
    pub fn friendly(self) -> &'static str {
        self.into()
    }

    /// Narrow band colour or infrared diodes get the visual overlay
    /// examination and brightness-based quality ranking
    #[must_use]
    pub const fn is_colour_or_infrared(self) -> bool {
        matches!(
            self,
            Self::Red | Self::Green | Self::Blue | Self::Infrared1 | Self::Infrared2 | Self::Infrared3
        )
    }
}

/// What the deep probe over the first physical record found
#[derive(Debug)]
pub(crate) struct DiodeProbe {
    pub diode: Diode,
    /// the token that named the diode, or the best hint at why not
    pub hint: String,
}

/// Walks up to five logical records from the phase offset looking for
/// the `DIODE` marker; the diode name is the token just before or just
/// after it. The stream is left wherever the probe stopped.
pub(crate) fn probe_diode(stream: &mut BandStream) -> Result<DiodeProbe, Error> {
    for record_index in 0..RECORDS_PER_PHYSICAL_BLOCK {
        let record = decode_record(stream)?;

        // the first record leads with two binary tape marker bytes
        let skip = if record_index == 0 { 2 } else { 0 };
        let text = record.text(false, skip, 0);
        let tokens: Vec<&str> = text.split_whitespace().collect();

        for (index, &token) in tokens.iter().enumerate() {
            if token == "MONOCOLOR" {
                return Ok(DiodeProbe {
                    diode: Diode::Unknown,
                    hint: "monocolour unsupported".to_owned(),
                });
            }
            if token == "BROADBAND" {
                return Ok(DiodeProbe {
                    diode: Diode::Unknown,
                    hint: "unidentifiable broadband".to_owned(),
                });
            }
            if token != "DIODE" {
                continue;
            }

            let previous = if index > 0 { tokens[index - 1] } else { "" };

            // the marker closed the record; only the preceding token
            // can name the diode
            let Some(&next) = tokens.get(index + 1) else {
                if let Some(diode) = Diode::from_token(previous) {
                    return Ok(DiodeProbe {
                        diode,
                        hint: previous.to_owned(),
                    });
                }
                break;
            };

            if let Some(diode) = Diode::from_token(next) {
                return Ok(DiodeProbe {
                    diode,
                    hint: next.to_owned(),
                });
            }
            if let Some(diode) = Diode::from_token(previous) {
                return Ok(DiodeProbe {
                    diode,
                    hint: previous.to_owned(),
                });
            }
            return Ok(DiodeProbe {
                diode: Diode::Unknown,
                hint: next.to_owned(),
            });
        }
    }

    Ok(DiodeProbe {
        diode: Diode::Unknown,
        hint: "none detected".to_owned(),
    })
}
