//! Solar longitude and the Martian month a camera event fell in.
//!
//! Ls is the angular position of Mars along its orbit, found by solving
//! Kepler's equation for the eccentric anomaly. The month is a 30° bin
//! of Ls, starting at Gemini. The computation is kept in `f32` exactly
//! as the mission tooling ran it, including its known wobble around
//! sol 193 (Leo where Virgo is expected); do not "fix" the formula.

use strum::{Display, EnumIter, EnumString};

/// Martian sols per Martian year
pub const SOLS_PER_MARTIAN_YEAR: f32 = 668.5991;

const PERIHELION_DAY: f32 = 485.35;
const PERIHELION_LS: f32 = 250.99;
const ECCENTRICITY: f32 = 0.0934;

/// Absolute solar day of the local midnight preceding touchdown.
/// Lander 1 set down June 20 1976, lander 2 September 3 1976.
const LANDER1_TOUCHDOWN_SOL: f32 = 199.0;
const LANDER2_TOUCHDOWN_SOL: f32 = 242.0;

/// The twelve Martian months, each spanning 30° of solar longitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum Month {
    /// Ls 0°–30°
    Gemini,
    /// Ls 30°–60°
    Cancer,
    /// Ls 60°–90°
    Leo,
    /// Ls 90°–120°
    Virgo,
    /// Ls 120°–150°
    Libra,
    /// Ls 150°–180°
    Scorpius,
    /// Ls 180°–210°
    Sagittarius,
    /// Ls 210°–240°
    Capricorn,
    /// Ls 240°–270°
    Aquarius,
    /// Ls 270°–300°
    Pisces,
    /// Ls 300°–330°
    Aries,
    /// Ls 330°–360°
    Taurus,
}

/// Converts an absolute Martian solar day to solar longitude in degrees
#[must_use]
pub fn solar_longitude(solar_day: f32) -> f32 {
    use std::f32::consts::PI;

    let time_perihelion = 2.0 * PI * (1.0 - PERIHELION_LS / 360.0);

    // mean anomaly, sign preserved for after the solve
    let zz = (solar_day - PERIHELION_DAY) / SOLS_PER_MARTIAN_YEAR;
    let signed_mean_anomaly = 2.0 * PI * (zz - zz.round());
    let mean_anomaly = signed_mean_anomaly.abs();

    // Newton iterations on M = E - e sin E
    let mut eccentric_anomaly = ECCENTRICITY.mul_add(mean_anomaly.sin(), mean_anomaly);
    loop {
        let delta = -(eccentric_anomaly
            - ECCENTRICITY * eccentric_anomaly.sin()
            - mean_anomaly)
            / ECCENTRICITY.mul_add(-eccentric_anomaly.cos(), 1.0);
        eccentric_anomaly += delta;
        if delta <= 1.0e-6 {
            break;
        }
    }
    if signed_mean_anomaly < 0.0 {
        eccentric_anomaly = -eccentric_anomaly;
    }

    let true_anomaly = 2.0
        * (((1.0 + ECCENTRICITY) / (1.0 - ECCENTRICITY)).sqrt()
            * (eccentric_anomaly / 2.0).tan())
        .atan();

    let mut ls = true_anomaly - time_perihelion;
    if ls < 0.0 {
        ls += 2.0 * PI;
    }
    if ls > 2.0 * PI {
        ls -= 2.0 * PI;
    }

    ls.to_degrees()
}

/// Maps a solar longitude in degrees to its Martian month
#[must_use]
pub fn month_of_ls(ls: f32) -> Month {
    if ls <= 30.0 {
        Month::Gemini
    } else if ls <= 60.0 {
        Month::Cancer
    } else if ls <= 90.0 {
        Month::Leo
    } else if ls <= 120.0 {
        Month::Virgo
    } else if ls <= 150.0 {
        Month::Libra
    } else if ls <= 180.0 {
        Month::Scorpius
    } else if ls <= 210.0 {
        Month::Sagittarius
    } else if ls <= 240.0 {
        Month::Capricorn
    } else if ls <= 270.0 {
        Month::Aquarius
    } else if ls <= 300.0 {
        Month::Pisces
    } else if ls <= 330.0 {
        Month::Aries
    } else {
        Month::Taurus
    }
}

/// The Martian month a camera event fell in, from the lander number and
/// the mission-relative solar day the event label carries
#[must_use]
pub fn month_of_event(lander: u8, solar_day: u32) -> Month {
    let touchdown = if lander == 1 {
        LANDER1_TOUCHDOWN_SOL
    } else {
        LANDER2_TOUCHDOWN_SOL
    };

    #[allow(clippy::cast_precision_loss)]
    let absolute = 1.0 + (touchdown + solar_day as f32) % SOLS_PER_MARTIAN_YEAR;
    month_of_ls(solar_longitude(absolute))
}
