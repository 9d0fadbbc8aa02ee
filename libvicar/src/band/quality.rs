//! Ranking duplicate captures of the same band.
//!
//! Camera events were often transmitted more than once, at varying
//! quality and with varying overlays. The order below ranks candidates
//! sharing a camera event and diode, worst first, so a sorted list ends
//! with the preferred capture.

use std::cmp::Ordering;

use super::Band;

/// Compares two bands of the same camera event and diode for quality;
/// `Less` means `a` is the worse capture.
///
/// Overlay-free beats axis-overlayed beats full-histogram. Among equals,
/// colour and infrared bands prefer the brighter capture, while the
/// broadband, sun and survey diodes prefer the larger capture and only
/// fall back to brightness on equal pixel area.
#[must_use]
pub fn quality_cmp(a: &Band, b: &Band) -> Ordering {
    debug_assert_eq!(a.diode(), b.diode());

    if a.axis_present() != b.axis_present() {
        return if a.axis_present() {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }

    if a.full_histogram_present() != b.full_histogram_present() {
        return if a.full_histogram_present() {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }

    if a.diode().is_colour_or_infrared() {
        return a.mean_pixel_value().total_cmp(&b.mean_pixel_value());
    }

    match a.original_pixel_area().cmp(&b.original_pixel_area()) {
        Ordering::Equal => a.mean_pixel_value().total_cmp(&b.mean_pixel_value()),
        unequal => unequal,
    }
}
