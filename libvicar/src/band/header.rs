//! The six header dialects and the heuristics that tell them apart.
//!
//! The first logical record of a band carries its basic geometry, but
//! the ground stations that wrote the tapes disagreed on the layout,
//! and columns frequently ran together. Dialects are distinguished by
//! the count and lengths of the whitespace-separated tokens; where
//! height and width coalesced into one token, the split point is
//! recovered from string lengths. The probe order matters: several
//! predicates overlap, and the order below is the one the mission data
//! was validated against.

use nom::character::complete::{anychar, digit1};
use nom::combinator::{all_consuming, map_res};
use nom::sequence::preceded;
use nom::IResult;

use crate::error::Error;
use crate::record::{LogicalRecord, LOGICAL_RECORD_SIZE, RECORDS_PER_PHYSICAL_BLOCK};

/// Basic geometry decoded from the first header record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HeaderLayout {
    pub bands: u32,
    pub height: u32,
    pub width: u32,
    pub pixel_format: char,
    pub bytes_per_pixel: u32,
    /// which heuristic matched, 1..=6
    pub heuristic: u8,
}

fn decimal(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse)(input)
}

/// Parses a whole token as a decimal number
fn number(token: &str, field: &'static str) -> Result<u32, Error> {
    all_consuming(decimal)(token)
        .map(|(_, value)| value)
        .map_err(|_| Error::BadMetadata { field })
}

/// Parses a token whose first byte is an unexplained marker character
/// and whose remainder is a decimal number
fn number_after_marker(token: &str, field: &'static str) -> Result<u32, Error> {
    all_consuming(preceded(anychar, decimal))(token)
        .map(|(_, value)| value)
        .map_err(|_| Error::BadMetadata { field })
}

/// Splits a coalesced `HEIGHT‖WIDTH` token down the middle. Neither
/// dimension ever reached five digits, so equal halves are the only
/// reading that makes sense.
fn split_half(token: &str) -> Result<(u32, u32), Error> {
    let (height_text, width_text) = token.split_at(token.len() / 2);
    Ok((
        number(height_text, "height")?,
        number(width_text, "width")?,
    ))
}

/// Decodes the basic metadata record, trying each dialect in turn
pub(crate) fn parse_header(record: &LogicalRecord) -> Result<HeaderLayout, Error> {
    // skip the two binary tape marker bytes
    let text = record.text(true, 2, 0);
    let tokens: Vec<&str> = text.split_whitespace().take(32).collect();
    let lengths: Vec<usize> = tokens.iter().map(|token| token.len()).collect();
    let n = tokens.len();
    let len = |index: usize| lengths[index];

    let (heuristic, bands, height, width) = if n == 5
        && len(0) == 1
        && len(1) <= 5
        && len(2) <= 4
        && len(3) == 1
        && len(4) == 1
    {
        // "1   11151 586 I 1": bands, marker+height, width
        (
            1,
            number(tokens[0], "bands")?,
            number_after_marker(tokens[1], "height")?,
            number(tokens[2], "width")?,
        )
    } else if n == 5 && len(0) == 1 && len(1) == 1 && len(2) <= 8 && len(3) == 1 && len(4) == 1 {
        // "1   1 5122001 I 1": height and width coalesced
        let (height, width) = split_half(tokens[2])?;
        (2, number(tokens[0], "bands")?, height, width)
    } else if n == 5
        && len(0) > 1
        && len(0) <= 4
        && len(1) > 1
        && len(1) <= 4
        && len(2) >= 4
        && len(3) == 1
        && len(4) == 1
    {
        // "715    1955 7151955 I 1": echoed dimensions trail
        (
            5,
            1,
            number(tokens[0], "height")?,
            number(tokens[1], "width")?,
        )
    } else if n == 5 && len(0) <= 4 && len(1) <= 8 && len(2) <= 4 && len(3) == 1 && len(4) == 1 {
        // "1151     5861151 586 L 1": the echo sits in the middle
        (
            3,
            1,
            number(tokens[0], "height")?,
            number(tokens[2], "width")?,
        )
    } else if n == 4 && len(0) == 1 && len(1) <= 9 && len(2) == 1 && len(3) == 1 {
        // "1   116402250 L 1": marker, height and width all coalesced
        let (height, width) = split_half(&tokens[1][1..])?;
        (2, number(tokens[0], "bands")?, height, width)
    } else if n == 4 && len(0) >= 2 && len(0) <= 4 && len(1) >= 6 && len(2) == 1 && len(3) == 1 {
        // "2000    410020004100 L 1": W H W run together; the width is
        // whatever flanks the echoed height
        let height_len = len(0);
        let combined = tokens[1];
        let width_len = combined
            .len()
            .checked_sub(height_len)
            .ok_or(Error::UnknownHeaderFormat)?
            / 2;
        (
            6,
            1,
            number(tokens[0], "height")?,
            number(&combined[..width_len], "width")?,
        )
    } else if n == 6
        && len(0) == 1
        && len(1) == 1
        && len(2) <= 4
        && len(3) <= 4
        && len(4) == 1
        && len(5) == 1
    {
        // "1   1 512  42 I 1": the airy variant of dialect 1
        (
            1,
            number(tokens[0], "bands")?,
            number(tokens[2], "height")?,
            number(tokens[3], "width")?,
        )
    } else if n == 6
        && lengths[..4].iter().all(|l| (2..=4).contains(l))
        && len(4) == 1
        && len(5) == 1
    {
        // "512     253 512 253 I 1": dimensions echoed as separate tokens
        (
            4,
            1,
            number(tokens[0], "height")?,
            number(tokens[1], "width")?,
        )
    } else {
        return Err(Error::UnknownHeaderFormat);
    };

    let pixel_format = tokens[n - 2]
        .chars()
        .next()
        .ok_or(Error::BadMetadata { field: "pixel format" })?;
    let bytes_per_pixel = number(tokens[n - 1], "bytes per pixel")?;

    Ok(HeaderLayout {
        bands,
        height,
        width,
        pixel_format,
        bytes_per_pixel,
        heuristic,
    })
}

/// Physical record size and trailing padding for a given image width.
///
/// A physical record is five logical records or one scanline, whichever
/// is larger; when the scanline wins, everything past the logical
/// records is padding.
pub(crate) const fn physical_record_geometry(width: u32) -> (u32, u32) {
    let block = (RECORDS_PER_PHYSICAL_BLOCK * LOGICAL_RECORD_SIZE) as u32;
    if width > block {
        (width, width - block)
    } else {
        (block, 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::ascii_record;

    use super::*;

    fn parse(text: &str) -> Result<HeaderLayout, Error> {
        let padded = format!("**{text}");
        parse_header(&ascii_record(&padded, b'C'))
    }

    #[test]
    fn dialect_1_the_common_format() -> anyhow::Result<()> {
        let layout = parse("1   11151 586 I 1")?;
        assert_eq!(layout.heuristic, 1);
        assert_eq!(layout.bands, 1);
        assert_eq!((layout.height, layout.width), (1151, 586));
        assert_eq!(layout.pixel_format, 'I');
        assert_eq!(layout.bytes_per_pixel, 1);
        assert_eq!(physical_record_geometry(layout.width), (586, 226));
        Ok(())
    }

    #[test]
    fn dialect_1_airy_variant_with_six_tokens() -> anyhow::Result<()> {
        let layout = parse("1   1 512  42 I 1")?;
        assert_eq!(layout.heuristic, 1);
        assert_eq!((layout.height, layout.width), (512, 42));
        assert_eq!(physical_record_geometry(layout.width), (360, 0));
        Ok(())
    }

    #[test]
    fn dialect_2_splits_the_coalesced_dimensions() -> anyhow::Result<()> {
        let layout = parse("1   1 5122001 I 1")?;
        assert_eq!(layout.heuristic, 2);
        assert_eq!((layout.height, layout.width), (512, 2001));
        assert_eq!(physical_record_geometry(layout.width), (2001, 1641));
        Ok(())
    }

    #[test]
    fn dialect_2_four_token_variant() -> anyhow::Result<()> {
        let layout = parse("1   116402250 L 1")?;
        assert_eq!(layout.heuristic, 2);
        assert_eq!((layout.height, layout.width), (1640, 2250));
        assert_eq!(layout.pixel_format, 'L');
        Ok(())
    }

    #[test]
    fn dialect_3_ignores_the_echoed_middle_token() -> anyhow::Result<()> {
        let layout = parse("1151     5861151 586 L 1")?;
        assert_eq!(layout.heuristic, 3);
        assert_eq!((layout.height, layout.width), (1151, 586));
        Ok(())
    }

    #[test]
    fn dialect_4_reads_the_leading_pair() -> anyhow::Result<()> {
        let layout = parse("512     253 512 253 I 1")?;
        assert_eq!(layout.heuristic, 4);
        assert_eq!((layout.height, layout.width), (512, 253));
        Ok(())
    }

    #[test]
    fn dialect_5_reads_the_leading_pair_before_the_echo() -> anyhow::Result<()> {
        let layout = parse("715    1955 7151955 I 1")?;
        assert_eq!(layout.heuristic, 5);
        assert_eq!((layout.height, layout.width), (715, 1955));
        Ok(())
    }

    #[test]
    fn dialect_6_recovers_the_width_from_the_flanked_echo() -> anyhow::Result<()> {
        let layout = parse("2000    410020004100 L 1")?;
        assert_eq!(layout.heuristic, 6);
        assert_eq!((layout.height, layout.width), (2000, 4100));
        assert_eq!(physical_record_geometry(layout.width), (4100, 3740));
        Ok(())
    }

    #[test]
    fn unknown_layouts_exhaust_the_heuristics() {
        assert!(matches!(
            parse("THIS IS NOT A HEADER"),
            Err(Error::UnknownHeaderFormat)
        ));
        assert!(matches!(parse(""), Err(Error::UnknownHeaderFormat)));
    }

    #[test]
    fn implicit_band_dialects_report_one_band() -> anyhow::Result<()> {
        for text in [
            "1151     5861151 586 L 1",
            "512     253 512 253 I 1",
            "715    1955 7151955 I 1",
            "2000    410020004100 L 1",
        ] {
            assert_eq!(parse(text)?.bands, 1);
        }
        Ok(())
    }
}
