//! Uniform byte-stream access to a band, whether it sits loose on disk
//! or compressed inside a zip archive.
//!
//! An input of the form `archive.zip:/member` addresses a member of a
//! zip archive; anything else is a plain file path. Archive members are
//! inflated whole on open — every [`BandSource::open`] yields a fresh,
//! independently positioned stream, and the handle closes with scope.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use zip::ZipArchive;

use crate::error::Error;

static ZIP_MEMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?<archive>.+\.zip):/(?<member>.+)$")
        .expect("Regex for archive member paths must be valid")
});

/// Where a band's bytes live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BandSource {
    /// A loose file on disk
    Plain(PathBuf),
    /// A compressed member inside a zip archive
    ZipMember {
        /// path of the archive itself
        archive: PathBuf,
        /// member path within the archive
        member: String,
    },
}

impl BandSource {
    /// Interprets an input string: `*.zip:/*` splits into archive and
    /// member, anything else is a plain path
    #[must_use]
    pub fn parse(input: &str) -> Self {
        ZIP_MEMBER_RE.captures(input).map_or_else(
            || Self::Plain(PathBuf::from(input)),
            |captures| Self::ZipMember {
                archive: PathBuf::from(&captures["archive"]),
                member: captures["member"].to_owned(),
            },
        )
    }

    /// The full input spelling, suitable for messages
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Plain(path) => path.display().to_string(),
            Self::ZipMember { archive, member } => {
                format!("{}:/{member}", archive.display())
            }
        }
    }

    /// Just the file name, without any leading path or archive part
    #[must_use]
    pub fn base_name(&self) -> String {
        match self {
            Self::Plain(path) => path
                .file_name()
                .map_or_else(String::new, |name| name.to_string_lossy().into_owned()),
            Self::ZipMember { member, .. } => member
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(member)
                .to_owned(),
        }
    }

    /// Opens a fresh stream over the band's bytes
    ///
    /// # Errors
    ///
    /// Surfaces I/O errors opening the file, and archive errors when the
    /// zip cannot be read or the member is missing.
    pub fn open(&self) -> Result<BandStream, Error> {
        match self {
            Self::Plain(path) => {
                let file = File::open(path)?;
                Ok(BandStream {
                    inner: StreamKind::File(BufReader::new(file)),
                })
            }
            Self::ZipMember { archive, member } => {
                let file = File::open(archive)?;
                let mut zip = ZipArchive::new(file)?;
                let mut entry = zip.by_name(member)?;
                let mut inflated = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
                entry.read_to_end(&mut inflated)?;
                Ok(BandStream {
                    inner: StreamKind::Inflated(Cursor::new(inflated)),
                })
            }
        }
    }
}

/// Lists the member names of a zip archive, for indexing
///
/// # Errors
///
/// Surfaces I/O and archive format errors.
pub fn archive_members(archive: &Path) -> Result<Vec<String>, Error> {
    let file = File::open(archive)?;
    let zip = ZipArchive::new(file)?;
    Ok(zip.file_names().map(str::to_owned).collect())
}

/// A seekable byte stream over one band file
#[derive(Debug)]
pub struct BandStream {
    inner: StreamKind,
}

#[derive(Debug)]
enum StreamKind {
    File(BufReader<File>),
    Inflated(Cursor<Vec<u8>>),
}

impl BandStream {
    /// Total stream length in bytes; the read position is preserved
    ///
    /// # Errors
    ///
    /// Surfaces seek failures on the underlying handle.
    pub fn size(&mut self) -> Result<u64, Error> {
        let position = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        self.seek(SeekFrom::Start(position))?;
        Ok(end)
    }
}

impl Read for BandStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            StreamKind::File(reader) => reader.read(buf),
            StreamKind::Inflated(cursor) => cursor.read(buf),
        }
    }
}

impl Seek for BandStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match &mut self.inner {
            StreamKind::File(reader) => reader.seek(pos),
            StreamKind::Inflated(cursor) => cursor.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    #[test]
    fn plain_paths_stay_plain() {
        let source = BandSource::parse("mission/vl_1553.007");
        assert_eq!(source, BandSource::Plain(PathBuf::from("mission/vl_1553.007")));
        assert_eq!(source.base_name(), "vl_1553.007");
    }

    #[test]
    fn zip_member_paths_split_at_the_marker() {
        let source = BandSource::parse("tapes/mission.zip:/vl_1553.007");
        assert_eq!(
            source,
            BandSource::ZipMember {
                archive: PathBuf::from("tapes/mission.zip"),
                member: "vl_1553.007".to_owned(),
            }
        );
        assert_eq!(source.base_name(), "vl_1553.007");
        assert_eq!(source.display_name(), "tapes/mission.zip:/vl_1553.007");
    }

    #[test]
    fn archive_matching_ignores_case_like_the_tapes_did() {
        assert!(matches!(
            BandSource::parse("MISSION.ZIP:/vl_0001.001"),
            BandSource::ZipMember { .. }
        ));
    }

    #[test]
    fn reads_and_seeks_inside_an_inflated_member() -> anyhow::Result<()> {
        let scratch = mktemp::Temp::new_file()?;
        let file = File::create(&scratch)?;
        let mut writer = ZipWriter::new(file);
        writer.start_file("vl_0042.003", SimpleFileOptions::default())?;
        writer.write_all(b"0123456789")?;
        writer.finish()?;

        let spec = format!("{}:/vl_0042.003", scratch.to_path_buf().display());
        let source = BandSource::parse(&spec);
        let mut stream = source.open()?;
        assert_eq!(stream.size()?, 10);

        stream.seek(SeekFrom::Start(4))?;
        let mut buf = [0u8; 3];
        stream.read_exact(&mut buf)?;
        assert_eq!(&buf, b"456");

        // a second open starts from scratch
        let mut again = source.open()?;
        let mut first = [0u8; 1];
        again.read_exact(&mut first)?;
        assert_eq!(&first, b"0");
        Ok(())
    }

    #[test]
    fn missing_members_surface_as_archive_errors() -> anyhow::Result<()> {
        let scratch = mktemp::Temp::new_file()?;
        let file = File::create(&scratch)?;
        let mut writer = ZipWriter::new(file);
        writer.start_file("vl_0042.003", SimpleFileOptions::default())?;
        writer.write_all(b"x")?;
        writer.finish()?;

        let spec = format!("{}:/vl_9999.999", scratch.to_path_buf().display());
        assert!(matches!(
            BandSource::parse(&spec).open(),
            Err(Error::Archive(_))
        ));
        Ok(())
    }

    #[test]
    fn member_listing_reports_every_entry() -> anyhow::Result<()> {
        let scratch = mktemp::Temp::new_file()?;
        let file = File::create(&scratch)?;
        let mut writer = ZipWriter::new(file);
        for name in ["vl_0001.001", "vl_0001.002", "README"] {
            writer.start_file(name, SimpleFileOptions::default())?;
            writer.write_all(b"payload")?;
        }
        writer.finish()?;

        let mut members = archive_members(&scratch.to_path_buf())?;
        members.sort();
        assert_eq!(members, ["README", "vl_0001.001", "vl_0001.002"]);
        Ok(())
    }
}
