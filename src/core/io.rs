//! I/O helpers
//!
//! Description files (catalogs, chain manifests, definitions) are small text
//! files that may be gzip or bzip2 compressed. Grid files are binary and read
//! in whole-record windows through positioned reads.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Default buffer size for description readers (128KB)
pub const DEFAULT_BUFFER_SIZE: usize = 128 * 1024;

/// Compression format of a description file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionFormat {
    /// Plain text (uncompressed)
    #[default]
    Plain,
    /// Gzip compressed (.gz)
    Gzip,
    /// Bzip2 compressed (.bz2)
    Bzip2,
}

impl CompressionFormat {
    /// Detect from the leading magic bytes
    ///
    /// # Examples
    /// ```
    /// use datum_shift::core::io::CompressionFormat;
    /// assert_eq!(CompressionFormat::from_magic(&[0x1f, 0x8b, 0x08]), CompressionFormat::Gzip);
    /// assert_eq!(CompressionFormat::from_magic(b"BZh"), CompressionFormat::Bzip2);
    /// assert_eq!(CompressionFormat::from_magic(b"dat"), CompressionFormat::Plain);
    /// ```
    pub fn from_magic(magic: &[u8]) -> Self {
        if magic.len() >= 2 && magic[0] == 0x1f && magic[1] == 0x8b {
            CompressionFormat::Gzip
        } else if magic.len() >= 3 && magic[0] == 0x42 && magic[1] == 0x5a && magic[2] == 0x68 {
            // BZ2 magic: "BZh" (0x42 0x5a 0x68)
            CompressionFormat::Bzip2
        } else {
            CompressionFormat::Plain
        }
    }
}

/// Detect compression format from file path and/or content
pub fn detect_compression(path: &Path) -> io::Result<CompressionFormat> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    // First check by extension
    if extension.eq_ignore_ascii_case("gz") {
        return Ok(CompressionFormat::Gzip);
    }
    if extension.eq_ignore_ascii_case("bz2") {
        return Ok(CompressionFormat::Bzip2);
    }

    // Then check by magic bytes
    let mut file = File::open(path)?;
    let mut magic = [0u8; 3];
    let bytes_read = file.read(&mut magic)?;
    Ok(CompressionFormat::from_magic(&magic[..bytes_read]))
}

/// Open a description file, transparently decompressing it
pub fn open_text_reader(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let format = detect_compression(path)?;
    let file = File::open(path)?;

    Ok(match format {
        CompressionFormat::Gzip => {
            let decoder = flate2::read::GzDecoder::new(file);
            Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, decoder))
        }
        CompressionFormat::Bzip2 => {
            let decoder = bzip2::read::BzDecoder::new(file);
            Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, decoder))
        }
        CompressionFormat::Plain => Box::new(BufReader::with_capacity(DEFAULT_BUFFER_SIZE, file)),
    })
}

/// Read a whole description file into a string
pub fn read_text(path: &Path) -> io::Result<String> {
    let mut reader = open_text_reader(path)?;
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// File name with compression suffixes removed
///
/// `catalog.yaml.gz` yields `catalog.yaml`.
pub fn logical_file_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let lower = name.to_ascii_lowercase();
    for suffix in [".gz", ".bz2"] {
        if lower.ends_with(suffix) {
            return Some(name[..name.len() - suffix.len()].to_string());
        }
    }
    Some(name.to_string())
}

/// Fill `buf` from `offset`; a short file is an `UnexpectedEof` error
pub fn read_exact_at(file: &mut File, offset: u64, buf: &mut [u8]) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_buffer_size() {
        assert_eq!(DEFAULT_BUFFER_SIZE, 128 * 1024);
    }

    #[test]
    fn test_plain_text_round() -> io::Result<()> {
        let mut temp = NamedTempFile::new()?;
        write!(temp, "datasets: []\n")?;
        temp.flush()?;

        assert_eq!(detect_compression(temp.path())?, CompressionFormat::Plain);
        assert_eq!(read_text(temp.path())?, "datasets: []\n");
        Ok(())
    }

    #[test]
    fn test_gzip_detected_by_magic() -> io::Result<()> {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let mut temp = NamedTempFile::new()?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"fallback: NAD27\n")?;
        temp.write_all(&encoder.finish()?)?;
        temp.flush()?;

        assert_eq!(detect_compression(temp.path())?, CompressionFormat::Gzip);
        assert_eq!(read_text(temp.path())?, "fallback: NAD27\n");
        Ok(())
    }

    #[test]
    fn test_bzip2_detected_by_magic() -> io::Result<()> {
        use bzip2::write::BzEncoder;
        use bzip2::Compression;

        let mut temp = NamedTempFile::new()?;
        let mut encoder = BzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"datasets: []\n")?;
        temp.write_all(&encoder.finish()?)?;
        temp.flush()?;

        assert_eq!(detect_compression(temp.path())?, CompressionFormat::Bzip2);
        assert_eq!(read_text(temp.path())?, "datasets: []\n");
        Ok(())
    }

    #[test]
    fn test_logical_file_name() {
        assert_eq!(
            logical_file_name(Path::new("/tmp/a/chain.yaml.gz")).as_deref(),
            Some("chain.yaml")
        );
        assert_eq!(
            logical_file_name(Path::new("grid.byn")).as_deref(),
            Some("grid.byn")
        );
    }

    #[test]
    fn test_read_exact_at_short_file() -> io::Result<()> {
        let mut temp = NamedTempFile::new()?;
        temp.write_all(b"0123456789")?;
        temp.flush()?;

        let mut file = File::open(temp.path())?;
        let mut buf = [0u8; 4];
        read_exact_at(&mut file, 3, &mut buf)?;
        assert_eq!(&buf, b"3456");

        let mut too_long = [0u8; 8];
        let err = read_exact_at(&mut file, 6, &mut too_long).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        Ok(())
    }
}
