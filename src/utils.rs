use std::{
    io::{Read, Seek},
    path::Path,
};

use zip::{CompressionMethod, ZipArchive};

use crate::error::BionicError;

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Checks that every entry of a container uses a compression method we can read
///
/// Only Stored (uncompressed) and Deflated entries are accepted, which matches the
/// OCF requirement for EPUB containers. Any other method results in an error
/// before a single entry is converted.
pub fn compression_method_check<R: Read + Seek>(
    zip_archive: &mut ZipArchive<R>,
) -> Result<(), BionicError> {
    for index in 0..zip_archive.len() {
        let file = zip_archive.by_index_raw(index)?;

        match file.compression() {
            CompressionMethod::Stored | CompressionMethod::Deflated => continue,
            _ => {
                return Err(BionicError::UnusableCompressionMethod {
                    file: file.name().to_string(),
                    method: file.compression().to_string(),
                });
            }
        };
    }

    Ok(())
}

/// Returns the lowercase extension of a path, without the leading dot
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Returns the directory part of a container entry name
///
/// Entry names always use `/` as separator; a top-level entry has an empty parent.
pub fn parent_dir(entry_name: &str) -> &str {
    entry_name
        .rsplit_once('/')
        .map(|(dir, _)| dir)
        .unwrap_or("")
}

/// Joins a directory and a file name into a container entry name
pub fn join_entry_path(dir: &str, file: &str) -> String {
    match dir {
        "" => file.to_string(),
        _ => format!("{}/{}", dir, file),
    }
}

/// Computes the href that leads from a document to another entry of the same container
///
/// Both arguments are entry names relative to the container root. The result
/// climbs out of the document's directory with `../` as far as the two paths
/// diverge and then descends into the target.
pub fn relative_href(from_document: &str, target: &str) -> String {
    let from_dir: Vec<&str> = parent_dir(from_document)
        .split('/')
        .filter(|part| !part.is_empty())
        .collect();
    let target_parts: Vec<&str> = target.split('/').filter(|part| !part.is_empty()).collect();

    // The last component of the target is the file name and never a shared directory
    let max_common = target_parts.len().saturating_sub(1);
    let common = from_dir
        .iter()
        .zip(target_parts.iter())
        .take(max_common)
        .take_while(|(from, to)| from == to)
        .count();

    let mut parts = vec![".."; from_dir.len() - common];
    parts.extend_from_slice(&target_parts[common..]);
    parts.join("/")
}

/// Provides functionality to decode document bytes into a string
///
/// Documents are expected to be UTF-8; a leading byte order mark is accepted
/// and dropped. Anything else is reported as [BionicError::EncodingError] so
/// that the caller can pass the raw bytes through.
pub trait DecodeBytes {
    fn decode(&self) -> Result<&str, BionicError>;
}

impl DecodeBytes for [u8] {
    fn decode(&self) -> Result<&str, BionicError> {
        let bytes = self.strip_prefix(&UTF8_BOM).unwrap_or(self);
        std::str::from_utf8(bytes).map_err(BionicError::from)
    }
}

impl DecodeBytes for Vec<u8> {
    fn decode(&self) -> Result<&str, BionicError> {
        self.as_slice().decode()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use crate::{
        error::BionicError,
        utils::{DecodeBytes, file_extension, join_entry_path, parent_dir, relative_href},
    };

    /// Test with empty data
    #[test]
    fn test_decode_empty_data() {
        let data: Vec<u8> = vec![];
        assert_eq!(data.decode().unwrap(), "");
    }

    /// Testing text decoding with UTF-8 BOM
    #[test]
    fn test_decode_utf8_with_bom() {
        let data: Vec<u8> = vec![0xEF, 0xBB, 0xBF, b'H', b'e', b'l', b'l', b'o'];
        let result = data.decode();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Hello");
    }

    /// Testing ordinary UTF-8 text (without BOM)
    #[test]
    fn test_decode_plain_utf8() {
        let data = "Grüße, World!".as_bytes().to_vec();
        assert_eq!(data.decode().unwrap(), "Grüße, World!");
    }

    /// Latin-1 bytes are not valid UTF-8
    #[test]
    fn test_decode_invalid_utf8() {
        let data: Vec<u8> = vec![b'c', b'a', b'f', 0xE9];
        let result = data.decode();
        assert!(matches!(result, Err(BionicError::EncodingError { .. })));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(
            file_extension(Path::new("OEBPS/Text/ch1.XHTML")),
            Some("xhtml".to_string())
        );
        assert_eq!(file_extension(Path::new("mimetype")), None);
    }

    #[test]
    fn test_entry_paths() {
        assert_eq!(parent_dir("OEBPS/text/ch1.xhtml"), "OEBPS/text");
        assert_eq!(parent_dir("ch1.xhtml"), "");
        assert_eq!(join_entry_path("", "styles/a.css"), "styles/a.css");
        assert_eq!(join_entry_path("OEBPS", "styles/a.css"), "OEBPS/styles/a.css");
    }

    #[test]
    fn test_relative_href() {
        assert_eq!(
            relative_href("OEBPS/text/ch1.xhtml", "OEBPS/styles/dark.css"),
            "../styles/dark.css"
        );
        assert_eq!(
            relative_href("OEBPS/ch1.xhtml", "OEBPS/styles/dark.css"),
            "styles/dark.css"
        );
        assert_eq!(relative_href("ch1.html", "styles/dark.css"), "styles/dark.css");
        assert_eq!(
            relative_href("a/b/c/ch1.html", "dark.css"),
            "../../../dark.css"
        );
        assert_eq!(relative_href("styles/page.html", "styles"), "../styles");
    }
}
