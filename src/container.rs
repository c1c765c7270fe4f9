//! Container Codec
//!
//! A container is a zip archive bundling documents and resources, such as an EPUB
//! package. The converter never touches archives directly; it goes through the
//! [ContainerCodec] contract, which only deals in ordered entry lists.
//!
//! [ZipContainer] is the zip implementation. Output is written into a temporary
//! file next to the destination and only moved into place once the archive has
//! been finished, so a failed write never leaves a half-written container behind.

use std::{
    fs::File,
    io::{BufReader, Read, Write},
    path::Path,
};

use log::debug;
use tempfile::NamedTempFile;
use zip::{CompressionMethod, ZipArchive, ZipWriter, write::FileOptions};

use crate::{error::BionicError, types::ContainerEntry, utils::compression_method_check};

/// Name of the entry that must be stored first and uncompressed in an EPUB
pub const MIMETYPE_ENTRY: &str = "mimetype";

/// Reads and writes ordered container entry lists
pub trait ContainerCodec: Send + Sync {
    /// List all entries of the container at `path`, in archive order
    fn list_entries(&self, path: &Path) -> Result<Vec<(String, Vec<u8>)>, BionicError>;

    /// Write `entries` in the given order as a new container at `path`
    fn write_entries(&self, path: &Path, entries: &[ContainerEntry]) -> Result<(), BionicError>;
}

/// Zip based container codec
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipContainer;

impl ContainerCodec for ZipContainer {
    fn list_entries(&self, path: &Path) -> Result<Vec<(String, Vec<u8>)>, BionicError> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;
        compression_method_check(&mut archive)?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer)?;
            entries.push((file.name().to_string(), buffer));
        }

        debug!("read {} entries from {}", entries.len(), path.display());
        Ok(entries)
    }

    fn write_entries(&self, path: &Path, entries: &[ContainerEntry]) -> Result<(), BionicError> {
        let mut temp_file = create_temp_beside(path)?;

        {
            let mut zip = ZipWriter::new(temp_file.as_file_mut());
            let stored =
                FileOptions::<()>::default().compression_method(CompressionMethod::Stored);
            let deflated =
                FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);

            for entry in entries {
                if entry.is_dir() {
                    zip.add_directory(entry.name.as_str(), stored)?;
                    continue;
                }

                let options = if entry.name == MIMETYPE_ENTRY {
                    stored
                } else {
                    deflated
                };
                zip.start_file(entry.name.as_str(), options)?;
                zip.write_all(&entry.data)?;
            }

            zip.finish()?;
        }

        persist(temp_file, path)?;
        debug!("wrote {} entries to {}", entries.len(), path.display());
        Ok(())
    }
}

/// Create a temporary file in the directory that will hold `path`
pub(crate) fn create_temp_beside(path: &Path) -> Result<NamedTempFile, BionicError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    if !parent.exists() {
        std::fs::create_dir_all(parent)?;
    }

    Ok(NamedTempFile::new_in(parent)?)
}

/// Move a finished temporary file to its final location
pub(crate) fn persist(temp_file: NamedTempFile, path: &Path) -> Result<(), BionicError> {
    temp_file
        .persist(path)
        .map(|_| ())
        .map_err(|err| BionicError::from(err.error))
}

/// Write bytes to `path` through a temporary file
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<(), BionicError> {
    let mut temp_file = create_temp_beside(path)?;
    temp_file.write_all(data)?;
    temp_file.flush()?;
    persist(temp_file, path)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::{
        config::BionicConfig,
        container::{ContainerCodec, ZipContainer, write_atomic},
        error::BionicError,
        types::ContainerEntry,
    };

    fn entry(name: &str, data: &[u8]) -> ContainerEntry {
        ContainerEntry::new(name.to_string(), data.to_vec(), &BionicConfig::default())
    }

    #[test]
    fn test_write_and_list_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.epub");

        let entries = vec![
            entry("mimetype", b"application/epub+zip"),
            entry("META-INF/", b""),
            entry("META-INF/container.xml", b"<container/>"),
            entry("OEBPS/ch1.xhtml", b"<html><body><p>Hi</p></body></html>"),
            entry("OEBPS/cover.png", &[0x89, 0x50, 0x4E, 0x47, 0x00, 0xFF]),
        ];

        let codec = ZipContainer;
        assert!(codec.write_entries(&path, &entries).is_ok());

        let listed = codec.list_entries(&path).unwrap();
        let names: Vec<&str> = listed.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "mimetype",
                "META-INF/",
                "META-INF/container.xml",
                "OEBPS/ch1.xhtml",
                "OEBPS/cover.png"
            ]
        );
        assert_eq!(listed[0].1, b"application/epub+zip");
        assert_eq!(listed[4].1, vec![0x89, 0x50, 0x4E, 0x47, 0x00, 0xFF]);

        // only the finished container is left in the directory
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_list_entries_of_corrupt_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.epub");
        fs::write(&path, b"this is not a zip archive").unwrap();

        let result = ZipContainer.list_entries(&path);
        assert!(matches!(result, Err(BionicError::ContainerError { .. })));
    }

    #[test]
    fn test_list_entries_ignores_declared_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inflated.epub");
        ZipContainer
            .write_entries(&path, &[entry("mimetype", b"application/epub+zip")])
            .unwrap();

        // claim an uncompressed size of almost 4 GiB in the central directory
        let mut bytes = fs::read(&path).unwrap();
        let central = bytes
            .windows(4)
            .position(|window| window == b"PK\x01\x02")
            .unwrap();
        bytes[central + 24..central + 28].copy_from_slice(&0xF000_0000u32.to_le_bytes());
        fs::write(&path, &bytes).unwrap();

        match ZipContainer.list_entries(&path) {
            Ok(listed) => assert_eq!(listed[0].1, b"application/epub+zip"),
            Err(error) => assert!(matches!(
                error,
                BionicError::ContainerError { .. } | BionicError::IOError { .. }
            )),
        }
    }

    #[test]
    fn test_list_entries_of_missing_container() {
        let dir = tempfile::tempdir().unwrap();
        let result = ZipContainer.list_entries(&dir.path().join("missing.epub"));
        assert!(matches!(result, Err(BionicError::IOError { .. })));
    }

    #[test]
    fn test_write_atomic_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("page.html");
        write_atomic(&path, b"<p>x</p>").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"<p>x</p>");
        assert_eq!(fs::read_dir(dir.path().join("out")).unwrap().count(), 1);
    }
}
