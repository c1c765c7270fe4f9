//! Bionic Converter
//!
//! Drives the conversion of whole files and containers. Every document is handled
//! on its own and fail-soft: a document that cannot be decoded or parsed is passed
//! through byte-identical and reported as a [Warning], while the rest of the batch
//! carries on. Only container level problems (unreadable archives, I/O failures,
//! a worker pool that cannot be built) abort the operation.
//!
//! ## Usage
//!
//! ```rust, no_run
//! # use bionic_epub::{config::ConfigBuilder, converter::BionicConverter};
//! # fn main() -> Result<(), bionic_epub::error::BionicError> {
//! let config = ConfigBuilder::new().bold_ratio(0.5).add_dark_theme(true).build()?;
//! let converter = BionicConverter::new(config);
//!
//! let report = converter.convert_path("book.epub".as_ref(), None, &|_| {})?;
//! for warning in &report.warnings {
//!     eprintln!("{}", warning);
//! }
//! # Ok(())
//! # }
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    config::BionicConfig,
    container::{ContainerCodec, ZipContainer, write_atomic},
    dom::{MarkupCodec, XmlCodec},
    error::BionicError,
    theme::{
        DARK_THEME_CSS, DARK_THEME_FILE, ensure_stylesheet_link, inject_dark_theme,
        register_stylesheet,
    },
    types::{ContainerEntry, ConversionReport, DocumentKind, DocumentOutcome, Progress, Warning},
    utils::{DecodeBytes, file_extension, join_entry_path, parent_dir, relative_href},
    walker::{bionic_document, render_bionic_plain_text},
};

/// Prefix of the default output file name
pub const OUTPUT_PREFIX: &str = "Bionic_";

const CONTAINER_FILE: &str = "META-INF/container.xml";

/// A processed entry, its warning and whether it was converted
type EntryResult = (ContainerEntry, Option<Warning>, bool);

/// Observer receiving a [Progress] snapshot after every finished entry
///
/// Called from worker threads, so it must be `Sync`.
pub type ProgressObserver<'a> = &'a (dyn Fn(&Progress) + Sync);

/// Converts documents and containers into bionic reading format
///
/// The converter owns its configuration and a [MarkupCodec]; it holds no other
/// state and can be shared between threads.
pub struct BionicConverter<C: MarkupCodec = XmlCodec> {
    config: BionicConfig,
    codec: C,
}

impl BionicConverter<XmlCodec> {
    /// Creates a converter using the default [XmlCodec]
    pub fn new(config: BionicConfig) -> Self {
        Self::with_codec(config, XmlCodec)
    }
}

impl<C: MarkupCodec> BionicConverter<C> {
    /// Creates a converter using a specific markup codec
    pub fn with_codec(config: BionicConfig, codec: C) -> Self {
        Self { config, codec }
    }

    pub fn config(&self) -> &BionicConfig {
        &self.config
    }

    /// Convert markup text
    ///
    /// Text nodes are transformed, then the dark theme `<style>` is injected when
    /// enabled. With a `stylesheet_href`, a `<link>` to the shared stylesheet is
    /// added to the head as well.
    pub fn convert_markup(
        &self,
        markup: &str,
        stylesheet_href: Option<&str>,
    ) -> Result<String, BionicError> {
        let mut document = self.codec.parse(markup)?;
        bionic_document(&mut document, &self.config);

        if self.config.add_dark_theme() {
            inject_dark_theme(&mut document);
            if let Some(href) = stylesheet_href {
                ensure_stylesheet_link(&mut document, href);
            }
        }

        self.codec.serialize(&document)
    }

    /// Convert plain text or markdown
    pub fn convert_text(&self, text: &str) -> String {
        render_bionic_plain_text(text, &self.config)
    }

    /// Convert the bytes of a single document
    ///
    /// The kind of document is decided by the extension of `name`.
    ///
    /// ## Return
    /// - `Ok(DocumentOutcome::Converted)`: The converted bytes
    /// - `Ok(DocumentOutcome::PassedThrough)`: A per-document failure (see
    ///   [BionicError::is_per_document]); the original bytes and a [Warning]
    /// - `Err(BionicError)`: Any other failure, which aborts the batch
    pub fn convert_document(
        &self,
        name: &str,
        data: Vec<u8>,
        stylesheet_href: Option<&str>,
    ) -> Result<DocumentOutcome, BionicError> {
        let result = match DocumentKind::from_name(name, &self.config) {
            Some(kind) => data.decode().and_then(|content| match kind {
                DocumentKind::Markup => self.convert_markup(content, stylesheet_href),
                DocumentKind::PlainText => Ok(self.convert_text(content)),
            }),
            None => Err(BionicError::UnsupportedFormat {
                extension: file_extension(Path::new(name)).unwrap_or_default(),
            }),
        };

        match result {
            Ok(converted) => {
                debug!("converted {}", name);
                Ok(DocumentOutcome::Converted(converted.into_bytes()))
            }
            Err(error) if error.is_per_document() => Ok(DocumentOutcome::PassedThrough {
                original: data,
                warning: Warning {
                    entry: name.to_string(),
                    error,
                },
            }),
            Err(error) => Err(error),
        }
    }

    /// Convert every document of an ordered entry list
    ///
    /// Documents are converted in parallel; the returned entries keep the input
    /// order and every non-document entry keeps its bytes. With the dark theme
    /// enabled, the shared stylesheet is added (or its bytes refreshed) and
    /// registered in the package document's manifest.
    ///
    /// ## Return
    /// - `Ok((entries, report))`: The entries to write and the conversion summary
    /// - `Err(BionicError::ThreadPool)`: The dedicated worker pool could not be built
    /// - `Err(BionicError)`: A document failed with an error that is not per-document
    pub fn convert_entries(
        &self,
        entries: Vec<(String, Vec<u8>)>,
        progress: ProgressObserver,
    ) -> Result<(Vec<ContainerEntry>, ConversionReport), BionicError> {
        let entries: Vec<ContainerEntry> = entries
            .into_iter()
            .map(|(name, data)| ContainerEntry::new(name, data, &self.config))
            .collect();

        let package = if self.config.add_dark_theme() {
            self.find_package_document(&entries)
        } else {
            None
        };
        let stylesheet = self.config.add_dark_theme().then(|| match &package {
            Some(package) => join_entry_path(parent_dir(package), DARK_THEME_FILE),
            None => DARK_THEME_FILE.to_string(),
        });

        let total = entries.len();
        let done = AtomicUsize::new(0);
        let convert = |entry: ContainerEntry| -> Result<EntryResult, BionicError> {
            let mut warning = None;
            let mut converted = false;

            let entry = if entry.is_document {
                let href = stylesheet
                    .as_deref()
                    .map(|target| relative_href(&entry.name, target));
                let (data, problem) = self
                    .convert_document(&entry.name, entry.data, href.as_deref())?
                    .into_parts();
                converted = problem.is_none();
                warning = problem;

                ContainerEntry { data, ..entry }
            } else {
                entry
            };

            progress(&Progress {
                done: done.fetch_add(1, Ordering::Relaxed) + 1,
                total,
                entry: &entry.name,
            });

            Ok((entry, warning, converted))
        };

        let results: Result<Vec<EntryResult>, BionicError> =
            match self.config.num_threads() {
                Some(threads) => {
                    let pool = rayon::ThreadPoolBuilder::new()
                        .num_threads(threads)
                        .thread_name(|index| format!("bionic-{index}"))
                        .build()?;
                    pool.install(|| entries.into_par_iter().map(convert).collect())
                }
                None => entries.into_par_iter().map(convert).collect(),
            };
        let results = results?;

        let mut report = ConversionReport::default();
        let mut output = Vec::with_capacity(results.len() + 1);
        for (entry, warning, converted) in results {
            if entry.is_document {
                report.documents += 1;
            }
            if converted {
                report.converted += 1;
            }
            if let Some(warning) = warning {
                warn!("passing through {}", warning);
                report.warnings.push(warning);
            }
            output.push(entry);
        }

        if let Some(stylesheet) = stylesheet {
            self.add_stylesheet(&mut output, &stylesheet, package.as_deref(), &mut report)?;
        }

        report.entries = output.len();
        Ok((output, report))
    }

    /// Locate the package document of an EPUB container
    ///
    /// The first `rootfile` of `META-INF/container.xml` wins; without a usable
    /// container file the first `.opf` entry is taken.
    fn find_package_document(&self, entries: &[ContainerEntry]) -> Option<String> {
        let from_container = entries
            .iter()
            .find(|entry| entry.name == CONTAINER_FILE)
            .and_then(|entry| entry.data.decode().ok())
            .and_then(|content| self.codec.parse(content).ok())
            .and_then(|document| {
                document
                    .find_elements_by_name("rootfile")
                    .find_map(|rootfile| rootfile.get_attr("full-path"))
            })
            .filter(|path| entries.iter().any(|entry| &entry.name == path));

        from_container.or_else(|| {
            entries
                .iter()
                .find(|entry| file_extension(Path::new(&entry.name)).as_deref() == Some("opf"))
                .map(|entry| entry.name.clone())
        })
    }

    /// Add the shared stylesheet entry and register it in the package document
    fn add_stylesheet(
        &self,
        entries: &mut Vec<ContainerEntry>,
        stylesheet: &str,
        package: Option<&str>,
        report: &mut ConversionReport,
    ) -> Result<(), BionicError> {
        let css = DARK_THEME_CSS.trim_start().as_bytes().to_vec();
        match entries.iter_mut().find(|entry| entry.name == stylesheet) {
            Some(existing) => existing.data = css,
            None => entries.push(ContainerEntry {
                name: stylesheet.to_string(),
                data: css,
                is_document: false,
            }),
        }
        debug!("added stylesheet {}", stylesheet);

        let Some(package) = package else {
            return Ok(());
        };
        let Some(entry) = entries.iter_mut().find(|entry| entry.name == package) else {
            return Ok(());
        };

        let href = relative_href(package, stylesheet);
        match self.register_in_package(&entry.data, &href) {
            Ok(Some(updated)) => entry.data = updated.into_bytes(),
            Ok(None) => {}
            Err(error) if error.is_per_document() => {
                let warning = Warning {
                    entry: package.to_string(),
                    error,
                };
                warn!("could not register stylesheet in {}", warning);
                report.warnings.push(warning);
            }
            Err(error) => return Err(error),
        }

        Ok(())
    }

    fn register_in_package(&self, data: &[u8], href: &str) -> Result<Option<String>, BionicError> {
        let mut document = self.codec.parse(data.decode()?)?;
        if !register_stylesheet(&mut document, href) {
            return Ok(None);
        }

        Ok(Some(self.codec.serialize(&document)?))
    }

    /// Convert a container through a [ContainerCodec]
    ///
    /// The output container is only moved into place once it has been written
    /// completely.
    pub fn convert_container<Z: ContainerCodec + ?Sized>(
        &self,
        container: &Z,
        input: &Path,
        output: &Path,
        progress: ProgressObserver,
    ) -> Result<ConversionReport, BionicError> {
        info!("converting container {}", input.display());

        let entries = container.list_entries(input)?;
        let (entries, report) = self.convert_entries(entries, progress)?;
        container.write_entries(output, &entries)?;

        info!(
            "wrote {} ({} of {} documents converted, {} warnings)",
            output.display(),
            report.converted,
            report.documents,
            report.warnings.len()
        );
        Ok(report)
    }

    /// Convert an EPUB file with the zip container codec
    pub fn convert_epub(
        &self,
        input: &Path,
        output: &Path,
        progress: ProgressObserver,
    ) -> Result<ConversionReport, BionicError> {
        self.convert_container(&ZipContainer, input, output, progress)
    }

    /// Convert a single HTML, XHTML or text file
    ///
    /// A file with an unsupported extension, or one that cannot be decoded or
    /// parsed, is copied to `output` unmodified and reported as a warning.
    pub fn convert_file(&self, input: &Path, output: &Path) -> Result<ConversionReport, BionicError> {
        info!("converting file {}", input.display());

        let data = fs::read(input)?;
        let name = input.to_string_lossy();
        let is_document = DocumentKind::from_name(&name, &self.config).is_some();
        let (data, warning) = self.convert_document(&name, data, None)?.into_parts();

        write_atomic(output, &data)?;

        let mut report = ConversionReport {
            entries: 1,
            documents: usize::from(is_document),
            converted: usize::from(warning.is_none()),
            warnings: Vec::new(),
        };
        if let Some(warning) = warning {
            warn!("passing through {}", warning);
            report.warnings.push(warning);
        }

        info!("wrote {}", output.display());
        Ok(report)
    }

    /// Convert a file or an EPUB container, chosen by the input extension
    ///
    /// Without an explicit `output`, the result is written next to the input as
    /// `Bionic_<name>`.
    pub fn convert_path(
        &self,
        input: &Path,
        output: Option<&Path>,
        progress: ProgressObserver,
    ) -> Result<ConversionReport, BionicError> {
        let output = match output {
            Some(output) => output.to_path_buf(),
            None => default_output_path(input),
        };

        if file_extension(input).as_deref() == Some("epub") {
            return self.convert_epub(input, &output, progress);
        }

        let report = self.convert_file(input, &output)?;
        let name = input.to_string_lossy();
        progress(&Progress {
            done: 1,
            total: 1,
            entry: &name,
        });
        Ok(report)
    }
}

/// The default output location: `Bionic_<name>` in the input's directory
pub fn default_output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}", OUTPUT_PREFIX, name))
}
