//! Bionic EPUB library
//!
//! A Rust library for converting EPUB eBooks, HTML/XHTML pages and plain text
//! into "bionic reading" format, where a length-dependent prefix of every word
//! is rendered bold to guide the eye.
//!
//! The markup structure of a document is kept intact: only text nodes are
//! rewritten, elements such as `<script>`, `<pre>` or `<code>` are left alone,
//! and every non-document entry of an EPUB container is written back
//! byte-identical.
//!
//! ## Features
//!
//! - Word transformation counting Unicode code points and respecting grapheme clusters.
//! - Lenient HTML/XHTML parsing and serialization based on `quick-xml`.
//! - Parallel, order-preserving conversion of EPUB containers.
//! - Fail-soft processing: documents that cannot be converted are passed through
//!   and reported as warnings.
//! - Optional dark theme stylesheet injection.
//!
//! ## Quick Start
//!
//! ### Convert markup
//!
//! ```rust
//! # use bionic_epub::{config::BionicConfig, walker::render_bionic};
//! # fn main() -> Result<(), bionic_epub::error::BionicError> {
//! let config = BionicConfig::default();
//! let result = render_bionic("<p>Bionic reading</p>", &config)?;
//!
//! assert_eq!(result, "<p><b>Bio</b>nic <b>rea</b>ding</p>");
//! # Ok(())
//! # }
//! ```
//!
//! ### Convert EPUB Files
//!
//! ```rust, no_run
//! # use std::path::Path;
//! # use bionic_epub::{config::ConfigBuilder, converter::BionicConverter};
//! # fn main() -> Result<(), bionic_epub::error::BionicError> {
//! let config = ConfigBuilder::new().add_dark_theme(true).num_threads(4).build()?;
//! let converter = BionicConverter::new(config);
//!
//! // Written to "path/to/Bionic_book.epub"
//! let report = converter.convert_path(Path::new("path/to/book.epub"), None, &|_| {})?;
//! println!("{} of {} documents converted", report.converted, report.documents);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! - `cli` (default): Builds the `bionic` command line binary, pulling in `clap`,
//!   `env_logger` and `indicatif`. Library users can turn it off with
//!   `default-features = false`.

pub mod config;
pub mod container;
pub mod converter;
pub mod dom;
pub mod error;
pub mod theme;
pub mod types;
pub(crate) mod utils;
pub mod walker;
pub mod word;

pub use converter::BionicConverter;
pub use utils::DecodeBytes;
