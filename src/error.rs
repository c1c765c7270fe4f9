//! Error Type Definition Module
//!
//! This module defines the error types that may be encountered while converting
//! documents and containers into bionic reading format. All errors are uniformly
//! wrapped in the `BionicError` enumeration.
//!
//! ## Severity
//!
//! Errors fall into two groups. Per-document errors ([BionicError::ParseError],
//! [BionicError::NestingTooDeep], [BionicError::EncodingError] and
//! [BionicError::UnsupportedFormat]) are caught by the
//! converter, turned into a [Warning](crate::types::Warning) and the original bytes
//! are passed through. Container level errors ([BionicError::ContainerError],
//! [BionicError::IOError], ...) abort the whole operation.

use thiserror::Error;

/// Types of errors that can occur during bionic conversion
#[derive(Debug, Error)]
pub enum BionicError {
    /// ZIP archive related errors
    ///
    /// Errors occur when the container cannot be opened or written,
    /// such as file corruption or an unreadable archive.
    #[error("Container error: {source}")]
    ContainerError { source: zip::result::ZipError },

    /// Content decoding error
    ///
    /// This error occurs when the bytes of a document are not valid UTF-8.
    #[error("Encoding error: {source}")]
    EncodingError { source: std::str::Utf8Error },

    /// Invalid configuration error
    ///
    /// Triggered by [ConfigBuilder::build](crate::config::ConfigBuilder::build)
    /// when a value is out of its accepted range.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("IO error: {source}")]
    IOError { source: std::io::Error },

    /// Excessive nesting error
    ///
    /// A document opens more nested elements than the parser accepts.
    #[error("Parse error: Elements are nested deeper than {limit} levels.")]
    NestingTooDeep { limit: usize },

    /// Markup parsing failure error
    ///
    /// The document could not be parsed into a tree, usually because of
    /// an unterminated tag or a broken attribute list.
    #[error("Parse error: {source}")]
    ParseError { source: quick_xml::Error },

    /// Worker pool error
    ///
    /// This error occurs when a dedicated thread pool with the configured
    /// number of threads cannot be created.
    #[error("Thread pool error: {source}")]
    ThreadPool {
        source: rayon::ThreadPoolBuildError,
    },

    /// Unsupported file format error
    ///
    /// This error occurs when a file's extension is not one of the
    /// configured supported extensions.
    #[error("Unsupported format: The \"{extension}\" extension is not supported.")]
    UnsupportedFormat { extension: String },

    /// Unusable compression method error
    ///
    /// A container may only use the stored or deflated compression methods.
    #[error(
        "Unusable compression method: The \"{file}\" file uses the unsupported \"{method}\" compression method."
    )]
    UnusableCompressionMethod { file: String, method: String },
}

impl BionicError {
    /// Whether the error only concerns a single document
    ///
    /// Per-document errors degrade to a pass-through and a warning;
    /// every other error is fatal to the batch.
    pub fn is_per_document(&self) -> bool {
        matches!(
            self,
            BionicError::ParseError { .. }
                | BionicError::NestingTooDeep { .. }
                | BionicError::EncodingError { .. }
                | BionicError::UnsupportedFormat { .. }
        )
    }
}

impl From<zip::result::ZipError> for BionicError {
    fn from(value: zip::result::ZipError) -> Self {
        BionicError::ContainerError { source: value }
    }
}

impl From<quick_xml::Error> for BionicError {
    fn from(value: quick_xml::Error) -> Self {
        BionicError::ParseError { source: value }
    }
}

impl From<quick_xml::events::attributes::AttrError> for BionicError {
    fn from(value: quick_xml::events::attributes::AttrError) -> Self {
        BionicError::ParseError {
            source: quick_xml::Error::from(value),
        }
    }
}

impl From<std::io::Error> for BionicError {
    fn from(value: std::io::Error) -> Self {
        BionicError::IOError { source: value }
    }
}

impl From<std::str::Utf8Error> for BionicError {
    fn from(value: std::str::Utf8Error) -> Self {
        BionicError::EncodingError { source: value }
    }
}

impl From<rayon::ThreadPoolBuildError> for BionicError {
    fn from(value: rayon::ThreadPoolBuildError) -> Self {
        BionicError::ThreadPool { source: value }
    }
}

#[cfg(test)]
impl PartialEq for BionicError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::InvalidConfig { reason: l_reason },
                Self::InvalidConfig { reason: r_reason },
            ) => l_reason == r_reason,
            (
                Self::UnsupportedFormat {
                    extension: l_extension,
                },
                Self::UnsupportedFormat {
                    extension: r_extension,
                },
            ) => l_extension == r_extension,
            (
                Self::UnusableCompressionMethod {
                    file: l_file,
                    method: l_method,
                },
                Self::UnusableCompressionMethod {
                    file: r_file,
                    method: r_method,
                },
            ) => l_file == r_file && l_method == r_method,
            (Self::NestingTooDeep { limit: l_limit }, Self::NestingTooDeep { limit: r_limit }) => {
                l_limit == r_limit
            }
            (Self::EncodingError { source: l_source }, Self::EncodingError { source: r_source }) => {
                l_source == r_source
            }

            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::BionicError;

    #[test]
    fn test_per_document_errors() {
        let err = BionicError::UnsupportedFormat {
            extension: "pdf".to_string(),
        };
        assert!(err.is_per_document());

        let invalid = std::str::from_utf8(&[0xC3, 0x28]).unwrap_err();
        assert!(BionicError::from(invalid).is_per_document());
        assert!(BionicError::NestingTooDeep { limit: 1024 }.is_per_document());

        let err = BionicError::InvalidConfig {
            reason: "bold ratio".to_string(),
        };
        assert!(!err.is_per_document());

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!BionicError::from(io).is_per_document());
    }

    #[test]
    fn test_error_display() {
        let err = BionicError::UnsupportedFormat {
            extension: "pdf".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported format: The \"pdf\" extension is not supported."
        );

        let err = BionicError::NestingTooDeep { limit: 1024 };
        assert_eq!(
            err.to_string(),
            "Parse error: Elements are nested deeper than 1024 levels."
        );
    }
}
