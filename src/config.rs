//! Converter Configuration
//!
//! [BionicConfig] is the immutable record every conversion reads from. It is
//! created once through [ConfigBuilder] and then only shared by reference, so a
//! single configuration can be used by any number of worker threads at once.
//!
//! ## Usage
//!
//! ```rust
//! # fn main() -> Result<(), bionic_epub::error::BionicError> {
//! use bionic_epub::config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .min_word_length(4)
//!     .bold_ratio(0.5)
//!     .add_skip_word("the")
//!     .add_dark_theme(true)
//!     .build()?;
//!
//! assert_eq!(config.min_word_length(), 4);
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;

use crate::error::BionicError;

/// Default minimum word length, words up to this length only get one bold character
pub const DEFAULT_MIN_WORD_LENGTH: usize = 3;

/// Default share of a word that is rendered bold
pub const DEFAULT_BOLD_RATIO: f64 = 0.4;

/// Common short function words that are never bolded
pub const DEFAULT_SKIP_WORDS: [&str; 14] = [
    "a", "an", "the", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
];

/// Elements whose descendant text is never transformed
pub const DEFAULT_SKIP_TAGS: [&str; 6] = ["script", "style", "pre", "code", "math", "title"];

/// File suffixes eligible for conversion, without the leading dot
pub const DEFAULT_SUPPORTED_EXTENSIONS: [&str; 5] = ["html", "xhtml", "htm", "txt", "md"];

/// Suffixes parsed as markup; every other supported suffix is treated as plain text
pub const MARKUP_EXTENSIONS: [&str; 3] = ["html", "xhtml", "htm"];

/// Immutable conversion settings
#[derive(Debug, Clone)]
pub struct BionicConfig {
    min_word_length: usize,
    bold_ratio: f64,
    skip_words: HashSet<String>,
    skip_tags: HashSet<String>,
    supported_extensions: HashSet<String>,
    add_dark_theme: bool,
    num_threads: Option<usize>,
}

impl BionicConfig {
    /// Words whose length in code points is at most this get a single bold character
    pub fn min_word_length(&self) -> usize {
        self.min_word_length
    }

    pub fn bold_ratio(&self) -> f64 {
        self.bold_ratio
    }

    /// Check whether a word is exempted, ignoring case
    pub fn is_skip_word(&self, word: &str) -> bool {
        self.skip_words.contains(&word.to_lowercase())
    }

    /// Check whether an element name (local name, any case) is excluded from transformation
    pub fn is_skip_tag(&self, tag: &str) -> bool {
        self.skip_tags.contains(&tag.to_ascii_lowercase())
    }

    /// Check whether a file suffix (with or without leading dot, any case) is convertible
    pub fn supports_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        self.supported_extensions.contains(&extension)
    }

    pub fn add_dark_theme(&self) -> bool {
        self.add_dark_theme
    }

    /// Size of a dedicated worker pool, `None` uses the global pool
    pub fn num_threads(&self) -> Option<usize> {
        self.num_threads
    }
}

impl Default for BionicConfig {
    fn default() -> Self {
        Self {
            min_word_length: DEFAULT_MIN_WORD_LENGTH,
            bold_ratio: DEFAULT_BOLD_RATIO,
            skip_words: DEFAULT_SKIP_WORDS.iter().map(|s| s.to_string()).collect(),
            skip_tags: DEFAULT_SKIP_TAGS.iter().map(|s| s.to_string()).collect(),
            supported_extensions: DEFAULT_SUPPORTED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            add_dark_theme: false,
            num_threads: None,
        }
    }
}

/// Configuration Builder
///
/// Starts from the default configuration; setters can be chained and
/// [ConfigBuilder::build] validates the result.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config: BionicConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_word_length(&mut self, length: usize) -> &mut Self {
        self.config.min_word_length = length;

        self
    }

    pub fn bold_ratio(&mut self, ratio: f64) -> &mut Self {
        self.config.bold_ratio = ratio;

        self
    }

    /// Add a word to the skip list, stored lowercase
    pub fn add_skip_word(&mut self, word: &str) -> &mut Self {
        self.config.skip_words.insert(word.to_lowercase());

        self
    }

    /// Replace the whole skip list
    pub fn set_skip_words<I, S>(&mut self, words: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.skip_words = words
            .into_iter()
            .map(|word| word.as_ref().to_lowercase())
            .collect();

        self
    }

    pub fn add_skip_tag(&mut self, tag: &str) -> &mut Self {
        self.config.skip_tags.insert(tag.to_ascii_lowercase());

        self
    }

    /// Replace the whole list of skipped elements
    pub fn set_skip_tags<I, S>(&mut self, tags: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.skip_tags = tags
            .into_iter()
            .map(|tag| tag.as_ref().to_ascii_lowercase())
            .collect();

        self
    }

    /// Replace the list of convertible file suffixes
    ///
    /// Suffixes may be given with or without the leading dot.
    pub fn set_supported_extensions<I, S>(&mut self, extensions: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config.supported_extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();

        self
    }

    pub fn add_dark_theme(&mut self, enabled: bool) -> &mut Self {
        self.config.add_dark_theme = enabled;

        self
    }

    pub fn num_threads(&mut self, threads: usize) -> &mut Self {
        self.config.num_threads = Some(threads);

        self
    }

    /// Validate and return the configuration
    ///
    /// # Return
    /// - `Ok(BionicConfig)`: All values are within range
    /// - `Err(BionicError::InvalidConfig)`: `min_word_length` is 0, `bold_ratio`
    ///   is outside (0, 1], or `num_threads` is 0
    pub fn build(&self) -> Result<BionicConfig, BionicError> {
        if self.config.min_word_length == 0 {
            return Err(BionicError::InvalidConfig {
                reason: "min_word_length must be at least 1".to_string(),
            });
        }

        let ratio = self.config.bold_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(BionicError::InvalidConfig {
                reason: format!("bold_ratio must be in (0, 1], got {}", ratio),
            });
        }

        if self.config.num_threads == Some(0) {
            return Err(BionicError::InvalidConfig {
                reason: "num_threads must be at least 1".to_string(),
            });
        }

        Ok(self.config.clone())
    }
}
