//! Document Walker
//!
//! Applies the [word transformer](crate::word) to every qualifying text node of a
//! document. Text is split into word runs (maximal sequences of Unicode letters and
//! marks) and separator runs (everything else, passed through verbatim). Each word
//! becomes a `<b>` element holding the bold prefix, followed by a text node with
//! the remainder.
//!
//! Elements listed in the configured skip tags are left untouched together with
//! their whole subtree. Child lists are never spliced while being iterated; each
//! list is rebuilt and then assigned back to its parent.

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    config::BionicConfig,
    dom::{Document, Element, MarkupCodec, Node, XmlCodec},
    error::BionicError,
    word::transform,
};

/// Name of the element wrapping the bold prefix of a word
pub const EMPHASIS_TAG: &str = "b";

static WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{M}]+").expect("word pattern is valid"));

/// A run of text produced by [segment]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// A maximal sequence of letters and combining marks
    Word(&'a str),

    /// Whitespace, punctuation, digits and anything else between words
    Separator(&'a str),
}

/// Split text into alternating word and separator runs
///
/// Concatenating the runs in order gives back the original text.
pub fn segment(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for found in WORD_PATTERN.find_iter(text) {
        if found.start() > last {
            segments.push(Segment::Separator(&text[last..found.start()]));
        }
        segments.push(Segment::Word(found.as_str()));
        last = found.end();
    }

    if last < text.len() {
        segments.push(Segment::Separator(&text[last..]));
    }

    segments
}

/// Build the nodes replacing a single text node
///
/// Adjacent plain runs are merged into one text node, so a remainder and the
/// punctuation following it end up together.
pub fn bionic_nodes(text: &str, config: &BionicConfig) -> Vec<Node> {
    let mut nodes = Vec::new();

    for segment in segment(text) {
        match segment {
            Segment::Separator(separator) => push_plain(&mut nodes, separator),
            Segment::Word(word) => {
                let span = transform(word, config);
                if span.is_plain() {
                    push_plain(&mut nodes, &span.remainder);
                    continue;
                }

                nodes.push(Node::Element(
                    Element::new(EMPHASIS_TAG).with_child(Node::Text(span.bold)),
                ));
                push_plain(&mut nodes, &span.remainder);
            }
        }
    }

    nodes
}

fn push_plain(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }

    match nodes.last_mut() {
        Some(Node::Text(previous)) => previous.push_str(text),
        _ => nodes.push(Node::text(text)),
    }
}

/// Transform every qualifying text node of a document in place
pub fn bionic_document(document: &mut Document, config: &BionicConfig) {
    bionic_children(&mut document.children, config);
}

fn bionic_children(children: &mut Vec<Node>, config: &BionicConfig) {
    let mut rebuilt = Vec::with_capacity(children.len());

    for node in std::mem::take(children) {
        match node {
            Node::Element(mut element) => {
                if !config.is_skip_tag(element.local_name()) {
                    bionic_children(&mut element.children, config);
                }
                rebuilt.push(Node::Element(element));
            }
            Node::Text(text) => {
                if text.trim().is_empty() {
                    rebuilt.push(Node::Text(text));
                } else {
                    rebuilt.extend(bionic_nodes(&text, config));
                }
            }
            other @ (Node::RawText(_)
            | Node::Comment(_)
            | Node::CData(_)
            | Node::Reference(_)
            | Node::Instruction(_)
            | Node::DocType(_)) => rebuilt.push(other),
        }
    }

    *children = rebuilt;
}

/// Convert markup into bionic reading format with the default [XmlCodec]
///
/// ## Return
/// - `Ok(String)`: The transformed markup
/// - `Err(BionicError::ParseError)`: The markup could not be parsed; callers
///   keep the original markup in that case
pub fn render_bionic(markup: &str, config: &BionicConfig) -> Result<String, BionicError> {
    render_bionic_with(&XmlCodec, markup, config)
}

/// Convert markup into bionic reading format with a specific codec
pub fn render_bionic_with<C: MarkupCodec + ?Sized>(
    codec: &C,
    markup: &str,
    config: &BionicConfig,
) -> Result<String, BionicError> {
    let mut document = codec.parse(markup)?;
    bionic_document(&mut document, config);
    codec.serialize(&document)
}

/// Convert plain text into bionic reading format
///
/// The bold prefixes are written as inline `<b>` tags; the rest of the text is
/// not escaped, so markdown keeps rendering as before.
pub fn render_bionic_plain_text(text: &str, config: &BionicConfig) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 2);

    for segment in segment(text) {
        match segment {
            Segment::Separator(separator) => result.push_str(separator),
            Segment::Word(word) => {
                let span = transform(word, config);
                if !span.is_plain() {
                    result.push_str(&format!("<{0}>{1}</{0}>", EMPHASIS_TAG, span.bold));
                }
                result.push_str(&span.remainder);
            }
        }
    }

    result
}
